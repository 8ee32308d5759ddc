//! User aggregate
//!
//! Contains the identity record, the aggregated profile view, and the
//! store interface.

pub mod model;
pub mod repository;

pub use model::{User, UserProfile};
pub use repository::UserStore;
