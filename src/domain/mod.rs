//! Domain layer
//!
//! Identity records owned by this service, activity records owned by
//! peer services, the error taxonomy and the persistence contract.

pub mod activity;
pub mod error;
pub mod user;

pub use activity::{Comment, Rating, Reservation, UserActivity};
pub use error::{DomainError, DomainResult};
pub use user::{User, UserProfile, UserStore};
