//! Activity records owned by the rating/comment and reservation services.
//!
//! This service never writes them; they are fetched per request and
//! attached to a user view.

pub mod model;

pub use model::{Comment, Rating, Reservation, UserActivity};
