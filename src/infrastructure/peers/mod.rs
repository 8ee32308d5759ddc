//! Clients for the ratings/comments and reservations services

pub mod activity_client;

pub use activity_client::{HttpActivityAggregator, PeerKeys};
