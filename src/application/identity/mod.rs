//! Identity: user management and authentication
//!
//! Contains the `CredentialManager` (hashing and tokens) and the
//! `UserService` which orchestrates every user-related use-case.

pub mod credentials;
pub mod service;

pub use credentials::CredentialManager;
pub use service::{UserService, UserServiceConfig};
