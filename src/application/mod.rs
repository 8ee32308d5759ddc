//! Application layer: ports and the identity use-cases

pub mod identity;
pub mod ports;

pub use identity::{CredentialManager, UserService, UserServiceConfig};
pub use ports::{ActivityProvider, KeyValueRegistry};
