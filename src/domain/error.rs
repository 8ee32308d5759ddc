//! Domain errors

use thiserror::Error;

/// Error kinds surfaced by the service layer.
///
/// Every dependency failure is mapped onto one of these variants at the
/// layer boundary and then propagated unchanged in kind up to the
/// transport, which maps it to a status code.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Malformed input rejected before reaching the store
    #[error("Validation: {0}")]
    Validation(String),

    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Credential mismatch or unknown username on login
    #[error("Authentication failed")]
    AuthFailed,

    #[error("Already exists: {0}")]
    Conflict(String),

    /// Storage unavailable or a record failed to decode
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Peer service or registry call failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl DomainError {
    pub fn user_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "User",
            field: "id",
            value: id.to_string(),
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
