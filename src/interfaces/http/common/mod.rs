//! Shared HTTP building blocks

pub mod error;
pub mod response;
pub mod validated_json;

pub use error::ApiError;
pub use response::{ErrorResponse, StatusResponse};
pub use validated_json::{ValidatedJson, ValidatedJsonRejection};
