//! Request and response bodies for `/users`

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::domain::{Comment, Rating, Reservation, User, UserProfile};
use crate::infrastructure::crypto::password::MAX_PASSWORD_BYTES;

/// bcrypt only looks at the first 72 bytes, so longer passwords are refused.
fn password_fits_bcrypt(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() || password.len() > MAX_PASSWORD_BYTES {
        let mut err = ValidationError::new("password_length");
        err.message = Some(Cow::Owned(format!(
            "must be 1 to {} bytes",
            MAX_PASSWORD_BYTES
        )));
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "alice")]
    pub username: String,
    #[validate(custom(function = "password_fits_bcrypt"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(custom(function = "password_fits_bcrypt"))]
    pub password: String,
}

/// Omitting `password` keeps the current one.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(custom(function = "password_fits_bcrypt"))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub status: String,
}

/// A user with the activity gathered from peer services
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfileResponse {
    pub username: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub ratings: Vec<Rating>,
    pub comments: Vec<Comment>,
    pub reservations: Vec<Reservation>,
}

impl From<UserProfile> for UserProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            username: profile.user.username,
            created: profile.user.created_at,
            modified: profile.user.updated_at,
            ratings: profile.activity.ratings,
            comments: profile.activity.comments,
            reservations: profile.activity.reservations,
        }
    }
}

/// List entry; password hashes never leave the service.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created: user.created_at,
            modified: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}
