use chrono::{DateTime, Utc};

use crate::domain::activity::UserActivity;

/// Identity record as held by the store.
#[derive(Clone, Debug)]
pub struct User {
    /// Store-assigned UUID, immutable after creation
    pub id: String,
    pub username: String,
    /// bcrypt hash; never a plaintext password
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user merged with the activity fetched from peer services.
///
/// Only `GetUser` produces this; store copies never carry activity.
#[derive(Clone, Debug)]
pub struct UserProfile {
    pub user: User,
    pub activity: UserActivity,
}
