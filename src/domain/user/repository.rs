use async_trait::async_trait;

use super::User;
use crate::domain::DomainResult;

/// Persistence contract for identity records.
///
/// Implementations never hash: callers hand over finished bcrypt hashes.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new record with `created = modified = now`.
    async fn create_user(&self, username: &str, password_hash: &str) -> DomainResult<User>;

    /// Fetch by primary key. Ids that are not UUIDs are reported as `NotFound`.
    async fn get_user(&self, id: &str) -> DomainResult<User>;

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;

    /// Unfiltered scan of every record.
    async fn list_users(&self) -> DomainResult<Vec<User>>;

    /// Overwrite username (and the hash, when given) and bump `modified`.
    async fn update_user(
        &self,
        id: &str,
        username: &str,
        password_hash: Option<&str>,
    ) -> DomainResult<()>;

    /// Hard delete; `NotFound` when nothing matched.
    async fn delete_user(&self, id: &str) -> DomainResult<()>;
}
