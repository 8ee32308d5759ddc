//! Outbound ports: capabilities the service layer calls out to
//!
//! [`KeyValueRegistry`] resolves peer addresses and the signing secret at
//! call time; [`ActivityProvider`] fetches activity owned by peer services.
//! Both are injected at construction so tests can substitute fakes.

use async_trait::async_trait;

use crate::domain::{Comment, DomainResult, Rating, Reservation};

/// Runtime key/value lookup (Consul KV in production).
#[async_trait]
pub trait KeyValueRegistry: Send + Sync {
    /// Resolve `key` to its current value. A missing key is an `Upstream` error.
    async fn resolve(&self, key: &str) -> DomainResult<String>;
}

/// Read-only access to a user's activity in peer services.
///
/// Each call is independent; any failure surfaces as `Upstream`.
#[async_trait]
pub trait ActivityProvider: Send + Sync {
    async fn fetch_ratings(&self, user_id: &str) -> DomainResult<Vec<Rating>>;
    async fn fetch_comments(&self, user_id: &str) -> DomainResult<Vec<Comment>>;
    async fn fetch_reservations(&self, user_id: &str) -> DomainResult<Vec<Reservation>>;
}
