//! Password hashing and bearer-token lifecycle.

use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use crate::domain::{DomainError, DomainResult, User};
use crate::infrastructure::crypto::jwt::{create_token, verify_token};
use crate::infrastructure::crypto::password::{
    hash_password, verify_password, MAX_PASSWORD_BYTES, PASSWORD_COST,
};

/// Only ever verified against the decoy hash.
const DECOY_PASSWORD: &str = "decoy password for unknown usernames";

/// Hashes and verifies passwords, signs and parses tokens.
///
/// Stateless: the signing secret is passed per call so that rotating it in
/// the registry takes effect on the next issue without a restart.
#[derive(Debug, Clone)]
pub struct CredentialManager {
    cost: u32,
    token_ttl: Duration,
    /// Hash at `cost` checked when there is no stored hash, so an unknown
    /// username costs one bcrypt verify like a wrong password does.
    decoy_hash: Arc<str>,
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self::new(PASSWORD_COST, Duration::hours(24))
    }
}

impl CredentialManager {
    /// Hashes the decoy password once, so this takes one bcrypt round at `cost`.
    pub fn new(cost: u32, token_ttl: Duration) -> Self {
        let decoy_hash = hash_password(DECOY_PASSWORD, cost).unwrap_or_default();
        Self {
            cost,
            token_ttl,
            decoy_hash: decoy_hash.into(),
        }
    }

    /// One-way bcrypt hash. Inputs longer than bcrypt can see are rejected
    /// instead of being silently truncated.
    pub fn hash_password(&self, plain: &str) -> DomainResult<String> {
        if plain.len() > MAX_PASSWORD_BYTES {
            return Err(DomainError::Hashing(format!(
                "password exceeds {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        hash_password(plain, self.cost).map_err(|e| DomainError::Hashing(e.to_string()))
    }

    /// `false` on mismatch and on a malformed stored hash alike.
    pub fn verify_password(&self, plain: &str, hash: &str) -> bool {
        verify_password(plain, hash).unwrap_or(false)
    }

    /// [`hash_password`](Self::hash_password) on the blocking pool.
    pub async fn hash_password_task(&self, plain: &str) -> DomainResult<String> {
        let manager = self.clone();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || manager.hash_password(&plain))
            .await
            .map_err(|e| DomainError::Hashing(format!("hashing task failed: {}", e)))?
    }

    /// Verify on the blocking pool. With no stored hash the decoy hash is
    /// checked instead and the result is always `false`.
    pub async fn verify_password_task(
        &self,
        plain: &str,
        stored: Option<&str>,
    ) -> DomainResult<bool> {
        let manager = self.clone();
        let plain = plain.to_owned();
        let stored = stored.map(str::to_owned);
        tokio::task::spawn_blocking(move || match stored {
            Some(hash) => manager.verify_password(&plain, &hash),
            None => {
                manager.verify_password(&plain, &manager.decoy_hash);
                false
            }
        })
        .await
        .map_err(|e| DomainError::Hashing(format!("verify task failed: {}", e)))
    }

    /// Sign a token carrying the user's id and username, expiring one TTL from now.
    pub fn issue_token(&self, user: &User, secret: &str) -> DomainResult<String> {
        if secret.is_empty() {
            return Err(DomainError::Signing("signing secret is empty".into()));
        }
        let token = create_token(&user.id, &user.username, self.token_ttl, secret)
            .map_err(|e| DomainError::Signing(e.to_string()))?;
        debug!(user_id = %user.id, "token issued");
        Ok(token)
    }

    /// Verify signature and expiry and return the embedded user id.
    pub fn parse_token(&self, token: &str, secret: &str) -> DomainResult<String> {
        if secret.is_empty() {
            return Err(DomainError::InvalidToken("signing secret is empty".into()));
        }
        verify_token(token, secret)
            .map(|claims| claims.user_id)
            .map_err(|e| DomainError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn manager() -> CredentialManager {
        CredentialManager::new(4, Duration::hours(24))
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: "6f1c1c8e-4b4e-4a55-9d55-3e0d8f0f6a11".into(),
            username: "alice".into(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn hash_verifies_and_never_equals_plaintext() {
        let m = manager();
        for plain in ["pw1", "correct horse battery staple", "ünïcödé", ""] {
            let hash = m.hash_password(plain).unwrap();
            assert_ne!(hash, plain);
            assert!(m.verify_password(plain, &hash));
        }
    }

    #[test]
    fn wrong_password_is_false() {
        let m = manager();
        let hash = m.hash_password("pw1").unwrap();
        assert!(!m.verify_password("pw2", &hash));
    }

    #[test]
    fn malformed_hash_is_false_not_error() {
        assert!(!manager().verify_password("pw1", "garbage"));
        assert!(!manager().verify_password("pw1", ""));
    }

    #[test]
    fn oversize_password_is_hashing_error() {
        let long = "x".repeat(MAX_PASSWORD_BYTES + 1);
        let err = manager().hash_password(&long).unwrap_err();
        assert!(matches!(err, DomainError::Hashing(_)));
    }

    #[tokio::test]
    async fn missing_stored_hash_never_verifies() {
        let m = manager();
        assert!(!m.verify_password_task("pw1", None).await.unwrap());
        assert!(!m.verify_password_task(DECOY_PASSWORD, None).await.unwrap());

        let hash = m.hash_password_task("pw1").await.unwrap();
        assert!(m.verify_password_task("pw1", Some(&hash)).await.unwrap());
        assert!(!m.verify_password_task("pw2", Some(&hash)).await.unwrap());
    }

    #[test]
    fn decoy_hash_uses_the_configured_cost() {
        assert!(manager().decoy_hash.starts_with("$2b$04$"));
    }

    #[test]
    fn token_round_trip_returns_user_id() {
        let m = manager();
        let u = user();
        let token = m.issue_token(&u, "s3cret").unwrap();
        assert_eq!(m.parse_token(&token, "s3cret").unwrap(), u.id);
    }

    #[test]
    fn token_with_other_secret_is_invalid() {
        let m = manager();
        let token = m.issue_token(&user(), "s3cret").unwrap();
        let err = m.parse_token(&token, "rotated").unwrap_err();
        assert!(matches!(err, DomainError::InvalidToken(_)));
    }

    #[test]
    fn expired_token_is_invalid() {
        let m = CredentialManager::new(4, Duration::hours(-1));
        let token = m.issue_token(&user(), "s3cret").unwrap();
        let err = m.parse_token(&token, "s3cret").unwrap_err();
        assert!(matches!(err, DomainError::InvalidToken(_)));
    }

    #[test]
    fn malformed_token_is_invalid() {
        let err = manager().parse_token("a.b.c", "s3cret").unwrap_err();
        assert!(matches!(err, DomainError::InvalidToken(_)));
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let err = manager().issue_token(&user(), "").unwrap_err();
        assert!(matches!(err, DomainError::Signing(_)));
    }
}
