//! User management service
//!
//! Passwords are hashed before they reach the store, and single-user reads
//! are merged with peer activity. HTTP handlers only delegate here.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::application::identity::CredentialManager;
use crate::application::ports::{ActivityProvider, KeyValueRegistry};
use crate::domain::{DomainError, DomainResult, User, UserActivity, UserProfile, UserStore};

/// Registry key and deadlines the service needs at call time.
#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    /// Registry key holding the token signing secret
    pub secret_key: String,
    /// Upper bound on one `get_user`: the store read plus the three peer fetches
    pub aggregation_deadline: Duration,
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            secret_key: "jwtSecret".to_string(),
            aggregation_deadline: Duration::from_secs(10),
        }
    }
}

/// Orchestrates all identity use-cases.
///
/// Every collaborator is injected; the service holds no mutable state.
pub struct UserService {
    store: Arc<dyn UserStore>,
    activity: Arc<dyn ActivityProvider>,
    registry: Arc<dyn KeyValueRegistry>,
    credentials: CredentialManager,
    config: UserServiceConfig,
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        activity: Arc<dyn ActivityProvider>,
        registry: Arc<dyn KeyValueRegistry>,
        credentials: CredentialManager,
        config: UserServiceConfig,
    ) -> Self {
        Self {
            store,
            activity,
            registry,
            credentials,
            config,
        }
    }

    // ── Commands ────────────────────────────────────────────────

    pub async fn create_user(&self, username: &str, password: &str) -> DomainResult<()> {
        const METHOD: &str = "CreateUser";
        let hash = self
            .credentials
            .hash_password_task(password)
            .await
            .map_err(|e| failed(METHOD, e))?;
        let user = self
            .store
            .create_user(username, &hash)
            .await
            .map_err(|e| failed(METHOD, e))?;

        info!(method = METHOD, user_id = %user.id, username = %user.username, "user created");
        Ok(())
    }

    /// Overwrite the username; the password hash is replaced only when a
    /// new password is supplied.
    pub async fn update_user(
        &self,
        id: &str,
        username: &str,
        password: Option<&str>,
    ) -> DomainResult<()> {
        const METHOD: &str = "UpdateUser";
        let hash = match password {
            Some(p) => Some(
                self.credentials
                    .hash_password_task(p)
                    .await
                    .map_err(|e| failed(METHOD, e))?,
            ),
            None => None,
        };
        self.store
            .update_user(id, username, hash.as_deref())
            .await
            .map_err(|e| failed(METHOD, e))?;

        info!(method = METHOD, user_id = id, "user updated");
        Ok(())
    }

    pub async fn delete_user(&self, id: &str) -> DomainResult<()> {
        const METHOD: &str = "DeleteUser";
        self.store
            .delete_user(id)
            .await
            .map_err(|e| failed(METHOD, e))?;

        info!(method = METHOD, user_id = id, "user deleted");
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Fetch the identity record, then ratings, comments and reservations
    /// in that order. The first failing fetch aborts the whole call and
    /// nothing fetched so far is returned.
    pub async fn get_user(&self, id: &str) -> DomainResult<UserProfile> {
        const METHOD: &str = "GetUser";
        let deadline = self.config.aggregation_deadline;
        let profile = tokio::time::timeout(deadline, self.load_profile(id))
            .await
            .map_err(|_| {
                DomainError::Upstream(format!(
                    "user read exceeded {}ms",
                    deadline.as_millis()
                ))
            })
            .and_then(|res| res)
            .map_err(|e| failed(METHOD, e))?;

        info!(method = METHOD, user_id = %profile.user.id, "user fetched");
        Ok(profile)
    }

    pub async fn get_users(&self) -> DomainResult<Vec<User>> {
        const METHOD: &str = "GetUsers";
        let users = self.store.list_users().await.map_err(|e| failed(METHOD, e))?;

        info!(method = METHOD, count = users.len(), "users listed");
        Ok(users)
    }

    async fn load_profile(&self, id: &str) -> DomainResult<UserProfile> {
        let user = self.store.get_user(id).await?;
        let activity = self.aggregate_activity(&user.id).await?;
        Ok(UserProfile { user, activity })
    }

    async fn aggregate_activity(&self, user_id: &str) -> DomainResult<UserActivity> {
        let ratings = self.activity.fetch_ratings(user_id).await?;
        let comments = self.activity.fetch_comments(user_id).await?;
        let reservations = self.activity.fetch_reservations(user_id).await?;
        Ok(UserActivity {
            ratings,
            comments,
            reservations,
        })
    }

    // ── Authentication ──────────────────────────────────────────

    /// Log in and return a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> DomainResult<String> {
        self.authenticate_and_issue(username, password)
            .await
            .map_err(|e| failed("UserLogin", e))
    }

    /// Look the user up by username, verify the password and sign a token
    /// with the registry-resolved secret.
    ///
    /// An unknown username and a wrong password both yield `AuthFailed`
    /// after one bcrypt verify; only the log line tells them apart.
    pub async fn authenticate_and_issue(
        &self,
        username: &str,
        password: &str,
    ) -> DomainResult<String> {
        let found = self.store.find_by_username(username).await?;
        let matched = self
            .credentials
            .verify_password_task(password, found.as_ref().map(|u| u.password_hash.as_str()))
            .await?;

        let Some(user) = found else {
            warn!(username, reason = "unknown username", "login rejected");
            return Err(DomainError::AuthFailed);
        };
        if !matched {
            warn!(username, user_id = %user.id, reason = "password mismatch", "login rejected");
            return Err(DomainError::AuthFailed);
        }

        let secret = self.registry.resolve(&self.config.secret_key).await?;
        let token = self.credentials.issue_token(&user, &secret)?;

        info!(user_id = %user.id, username = %user.username, "user logged in");
        Ok(token)
    }

    /// Verify a bearer token against the current registry secret.
    pub async fn verify_token(&self, token: &str) -> DomainResult<String> {
        const METHOD: &str = "VerifyToken";
        let secret = self
            .registry
            .resolve(&self.config.secret_key)
            .await
            .map_err(|e| failed(METHOD, e))?;
        self.credentials
            .parse_token(token, &secret)
            .map_err(|e| failed(METHOD, e))
    }
}

// ── Helpers ─────────────────────────────────────────────────────

/// Log a failed operation with its method name and hand the error back unchanged.
fn failed(method: &'static str, err: DomainError) -> DomainError {
    match &err {
        DomainError::NotFound { .. } | DomainError::AuthFailed | DomainError::Conflict(_) => {
            warn!(method, error = %err, "request failed")
        }
        _ => error!(method, error = %err, "request failed"),
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    use crate::domain::{Comment, Rating, Reservation};
    use crate::infrastructure::database::repositories::user_repository::tests::memory_store;
    use crate::infrastructure::registry::StaticRegistry;

    const SECRET: &str = "test-secret";

    /// Peer fake; `fail_on` names the fetch that should fail.
    #[derive(Default)]
    struct FakeActivity {
        fail_on: Option<&'static str>,
        hang: bool,
        calls: AtomicUsize,
    }

    impl FakeActivity {
        fn check(&self, which: &'static str) -> DomainResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(which) {
                return Err(DomainError::Upstream(format!("{} returned 500", which)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ActivityProvider for FakeActivity {
        async fn fetch_ratings(&self, user_id: &str) -> DomainResult<Vec<Rating>> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.check("ratings")?;
            Ok(vec![Rating {
                id: "r1".into(),
                charger_id: "c1".into(),
                user_id: user_id.into(),
                rating: 5,
                created: String::new(),
                modified: String::new(),
            }])
        }

        async fn fetch_comments(&self, user_id: &str) -> DomainResult<Vec<Comment>> {
            self.check("comments")?;
            Ok(vec![Comment {
                id: "m1".into(),
                charger_id: "c1".into(),
                user_id: user_id.into(),
                text: "fast charger".into(),
                created: String::new(),
                modified: String::new(),
            }])
        }

        async fn fetch_reservations(&self, _user_id: &str) -> DomainResult<Vec<Reservation>> {
            self.check("reservations")?;
            Ok(Vec::new())
        }
    }

    async fn service_with(activity: FakeActivity, registry: StaticRegistry) -> UserService {
        UserService::new(
            Arc::new(memory_store().await),
            Arc::new(activity),
            Arc::new(registry),
            CredentialManager::new(4, ChronoDuration::hours(24)),
            UserServiceConfig {
                secret_key: "jwtSecret".into(),
                aggregation_deadline: Duration::from_millis(200),
            },
        )
    }

    fn registry() -> StaticRegistry {
        StaticRegistry::new(HashMap::from([("jwtSecret".to_string(), SECRET.to_string())]))
    }

    async fn service() -> UserService {
        service_with(FakeActivity::default(), registry()).await
    }

    async fn id_of(service: &UserService, username: &str) -> String {
        service
            .get_users()
            .await
            .unwrap()
            .into_iter()
            .find(|u| u.username == username)
            .map(|u| u.id)
            .unwrap()
    }

    #[tokio::test]
    async fn create_then_list_stores_a_hash() {
        let service = service().await;
        service.create_user("alice", "pw1").await.unwrap();

        let users = service.get_users().await.unwrap();
        let alices: Vec<_> = users.iter().filter(|u| u.username == "alice").collect();
        assert_eq!(alices.len(), 1);
        assert_ne!(alices[0].password_hash, "pw1");
        assert!(alices[0].password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn get_user_merges_activity() {
        let service = service().await;
        service.create_user("alice", "pw1").await.unwrap();
        let id = id_of(&service, "alice").await;

        let profile = service.get_user(&id).await.unwrap();
        assert_eq!(profile.user.username, "alice");
        assert_eq!(profile.activity.ratings.len(), 1);
        assert_eq!(profile.activity.ratings[0].user_id, id);
        assert_eq!(profile.activity.comments.len(), 1);
        assert!(profile.activity.reservations.is_empty());
    }

    #[tokio::test]
    async fn failing_comment_fetch_fails_the_whole_read() {
        let activity = FakeActivity {
            fail_on: Some("comments"),
            ..Default::default()
        };
        let service = service_with(activity, registry()).await;
        service.create_user("alice", "pw1").await.unwrap();
        let id = id_of(&service, "alice").await;

        let err = service.get_user(&id).await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
    }

    #[tokio::test]
    async fn failing_ratings_skips_later_fetches() {
        let activity = Arc::new(FakeActivity {
            fail_on: Some("ratings"),
            ..Default::default()
        });
        let service = UserService::new(
            Arc::new(memory_store().await),
            activity.clone(),
            Arc::new(registry()),
            CredentialManager::new(4, ChronoDuration::hours(24)),
            UserServiceConfig::default(),
        );
        service.create_user("alice", "pw1").await.unwrap();
        let id = id_of(&service, "alice").await;

        assert!(service.get_user(&id).await.is_err());
        assert_eq!(activity.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_peer_hits_the_deadline() {
        let activity = FakeActivity {
            hang: true,
            ..Default::default()
        };
        let service = service_with(activity, registry()).await;
        service.create_user("alice", "pw1").await.unwrap();
        let id = id_of(&service, "alice").await;

        let err = service.get_user(&id).await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
    }

    #[tokio::test]
    async fn get_unknown_user_is_not_found() {
        let service = service().await;
        let err = service
            .get_user("5d0e7f3c-1111-4222-8333-944455556666")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn login_returns_token_for_the_user() {
        let service = service().await;
        service.create_user("alice", "pw1").await.unwrap();
        let id = id_of(&service, "alice").await;

        let token = service.login("alice", "pw1").await.unwrap();
        assert_eq!(service.verify_token(&token).await.unwrap(), id);
    }

    #[tokio::test]
    async fn unknown_username_and_wrong_password_look_the_same() {
        let service = service().await;
        service.create_user("alice", "pw1").await.unwrap();

        let unknown = service.login("bob", "pw1").await.unwrap_err();
        let wrong = service.login("alice", "nope").await.unwrap_err();
        assert!(matches!(unknown, DomainError::AuthFailed));
        assert!(matches!(wrong, DomainError::AuthFailed));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn update_replaces_credentials() {
        let service = service().await;
        service.create_user("alice", "pw1").await.unwrap();
        let id = id_of(&service, "alice").await;

        service.update_user(&id, "alice2", Some("pw2")).await.unwrap();

        let token = service.login("alice2", "pw2").await.unwrap();
        assert_eq!(service.verify_token(&token).await.unwrap(), id);
        assert!(matches!(
            service.login("alice", "pw1").await.unwrap_err(),
            DomainError::AuthFailed
        ));
    }

    #[tokio::test]
    async fn update_without_password_keeps_the_hash() {
        let service = service().await;
        service.create_user("alice", "pw1").await.unwrap();
        let id = id_of(&service, "alice").await;

        service.update_user(&id, "alice2", None).await.unwrap();
        assert!(service.login("alice2", "pw1").await.is_ok());
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let service = service().await;
        service.create_user("alice", "pw1").await.unwrap();
        let id = id_of(&service, "alice").await;

        service.delete_user(&id).await.unwrap();
        let err = service.delete_user(&id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn missing_secret_fails_login_as_upstream() {
        let service = service_with(FakeActivity::default(), StaticRegistry::default()).await;
        service.create_user("alice", "pw1").await.unwrap();

        let err = service.login("alice", "pw1").await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
    }

    #[tokio::test]
    async fn rotated_secret_rejects_old_tokens() {
        let registry = Arc::new(registry());
        let service = UserService::new(
            Arc::new(memory_store().await),
            Arc::new(FakeActivity::default()),
            registry.clone(),
            CredentialManager::new(4, ChronoDuration::hours(24)),
            UserServiceConfig::default(),
        );
        service.create_user("alice", "pw1").await.unwrap();
        let token = service.login("alice", "pw1").await.unwrap();

        registry.set("jwtSecret", "rotated");
        let err = service.verify_token(&token).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidToken(_)));
    }

    async fn service_at_cost(cost: u32) -> UserService {
        UserService::new(
            Arc::new(memory_store().await),
            Arc::new(FakeActivity::default()),
            Arc::new(registry()),
            CredentialManager::new(cost, ChronoDuration::hours(24)),
            UserServiceConfig::default(),
        )
    }

    #[tokio::test]
    async fn unknown_username_costs_a_bcrypt_verify() {
        let service = service_at_cost(10).await;
        service.create_user("alice", "pw1").await.unwrap();

        let started = std::time::Instant::now();
        assert!(service.login("alice", "nope").await.is_err());
        let wrong_password = started.elapsed();

        let started = std::time::Instant::now();
        assert!(service.login("nobody", "nope").await.is_err());
        let unknown_user = started.elapsed();

        assert!(
            unknown_user * 3 >= wrong_password,
            "unknown user took {:?}, wrong password {:?}",
            unknown_user,
            wrong_password
        );
    }

    #[tokio::test]
    async fn hashing_does_not_block_the_runtime() {
        let service = service_at_cost(12).await;
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        service.create_user("alice", "pw1").await.unwrap();
        ticker.abort();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    /// Store whose single-user read never completes.
    struct StalledStore;

    #[async_trait]
    impl UserStore for StalledStore {
        async fn create_user(&self, _: &str, _: &str) -> DomainResult<User> {
            Err(DomainError::Persistence("read-only".into()))
        }

        async fn get_user(&self, _: &str) -> DomainResult<User> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(DomainError::Persistence("unreachable".into()))
        }

        async fn find_by_username(&self, _: &str) -> DomainResult<Option<User>> {
            Ok(None)
        }

        async fn list_users(&self) -> DomainResult<Vec<User>> {
            Ok(Vec::new())
        }

        async fn update_user(&self, _: &str, _: &str, _: Option<&str>) -> DomainResult<()> {
            Ok(())
        }

        async fn delete_user(&self, _: &str) -> DomainResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_store_read_hits_the_deadline() {
        let service = UserService::new(
            Arc::new(StalledStore),
            Arc::new(FakeActivity::default()),
            Arc::new(registry()),
            CredentialManager::new(4, ChronoDuration::hours(24)),
            UserServiceConfig {
                secret_key: "jwtSecret".into(),
                aggregation_deadline: Duration::from_millis(100),
            },
        );

        let started = std::time::Instant::now();
        let err = service
            .get_user("5d0e7f3c-1111-4222-8333-944455556666")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
