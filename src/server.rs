//! Users service runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: database init and migrations,
//! registry and peer clients, the REST API, metrics, and graceful shutdown.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::application::ports::KeyValueRegistry;
use crate::application::{CredentialManager, UserService, UserServiceConfig};
use crate::config::AppConfig;
use crate::infrastructure::database::repositories::SeaOrmUserStore;
use crate::infrastructure::{
    init_database, run_migrations, ConsulRegistry, DatabaseConfig, HttpActivityAggregator,
    PeerKeys, StaticRegistry,
};
use crate::interfaces::http::{create_api_router, RouterDeps};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running users service.
///
/// ```rust,no_run
/// use users_service::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the REST API is bound to.
    pub local_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Connect the database, build the service graph and start serving.
    ///
    /// Any failure here is fatal: the caller should exit non-zero.
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting users service...");

        let prometheus = prometheus_handle();

        // ── Database ───────────────────────────────────────────
        let db_config = DatabaseConfig {
            url: app_cfg.database.connection_url(),
            max_connections: app_cfg.database.max_connections,
            ..DatabaseConfig::default()
        };
        let db = init_database(&db_config).await?;
        if opts.auto_migrate {
            run_migrations(&db).await?;
        }

        // ── Registry & peers ───────────────────────────────────
        let registry = build_registry(&app_cfg)?;
        let activity = HttpActivityAggregator::new(
            registry.clone(),
            PeerKeys {
                ratings_comments: app_cfg.registry.ratings_comments_key.clone(),
                reservations: app_cfg.registry.reservations_key.clone(),
            },
            app_cfg.peers.request_timeout(),
        )?;

        // ── Service ────────────────────────────────────────────
        let (cost, ttl) = (
            app_cfg.security.bcrypt_cost,
            chrono::Duration::hours(app_cfg.security.token_ttl_hours),
        );
        let credentials =
            tokio::task::spawn_blocking(move || CredentialManager::new(cost, ttl)).await?;
        let user_service = Arc::new(UserService::new(
            Arc::new(SeaOrmUserStore::new(db.clone())),
            Arc::new(activity),
            registry,
            credentials,
            UserServiceConfig {
                secret_key: app_cfg.registry.secret_key.clone(),
                aggregation_deadline: app_cfg.peers.aggregation_deadline(),
            },
        ));
        info!(
            bcrypt_cost = app_cfg.security.bcrypt_cost,
            token_ttl_hours = app_cfg.security.token_ttl_hours,
            "Credential manager configured"
        );

        // ── REST API ───────────────────────────────────────────
        let shutdown = ShutdownCoordinator::new(std::time::Duration::from_secs(
            app_cfg.server.shutdown_timeout_secs,
        ));
        let router = create_api_router(RouterDeps {
            user_service,
            db: db.clone(),
            metrics: prometheus,
        });

        let listener = tokio::net::TcpListener::bind(app_cfg.server.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/swagger-ui/", local_addr);

        let api_shutdown = shutdown.signal();
        let api_task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                api_shutdown.wait().await;
                info!("REST API received shutdown signal");
            });
            if let Err(e) = server.await {
                error!(error = %e, "REST API server error");
            }
        });

        Ok(Self {
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for in-flight requests to drain, bounded by the shutdown
    /// timeout, then close the database.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            api_task,
            ..
        } = self;

        let drained = shutdown
            .shutdown_with_cleanup(move || async move {
                match api_task.await {
                    Ok(()) => info!("REST API stopped"),
                    Err(e) => error!(error = %e, "REST API task panicked"),
                }
            })
            .await;
        if !drained {
            warn!("Shutdown timed out with requests still in flight");
        }

        if let Err(e) = db.close().await {
            warn!(error = %e, "Error closing database connection");
        } else {
            info!("Database connection closed");
        }
        info!("Users service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can only be installed once per process; later
/// starts reuse the first handle. `None` if installation failed.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    if let Some(handle) = PROM_HANDLE.get() {
        return Some(handle.clone());
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics recorder installed");
            Some(PROM_HANDLE.get_or_init(|| handle).clone())
        }
        Err(e) => {
            warn!(error = %e, "Prometheus recorder unavailable; /metrics disabled");
            None
        }
    }
}

/// Consul when an address is configured (or in `CONSUL_ADDR`), otherwise
/// the static map from `registry.static_values`.
fn build_registry(
    app_cfg: &AppConfig,
) -> Result<Arc<dyn KeyValueRegistry>, Box<dyn std::error::Error>> {
    match app_cfg.registry.resolved_address() {
        Some(address) => {
            info!(address = %address, "Using Consul registry");
            let consul = ConsulRegistry::new(&address, app_cfg.registry.timeout())?;
            Ok(Arc::new(consul))
        }
        None => {
            if app_cfg.registry.static_values.is_empty() {
                warn!("No registry address and no static values; logins and peer fetches will fail");
            } else {
                info!(
                    keys = app_cfg.registry.static_values.len(),
                    "Using static registry values"
                );
            }
            let values: HashMap<String, String> = app_cfg.registry.static_values.clone();
            Ok(Arc::new(StaticRegistry::new(values)))
        }
    }
}

/// Initialize tracing from the application config. `RUST_LOG` wins over
/// `logging.level`.
///
/// Call once at process startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.server.shutdown_timeout_secs = 2;
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config.registry.address = String::new();
        config
            .registry
            .static_values
            .insert("jwtSecret".to_string(), "server-secret".to_string());
        config
    }

    #[tokio::test]
    async fn serves_health_and_shuts_down() {
        let handle = ServerHandle::start(ServerOptions {
            config: test_config(),
            auto_migrate: true,
        })
        .await
        .unwrap();
        assert!(handle.is_running());

        let url = format!("http://{}/health", handle.local_addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert!(resp.status().is_success());

        let url = format!("http://{}/users", handle.local_addr);
        let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert!(body["users"].as_array().unwrap().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_config_refuses_to_start() {
        let mut config = test_config();
        config.security.bcrypt_cost = 99;
        let result = ServerHandle::start(ServerOptions {
            config,
            auto_migrate: true,
        })
        .await;
        assert!(result.is_err());
    }
}
