//! Application configuration
//!
//! Loaded from `~/.config/users-service/config.toml` unless overridden.
//! Every section has defaults, so a partial file (or none at all) is valid.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! url = "postgres://users:${DB_PASSWORD}@db:5432/users"
//!
//! [registry]
//! address = "consul:8500"
//!
//! [security]
//! bcrypt_cost = 14
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::crypto::password::PASSWORD_COST;

/// Placeholder in `database.url` replaced by the `DBpw` environment variable.
pub const DB_PASSWORD_PLACEHOLDER: &str = "${DB_PASSWORD}";
pub const DB_PASSWORD_ENV: &str = "DBpw";
pub const REGISTRY_ADDR_ENV: &str = "CONSUL_ADDR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `~/.config/users-service/config.toml`, or `./config.toml` when no
/// config directory can be determined.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("users-service").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub registry: RegistryConfig,
    pub peers: PeersConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply a Go-style listen address such as `:8080` or `127.0.0.1:9000`.
    pub fn apply_listen_addr(&mut self, addr: &str) -> Result<(), ConfigError> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::Invalid(format!("listen address '{}' has no port", addr)))?;
        self.port = port
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad port in listen address '{}'", addr)))?;
        self.host = if host.is_empty() {
            "0.0.0.0".to_string()
        } else {
            host.to_string()
        };
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Connection URL; may contain `${DB_PASSWORD}`
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./users.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseSection {
    /// URL with the password placeholder filled from `DBpw`.
    pub fn connection_url(&self) -> String {
        let password = std::env::var(DB_PASSWORD_ENV).unwrap_or_default();
        self.url.replace(DB_PASSWORD_PLACEHOLDER, &password)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Consul agent address; empty falls back to `CONSUL_ADDR`, then to
    /// `static_values`
    pub address: String,
    pub secret_key: String,
    pub ratings_comments_key: String,
    pub reservations_key: String,
    pub timeout_secs: u64,
    pub static_values: HashMap<String, String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            secret_key: "jwtSecret".to_string(),
            ratings_comments_key: "commratService".to_string(),
            reservations_key: "reservationsService".to_string(),
            timeout_secs: 5,
            static_values: HashMap::new(),
        }
    }
}

impl RegistryConfig {
    /// Configured address, else `CONSUL_ADDR`. `None` means use `static_values`.
    pub fn resolved_address(&self) -> Option<String> {
        if !self.address.trim().is_empty() {
            return Some(self.address.trim().to_string());
        }
        std::env::var(REGISTRY_ADDR_ENV)
            .ok()
            .filter(|a| !a.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeersConfig {
    pub request_timeout_secs: u64,
    pub aggregation_deadline_secs: u64,
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 5,
            aggregation_deadline_secs: 15,
        }
    }
}

impl PeersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn aggregation_deadline(&self) -> Duration {
        Duration::from_secs(self.aggregation_deadline_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub bcrypt_cost: u32,
    pub token_ttl_hours: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: PASSWORD_COST,
            token_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Read and validate `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // bcrypt accepts 4..=31
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "security.bcrypt_cost must be between 4 and 31, got {}",
                self.security.bcrypt_cost
            )));
        }
        if self.security.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid(
                "security.token_ttl_hours must be positive".to_string(),
            ));
        }
        if self.peers.aggregation_deadline_secs == 0 || self.peers.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "peers timeouts must be non-zero".to_string(),
            ));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url is empty".to_string()));
        }
        Ok(())
    }
}
