//! Consul KV client
//!
//! Reads raw values with `GET {address}/v1/kv/{key}?raw`. Nothing is cached:
//! every lookup hits Consul so rotated secrets and moved peers take effect
//! on the next request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::application::ports::KeyValueRegistry;
use crate::domain::{DomainError, DomainResult};

pub struct ConsulRegistry {
    client: Client,
    base_url: String,
}

impl ConsulRegistry {
    /// `address` may omit the scheme, as `CONSUL_ADDR` usually does.
    pub fn new(address: &str, timeout: Duration) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Upstream(format!("registry client: {}", e)))?;
        Ok(Self {
            client,
            base_url: normalize_address(address),
        })
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/v1/kv/{}?raw", self.base_url, key)
    }
}

fn normalize_address(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[async_trait]
impl KeyValueRegistry for ConsulRegistry {
    async fn resolve(&self, key: &str) -> DomainResult<String> {
        let url = self.key_url(key);
        debug!(key, url = %url, "resolving registry key");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::Upstream(format!("registry request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(DomainError::Upstream(format!(
                    "registry key '{}' missing",
                    key
                )))
            }
            status if !status.is_success() => {
                return Err(DomainError::Upstream(format!(
                    "registry returned {} for '{}'",
                    status, key
                )))
            }
            _ => {}
        }

        let value = response
            .text()
            .await
            .map_err(|e| DomainError::Upstream(format!("registry body unreadable: {}", e)))?;
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(DomainError::Upstream(format!(
                "registry key '{}' missing",
                key
            )));
        }
        Ok(value)
    }
}
