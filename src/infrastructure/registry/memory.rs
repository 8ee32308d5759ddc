use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::ports::KeyValueRegistry;
use crate::domain::{DomainError, DomainResult};

/// Fixed key/value map standing in for Consul.
///
/// Values can be replaced at runtime with [`StaticRegistry::set`].
#[derive(Debug, Default)]
pub struct StaticRegistry {
    values: DashMap<String, String>,
}

impl StaticRegistry {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl KeyValueRegistry for StaticRegistry {
    async fn resolve(&self, key: &str) -> DomainResult<String> {
        self.values
            .get(key)
            .map(|v| v.value().clone())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DomainError::Upstream(format!("registry key '{}' missing", key)))
    }
}
