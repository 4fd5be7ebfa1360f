//! # Configuration
//!
//! [`ReconcileConfig`] gathers the few knobs reconciliation has. It can be
//! built in code, deserialized by whatever configuration layer the embedding
//! application uses (every field has a default), or read from the environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `CATALOG_BASE_URL` | `base_url` | `http://localhost:8080/resource/api` |
//! | `CATALOG_REFETCH_MATCHES` | `refetch_matches` | `true` |
//! | `CATALOG_STORE_LATENCY_MS` | `store_latency_ms` | `0` |

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const BASE_URL_VAR: &str = "CATALOG_BASE_URL";
pub const REFETCH_MATCHES_VAR: &str = "CATALOG_REFETCH_MATCHES";
pub const STORE_LATENCY_VAR: &str = "CATALOG_STORE_LATENCY_MS";

/// Errors while reading configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings shared by adapters, linker and the in-memory store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Prefix of the store's resource hrefs, e.g. `http://host/resource/api`.
    pub base_url: String,
    /// Re-fetch a search match as a full envelope before returning it.
    pub refetch_matches: bool,
    /// Request channel capacity of the in-memory store.
    pub store_buffer: usize,
    /// Simulated round-trip time of the in-memory store.
    pub store_latency_ms: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/resource/api".to_string(),
            refetch_matches: true,
            store_buffer: 32,
            store_latency_ms: 0,
        }
    }
}

impl ReconcileConfig {
    /// Defaults overridden by any `CATALOG_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base_url) = lookup(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        if let Some(value) = lookup(REFETCH_MATCHES_VAR) {
            config.refetch_matches = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: REFETCH_MATCHES_VAR,
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup(STORE_LATENCY_VAR) {
            config.store_latency_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        var: STORE_LATENCY_VAR,
                        value: value.clone(),
                    })?;
        }

        debug!(?config, "Loaded configuration");
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_refetch_matches(mut self, refetch: bool) -> Self {
        self.refetch_matches = refetch;
        self
    }

    /// Sets the demo store latency, saturating at `u64::MAX` milliseconds.
    pub fn with_store_latency(mut self, latency: Duration) -> Self {
        self.store_latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn store_latency(&self) -> Duration {
        Duration::from_millis(self.store_latency_ms)
    }
}
