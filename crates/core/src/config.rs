//! Configuration management for the relay.
//!
//! Settings are read from an optional TOML file, then overridden by
//! environment-style key/value pairs. The result is validated once at
//! startup and treated as read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CoreError, Result};

/// Default per-run ceiling on discretionary outbound calls.
///
/// The hosting edge allows 8 subrequests per invocation; the mission lookup
/// and one spare are reserved out of that.
pub const DEFAULT_CALL_BUDGET: u32 = 6;

pub const ENV_PORT: &str = "PORT";
pub const ENV_CATALOG_URI: &str = "CATALOG_URI";
pub const ENV_CATALOG_CACHE_TTL_SECS: &str = "CATALOG_CACHE_TTL_SECS";
pub const ENV_TRACKING_URI: &str = "TRACKING_URI";
pub const ENV_TRACKING_API_KEY: &str = "TRACKING_API_KEY";
pub const ENV_CALL_BUDGET: &str = "CALL_BUDGET";
pub const ENV_PAYLOAD_LIMIT: &str = "PAYLOAD_LIMIT";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub tracking: TrackingConfig,
    pub budget: BudgetConfig,
    pub engine: EngineConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

/// Mission catalog (GraphQL) upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub uri: String,
    pub backend: String,
    /// How long catalog responses may be served from the response cache.
    /// Zero disables caching.
    pub cache_ttl_secs: u64,
}

/// Satellite tracking upstream. Responses are never cached.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub uri: String,
    pub backend: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl fmt::Debug for TrackingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingConfig")
            .field("uri", &self.uri)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub ceiling: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of payloads that get TLE lookups when the request does not say.
    /// `None` or `Some(0)` means every payload.
    pub payload_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub request_timeout_secs: u64,
    pub cache_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            uri: "https://api.spacex.land/graphql/".to_string(),
            backend: "SpaceX".to_string(),
            cache_ttl_secs: 3600,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            uri: "https://api.n2yo.com/rest/v1/satellite/".to_string(),
            backend: "n2yo".to_string(),
            api_key: String::new(),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CALL_BUDGET,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            cache_capacity: 256,
        }
    }
}

impl CatalogConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl TransportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RelayConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the optional file, apply overrides from `kv`, then validate.
    pub fn load(path: Option<&Path>, kv: &HashMap<String, String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(kv)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides. Blank values are ignored.
    pub fn apply_overrides(&mut self, kv: &HashMap<String, String>) -> Result<()> {
        if let Some(port) = parse_override(kv, ENV_PORT)? {
            self.server.port = port;
        }
        if let Some(uri) = string_override(kv, ENV_CATALOG_URI) {
            self.catalog.uri = uri;
        }
        if let Some(ttl) = parse_override(kv, ENV_CATALOG_CACHE_TTL_SECS)? {
            self.catalog.cache_ttl_secs = ttl;
        }
        if let Some(uri) = string_override(kv, ENV_TRACKING_URI) {
            self.tracking.uri = uri;
        }
        if let Some(key) = string_override(kv, ENV_TRACKING_API_KEY) {
            self.tracking.api_key = key;
        }
        if let Some(ceiling) = parse_override(kv, ENV_CALL_BUDGET)? {
            self.budget.ceiling = ceiling;
        }
        if let Some(limit) = parse_override::<usize>(kv, ENV_PAYLOAD_LIMIT)? {
            self.engine.payload_limit = (limit > 0).then_some(limit);
        }
        if let Some(secs) = parse_override(kv, ENV_REQUEST_TIMEOUT_SECS)? {
            self.transport.request_timeout_secs = secs;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog.uri.trim().is_empty() {
            return Err(CoreError::Missing("catalog.uri"));
        }
        if self.catalog.backend.trim().is_empty() {
            return Err(CoreError::Missing("catalog.backend"));
        }
        if self.tracking.uri.trim().is_empty() {
            return Err(CoreError::Missing("tracking.uri"));
        }
        if self.tracking.backend.trim().is_empty() {
            return Err(CoreError::Missing("tracking.backend"));
        }
        if self.tracking.api_key.trim().is_empty() {
            return Err(CoreError::Missing("tracking.api_key"));
        }
        Ok(())
    }
}

fn string_override(kv: &HashMap<String, String>, key: &str) -> Option<String> {
    kv.get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn parse_override<T>(kv: &HashMap<String, String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match string_override(kv, key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| CoreError::InvalidOverride {
                key: key.to_string(),
                reason: err.to_string(),
            }),
        None => Ok(None),
    }
}
