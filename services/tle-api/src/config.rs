use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use tlerelay_core::{CoreError, LogFormat, RelayConfig};

pub const ENV_CONFIG_PATH: &str = "TLE_RELAY_CONFIG";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

#[derive(Debug, Clone)]
pub struct Config {
    pub relay: RelayConfig,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, CoreError> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_kv(&vars)
    }

    /// `TLE_RELAY_CONFIG` names an optional TOML file; other keys override it.
    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, CoreError> {
        let path = kv
            .get(ENV_CONFIG_PATH)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let relay = RelayConfig::load(path.as_deref(), kv)?;

        let log_format = kv
            .get(ENV_LOG_FORMAT)
            .map(|raw| raw.parse::<LogFormat>())
            .transpose()
            .map_err(|reason| CoreError::InvalidOverride {
                key: ENV_LOG_FORMAT.to_string(),
                reason,
            })?
            .unwrap_or_default();

        Ok(Config { relay, log_format })
    }
}
