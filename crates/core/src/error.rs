//! Core error types

use thiserror::Error;

/// Errors raised while loading or validating relay configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`crate::RelayConfig`]
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// An override value could not be parsed
    #[error("Invalid value for {key}: {reason}")]
    InvalidOverride {
        /// Environment key that carried the value
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// A required setting is missing or empty
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
