//! Core functionality for the TLE relay.
//!
//! This crate provides the process-wide configuration, logging setup and
//! shared error types used by the relay crates and services.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    BudgetConfig, CatalogConfig, EngineConfig, RelayConfig, ServerConfig, TrackingConfig,
    TransportConfig, DEFAULT_CALL_BUDGET,
};
pub use error::{CoreError, Result};
pub use logging::LogFormat;
