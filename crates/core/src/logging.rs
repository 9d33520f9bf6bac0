//! Structured logging setup shared by the relay binaries.
//!
//! The filter comes from `RUST_LOG` and falls back to `info`. Output is
//! either human-readable or JSON lines, picked by [`LogFormat`].

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "info";

/// Output format for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines with target and thread ids.
    #[default]
    Pretty,
    /// One JSON object per event, for log aggregation.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Initialize human-readable logging.
///
/// # Example
/// ```no_run
/// use tlerelay_core::logging;
///
/// logging::init();
/// tracing::info!("relay started");
/// ```
pub fn init() {
    init_with(LogFormat::Pretty);
}

/// Initialize JSON logging for production deployments.
///
/// # Example
/// ```no_run
/// use tlerelay_core::logging;
///
/// logging::init_json();
/// tracing::info!(service = "tle-api", "relay started");
/// ```
pub fn init_json() {
    init_with(LogFormat::Json);
}

/// Initialize the global subscriber in the requested format.
///
/// Can only be called once per process.
pub fn init_with(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter());

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init(),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}
