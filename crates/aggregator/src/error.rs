//! Error types for aggregation runs.
//!
//! Transport errors (an upstream answered with a non-2xx status, or never
//! answered) and protocol errors (a 2xx answer that is missing something we
//! need) are both fatal to the run. Budget exhaustion and absent data are not
//! errors and never show up here.

use thiserror::Error;

/// Errors that abort an aggregation run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    /// Upstream answered with a non-2xx status
    #[error("remote {backend} responded with {status} {status_text}")]
    Transport {
        /// Backend name
        backend: String,
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase
        status_text: String,
    },

    /// Request never produced a response
    #[error("remote {backend} request failed: {reason}")]
    Network {
        /// Backend name
        backend: String,
        /// Underlying failure
        reason: String,
    },

    /// Catalog response lacks the top-level `data` field
    #[error("\"data\" field missing in {backend} response{}", detail_suffix(.detail))]
    MissingData {
        /// Backend name
        backend: String,
        /// First GraphQL error message, when the upstream sent one
        detail: Option<String>,
    },

    /// Tracking response lacks the TLE text field
    #[error("no TLE field in response from {backend} for NORAD ID {norad_id}")]
    MissingTle {
        /// Backend name
        backend: String,
        /// NORAD id that was requested
        norad_id: i64,
    },

    /// A JSON answer was required but the content type was something else
    #[error("remote {backend} did not respond with JSON. Response text: {body}")]
    NotJson {
        /// Backend name
        backend: String,
        /// Raw response text
        body: String,
    },

    /// Content type said JSON but the body did not parse
    #[error("remote {backend} sent malformed JSON: {reason}")]
    MalformedJson {
        /// Backend name
        backend: String,
        /// Parser message
        reason: String,
    },

    /// JSON parsed but did not have the expected structure
    #[error("unexpected {backend} response shape: {reason}")]
    UnexpectedShape {
        /// Backend name
        backend: String,
        /// Decoder message
        reason: String,
    },

    /// Gateway call rejected before it was sent
    #[error("invalid remote request: {0}")]
    InvalidRequest(String),
}

impl AggregationError {
    /// Upstream status or network failure.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AggregationError::Transport { .. } | AggregationError::Network { .. }
        )
    }

    /// A 2xx answer we could not use.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            AggregationError::MissingData { .. }
                | AggregationError::MissingTle { .. }
                | AggregationError::NotJson { .. }
                | AggregationError::MalformedJson { .. }
                | AggregationError::UnexpectedShape { .. }
        )
    }
}

/// Result type for aggregation operations.
pub type RunResult<T> = Result<T, AggregationError>;

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}
