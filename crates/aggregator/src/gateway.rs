//! Remote Call Gateway
//!
//! Issues one request to a named upstream through a [`Transport`] and hands
//! back status, raw body and, for a 2xx answer whose content type says JSON,
//! the parsed document. A non-2xx status is an ordinary result here; deciding
//! whether it is fatal belongs to the caller. The gateway counts every call it
//! makes.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::error::{AggregationError, RunResult};

/// Methods the gateway is allowed to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Caching applied by the transport to a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Always go to the upstream.
    Pass,
    /// Successful responses may be reused for this long.
    Ttl(Duration),
}

impl CachePolicy {
    /// `Ttl(0)` collapses to `Pass`.
    pub fn ttl(ttl: Duration) -> Self {
        if ttl.is_zero() {
            CachePolicy::Pass
        } else {
            CachePolicy::Ttl(ttl)
        }
    }
}

/// One outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub backend: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub cache: CachePolicy,
}

impl RemoteRequest {
    pub fn get(uri: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            uri: uri.into(),
            backend: backend.into(),
            headers: Vec::new(),
            body: None,
            cache: CachePolicy::Pass,
        }
    }

    pub fn post(
        uri: impl Into<String>,
        backend: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            method: HttpMethod::Post,
            uri: uri.into(),
            backend: backend.into(),
            headers: Vec::new(),
            body: Some(body.into()),
            cache: CachePolicy::Pass,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    fn validate(&self) -> RunResult<()> {
        if self.uri.trim().is_empty() {
            return Err(AggregationError::InvalidRequest("uri is empty".to_string()));
        }
        if self.backend.trim().is_empty() {
            return Err(AggregationError::InvalidRequest(
                "backend name is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a transport got back from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    /// Upstream cache telemetry (`x-cache`), if the backend sent it.
    pub cache_status: Option<String>,
    pub body: String,
}

/// The request produced no response at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct TransportFailure {
    pub reason: String,
}

impl TransportFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Wire-level seam under the gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for its response.
    async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, TransportFailure>;
}

/// Result of one gateway call.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCallResult {
    pub status: u16,
    pub status_text: String,
    pub raw_body: String,
    /// Parsed body; only set for 2xx answers typed as JSON.
    pub json: Option<Value>,
    pub cache_status: Option<String>,
}

impl RemoteCallResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Per-run gateway. Owns the call counter for the run.
pub struct RemoteCallGateway<'t, T: Transport + ?Sized> {
    transport: &'t T,
    calls_issued: u32,
}

impl<'t, T: Transport + ?Sized> RemoteCallGateway<'t, T> {
    pub fn new(transport: &'t T) -> Self {
        Self {
            transport,
            calls_issued: 0,
        }
    }

    /// Number of calls this gateway has issued, successful or not.
    pub fn calls_issued(&self) -> u32 {
        self.calls_issued
    }

    /// Issue `request` and wait for the answer.
    ///
    /// Non-2xx statuses come back as `Ok` with the body left unparsed. Errors
    /// are a request that never got a response, or a JSON-typed 2xx body that
    /// fails to parse.
    pub async fn call(&mut self, request: &RemoteRequest) -> RunResult<RemoteCallResult> {
        request.validate()?;
        self.calls_issued += 1;

        debug!(
            backend = %request.backend,
            method = request.method.as_str(),
            uri = %redact_uri(&request.uri),
            call = self.calls_issued,
            "remote call"
        );

        let raw = self
            .transport
            .send(request)
            .await
            .map_err(|failure| AggregationError::Network {
                backend: request.backend.clone(),
                reason: failure.reason,
            })?;

        debug!(
            backend = %request.backend,
            status = raw.status,
            cache_status = raw.cache_status.as_deref().unwrap_or("-"),
            body_bytes = raw.body.len(),
            "remote response"
        );

        let success = (200..300).contains(&raw.status);
        let json = if success && is_json_content_type(raw.content_type.as_deref()) {
            let parsed = serde_json::from_str::<Value>(&raw.body).map_err(|err| {
                AggregationError::MalformedJson {
                    backend: request.backend.clone(),
                    reason: err.to_string(),
                }
            })?;
            Some(parsed)
        } else {
            None
        };

        Ok(RemoteCallResult {
            status: raw.status,
            status_text: raw.status_text,
            raw_body: raw.body,
            json,
            cache_status: raw.cache_status,
        })
    }
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// Mask the tracking API key before a URI is logged.
pub(crate) fn redact_uri(uri: &str) -> String {
    const KEY_PARAM: &str = "apiKey=";
    match uri.find(KEY_PARAM) {
        Some(start) => {
            let value_start = start + KEY_PARAM.len();
            let value_end = uri[value_start..]
                .find('&')
                .map(|offset| value_start + offset)
                .unwrap_or(uri.len());
            format!("{}***{}", &uri[..value_start], &uri[value_end..])
        }
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, Step};

    #[tokio::test]
    async fn non_success_status_is_a_normal_result() {
        let transport = ScriptedTransport::new(vec![Step::text(502, "bad gateway")]);
        let mut gateway = RemoteCallGateway::new(&transport);

        let result = gateway
            .call(&RemoteRequest::get("https://upstream/x", "n2yo"))
            .await
            .unwrap();

        assert_eq!(result.status, 502);
        assert_eq!(result.status_text, "Bad Gateway");
        assert!(!result.is_success());
        assert!(result.json.is_none());
        assert_eq!(gateway.calls_issued(), 1);
    }

    #[tokio::test]
    async fn json_is_parsed_only_for_json_content_type() {
        let transport = ScriptedTransport::new(vec![
            Step::json(200, serde_json::json!({"ok": true})),
            Step::text(200, "{\"ok\": true}"),
        ]);
        let mut gateway = RemoteCallGateway::new(&transport);
        let request = RemoteRequest::get("https://upstream/x", "SpaceX");

        let typed = gateway.call(&request).await.unwrap();
        assert_eq!(typed.json, Some(serde_json::json!({"ok": true})));

        let untyped = gateway.call(&request).await.unwrap();
        assert!(untyped.json.is_none());
        assert_eq!(untyped.raw_body, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn malformed_json_body_is_reported() {
        let transport = ScriptedTransport::new(vec![Step::raw_json(200, "{not json")]);
        let mut gateway = RemoteCallGateway::new(&transport);

        let err = gateway
            .call(&RemoteRequest::get("https://upstream/x", "SpaceX"))
            .await
            .unwrap_err();

        assert!(matches!(err, AggregationError::MalformedJson { .. }));
        assert_eq!(gateway.calls_issued(), 1);
    }

    #[tokio::test]
    async fn error_status_body_is_not_parsed() {
        let transport =
            ScriptedTransport::new(vec![Step::raw_json(503, "<html>upstream down</html>")]);
        let mut gateway = RemoteCallGateway::new(&transport);

        let result = gateway
            .call(&RemoteRequest::get("https://upstream/x", "SpaceX"))
            .await
            .unwrap();

        assert_eq!(result.status, 503);
        assert!(result.json.is_none());
        assert_eq!(result.raw_body, "<html>upstream down</html>");
    }

    #[tokio::test]
    async fn network_failure_still_counts_as_a_call() {
        let transport = ScriptedTransport::new(vec![Step::fail("connection refused")]);
        let mut gateway = RemoteCallGateway::new(&transport);

        let err = gateway
            .call(&RemoteRequest::get("https://upstream/x", "n2yo"))
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(gateway.calls_issued(), 1);
    }

    #[tokio::test]
    async fn empty_uri_or_backend_is_rejected_without_a_call() {
        let transport = ScriptedTransport::new(vec![]);
        let mut gateway = RemoteCallGateway::new(&transport);

        let err = gateway
            .call(&RemoteRequest::get("", "n2yo"))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::InvalidRequest(_)));

        let err = gateway
            .call(&RemoteRequest::get("https://upstream/x", " "))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::InvalidRequest(_)));

        assert_eq!(gateway.calls_issued(), 0);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn zero_ttl_collapses_to_pass() {
        assert_eq!(CachePolicy::ttl(Duration::ZERO), CachePolicy::Pass);
        assert_eq!(
            CachePolicy::ttl(Duration::from_secs(5)),
            CachePolicy::Ttl(Duration::from_secs(5))
        );
    }

    #[test]
    fn api_key_is_redacted_in_logged_uri() {
        assert_eq!(
            redact_uri("https://api/tle/25544?apiKey=SECRET"),
            "https://api/tle/25544?apiKey=***"
        );
        assert_eq!(
            redact_uri("https://api/tle/25544?apiKey=SECRET&x=1"),
            "https://api/tle/25544?apiKey=***&x=1"
        );
        assert_eq!(redact_uri("https://api/graphql"), "https://api/graphql");
    }
}
