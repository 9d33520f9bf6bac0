//! reqwest-backed [`Transport`] with a bounded response cache.
//!
//! Caching is applied per call from the request's [`CachePolicy`]; the
//! engine never caches anything itself. Only 2xx responses are stored.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use tlerelay_core::TransportConfig;

use crate::gateway::{
    CachePolicy, HttpMethod, RawResponse, RemoteRequest, Transport, TransportFailure,
};

const CACHE_STATUS_HEADER: &str = "x-cache";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    method: HttpMethod,
    uri: String,
    body: Option<String>,
}

impl CacheKey {
    fn for_request(request: &RemoteRequest) -> Self {
        Self {
            method: request.method,
            uri: request.uri.clone(),
            body: request.body.clone(),
        }
    }
}

#[derive(Clone)]
struct CachedResponse {
    response: RawResponse,
    expires_at: Instant,
}

/// Process-wide TTL cache shared by every run.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<CacheKey, CachedResponse>>>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn get(&self, key: &CacheKey) -> Option<RawResponse> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .and_then(|entry| (entry.expires_at > now).then(|| entry.response.clone()))
    }

    async fn put(&self, key: CacheKey, response: RawResponse, ttl: Duration) {
        if self.max_entries == 0 {
            return;
        }

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            // Evict whatever expires soonest.
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CachedResponse {
                response,
                expires_at: now + ttl,
            },
        );
    }
}

/// HTTP transport used in production.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    cache: ResponseCache,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportFailure> {
        let mut builder = reqwest::Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(config.request_timeout());
        }
        let http = builder
            .build()
            .map_err(|err| TransportFailure::new(err.to_string()))?;

        Ok(Self {
            http,
            cache: ResponseCache::new(config.cache_capacity),
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    async fn send_uncached(
        &self,
        request: &RemoteRequest,
    ) -> Result<RawResponse, TransportFailure> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| TransportFailure::new(format!("invalid header name: {}", err)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| TransportFailure::new(format!("invalid header value: {}", err)))?;
            headers.insert(name, value);
        }

        let mut builder = self.http.request(method, &request.uri).headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TransportFailure::new(err.to_string()))?;

        let status = response.status();
        let content_type = header_string(response.headers(), CONTENT_TYPE.as_str());
        let cache_status = header_string(response.headers(), CACHE_STATUS_HEADER);
        let body = response
            .text()
            .await
            .map_err(|err| TransportFailure::new(err.to_string()))?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            content_type,
            cache_status,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, TransportFailure> {
        let CachePolicy::Ttl(ttl) = request.cache else {
            return self.send_uncached(request).await;
        };

        let key = CacheKey::for_request(request);
        if let Some(hit) = self.cache.get(&key).await {
            debug!(backend = %request.backend, "served from response cache");
            return Ok(hit);
        }

        let response = self.send_uncached(request).await?;
        if (200..300).contains(&response.status) {
            self.cache.put(key, response.clone(), ttl).await;
        }
        Ok(response)
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
