//! TLE Fetcher
//!
//! One tracking-service request per NORAD id. The TLE text is passed through
//! as received, split into its lines; checksums and element formats are not
//! checked.

use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::error::{AggregationError, RunResult};
use crate::gateway::{CachePolicy, RemoteCallGateway, RemoteRequest, Transport};
use crate::types::{NoradId, TleLines};

/// Fetches element sets from the tracking service.
#[derive(Clone)]
pub struct TleFetcher {
    uri: String,
    backend: String,
    api_key: String,
}

impl std::fmt::Debug for TleFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TleFetcher")
            .field("uri", &self.uri)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl TleFetcher {
    pub fn new(
        uri: impl Into<String>,
        backend: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            backend: backend.into(),
            api_key: api_key.into(),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// `{base}/tle/{norad_id}?apiKey=..` with the key query-encoded.
    pub fn tle_uri(&self, norad_id: NoradId) -> RunResult<String> {
        let base = format!("{}/tle/{}", self.uri.trim_end_matches('/'), norad_id);
        let mut url = Url::parse(&base).map_err(|err| {
            AggregationError::InvalidRequest(format!("bad {} uri: {}", self.backend, err))
        })?;
        url.query_pairs_mut().append_pair("apiKey", &self.api_key);
        Ok(url.into())
    }

    /// Fetch the element lines for `norad_id`.
    ///
    /// `Ok(None)` means the tracking service answered but has no element set
    /// for this object.
    pub async fn fetch<T: Transport + ?Sized>(
        &self,
        gateway: &mut RemoteCallGateway<'_, T>,
        norad_id: NoradId,
    ) -> RunResult<Option<TleLines>> {
        debug!(norad_id, "requesting TLE");

        let uri = self.tle_uri(norad_id)?;
        // Orbital data goes stale quickly; never serve it from cache.
        let request = RemoteRequest::get(uri, &self.backend).with_cache(CachePolicy::Pass);
        let response = gateway.call(&request).await?;

        if !response.is_success() {
            return Err(AggregationError::Transport {
                backend: self.backend.clone(),
                status: response.status,
                status_text: response.status_text,
            });
        }

        let Some(document) = response.json else {
            return Err(AggregationError::NotJson {
                backend: self.backend.clone(),
                body: response.raw_body,
            });
        };

        match document.get("tle") {
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => Ok(Some(TleLines::from_text(text))),
            _ => Err(AggregationError::MissingTle {
                backend: self.backend.clone(),
                norad_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tle_body, tle_line, ScriptedTransport, Step};
    use serde_json::json;

    fn fetcher() -> TleFetcher {
        TleFetcher::new("https://tracker/rest/v1/satellite/", "n2yo", "KEY")
    }

    async fn fetch_with(
        step: Step,
        norad_id: NoradId,
    ) -> (RunResult<Option<TleLines>>, ScriptedTransport) {
        let transport = ScriptedTransport::new(vec![step]);
        let result = {
            let mut gateway = RemoteCallGateway::new(&transport);
            fetcher().fetch(&mut gateway, norad_id).await
        };
        (result, transport)
    }

    #[test]
    fn uri_is_path_parameterized_with_api_key() {
        assert_eq!(
            fetcher().tle_uri(25544).unwrap(),
            "https://tracker/rest/v1/satellite/tle/25544?apiKey=KEY"
        );
    }

    #[test]
    fn api_key_is_query_encoded() {
        let fetcher = TleFetcher::new(
            "https://tracker/rest/v1/satellite",
            "n2yo",
            "a&b#c",
        );
        assert_eq!(
            fetcher.tle_uri(7).unwrap(),
            "https://tracker/rest/v1/satellite/tle/7?apiKey=a%26b%23c"
        );
    }

    #[tokio::test]
    async fn unparseable_base_uri_is_rejected_without_a_call() {
        let fetcher = TleFetcher::new("not a uri", "n2yo", "KEY");
        let transport = ScriptedTransport::new(vec![]);
        let mut gateway = RemoteCallGateway::new(&transport);

        let err = fetcher.fetch(&mut gateway, 7).await.unwrap_err();

        assert!(matches!(err, AggregationError::InvalidRequest(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn debug_output_hides_api_key() {
        assert!(!format!("{:?}", fetcher()).contains("KEY"));
    }

    #[tokio::test]
    async fn splits_tle_text_into_lines() {
        let (result, transport) = fetch_with(Step::json(200, tle_body(25544)), 25544).await;

        let lines = result.unwrap().unwrap();
        assert_eq!(lines.lines(), &[tle_line(1, 25544), tle_line(2, 25544)]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].cache, CachePolicy::Pass);
    }

    #[tokio::test]
    async fn empty_tle_text_is_absence_not_error() {
        let (result, _) = fetch_with(
            Step::json(200, json!({ "info": { "satid": 1 }, "tle": "" })),
            1,
        )
        .await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_tle_field_is_a_protocol_error() {
        let (result, _) = fetch_with(Step::json(200, json!({ "info": {} })), 7).await;
        let err = result.unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(
            err.to_string(),
            "no TLE field in response from n2yo for NORAD ID 7"
        );
    }

    #[tokio::test]
    async fn status_failure_is_distinct_from_missing_field() {
        let (result, _) = fetch_with(Step::json(404, json!({ "error": "nope" })), 7).await;
        let err = result.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "remote n2yo responded with 404 Not Found");
    }
}
