//! Mission Resolver
//!
//! One denormalized GraphQL query to the mission catalog returns every payload
//! of a mission together with its NORAD ids.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{AggregationError, RunResult};
use crate::gateway::{CachePolicy, RemoteCallGateway, RemoteCallResult, RemoteRequest, Transport};
use crate::types::{MissionId, MissionLookup, NoradId, PayloadRecord};

#[derive(Debug, Deserialize)]
struct CatalogData {
    mission: Option<CatalogMission>,
}

#[derive(Debug, Deserialize)]
struct CatalogMission {
    payloads: Option<Vec<Option<CatalogPayload>>>,
}

#[derive(Debug, Deserialize)]
struct CatalogPayload {
    id: Option<String>,
    norad_id: Option<Vec<Option<NoradId>>>,
}

/// Resolves a mission into its payload records.
#[derive(Debug, Clone)]
pub struct MissionResolver {
    uri: String,
    backend: String,
    cache: CachePolicy,
}

impl MissionResolver {
    pub fn new(uri: impl Into<String>, backend: impl Into<String>, cache: CachePolicy) -> Self {
        Self {
            uri: uri.into(),
            backend: backend.into(),
            cache,
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// GraphQL query for `mission_id`'s payloads and their NORAD ids.
    pub fn query(mission_id: &MissionId) -> String {
        // A JSON string literal is also a valid GraphQL string literal.
        let literal = Value::String(mission_id.as_str().to_string());
        format!(
            "{{ mission(id: {}) {{ payloads {{ id norad_id }} }} }}",
            literal
        )
    }

    /// Look up `mission_id`. Issues exactly one call.
    pub async fn resolve<T: Transport + ?Sized>(
        &self,
        gateway: &mut RemoteCallGateway<'_, T>,
        mission_id: &MissionId,
    ) -> RunResult<MissionLookup> {
        debug!(mission_id = %mission_id, "requesting payloads");

        let body = json!({ "query": Self::query(mission_id) }).to_string();
        let request = RemoteRequest::post(&self.uri, &self.backend, body)
            .with_header("Content-Type", "application/json")
            .with_cache(self.cache);

        let response = gateway.call(&request).await?;
        self.parse(response)
    }

    fn parse(&self, response: RemoteCallResult) -> RunResult<MissionLookup> {
        if !response.is_success() {
            return Err(AggregationError::Transport {
                backend: self.backend.clone(),
                status: response.status,
                status_text: response.status_text,
            });
        }

        let mut document = match response.json {
            Some(document) => document,
            None => {
                return Err(AggregationError::NotJson {
                    backend: self.backend.clone(),
                    body: response.raw_body,
                })
            }
        };

        let data = match document.get_mut("data").map(Value::take) {
            Some(data) if !data.is_null() => data,
            _ => {
                return Err(AggregationError::MissingData {
                    backend: self.backend.clone(),
                    detail: first_graphql_error(&document),
                })
            }
        };

        let data: CatalogData =
            serde_json::from_value(data).map_err(|err| AggregationError::UnexpectedShape {
                backend: self.backend.clone(),
                reason: err.to_string(),
            })?;

        let Some(mission) = data.mission else {
            warn!(backend = %self.backend, "no mission in catalog response");
            return Ok(MissionLookup::Unknown);
        };

        let Some(payloads) = mission.payloads else {
            info!("mission has no payloads");
            return Ok(MissionLookup::Found(Vec::new()));
        };

        let total = payloads.len();
        let records: Vec<PayloadRecord> = payloads
            .into_iter()
            .flatten()
            .filter_map(|payload| {
                let id = payload.id.filter(|id| !id.is_empty())?;
                let norad_ids = payload
                    .norad_id
                    .unwrap_or_default()
                    .into_iter()
                    .flatten()
                    .collect();
                Some(PayloadRecord::new(id, norad_ids))
            })
            .collect();

        if records.len() < total {
            debug!(
                dropped = total - records.len(),
                "mission contains payloads without an id"
            );
        }
        debug!(payloads = records.len(), "payload records resolved");

        Ok(MissionLookup::Found(records))
    }
}

fn first_graphql_error(document: &Value) -> Option<String> {
    document
        .get("errors")?
        .as_array()?
        .first()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
