use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info};

use tlerelay_aggregator::{MissionId, RunOptions};

use crate::state::AppState;

/// Per-request override for how many payloads get TLE lookups.
pub const PAYLOAD_LIMIT_HEADER: &str = "x-payload-limit";

pub async fn mission_tles(
    State(state): State<Arc<AppState>>,
    Path(mission_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if mission_id.trim().is_empty() {
        return unsupported().await.into_response();
    }

    let options = match run_options(&headers) {
        Ok(options) => options,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    let mission_id = MissionId::new(mission_id);
    info!(mission_id = %mission_id, "request TLEs for mission");

    match state
        .engine
        .run(state.transport.as_ref(), &mission_id, options)
        .await
    {
        Ok(report) if report.is_empty() => {
            info!(
                mission_id = %mission_id,
                known = report.mission_known,
                "no payloads for mission"
            );
            (StatusCode::NOT_FOUND, Json(report.result)).into_response()
        }
        Ok(report) => (StatusCode::OK, Json(report.result)).into_response(),
        Err(err) => {
            error!(mission_id = %mission_id, error = %err, "aggregation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

pub async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "This method is not allowed")
}

pub async fn unsupported() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "Unsupported request")
}

fn run_options(headers: &HeaderMap) -> Result<RunOptions, String> {
    let Some(value) = headers.get(PAYLOAD_LIMIT_HEADER) else {
        return Ok(RunOptions::default());
    };

    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .map(RunOptions::with_payload_limit)
        .ok_or_else(|| format!("Invalid {} header", PAYLOAD_LIMIT_HEADER))
}
