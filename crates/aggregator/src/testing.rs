//! In-memory transport and upstream fixtures for tests.
//!
//! Compiled for this crate's tests and for dependents that enable the
//! `test-util` feature.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::gateway::{RawResponse, RemoteRequest, Transport, TransportFailure};
use crate::types::NoradId;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(RawResponse),
    Fail(String),
}

impl Step {
    pub fn json(status: u16, body: Value) -> Self {
        Self::raw_json(status, &body.to_string())
    }

    /// JSON content type with an arbitrary (possibly invalid) body.
    pub fn raw_json(status: u16, body: &str) -> Self {
        Step::Respond(RawResponse {
            status,
            status_text: reason_phrase(status),
            content_type: Some("application/json; charset=utf-8".to_string()),
            cache_status: None,
            body: body.to_string(),
        })
    }

    pub fn text(status: u16, body: &str) -> Self {
        Step::Respond(RawResponse {
            status,
            status_text: reason_phrase(status),
            content_type: Some("text/plain".to_string()),
            cache_status: None,
            body: body.to_string(),
        })
    }

    pub fn fail(reason: &str) -> Self {
        Step::Fail(reason.to_string())
    }
}

enum Script {
    Sequence(Mutex<VecDeque<Step>>),
    Routes(Vec<(String, Step)>),
}

/// Transport that replays scripted answers and records every request.
pub struct ScriptedTransport {
    script: Script,
    seen: Mutex<Vec<RemoteRequest>>,
}

impl ScriptedTransport {
    /// Answer requests with `steps`, in order.
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Script::Sequence(Mutex::new(steps.into())),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answer each request with the first route whose pattern occurs in its URI.
    /// Routes can be hit any number of times.
    pub fn routed(routes: Vec<(&str, Step)>) -> Self {
        Self {
            script: Script::Routes(
                routes
                    .into_iter()
                    .map(|(pattern, step)| (pattern.to_string(), step))
                    .collect(),
            ),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    /// URIs of requests that went to `backend`.
    pub fn uris_for(&self, backend: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.backend == backend)
            .map(|r| r.uri)
            .collect()
    }

    fn next_step(&self, request: &RemoteRequest) -> Option<Step> {
        match &self.script {
            Script::Sequence(steps) => steps.lock().ok().and_then(|mut steps| steps.pop_front()),
            Script::Routes(routes) => routes
                .iter()
                .find(|(pattern, _)| request.uri.contains(pattern.as_str()))
                .map(|(_, step)| step.clone()),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, TransportFailure> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }
        match self.next_step(request) {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(reason)) => Err(TransportFailure::new(reason)),
            None => Err(TransportFailure::new(format!(
                "no scripted response for {} {}",
                request.method.as_str(),
                request.uri
            ))),
        }
    }
}

/// Catalog answer for a mission with the given payloads.
pub fn catalog_body(payloads: &[(&str, &[NoradId])]) -> Value {
    let payloads: Vec<Value> = payloads
        .iter()
        .map(|(id, norad_ids)| json!({ "id": id, "norad_id": norad_ids }))
        .collect();
    json!({ "data": { "mission": { "payloads": payloads } } })
}

/// Tracking answer carrying a two-line element set for `norad_id`.
pub fn tle_body(norad_id: NoradId) -> Value {
    json!({
        "info": { "satid": norad_id, "satname": format!("OBJECT {}", norad_id) },
        "tle": tle_text(norad_id),
    })
}

/// The TLE text [`tle_body`] embeds, lines joined by `\r\n`.
pub fn tle_text(norad_id: NoradId) -> String {
    format!("{}\r\n{}", tle_line(1, norad_id), tle_line(2, norad_id))
}

pub fn tle_line(line: u8, norad_id: NoradId) -> String {
    format!("{} {:05}U LINE{}", line, norad_id, line)
}

fn reason_phrase(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_string()
}
