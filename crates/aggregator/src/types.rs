//! Data model for one aggregation run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mission identifier as given by the caller. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(String);

impl MissionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload identifier as returned by the mission catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadId(String);

impl PayloadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// NORAD catalog number of a tracked object.
pub type NoradId = i64;

/// One payload and its NORAD ids, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadRecord {
    pub id: PayloadId,
    pub norad_ids: Vec<NoradId>,
}

impl PayloadRecord {
    pub fn new(id: impl Into<String>, norad_ids: Vec<NoradId>) -> Self {
        Self {
            id: PayloadId::new(id),
            norad_ids,
        }
    }
}

/// What the mission catalog knows about a mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionLookup {
    /// The mission exists; its payloads may be empty.
    Found(Vec<PayloadRecord>),
    /// The catalog has no such mission.
    Unknown,
}

/// The element lines for one NORAD id, passed through as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TleLines(Vec<String>);

impl TleLines {
    /// Split upstream TLE text on line terminators (`\r\n` or `\n`).
    pub fn from_text(text: &str) -> Self {
        Self(text.lines().map(str::to_string).collect())
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn into_lines(self) -> Vec<String> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissionRef {
    pub id: MissionId,
}

/// TLE lines for one payload, flattened across its NORAD ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadTles {
    pub id: PayloadId,
    pub tles: Vec<String>,
}

/// Final payload to TLE mapping. Payload order follows the catalog.
///
/// Serializes as `{"mission": {"id": ..}, "payloads": [{"id": .., "tles": [..]}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub mission: MissionRef,
    pub payloads: Vec<PayloadTles>,
}

impl AggregationResult {
    pub fn empty(mission_id: MissionId) -> Self {
        Self {
            mission: MissionRef { id: mission_id },
            payloads: Vec::new(),
        }
    }

    pub fn payload(&self, id: &str) -> Option<&PayloadTles> {
        self.payloads.iter().find(|p| p.id.as_str() == id)
    }

    pub(crate) fn push_payload(&mut self, id: PayloadId) -> &mut PayloadTles {
        self.payloads.push(PayloadTles {
            id,
            tles: Vec::new(),
        });
        let last = self.payloads.len() - 1;
        &mut self.payloads[last]
    }
}

/// Per-run accounting, reported alongside the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Every gateway invocation, mandatory ones included.
    pub calls_issued: u32,
    /// TLE lookups that were allowed by the budget.
    pub tle_fetches_attempted: u32,
    /// NORAD ids left empty because the budget ran out.
    pub norad_ids_skipped_by_budget: u32,
    /// Payloads left empty because of the payload limit.
    pub payloads_skipped_by_limit: u32,
}

/// Successful outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationReport {
    pub result: AggregationResult,
    /// `false` when the catalog had no record of the mission.
    pub mission_known: bool,
    pub stats: RunStats,
}

impl AggregationReport {
    /// No error, but nothing to report: the mission is unknown or has no
    /// payloads.
    pub fn is_empty(&self) -> bool {
        !self.mission_known || self.result.payloads.is_empty()
    }
}
