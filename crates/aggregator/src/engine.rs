//! Aggregation Engine
//!
//! Walks mission -> payloads -> NORAD ids -> TLE text, one call at a time.
//!
//! Policy:
//! - the mission lookup is mandatory and is not charged to the budget;
//! - every TLE lookup must be granted by the run's [`RequestBudget`]; once a
//!   request is refused, every remaining NORAD id of every remaining payload
//!   is left empty and the run still succeeds;
//! - a transport or protocol error anywhere aborts the run and no partial
//!   result is returned;
//! - absent data (no payloads, no NORAD ids, no element set) is not an error.

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use tlerelay_core::RelayConfig;

use crate::budget::RequestBudget;
use crate::error::RunResult;
use crate::gateway::{CachePolicy, RemoteCallGateway, Transport};
use crate::mission::MissionResolver;
use crate::tle::TleFetcher;
use crate::types::{
    AggregationReport, AggregationResult, MissionId, MissionLookup, PayloadRecord, RunStats,
};

/// Per-request knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Overrides the engine's default payload limit. `Some(0)` lifts the limit.
    pub payload_limit: Option<usize>,
}

impl RunOptions {
    pub fn with_payload_limit(limit: usize) -> Self {
        Self {
            payload_limit: Some(limit),
        }
    }
}

/// Stateless between runs; every run gets its own gateway and budget.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    resolver: MissionResolver,
    fetcher: TleFetcher,
    budget_ceiling: u32,
    default_payload_limit: Option<usize>,
}

impl AggregationEngine {
    pub fn new(resolver: MissionResolver, fetcher: TleFetcher, budget_ceiling: u32) -> Self {
        Self {
            resolver,
            fetcher,
            budget_ceiling,
            default_payload_limit: None,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        let resolver = MissionResolver::new(
            &config.catalog.uri,
            &config.catalog.backend,
            CachePolicy::ttl(config.catalog.cache_ttl()),
        );
        let fetcher = TleFetcher::new(
            &config.tracking.uri,
            &config.tracking.backend,
            &config.tracking.api_key,
        );
        Self::new(resolver, fetcher, config.budget.ceiling)
            .with_default_payload_limit(config.engine.payload_limit)
    }

    pub fn with_default_payload_limit(mut self, limit: Option<usize>) -> Self {
        self.default_payload_limit = limit;
        self
    }

    pub fn budget_ceiling(&self) -> u32 {
        self.budget_ceiling
    }

    /// Resolve `mission_id` and collect TLE lines for its payloads.
    pub async fn run<T: Transport + ?Sized>(
        &self,
        transport: &T,
        mission_id: &MissionId,
        options: RunOptions,
    ) -> RunResult<AggregationReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("aggregation", %run_id, mission_id = %mission_id);
        self.run_inner(transport, mission_id, options)
            .instrument(span)
            .await
    }

    async fn run_inner<T: Transport + ?Sized>(
        &self,
        transport: &T,
        mission_id: &MissionId,
        options: RunOptions,
    ) -> RunResult<AggregationReport> {
        let mut gateway = RemoteCallGateway::new(transport);
        let mut budget = RequestBudget::new(self.budget_ceiling);
        let mut stats = RunStats::default();
        let mut result = AggregationResult::empty(mission_id.clone());

        info!(budget = self.budget_ceiling, "aggregation started");

        let lookup = match self.resolver.resolve(&mut gateway, mission_id).await {
            Ok(lookup) => lookup,
            Err(err) => {
                error!(error = %err, "mission resolution failed");
                return Err(err);
            }
        };

        let records = match lookup {
            MissionLookup::Found(records) => records,
            MissionLookup::Unknown => {
                stats.calls_issued = gateway.calls_issued();
                info!("mission unknown to catalog");
                return Ok(AggregationReport {
                    result,
                    mission_known: false,
                    stats,
                });
            }
        };

        let limit = options
            .payload_limit
            .or(self.default_payload_limit)
            .filter(|limit| *limit > 0)
            .unwrap_or(records.len());
        if limit < records.len() {
            info!(limit, payloads = records.len(), "limiting TLE lookups to first payloads");
        }

        let mut exhausted = false;
        for (index, record) in records.into_iter().enumerate() {
            let PayloadRecord { id, norad_ids } = record;
            let entry = result.push_payload(id.clone());

            if index >= limit {
                stats.payloads_skipped_by_limit += 1;
                continue;
            }

            for norad_id in norad_ids {
                if exhausted || !budget.try_consume() {
                    if !exhausted {
                        info!(
                            consumed = budget.consumed(),
                            payload_id = %id,
                            norad_id,
                            "call budget exhausted; remaining NORAD ids left empty"
                        );
                        exhausted = true;
                    }
                    stats.norad_ids_skipped_by_budget += 1;
                    continue;
                }

                stats.tle_fetches_attempted += 1;
                match self.fetcher.fetch(&mut gateway, norad_id).await {
                    Ok(Some(lines)) => entry.tles.extend(lines.into_lines()),
                    Ok(None) => {
                        warn!(payload_id = %id, norad_id, "no TLEs found for NORAD ID");
                    }
                    Err(err) => {
                        error!(error = %err, payload_id = %id, norad_id, "TLE lookup failed");
                        return Err(err);
                    }
                }
            }
        }

        stats.calls_issued = gateway.calls_issued();
        info!(
            payloads = result.payloads.len(),
            calls_issued = stats.calls_issued,
            tle_fetches = stats.tle_fetches_attempted,
            skipped_by_budget = stats.norad_ids_skipped_by_budget,
            skipped_by_limit = stats.payloads_skipped_by_limit,
            "aggregation finished"
        );

        Ok(AggregationReport {
            result,
            mission_known: true,
            stats,
        })
    }
}
