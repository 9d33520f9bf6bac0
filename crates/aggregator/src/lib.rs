//! TLE aggregation engine.
//!
//! Resolves a mission into its payloads through the mission catalog, then
//! fetches two-line element sets for each payload's NORAD ids from the
//! tracking service, under a fixed per-run budget of outbound calls.

pub mod budget;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod mission;
pub mod tle;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use budget::RequestBudget;
pub use engine::{AggregationEngine, RunOptions};
pub use error::{AggregationError, RunResult};
pub use gateway::{
    CachePolicy, HttpMethod, RawResponse, RemoteCallGateway, RemoteCallResult, RemoteRequest,
    Transport, TransportFailure,
};
pub use mission::MissionResolver;
pub use tle::TleFetcher;
pub use transport::{HttpTransport, ResponseCache};
pub use types::{
    AggregationReport, AggregationResult, MissionId, MissionLookup, NoradId, PayloadId,
    PayloadRecord, PayloadTles, RunStats, TleLines,
};
