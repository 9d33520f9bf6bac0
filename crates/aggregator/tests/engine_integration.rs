//! End-to-end runs of the aggregation engine against scripted upstreams.
//!
//! Covers:
//! - budget fan-out ordering across payloads
//! - repeatability against a fixed upstream
//! - the JSON document handed to callers

use proptest::prelude::*;
use serde_json::json;
use tlerelay_aggregator::testing::{catalog_body, tle_body, tle_line, ScriptedTransport, Step};
use tlerelay_aggregator::{
    AggregationEngine, CachePolicy, MissionId, MissionResolver, NoradId, RunOptions, TleFetcher,
};

const CATALOG_URI: &str = "https://catalog.test/graphql/";
const TRACKER_URI: &str = "https://tracker.test/rest/v1/satellite/";

fn engine(budget: u32) -> AggregationEngine {
    AggregationEngine::new(
        MissionResolver::new(CATALOG_URI, "SpaceX", CachePolicy::Pass),
        TleFetcher::new(TRACKER_URI, "n2yo", "TEST-KEY"),
        budget,
    )
}

fn tle_route(norad_id: NoradId) -> String {
    format!("/tle/{}?", norad_id)
}

/// Catalog plus one tracker route per NORAD id.
fn fixed_upstream(payloads: &[(&str, &[NoradId])]) -> ScriptedTransport {
    let catalog = ("graphql".to_string(), Step::json(200, catalog_body(payloads)));
    let routes: Vec<(String, Step)> = std::iter::once(catalog)
        .chain(
            payloads
                .iter()
                .flat_map(|(_, ids)| ids.iter())
                .map(|id| (tle_route(*id), Step::json(200, tle_body(*id)))),
        )
        .collect();
    ScriptedTransport::routed(routes.iter().map(|(p, s)| (p.as_str(), s.clone())).collect())
}

fn attempted_ids(transport: &ScriptedTransport) -> Vec<NoradId> {
    transport
        .uris_for("n2yo")
        .iter()
        .filter_map(|uri| {
            let tail = uri.split("/tle/").nth(1)?;
            tail.split('?').next()?.parse().ok()
        })
        .collect()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(future)
}

#[tokio::test]
async fn test_sufficient_budget_fetches_every_norad_id() {
    let payloads: &[(&str, &[NoradId])] = &[("P1", &[100, 101]), ("P2", &[200]), ("P3", &[])];
    let transport = fixed_upstream(payloads);

    let report = engine(6)
        .run(&transport, &MissionId::new("M1"), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(attempted_ids(&transport), vec![100, 101, 200]);
    assert_eq!(report.stats.norad_ids_skipped_by_budget, 0);
    assert_eq!(report.stats.calls_issued, 4);
}

#[tokio::test]
async fn test_document_shape_for_budget_limited_mission() {
    let transport = fixed_upstream(&[("P1", &[100, 101]), ("P2", &[200])]);

    let report = engine(2)
        .run(&transport, &MissionId::new("M1"), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&report.result).unwrap(),
        json!({
            "mission": { "id": "M1" },
            "payloads": [
                {
                    "id": "P1",
                    "tles": [
                        tle_line(1, 100), tle_line(2, 100),
                        tle_line(1, 101), tle_line(2, 101),
                    ]
                },
                { "id": "P2", "tles": [] }
            ]
        })
    );
}

#[tokio::test]
async fn test_repeated_runs_are_byte_identical() {
    let payloads: &[(&str, &[NoradId])] = &[("P1", &[100, 101]), ("P2", &[200]), ("P3", &[300])];
    let engine = engine(3);
    let mission = MissionId::new("M1");

    let first = engine
        .run(&fixed_upstream(payloads), &mission, RunOptions::default())
        .await
        .unwrap();
    let second = engine
        .run(&fixed_upstream(payloads), &mission, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_string(&first.result).unwrap(),
        serde_json::to_string(&second.result).unwrap()
    );
    assert_eq!(first.stats, second.stats);
}

#[tokio::test]
async fn test_upstream_outage_mid_run_returns_only_the_error() {
    let transport = ScriptedTransport::new(vec![
        Step::json(200, catalog_body(&[("P1", &[100]), ("P2", &[200])])),
        Step::json(200, tle_body(100)),
        Step::fail("connection reset by peer"),
    ]);

    let err = engine(6)
        .run(&transport, &MissionId::new("M1"), RunOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("connection reset by peer"));
    assert_eq!(transport.requests().len(), 3);
}

fn mission_shape() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..4, 0..6)
}

proptest! {
    #[test]
    fn budget_grants_exactly_the_first_b_norad_ids(sizes in mission_shape(), budget in 0u32..10) {
        let mut next_id: NoradId = 1000;
        let owned: Vec<(String, Vec<NoradId>)> = sizes
            .iter()
            .enumerate()
            .map(|(index, size)| {
                let ids = (0..*size).map(|_| { next_id += 1; next_id }).collect();
                (format!("P{}", index), ids)
            })
            .collect();
        let payloads: Vec<(&str, &[NoradId])> =
            owned.iter().map(|(id, ids)| (id.as_str(), ids.as_slice())).collect();
        let all_ids: Vec<NoradId> = owned.iter().flat_map(|(_, ids)| ids.clone()).collect();

        let transport = fixed_upstream(&payloads);
        let eng = engine(budget);
        let mission = MissionId::new("M");
        let run = eng.run(&transport, &mission, RunOptions::default());
        let report = block_on(run).expect("budget exhaustion must not fail the run");

        let granted = all_ids.len().min(budget as usize);
        prop_assert_eq!(attempted_ids(&transport), all_ids[..granted].to_vec());
        prop_assert_eq!(report.stats.norad_ids_skipped_by_budget as usize, all_ids.len() - granted);
        prop_assert_eq!(report.result.payloads.len(), owned.len());

        let returned_lines: usize = report.result.payloads.iter().map(|p| p.tles.len()).sum();
        prop_assert_eq!(returned_lines, granted * 2);

        for (payload, (id, _)) in report.result.payloads.iter().zip(owned.iter()) {
            prop_assert_eq!(payload.id.as_str(), id.as_str());
        }
    }
}
