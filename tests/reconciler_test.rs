//! Reconciliation behaviour over whole event sequences

use chrono::{TimeZone, Utc};
use claims_processor::models::{ClaimEvent, Event, PharmacyDrugKey, PharmacyMap, QuantityKey, ReversalEvent};
use claims_processor::reconciler::ReconciliationEngine;
use claims_processor::reports::ReportSet;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn pharmacies() -> Arc<PharmacyMap> {
    let mut map = PharmacyMap::new();
    map.insert("1".to_string(), "ChainA".to_string());
    map.insert("2".to_string(), "ChainB".to_string());
    map.insert("3".to_string(), "ChainC".to_string());
    Arc::new(map)
}

fn claim(id: &str, npi: &str, ndc: &str, price: &str, quantity: &str) -> Event {
    Event::Claim(ClaimEvent::new(
        id,
        npi,
        ndc,
        dec(price),
        dec(quantity),
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ))
}

fn revert(id: &str, claim_id: &str) -> Event {
    Event::Reversal(ReversalEvent::new(
        id,
        claim_id,
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
    ))
}

/// A mixed workload with duplicates, early reversals, unknown pharmacies and double reversals.
fn workload() -> Vec<Event> {
    let mut events = Vec::new();
    for i in 0..40 {
        let npi = ["1", "2", "3", "9"][i % 4];
        let ndc = ["d1", "d2", "d3"][i % 3];
        let quantity = ["1", "2", "2.0", "5", "30"][i % 5];
        let price = format!("{}.{:02}", 5 + i, (i * 7) % 100);
        events.push(claim(&format!("c{}", i), npi, ndc, &price, quantity));
    }
    events.push(events[3].clone());
    events.push(events[10].clone());

    for i in (0..40).step_by(3) {
        events.push(revert(&format!("r{}", i), &format!("c{}", i)));
    }
    events.push(revert("r3", "c3"));
    events.push(revert("r-extra", "c6"));
    events.push(revert("r-missing", "c404"));
    events
}

fn run(events: Vec<Event>) -> ReconciliationEngine {
    let mut engine = ReconciliationEngine::new(pharmacies());
    engine.apply_all(events);
    engine
}

/// Deterministic xorshift-driven Fisher-Yates shuffle.
fn shuffled(mut events: Vec<Event>, mut seed: u64) -> Vec<Event> {
    for i in (1..events.len()).rev() {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let j = (seed % (i as u64 + 1)) as usize;
        events.swap(i, j);
    }
    events
}

#[test]
fn test_final_state_is_order_independent() {
    let baseline = run(workload());
    let expected = ReportSet::from_engine(&baseline);

    for seed in [1u64, 7, 42, 1234, 98765, 0xDEADBEEF] {
        let engine = run(shuffled(workload(), seed));
        assert_eq!(ReportSet::from_engine(&engine), expected, "seed {}", seed);
        assert_eq!(engine.counters(), baseline.counters(), "seed {}", seed);
        assert_eq!(engine.pending_reversals_total(), baseline.pending_reversals_total());
    }
}

#[test]
fn test_reverse_order_matches_forward_order() {
    let forward = run(workload());
    let mut events = workload();
    events.reverse();
    let backward = run(events);

    assert_eq!(ReportSet::from_engine(&forward), ReportSet::from_engine(&backward));
}

#[test]
fn test_replaying_everything_changes_only_duplicate_counters() {
    let once = run(workload());

    let mut twice_events = workload();
    twice_events.extend(workload());
    let twice = run(twice_events);

    assert_eq!(ReportSet::from_engine(&once), ReportSet::from_engine(&twice));
    assert_eq!(twice.claims().len(), once.claims().len());
    assert!(twice.counters().duplicate_claims > once.counters().duplicate_claims);
    assert!(twice.counters().duplicate_reversals > once.counters().duplicate_reversals);
    assert_eq!(twice.counters().already_reverted, once.counters().already_reverted);
}

#[test]
fn test_aggregates_match_stored_records() {
    let engine = run(shuffled(workload(), 99));

    for (key, position) in engine.net_positions().snapshot() {
        let records: Vec<_> = engine
            .claims()
            .records()
            .filter(|r| r.npi == key.npi && r.ndc == key.ndc)
            .collect();
        let active: Vec<_> = records.iter().filter(|r| !r.is_reverted).collect();

        assert_eq!(position.fills, records.len() as u64);
        assert_eq!(position.reverted, (records.len() - active.len()) as u64);
        assert_eq!(position.active_count, active.len() as u64);
        assert_eq!(
            position.active_unit_price_sum,
            active.iter().map(|r| r.unit_price).sum::<Decimal>()
        );
        assert_eq!(
            position.active_total_price_sum,
            active.iter().map(|r| r.price).sum::<Decimal>()
        );
    }
}

#[test]
fn test_quantity_histogram_counts_active_claims() {
    let engine = run(shuffled(workload(), 5));

    for ndc in ["d1", "d2", "d3"] {
        let active = engine
            .claims()
            .active_records()
            .filter(|r| r.ndc == ndc)
            .count() as u64;
        assert_eq!(engine.quantities().active_total(ndc), active, "ndc {}", ndc);
    }

    for counts in engine.quantities().snapshot().values() {
        assert!(counts.values().all(|count| *count > 0));
    }
}

#[test]
fn test_unknown_pharmacy_claims_leave_no_trace() {
    let engine = run(workload());

    assert!(engine.claims().records().all(|r| r.npi != "9"));
    assert!(engine
        .net_positions()
        .snapshot()
        .keys()
        .all(|key| key.npi != "9"));
    assert_eq!(engine.counters().unknown_pharmacy_claims, 10);
}

#[test]
fn test_single_claim_metrics() {
    let engine = run(vec![claim("c1", "1", "d1", "10.00", "2")]);
    let record = engine.claims().get("c1").unwrap();
    assert_eq!(record.unit_price, dec("5"));

    let reports = ReportSet::from_engine(&engine);
    assert_eq!(reports.metrics.len(), 1);
    let row = &reports.metrics[0];
    assert_eq!((row.npi.as_str(), row.ndc.as_str()), ("1", "d1"));
    assert_eq!((row.fills, row.reverted), (1, 0));
    assert_eq!(row.avg_price, dec("5.00"));
    assert_eq!(row.total_price, dec("10.00"));
}

#[test]
fn test_early_reversal_is_applied_on_claim_arrival() {
    let mut engine = ReconciliationEngine::new(pharmacies());
    engine.apply(revert("r1", "c1"));
    assert_eq!(engine.pending_reversal_count("c1"), 1);

    engine.apply(claim("c1", "1", "d1", "10", "2"));
    assert_eq!(engine.pending_reversal_count("c1"), 0);

    let position = engine
        .net_positions()
        .get(&PharmacyDrugKey::new("1", "d1"))
        .unwrap();
    assert_eq!((position.fills, position.reverted, position.active_count), (1, 1, 0));
}

#[test]
fn test_equivalent_quantities_share_a_bucket() {
    let engine = run(vec![
        claim("c1", "1", "d1", "10", "5"),
        claim("c2", "1", "d1", "10", "5.00"),
    ]);
    let key = QuantityKey::from_decimal(&dec("5"));
    assert_eq!(engine.quantities().count("d1", &key), 2);
    assert_eq!(engine.quantities().snapshot()["d1"].len(), 1);
}

#[test]
fn test_chain_price_ties_break_by_name() {
    let engine = run(vec![
        claim("c1", "2", "d1", "4", "1"),
        claim("c2", "1", "d1", "4", "1"),
        claim("c3", "3", "d1", "9", "1"),
    ]);
    let reports = ReportSet::from_engine(&engine);
    let names: Vec<&str> = reports.top_chains[0]
        .chain
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["ChainA", "ChainB"]);
}

#[test]
fn test_amounts_near_decimal_range_never_panic() {
    let huge = "50000000000000000000000000000";
    let engine = run(vec![
        claim("c1", "1", "d1", huge, "1"),
        claim("c2", "1", "d1", huge, "1"),
        claim("c3", "2", "d1", huge, "1"),
        revert("r1", "c1"),
    ]);

    let position = engine
        .net_positions()
        .get(&PharmacyDrugKey::new("1", "d1"))
        .unwrap();
    assert_eq!((position.fills, position.reverted, position.active_count), (2, 1, 1));

    let reports = ReportSet::from_engine(&engine);
    assert_eq!(reports.metrics.len(), 2);
    assert_eq!(reports.top_chains[0].chain.len(), 2);
}
