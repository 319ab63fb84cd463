//! Derived Report Views
//!
//! Stateless projections from aggregator snapshots into the three report views.
//! Nothing here is stored between runs; the chain ranking in particular is
//! recomputed from the net-position aggregates on every call.
//!
//! ## Views
//!
//! - [`build_metrics_view`] - fills, reversals, average and total price per
//!   (pharmacy, drug), ordered by `(npi, ndc)`
//! - [`build_top_chains_view`] - the two cheapest chains per drug by average
//!   active unit price, ties broken by chain name
//! - [`build_top_quantities_view`] - the five most common active quantities per
//!   drug, ties broken by the smaller quantity
//!
//! Every ordering has an explicit secondary key, so identical state always
//! produces identical rows regardless of hash-map iteration order.

use crate::metrics::NetPosition;
use crate::models::{
    ChainPrice, ChainRankingRow, MetricsRow, PharmacyDrugKey, PharmacyMap, QuantityKey,
    QuantityRankingRow,
};
use crate::reconciler::ReconciliationEngine;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

pub const TOP_CHAINS_PER_DRUG: usize = 2;
pub const TOP_QUANTITIES_PER_DRUG: usize = 5;

/// Round half-up to cents.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn build_metrics_view(snapshot: &HashMap<PharmacyDrugKey, NetPosition>) -> Vec<MetricsRow> {
    let mut rows: Vec<MetricsRow> = snapshot
        .iter()
        .map(|(key, position)| MetricsRow {
            npi: key.npi.clone(),
            ndc: key.ndc.clone(),
            fills: position.fills,
            reverted: position.reverted,
            avg_price: position
                .active_average_unit_price()
                .map(round_price)
                .unwrap_or(Decimal::ZERO),
            total_price: position.active_total_price_sum,
        })
        .collect();

    rows.sort_by(|a, b| a.npi.cmp(&b.npi).then_with(|| a.ndc.cmp(&b.ndc)));
    rows
}

pub fn build_top_chains_view(
    snapshot: &HashMap<PharmacyDrugKey, NetPosition>,
    pharmacies: &PharmacyMap,
) -> Vec<ChainRankingRow> {
    // (ndc, chain) -> (active count, active unit price sum)
    let mut by_ndc_chain: HashMap<(&str, &str), (u64, Decimal)> = HashMap::new();

    for (key, position) in snapshot {
        if position.active_count == 0 {
            continue;
        }
        let Some(chain) = pharmacies.get(&key.npi).filter(|chain| !chain.is_empty()) else {
            continue;
        };

        let bucket = by_ndc_chain
            .entry((key.ndc.as_str(), chain.as_str()))
            .or_insert((0, Decimal::ZERO));
        bucket.0 += position.active_count;
        bucket.1 = bucket.1.saturating_add(position.active_unit_price_sum);
    }

    let mut by_ndc: BTreeMap<&str, Vec<(&str, Decimal)>> = BTreeMap::new();
    for ((ndc, chain), (count, unit_price_sum)) in by_ndc_chain {
        let Some(average) = unit_price_sum.checked_div(Decimal::from(count)) else {
            continue;
        };
        by_ndc.entry(ndc).or_default().push((chain, average));
    }

    by_ndc
        .into_iter()
        .map(|(ndc, mut candidates)| {
            candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
            ChainRankingRow {
                ndc: ndc.to_string(),
                chain: candidates
                    .into_iter()
                    .take(TOP_CHAINS_PER_DRUG)
                    .map(|(name, average)| ChainPrice {
                        name: name.to_string(),
                        avg_price: round_price(average),
                    })
                    .collect(),
            }
        })
        .collect()
}

pub fn build_top_quantities_view(
    snapshot: &HashMap<String, HashMap<QuantityKey, u64>>,
) -> Vec<QuantityRankingRow> {
    let mut rows: Vec<QuantityRankingRow> = snapshot
        .iter()
        .filter_map(|(ndc, by_quantity)| {
            let mut items: Vec<(&QuantityKey, u64, Decimal)> = by_quantity
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(key, count)| (key, *count, key.to_decimal()))
                .collect();
            if items.is_empty() {
                return None;
            }

            items.sort_by_key(|(_, count, value)| (Reverse(*count), *value));
            let top: Vec<QuantityKey> = items
                .into_iter()
                .take(TOP_QUANTITIES_PER_DRUG)
                .map(|(key, _, _)| key.clone())
                .collect();
            Some(QuantityRankingRow::new(ndc.clone(), &top))
        })
        .collect();

    rows.sort_by(|a, b| a.ndc.cmp(&b.ndc));
    rows
}

/// All three views, computed from one consistent snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSet {
    pub metrics: Vec<MetricsRow>,
    pub top_chains: Vec<ChainRankingRow>,
    pub top_quantities: Vec<QuantityRankingRow>,
}

impl ReportSet {
    pub fn from_engine(engine: &ReconciliationEngine) -> Self {
        let net_positions = engine.net_positions().snapshot();
        Self {
            metrics: build_metrics_view(net_positions),
            top_chains: build_top_chains_view(net_positions, engine.pharmacies()),
            top_quantities: build_top_quantities_view(engine.quantities().snapshot()),
        }
    }
}
