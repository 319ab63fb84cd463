//! Net-position aggregation per (pharmacy, drug).
//!
//! Keeps lifetime fill and reversal counts alongside the sums over claims that
//! are currently active. Reversals subtract the exact unit price and total price
//! that the reverted claim contributed, so the active sums always equal the sum
//! over non-reverted records.

use crate::models::{ClaimRecord, PharmacyDrugKey};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Running totals for one (pharmacy, drug) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetPosition {
    pub fills: u64,
    pub reverted: u64,
    pub active_count: u64,
    pub active_unit_price_sum: Decimal,
    pub active_total_price_sum: Decimal,
}

impl NetPosition {
    /// Mean unit price over active claims, unrounded. `None` when nothing is active.
    pub fn active_average_unit_price(&self) -> Option<Decimal> {
        if self.active_count == 0 {
            return None;
        }
        self.active_unit_price_sum
            .checked_div(Decimal::from(self.active_count))
    }
}

#[derive(Debug, Default)]
pub struct NetPositionAggregator {
    by_npi_ndc: HashMap<PharmacyDrugKey, NetPosition>,
}

impl NetPositionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, record: &ClaimRecord) -> &mut NetPosition {
        self.by_npi_ndc.entry(record.key()).or_default()
    }

    pub fn on_claim(&mut self, record: &ClaimRecord) {
        let position = self.entry(record);
        position.fills += 1;
        position.active_count += 1;
        // Saturating so that unbounded inputs from library callers cannot panic;
        // parsed claims are bounded well below the decimal range.
        position.active_unit_price_sum = position.active_unit_price_sum.saturating_add(record.unit_price);
        position.active_total_price_sum = position.active_total_price_sum.saturating_add(record.price);
    }

    pub fn on_revert(&mut self, record: &ClaimRecord) {
        let position = self.entry(record);
        position.reverted += 1;
        // The engine only reverts claims it has applied, so this never saturates.
        position.active_count = position.active_count.saturating_sub(1);
        position.active_unit_price_sum = position.active_unit_price_sum.saturating_sub(record.unit_price);
        position.active_total_price_sum = position.active_total_price_sum.saturating_sub(record.price);
    }

    pub fn get(&self, key: &PharmacyDrugKey) -> Option<&NetPosition> {
        self.by_npi_ndc.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_npi_ndc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_npi_ndc.is_empty()
    }

    /// Read-only view of every aggregate touched so far.
    pub fn snapshot(&self) -> &HashMap<PharmacyDrugKey, NetPosition> {
        &self.by_npi_ndc
    }
}
