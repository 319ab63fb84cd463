//! Per-drug histogram of quantities used by currently active claims.

use crate::models::{ClaimRecord, QuantityKey};
use std::collections::HashMap;

/// drug (NDC) -> quantity key -> number of active claims.
///
/// Zero counts are removed as soon as they appear, and a drug disappears once its
/// last quantity bucket does, so every stored count is strictly positive.
#[derive(Debug, Default)]
pub struct QuantityFrequencyAggregator {
    counts: HashMap<String, HashMap<QuantityKey, u64>>,
}

impl QuantityFrequencyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_claim(&mut self, record: &ClaimRecord) {
        *self
            .counts
            .entry(record.ndc.clone())
            .or_default()
            .entry(record.quantity_key.clone())
            .or_insert(0) += 1;
    }

    pub fn on_revert(&mut self, record: &ClaimRecord) {
        let Some(by_quantity) = self.counts.get_mut(&record.ndc) else {
            return;
        };

        if let Some(count) = by_quantity.get_mut(&record.quantity_key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                by_quantity.remove(&record.quantity_key);
            }
        }

        if by_quantity.is_empty() {
            self.counts.remove(&record.ndc);
        }
    }

    pub fn count(&self, ndc: &str, quantity_key: &QuantityKey) -> u64 {
        self.counts
            .get(ndc)
            .and_then(|by_quantity| by_quantity.get(quantity_key))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all bucket counts for a drug.
    pub fn active_total(&self, ndc: &str) -> u64 {
        self.counts
            .get(ndc)
            .map(|by_quantity| by_quantity.values().sum())
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> &HashMap<String, HashMap<QuantityKey, u64>> {
        &self.counts
    }
}
