//! Reconciliation Engine
//!
//! The stateful core of the pipeline. Every claim and reversal passes through
//! [`ReconciliationEngine::apply`], which decides whether the event is a duplicate,
//! whether it references a claim that has not arrived yet, and how it changes the
//! running aggregates.
//!
//! ## Guarantees
//!
//! - **Idempotence**: an event id is applied at most once; replays only bump a
//!   diagnostic counter.
//! - **Order independence**: a reversal that arrives before its claim is parked in
//!   a pending counter and applied the moment the claim is accepted, so `[C, R]`
//!   and `[R, C]` end in identical aggregate state.
//! - **Exact reversal**: a claim is reverted at most once, and reverting subtracts
//!   the very values the claim's record contributed.
//!
//! ## Diagnostics
//!
//! Logical anomalies never fail the run. They are tallied in [`Counters`]:
//! duplicate claims and reversals, claims from unknown pharmacies, orphan
//! reversals, and reversal attempts on claims that were already reverted.
//!
//! ## Threading
//!
//! All mutation goes through `&mut self`; callers that want concurrency must
//! serialize `apply` calls. The pharmacy map is shared read-only via [`Arc`].
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Utc;
//! use rust_decimal::Decimal;
//! use claims_processor::models::{ClaimEvent, Event, PharmacyMap, ReversalEvent};
//! use claims_processor::reconciler::ReconciliationEngine;
//!
//! let mut pharmacies = PharmacyMap::new();
//! pharmacies.insert("1".to_string(), "ChainA".to_string());
//!
//! let mut engine = ReconciliationEngine::new(Arc::new(pharmacies));
//! engine.apply(Event::Reversal(ReversalEvent::new("r1", "c1", Utc::now())));
//! engine.apply(Event::Claim(ClaimEvent::new(
//!     "c1", "1", "d1", Decimal::TEN, Decimal::TWO, Utc::now(),
//! )));
//!
//! assert!(engine.claims().get("c1").unwrap().is_reverted);
//! ```

use crate::metrics::NetPositionAggregator;
use crate::models::{ClaimEvent, ClaimRecord, Event, PharmacyMap, ReversalEvent};
use crate::quantities::QuantityFrequencyAggregator;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Data-quality counters. Informational only; they never steer processing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub duplicate_claims: u64,
    pub duplicate_reversals: u64,
    pub unknown_pharmacy_claims: u64,
    pub orphan_reversals: u64,
    pub already_reverted: u64,
}

impl Counters {
    pub fn total(&self) -> u64 {
        self.duplicate_claims
            + self.duplicate_reversals
            + self.unknown_pharmacy_claims
            + self.orphan_reversals
            + self.already_reverted
    }
}

/// Owner of every accepted claim record. Records are never removed.
#[derive(Debug, Default)]
pub struct ClaimStore {
    records: HashMap<String, ClaimRecord>,
}

impl ClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, record: ClaimRecord) -> &ClaimRecord {
        let id = record.claim_id.clone();
        self.records.entry(id).or_insert(record)
    }

    fn get_mut(&mut self, claim_id: &str) -> Option<&mut ClaimRecord> {
        self.records.get_mut(claim_id)
    }

    pub fn get(&self, claim_id: &str) -> Option<&ClaimRecord> {
        self.records.get(claim_id)
    }

    pub fn contains(&self, claim_id: &str) -> bool {
        self.records.contains_key(claim_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ClaimRecord> {
        self.records.values()
    }

    pub fn active_records(&self) -> impl Iterator<Item = &ClaimRecord> {
        self.records.values().filter(|record| !record.is_reverted)
    }
}

pub struct ReconciliationEngine {
    pharmacies: Arc<PharmacyMap>,
    claims: ClaimStore,
    seen_claim_ids: HashSet<String>,
    seen_reversal_ids: HashSet<String>,
    pending_reversals: HashMap<String, u64>,
    net_positions: NetPositionAggregator,
    quantities: QuantityFrequencyAggregator,
    counters: Counters,
}

impl ReconciliationEngine {
    pub fn new(pharmacies: Arc<PharmacyMap>) -> Self {
        Self {
            pharmacies,
            claims: ClaimStore::new(),
            seen_claim_ids: HashSet::new(),
            seen_reversal_ids: HashSet::new(),
            pending_reversals: HashMap::new(),
            net_positions: NetPositionAggregator::new(),
            quantities: QuantityFrequencyAggregator::new(),
            counters: Counters::default(),
        }
    }

    /// Apply one event. Never fails; anomalies are reflected in [`Self::counters`].
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Claim(claim) => self.on_claim(claim),
            Event::Reversal(reversal) => self.on_reversal(reversal),
        }
    }

    /// Apply a sequence of events in order.
    pub fn apply_all<I>(&mut self, events: I)
    where
        I: IntoIterator,
        I::Item: Into<Event>,
    {
        for event in events {
            self.apply(event.into());
        }
    }

    fn on_claim(&mut self, claim: ClaimEvent) {
        if !self.seen_claim_ids.insert(claim.id.clone()) {
            self.counters.duplicate_claims += 1;
            debug!(claim_id = %claim.id, "Skipping duplicate claim");
            return;
        }

        let Some(chain) = self.pharmacies.get(&claim.npi).cloned() else {
            self.counters.unknown_pharmacy_claims += 1;
            debug!(claim_id = %claim.id, npi = %claim.npi, "Rejecting claim from unknown pharmacy");
            return;
        };

        let claim_id = claim.id.clone();
        let record = self.claims.insert(ClaimRecord::from_event(claim, chain));
        self.net_positions.on_claim(record);
        self.quantities.on_claim(record);

        if let Some(pending) = self.pending_reversals.remove(&claim_id) {
            debug!(claim_id = %claim_id, pending, "Applying reversal that arrived before its claim");
            self.revert_if_active(&claim_id);
            if pending > 1 {
                self.counters.already_reverted += pending - 1;
            }
        }
    }

    fn on_reversal(&mut self, reversal: ReversalEvent) {
        if !self.seen_reversal_ids.insert(reversal.id.clone()) {
            self.counters.duplicate_reversals += 1;
            debug!(reversal_id = %reversal.id, "Skipping duplicate reversal");
            return;
        }

        if self.claims.contains(&reversal.claim_id) {
            if !self.revert_if_active(&reversal.claim_id) {
                self.counters.already_reverted += 1;
                debug!(
                    reversal_id = %reversal.id,
                    claim_id = %reversal.claim_id,
                    "Claim already reverted"
                );
            }
        } else {
            *self
                .pending_reversals
                .entry(reversal.claim_id)
                .or_insert(0) += 1;
        }
    }

    /// Flip a stored claim to reverted and withdraw its contribution.
    ///
    /// Returns `false` when there is no such record or it was already reverted.
    fn revert_if_active(&mut self, claim_id: &str) -> bool {
        let Some(record) = self.claims.get_mut(claim_id) else {
            self.counters.orphan_reversals += 1;
            return false;
        };
        if record.is_reverted {
            return false;
        }

        record.is_reverted = true;
        self.net_positions.on_revert(record);
        self.quantities.on_revert(record);
        true
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn claims(&self) -> &ClaimStore {
        &self.claims
    }

    pub fn pharmacies(&self) -> &PharmacyMap {
        &self.pharmacies
    }

    pub fn net_positions(&self) -> &NetPositionAggregator {
        &self.net_positions
    }

    pub fn quantities(&self) -> &QuantityFrequencyAggregator {
        &self.quantities
    }

    /// Number of reversals waiting for a claim that has not arrived.
    pub fn pending_reversal_count(&self, claim_id: &str) -> u64 {
        self.pending_reversals.get(claim_id).copied().unwrap_or(0)
    }

    pub fn pending_reversals_total(&self) -> u64 {
        self.pending_reversals.values().sum()
    }
}
