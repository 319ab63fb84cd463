//! Core Data Models
//!
//! This module defines the data structures that flow through the claims
//! reconciliation pipeline, from typed input events to the rows written in
//! the final reports.
//!
//! ## Data Flow
//!
//! 1. **Input events**: [`ClaimEvent`] and [`ReversalEvent`], wrapped in the closed
//!    [`Event`] sum type that the reconciliation engine dispatches on
//! 2. **Projection**: [`ClaimRecord`] - an accepted claim enriched with its pharmacy
//!    chain and a normalized [`QuantityKey`]
//! 3. **Reports**: [`MetricsRow`], [`ChainRankingRow`] and [`QuantityRankingRow`] -
//!    serializable rows of the three derived views
//!
//! ## Decimal Handling
//!
//! Prices and quantities are carried as [`rust_decimal::Decimal`] so that running
//! sums stay exact: a reversal subtracts exactly the value its claim added. Report
//! rows serialize decimals as JSON numbers.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Pharmacy NPI -> chain name, loaded once per run.
pub type PharmacyMap = HashMap<String, String>;

/// A claim submission as delivered by the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimEvent {
    pub id: String,
    pub npi: String,
    pub ndc: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl ClaimEvent {
    /// Build a claim event, deriving `unit_price = price / quantity`.
    ///
    /// Returns `None` when the quotient is not representable: a zero quantity, or
    /// a quantity so small that the unit price leaves the decimal range.
    pub fn try_new(
        id: impl Into<String>,
        npi: impl Into<String>,
        ndc: impl Into<String>,
        price: Decimal,
        quantity: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        let unit_price = price.checked_div(quantity)?;
        Some(Self {
            id: id.into(),
            npi: npi.into(),
            ndc: ndc.into(),
            price,
            quantity,
            unit_price,
            timestamp,
        })
    }

    /// Infallible variant of [`Self::try_new`] for trusted inputs.
    ///
    /// A zero quantity yields a zero unit price, and an unrepresentable quotient
    /// saturates at [`Decimal::MAX`]. Parsed events never reach either case.
    pub fn new(
        id: impl Into<String>,
        npi: impl Into<String>,
        ndc: impl Into<String>,
        price: Decimal,
        quantity: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let unit_price = if quantity.is_zero() {
            Decimal::ZERO
        } else {
            price.checked_div(quantity).unwrap_or(Decimal::MAX)
        };
        Self {
            id: id.into(),
            npi: npi.into(),
            ndc: ndc.into(),
            price,
            quantity,
            unit_price,
            timestamp,
        }
    }
}

/// A reversal of a previously submitted (or not yet seen) claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalEvent {
    pub id: String,
    pub claim_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ReversalEvent {
    pub fn new(
        id: impl Into<String>,
        claim_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            claim_id: claim_id.into(),
            timestamp,
        }
    }
}

/// Every event the reconciliation engine accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Claim(ClaimEvent),
    Reversal(ReversalEvent),
}

impl From<ClaimEvent> for Event {
    fn from(claim: ClaimEvent) -> Self {
        Event::Claim(claim)
    }
}

impl From<ReversalEvent> for Event {
    fn from(reversal: ReversalEvent) -> Self {
        Event::Reversal(reversal)
    }
}

/// Canonical string form of a quantity, used as a histogram bucket.
///
/// Trailing zeros and a trailing decimal point are stripped, so `5`, `5.0` and
/// `5.00` all map to the key `"5"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuantityKey(String);

impl QuantityKey {
    pub fn from_decimal(quantity: &Decimal) -> Self {
        Self(quantity.normalize().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the key; keys that somehow fail to parse sort as zero.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_str(&self.0).unwrap_or(Decimal::ZERO)
    }
}

impl fmt::Display for QuantityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite key of the net-position aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PharmacyDrugKey {
    pub npi: String,
    pub ndc: String,
}

impl PharmacyDrugKey {
    pub fn new(npi: impl Into<String>, ndc: impl Into<String>) -> Self {
        Self {
            npi: npi.into(),
            ndc: ndc.into(),
        }
    }
}

/// An accepted claim. Owned by the claim store for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRecord {
    pub claim_id: String,
    pub npi: String,
    pub ndc: String,
    pub chain: String,
    pub price: Decimal,
    pub unit_price: Decimal,
    pub quantity_key: QuantityKey,
    pub is_reverted: bool,
}

impl ClaimRecord {
    /// Project a claim event into an active record for the given chain.
    pub fn from_event(event: ClaimEvent, chain: String) -> Self {
        let quantity_key = QuantityKey::from_decimal(&event.quantity);
        Self {
            claim_id: event.id,
            npi: event.npi,
            ndc: event.ndc,
            chain,
            price: event.price,
            unit_price: event.unit_price,
            quantity_key,
            is_reverted: false,
        }
    }

    pub fn key(&self) -> PharmacyDrugKey {
        PharmacyDrugKey::new(self.npi.clone(), self.ndc.clone())
    }
}

/// One row of `metrics_by_npi_ndc.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    pub npi: String,
    pub ndc: String,
    pub fills: u64,
    pub reverted: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainPrice {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_price: Decimal,
}

/// One row of `top2_chain_per_ndc.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainRankingRow {
    pub ndc: String,
    pub chain: Vec<ChainPrice>,
}

/// One row of `most_common_qty_per_ndc.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityRankingRow {
    pub ndc: String,
    pub most_prescribed_quantity: Vec<f64>,
}

impl QuantityRankingRow {
    pub fn new(ndc: impl Into<String>, quantities: &[QuantityKey]) -> Self {
        Self {
            ndc: ndc.into(),
            most_prescribed_quantity: quantities
                .iter()
                .map(|key| key.to_decimal().to_f64().unwrap_or(0.0))
                .collect(),
        }
    }
}
