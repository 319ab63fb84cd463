//! Event file parsing
//!
//! Turns JSON event files into typed [`ClaimEvent`]s and [`ReversalEvent`]s.
//! Files may hold one object per line (JSON lines), a JSON array of objects, or a
//! single object. Parsing is lenient: unreadable files, malformed lines and
//! records failing validation are skipped and counted, never fatal.
//!
//! Files are parsed in parallel chunks, but the returned events keep the order of
//! the input file list so that downstream application stays deterministic.

use crate::models::{ClaimEvent, ReversalEvent};
use crate::timestamp_parser::TimestampParser;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

pub type JsonObject = Map<String, Value>;

/// Why a single record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not a decimal: {value}")]
    InvalidDecimal { field: &'static str, value: String },
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),
    #[error("price must not be negative, got {0}")]
    NegativePrice(Decimal),
    #[error("field `{field}` exceeds {max}: {value}")]
    OutOfRange {
        field: &'static str,
        value: Decimal,
        max: Decimal,
    },
    #[error("unit price of {price} / {quantity} is not representable")]
    UnrepresentableUnitPrice { price: Decimal, quantity: Decimal },
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Upper bound for price, quantity and unit price of a single claim.
///
/// Keeps every running sum of accepted claims far inside the decimal range.
pub const MAX_CLAIM_AMOUNT: i64 = 1_000_000_000_000_000;

/// Counts gathered while parsing a batch of files.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ParseStats {
    pub files: usize,
    pub unreadable_files: usize,
    pub records: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl ParseStats {
    pub fn merge(&mut self, other: &ParseStats) {
        self.files += other.files;
        self.unreadable_files += other.unreadable_files;
        self.records += other.records;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
    }
}

/// Events parsed from a batch of files, in file order.
#[derive(Debug, Clone)]
pub struct ParsedBatch<T> {
    pub events: Vec<T>,
    pub stats: ParseStats,
}

pub struct EventParser {
    batch_size: usize,
}

impl EventParser {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn parse_claim_files(&self, files: &[PathBuf]) -> ParsedBatch<ClaimEvent> {
        self.parse_files(files, parse_claim)
    }

    pub fn parse_reversal_files(&self, files: &[PathBuf]) -> ParsedBatch<ReversalEvent> {
        self.parse_files(files, parse_reversal)
    }

    fn parse_files<T, F>(&self, files: &[PathBuf], parse: F) -> ParsedBatch<T>
    where
        T: Send,
        F: Fn(&JsonObject) -> Result<T, RecordError> + Sync,
    {
        let mut batch = ParsedBatch {
            events: Vec::new(),
            stats: ParseStats::default(),
        };

        for chunk in files.chunks(self.batch_size) {
            let chunk_results: Vec<ParsedBatch<T>> = chunk
                .par_iter()
                .map(|path| parse_file(path, &parse))
                .collect();

            for result in chunk_results {
                batch.stats.merge(&result.stats);
                batch.events.extend(result.events);
            }
        }

        batch
    }
}

fn parse_file<T, F>(path: &Path, parse: &F) -> ParsedBatch<T>
where
    F: Fn(&JsonObject) -> Result<T, RecordError>,
{
    let mut stats = ParseStats {
        files: 1,
        ..ParseStats::default()
    };
    let mut events = Vec::new();

    let Some(reading) = read_json_objects(path) else {
        stats.unreadable_files = 1;
        return ParsedBatch { events, stats };
    };

    stats.records = reading.objects.len() + reading.malformed;
    stats.rejected = reading.malformed;

    for object in &reading.objects {
        match parse(object) {
            Ok(event) => {
                stats.accepted += 1;
                events.push(event);
            }
            Err(e) => {
                stats.rejected += 1;
                debug!(file = %path.display(), error = %e, "Dropping invalid record");
            }
        }
    }

    ParsedBatch { events, stats }
}

/// JSON objects found in one file, plus the count of lines or items that were not objects.
#[derive(Debug, Default)]
pub struct JsonObjects {
    pub objects: Vec<JsonObject>,
    pub malformed: usize,
}

/// Read every JSON object from a file. Returns `None` if the file cannot be read.
pub fn read_json_objects(path: &Path) -> Option<JsonObjects> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Skipping unreadable event file");
            return None;
        }
    };

    Some(parse_json_objects(&content))
}

pub fn parse_json_objects(content: &str) -> JsonObjects {
    let mut result = JsonObjects::default();
    let first_char = content.chars().find(|c| !c.is_whitespace());

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::Object(object) => result.objects.push(object),
                    _ => result.malformed += 1,
                }
            }
        }
        Ok(Value::Object(object)) => result.objects.push(object),
        Ok(_) => result.malformed += 1,
        Err(_) if first_char == Some('{') => {
            // JSON lines: one object per line
            for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match serde_json::from_str::<Value>(line) {
                    Ok(Value::Object(object)) => result.objects.push(object),
                    _ => result.malformed += 1,
                }
            }
        }
        Err(_) => {
            if first_char.is_some() {
                result.malformed += 1;
            }
        }
    }

    result
}

pub fn parse_claim(object: &JsonObject) -> Result<ClaimEvent, RecordError> {
    let id = text_field(object, "id")?;
    let npi = text_field(object, "npi")?;
    let ndc = text_field(object, "ndc")?;
    let timestamp = timestamp_field(object)?;

    let quantity = decimal_field(object, "quantity")?;
    let price = decimal_field(object, "price")?;
    if quantity <= Decimal::ZERO {
        return Err(RecordError::NonPositiveQuantity(quantity));
    }
    if price < Decimal::ZERO {
        return Err(RecordError::NegativePrice(price));
    }
    check_bound("quantity", quantity)?;
    check_bound("price", price)?;

    let claim = ClaimEvent::try_new(id, npi, ndc, price, quantity, timestamp)
        .ok_or(RecordError::UnrepresentableUnitPrice { price, quantity })?;
    check_bound("unit_price", claim.unit_price)?;
    Ok(claim)
}

fn check_bound(field: &'static str, value: Decimal) -> Result<(), RecordError> {
    let max = Decimal::from(MAX_CLAIM_AMOUNT);
    if value > max {
        return Err(RecordError::OutOfRange { field, value, max });
    }
    Ok(())
}

pub fn parse_reversal(object: &JsonObject) -> Result<ReversalEvent, RecordError> {
    let id = text_field(object, "id")?;
    let claim_id = text_field(object, "claim_id")?;
    let timestamp = timestamp_field(object)?;

    Ok(ReversalEvent::new(id, claim_id, timestamp))
}

fn text_field(object: &JsonObject, field: &'static str) -> Result<String, RecordError> {
    let text = match object.get(field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    if text.is_empty() {
        return Err(RecordError::MissingField(field));
    }
    Ok(text)
}

fn decimal_field(object: &JsonObject, field: &'static str) -> Result<Decimal, RecordError> {
    let raw = match object.get(field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(RecordError::MissingField(field)),
    };

    parse_decimal(&raw).ok_or(RecordError::InvalidDecimal { field, value: raw })
}

/// Parse plain or scientific decimal notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn timestamp_field(object: &JsonObject) -> Result<chrono::DateTime<chrono::Utc>, RecordError> {
    match object.get("timestamp") {
        Some(Value::String(s)) => {
            TimestampParser::parse(s).map_err(|_| RecordError::InvalidTimestamp(s.clone()))
        }
        Some(Value::Null) | None => Err(RecordError::MissingField("timestamp")),
        Some(other) => Err(RecordError::InvalidTimestamp(other.to_string())),
    }
}
