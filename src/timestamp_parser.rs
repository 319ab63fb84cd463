//! ISO-8601 timestamp parsing for claim and reversal events.
//!
//! Event producers are loose about the format, so the parser takes the same
//! range of ISO-8601 shapes a `fromisoformat`-style reader does: extended or
//! basic dates, hour, minute or second precision, `.` or `,` fractions, and
//! `Z` / `±HH[:MM]` offsets. A timestamp without an offset is taken as UTC.

use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Parses ISO-8601 event timestamps into UTC
pub struct TimestampParser;

impl TimestampParser {
    /// Parse a timestamp string into a `DateTime<Utc>`.
    ///
    /// Bare dates resolve to midnight UTC.
    pub fn parse(timestamp_str: &str) -> Result<DateTime<Utc>> {
        let trimmed = timestamp_str.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }

        Self::parse_iso(trimmed).ok_or_else(|| anyhow!("Failed to parse timestamp: {}", timestamp_str))
    }

    fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
        let (date_part, time_part) = match s.find(['T', 't', ' ']) {
            Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
            None => (s, None),
        };
        let date = parse_date(date_part)?;

        let Some(time_part) = time_part else {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        };

        let (clock, offset) = split_offset(time_part)?;
        let naive = NaiveDateTime::new(date, parse_clock(clock)?);
        match offset {
            Some(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc)),
            None => Some(naive.and_utc()),
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| (s.len() == 8).then(|| NaiveDate::parse_from_str(s, "%Y%m%d").ok()).flatten())
}

/// Split a trailing `Z` or numeric offset off the time of day.
fn split_offset(s: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(clock) = s.strip_suffix(['Z', 'z']) {
        return Some((clock, FixedOffset::east_opt(0)));
    }
    let Some(idx) = s.rfind(['+', '-']) else {
        return Some((s, None));
    };

    let sign = if s[idx..].starts_with('-') { -1 } else { 1 };
    let digits: String = s[idx + 1..].chars().filter(|c| *c != ':').collect();
    let (hours, minutes) = match digits.len() {
        2 => (two_digits(&digits)?, 0),
        4 => (two_digits(&digits[..2])?, two_digits(&digits[2..])?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    let offset = FixedOffset::east_opt(sign * (hours as i32 * 3600 + minutes as i32 * 60))?;
    Some((&s[..idx], Some(offset)))
}

/// `HH`, `HH:MM`, `HH:MM:SS[.f]` and their basic forms `HHMM`, `HHMMSS[.f]`.
fn parse_clock(s: &str) -> Option<NaiveTime> {
    let (main, fraction) = match s.find(['.', ',']) {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    };

    let fields: Vec<&str> = if main.contains(':') {
        main.split(':').collect()
    } else {
        match main.len() {
            2 => vec![main],
            4 => vec![&main[..2], &main[2..]],
            6 => vec![&main[..2], &main[2..4], &main[4..]],
            _ => return None,
        }
    };
    if fields.is_empty() || fields.len() > 3 {
        return None;
    }

    let hour = two_digits(fields[0])?;
    let minute = fields.get(1).map_or(Some(0), |f| two_digits(f))?;
    let second = fields.get(2).map_or(Some(0), |f| two_digits(f))?;

    let nanos = match fraction {
        // Fractions only follow seconds.
        Some(_) if fields.len() < 3 => return None,
        Some(frac) => fraction_nanos(frac)?,
        None => 0,
    };
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

fn two_digits(s: &str) -> Option<u32> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Fractional seconds truncated to nanosecond precision.
fn fraction_nanos(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded: String = s.chars().chain(std::iter::repeat('0')).take(9).collect();
    padded.parse().ok()
}
