// src/history/response.rs
//! Everything that knows the provider's informal response protocol lives here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::PricePoint;

const EMPTY_SENTINEL: &str = "snapshot is empty";
const NOT_READY_SENTINEL: &str = "snapshot is not ready";

/// What a status response says about the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus<'a> {
    Empty,
    NotReady,
    /// Anything else: the CSV payload.
    Ready(&'a str),
}

/// Classify a status/result body. Empty is checked before not-ready.
pub fn classify_snapshot_body(body: &str) -> SnapshotStatus<'_> {
    let lower = body.to_ascii_lowercase();
    if lower.contains(EMPTY_SENTINEL) {
        SnapshotStatus::Empty
    } else if lower.contains(NOT_READY_SENTINEL) {
        SnapshotStatus::NotReady
    } else {
        SnapshotStatus::Ready(body)
    }
}

/// Pull `snapshot_id` out of a submission response.
pub fn parse_snapshot_id(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Submitted {
        snapshot_id: String,
    }
    serde_json::from_str::<Submitted>(body)
        .ok()
        .map(|s| s.snapshot_id.trim().to_string())
        .filter(|id| !id.is_empty())
}

#[derive(Debug, Error)]
pub enum PriceCsvError {
    #[error("missing `{0}` column")]
    MissingColumn(&'static str),
    #[error("unreadable csv header: {0}")]
    Header(#[from] csv::Error),
}

/// Normalize the provider's date spellings to a calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    // epoch millis
    s.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.date_naive())
}

/// Parse `$1,250,000.00`-style prices; non-finite values are rejected.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a ready CSV body into points sorted by ascending date.
///
/// Only `date` and `price` are read. Rows that fail to parse are skipped.
pub fn parse_price_history(body: &str) -> Result<Vec<PricePoint>, PriceCsvError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = rdr.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(PriceCsvError::MissingColumn(name))
    };
    let date_idx = column("date")?;
    let price_idx = column("price")?;

    let mut points = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let point = record.ok().and_then(|r| {
            let date = parse_date(r.get(date_idx)?)?;
            let price = parse_price(r.get(price_idx)?)?;
            Some(PricePoint { date, price })
        });
        match point {
            Some(p) => points.push(p),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(target: "history", skipped, "skipped malformed price rows");
    }

    points.sort_by_key(|p| p.date);
    Ok(points)
}
