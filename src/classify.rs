//! Yield buckets used to colour map markers.

use serde::{Deserialize, Serialize};

use crate::ingest::types::Listing;

/// Lower bound (inclusive) of the `Medium` band, in percent.
pub const MEDIUM_YIELD_PCT: f64 = 5.0;
/// Lower bound (inclusive) of the `High` band, in percent.
pub const HIGH_YIELD_PCT: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    OffMarket,
    Unknown,
    Low,
    Medium,
    High,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::OffMarket => "off_market",
            Bucket::Unknown => "unknown",
            Bucket::Low => "low",
            Bucket::Medium => "medium",
            Bucket::High => "high",
        }
    }

    /// Marker colour the map layer uses for this bucket.
    pub fn marker_color(self) -> &'static str {
        match self {
            Bucket::OffMarket => "black",
            Bucket::Unknown => "gray",
            Bucket::Low => "red",
            Bucket::Medium => "orange",
            Bucket::High => "green",
        }
    }
}

/// Off-market wins over everything, then missing yield, then the yield bands.
pub fn classify(yield_pct: Option<f64>, off_market: bool) -> Bucket {
    if off_market {
        return Bucket::OffMarket;
    }
    match yield_pct {
        None => Bucket::Unknown,
        Some(y) if y < MEDIUM_YIELD_PCT => Bucket::Low,
        Some(y) if y < HIGH_YIELD_PCT => Bucket::Medium,
        Some(_) => Bucket::High,
    }
}

pub fn classify_listing(listing: &Listing) -> Bucket {
    classify(listing.gross_rental_yield_pct, listing.is_off_market)
}
