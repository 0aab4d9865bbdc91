// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// Stable listing identifier (the provider's `zpid`).
pub type ListingId = u64;

/// Placeholder used when the address payload is unusable.
pub const UNKNOWN_ADDRESS: &str = "Address unavailable";

/// One row of the source dataset, before any cleaning.
///
/// Every field is kept as optional text; coercion happens in [`crate::ingest::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawListing {
    pub zpid: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub price: Option<String>,
    pub zestimate: Option<String>,
    #[serde(rename = "rentZestimate")]
    pub rent_zestimate: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    #[serde(rename = "livingArea")]
    pub living_area: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "isOffMarket")]
    pub is_off_market: Option<String>,
    pub url: Option<String>,
}

/// Canonical listing after cleaning. Read-only once the dataset is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub latitude: f64,
    pub longitude: f64,
    pub price: Option<f64>,
    pub market_value_estimate: Option<f64>,
    pub rent_estimate: Option<f64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub living_area_sqft: Option<i64>,
    /// `streetAddress` taken from the address JSON, or [`UNKNOWN_ADDRESS`].
    pub street_address: String,
    pub is_off_market: bool,
    /// Provider detail page; required for price history retrieval.
    pub detail_url: Option<String>,
    // Derived by `yields::enrich`.
    pub annual_rent: Option<f64>,
    pub gross_rental_yield_pct: Option<f64>,
}
