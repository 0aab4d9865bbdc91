// src/ingest/mod.rs
pub mod types;

use crate::error::IngestError;
use crate::ingest::types::{Listing, ListingId, RawListing, UNKNOWN_ADDRESS};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "listings_ingested_total",
            "Listings kept after normalization."
        );
        describe_counter!(
            "listings_dropped_total",
            "Raw rows dropped (no id, no coordinates, duplicate id)."
        );
        describe_counter!(
            "listings_unreadable_rows_total",
            "Dataset rows the CSV reader could not decode."
        );
        describe_histogram!("ingest_normalize_ms", "Normalization time in milliseconds.");
    });
}

/// Read raw listing rows from any CSV source.
///
/// Rows the reader cannot decode are skipped; only an unreadable source fails.
pub fn read_raw_records<R: Read>(reader: R) -> Result<Vec<RawListing>, IngestError> {
    ensure_metrics_described();
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Header problems mean the source itself is unusable.
    rdr.headers()?;

    let mut out = Vec::new();
    for (row, result) in rdr.deserialize::<RawListing>().enumerate() {
        match result {
            Ok(raw) => out.push(raw),
            Err(e) => {
                tracing::warn!(target: "ingest", row, error = %e, "skipping unreadable row");
                counter!("listings_unreadable_rows_total").increment(1);
            }
        }
    }
    Ok(out)
}

/// Read raw listing rows from a CSV file on disk.
pub fn load_raw_records(path: &Path) -> Result<Vec<RawListing>, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_raw_records(file)
}

/// Parse an optional numeric field. Anything that is not a finite number is absent.
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer fields may arrive as `3` or `3.0`; fractional parts are truncated.
pub fn parse_integer(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    parse_number(Some(s)).map(|v| v.trunc() as i64)
}

fn parse_id(raw: Option<&str>) -> Option<ListingId> {
    let s = raw?.trim();
    if let Ok(v) = s.parse::<ListingId>() {
        return Some(v);
    }
    // "12345.0" from float-typed exports
    parse_number(Some(s))
        .filter(|v| *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as ListingId)
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "y" | "t")
    )
}

/// Pull `streetAddress` out of the address JSON, falling back to [`UNKNOWN_ADDRESS`].
pub fn street_address(raw: Option<&str>) -> String {
    raw.and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
        .and_then(|v| {
            v.get("streetAddress")
                .and_then(|a| a.as_str())
                .map(|a| a.trim().to_string())
        })
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}

/// Clean a single raw row. `None` when the row has no usable id or coordinates.
pub fn normalize_record(raw: &RawListing) -> Option<Listing> {
    let id = parse_id(raw.zpid.as_deref())?;
    let latitude = parse_number(raw.latitude.as_deref())?;
    let longitude = parse_number(raw.longitude.as_deref())?;

    Some(Listing {
        id,
        latitude,
        longitude,
        price: parse_number(raw.price.as_deref()),
        market_value_estimate: parse_number(raw.zestimate.as_deref()),
        rent_estimate: parse_number(raw.rent_zestimate.as_deref()),
        bedrooms: parse_integer(raw.bedrooms.as_deref()),
        bathrooms: parse_integer(raw.bathrooms.as_deref()),
        living_area_sqft: parse_integer(raw.living_area.as_deref()),
        street_address: street_address(raw.address.as_deref()),
        is_off_market: parse_flag(raw.is_off_market.as_deref()),
        detail_url: raw
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        annual_rent: None,
        gross_rental_yield_pct: None,
    })
}

/// Normalize raw rows into canonical listings.
///
/// Drops rows without id or coordinates and later duplicates of an id. Economic
/// fields that fail to parse become absent instead of failing the row.
pub fn normalize(raw: &[RawListing]) -> Vec<Listing> {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let mut seen: HashSet<ListingId> = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    for r in raw {
        let Some(listing) = normalize_record(r) else {
            dropped += 1;
            continue;
        };
        if !seen.insert(listing.id) {
            tracing::warn!(target: "ingest", id = listing.id, "duplicate listing id dropped");
            dropped += 1;
            continue;
        }
        out.push(listing);
    }

    histogram!("ingest_normalize_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("listings_ingested_total").increment(out.len() as u64);
    counter!("listings_dropped_total").increment(dropped as u64);
    tracing::info!(target: "ingest", kept = out.len(), dropped, "normalized listings");

    out
}

/// Load, normalize and enrich the dataset at `path`.
pub fn load_listings(path: &Path) -> Result<Vec<Listing>, IngestError> {
    let raw = load_raw_records(path)?;
    let mut listings = normalize(&raw);
    crate::yields::enrich(&mut listings);
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, lat: &str, lon: &str) -> RawListing {
        RawListing {
            zpid: Some(id.into()),
            latitude: Some(lat.into()),
            longitude: Some(lon.into()),
            ..Default::default()
        }
    }

    #[test]
    fn rows_without_coordinates_are_dropped() {
        let rows = vec![
            raw("1", "40.1", "-74.2"),
            RawListing {
                zpid: Some("2".into()),
                latitude: Some("40.0".into()),
                ..Default::default()
            },
            raw("3", "", "-74.0"),
            raw("4", "abc", "-74.0"),
        ];
        let out = normalize(&rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);
    }

    #[test]
    fn bad_price_becomes_absent_row_kept() {
        let mut r = raw("7", "1.0", "2.0");
        r.price = Some("call for price".into());
        r.zestimate = Some("350000".into());
        let out = normalize(&[r]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].price, None);
        assert_eq!(out[0].market_value_estimate, Some(350_000.0));
    }

    #[test]
    fn nan_and_inf_are_not_numbers() {
        assert_eq!(parse_number(Some("NaN")), None);
        assert_eq!(parse_number(Some("inf")), None);
        assert_eq!(parse_number(Some(" 12.5 ")), Some(12.5));
        assert_eq!(parse_integer(Some("3.0")), Some(3));
    }

    #[test]
    fn address_falls_back_to_placeholder() {
        assert_eq!(
            street_address(Some(r#"{"streetAddress":"12 Main St","city":"X"}"#)),
            "12 Main St"
        );
        assert_eq!(street_address(Some(r#"{"city":"X"}"#)), UNKNOWN_ADDRESS);
        assert_eq!(street_address(Some("not json")), UNKNOWN_ADDRESS);
        assert_eq!(street_address(None), UNKNOWN_ADDRESS);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let mut a = raw("9", "1", "1");
        a.price = Some("1".into());
        let mut b = raw("9", "2", "2");
        b.price = Some("2".into());
        let out = normalize(&[a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].price, Some(1.0));
    }

    #[test]
    fn off_market_flag_spellings() {
        assert!(parse_flag(Some("True")));
        assert!(parse_flag(Some("1")));
        assert!(!parse_flag(Some("False")));
        assert!(!parse_flag(Some("maybe")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn reads_csv_with_missing_columns() {
        let csv = "zpid,latitude,longitude,price,isOffMarket\n\
                   1,40.0,-74.0,250000,False\n\
                   2,,-74.0,1,False\n";
        let rows = read_raw_records(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].price.as_deref(), Some("250000"));
        assert_eq!(rows[0].zestimate, None);
        assert_eq!(normalize(&rows).len(), 1);
    }
}
