//! dataset.rs: immutable, shareable view over the enriched listings.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::classify::{classify_listing, Bucket};
use crate::ingest::types::{Listing, ListingId};

/// Cheap to clone; all clones share the same listings.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    listings: Vec<Listing>,
    index: HashMap<ListingId, usize>,
}

/// What the map layer needs to draw one marker and its popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingSummary {
    pub id: ListingId,
    pub latitude: f64,
    pub longitude: f64,
    pub street_address: String,
    pub price: Option<f64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub living_area_sqft: Option<i64>,
    pub market_value_estimate: Option<f64>,
    pub rent_estimate: Option<f64>,
    pub gross_rental_yield_pct: Option<f64>,
    pub bucket: Bucket,
    pub marker_color: &'static str,
    pub detail_url: Option<String>,
}

impl From<&Listing> for ListingSummary {
    fn from(l: &Listing) -> Self {
        let bucket = classify_listing(l);
        Self {
            id: l.id,
            latitude: l.latitude,
            longitude: l.longitude,
            street_address: l.street_address.clone(),
            price: l.price,
            bedrooms: l.bedrooms,
            bathrooms: l.bathrooms,
            living_area_sqft: l.living_area_sqft,
            market_value_estimate: l.market_value_estimate,
            rent_estimate: l.rent_estimate,
            gross_rental_yield_pct: l.gross_rental_yield_pct,
            bucket,
            marker_color: bucket.marker_color(),
            detail_url: l.detail_url.clone(),
        }
    }
}

impl Dataset {
    /// Index the listings by id. If an id repeats, the first listing wins.
    pub fn new(listings: Vec<Listing>) -> Self {
        let mut index = HashMap::with_capacity(listings.len());
        for (pos, l) in listings.iter().enumerate() {
            index.entry(l.id).or_insert(pos);
        }
        Self {
            inner: Arc::new(Inner { listings, index }),
        }
    }

    pub fn get(&self, id: ListingId) -> Option<&Listing> {
        self.inner
            .index
            .get(&id)
            .map(|&pos| &self.inner.listings[pos])
    }

    pub fn contains(&self, id: ListingId) -> bool {
        self.inner.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listing> {
        self.inner.listings.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.listings.is_empty()
    }

    /// Mean latitude/longitude, used to centre the map. `None` for an empty set.
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f64;
        let (lat, lon) = self
            .iter()
            .fold((0.0, 0.0), |(a, b), l| (a + l.latitude, b + l.longitude));
        Some((lat / n, lon / n))
    }

    pub fn summaries(&self) -> Vec<ListingSummary> {
        self.iter().map(ListingSummary::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::UNKNOWN_ADDRESS;

    fn listing(id: ListingId, lat: f64, lon: f64) -> Listing {
        Listing {
            id,
            latitude: lat,
            longitude: lon,
            price: None,
            market_value_estimate: None,
            rent_estimate: None,
            bedrooms: None,
            bathrooms: None,
            living_area_sqft: None,
            street_address: UNKNOWN_ADDRESS.to_string(),
            is_off_market: false,
            detail_url: None,
            annual_rent: None,
            gross_rental_yield_pct: Some(9.0),
        }
    }

    #[test]
    fn lookup_and_center() {
        let ds = Dataset::new(vec![listing(1, 10.0, 20.0), listing(2, 20.0, 40.0)]);
        assert_eq!(ds.len(), 2);
        assert!(ds.contains(2));
        assert!(ds.get(3).is_none());
        assert_eq!(ds.center(), Some((15.0, 30.0)));
        assert_eq!(Dataset::default().center(), None);
    }

    #[test]
    fn summaries_carry_bucket() {
        let ds = Dataset::new(vec![listing(1, 0.0, 0.0)]);
        let s = ds.summaries();
        assert_eq!(s[0].bucket, Bucket::High);
        assert_eq!(s[0].marker_color, "green");
    }
}
