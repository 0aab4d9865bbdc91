//! # Yield Calculator
//! Derives annual rent and gross rental yield for each listing, in place.
//!
//! Yield is only ever a finite number or absent: a zero or missing valuation
//! yields `None` rather than an infinite or NaN percentage.

use crate::ingest::types::Listing;

/// Monthly rent estimate annualized.
pub fn annual_rent(rent_estimate: Option<f64>) -> Option<f64> {
    rent_estimate.map(|r| r * 12.0)
}

/// `(annual_rent / market_value) * 100`, absent whenever the result would not be finite.
pub fn gross_rental_yield_pct(annual_rent: Option<f64>, market_value: Option<f64>) -> Option<f64> {
    let rent = annual_rent?;
    let value = market_value.filter(|v| *v != 0.0)?;
    let pct = (rent / value) * 100.0;
    pct.is_finite().then_some(pct)
}

/// Fill the derived fields of one listing.
pub fn enrich_listing(listing: &mut Listing) {
    listing.annual_rent = annual_rent(listing.rent_estimate);
    listing.gross_rental_yield_pct =
        gross_rental_yield_pct(listing.annual_rent, listing.market_value_estimate);
}

/// Fill the derived fields of every listing. Computed once, at dataset build time.
pub fn enrich(listings: &mut [Listing]) {
    listings.iter_mut().for_each(enrich_listing);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_valuation_gives_absent_yield() {
        let rent = annual_rent(Some(1000.0));
        assert_eq!(rent, Some(12_000.0));
        assert_eq!(gross_rental_yield_pct(rent, Some(0.0)), None);
        assert_eq!(gross_rental_yield_pct(rent, Some(-0.0)), None);
    }

    #[test]
    fn missing_inputs_give_absent_yield() {
        assert_eq!(gross_rental_yield_pct(None, Some(100_000.0)), None);
        assert_eq!(gross_rental_yield_pct(Some(12_000.0), None), None);
        assert_eq!(annual_rent(None), None);
    }

    #[test]
    fn regular_yield() {
        let y = gross_rental_yield_pct(annual_rent(Some(1500.0)), Some(300_000.0)).unwrap();
        assert!((y - 6.0).abs() < 1e-9);
    }

    #[test]
    fn overflowing_division_is_absent() {
        assert_eq!(gross_rental_yield_pct(Some(f64::MAX), Some(1e-300)), None);
    }
}
