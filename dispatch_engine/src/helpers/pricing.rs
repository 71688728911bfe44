use serde::{Deserialize, Serialize};

use crate::{db_types::Amount, helpers::GeoPoint};

/// Per-km rate used when no dynamic towing rate is configured.
pub const LEGACY_PRICE_PER_KM: Amount = Amount::new(500);

/// Towing pricing parameters, as read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowingTariff {
    pub base_price: Amount,
    /// `None` when the dynamic rate is not configured; [`LEGACY_PRICE_PER_KM`] applies instead.
    pub price_per_km: Option<Amount>,
}

impl TowingTariff {
    pub fn effective_price_per_km(&self) -> Amount {
        self.price_per_km.unwrap_or(LEGACY_PRICE_PER_KM)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Full-precision route distance in km.
    pub distance_km: f64,
    pub price: Amount,
}

/// Prices a towing job.
///
/// The route is operator → client → destination. When `operator` is `None` (e.g. the estimate shown to a client
/// before anyone is matched) only the client → destination leg is counted.
///
/// `price = max(base_price, price_per_km × distance)`
pub fn towing_quote(
    tariff: &TowingTariff,
    operator: Option<&GeoPoint>,
    origin: &GeoPoint,
    destination: &GeoPoint,
) -> PriceQuote {
    let approach = operator.map(|op| op.distance_to(origin)).unwrap_or(0.0);
    let distance_km = approach + origin.distance_to(destination);
    #[allow(clippy::cast_precision_loss)]
    let per_km = tariff.effective_price_per_km().value() as f64;
    let distance_price = Amount::try_from(per_km * distance_km).unwrap_or(tariff.base_price);
    PriceQuote { distance_km, price: distance_price.max(tariff.base_price) }
}

/// Non-towing services are priced from the catalog and do not depend on distance.
pub fn flat_price(catalog_price: Amount) -> PriceQuote {
    PriceQuote { distance_km: 0.0, price: catalog_price }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tariff(per_km: Option<i64>) -> TowingTariff {
        TowingTariff { base_price: Amount::from(10_000), price_per_km: per_km.map(Amount::from) }
    }

    #[test]
    fn short_tows_cost_the_base_price() {
        let origin = GeoPoint::new(12.62, -8.00);
        let destination = GeoPoint::new(12.65, -8.05);
        let operator = GeoPoint::new(12.63, -8.01);
        let quote = towing_quote(&tariff(Some(500)), Some(&operator), &origin, &destination);
        let expected_km = operator.distance_to(&origin) + origin.distance_to(&destination);
        assert!((quote.distance_km - expected_km).abs() < 1e-9);
        // ~7.9 km x 500 is below the base price
        assert_eq!(quote.price, Amount::from(10_000));
    }

    #[test]
    fn long_tows_are_priced_by_distance() {
        let origin = GeoPoint::new(12.6392, -8.0029);
        let destination = GeoPoint::new(13.4317, -6.2157);
        let quote = towing_quote(&tariff(Some(500)), None, &origin, &destination);
        let expected = Amount::try_from(500.0 * quote.distance_km).unwrap();
        assert_eq!(quote.price, expected);
        assert!(quote.price > Amount::from(100_000));
    }

    #[test]
    fn missing_rate_falls_back_to_the_legacy_constant() {
        let origin = GeoPoint::new(12.6392, -8.0029);
        let destination = GeoPoint::new(13.4317, -6.2157);
        let dynamic = towing_quote(&tariff(Some(LEGACY_PRICE_PER_KM.value())), None, &origin, &destination);
        let legacy = towing_quote(&tariff(None), None, &origin, &destination);
        assert_eq!(dynamic, legacy);
    }

    #[test]
    fn operator_leg_is_included() {
        let origin = GeoPoint::new(12.6392, -8.0029);
        let destination = GeoPoint::new(13.4317, -6.2157);
        let far_operator = GeoPoint::new(11.3176, -5.6655);
        let without = towing_quote(&tariff(Some(500)), None, &origin, &destination);
        let with = towing_quote(&tariff(Some(500)), Some(&far_operator), &origin, &destination);
        assert!(with.price > without.price);
    }

    #[test]
    fn flat_prices() {
        assert_eq!(flat_price(Amount::from(5_000)).price, Amount::from(5_000));
    }
}
