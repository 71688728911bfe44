use std::fmt::Display;

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Number of decimal places kept when a distance is shown to a user. Pricing always uses the unrounded value.
pub const DISPLAY_PRECISION: i32 = 2;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() &&
            self.lng.is_finite() &&
            (-90.0..=90.0).contains(&self.lat) &&
            (-180.0..=180.0).contains(&self.lng)
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_km(self, other)
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// Great-circle distance between two points in kilometres (haversine formula).
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) +
        a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    // Guard against h creeping past 1.0 through float error for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Rounds a distance to [`DISPLAY_PRECISION`] decimal places.
pub fn round_km(km: f64) -> f64 {
    let factor = 10f64.powi(DISPLAY_PRECISION);
    (km * factor).round() / factor
}

#[cfg(test)]
mod test {
    use super::*;

    const BAMAKO: GeoPoint = GeoPoint { lat: 12.6392, lng: -8.0029 };
    const SEGOU: GeoPoint = GeoPoint { lat: 13.4317, lng: -6.2157 };

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(haversine_km(&BAMAKO, &BAMAKO), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = haversine_km(&BAMAKO, &SEGOU);
        let back = haversine_km(&SEGOU, &BAMAKO);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn known_distance() {
        // Bamako to Ségou is a little over 210 km as the crow flies
        let d = haversine_km(&BAMAKO, &SEGOU);
        assert!(d > 205.0 && d < 220.0, "unexpected distance {d}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_km(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.01, "unexpected distance {d}");
    }

    #[test]
    fn rounding_for_display() {
        assert_eq!(round_km(6.367_891), 6.37);
        assert_eq!(round_km(0.004), 0.0);
    }

    #[test]
    fn validity() {
        assert!(BAMAKO.is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::NAN).is_valid());
    }
}
