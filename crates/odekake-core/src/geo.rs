//! Great-circle distance and device location.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres, rounded to one decimal.
///
/// Callers check that both points exist before calling; non-finite input
/// yields NaN.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    (EARTH_RADIUS_KM * c * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Source of the device position.
///
/// Lookups are best effort: `None` means "not known yet" (no permission,
/// no fix) and is never an error.
pub trait LocationProvider {
    fn current_location(&self) -> Option<GeoPoint>;
}

/// Never knows where the device is.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn current_location(&self) -> Option<GeoPoint> {
        None
    }
}

/// A configured home point.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub GeoPoint);

impl LocationProvider for FixedLocation {
    fn current_location(&self) -> Option<GeoPoint> {
        Some(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(distance_km(31.5966, 130.5571, 31.5966, 130.5571), 0.0);
    }

    #[test]
    fn tenmonkan_to_sakurajima() {
        // 天文館公園 -> 桜島ビジターセンター, roughly 4.3 km across the bay
        let d = distance_km(31.591, 130.555, 31.5932, 130.6010);
        assert!((4.2..=4.5).contains(&d), "got {d}");
        assert_eq!(d, (d * 10.0).round() / 10.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(31.5844, 130.5419);
        let b = GeoPoint::new(35.6812, 139.7671);
        assert_eq!(a.distance_to(&b), b.distance_to(&a));
        assert!(a.distance_to(&b) > 900.0);
    }

    #[test]
    fn providers() {
        assert_eq!(NoLocation.current_location(), None);
        let home = GeoPoint::new(31.6, 130.55);
        assert_eq!(FixedLocation(home).current_location(), Some(home));
    }
}
