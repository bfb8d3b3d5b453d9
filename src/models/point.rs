//! Geographic points and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for every distance in the service.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// WGS84 latitude bound in degrees, either side of the equator
pub const MAX_LATITUDE: f64 = 90.0;
/// WGS84 longitude bound in degrees, either side of the prime meridian
pub const MAX_LONGITUDE: f64 = 180.0;

/// Geographic point (lat/lon) in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in kilometers
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        great_circle_km(*self, *other)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// Spherical law of cosines distance between two points.
///
/// This is the same expression the MySQL store evaluates per row. The cosine
/// sum can land a hair outside [-1, 1] for identical or antipodal points, so it
/// is clamped before `acos`.
pub fn great_circle_km(origin: GeoPoint, target: GeoPoint) -> f64 {
    let lat1 = origin.lat.to_radians();
    let lat2 = target.lat.to_radians();
    let delta_lon = target.lon.to_radians() - origin.lon.to_radians();

    let cosine = lat1.cos() * lat2.cos() * delta_lon.cos() + lat1.sin() * lat2.sin();

    EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let points = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(40.7128, -74.0060),
            GeoPoint::new(-33.8688, 151.2093),
            GeoPoint::new(51.5074, -0.1278),
            GeoPoint::new(89.9999, 179.9999),
            GeoPoint::new(12.345678901, -98.7654321),
        ];

        for p in points {
            let d = great_circle_km(p, p);
            assert!(!d.is_nan(), "distance for {} is NaN", p);
            assert!(d < 1e-3, "distance for {} was {}", p, d);
        }
    }

    #[test]
    fn test_one_degree_diagonal() {
        let d = great_circle_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0));
        assert!((d - 157.25).abs() < 0.5, "got {}", d);
    }

    #[test]
    fn test_antipodal_points() {
        let d = great_circle_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0));
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!(!d.is_nan());
        assert!((d - half_circumference).abs() < 1e-6);
    }

    #[test]
    fn test_symmetric() {
        let a = GeoPoint::new(48.8566, 2.3522);
        let b = GeoPoint::new(52.5200, 13.4050);
        assert!((a.distance_km(&b) - b.distance_km(&a)).abs() < 1e-9);
        // Paris to Berlin is roughly 878 km
        assert!((a.distance_km(&b) - 878.0).abs() < 5.0);
    }
}
