//! Geographic coordinates.

use serde::{Deserialize, Serialize};

/// Mean earth radius used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Error returned when a latitude or longitude is out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinates: {reason}")]
pub struct InvalidCoordinates {
    reason: &'static str,
}

/// A WGS84 latitude/longitude pair in degrees.
///
/// Latitude is within [-90, 90] and longitude within [-180, 180]; any
/// `Coordinates` value is in range by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

/// Unvalidated wire form of [`Coordinates`].
#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = InvalidCoordinates;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(raw.lat, raw.lng)
    }
}

impl Coordinates {
    /// Create coordinates, validating both components.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidCoordinates> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidCoordinates {
                reason: "latitude must be between -90 and 90",
            });
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(InvalidCoordinates {
                reason: "longitude must be between -180 and 180",
            });
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle (haversine) distance to another point, in kilometres.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos()
                * other.lat.to_radians().cos()
                * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Latitude/longitude deltas (in degrees) that enclose a circle of
    /// `radius_km` around this point. Used to prefilter rows before the
    /// exact distance check.
    pub fn bounding_deltas(&self, radius_km: f64) -> (f64, f64) {
        let d_lat = (radius_km / EARTH_RADIUS_KM).to_degrees();
        let cos_lat = self.lat.to_radians().cos().abs();
        let d_lng = if cos_lat < 1e-6 {
            180.0
        } else {
            (d_lat / cos_lat).min(180.0)
        };
        (d_lat, d_lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rabat() -> Coordinates {
        Coordinates::new(34.0209, -6.8416).unwrap()
    }

    fn casablanca() -> Coordinates {
        Coordinates::new(33.5731, -7.5898).unwrap()
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(-91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, 181.0).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn deserialize_validates() {
        let ok: Coordinates = serde_json::from_str(r#"{"lat": 31.6, "lng": -8.0}"#).unwrap();
        assert_eq!(ok.lat(), 31.6);
        assert!(serde_json::from_str::<Coordinates>(r#"{"lat": 120.0, "lng": 0.0}"#).is_err());
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert!(rabat().distance_km(&rabat()) < 1e-9);
    }

    #[test]
    fn rabat_to_casablanca() {
        let d = rabat().distance_km(&casablanca());
        // Roughly 87 km as the crow flies
        assert!((80.0..95.0).contains(&d), "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = rabat().distance_km(&casablanca());
        let b = casablanca().distance_km(&rabat());
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn bounding_box_contains_radius() {
        let center = rabat();
        let (d_lat, d_lng) = center.bounding_deltas(10.0);
        let north = Coordinates::new(center.lat() + d_lat, center.lng()).unwrap();
        let east = Coordinates::new(center.lat(), center.lng() + d_lng).unwrap();
        assert!((center.distance_km(&north) - 10.0).abs() < 0.01);
        assert!(center.distance_km(&east) >= 9.99);
    }
}
