//! Coordinates, country codes and the approximate great-circle distance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GeoError, GeoResult};

/// A WGS84 latitude/longitude pair, in degrees.
///
/// Equality is exact floating-point equality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat", alias = "latitude")]
    pub latitude: f64,
    #[serde(rename = "lon", alias = "longitude")]
    pub longitude: f64,
}

impl Coordinate {
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Shift by the given deltas (degrees).
    #[inline]
    pub fn offset(&self, d_lat: f64, d_lon: f64) -> Self {
        Self::new(self.latitude + d_lat, self.longitude + d_lon)
    }

    /// True when both axes are within `tolerance` degrees of `other`.
    pub fn is_near(&self, other: &Coordinate, tolerance: f64) -> bool {
        (self.latitude - other.latitude).abs() < tolerance
            && (self.longitude - other.longitude).abs() < tolerance
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Approximate distance in kilometres between two coordinates (spherical law of cosines).
///
/// Callers only rely on the ordering of the returned values. The cosine term is
/// clamped to `[-1, 1]` so rounding on nearly identical points cannot produce NaN.
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }
    let theta = a.longitude - b.longitude;
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let cos_d = lat_a.sin() * lat_b.sin() + lat_a.cos() * lat_b.cos() * theta.to_radians().cos();
    let d = cos_d.clamp(-1.0, 1.0).acos();
    let miles = d.to_degrees() * 60.0 * 1.1515;
    miles * 1.609344
}

/// ISO 3166-1 alpha-2 country code, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Country(String);

impl Country {
    /// Parse a two-letter code; case-insensitive.
    pub fn parse(code: &str) -> GeoResult<Self> {
        let trimmed = code.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(GeoError::InvalidRequest(format!(
                "unknown country code '{code}'"
            )));
        }
        Ok(Country(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Country {
    type Error = GeoError;

    fn try_from(value: String) -> GeoResult<Self> {
        Country::parse(&value)
    }
}

impl From<Country> for String {
    fn from(country: Country) -> Self {
        country.0
    }
}

impl std::str::FromStr for Country {
    type Err = GeoError;

    fn from_str(s: &str) -> GeoResult<Self> {
        Country::parse(s)
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_zero_for_identical_points() {
        let p = Coordinate::new(48.85, 2.35);
        assert_eq!(distance(&p, &p), 0.0);
    }

    #[test]
    fn distance_paris_lyon_is_about_390_km() {
        let paris = Coordinate::new(48.8566, 2.3522);
        let lyon = Coordinate::new(45.7640, 4.8357);
        let d = distance(&paris, &lyon);
        assert!((d - 391.5).abs() < 2.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric_and_finite_for_close_points() {
        let a = Coordinate::new(45.0, 5.0);
        let b = Coordinate::new(45.0, 5.000_000_000_1);
        assert!(distance(&a, &b).is_finite());
        assert_eq!(distance(&a, &b), distance(&b, &a));
    }

    #[test]
    fn distance_preserves_ordering() {
        let origin = Coordinate::new(0.0, 0.0);
        let near = Coordinate::new(0.1, 0.1);
        let far = Coordinate::new(1.0, 1.0);
        assert!(distance(&origin, &near) < distance(&origin, &far));
    }

    #[test]
    fn coordinate_serializes_as_lat_lon_pair() {
        let json = serde_json::to_string(&Coordinate::new(1.5, -2.0)).unwrap();
        assert_eq!(json, r#"{"lat":1.5,"lon":-2.0}"#);
        let back: Coordinate = serde_json::from_str(r#"{"latitude":1.5,"longitude":-2.0}"#).unwrap();
        assert_eq!(back, Coordinate::new(1.5, -2.0));
    }

    #[test]
    fn country_parsing_normalizes_case() {
        assert_eq!(Country::parse("fr").unwrap().as_str(), "FR");
        assert!(matches!(
            Country::parse("FRA"),
            Err(GeoError::InvalidRequest(_))
        ));
        assert!(Country::parse("1E").is_err());
        assert!(serde_json::from_str::<Country>("\"XYZ\"").is_err());
    }
}
