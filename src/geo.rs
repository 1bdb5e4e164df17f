//! Geographic coordinate type and great-circle distance.
//!
//! Distances are computed with the haversine formula on a spherical Earth
//! (R = 6,371,000 m). That is accurate to well under 0.5% over the distances
//! a wake-up radius deals with; the tracking logic only ever compares a
//! distance against a radius of at most 2 km.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic position in floating-point degrees.
///
/// Pure value type: two coordinates are the same place exactly when their
/// fields are equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether the coordinate lies within the valid WGS-84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = String;

    /// Parse a `"lat,lon"` pair as passed on the command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected 'lat,lon', got '{s}'"))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
        let coord = Coordinate::new(latitude, longitude);
        if !coord.is_valid() {
            return Err(format!("coordinate out of range: {coord}"));
        }
        Ok(coord)
    }
}

/// Haversine great-circle distance between two coordinates, in meters.
///
/// Deterministic and total: no failure modes, symmetric in its arguments,
/// and `distance_meters(a, a) == 0.0`.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    // One degree along a meridian (or along the equator) is ~111.195 km on
    // the spherical model.
    const ONE_DEGREE_M: f64 = 111_195.0;

    fn assert_close(actual: f64, expected: f64, rel_tolerance: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta <= expected.abs() * rel_tolerance,
            "expected ~{expected}, got {actual}"
        );
    }

    #[test]
    fn zero_distance_for_identical_points() {
        let p = Coordinate::new(52.52, 13.405);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 1.0);
        assert_close(distance_meters(a, b), ONE_DEGREE_M, 0.01);
    }

    #[test]
    fn one_degree_of_latitude() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        assert_close(distance_meters(a, b), ONE_DEGREE_M, 0.01);
    }

    #[test]
    fn symmetric_within_float_tolerance() {
        let a = Coordinate::new(40.7128, -74.0060);
        let b = Coordinate::new(51.5074, -0.1278);
        let ab = distance_meters(a, b);
        let ba = distance_meters(b, a);
        assert_close(ab, ba, 1e-6);
    }

    #[test]
    fn known_city_pair() {
        // NYC to London is ~5,570 km.
        let nyc = Coordinate::new(40.7128, -74.0060);
        let london = Coordinate::new(51.5074, -0.1278);
        assert_close(distance_meters(nyc, london), 5_570_000.0, 0.01);
    }

    #[test]
    fn short_hop_is_metre_scale() {
        // ~111 m: a thousandth of a degree of longitude at the equator.
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 0.001);
        assert_close(distance_meters(a, b), 111.195, 0.01);
    }

    #[test]
    fn coordinate_parsing() {
        let c: Coordinate = "52.52, 13.405".parse().unwrap();
        assert_eq!(c, Coordinate::new(52.52, 13.405));

        assert!("not-a-coordinate".parse::<Coordinate>().is_err());
        assert!("91.0,0.0".parse::<Coordinate>().is_err());
        assert!("0.0,181.0".parse::<Coordinate>().is_err());
    }
}
