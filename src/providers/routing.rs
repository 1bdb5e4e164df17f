//! Route traces via the public OSRM demo server.
//!
//! The trace is a display overlay only: the alarm always measures the
//! straight-line distance to the target, never distance along the route.
//! Any failure here therefore collapses to an empty trace.

use serde::Deserialize;

use crate::constants::PROVIDER_HTTP_TIMEOUT;
use crate::geo::Coordinate;
use crate::providers::ProviderError;

const OSRM_ENDPOINT: &str = "https://router.project-osrm.org/route/v1/driving";

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: longitude first.
    coordinates: Vec<[f64; 2]>,
}

/// Best-effort path lookup between two coordinates.
pub struct Router {
    client: reqwest::blocking::Client,
}

impl Router {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("wakepoint/", env!("CARGO_PKG_VERSION")))
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch a route trace for display. Empty on any failure.
    pub fn route(&self, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
        match self.fetch(start, end) {
            Ok(trace) => trace,
            Err(e) => {
                log_debug!("Route lookup failed (overlay skipped): {e}");
                Vec::new()
            }
        }
    }

    fn fetch(&self, start: Coordinate, end: Coordinate) -> Result<Vec<Coordinate>, ProviderError> {
        let url = format!(
            "{OSRM_ENDPOINT}/{},{};{},{}?overview=full&geometries=geojson",
            start.longitude, start.latitude, end.longitude, end.latitude
        );
        let response: OsrmResponse = self.client.get(url).send()?.error_for_status()?.json()?;
        decode_route(response)
    }
}

fn decode_route(response: OsrmResponse) -> Result<Vec<Coordinate>, ProviderError> {
    if response.code != "Ok" {
        return Err(ProviderError::Malformed(format!(
            "OSRM status '{}'",
            response.code
        )));
    }
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("no routes in response".into()))?;

    Ok(route
        .geometry
        .coordinates
        .into_iter()
        .map(|[lon, lat]| Coordinate::new(lat, lon))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_geojson_route_with_lonlat_order() {
        let payload = r#"{
            "code": "Ok",
            "routes": [
                { "geometry": { "coordinates": [[2.3522, 48.8566], [2.3600, 48.8600]] } }
            ]
        }"#;
        let response: OsrmResponse = serde_json::from_str(payload).unwrap();
        let trace = decode_route(response).unwrap();

        assert_eq!(trace.len(), 2);
        // Latitude comes second on the wire.
        assert_eq!(trace[0], Coordinate::new(48.8566, 2.3522));
    }

    #[test]
    fn non_ok_status_is_an_error() {
        let payload = r#"{ "code": "NoRoute", "routes": [] }"#;
        let response: OsrmResponse = serde_json::from_str(payload).unwrap();
        assert!(decode_route(response).is_err());
    }

    #[test]
    fn missing_routes_is_an_error() {
        let payload = r#"{ "code": "Ok", "routes": [] }"#;
        let response: OsrmResponse = serde_json::from_str(payload).unwrap();
        assert!(decode_route(response).is_err());
    }
}
