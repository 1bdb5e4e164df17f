//! Destination search via the OpenStreetMap Nominatim geocoder.

use serde::Deserialize;

use crate::constants::{MIN_SEARCH_QUERY_LEN, PROVIDER_HTTP_TIMEOUT};
use crate::geo::Coordinate;
use crate::providers::ProviderError;

const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
const RESULT_LIMIT: u8 = 5;

/// One geocoding hit offered to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub name: String,
    pub coordinate: Coordinate,
    pub address: Option<String>,
    pub source_url: Option<String>,
}

/// Raw Nominatim place as it arrives on the wire. Coordinates are strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    osm_type: Option<String>,
    #[serde(default)]
    osm_id: Option<u64>,
}

/// Forward geocoder over Nominatim's public instance.
pub struct Geocoder {
    client: reqwest::blocking::Client,
}

impl Geocoder {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("wakepoint/", env!("CARGO_PKG_VERSION")))
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Look up locations matching free text.
    ///
    /// Queries shorter than [`MIN_SEARCH_QUERY_LEN`] return an empty list
    /// without touching the network.
    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            return Ok(Vec::new());
        }

        let url = format!(
            "{NOMINATIM_ENDPOINT}?q={}&format=json&addressdetails=1&limit={RESULT_LIMIT}&dedupe=1",
            urlencoding::encode(query)
        );
        let places: Vec<NominatimPlace> =
            self.client.get(url).send()?.error_for_status()?.json()?;

        Ok(places.into_iter().filter_map(place_to_result).collect())
    }
}

/// Convert one wire place into a search result, dropping unparseable hits.
fn place_to_result(place: NominatimPlace) -> Option<SearchResult> {
    let latitude: f64 = place.lat.parse().ok()?;
    let longitude: f64 = place.lon.parse().ok()?;
    let coordinate = Coordinate::new(latitude, longitude);
    if !coordinate.is_valid() {
        return None;
    }

    // Prefer the specific place name; fall back to the address's first part.
    let name = place
        .name
        .filter(|n| !n.is_empty())
        .or_else(|| {
            place
                .display_name
                .split(',')
                .next()
                .map(|s| s.trim().to_string())
        })
        .unwrap_or_else(|| place.display_name.clone());

    let source_url = match (place.osm_type.as_deref(), place.osm_id) {
        (Some(osm_type), Some(osm_id)) => Some(format!(
            "https://www.openstreetmap.org/{osm_type}/{osm_id}"
        )),
        _ => None,
    };

    Some(SearchResult {
        name,
        coordinate,
        address: Some(place.display_name),
        source_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"[
        {
            "osm_type": "node",
            "osm_id": 26861566,
            "lat": "48.8566",
            "lon": "2.3522",
            "name": "Paris",
            "display_name": "Paris, Île-de-France, France"
        },
        {
            "osm_type": "relation",
            "osm_id": 71525,
            "lat": "invalid",
            "lon": "2.0",
            "name": "Broken",
            "display_name": "Broken, Nowhere"
        },
        {
            "lat": "45.7640",
            "lon": "4.8357",
            "name": "",
            "display_name": "Lyon, Auvergne-Rhône-Alpes, France"
        }
    ]"#;

    #[test]
    fn decodes_and_filters_nominatim_payload() {
        let places: Vec<NominatimPlace> = serde_json::from_str(FIXTURE).unwrap();
        let results: Vec<SearchResult> =
            places.into_iter().filter_map(place_to_result).collect();

        // The unparseable latitude is dropped.
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].name, "Paris");
        assert_eq!(results[0].coordinate, Coordinate::new(48.8566, 2.3522));
        assert_eq!(
            results[0].source_url.as_deref(),
            Some("https://www.openstreetmap.org/node/26861566")
        );

        // Empty name falls back to the first address segment; no OSM id
        // means no source link.
        assert_eq!(results[1].name, "Lyon");
        assert_eq!(results[1].source_url, None);
    }

    #[test]
    fn short_queries_do_not_hit_the_network() {
        let geocoder = Geocoder::new().unwrap();
        assert_eq!(geocoder.search("ab").unwrap(), Vec::new());
        assert_eq!(geocoder.search("  a ").unwrap(), Vec::new());
    }
}
