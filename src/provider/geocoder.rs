//! Reverse and forward geocoding against a Nominatim-compatible server.

use std::time::Duration;

use serde::Deserialize;

use crate::constants::{FORWARD_GEOCODE_LIMIT, GEOCODE_TIMEOUT_SECS};
use crate::geo::LonLat;

/// Default public geocoder. Self-hosted instances work too, as long as they
/// speak the Nominatim `jsonv2` format.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Structured address fields the geocoder may attach to a candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressDetails {
    /// Country name in the server's locale
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 code, lowercase on the wire (e.g. "ng")
    pub country_code: Option<String>,
}

/// One candidate place returned by the geocoder.
///
/// Coordinates arrive as decimal strings, per the Nominatim wire format.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeCandidate {
    pub lat: String,
    pub lon: String,
    /// Full human-readable address line
    pub display_name: String,
    #[serde(default)]
    pub address: Option<AddressDetails>,
}

impl GeocodeCandidate {
    /// Parse the wire-format coordinate strings.
    pub fn position(&self) -> Option<LonLat> {
        let lat = self.lat.parse::<f64>().ok()?;
        let lon = self.lon.parse::<f64>().ok()?;
        Some(LonLat::new(lon, lat))
    }

    /// True when the candidate's country code matches `target` (ISO alpha-2,
    /// any case). Candidates without a country code never match.
    pub fn country_matches(&self, target: &str) -> bool {
        self.address
            .as_ref()
            .and_then(|a| a.country_code.as_deref())
            .is_some_and(|code| code.eq_ignore_ascii_case(target))
    }
}

/// Outcome of one geocoding request.
#[derive(Debug)]
pub struct GeocodeOutcome {
    /// Candidates in server ranking order; empty means "nothing there"
    pub candidates: Vec<GeocodeCandidate>,
    /// Transport or parse failure, distinct from an empty result
    pub error: Option<String>,
}

impl GeocodeOutcome {
    pub fn success(candidates: Vec<GeocodeCandidate>) -> Self {
        Self {
            candidates,
            error: None,
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            candidates: Vec::new(),
            error: Some(message),
        }
    }

    /// The request worked but found nothing.
    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.candidates.is_empty()
    }
}

/// Reverse lookups answer with a single object; "nothing here" arrives as an
/// `error` field inside a 200 response rather than an HTTP error.
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    error: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    address: Option<AddressDetails>,
}

impl ReverseResponse {
    fn into_outcome(self) -> GeocodeOutcome {
        if self.error.is_some() {
            // Open water or unmapped ground: a valid "no address" answer
            return GeocodeOutcome::success(Vec::new());
        }
        match (self.lat, self.lon, self.display_name) {
            (Some(lat), Some(lon), Some(display_name)) => {
                GeocodeOutcome::success(vec![GeocodeCandidate {
                    lat,
                    lon,
                    display_name,
                    address: self.address,
                }])
            }
            _ => GeocodeOutcome::success(Vec::new()),
        }
    }
}

/// Geocoder endpoint plus the identification every request carries.
#[derive(Debug, Clone)]
pub struct Geocoder {
    pub base_url: String,
    pub user_agent: String,
}

impl Geocoder {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Look up the address under a point. Blocks on network I/O.
    pub fn reverse(&self, position: LonLat) -> GeocodeOutcome {
        let url = format!("{}/reverse", self.base_url.trim_end_matches('/'));
        let response = ureq::get(&url)
            .set("User-Agent", &self.user_agent)
            .timeout(Duration::from_secs(GEOCODE_TIMEOUT_SECS))
            .query("format", "jsonv2")
            .query("lat", &position.lat.to_string())
            .query("lon", &position.lon.to_string())
            .query("addressdetails", "1")
            .call();

        match response {
            Ok(resp) => match resp.into_json::<ReverseResponse>() {
                Ok(parsed) => parsed.into_outcome(),
                Err(e) => {
                    GeocodeOutcome::failure(format!("Failed to parse geocoder reply: {}", e))
                }
            },
            Err(ureq::Error::Status(code, _)) => {
                GeocodeOutcome::failure(format!("Geocoder returned HTTP {}", code))
            }
            Err(e) => GeocodeOutcome::failure(format!("Failed to reach geocoder: {}", e)),
        }
    }

    /// Find places matching free-form address text inside one country.
    pub fn search(&self, query_text: &str, country: &str) -> GeocodeOutcome {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let response = ureq::get(&url)
            .set("User-Agent", &self.user_agent)
            .timeout(Duration::from_secs(GEOCODE_TIMEOUT_SECS))
            .query("format", "jsonv2")
            .query("q", query_text)
            .query("limit", &FORWARD_GEOCODE_LIMIT.to_string())
            .query("countrycodes", &country.to_ascii_lowercase())
            .query("addressdetails", "1")
            .call();

        match response {
            Ok(resp) => match resp.into_json::<Vec<GeocodeCandidate>>() {
                Ok(candidates) => GeocodeOutcome::success(candidates),
                Err(e) => {
                    GeocodeOutcome::failure(format!("Failed to parse geocoder reply: {}", e))
                }
            },
            Err(ureq::Error::Status(code, _)) => {
                GeocodeOutcome::failure(format!("Geocoder returned HTTP {}", code))
            }
            Err(e) => GeocodeOutcome::failure(format!("Failed to reach geocoder: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reverse_with_address() {
        let json = r#"{
            "place_id": 133847955,
            "lat": "6.4550575",
            "lon": "3.3941795",
            "display_name": "Broad Street, Lagos Island, Lagos, Nigeria",
            "address": {
                "road": "Broad Street",
                "city": "Lagos",
                "country": "Nigeria",
                "country_code": "ng"
            }
        }"#;

        let parsed: ReverseResponse = serde_json::from_str(json).unwrap();
        let outcome = parsed.into_outcome();
        assert!(outcome.error.is_none());
        assert_eq!(outcome.candidates.len(), 1);

        let candidate = &outcome.candidates[0];
        assert_eq!(
            candidate.display_name,
            "Broad Street, Lagos Island, Lagos, Nigeria"
        );
        assert!(candidate.country_matches("ng"));

        let pos = candidate.position().unwrap();
        assert!((pos.lat - 6.4550575).abs() < 1e-9);
        assert!((pos.lon - 3.3941795).abs() < 1e-9);
    }

    #[test]
    fn test_parse_reverse_error_is_empty_not_failure() {
        // Nominatim reports open water as a 200 with an error field
        let json = r#"{"error": "Unable to geocode"}"#;

        let parsed: ReverseResponse = serde_json::from_str(json).unwrap();
        let outcome = parsed.into_outcome();
        assert!(outcome.is_empty());
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_parse_search_candidate_list() {
        let json = r#"[
            {
                "lat": "6.4433",
                "lon": "3.4066",
                "display_name": "Awolowo Road, Ikoyi, Lagos, Nigeria",
                "address": {"country_code": "ng"}
            },
            {
                "lat": "9.0765",
                "lon": "7.3986",
                "display_name": "Awolowo Road, Abuja, Nigeria",
                "address": {"country_code": "ng"}
            }
        ]"#;

        let candidates: Vec<GeocodeCandidate> = serde_json::from_str(json).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].position().is_some());
    }

    #[test]
    fn test_parse_search_empty_list() {
        let candidates: Vec<GeocodeCandidate> = serde_json::from_str("[]").unwrap();
        let outcome = GeocodeOutcome::success(candidates);
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_country_match_is_case_insensitive() {
        let json = r#"{
            "lat": "6.5",
            "lon": "3.4",
            "display_name": "Somewhere, Nigeria",
            "address": {"country_code": "ng"}
        }"#;
        let candidate: GeocodeCandidate = serde_json::from_str(json).unwrap();

        assert!(candidate.country_matches("ng"));
        assert!(candidate.country_matches("NG"));
        assert!(!candidate.country_matches("gh"));
    }

    #[test]
    fn test_missing_country_code_never_matches() {
        let json = r#"{
            "lat": "6.5",
            "lon": "3.4",
            "display_name": "Somewhere"
        }"#;
        let candidate: GeocodeCandidate = serde_json::from_str(json).unwrap();

        assert!(candidate.address.is_none());
        assert!(!candidate.country_matches("ng"));
    }

    #[test]
    fn test_position_rejects_malformed_coordinates() {
        let candidate = GeocodeCandidate {
            lat: "not-a-number".to_string(),
            lon: "3.4".to_string(),
            display_name: "Broken".to_string(),
            address: None,
        };
        assert!(candidate.position().is_none());
    }

    #[test]
    fn test_outcome_failure_is_not_empty() {
        let outcome = GeocodeOutcome::failure("timed out".to_string());
        assert!(!outcome.is_empty());
        assert_eq!(outcome.error, Some("timed out".to_string()));
    }
}
