//! Nominatim HTTP adapter for forward and reverse geocoding.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{AirError, AirResult, Operation};
use crate::model::{Coordinates, Location};
use crate::traits::Geocoder;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim rejects requests without an identifying agent.
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Reverse lookup detail; 10 resolves to city level.
    pub zoom: u8,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("airwise/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 5,
            zoom: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    config: NominatimConfig,
    client: reqwest::blocking::Client,
}

impl NominatimClient {
    pub fn new(config: NominatimConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        operation: Operation,
    ) -> AirResult<T> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        self.client
            .get(url)
            .query(query)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<T>())
            .map_err(|err| AirError::from_http(operation, err))
    }
}

impl Geocoder for NominatimClient {
    fn resolve(&self, text: &str) -> AirResult<Location> {
        let hits: Vec<SearchHit> = self.get_json(
            "search",
            &[
                ("q", text.to_string()),
                ("format", "json".to_string()),
                ("limit", "1".to_string()),
            ],
            Operation::Geocoding,
        )?;

        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| AirError::not_found(Operation::Geocoding, text))?;
        debug!(query = text, name = %hit.display_name, "geocoded");
        hit.into_location(text)
    }

    fn reverse_resolve(&self, position: Coordinates) -> AirResult<Location> {
        let body: ReverseResponse = self.get_json(
            "reverse",
            &[
                ("lat", position.lat.to_string()),
                ("lon", position.lng.to_string()),
                ("format", "json".to_string()),
                ("zoom", self.config.zoom.to_string()),
            ],
            Operation::ReverseGeocoding,
        )?;

        body.place_name()
            .map(|name| Location::new(name, position.lat, position.lng))
            .ok_or_else(|| AirError::not_found(Operation::ReverseGeocoding, position.key()))
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

impl SearchHit {
    fn into_location(self, query: &str) -> AirResult<Location> {
        let parse = |value: &str| {
            value.parse::<f64>().map_err(|_| AirError::Network {
                operation: Operation::Geocoding,
                message: format!("invalid coordinate '{}' for '{}'", value, query),
            })
        };
        let latitude = parse(&self.lat)?;
        let longitude = parse(&self.lon)?;
        let name = if self.display_name.is_empty() {
            query.to_string()
        } else {
            self.display_name
        };
        Ok(Location::new(name, latitude, longitude))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<ReverseAddress>,
    #[serde(default)]
    display_name: Option<String>,
}

impl ReverseResponse {
    /// City, else town, else village, else the full display name.
    fn place_name(self) -> Option<String> {
        let address = self.address.unwrap_or_default();
        address
            .city
            .or(address.town)
            .or(address.village)
            .or(self.display_name)
    }
}
