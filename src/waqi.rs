//! World Air Quality Index feed adapter.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AirError, AirResult, Operation};
use crate::model::{Location, PollutantReading};
use crate::traits::AqiLookup;

/// Pollutant sub-indices carried on a reading.
pub const POLLUTANT_CODES: [&str; 6] = ["pm25", "pm10", "o3", "no2", "so2", "co"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaqiConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for WaqiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.waqi.info".to_string(),
            token: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaqiClient {
    config: WaqiConfig,
    client: reqwest::blocking::Client,
}

impl WaqiClient {
    pub fn new(config: WaqiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl AqiLookup for WaqiClient {
    fn fetch(&self, location: &Location) -> AirResult<PollutantReading> {
        if self.config.token.is_empty() {
            return Err(AirError::Config("WAQI token is not set".to_string()));
        }

        let url = format!(
            "{}/feed/geo:{:.6};{:.6}/",
            self.config.base_url.trim_end_matches('/'),
            location.latitude,
            location.longitude
        );

        let body = self
            .client
            .get(url)
            .query(&[("token", self.config.token.as_str())])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<WaqiResponse>())
            .map_err(|err| AirError::from_http(Operation::AqiLookup, err))?;

        reading_from_response(location, body)
    }
}

#[derive(Debug, Deserialize)]
struct WaqiResponse {
    status: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WaqiData {
    aqi: serde_json::Value,
    #[serde(default)]
    iaqi: BTreeMap<String, WaqiValue>,
}

#[derive(Debug, Deserialize)]
struct WaqiValue {
    v: f64,
}

fn reading_from_response(location: &Location, body: WaqiResponse) -> AirResult<PollutantReading> {
    if body.status != "ok" {
        warn!(status = %body.status, detail = %body.data, "AQI feed rejected lookup");
        return Err(AirError::not_found(Operation::AqiLookup, location.name.clone()));
    }

    let data: WaqiData = serde_json::from_value(body.data).map_err(|err| AirError::Network {
        operation: Operation::AqiLookup,
        message: format!("malformed AQI feed: {}", err),
    })?;

    // Stations without a current value report "-".
    let aqi = data
        .aqi
        .as_f64()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or_else(|| AirError::not_found(Operation::AqiLookup, location.name.clone()))?;

    let components = data
        .iaqi
        .into_iter()
        .filter(|(code, _)| POLLUTANT_CODES.contains(&code.as_str()))
        .map(|(code, value)| (code, (value.v * 100.0).round() / 100.0))
        .collect();

    debug!(location = %location.name, aqi, "fetched AQI reading");

    Ok(PollutantReading {
        location: location.clone(),
        aqi: aqi.round() as u32,
        components,
    })
}
