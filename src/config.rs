//! Application configuration: a TOML file with every section optional, plus
//! credentials taken from the environment.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::error::{AirError, AirResult};
use crate::model::RoutePreferences;
use crate::nominatim::NominatimConfig;
use crate::openroute::OpenRouteConfig;
use crate::scoring;
use crate::waqi::WaqiConfig;

pub const WAQI_TOKEN_VAR: &str = "WAQI_TOKEN";
pub const OPENROUTE_KEY_VAR: &str = "OPENROUTE_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub nominatim: NominatimConfig,
    pub waqi: WaqiConfig,
    pub openroute: OpenRouteConfig,
    pub cache: CacheConfig,
    pub preferences: RoutePreferences,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> AirResult<Self> {
        let config: AppConfig =
            toml::from_str(text).map_err(|err| AirError::Config(err.to_string()))?;
        scoring::validate(&config.preferences)?;
        Ok(config)
    }

    /// Load from `path` (defaults when absent) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> AirResult<Self> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|err| {
                    AirError::Config(format!("cannot read {}: {}", path.display(), err))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_credentials(env::var(WAQI_TOKEN_VAR).ok(), env::var(OPENROUTE_KEY_VAR).ok());
        Ok(config)
    }

    /// Non-empty values replace whatever the file provided.
    pub fn apply_credentials(&mut self, waqi_token: Option<String>, openroute_key: Option<String>) {
        if let Some(token) = waqi_token.filter(|token| !token.is_empty()) {
            self.waqi.token = token;
        }
        if let Some(key) = openroute_key.filter(|key| !key.is_empty()) {
            self.openroute.api_key = key;
        }
    }
}
