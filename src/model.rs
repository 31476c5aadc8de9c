//! Domain types shared by the ranking engine, the voice interpreter and the
//! HTTP collaborators.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::polyline::Polyline;
use crate::scoring;

/// A bare latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Identity key at lookup precision (six decimal places).
    pub fn key(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lng)
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// A place resolved by the geocoder.
///
/// Two locations are the same place only when their coordinates agree at
/// lookup precision; the name is a display label, not a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn key(&self) -> String {
        self.coordinates().key()
    }

    pub fn same_place(&self, other: &Location) -> bool {
        self.key() == other.key()
    }
}

/// Health category derived from an AQI value.
///
/// Variants are declared in order of increasing severity, with `Unknown`
/// below everything so that the ordering stays monotone over the whole
/// input range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AqiCategory {
    Unknown,
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Lowercase phrase used in spoken replies.
    pub fn phrase(&self) -> &'static str {
        match self {
            AqiCategory::Unknown => "unknown",
            AqiCategory::Good => "good",
            AqiCategory::Moderate => "moderate",
            AqiCategory::UnhealthySensitive => "unhealthy for sensitive groups",
            AqiCategory::Unhealthy => "unhealthy",
            AqiCategory::VeryUnhealthy => "very unhealthy",
            AqiCategory::Hazardous => "hazardous",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AqiCategory::Unknown => "Unknown",
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        };
        f.write_str(label)
    }
}

/// A structured AQI reading for one location.
///
/// The category is never stored; it is recomputed from `aqi` on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantReading {
    pub location: Location,
    pub aqi: u32,
    /// Per-pollutant sub-index keyed by pollutant code (`pm25`, `pm10`, ...).
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
}

impl PollutantReading {
    pub fn new(location: Location, aqi: u32) -> Self {
        Self {
            location,
            aqi,
            components: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, code: impl Into<String>, value: f64) -> Self {
        self.components.insert(code.into(), value);
        self
    }

    pub fn category(&self) -> AqiCategory {
        scoring::category(f64::from(self.aqi))
    }

    pub fn component(&self, code: &str) -> Option<f64> {
        self.components.get(code).copied()
    }
}

/// One point of a candidate route's pollution profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSample {
    pub position: Coordinates,
    pub aqi: f64,
}

impl RouteSample {
    pub fn new(lat: f64, lng: f64, aqi: f64) -> Self {
        Self {
            position: Coordinates::new(lat, lng),
            aqi,
        }
    }
}

/// A raw path returned by the route provider, before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRoute {
    pub id: String,
    pub start_label: String,
    pub end_label: String,
    pub distance_km: f64,
    pub duration_min: f64,
    pub samples: Vec<RouteSample>,
    #[serde(default)]
    pub waypoint_locations: Vec<Location>,
    /// Directions profile the route came from (`fastest`, `shortest`, ...).
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub geometry: Option<Polyline>,
}

impl CandidateRoute {
    pub fn new(id: impl Into<String>, distance_km: f64, duration_min: f64) -> Self {
        Self {
            id: id.into(),
            start_label: "Start Location".to_string(),
            end_label: "End Location".to_string(),
            distance_km,
            duration_min,
            samples: Vec::new(),
            waypoint_locations: Vec::new(),
            variant: None,
            geometry: None,
        }
    }

    pub fn with_labels(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_label = start.into();
        self.end_label = end.into();
        self
    }

    pub fn with_samples(mut self, samples: Vec<RouteSample>) -> Self {
        self.samples = samples;
        self
    }
}

/// Coarse exposure label shown next to a scored route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthImpact {
    Unknown,
    Low,
    Moderate,
    High,
}

/// A candidate after scoring: the original route plus its mean AQI and rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRoute {
    #[serde(flatten)]
    pub route: CandidateRoute,
    /// Mean of the sample AQIs, or 0 when the route has no samples.
    pub aqi_score: f64,
    /// 1-based position in the ranked list.
    pub rank: usize,
}

impl ScoredRoute {
    /// Whether the route carried any pollution samples.
    pub fn has_aqi(&self) -> bool {
        !self.route.samples.is_empty()
    }

    pub fn duration_min(&self) -> f64 {
        self.route.duration_min
    }

    pub fn health_impact(&self) -> HealthImpact {
        if !self.has_aqi() {
            HealthImpact::Unknown
        } else if self.aqi_score > 150.0 {
            HealthImpact::High
        } else if self.aqi_score > 100.0 {
            HealthImpact::Moderate
        } else {
            HealthImpact::Low
        }
    }

    pub fn category(&self) -> AqiCategory {
        if self.has_aqi() {
            scoring::category(self.aqi_score)
        } else {
            AqiCategory::Unknown
        }
    }
}

/// Route ranking policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutePreferences {
    #[serde(rename = "avoidHighAQI")]
    pub avoid_high_aqi: bool,
    #[serde(rename = "balanceAQIAndTime")]
    pub balance_aqi_and_time: bool,
    #[serde(rename = "maxAdditionalTimeMin")]
    pub max_additional_time_min: f64,
}

impl Default for RoutePreferences {
    fn default() -> Self {
        Self {
            avoid_high_aqi: false,
            balance_aqi_and_time: false,
            max_additional_time_min: 10.0,
        }
    }
}
