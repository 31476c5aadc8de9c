//! In-memory collaborators that count their calls.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use airwise::error::{AirError, AirResult, Operation};
use airwise::model::{
    CandidateRoute, Coordinates, Location, PollutantReading, RoutePreferences, RouteSample,
};
use airwise::traits::{AqiLookup, Geocoder, RouteProvider, SpeechSink};

use super::indian_cities::{CITIES, City};

/// Geocoder backed by the fixture city list.
pub struct MockGeocoder {
    cities: Vec<City>,
    failure: Option<AirError>,
    pub calls: AtomicUsize,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self {
            cities: CITIES.to_vec(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: AirError) -> Self {
        Self {
            failure: Some(err),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Geocoder for MockGeocoder {
    fn resolve(&self, text: &str) -> AirResult<Location> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.cities
            .iter()
            .find(|city| city.name.eq_ignore_ascii_case(text))
            .map(City::location)
            .ok_or_else(|| AirError::not_found(Operation::Geocoding, text))
    }

    fn reverse_resolve(&self, position: Coordinates) -> AirResult<Location> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.cities
            .iter()
            .map(City::location)
            .find(|location| location.key() == position.key())
            .ok_or_else(|| AirError::not_found(Operation::ReverseGeocoding, position.key()))
    }
}

/// AQI source with a fixed value per city name.
pub struct MockAqi {
    values: HashMap<String, u32>,
    failure: Option<AirError>,
    pub calls: AtomicUsize,
}

impl MockAqi {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, city: &str, aqi: u32) -> Self {
        self.values.insert(city.to_string(), aqi);
        self
    }

    pub fn failing(err: AirError) -> Self {
        Self {
            failure: Some(err),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AqiLookup for MockAqi {
    fn fetch(&self, location: &Location) -> AirResult<PollutantReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.values
            .get(&location.name)
            .map(|aqi| {
                PollutantReading::new(location.clone(), *aqi)
                    .with_component("pm25", f64::from(*aqi))
            })
            .ok_or_else(|| AirError::not_found(Operation::AqiLookup, location.name.clone()))
    }
}

/// Route provider returning a canned candidate list.
pub struct MockRoutes {
    candidates: Vec<CandidateRoute>,
    failure: Option<AirError>,
    pub calls: AtomicUsize,
    pub last_prefs: Mutex<Option<RoutePreferences>>,
}

impl MockRoutes {
    pub fn new(candidates: Vec<CandidateRoute>) -> Self {
        Self {
            candidates,
            failure: None,
            calls: AtomicUsize::new(0),
            last_prefs: Mutex::new(None),
        }
    }

    pub fn failing(err: AirError) -> Self {
        Self {
            failure: Some(err),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RouteProvider for MockRoutes {
    fn fetch(
        &self,
        start: &Location,
        end: &Location,
        prefs: &RoutePreferences,
    ) -> AirResult<Vec<CandidateRoute>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prefs.lock().unwrap() = Some(*prefs);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self
            .candidates
            .iter()
            .cloned()
            .map(|route| route.with_labels(start.name.clone(), end.name.clone()))
            .collect())
    }
}

/// Speech sink that keeps everything it was asked to say.
#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechSink for RecordingSpeech {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }
}

/// Candidate with a flat pollution profile.
pub fn route(id: &str, duration_min: f64, sample_aqis: &[f64]) -> CandidateRoute {
    let samples = sample_aqis
        .iter()
        .enumerate()
        .map(|(i, aqi)| RouteSample::new(28.6 - i as f64 * 0.01, 77.2 - i as f64 * 0.01, *aqi))
        .collect();
    CandidateRoute::new(id, duration_min * 0.8, duration_min).with_samples(samples)
}
