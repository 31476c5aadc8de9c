//! OpenRouteService directions adapter.
//!
//! Requests one route per directions profile, drops duplicate geometries,
//! then samples each geometry and attaches per-point AQI readings and
//! waypoint names before handing the candidates to the ranking engine.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AirError, AirResult, Operation};
use crate::model::{CandidateRoute, Location, RoutePreferences, RouteSample};
use crate::polyline::{DEFAULT_PRECISION, Polyline};
use crate::traits::{AqiLookup, Geocoder, RouteProvider};

/// Directions profiles requested for every route search.
pub const ROUTE_VARIANTS: [&str; 3] = ["fastest", "shortest", "recommended"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenRouteConfig {
    pub base_url: String,
    pub profile: String,
    pub api_key: String,
    pub timeout_secs: u64,
    /// Points sampled along each route for AQI lookups.
    pub sample_points: usize,
}

impl Default for OpenRouteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org".to_string(),
            profile: "driving-car".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
            sample_points: 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenRouteClient<A, G> {
    config: OpenRouteConfig,
    client: reqwest::blocking::Client,
    aqi: A,
    geocoder: G,
}

impl<A, G> OpenRouteClient<A, G>
where
    A: AqiLookup + Sync,
    G: Geocoder,
{
    pub fn new(config: OpenRouteConfig, aqi: A, geocoder: G) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            aqi,
            geocoder,
        })
    }

    fn directions(
        &self,
        start: &Location,
        end: &Location,
        variant: &str,
        prefs: &RoutePreferences,
    ) -> AirResult<Option<DirectionsRoute>> {
        let avoid_features = if prefs.avoid_high_aqi {
            vec!["highways"]
        } else {
            Vec::new()
        };
        let body = DirectionsRequest {
            coordinates: [
                [start.longitude, start.latitude],
                [end.longitude, end.latitude],
            ],
            preference: variant,
            instructions: false,
            options: DirectionsOptions { avoid_features },
        };

        let url = format!(
            "{}/v2/directions/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", self.config.api_key.as_str())
            .json(&body)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<DirectionsResponse>())
            .map_err(|err| AirError::from_http(Operation::RouteLookup, err))?;

        Ok(response.routes.into_iter().next())
    }

    /// Sample the geometry and look up AQI at every sampled point.
    /// Points whose lookup fails are left out.
    fn sample_aqi(&self, geometry: &Polyline) -> Vec<RouteSample> {
        let aqi = &self.aqi;
        geometry
            .sample(self.config.sample_points)
            .par_iter()
            .filter_map(|&(lat, lng)| {
                let spot = Location::new(format!("{:.4},{:.4}", lat, lng), lat, lng);
                match aqi.fetch(&spot) {
                    Ok(reading) => Some(RouteSample::new(lat, lng, f64::from(reading.aqi))),
                    Err(err) => {
                        debug!(error = %err, "skipping route sample");
                        None
                    }
                }
            })
            .collect()
    }

    /// Name the places the samples pass through, skipping repeats.
    fn waypoint_names(&self, samples: &[RouteSample]) -> Vec<Location> {
        let mut waypoints: Vec<Location> = Vec::new();
        for sample in samples {
            match self.geocoder.reverse_resolve(sample.position) {
                Ok(location) => {
                    if waypoints.last().is_none_or(|last| last.name != location.name) {
                        waypoints.push(location);
                    }
                }
                Err(err) => debug!(error = %err, "skipping waypoint name"),
            }
        }
        waypoints
    }

    fn endpoint_label(&self, location: &Location, fallback: &str) -> String {
        self.geocoder
            .reverse_resolve(location.coordinates())
            .map(|place| place.name)
            .unwrap_or_else(|_| fallback.to_string())
    }

    /// Decode, sample and label accepted routes. Undecodable geometries are
    /// skipped.
    fn build_candidates(
        &self,
        accepted: Vec<(&str, DirectionsRoute)>,
        start: &Location,
        end: &Location,
    ) -> Vec<CandidateRoute> {
        let start_label = self.endpoint_label(start, "Start Location");
        let end_label = self.endpoint_label(end, "End Location");

        let mut candidates = Vec::with_capacity(accepted.len());
        for (variant, route) in accepted {
            let geometry = match Polyline::decode(&route.geometry, DEFAULT_PRECISION) {
                Ok(geometry) => geometry,
                Err(err) => {
                    warn!(variant, error = %err, "undecodable route geometry");
                    continue;
                }
            };
            let samples = self.sample_aqi(&geometry);
            let waypoint_locations = self.waypoint_names(&samples);

            candidates.push(CandidateRoute {
                id: format!("route_{}", candidates.len()),
                start_label: start_label.clone(),
                end_label: end_label.clone(),
                distance_km: round_tenth(route.summary.distance / 1000.0),
                duration_min: round_tenth(route.summary.duration / 60.0),
                samples,
                waypoint_locations,
                variant: Some(variant.to_string()),
                geometry: Some(geometry),
            });
        }
        candidates
    }
}

impl<A, G> RouteProvider for OpenRouteClient<A, G>
where
    A: AqiLookup + Sync,
    G: Geocoder,
{
    fn fetch(
        &self,
        start: &Location,
        end: &Location,
        prefs: &RoutePreferences,
    ) -> AirResult<Vec<CandidateRoute>> {
        if self.config.api_key.is_empty() {
            return Err(AirError::Config("OpenRouteService API key is not set".to_string()));
        }

        let responses = ROUTE_VARIANTS
            .iter()
            .map(|&variant| (variant, self.directions(start, end, variant, prefs)))
            .collect();
        let accepted = select_routes(responses, start, end)?;
        Ok(self.build_candidates(accepted, start, end))
    }
}

/// Keep one route per distinct geometry, in request order.
///
/// Failed profiles are skipped. When nothing is accepted the last failure is
/// returned, or `NoRoute` if every profile answered without a route.
fn select_routes<'a>(
    responses: Vec<(&'a str, AirResult<Option<DirectionsRoute>>)>,
    start: &Location,
    end: &Location,
) -> AirResult<Vec<(&'a str, DirectionsRoute)>> {
    let mut accepted: Vec<(&str, DirectionsRoute)> = Vec::new();
    let mut last_error = None;
    for (variant, response) in responses {
        match response {
            Ok(Some(route)) => {
                if accepted.iter().any(|(_, kept)| kept.geometry == route.geometry) {
                    debug!(variant, "dropping duplicate route geometry");
                } else {
                    accepted.push((variant, route));
                }
            }
            Ok(None) => debug!(variant, "no route for profile"),
            Err(err) => {
                warn!(variant, error = %err, "directions request failed");
                last_error = Some(err);
            }
        }
    }

    if accepted.is_empty() {
        return Err(last_error.unwrap_or_else(|| AirError::NoRoute {
            start: start.name.clone(),
            end: end.name.clone(),
        }));
    }
    Ok(accepted)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Serialize)]
struct DirectionsRequest<'a> {
    /// Longitude first, as the service expects.
    coordinates: [[f64; 2]; 2],
    preference: &'a str,
    instructions: bool,
    options: DirectionsOptions<'a>,
}

#[derive(Debug, Serialize)]
struct DirectionsOptions<'a> {
    avoid_features: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    summary: DirectionsSummary,
    geometry: String,
}

#[derive(Debug, Default, Deserialize)]
struct DirectionsSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::model::{Coordinates, PollutantReading};

    /// Three points at latitudes 38.5, 40.7 and 43.252.
    const THREE_POINTS: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
    const ONE_POINT: &str = "_p~iF~ps|U";
    const TRUNCATED: &str = "_p~iF~ps|U_";

    /// Readings exist south of 42N only; the value is the rounded latitude.
    struct SouthernStations;

    impl AqiLookup for SouthernStations {
        fn fetch(&self, location: &Location) -> AirResult<PollutantReading> {
            if location.latitude > 42.0 {
                return Err(AirError::not_found(Operation::AqiLookup, location.name.clone()));
            }
            Ok(PollutantReading::new(
                location.clone(),
                location.latitude.round() as u32,
            ))
        }
    }

    /// Not `Sync`; route sampling must not need to share the geocoder.
    struct Places {
        offline: Cell<bool>,
    }

    impl Geocoder for Places {
        fn resolve(&self, text: &str) -> AirResult<Location> {
            Err(AirError::not_found(Operation::Geocoding, text))
        }

        fn reverse_resolve(&self, position: Coordinates) -> AirResult<Location> {
            if self.offline.get() {
                return Err(AirError::Timeout {
                    operation: Operation::ReverseGeocoding,
                });
            }
            let name = if position.lat < 40.0 { "Sacramento" } else { "Reno" };
            Ok(Location::new(name, position.lat, position.lng))
        }
    }

    fn client(offline: bool) -> OpenRouteClient<SouthernStations, Places> {
        let places = Places {
            offline: Cell::new(offline),
        };
        OpenRouteClient::new(OpenRouteConfig::default(), SouthernStations, places).unwrap()
    }

    fn directions_route(geometry: &str, distance: f64, duration: f64) -> DirectionsRoute {
        DirectionsRoute {
            summary: DirectionsSummary { distance, duration },
            geometry: geometry.to_string(),
        }
    }

    fn endpoints() -> (Location, Location) {
        (
            Location::new("A", 38.5, -120.2),
            Location::new("B", 43.252, -126.453),
        )
    }

    fn timeout() -> AirError {
        AirError::Timeout {
            operation: Operation::RouteLookup,
        }
    }

    #[test]
    fn test_duplicate_geometry_is_dropped() {
        let (start, end) = endpoints();
        let responses = vec![
            ("fastest", Ok(Some(directions_route(THREE_POINTS, 1.0, 60.0)))),
            ("shortest", Ok(Some(directions_route(THREE_POINTS, 1.0, 90.0)))),
            ("recommended", Ok(Some(directions_route(ONE_POINT, 2.0, 60.0)))),
        ];
        let accepted = select_routes(responses, &start, &end).unwrap();
        let variants: Vec<&str> = accepted.iter().map(|(variant, _)| *variant).collect();
        assert_eq!(variants, vec!["fastest", "recommended"]);
    }

    #[test]
    fn test_failed_profile_is_skipped() {
        let (start, end) = endpoints();
        let responses = vec![
            ("fastest", Err(timeout())),
            ("shortest", Ok(Some(directions_route(ONE_POINT, 1.0, 60.0)))),
            ("recommended", Ok(None)),
        ];
        let accepted = select_routes(responses, &start, &end).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].0, "shortest");
    }

    #[test]
    fn test_all_profiles_failing_returns_last_error() {
        let (start, end) = endpoints();
        let network = AirError::Network {
            operation: Operation::RouteLookup,
            message: "connection refused".to_string(),
        };
        let responses = vec![
            ("fastest", Err(network.clone())),
            ("shortest", Err(network)),
            ("recommended", Err(timeout())),
        ];
        let err = select_routes(responses, &start, &end).unwrap_err();
        assert_eq!(err, timeout());
    }

    #[test]
    fn test_no_route_from_any_profile() {
        let (start, end) = endpoints();
        let responses = vec![("fastest", Ok(None)), ("shortest", Ok(None))];
        let err = select_routes(responses, &start, &end).unwrap_err();
        assert_eq!(
            err,
            AirError::NoRoute {
                start: "A".to_string(),
                end: "B".to_string(),
            }
        );
    }

    #[test]
    fn test_candidates_are_sampled_and_labelled() {
        let (start, end) = endpoints();
        let accepted = vec![
            ("fastest", directions_route(THREE_POINTS, 30512.4, 1650.0)),
            ("shortest", directions_route(TRUNCATED, 1.0, 60.0)),
            ("recommended", directions_route(ONE_POINT, 800.0, 120.0)),
        ];

        let candidates = client(false).build_candidates(accepted, &start, &end);

        assert_eq!(candidates.len(), 2);
        let first = &candidates[0];
        assert_eq!(first.id, "route_0");
        assert_eq!(first.variant.as_deref(), Some("fastest"));
        assert_eq!(first.distance_km, 30.5);
        assert_eq!(first.duration_min, 27.5);
        assert_eq!(first.start_label, "Sacramento");
        assert_eq!(first.end_label, "Reno");
        // The northern point has no station and is left out.
        let aqis: Vec<f64> = first.samples.iter().map(|s| s.aqi).collect();
        assert_eq!(aqis, vec![39.0, 41.0]);
        let names: Vec<&str> = first
            .waypoint_locations
            .iter()
            .map(|place| place.name.as_str())
            .collect();
        assert_eq!(names, vec!["Sacramento", "Reno"]);

        assert_eq!(candidates[1].id, "route_1");
        assert_eq!(candidates[1].variant.as_deref(), Some("recommended"));
        assert_eq!(candidates[1].samples.len(), 1);
    }

    #[test]
    fn test_labels_fall_back_when_reverse_lookup_fails() {
        let (start, end) = endpoints();
        let accepted = vec![("fastest", directions_route(THREE_POINTS, 1000.0, 60.0))];

        let candidates = client(true).build_candidates(accepted, &start, &end);

        assert_eq!(candidates[0].start_label, "Start Location");
        assert_eq!(candidates[0].end_label, "End Location");
        assert!(candidates[0].waypoint_locations.is_empty());
        assert_eq!(candidates[0].samples.len(), 2);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let (start, end) = endpoints();
        let err = client(false)
            .fetch(&start, &end, &RoutePreferences::default())
            .unwrap_err();
        assert!(matches!(err, AirError::Config(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let body = DirectionsRequest {
            coordinates: [[77.209, 28.6139], [77.0266, 28.4595]],
            preference: "fastest",
            instructions: false,
            options: DirectionsOptions {
                avoid_features: vec!["highways"],
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["coordinates"][0][0], 77.209);
        assert_eq!(json["preference"], "fastest");
        assert_eq!(json["options"]["avoid_features"][0], "highways");
    }

    #[test]
    fn test_response_summary_defaults() {
        let response: DirectionsResponse = serde_json::from_str(
            r#"{"routes": [{"summary": {"distance": 30512.4}, "geometry": "_p~iF~ps|U"}]}"#,
        )
        .unwrap();
        let route = &response.routes[0];
        assert_eq!(round_tenth(route.summary.distance / 1000.0), 30.5);
        assert_eq!(route.summary.duration, 0.0);
    }

    #[test]
    fn test_round_tenth() {
        assert_eq!(round_tenth(27.46), 27.5);
        assert_eq!(round_tenth(0.04), 0.0);
    }
}
