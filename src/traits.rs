//! Collaborator seams consumed by the ranking engine and the interpreter.
//!
//! The HTTP adapters in this crate implement them; tests and other front ends
//! can supply their own.

use crate::error::AirResult;
use crate::model::{CandidateRoute, Coordinates, Location, PollutantReading, RoutePreferences};

/// Resolves place names and coordinates to canonical locations.
pub trait Geocoder {
    /// Forward lookup. Fails with `NotFound` when nothing matches.
    fn resolve(&self, text: &str) -> AirResult<Location>;

    /// Reverse lookup of a coordinate pair to a named place.
    fn reverse_resolve(&self, position: Coordinates) -> AirResult<Location>;
}

/// Fetches a pollutant reading for a resolved location.
pub trait AqiLookup {
    fn fetch(&self, location: &Location) -> AirResult<PollutantReading>;
}

/// Produces raw candidate paths, each with its pollution samples attached.
pub trait RouteProvider {
    fn fetch(
        &self,
        start: &Location,
        end: &Location,
        prefs: &RoutePreferences,
    ) -> AirResult<Vec<CandidateRoute>>;
}

/// Fire-and-forget speech playback.
pub trait SpeechSink {
    fn speak(&self, text: &str);
}

impl<T: Geocoder + ?Sized> Geocoder for &T {
    fn resolve(&self, text: &str) -> AirResult<Location> {
        (**self).resolve(text)
    }

    fn reverse_resolve(&self, position: Coordinates) -> AirResult<Location> {
        (**self).reverse_resolve(position)
    }
}

impl<T: AqiLookup + ?Sized> AqiLookup for &T {
    fn fetch(&self, location: &Location) -> AirResult<PollutantReading> {
        (**self).fetch(location)
    }
}

impl<T: RouteProvider + ?Sized> RouteProvider for &T {
    fn fetch(
        &self,
        start: &Location,
        end: &Location,
        prefs: &RoutePreferences,
    ) -> AirResult<Vec<CandidateRoute>> {
        (**self).fetch(start, end, prefs)
    }
}

impl<T: SpeechSink + ?Sized> SpeechSink for &T {
    fn speak(&self, text: &str) {
        (**self).speak(text)
    }
}
