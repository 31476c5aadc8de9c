//! Time-bounded caches in front of the AQI source and the geocoder.
//!
//! Both are keyed by stable text: coordinates for readings and reverse
//! lookups, the lowercased query for forward lookups. Expired entries are
//! purged whenever a new one is stored, and each map holds at most
//! `max_entries` values, evicting the oldest first.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::error::AirResult;
use crate::model::{Coordinates, Location, PollutantReading};
use crate::traits::{AqiLookup, Geocoder};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_entries: 256,
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    stored: Instant,
    order: u64,
    value: V,
}

#[derive(Debug)]
struct Slots<V> {
    next: u64,
    map: HashMap<String, Entry<V>>,
}

#[derive(Debug)]
struct ExpiringMap<V> {
    ttl: Duration,
    max_entries: usize,
    slots: Mutex<Slots<V>>,
}

impl<V: Clone> ExpiringMap<V> {
    fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            slots: Mutex::new(Slots {
                next: 0,
                map: HashMap::new(),
            }),
        }
    }

    fn get(&self, key: &str) -> Option<V> {
        self.lock()
            .map
            .get(key)
            .filter(|entry| entry.stored.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    fn insert(&self, key: String, value: V) {
        let ttl = self.ttl;
        let mut slots = self.lock();
        slots.map.retain(|_, entry| entry.stored.elapsed() < ttl);
        if slots.map.len() >= self.max_entries && !slots.map.contains_key(&key) {
            let oldest = slots
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.order)
                .map(|(oldest, _)| oldest.clone());
            if let Some(oldest) = oldest {
                slots.map.remove(&oldest);
            }
        }
        let order = slots.next;
        slots.next += 1;
        slots.map.insert(
            key,
            Entry {
                stored: Instant::now(),
                order,
                value,
            },
        );
    }

    fn len(&self) -> usize {
        self.lock().map.len()
    }

    fn lock(&self) -> MutexGuard<'_, Slots<V>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Caches successful readings per coordinate key. Failures pass through
/// uncached.
#[derive(Debug)]
pub struct CachedAqiLookup<L> {
    inner: L,
    readings: ExpiringMap<PollutantReading>,
}

impl<L: AqiLookup> CachedAqiLookup<L> {
    pub fn new(inner: L, ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner,
            readings: ExpiringMap::new(ttl, max_entries),
        }
    }

    pub fn from_config(inner: L, config: &CacheConfig) -> Self {
        Self::new(inner, Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: AqiLookup> AqiLookup for CachedAqiLookup<L> {
    fn fetch(&self, location: &Location) -> AirResult<PollutantReading> {
        let key = location.key();
        if let Some(reading) = self.readings.get(&key) {
            debug!(key = %key, "AQI cache hit");
            return Ok(reading);
        }

        let reading = self.inner.fetch(location)?;
        self.readings.insert(key, reading.clone());
        Ok(reading)
    }
}

/// Caches successful forward and reverse lookups. Nominatim rate-limits
/// callers, and route enrichment asks for the same places repeatedly.
#[derive(Debug)]
pub struct CachedGeocoder<G> {
    inner: G,
    places: ExpiringMap<Location>,
    names: ExpiringMap<Location>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G, ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner,
            places: ExpiringMap::new(ttl, max_entries),
            names: ExpiringMap::new(ttl, max_entries),
        }
    }

    pub fn from_config(inner: G, config: &CacheConfig) -> Self {
        Self::new(inner, Duration::from_secs(config.ttl_secs), config.max_entries)
    }
}

impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    fn resolve(&self, text: &str) -> AirResult<Location> {
        let key = text.trim().to_lowercase();
        if let Some(location) = self.places.get(&key) {
            debug!(query = %key, "geocode cache hit");
            return Ok(location);
        }

        let location = self.inner.resolve(text)?;
        self.places.insert(key, location.clone());
        Ok(location)
    }

    fn reverse_resolve(&self, position: Coordinates) -> AirResult<Location> {
        let key = position.key();
        if let Some(location) = self.names.get(&key) {
            debug!(key = %key, "reverse geocode cache hit");
            return Ok(location);
        }

        let location = self.inner.reverse_resolve(position)?;
        self.names.insert(key, location.clone());
        Ok(location)
    }
}
