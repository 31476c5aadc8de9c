//! Test fixtures for airwise.
//!
//! Provides:
//! - Indian city coordinates used by the dashboard's city list
//! - Mock geocoder, AQI source, route provider and speech sink
//! - Builders for candidate routes

#![allow(dead_code)]

pub mod indian_cities;
pub mod mocks;

pub use indian_cities::*;
pub use mocks::*;
