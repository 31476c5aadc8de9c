//! airwise core
//!
//! Air-quality-aware route ranking and a voice command interpreter that
//! drives it, behind collaborator traits for geocoding, AQI lookups and
//! directions.

pub mod cache;
pub mod config;
pub mod error;
pub mod intent;
pub mod interpreter;
pub mod model;
pub mod nominatim;
pub mod openroute;
pub mod polyline;
pub mod scoring;
pub mod session;
pub mod traits;
pub mod waqi;

pub use error::{AirError, AirResult, Operation};
