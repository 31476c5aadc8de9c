//! Route geometry as decoded coordinates.
//!
//! Directions services ship geometries in the encoded polyline format; they
//! are decoded once at the HTTP boundary and then sampled for AQI lookups.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coordinate precision used by OpenRouteService and Google (1e-5 degrees).
pub const DEFAULT_PRECISION: u32 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolylineError {
    #[error("encoded polyline ends in the middle of a value at byte {0}")]
    Truncated(usize),
    #[error("invalid polyline byte {byte:#04x} at {index}")]
    InvalidByte { byte: u8, index: usize },
    #[error("polyline coordinate overflows at byte {0}")]
    Overflow(usize),
}

/// A route geometry as a sequence of (latitude, longitude) points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Decode an encoded polyline string at the given precision.
    pub fn decode(encoded: &str, precision: u32) -> Result<Self, PolylineError> {
        let factor = 10f64.powi(precision as i32);
        let bytes = encoded.as_bytes();
        let mut index = 0;
        let mut lat: i64 = 0;
        let mut lng: i64 = 0;
        let mut points = Vec::new();

        while index < bytes.len() {
            lat = accumulate(lat, bytes, &mut index)?;
            lng = accumulate(lng, bytes, &mut index)?;
            points.push((lat as f64 / factor, lng as f64 / factor));
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Evenly spaced points along the line, at most `max_points` of them.
    ///
    /// Short lines are returned whole. Longer ones take every
    /// `len / (max_points - 1)`-th point starting from the first.
    pub fn sample(&self, max_points: usize) -> Vec<(f64, f64)> {
        if max_points == 0 {
            return Vec::new();
        }
        if self.points.len() <= max_points {
            return self.points.clone();
        }
        let step = if max_points > 1 {
            (self.points.len() / (max_points - 1)).max(1)
        } else {
            self.points.len()
        };
        self.points
            .iter()
            .step_by(step)
            .take(max_points)
            .copied()
            .collect()
    }
}

fn accumulate(total: i64, bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    total
        .checked_add(next_delta(bytes, index)?)
        .ok_or(PolylineError::Overflow(start))
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes.get(*index).ok_or(PolylineError::Truncated(*index))?;
        if !(63..=126).contains(&byte) || shift > 60 {
            return Err(PolylineError::InvalidByte {
                byte,
                index: *index,
            });
        }
        let chunk = i64::from(byte - 63);
        *index += 1;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[(f64, f64)], expected: &[(f64, f64)]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a.0 - e.0).abs() < 1e-9, "lat {} != {}", a.0, e.0);
            assert!((a.1 - e.1).abs() < 1e-9, "lng {} != {}", a.1, e.1);
        }
    }

    #[test]
    fn test_decode_reference_line() {
        let line = Polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@", DEFAULT_PRECISION).unwrap();
        assert_close(
            line.points(),
            &[(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)],
        );
    }

    #[test]
    fn test_decode_empty() {
        let line = Polyline::decode("", DEFAULT_PRECISION).unwrap();
        assert!(line.is_empty());
    }

    #[test]
    fn test_decode_truncated() {
        // Latitude present, longitude missing.
        let err = Polyline::decode("_p~iF", DEFAULT_PRECISION).unwrap_err();
        assert_eq!(err, PolylineError::Truncated(5));
    }

    #[test]
    fn test_decode_rejects_control_bytes() {
        let err = Polyline::decode("_p~iF\n", DEFAULT_PRECISION).unwrap_err();
        assert!(matches!(err, PolylineError::InvalidByte { index: 5, .. }));
    }

    #[test]
    fn test_decode_overflowing_coordinates() {
        // Each value decodes to just under 2^62; the third latitude overflows.
        let encoded = format!("}}{}F", "~".repeat(11)).repeat(6);
        let err = Polyline::decode(&encoded, DEFAULT_PRECISION).unwrap_err();
        assert_eq!(err, PolylineError::Overflow(52));
    }

    #[test]
    fn test_sample_short_line_is_whole() {
        let line = Polyline::new(vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(line.sample(7), line.points().to_vec());
    }

    #[test]
    fn test_sample_long_line_is_even() {
        let points: Vec<(f64, f64)> = (0..20).map(|i| (i as f64, 0.0)).collect();
        let line = Polyline::new(points);
        let sampled = line.sample(7);
        let lats: Vec<f64> = sampled.iter().map(|p| p.0).collect();
        assert_eq!(lats, vec![0.0, 3.0, 6.0, 9.0, 12.0, 15.0, 18.0]);
    }

    #[test]
    fn test_sample_zero_budget() {
        let line = Polyline::new(vec![(1.0, 2.0)]);
        assert!(line.sample(0).is_empty());
    }
}
