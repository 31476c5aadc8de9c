//! Route scoring and ranking.
//!
//! Turns raw candidates into an ordered list of [`ScoredRoute`]s according to
//! the active [`RoutePreferences`]. Pure: no I/O, no randomness, ties resolve
//! by input order.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::{AirError, AirResult};
use crate::model::{AqiCategory, CandidateRoute, RoutePreferences, RouteSample, ScoredRoute};

/// Inclusive upper bound of each category, in order of severity.
pub(crate) const CATEGORY_BOUNDS: [(f64, AqiCategory); 6] = [
    (50.0, AqiCategory::Good),
    (100.0, AqiCategory::Moderate),
    (150.0, AqiCategory::UnhealthySensitive),
    (200.0, AqiCategory::Unhealthy),
    (300.0, AqiCategory::VeryUnhealthy),
    (f64::INFINITY, AqiCategory::Hazardous),
];

/// Map an AQI value to its health category.
///
/// Zero, negative and NaN values are `Unknown`, never `Good`.
pub fn category(aqi: f64) -> AqiCategory {
    if aqi.is_nan() || aqi <= 0.0 {
        return AqiCategory::Unknown;
    }
    CATEGORY_BOUNDS
        .iter()
        .find(|(upper, _)| aqi <= *upper)
        .map(|(_, category)| *category)
        .unwrap_or(AqiCategory::Hazardous)
}

/// Arithmetic mean of the sample AQIs, `None` for an empty profile.
pub fn mean_aqi(samples: &[RouteSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let total: f64 = samples.iter().map(|sample| sample.aqi).sum();
    Some(total / samples.len() as f64)
}

/// Which ordering rule a set of preferences selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingPolicy {
    /// Cleanest first, ties by duration.
    LowestAqi,
    /// Cleanest first among routes within the extra-time cap.
    BalancedWithinTime,
    /// Fastest first, ties by AQI.
    Fastest,
}

impl RankingPolicy {
    pub fn for_preferences(prefs: &RoutePreferences) -> Self {
        if prefs.balance_aqi_and_time {
            RankingPolicy::BalancedWithinTime
        } else if prefs.avoid_high_aqi {
            RankingPolicy::LowestAqi
        } else {
            RankingPolicy::Fastest
        }
    }
}

/// Reject preferences that violate the caller contract.
pub fn validate(prefs: &RoutePreferences) -> AirResult<()> {
    let extra = prefs.max_additional_time_min;
    if extra.is_nan() || extra < 0.0 {
        return Err(AirError::InvalidPreference(format!(
            "maxAdditionalTimeMin must be >= 0, got {}",
            extra
        )));
    }
    Ok(())
}

#[derive(Clone, Copy)]
struct Pending<'a> {
    route: &'a CandidateRoute,
    score: Option<f64>,
}

/// Score and order candidates. Rank 1 is the designated best route.
///
/// An empty input yields an empty output; reporting "no routes" is the
/// caller's job. The AQI orderings only rank routes that carry samples;
/// routes without any are kept for duration ordering alone. Under the
/// balanced policy, routes slower than the fastest one by more than
/// `max_additional_time_min` are dropped from the result. Either AQI
/// ordering falls back to duration order when nothing is left to rank.
pub fn rank(candidates: &[CandidateRoute], prefs: &RoutePreferences) -> AirResult<Vec<ScoredRoute>> {
    validate(prefs)?;

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let pending: Vec<Pending<'_>> = candidates
        .iter()
        .map(|route| Pending {
            route,
            score: mean_aqi(&route.samples),
        })
        .collect();

    let policy = RankingPolicy::for_preferences(prefs);
    let ordered = match policy {
        RankingPolicy::LowestAqi => {
            let scored: Vec<Pending<'_>> = pending
                .iter()
                .copied()
                .filter(|p| p.score.is_some())
                .collect();
            if scored.is_empty() {
                debug!("no candidate carries AQI samples, ranking by duration");
                fastest_first(pending)
            } else {
                debug!(
                    unsampled = pending.len() - scored.len(),
                    "left out routes without AQI samples"
                );
                cleanest_first(scored)
            }
        }
        RankingPolicy::BalancedWithinTime => {
            let fastest = pending
                .iter()
                .map(|p| p.route.duration_min)
                .fold(f64::INFINITY, f64::min);
            let cap = fastest + prefs.max_additional_time_min;

            let eligible: Vec<Pending<'_>> = pending
                .iter()
                .copied()
                .filter(|p| p.score.is_some() && p.route.duration_min <= cap)
                .collect();

            if eligible.is_empty() {
                debug!("no sampled candidate within {:.1} min, ranking by duration", cap);
                fastest_first(pending)
            } else {
                debug!(
                    eligible = eligible.len(),
                    excluded = pending.len() - eligible.len(),
                    "applied extra-time cap of {:.1} min",
                    cap
                );
                cleanest_first(eligible)
            }
        }
        RankingPolicy::Fastest => fastest_first(pending),
    };

    debug!(?policy, ranked = ordered.len(), "ranked candidate routes");

    Ok(ordered
        .into_iter()
        .enumerate()
        .map(|(index, pending)| ScoredRoute {
            route: pending.route.clone(),
            aqi_score: pending.score.unwrap_or(0.0),
            rank: index + 1,
        })
        .collect())
}

fn cleanest_first(mut routes: Vec<Pending<'_>>) -> Vec<Pending<'_>> {
    routes.sort_by(by_aqi_then_duration);
    routes
}

fn fastest_first(mut routes: Vec<Pending<'_>>) -> Vec<Pending<'_>> {
    routes.sort_by(by_duration_then_aqi);
    routes
}

/// A missing score sorts after any present one.
fn compare_scores(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn by_aqi_then_duration(a: &Pending<'_>, b: &Pending<'_>) -> Ordering {
    compare_scores(a.score, b.score)
        .then_with(|| a.route.duration_min.total_cmp(&b.route.duration_min))
}

fn by_duration_then_aqi(a: &Pending<'_>, b: &Pending<'_>) -> Ordering {
    a.route
        .duration_min
        .total_cmp(&b.route.duration_min)
        .then_with(|| compare_scores(a.score, b.score))
}
