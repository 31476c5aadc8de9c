//! Utterance classification.
//!
//! An utterance is matched against [`RULES`] in priority order; the first rule
//! whose predicate holds extracts the intent. Predicates see the lowercased
//! utterance, extractors see the original text so place names keep their case.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Pollutants the interpreter can define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollutantTerm {
    Pm25,
    Pm10,
}

impl fmt::Display for PollutantTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollutantTerm::Pm25 => f.write_str("PM2.5"),
            PollutantTerm::Pm10 => f.write_str("PM10"),
        }
    }
}

/// The closed set of things a user can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceIntent {
    RoutePlan { start: String, end: String },
    /// A route was asked for but the two endpoints could not be extracted.
    RouteLocationsMissing,
    AqiQuery { city: Option<String> },
    CurrentAqiSummary,
    SafetyAdvice,
    DefinitionQuery { term: PollutantTerm },
    LocateMe,
    HelpRequest,
    Unrecognized,
}

/// One row of the classification table.
pub struct IntentRule {
    pub name: &'static str,
    applies: fn(&str) -> bool,
    extract: fn(&str) -> VoiceIntent,
}

impl IntentRule {
    /// Run this rule alone against an utterance.
    pub fn matches(&self, utterance: &str) -> Option<VoiceIntent> {
        let trimmed = utterance.trim();
        if (self.applies)(&trimmed.to_lowercase()) {
            Some((self.extract)(trimmed))
        } else {
            None
        }
    }
}

const ROUTE_PHRASES: &[&str] = &["best route", "cleanest path", "safest route"];
const SUMMARY_PHRASES: &[&str] = &[
    "how's the air quality",
    "how is the air quality",
    "what's the air quality",
    "what is the air quality",
];
const LOCATE_PHRASES: &[&str] = &["locate me", "my location"];
const SAFETY_PHRASES: &[&str] = &[
    "safe to jog",
    "safe to exercise",
    "safe for outdoor activities",
];
const PM25_PHRASES: &[&str] = &[
    "what does pm2.5",
    "what does pm 2.5",
    "what is pm2.5",
    "what is pm 2.5",
];
const PM10_PHRASES: &[&str] = &[
    "what does pm10",
    "what does pm 10",
    "what is pm10",
    "what is pm 10",
];
const HELP_PHRASES: &[&str] = &["help", "what can you do"];

static ROUTE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfrom\s+(.+?)\s+to\s+(.+)$").expect("valid regex"));
static AQI_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bair quality in\b\s*(.*)$").expect("valid regex"));
static CHECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcheck\s+(.+)$").expect("valid regex"));

/// Classification table in priority order.
pub static RULES: [IntentRule; 7] = [
    IntentRule {
        name: "route-plan",
        applies: |text| contains_any(text, ROUTE_PHRASES),
        extract: extract_route,
    },
    IntentRule {
        name: "aqi-query",
        applies: |text| AQI_IN.is_match(text) || CHECK.is_match(text),
        extract: extract_city,
    },
    IntentRule {
        name: "current-aqi",
        applies: |text| contains_any(text, SUMMARY_PHRASES),
        extract: |_| VoiceIntent::CurrentAqiSummary,
    },
    IntentRule {
        name: "locate-me",
        applies: |text| contains_any(text, LOCATE_PHRASES),
        extract: |_| VoiceIntent::LocateMe,
    },
    IntentRule {
        name: "safety-advice",
        applies: |text| contains_any(text, SAFETY_PHRASES),
        extract: |_| VoiceIntent::SafetyAdvice,
    },
    IntentRule {
        name: "definition",
        applies: |text| contains_any(text, PM25_PHRASES) || contains_any(text, PM10_PHRASES),
        extract: extract_term,
    },
    IntentRule {
        name: "help",
        applies: |text| contains_any(text, HELP_PHRASES),
        extract: |_| VoiceIntent::HelpRequest,
    },
];

/// Map an utterance to an intent. Falls through to `Unrecognized`.
pub fn classify(utterance: &str) -> VoiceIntent {
    for rule in &RULES {
        if let Some(intent) = rule.matches(utterance) {
            debug!(rule = rule.name, ?intent, "classified utterance");
            return intent;
        }
    }
    debug!("no rule matched utterance");
    VoiceIntent::Unrecognized
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase))
}

fn clean_span(span: &str) -> Option<String> {
    let cleaned = span.trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | '?' | '!' | ','));
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn extract_route(text: &str) -> VoiceIntent {
    let endpoints = ROUTE_SPAN.captures(text).and_then(|caps| {
        let start = clean_span(caps.get(1)?.as_str())?;
        let end = clean_span(caps.get(2)?.as_str())?;
        Some((start, end))
    });
    match endpoints {
        Some((start, end)) => VoiceIntent::RoutePlan { start, end },
        None => VoiceIntent::RouteLocationsMissing,
    }
}

fn extract_city(text: &str) -> VoiceIntent {
    let captured = AQI_IN
        .captures(text)
        .or_else(|| CHECK.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|span| clean_span(span.as_str()));
    VoiceIntent::AqiQuery { city: captured }
}

fn extract_term(text: &str) -> VoiceIntent {
    let term = if contains_any(&text.to_lowercase(), PM25_PHRASES) {
        PollutantTerm::Pm25
    } else {
        PollutantTerm::Pm10
    };
    VoiceIntent::DefinitionQuery { term }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> &'static IntentRule {
        RULES.iter().find(|rule| rule.name == name).unwrap()
    }

    #[test]
    fn test_route_rule_extracts_endpoints() {
        assert_eq!(
            rule("route-plan").matches("Find the best route from New Delhi to Gurgaon."),
            Some(VoiceIntent::RoutePlan {
                start: "New Delhi".to_string(),
                end: "Gurgaon".to_string(),
            })
        );
        assert_eq!(
            rule("route-plan").matches("show me the cleanest path from Pune to Mumbai"),
            Some(VoiceIntent::RoutePlan {
                start: "Pune".to_string(),
                end: "Mumbai".to_string(),
            })
        );
    }

    #[test]
    fn test_route_rule_without_endpoints() {
        assert_eq!(
            rule("route-plan").matches("what's the safest route"),
            Some(VoiceIntent::RouteLocationsMissing)
        );
        assert_eq!(
            rule("route-plan").matches("safest route from Delhi"),
            Some(VoiceIntent::RouteLocationsMissing)
        );
    }

    #[test]
    fn test_aqi_rule_variants() {
        let aqi = rule("aqi-query");
        assert_eq!(
            aqi.matches("What's the air quality in Chennai?"),
            Some(VoiceIntent::AqiQuery {
                city: Some("Chennai".to_string())
            })
        );
        assert_eq!(
            aqi.matches("check Jaipur"),
            Some(VoiceIntent::AqiQuery {
                city: Some("Jaipur".to_string())
            })
        );
        assert_eq!(
            aqi.matches("air quality in"),
            Some(VoiceIntent::AqiQuery { city: None })
        );
        assert_eq!(aqi.matches("checkmate"), None);
    }

    #[test]
    fn test_summary_rule() {
        assert!(rule("current-aqi").matches("How's the air quality today").is_some());
        assert!(rule("current-aqi").matches("what is the air quality").is_some());
        assert!(rule("current-aqi").matches("air").is_none());
    }

    #[test]
    fn test_definition_rule_picks_term() {
        let definition = rule("definition");
        assert_eq!(
            definition.matches("What does PM2.5 mean"),
            Some(VoiceIntent::DefinitionQuery {
                term: PollutantTerm::Pm25
            })
        );
        assert_eq!(
            definition.matches("what is pm 10"),
            Some(VoiceIntent::DefinitionQuery {
                term: PollutantTerm::Pm10
            })
        );
    }

    #[test]
    fn test_priority_order() {
        // Mentions both a city and the summary phrase: the city query wins.
        assert_eq!(
            classify("how's the air quality in Kolkata"),
            VoiceIntent::AqiQuery {
                city: Some("Kolkata".to_string())
            }
        );
        // Route phrase outranks help.
        assert_eq!(
            classify("help me find the best route from Delhi to Noida"),
            VoiceIntent::RoutePlan {
                start: "Delhi".to_string(),
                end: "Noida".to_string(),
            }
        );
        assert_eq!(classify("is it safe to exercise outside"), VoiceIntent::SafetyAdvice);
        assert_eq!(classify("please locate me"), VoiceIntent::LocateMe);
        assert_eq!(classify("what can you do"), VoiceIntent::HelpRequest);
    }

    #[test]
    fn test_reference_utterances() {
        assert_eq!(
            classify("find the best route from Delhi to Gurgaon"),
            VoiceIntent::RoutePlan {
                start: "Delhi".to_string(),
                end: "Gurgaon".to_string(),
            }
        );
        assert_eq!(
            classify("check Mumbai"),
            VoiceIntent::AqiQuery {
                city: Some("Mumbai".to_string())
            }
        );
        assert_eq!(classify("banana"), VoiceIntent::Unrecognized);
        assert_eq!(classify("   "), VoiceIntent::Unrecognized);
    }
}
