//! Error kinds surfaced by the collaborators and the ranking engine.

use std::fmt;

use thiserror::Error;

pub type AirResult<T> = Result<T, AirError>;

/// The collaborator call that failed, used to phrase apologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Geocoding,
    ReverseGeocoding,
    AqiLookup,
    RouteLookup,
    Locating,
}

impl Operation {
    /// Verb phrase completing "I couldn't ...".
    pub fn spoken(&self) -> &'static str {
        match self {
            Operation::Geocoding => "find that place",
            Operation::ReverseGeocoding => "name that location",
            Operation::AqiLookup => "get the air quality",
            Operation::RouteLookup => "plan the route",
            Operation::Locating => "determine your location",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Geocoding => "geocoding",
            Operation::ReverseGeocoding => "reverse geocoding",
            Operation::AqiLookup => "AQI lookup",
            Operation::RouteLookup => "route lookup",
            Operation::Locating => "locating",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AirError {
    #[error("{operation}: nothing found for '{query}'")]
    NotFound { operation: Operation, query: String },

    #[error("no route found between {start} and {end}")]
    NoRoute { start: String, end: String },

    #[error("{operation} failed: {message}")]
    Network { operation: Operation, message: String },

    #[error("{operation} timed out")]
    Timeout { operation: Operation },

    #[error("invalid route preference: {0}")]
    InvalidPreference(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AirError {
    pub fn not_found(operation: Operation, query: impl Into<String>) -> Self {
        AirError::NotFound {
            operation,
            query: query.into(),
        }
    }

    /// Classify a transport error from one of the HTTP clients.
    pub fn from_http(operation: Operation, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AirError::Timeout { operation }
        } else {
            AirError::Network {
                operation,
                message: err.to_string(),
            }
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            AirError::NotFound { operation, .. }
            | AirError::Network { operation, .. }
            | AirError::Timeout { operation } => Some(*operation),
            AirError::NoRoute { .. } => Some(Operation::RouteLookup),
            AirError::InvalidPreference(_) | AirError::Config(_) => None,
        }
    }

    /// Spoken sentence naming the failed operation.
    pub fn apology(&self) -> String {
        match self {
            AirError::NotFound {
                operation: Operation::Locating,
                ..
            } => "Sorry, I couldn't determine your location.".to_string(),
            AirError::NotFound { operation, query } => {
                format!("Sorry, I couldn't {} for {}.", operation.spoken(), query)
            }
            AirError::NoRoute { start, end } => {
                format!("Sorry, I couldn't find any route from {} to {}.", start, end)
            }
            AirError::Network { operation, .. } => format!(
                "Sorry, I couldn't {} because of a network problem.",
                operation.spoken()
            ),
            AirError::Timeout { operation } => format!(
                "Sorry, I couldn't {} because the service took too long to answer.",
                operation.spoken()
            ),
            AirError::InvalidPreference(_) => {
                "Sorry, your route preferences are invalid.".to_string()
            }
            AirError::Config(_) => "Sorry, I'm not configured correctly.".to_string(),
        }
    }
}
