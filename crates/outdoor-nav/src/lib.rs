//! Outdoor Navigation
//!
//! Boundaries to the external walking-directions service:
//! - [`RoutingProvider`]: origin/destination → ordered walking steps
//! - [`Geocoder`]: spoken address → coordinates
//! - [`Geolocator`]: current position
//!
//! Concrete clients talk to Mapbox (routing, geocoding) and an
//! ipinfo-style endpoint (geolocation).

pub mod config;
pub mod geolocate;
pub mod mapbox;
pub mod retry;

pub use config::OutdoorConfig;
pub use geolocate::IpGeolocator;
pub use mapbox::MapboxClient;
pub use retry::retry_transient;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Navigation error types
#[derive(Error, Debug)]
pub enum NavError {
    #[error("No routing token configured")]
    MissingToken,

    #[error("No route found")]
    NoRoute,

    #[error("No location matches {0:?}")]
    NoMatch(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl NavError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            NavError::Transport(_) => true,
            NavError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Geographic position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }
}

/// Rendered as `longitude,latitude`
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

/// One maneuver of a walking route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    pub instruction: String,
    pub distance_m: f64,
}

impl RouteStep {
    /// Spoken form, e.g. "Turn left onto Main Street. Walk 13 steps."
    pub fn spoken(&self, step_length_m: f64) -> String {
        format!(
            "{}. Walk {} steps.",
            self.instruction.trim_end_matches('.'),
            meters_to_steps(self.distance_m, step_length_m)
        )
    }
}

/// Whole walking steps covering `distance_m`
pub fn meters_to_steps(distance_m: f64, step_length_m: f64) -> u64 {
    if !(distance_m > 0.0) || !(step_length_m > 0.0) {
        return 0;
    }
    (distance_m / step_length_m).floor() as u64
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(&self, origin: Coordinates, destination: Coordinates) -> Result<Vec<RouteStep>, NavError>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, address: &str) -> Result<Coordinates, NavError>;
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current(&self) -> Result<Coordinates, NavError>;
}
