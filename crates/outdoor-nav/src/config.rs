//! Outdoor navigation configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outdoor navigation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutdoorConfig {
    /// Mapbox access token (falls back to `MAPBOX_TOKEN`)
    pub mapbox_token: Option<String>,

    /// Walking directions endpoint
    pub directions_url: String,

    /// Forward geocoding endpoint
    pub geocoding_url: String,

    /// IP geolocation endpoint returning `{"loc": "lat,lng"}`
    pub geolocation_url: String,

    /// Average step length (meters)
    pub step_length_m: f64,

    /// Time given to the user to complete a step before re-routing (milliseconds)
    pub step_interval_ms: u64,

    /// Remaining distance considered "arrived" (meters)
    pub arrival_radius_m: f64,

    /// Attempts for each external request
    pub max_attempts: u32,

    /// Delay between attempts (milliseconds)
    pub retry_backoff_ms: u64,

    /// Per-request timeout (milliseconds)
    pub request_timeout_ms: u64,
}

impl Default for OutdoorConfig {
    fn default() -> Self {
        Self {
            mapbox_token: None,
            directions_url: "https://api.mapbox.com/directions/v5/mapbox/walking".to_string(),
            geocoding_url: "https://api.mapbox.com/geocoding/v5/mapbox.places".to_string(),
            geolocation_url: "https://ipinfo.io/json".to_string(),
            step_length_m: 0.762,
            step_interval_ms: 5000,
            arrival_radius_m: 5.0,
            max_attempts: 3,
            retry_backoff_ms: 1000,
            request_timeout_ms: 10_000,
        }
    }
}

impl OutdoorConfig {
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Configured token, else the `MAPBOX_TOKEN` environment variable
    pub fn resolve_token(&self) -> Option<String> {
        let usable = |t: &String| !t.trim().is_empty();
        self.mapbox_token
            .clone()
            .filter(usable)
            .or_else(|| std::env::var("MAPBOX_TOKEN").ok().filter(usable))
    }
}
