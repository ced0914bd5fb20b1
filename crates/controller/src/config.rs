//! Application configuration
//!
//! Loaded from an optional file, then `VISION_ASSIST_*` environment
//! variables (`__` separates sections, e.g. `VISION_ASSIST_ALERT__COOLDOWN_MS`).

use alerting::AlertConfig;
use config::{Config, Environment, File};
use hazard::RiskConfig;
use indoor_nav::{LayoutEntry, LayoutTable, RoomProfile, RoomRule};
use outdoor_nav::OutdoorConfig;
use serde::{Deserialize, Serialize};
use speech::PromptConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use crate::orchestrator::OrchestratorConfig;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Room and layout tables, in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndoorConfig {
    pub rooms: Vec<RoomRule>,
    pub layout: Vec<LayoutEntry>,
}

impl Default for IndoorConfig {
    fn default() -> Self {
        Self {
            rooms: RoomProfile::default().rules().to_vec(),
            layout: LayoutTable::default().entries().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// Utterances go to the log only
    Log,
    /// Utterances are spoken by an external TTS command
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,
    /// TTS program for the command backend
    pub program: String,
    /// Arguments placed before the utterance text
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::Log,
            program: "espeak".to_string(),
            args: vec!["-s".to_string(), "200".to_string()],
        }
    }
}

/// Detector output replayed as frames
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesConfig {
    /// Newline-delimited JSON frames; hazard and indoor workers cannot
    /// start without it
    pub path: Option<PathBuf>,
    /// Replay rate, 0 for as fast as possible
    pub fps: u32,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self { path: None, fps: 15 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    pub format: LogFormat,
    /// Prometheus listener, disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            metrics_addr: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub risk: RiskConfig,
    pub alert: AlertConfig,
    pub indoor: IndoorConfig,
    pub outdoor: OutdoorConfig,
    pub speech: SpeechConfig,
    pub prompt: PromptConfig,
    pub frames: FramesConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

impl AssistConfig {
    /// Load from `path` (if any) and the environment.
    ///
    /// Only the shape is checked here. Call [`AssistConfig::validate`] once
    /// logging is up, since it reports questionable settings as warnings.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("VISION_ASSIST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        RoomProfile::new(self.indoor.rooms.clone())
            .map_err(|e| ConfigError::Invalid(format!("indoor.rooms: {}", e)))?;
        LayoutTable::new(self.indoor.layout.clone())
            .map_err(|e| ConfigError::Invalid(format!("indoor.layout: {}", e)))?;

        for rule in &self.indoor.rooms {
            if !self.indoor.layout.iter().any(|e| e.name == rule.name) {
                warn!("Room {} has no layout position; directions to it are unavailable", rule.name);
            }
        }

        if self.orchestrator.stop_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "orchestrator.stop_timeout_ms must be positive".to_string(),
            ));
        }

        if self.risk.is_preset() {
            info!("Risk thresholds: person {:?}, other {:?}", self.risk.person, self.risk.other);
        } else {
            warn!(
                "Risk thresholds match no known preset (near 1700/1500, far 4000/3000 are both in use); \
                 confirm person {:?} and other {:?} with the system owner",
                self.risk.person, self.risk.other
            );
        }

        Ok(())
    }
}
