//! Hazard Perception
//!
//! Turns per-frame object detections into hazard assessments:
//! - Detection and frame data model
//! - Monocular distance estimate from bounding-box height
//! - Risk tiering (safe / caution / danger)
//! - Frame sources (replayed detector output, in-memory frames)

pub mod config;
pub mod detection;
pub mod risk;
pub mod source;

pub use config::{RiskConfig, TierThresholds};
pub use detection::{BoundingBox, Detection, Frame, PERSON_LABEL};
pub use risk::{estimate_distance, ClassifiedDetection, RiskClassifier, RiskTier};
pub use source::{FrameSource, FrameSourceOpener, ReplayFrameSource, ReplayOpener, VecFrameSource};

use thiserror::Error;

/// Hazard error types
#[derive(Error, Debug)]
pub enum HazardError {
    #[error("Invalid risk configuration: {0}")]
    Config(String),

    #[error("Frame source I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed frame at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
