//! Risk configuration

use serde::{Deserialize, Serialize};
use crate::HazardError;

/// Thresholds for one object category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Confidence must be strictly above this to raise a warning
    pub min_confidence: f32,

    /// Distance at or below which the object is a danger
    pub near_distance: f32,

    /// Distance at or below which the object is a caution
    pub far_distance: f32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::new(0.80, 1700.0, 4000.0)
    }
}

impl TierThresholds {
    const fn new(min_confidence: f32, near_distance: f32, far_distance: f32) -> Self {
        Self {
            min_confidence,
            near_distance,
            far_distance,
        }
    }
}

/// Risk classifier configuration
///
/// Distances are uncalibrated scalars produced by
/// [`estimate_distance`](crate::estimate_distance) and only meaningful
/// relative to the thresholds below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Assumed real-world object height (meters)
    pub assumed_object_height_m: f32,

    /// Focal length constant of the camera model
    pub focal_length: f32,

    /// Thresholds applied to the "person" class
    pub person: TierThresholds,

    /// Thresholds applied to every other class
    pub other: TierThresholds,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            assumed_object_height_m: 1.7,
            focal_length: 700.0,
            person: TierThresholds::default(),
            other: TierThresholds::default(),
        }
    }
}

impl RiskConfig {
    /// Integrated indoor variant (stricter confidence)
    pub fn indoor() -> Self {
        Self {
            person: TierThresholds::new(0.85, 1700.0, 4000.0),
            other: TierThresholds::new(0.85, 1700.0, 4000.0),
            ..Default::default()
        }
    }

    /// Short-range variant (warns later)
    pub fn short_range() -> Self {
        Self {
            person: TierThresholds::new(0.80, 1500.0, 3000.0),
            other: TierThresholds::new(0.80, 1500.0, 3000.0),
            ..Default::default()
        }
    }

    /// Whether the thresholds match one of the known presets
    pub fn is_preset(&self) -> bool {
        [Self::default(), Self::indoor(), Self::short_range()]
            .iter()
            .any(|preset| preset == self)
    }

    /// Validate thresholds
    pub fn validate(&self) -> Result<(), HazardError> {
        if !(self.assumed_object_height_m > 0.0) || !(self.focal_length > 0.0) {
            return Err(HazardError::Config(
                "object height and focal length must be positive".to_string(),
            ));
        }

        for (name, t) in [("person", &self.person), ("other", &self.other)] {
            if !(0.0..=1.0).contains(&t.min_confidence) {
                return Err(HazardError::Config(format!(
                    "{} min_confidence {} outside [0, 1]",
                    name, t.min_confidence
                )));
            }
            if !(t.near_distance >= 0.0 && t.near_distance <= t.far_distance) {
                return Err(HazardError::Config(format!(
                    "{} near_distance {} must be within [0, far_distance {}]",
                    name, t.near_distance, t.far_distance
                )));
            }
        }

        Ok(())
    }
}
