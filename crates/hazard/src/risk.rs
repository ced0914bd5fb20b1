//! Distance estimation and risk tiering

use serde::{Deserialize, Serialize};
use tracing::info;
use crate::config::{RiskConfig, TierThresholds};
use crate::detection::{Detection, Frame};
use crate::HazardError;

/// Qualitative hazard level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    #[default]
    Safe,
    Caution,
    Danger,
}

/// Detection with its distance estimate and risk tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedDetection {
    pub detection: Detection,

    /// Uncalibrated distance scalar, `f32::INFINITY` for degenerate boxes
    pub distance: f32,

    pub tier: RiskTier,
}

impl ClassifiedDetection {
    pub fn label(&self) -> &str {
        &self.detection.label
    }

    pub fn is_person(&self) -> bool {
        self.detection.is_person()
    }
}

/// Estimate distance from bounding-box height relative to frame height.
///
/// Returns `f32::INFINITY` for non-positive box heights or an empty frame.
pub fn estimate_distance(
    bbox_height: f32,
    frame_height: u32,
    assumed_object_height_m: f32,
    focal_length: f32,
) -> f32 {
    if !(bbox_height > 0.0) || frame_height == 0 {
        return f32::INFINITY;
    }
    (assumed_object_height_m * focal_length) / (bbox_height / frame_height as f32)
}

/// Stateless detection-to-risk classifier
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    config: RiskConfig,
}

impl RiskClassifier {
    pub fn new(config: RiskConfig) -> Result<Self, HazardError> {
        config.validate()?;
        info!(
            "Risk classifier: person near/far {}/{}, other near/far {}/{}",
            config.person.near_distance,
            config.person.far_distance,
            config.other.near_distance,
            config.other.far_distance
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Classify a single detection
    pub fn classify(&self, detection: &Detection, frame_height: u32) -> ClassifiedDetection {
        let distance = estimate_distance(
            detection.bbox.height(),
            frame_height,
            self.config.assumed_object_height_m,
            self.config.focal_length,
        );

        let thresholds = if detection.is_person() {
            &self.config.person
        } else {
            &self.config.other
        };

        ClassifiedDetection {
            detection: detection.clone(),
            distance,
            tier: tier_for(detection.confidence, distance, thresholds),
        }
    }

    /// Classify every detection of a frame, preserving detector order
    pub fn classify_frame(&self, frame: &Frame) -> Vec<ClassifiedDetection> {
        frame
            .detections
            .iter()
            .map(|d| self.classify(d, frame.height))
            .collect()
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self {
            config: RiskConfig::default(),
        }
    }
}

fn tier_for(confidence: f32, distance: f32, t: &TierThresholds) -> RiskTier {
    if !(confidence > t.min_confidence) {
        return RiskTier::Safe;
    }
    if distance <= t.near_distance {
        RiskTier::Danger
    } else if distance <= t.far_distance {
        RiskTier::Caution
    } else {
        RiskTier::Safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;
    use proptest::prelude::*;

    fn detection(label: &str, confidence: f32, y1: f32, y2: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(0.0, y1, 50.0, y2))
    }

    #[test]
    fn test_distance_formula() {
        // Box covers the full frame: 1.7 * 700 / 1.0
        let d = estimate_distance(480.0, 480, 1.7, 700.0);
        assert!((d - 1190.0).abs() < 1e-3);

        // Half the frame doubles the distance
        let d = estimate_distance(240.0, 480, 1.7, 700.0);
        assert!((d - 2380.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_frame_is_far() {
        assert_eq!(estimate_distance(100.0, 0, 1.7, 700.0), f32::INFINITY);
    }

    #[test]
    fn test_close_person_is_danger() {
        let classifier = RiskClassifier::default();
        let result = classifier.classify(&detection("person", 0.9, 0.0, 480.0), 480);
        assert_eq!(result.tier, RiskTier::Danger);
    }

    #[test]
    fn test_mid_range_object_is_caution() {
        let classifier = RiskClassifier::default();
        // distance 2380: between 1700 and 4000
        let result = classifier.classify(&detection("chair", 0.9, 0.0, 240.0), 480);
        assert_eq!(result.tier, RiskTier::Caution);
    }

    #[test]
    fn test_far_object_is_safe() {
        let classifier = RiskClassifier::default();
        // distance 11900
        let result = classifier.classify(&detection("chair", 0.99, 0.0, 48.0), 480);
        assert_eq!(result.tier, RiskTier::Safe);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let mut config = RiskConfig::default();
        config.other.near_distance = 1190.0;
        let classifier = RiskClassifier::new(config).unwrap();

        let result = classifier.classify(&detection("chair", 0.9, 0.0, 480.0), 480);
        assert_eq!(result.tier, RiskTier::Danger);
    }

    #[test]
    fn test_person_thresholds_apply_only_to_people() {
        let mut config = RiskConfig::default();
        config.person.near_distance = 3000.0;
        let classifier = RiskClassifier::new(config).unwrap();

        let frame = Frame::new(
            480,
            vec![detection("person", 0.9, 0.0, 240.0), detection("dog", 0.9, 0.0, 240.0)],
        );
        let tiers: Vec<_> = classifier.classify_frame(&frame).iter().map(|c| c.tier).collect();
        assert_eq!(tiers, vec![RiskTier::Danger, RiskTier::Caution]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RiskConfig::default();
        config.person.min_confidence = 1.5;
        assert!(RiskClassifier::new(config).is_err());
    }

    proptest! {
        #[test]
        fn degenerate_boxes_are_infinitely_far_and_safe(
            y1 in 0.0f32..2000.0,
            shrink in 0.0f32..2000.0,
            confidence in 0.0f32..=1.0,
            frame_height in 1u32..4000,
        ) {
            let classifier = RiskClassifier::default();
            let result = classifier.classify(&detection("person", confidence, y1, y1 - shrink), frame_height);
            prop_assert_eq!(result.distance, f32::INFINITY);
            prop_assert_eq!(result.tier, RiskTier::Safe);
        }

        #[test]
        fn low_confidence_is_always_safe(
            confidence in 0.0f32..=0.80,
            height in 1.0f32..4000.0,
            frame_height in 1u32..4000,
            is_person in any::<bool>(),
        ) {
            let classifier = RiskClassifier::default();
            let label = if is_person { "person" } else { "bicycle" };
            let result = classifier.classify(&detection(label, confidence, 0.0, height), frame_height);
            prop_assert_eq!(result.tier, RiskTier::Safe);
        }
    }
}
