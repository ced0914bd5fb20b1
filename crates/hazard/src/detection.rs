//! Detector output types

use serde::{Deserialize, Serialize};

/// Label the detector uses for people
pub const PERSON_LABEL: &str = "person";

/// Bounding box in pixel coordinates
///
/// Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Height in pixels (may be zero or negative for degenerate boxes)
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// One object reported by the detector for a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label (e.g. "person", "chair")
    pub label: String,

    /// Detection confidence in [0, 1]
    pub confidence: f32,

    /// Bounding box
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }

    pub fn is_person(&self) -> bool {
        self.label == PERSON_LABEL
    }
}

/// Detector output for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame height in pixels
    pub height: u32,

    /// Detections in detector order
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl Frame {
    pub fn new(height: u32, detections: Vec<Detection>) -> Self {
        Self { height, detections }
    }

    /// Labels observed in this frame
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.detections.iter().map(|d| d.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_parses_from_detector_json() {
        let json = r#"{"height":480,"detections":[{"label":"person","confidence":0.91,"bbox":[10,20,110,420]}]}"#;
        let frame: Frame = serde_json::from_str(json).unwrap();

        assert_eq!(frame.height, 480);
        assert_eq!(frame.detections.len(), 1);
        assert!(frame.detections[0].is_person());
        assert_eq!(frame.detections[0].bbox.height(), 400.0);
    }

    #[test]
    fn frame_without_detections() {
        let frame: Frame = serde_json::from_str(r#"{"height":720}"#).unwrap();
        assert!(frame.detections.is_empty());
        assert_eq!(frame.labels().count(), 0);
    }
}
