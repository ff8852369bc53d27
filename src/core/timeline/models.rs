//! Annotation Model Definitions
//!
//! Defines the bounding-box and per-frame annotation value types
//! stored in a [`Timeline`](super::Timeline).

use serde::{Deserialize, Serialize};

use crate::core::FrameNumber;

// =============================================================================
// Bounding Box
// =============================================================================

/// Axis-aligned bounding box in source-image pixel space
///
/// The engine stores whatever the producer supplies; geometry is not
/// validated here (zero or negative extents are the producer's
/// business).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Left edge X
    pub x: f64,
    /// Top edge Y
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Creates a new bounding box
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

// =============================================================================
// Annotated Frame
// =============================================================================

/// A bounding box recorded at a particular frame of the sequence
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedFrame {
    /// Frame index this annotation belongs to
    pub frame_number: FrameNumber,
    /// Bounding box; `None` means the object is not visible here
    pub bbox: Option<BoundingBox>,
    /// True if user-supplied/confirmed, false if produced by tracking
    pub is_ground_truth: bool,
}

impl AnnotatedFrame {
    /// Creates a new annotated frame
    pub fn new(frame_number: FrameNumber, bbox: Option<BoundingBox>, is_ground_truth: bool) -> Self {
        Self {
            frame_number,
            bbox,
            is_ground_truth,
        }
    }

    /// Creates a ground-truth annotation
    pub fn ground_truth(frame_number: FrameNumber, bbox: BoundingBox) -> Self {
        Self::new(frame_number, Some(bbox), true)
    }

    /// Creates a tracker-produced annotation
    pub fn tracked(frame_number: FrameNumber, bbox: BoundingBox) -> Self {
        Self::new(frame_number, Some(bbox), false)
    }

    /// Creates the synthetic invisible anchor placed at frame 0
    pub(crate) fn invisible_anchor() -> Self {
        Self::new(0, None, false)
    }

    /// Returns true if the object is visible at this frame
    pub fn is_visible(&self) -> bool {
        self.bbox.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility() {
        let visible = AnnotatedFrame::ground_truth(3, BoundingBox::new(1.0, 2.0, 10.0, 20.0));
        assert!(visible.is_visible());

        let hidden = AnnotatedFrame::new(3, None, true);
        assert!(!hidden.is_visible());
    }

    #[test]
    fn test_anchor_shape() {
        let anchor = AnnotatedFrame::invisible_anchor();
        assert_eq!(anchor.frame_number, 0);
        assert!(anchor.bbox.is_none());
        assert!(!anchor.is_ground_truth);
    }

    #[test]
    fn test_serde_camel_case() {
        let frame = AnnotatedFrame::tracked(4, BoundingBox::new(0.0, 0.0, 5.0, 5.0));
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("frameNumber"));
        assert!(json.contains("isGroundTruth"));

        let back: AnnotatedFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }
}
