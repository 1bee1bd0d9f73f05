mod json_file;

pub use json_file::JsonDetections;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box from corner coordinates, collapsing inverted extents to zero
    pub fn from_corners(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        let width = (i64::from(xmax) - i64::from(xmin)).max(0) as u32;
        let height = (i64::from(ymax) - i64::from(ymin)).max(0) as u32;
        Self::new(xmin, ymin, width, height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// One labelled object reported by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
        }
    }
}

/// Trait for object detector outputs
/// The detector itself lives outside this crate; implementations adapt its results
pub trait DetectionSource {
    /// Return every detection for the current image, in detector order
    fn detections(&mut self) -> Result<Vec<Detection>>;
}
