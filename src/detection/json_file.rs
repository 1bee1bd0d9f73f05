use super::{BoundingBox, Detection, DetectionSource};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Detector results stored as JSON
///
/// Accepts either box form per record:
/// - `{"label", "confidence", "x", "y", "width", "height"}`
/// - `{"name", "confidence", "xmin", "ymin", "xmax", "ymax"}` (YOLO pandas export)
pub struct JsonDetections {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDetection {
    Box {
        label: String,
        confidence: f32,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    Corners {
        name: String,
        confidence: f32,
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },
}

impl From<RawDetection> for Detection {
    fn from(raw: RawDetection) -> Self {
        match raw {
            RawDetection::Box {
                label,
                confidence,
                x,
                y,
                width,
                height,
            } => Detection::new(label, confidence, BoundingBox::new(x, y, width, height)),
            RawDetection::Corners {
                name,
                confidence,
                xmin,
                ymin,
                xmax,
                ymax,
            } => {
                // Truncate like an integer cast of the detector's float corners
                let bbox = BoundingBox::from_corners(
                    xmin as i32,
                    ymin as i32,
                    xmax as i32,
                    ymax as i32,
                );
                Detection::new(name, confidence, bbox)
            }
        }
    }
}

impl JsonDetections {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(json: &str) -> Result<Vec<Detection>> {
        let raw: Vec<RawDetection> =
            serde_json::from_str(json).context("Failed to parse detections JSON")?;
        Ok(raw.into_iter().map(Detection::from).collect())
    }
}

impl DetectionSource for JsonDetections {
    fn detections(&mut self) -> Result<Vec<Detection>> {
        let json = std::fs::read_to_string(&self.path).with_context(|| {
            format!("Failed to read detections from {}", self.path.display())
        })?;
        let detections = Self::parse(&json)?;

        tracing::info!(
            "Loaded {} detection(s) from {}",
            detections.len(),
            self.path.display()
        );

        Ok(detections)
    }
}
