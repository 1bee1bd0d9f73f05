use super::contour::Contour;
use crate::calibration::pixel_to_cm_ratio;
use crate::detection::BoundingBox;
use crate::region::CroppedRegion;
use serde::{Deserialize, Serialize};

/// Which pass-2 contour represents the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourSelection {
    /// Largest contour, plus a pixel-to-cm ratio from its minimal rectangle
    Reference,
    Largest,
    /// Second-largest when available
    ///
    /// Heuristic for elongated root vegetables, where the largest contour after
    /// thresholding tends to be the crop outline rather than the object. Not a
    /// geometric guarantee; needs validation against labelled photos.
    SecondLargest,
}

/// Silhouette chosen for one cropped region
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationResult {
    /// In the cropped region's local pixel coordinates
    pub contour: Contour,
    /// Always >= 0
    pub pixel_area: f64,
    /// Only set for the reference object
    pub pixel_to_cm: Option<f64>,
}

impl SegmentationResult {
    /// Rectangle spanning the whole detection box, used when segmentation finds nothing
    pub fn fallback(bbox: &BoundingBox, reference_length_cm: f64) -> Self {
        Self {
            contour: Contour::rectangle(bbox.width, bbox.height),
            pixel_area: bbox.area() as f64,
            pixel_to_cm: Some(pixel_to_cm_ratio(
                reference_length_cm,
                f64::from(bbox.height),
            )),
        }
    }
}

/// Trait for silhouette segmentation backends
pub trait Segmenter {
    /// Isolate the object in `region`
    ///
    /// Returns `None` when no usable contour exists (for example an empty or
    /// featureless crop); callers substitute [`SegmentationResult::fallback`].
    fn segment(
        &self,
        selection: ContourSelection,
        region: &CroppedRegion,
    ) -> Option<SegmentationResult>;
}
