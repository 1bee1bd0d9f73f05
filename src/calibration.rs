use crate::segmentation::SegmentationResult;
use serde::Serialize;

/// Pixel scale derived from the reference object
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    /// Pixel area of the reference object's silhouette
    pub reference_area_pixels: f64,
    /// Centimetres per pixel, always > 0
    pub pixel_to_cm: f64,
}

impl Calibration {
    /// Calibrate from the reference object's segmentation
    ///
    /// `fallback_ratio` is used when the segmenter did not provide a ratio.
    /// A zero-area reference is clamped to one pixel so volumes stay finite.
    pub fn from_reference(result: &SegmentationResult, fallback_ratio: f64) -> Self {
        let pixel_to_cm = result
            .pixel_to_cm
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
            .unwrap_or(fallback_ratio);

        Self {
            reference_area_pixels: result.pixel_area.max(1.0),
            pixel_to_cm,
        }
    }
}

/// Ratio from a reference rectangle's long side, clamped to at least one pixel
pub fn pixel_to_cm_ratio(reference_length_cm: f64, long_side_px: f64) -> f64 {
    reference_length_cm / long_side_px.max(1.0)
}

/// Tracks the image calibration; the first reference object wins
#[derive(Debug, Clone)]
pub struct ScaleCalibrator {
    default: Calibration,
    found: Option<Calibration>,
}

impl ScaleCalibrator {
    pub fn new(default: Calibration) -> Self {
        Self {
            default,
            found: None,
        }
    }

    /// Offer a reference segmentation; ignored once a reference is recorded
    pub fn observe(&mut self, result: &SegmentationResult, fallback_ratio: f64) {
        if self.found.is_some() {
            tracing::debug!("Ignoring additional reference object");
            return;
        }
        let calibration = Calibration::from_reference(result, fallback_ratio);
        tracing::debug!(
            "Reference calibration: area={:.1}px, ratio={:.5}cm/px",
            calibration.reference_area_pixels,
            calibration.pixel_to_cm
        );
        self.found = Some(calibration);
    }

    pub fn reference_found(&self) -> bool {
        self.found.is_some()
    }

    /// Recorded calibration, or the default when no reference was seen
    pub fn resolve(&self) -> Calibration {
        self.found.unwrap_or_else(|| {
            tracing::debug!("No reference object, using default calibration");
            self.default
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::Contour;

    fn result(area: f64, ratio: Option<f64>) -> SegmentationResult {
        SegmentationResult {
            contour: Contour::rectangle(10, 10),
            pixel_area: area,
            pixel_to_cm: ratio,
        }
    }

    const DEFAULT: Calibration = Calibration {
        reference_area_pixels: 100_000.0,
        pixel_to_cm: 0.01,
    };

    #[test]
    fn degenerate_long_side_clamps_to_one() {
        assert_eq!(pixel_to_cm_ratio(5.0, 0.0), 5.0);
        assert_eq!(pixel_to_cm_ratio(5.0, 0.4), 5.0);
        assert_eq!(pixel_to_cm_ratio(5.0, 50.0), 0.1);
    }

    #[test]
    fn default_without_reference() {
        let calibrator = ScaleCalibrator::new(DEFAULT);
        assert!(!calibrator.reference_found());
        assert_eq!(calibrator.resolve(), DEFAULT);
    }

    #[test]
    fn first_reference_wins() {
        let mut calibrator = ScaleCalibrator::new(DEFAULT);
        calibrator.observe(&result(400.0, Some(0.2)), 1.0);
        calibrator.observe(&result(900.0, Some(0.5)), 1.0);

        assert!(calibrator.reference_found());
        assert_eq!(
            calibrator.resolve(),
            Calibration {
                reference_area_pixels: 400.0,
                pixel_to_cm: 0.2
            }
        );
    }

    #[test]
    fn missing_ratio_uses_fallback() {
        let calibration = Calibration::from_reference(&result(0.0, None), 0.25);
        assert_eq!(calibration.pixel_to_cm, 0.25);
        assert_eq!(calibration.reference_area_pixels, 1.0);
    }
}
