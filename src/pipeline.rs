use crate::calibration::{pixel_to_cm_ratio, Calibration, ScaleCalibrator};
use crate::config::EstimatorConfig;
use crate::detection::Detection;
use crate::nutrition::{NutritionEstimate, NutritionTable};
use crate::region;
use crate::segmentation::{self, Contour, SegmentationResult, Segmenter};
use crate::volume::{VolumeError, VolumeEstimator};
use image::RgbImage;
use serde::Serialize;

/// Outcome of the volume step for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    Estimated,
    /// No shape model for the label; contributes nothing
    UnsupportedLabel,
    /// Numeric failure in the shape model; contributes nothing
    Failed,
}

/// Per-item result, in detector order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemEstimate {
    pub label: String,
    pub confidence: f32,
    pub volume_cm3: f64,
    pub mass_grams: f64,
    pub energy_kcal: f64,
    /// Table value when the label is known
    pub kcal_per_100g: Option<f64>,
    pub status: EstimateStatus,
}

/// Everything estimated for one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageReport {
    /// Food items only; reference objects are not listed
    pub items: Vec<ItemEstimate>,
    pub total_energy_kcal: f64,
    pub reference_found: bool,
    pub calibration: Calibration,
}

struct SegmentedItem<'a> {
    detection: &'a Detection,
    contour: Contour,
    pixel_area: f64,
}

/// Detections in, nutrition out
///
/// Stateless between calls: processing the same image and detections twice
/// gives identical reports.
pub struct Pipeline {
    config: EstimatorConfig,
    segmenter: Box<dyn Segmenter>,
    volumes: VolumeEstimator,
    nutrition: NutritionTable,
}

impl Pipeline {
    pub fn new(config: EstimatorConfig) -> Self {
        let segmenter = segmentation::create_default_segmenter(&config);
        Self::with_segmenter(config, segmenter)
    }

    pub fn with_segmenter(config: EstimatorConfig, segmenter: Box<dyn Segmenter>) -> Self {
        let volumes = VolumeEstimator::from_config(&config);
        let nutrition = NutritionTable::from_config(&config);
        Self {
            config,
            segmenter,
            volumes,
            nutrition,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn process(&self, image: &RgbImage, detections: &[Detection]) -> ImageReport {
        let _span = tracing::debug_span!("process_image", detections = detections.len()).entered();

        let mut calibrator = ScaleCalibrator::new(self.config.default_calibration);
        let mut foods = Vec::with_capacity(detections.len());

        for detection in detections {
            let result = self.segment_detection(image, detection);

            if self.config.is_reference(&detection.label) {
                let fallback_ratio = pixel_to_cm_ratio(
                    self.config.reference_length_cm,
                    f64::from(detection.bbox.height),
                );
                calibrator.observe(&result, fallback_ratio);
            } else {
                foods.push(SegmentedItem {
                    detection,
                    contour: result.contour,
                    pixel_area: result.pixel_area,
                });
            }
        }

        // Every volume below depends on the resolved calibration
        let calibration = calibrator.resolve();
        let items: Vec<ItemEstimate> = foods
            .iter()
            .map(|item| self.estimate_item(item, &calibration))
            .collect();
        let total_energy_kcal: f64 = items.iter().map(|item| item.energy_kcal).sum();

        tracing::info!(
            "Estimated {} item(s), total {:.2} kcal, reference found: {}",
            items.len(),
            total_energy_kcal,
            calibrator.reference_found()
        );

        ImageReport {
            items,
            total_energy_kcal,
            reference_found: calibrator.reference_found(),
            calibration,
        }
    }

    fn segment_detection(&self, image: &RgbImage, detection: &Detection) -> SegmentationResult {
        let region = region::extract(image, &detection.bbox, self.config.margin_px);
        let selection = self.config.selection_for(&detection.label);

        match self.segmenter.segment(selection, &region) {
            Some(result) => {
                tracing::debug!(
                    "{}: segmented area {:.1}px",
                    detection.label,
                    result.pixel_area
                );
                result
            }
            None => {
                tracing::debug!(
                    "{}: segmentation unavailable, using detection box",
                    detection.label
                );
                SegmentationResult::fallback(&detection.bbox, self.config.reference_length_cm)
            }
        }
    }

    fn estimate_item(&self, item: &SegmentedItem<'_>, calibration: &Calibration) -> ItemEstimate {
        let label = item.detection.label.trim();
        let volume = self
            .volumes
            .estimate(label, item.pixel_area, calibration, &item.contour);

        let (volume_cm3, status) = match volume {
            Ok(volume) => (volume, EstimateStatus::Estimated),
            Err(VolumeError::UnsupportedLabel(_)) => {
                tracing::debug!("{}: no shape model, contributing zero", label);
                (0.0, EstimateStatus::UnsupportedLabel)
            }
            Err(err) => {
                tracing::warn!("{}: volume estimation failed: {}", label, err);
                (0.0, EstimateStatus::Failed)
            }
        };

        let NutritionEstimate {
            mass_grams,
            energy_kcal,
        } = self.nutrition.to_nutrition(label, volume_cm3);

        ItemEstimate {
            label: label.to_string(),
            confidence: item.detection.confidence,
            volume_cm3,
            mass_grams,
            energy_kcal,
            kcal_per_100g: self.nutrition.entry(label).map(|entry| entry.kcal_per_100g),
            status,
        }
    }
}
