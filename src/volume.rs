use crate::calibration::Calibration;
use crate::config::EstimatorConfig;
use crate::segmentation::Contour;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;
use thiserror::Error;

/// Geometric class a food label belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeClass {
    /// Roughly spherical produce
    Round,
    /// Long produce, modelled as a cylinder when large enough
    Elongated,
}

/// Formula used to turn a projected area into a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeModel {
    /// Area is a great-circle disk
    Sphere,
    /// Height from the contour's minimal rectangle, radius from area / (2 * height)
    Cylinder,
    /// Volume proportional to area, for items too small to fit a cylinder
    FlatSlab,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VolumeError {
    #[error("no shape model for label '{0}'")]
    UnsupportedLabel(String),

    #[error("contour has no points")]
    MalformedContour,

    #[error("{model:?} volume evaluated to {value}")]
    NonFinite { model: ShapeModel, value: f64 },
}

/// Label to shape class lookup, built once per configuration
#[derive(Debug, Clone, Default)]
pub struct ShapeCatalog {
    classes: HashMap<String, ShapeClass>,
}

impl ShapeCatalog {
    pub fn from_config(config: &EstimatorConfig) -> Self {
        let classes = config
            .foods
            .iter()
            .filter_map(|(label, food)| food.shape.map(|shape| (label.clone(), shape)))
            .collect();
        Self { classes }
    }

    pub fn with_class(mut self, label: &str, class: ShapeClass) -> Self {
        self.classes
            .insert(EstimatorConfig::normalize_label(label), class);
        self
    }

    pub fn class_of(&self, label: &str) -> Option<ShapeClass> {
        self.classes
            .get(&EstimatorConfig::normalize_label(label))
            .copied()
    }
}

/// Converts segmented pixel areas into volumes
#[derive(Debug, Clone)]
pub struct VolumeEstimator {
    catalog: ShapeCatalog,
    /// Physical area of the reference object
    reference_area_cm2: f64,
    /// Elongated items at or below this area use the flat-slab model
    slab_area_cm2: f64,
    slab_factor: f64,
}

impl VolumeEstimator {
    pub fn new(
        catalog: ShapeCatalog,
        reference_area_cm2: f64,
        slab_area_cm2: f64,
        slab_factor: f64,
    ) -> Self {
        Self {
            catalog,
            reference_area_cm2,
            slab_area_cm2,
            slab_factor,
        }
    }

    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self::new(
            ShapeCatalog::from_config(config),
            config.reference_area_cm2,
            config.slab_area_cm2,
            config.slab_factor,
        )
    }

    /// Real-world area, scaled by the reference object's known area
    pub fn area_cm2(&self, object_area_pixels: f64, calibration: &Calibration) -> f64 {
        let reference_pixels = calibration.reference_area_pixels.max(1.0);
        (object_area_pixels.max(0.0) / reference_pixels) * self.reference_area_cm2
    }

    /// First matching model for the label and area
    pub fn model_for(&self, label: &str, area_cm2: f64) -> Option<ShapeModel> {
        match self.catalog.class_of(label)? {
            ShapeClass::Round => Some(ShapeModel::Sphere),
            ShapeClass::Elongated if area_cm2 > self.slab_area_cm2 => Some(ShapeModel::Cylinder),
            ShapeClass::Elongated => Some(ShapeModel::FlatSlab),
        }
    }

    /// Volume in cm^3
    pub fn estimate(
        &self,
        label: &str,
        object_area_pixels: f64,
        calibration: &Calibration,
        contour: &Contour,
    ) -> Result<f64, VolumeError> {
        let area_cm2 = self.area_cm2(object_area_pixels, calibration);
        let model = self
            .model_for(label, area_cm2)
            .ok_or_else(|| VolumeError::UnsupportedLabel(label.to_string()))?;

        let volume = match model {
            ShapeModel::Sphere => {
                let radius = (area_cm2 / PI).sqrt();
                (4.0 / 3.0) * PI * radius.powi(3)
            }
            ShapeModel::Cylinder => {
                if contour.points.is_empty() {
                    return Err(VolumeError::MalformedContour);
                }
                let height = contour.long_side() * calibration.pixel_to_cm;
                let radius = area_cm2 / (2.0 * height);
                PI * radius * radius * height
            }
            ShapeModel::FlatSlab => area_cm2 * self.slab_factor,
        };

        if !volume.is_finite() || volume < 0.0 {
            return Err(VolumeError::NonFinite {
                model,
                value: volume,
            });
        }

        tracing::trace!(
            "{}: {:?} model, area={:.3}cm2, volume={:.3}cm3",
            label,
            model,
            area_cm2,
            volume
        );

        Ok(volume)
    }
}
