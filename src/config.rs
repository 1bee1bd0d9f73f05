use crate::calibration::Calibration;
use crate::segmentation::ContourSelection;
use crate::volume::ShapeClass;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_MARGIN_PX: u32 = 5;
const DEFAULT_REFERENCE_LABEL: &str = "thumb";
/// Thumb length used to turn the reference rectangle into a pixel-to-cm ratio
const DEFAULT_REFERENCE_LENGTH_CM: f64 = 5.0;
/// Thumb area, 5 cm x 2.3 cm
const DEFAULT_REFERENCE_AREA_CM2: f64 = 5.0 * 2.3;
const DEFAULT_CALIBRATION_AREA_PX: f64 = 100_000.0;
const DEFAULT_CALIBRATION_PIXEL_TO_CM: f64 = 0.01;
const DEFAULT_BLOCK_SIZE: u32 = 15;
const DEFAULT_THRESHOLD_OFFSET: f64 = 2.0;
const DEFAULT_PLATE_LOWER: [u8; 3] = [0, 0, 50];
const DEFAULT_PLATE_UPPER: [u8; 3] = [200, 90, 250];
const DEFAULT_SLAB_AREA_CM2: f64 = 30.0;
const DEFAULT_SLAB_FACTOR: f64 = 0.5;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct EstimatorConfigFile {
    margin_px: Option<u32>,
    reference_label: Option<String>,
    reference_length_cm: Option<f64>,
    reference_area_cm2: Option<f64>,
    default_calibration: Option<CalibrationConfigFile>,
    threshold: Option<ThresholdConfigFile>,
    plate: Option<PlateConfigFile>,
    slab_area_cm2: Option<f64>,
    slab_factor: Option<f64>,
    foods: Option<BTreeMap<String, FoodConfigFile>>,
}

#[derive(Debug, Deserialize, Default)]
struct CalibrationConfigFile {
    reference_area_pixels: Option<f64>,
    pixel_to_cm: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdConfigFile {
    block_size: Option<u32>,
    offset: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct PlateConfigFile {
    lower: Option<[u8; 3]>,
    upper: Option<[u8; 3]>,
}

#[derive(Debug, Deserialize)]
struct FoodConfigFile {
    density: f64,
    kcal_per_100g: f64,
    shape: Option<ShapeClass>,
    segmentation: Option<ContourSelection>,
}

/// Local thresholding parameters shared by both segmentation passes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSettings {
    /// Odd neighbourhood size in pixels
    pub block_size: u32,
    /// Constant subtracted from the weighted local mean
    pub offset: f64,
}

impl ThresholdSettings {
    /// Gaussian sigma matching a `block_size` x `block_size` kernel
    pub fn sigma(&self) -> f32 {
        (0.3 * ((self.block_size as f64 - 1.0) * 0.5 - 1.0) + 0.8) as f32
    }
}

/// Inclusive HSV box treated as plate/background (H in 0..=180, S and V in 0..=255)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl PlateRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

/// Per-label food properties
#[derive(Debug, Clone, PartialEq)]
pub struct FoodProfile {
    /// g/cm^3
    pub density: f64,
    pub kcal_per_100g: f64,
    /// `None` when no geometric model exists for the label
    pub shape: Option<ShapeClass>,
    pub segmentation: ContourSelection,
}

impl FoodProfile {
    fn new(density: f64, kcal_per_100g: f64, shape: Option<ShapeClass>) -> Self {
        Self {
            density,
            kcal_per_100g,
            shape,
            segmentation: ContourSelection::Largest,
        }
    }

    fn with_segmentation(mut self, segmentation: ContourSelection) -> Self {
        self.segmentation = segmentation;
        self
    }
}

#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub margin_px: u32,
    pub reference_label: String,
    pub reference_length_cm: f64,
    pub reference_area_cm2: f64,
    pub default_calibration: Calibration,
    pub threshold: ThresholdSettings,
    pub plate: PlateRange,
    pub slab_area_cm2: f64,
    pub slab_factor: f64,
    /// Keyed by normalized label
    pub foods: BTreeMap<String, FoodProfile>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        // Defaults never fail validation
        Self::from_file(EstimatorConfigFile::default())
    }
}

impl EstimatorConfig {
    /// Load configuration from `path`, falling back to `NUTRIVISION_CONFIG`, then defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("NUTRIVISION_CONFIG").ok();
        let path = path.or(env_path.as_deref().map(Path::new));

        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };

        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: EstimatorConfigFile =
            toml::from_str(contents).context("Failed to parse estimator config")?;
        let cfg = Self::from_file(file);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Lookup key for a detector label
    pub fn normalize_label(label: &str) -> String {
        label.trim().to_lowercase()
    }

    pub fn is_reference(&self, label: &str) -> bool {
        Self::normalize_label(label) == self.reference_label
    }

    pub fn food(&self, label: &str) -> Option<&FoodProfile> {
        self.foods.get(&Self::normalize_label(label))
    }

    /// Contour selection policy for a detector label
    pub fn selection_for(&self, label: &str) -> ContourSelection {
        if self.is_reference(label) {
            return ContourSelection::Reference;
        }
        self.food(label)
            .map(|food| food.segmentation)
            .unwrap_or(ContourSelection::Largest)
    }

    fn from_file(file: EstimatorConfigFile) -> Self {
        let default_calibration = Calibration {
            reference_area_pixels: file
                .default_calibration
                .as_ref()
                .and_then(|c| c.reference_area_pixels)
                .unwrap_or(DEFAULT_CALIBRATION_AREA_PX),
            pixel_to_cm: file
                .default_calibration
                .as_ref()
                .and_then(|c| c.pixel_to_cm)
                .unwrap_or(DEFAULT_CALIBRATION_PIXEL_TO_CM),
        };
        let threshold = ThresholdSettings {
            block_size: file
                .threshold
                .as_ref()
                .and_then(|t| t.block_size)
                .unwrap_or(DEFAULT_BLOCK_SIZE),
            offset: file
                .threshold
                .as_ref()
                .and_then(|t| t.offset)
                .unwrap_or(DEFAULT_THRESHOLD_OFFSET),
        };
        let plate = PlateRange {
            lower: file
                .plate
                .as_ref()
                .and_then(|p| p.lower)
                .unwrap_or(DEFAULT_PLATE_LOWER),
            upper: file
                .plate
                .as_ref()
                .and_then(|p| p.upper)
                .unwrap_or(DEFAULT_PLATE_UPPER),
        };
        let foods = match file.foods {
            Some(foods) => foods
                .into_iter()
                .map(|(label, food)| {
                    let profile = FoodProfile::new(food.density, food.kcal_per_100g, food.shape)
                        .with_segmentation(food.segmentation.unwrap_or(ContourSelection::Largest));
                    (Self::normalize_label(&label), profile)
                })
                .collect(),
            None => default_foods(),
        };

        Self {
            margin_px: file.margin_px.unwrap_or(DEFAULT_MARGIN_PX),
            reference_label: Self::normalize_label(
                file.reference_label
                    .as_deref()
                    .unwrap_or(DEFAULT_REFERENCE_LABEL),
            ),
            reference_length_cm: file
                .reference_length_cm
                .unwrap_or(DEFAULT_REFERENCE_LENGTH_CM),
            reference_area_cm2: file
                .reference_area_cm2
                .unwrap_or(DEFAULT_REFERENCE_AREA_CM2),
            default_calibration,
            threshold,
            plate,
            slab_area_cm2: file.slab_area_cm2.unwrap_or(DEFAULT_SLAB_AREA_CM2),
            slab_factor: file.slab_factor.unwrap_or(DEFAULT_SLAB_FACTOR),
            foods,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(margin) = std::env::var("NUTRIVISION_MARGIN_PX") {
            self.margin_px = margin
                .parse()
                .map_err(|_| anyhow!("NUTRIVISION_MARGIN_PX must be a non-negative integer"))?;
        }
        if let Ok(label) = std::env::var("NUTRIVISION_REFERENCE_LABEL") {
            self.reference_label = Self::normalize_label(&label);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.reference_label.is_empty() {
            return Err(anyhow!("reference_label must not be empty"));
        }
        if !(self.reference_length_cm > 0.0) {
            return Err(anyhow!("reference_length_cm must be positive"));
        }
        if !(self.reference_area_cm2 > 0.0) {
            return Err(anyhow!("reference_area_cm2 must be positive"));
        }
        if !(self.default_calibration.reference_area_pixels > 0.0) {
            return Err(anyhow!(
                "default_calibration.reference_area_pixels must be positive"
            ));
        }
        if !(self.default_calibration.pixel_to_cm > 0.0) {
            return Err(anyhow!("default_calibration.pixel_to_cm must be positive"));
        }
        if self.threshold.block_size < 3 || self.threshold.block_size % 2 == 0 {
            return Err(anyhow!("threshold.block_size must be odd and at least 3"));
        }
        if !self.threshold.offset.is_finite() {
            return Err(anyhow!("threshold.offset must be finite"));
        }
        if (0..3).any(|i| self.plate.lower[i] > self.plate.upper[i]) {
            return Err(anyhow!("plate.lower must not exceed plate.upper"));
        }
        if !(self.slab_area_cm2 >= 0.0) || !(self.slab_factor >= 0.0) {
            return Err(anyhow!("slab_area_cm2 and slab_factor must be non-negative"));
        }
        for (label, food) in &self.foods {
            if !(food.density >= 0.0) || !(food.kcal_per_100g >= 0.0) {
                return Err(anyhow!(
                    "food '{}' must have non-negative density and kcal_per_100g",
                    label
                ));
            }
            if food.segmentation == ContourSelection::Reference {
                return Err(anyhow!(
                    "food '{}' cannot use the reference contour selection",
                    label
                ));
            }
        }
        if self.foods.contains_key(&self.reference_label) {
            return Err(anyhow!(
                "reference label '{}' must not also be a food",
                self.reference_label
            ));
        }
        Ok(())
    }
}

fn default_foods() -> BTreeMap<String, FoodProfile> {
    use ShapeClass::{Elongated, Round};

    [
        ("apple", FoodProfile::new(0.96, 52.0, Some(Round))),
        ("banana", FoodProfile::new(0.94, 89.0, Some(Elongated))),
        (
            "carrot",
            FoodProfile::new(0.641, 41.0, Some(Elongated))
                .with_segmentation(ContourSelection::SecondLargest),
        ),
        ("onion", FoodProfile::new(0.513, 40.0, Some(Round))),
        ("orange", FoodProfile::new(0.482, 47.0, Some(Round))),
        ("tomato", FoodProfile::new(0.481, 18.0, Some(Round))),
        ("qiwi", FoodProfile::new(0.575, 44.0, Some(Round))),
        ("pizza", FoodProfile::new(0.28, 266.0, None)),
    ]
    .into_iter()
    .map(|(label, profile)| (label.to_string(), profile))
    .collect()
}

fn read_config_file(path: &Path) -> Result<EstimatorConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config at {}", path.display()))
}
