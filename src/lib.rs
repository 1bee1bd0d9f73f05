//! # nutrivision
//!
//! Calorie estimation for food photographed next to a thumb.
//!
//! Given an image and the detector's labelled bounding boxes, the pipeline:
//!
//! 1. Crops each detection with a small margin ([`region`])
//! 2. Segments the object silhouette in two adaptive-threshold passes,
//!    suppressing plate-coloured background in between ([`segmentation`])
//! 3. Derives a pixel-to-centimetre scale from the thumb ([`calibration`])
//! 4. Turns the silhouette area into a volume with a per-label shape model
//!    ([`volume`])
//! 5. Converts volume to mass and energy from density and caloric tables
//!    ([`nutrition`])
//!
//! Failures stay local to one detection: a crop that cannot be segmented
//! falls back to its bounding box, a missing thumb falls back to a default
//! calibration, and an item whose volume cannot be computed contributes zero.
//!
//! ```rust
//! use nutrivision::{BoundingBox, Detection, EstimatorConfig, Pipeline};
//! use image::{Rgb, RgbImage};
//!
//! let image = RgbImage::from_pixel(120, 120, Rgb([200, 200, 200]));
//! let detections = vec![Detection::new("apple", 0.8, BoundingBox::new(30, 30, 40, 40))];
//!
//! let pipeline = Pipeline::new(EstimatorConfig::default());
//! let report = pipeline.process(&image, &detections);
//! assert!(!report.reference_found);
//! assert!(report.total_energy_kcal >= 0.0);
//! ```

pub mod calibration;
pub mod config;
pub mod detection;
pub mod nutrition;
pub mod output;
pub mod pipeline;
pub mod region;
pub mod segmentation;
pub mod volume;

pub use calibration::{Calibration, ScaleCalibrator};
pub use config::EstimatorConfig;
pub use detection::{BoundingBox, Detection, DetectionSource, JsonDetections};
pub use nutrition::{NutritionEstimate, NutritionTable};
pub use pipeline::{EstimateStatus, ImageReport, ItemEstimate, Pipeline};
pub use region::CroppedRegion;
pub use segmentation::{Contour, ContourSelection, SegmentationResult, Segmenter};
pub use volume::{ShapeClass, ShapeModel, VolumeError, VolumeEstimator};
