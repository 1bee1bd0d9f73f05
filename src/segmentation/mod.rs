mod contour;
mod preprocess;
mod two_pass;
pub mod types;

pub use contour::{extract_contours, sort_by_area, Contour};
pub use preprocess::{fill_contour, rgb_to_hsv, Preprocessor};
pub use two_pass::TwoPassSegmenter;
pub use types::{ContourSelection, SegmentationResult, Segmenter};

use crate::config::EstimatorConfig;

/// Create the default segmenter (two-pass adaptive threshold)
pub fn create_default_segmenter(config: &EstimatorConfig) -> Box<dyn Segmenter> {
    Box::new(TwoPassSegmenter::from_config(config))
}
