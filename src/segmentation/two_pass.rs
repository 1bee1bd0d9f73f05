use super::contour::{extract_contours, sort_by_area, Contour};
use super::preprocess::Preprocessor;
use super::types::{ContourSelection, SegmentationResult, Segmenter};
use crate::calibration::pixel_to_cm_ratio;
use crate::config::EstimatorConfig;
use crate::region::CroppedRegion;

/// Adaptive-threshold segmenter with plate suppression
///
/// Pass 1 thresholds the crop and keeps only the largest contour as an
/// object mask. Plate-coloured pixels are then removed from the masked crop
/// and pass 2 thresholds the result again. The final contour is picked from
/// the pass-2 list according to the requested [`ContourSelection`].
pub struct TwoPassSegmenter {
    preprocessor: Preprocessor,
    reference_length_cm: f64,
}

impl TwoPassSegmenter {
    pub fn new(preprocessor: Preprocessor, reference_length_cm: f64) -> Self {
        Self {
            preprocessor,
            reference_length_cm,
        }
    }

    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self::new(
            Preprocessor::new(config.threshold, config.plate),
            config.reference_length_cm,
        )
    }

    fn object_mask_pass(&self, region: &CroppedRegion) -> Option<Contour> {
        let _span = tracing::debug_span!("pass_1").entered();

        let binary = self.preprocessor.binarize(&region.image);
        let contours = sort_by_area(extract_contours(&binary));
        tracing::trace!("Pass 1 found {} contour(s)", contours.len());

        contours.into_iter().last().map(|(_, contour)| contour)
    }

    fn refine_pass(&self, region: &CroppedRegion, object: &Contour) -> Vec<(f64, Contour)> {
        let _span = tracing::debug_span!("pass_2").entered();

        let isolated = self.preprocessor.isolate(&region.image, object);
        let plate_free = self.preprocessor.suppress_plate(&isolated);
        let binary = self.preprocessor.binarize(&plate_free);
        let contours = sort_by_area(extract_contours(&binary));
        tracing::trace!("Pass 2 found {} contour(s)", contours.len());

        contours
    }
}

impl Segmenter for TwoPassSegmenter {
    fn segment(
        &self,
        selection: ContourSelection,
        region: &CroppedRegion,
    ) -> Option<SegmentationResult> {
        let _span = tracing::debug_span!("two_pass_segment", ?selection).entered();

        if region.is_empty() {
            tracing::debug!("Empty crop, nothing to segment");
            return None;
        }

        let object = self.object_mask_pass(region)?;
        let mut contours = self.refine_pass(region, &object);

        let index = match selection {
            ContourSelection::SecondLargest if contours.len() > 1 => contours.len() - 2,
            _ => contours.len().checked_sub(1)?,
        };
        let (pixel_area, contour) = contours.swap_remove(index);

        let pixel_to_cm = match selection {
            ContourSelection::Reference => Some(pixel_to_cm_ratio(
                self.reference_length_cm,
                contour.min_rect_sides().0,
            )),
            _ => None,
        };

        tracing::debug!(
            "Selected contour with {} point(s), area {:.1}px",
            contour.points.len(),
            pixel_area
        );

        Some(SegmentationResult {
            contour,
            pixel_area,
            pixel_to_cm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;
    use image::{Rgb, RgbImage};

    fn segmenter() -> TwoPassSegmenter {
        TwoPassSegmenter::from_config(&EstimatorConfig::default())
    }

    fn region(image: RgbImage) -> CroppedRegion {
        let bounds = BoundingBox::new(0, 0, image.width(), image.height());
        CroppedRegion { image, bounds }
    }

    /// Red disk on a grey plate
    fn fruit_on_plate(size: u32, radius: f64) -> RgbImage {
        let c = size as f64 / 2.0;
        RgbImage::from_fn(size, size, |x, y| {
            let dx = x as f64 - c;
            let dy = y as f64 - c;
            if (dx * dx + dy * dy).sqrt() <= radius {
                Rgb([200, 30, 30])
            } else {
                Rgb([200, 200, 200])
            }
        })
    }

    #[test]
    fn empty_region_is_absent() {
        assert!(segmenter()
            .segment(ContourSelection::Largest, &region(RgbImage::new(0, 0)))
            .is_none());
    }

    #[test]
    fn segments_fruit_on_plate() {
        let image = fruit_on_plate(60, 15.0);
        let crop_area = 60.0 * 60.0;
        let result = segmenter()
            .segment(ContourSelection::Largest, &region(image))
            .unwrap();

        assert!(result.pixel_area > 0.0);
        assert!(result.pixel_area <= crop_area);
        assert!(result.contour.is_usable());
        assert_eq!(result.pixel_to_cm, None);
    }

    #[test]
    fn second_largest_is_strictly_smaller() {
        let image = fruit_on_plate(60, 15.0);
        let largest = segmenter()
            .segment(ContourSelection::Largest, &region(image.clone()))
            .unwrap();
        let second = segmenter()
            .segment(ContourSelection::SecondLargest, &region(image))
            .unwrap();

        assert!(second.pixel_area < largest.pixel_area);
        assert!(second.pixel_area > 0.0);
    }

    #[test]
    fn second_largest_falls_back_with_single_contour() {
        // Uniform non-plate crop: pass 2 sees only the crop border
        let image = RgbImage::from_pixel(30, 30, Rgb([200, 30, 30]));
        let largest = segmenter()
            .segment(ContourSelection::Largest, &region(image.clone()))
            .unwrap();
        let second = segmenter()
            .segment(ContourSelection::SecondLargest, &region(image))
            .unwrap();

        assert_eq!(largest.pixel_area, 29.0 * 29.0);
        assert_eq!(second, largest);
    }

    #[test]
    fn reference_ratio_uses_rectangle_long_side() {
        let image = fruit_on_plate(40, 10.0);
        let result = segmenter()
            .segment(ContourSelection::Reference, &region(image))
            .unwrap();

        let long_side = result.contour.min_rect_sides().0;
        let expected = 5.0 / long_side.max(1.0);
        assert_eq!(result.pixel_to_cm, Some(expected));
        assert!(long_side > 1.0);
    }

    #[test]
    fn segmentation_is_deterministic() {
        let image = fruit_on_plate(50, 12.0);
        let first = segmenter().segment(ContourSelection::Largest, &region(image.clone()));
        let second = segmenter().segment(ContourSelection::Largest, &region(image));
        assert_eq!(first, second);
    }
}
