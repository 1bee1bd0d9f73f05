use super::contour::Contour;
use crate::config::{PlateRange, ThresholdSettings};
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::filter::gaussian_blur_f32;
use imageproc::point::Point;

const FOREGROUND: Luma<u8> = Luma([255]);

/// Image operations shared by both segmentation passes
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    threshold: ThresholdSettings,
    plate: PlateRange,
}

impl Preprocessor {
    pub fn new(threshold: ThresholdSettings, plate: PlateRange) -> Self {
        Self { threshold, plate }
    }

    /// Grayscale conversion followed by Gaussian-weighted adaptive thresholding
    ///
    /// A pixel is foreground when it is brighter than its local weighted mean
    /// minus the configured offset, so uneven lighting across the crop does
    /// not shift the cut.
    pub fn binarize(&self, image: &RgbImage) -> GrayImage {
        let _span = tracing::debug_span!("binarize").entered();

        let gray = imageops::grayscale(image);
        if gray.width() == 0 || gray.height() == 0 {
            return gray;
        }

        let local_mean = gaussian_blur_f32(&gray, self.threshold.sigma());
        let offset = self.threshold.offset;

        GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let value = f64::from(gray.get_pixel(x, y)[0]);
            let mean = f64::from(local_mean.get_pixel(x, y)[0]);
            if value > mean - offset {
                FOREGROUND
            } else {
                Luma([0])
            }
        })
    }

    /// Black out everything outside `contour`
    pub fn isolate(&self, image: &RgbImage, contour: &Contour) -> RgbImage {
        let (width, height) = image.dimensions();
        let mask = fill_contour(width, height, contour);
        apply_mask(image, &mask)
    }

    /// Black out pixels whose HSV value falls inside the plate range
    pub fn suppress_plate(&self, image: &RgbImage) -> RgbImage {
        let _span = tracing::debug_span!("suppress_plate").entered();

        let mut output = image.clone();
        for pixel in output.pixels_mut() {
            if self.plate.contains(rgb_to_hsv(pixel[0], pixel[1], pixel[2])) {
                *pixel = Rgb([0, 0, 0]);
            }
        }
        output
    }
}

/// Binary mask with the contour and its interior set to 255
pub fn fill_contour(width: u32, height: u32, contour: &Contour) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    let mut polygon: Vec<Point<i32>> = contour.points.clone();
    polygon.dedup();
    if polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() >= 3 {
        draw_polygon_mut(&mut mask, &polygon, FOREGROUND);
    }

    // The border itself always belongs to the object
    for point in &contour.points {
        if point.x >= 0 && point.y >= 0 && (point.x as u32) < width && (point.y as u32) < height {
            mask.put_pixel(point.x as u32, point.y as u32, FOREGROUND);
        }
    }

    mask
}

/// Keep pixels where `mask` is non-zero, black elsewhere
pub fn apply_mask(image: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            *image.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Convert RGB to HSV with H in 0..=180 and S, V in 0..=255
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    [
        (h / 2.0).round().clamp(0.0, 180.0) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v.clamp(0.0, 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EstimatorConfig;

    fn preprocessor() -> Preprocessor {
        let cfg = EstimatorConfig::default();
        Preprocessor::new(cfg.threshold, cfg.plate)
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 0), [0, 0, 0]);
        assert_eq!(rgb_to_hsv(128, 128, 128), [0, 0, 128]);
    }

    #[test]
    fn uniform_image_is_all_foreground() {
        let image = RgbImage::from_pixel(30, 30, Rgb([90, 90, 90]));
        let binary = preprocessor().binarize(&image);
        assert!(binary.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn dark_edge_falls_below_local_mean() {
        let image = RgbImage::from_fn(40, 40, |x, _| {
            if x < 20 {
                Rgb([20, 20, 20])
            } else {
                Rgb([230, 230, 230])
            }
        });
        let binary = preprocessor().binarize(&image);
        // Dark side of the edge is background, bright side foreground
        assert_eq!(binary.get_pixel(19, 20)[0], 0);
        assert_eq!(binary.get_pixel(20, 20)[0], 255);
        assert_eq!(binary.get_pixel(2, 20)[0], 255);
    }

    #[test]
    fn plate_pixels_are_removed() {
        let image = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([200, 200, 200])
            } else {
                Rgb([200, 30, 30])
            }
        });
        let output = preprocessor().suppress_plate(&image);
        assert_eq!(output.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(output.get_pixel(1, 0), &Rgb([200, 30, 30]));
    }

    #[test]
    fn fill_covers_interior_and_border() {
        let mask = fill_contour(12, 12, &Contour::rectangle(8, 8));
        assert_eq!(mask.get_pixel(4, 4)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(8, 8)[0], 255);
        assert_eq!(mask.get_pixel(10, 10)[0], 0);
    }

    #[test]
    fn isolate_blacks_out_outside() {
        let image = RgbImage::from_pixel(10, 10, Rgb([50, 60, 70]));
        let isolated = preprocessor().isolate(&image, &Contour::rectangle(3, 3));
        assert_eq!(isolated.get_pixel(1, 1), &Rgb([50, 60, 70]));
        assert_eq!(isolated.get_pixel(7, 7), &Rgb([0, 0, 0]));
    }

    #[test]
    fn empty_image_binarizes_to_empty() {
        let binary = preprocessor().binarize(&RgbImage::new(0, 0));
        assert_eq!(binary.dimensions(), (0, 0));
    }
}
