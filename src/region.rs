use crate::detection::BoundingBox;
use image::{imageops, RgbImage};

/// Margin-padded sub-image for one detection
#[derive(Debug, Clone)]
pub struct CroppedRegion {
    pub image: RgbImage,
    /// Padded box, clamped to the source image
    pub bounds: BoundingBox,
}

impl CroppedRegion {
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

/// Crop `bbox` grown by `margin` pixels on every side
///
/// Each edge is clamped independently to the image, so the result may be
/// smaller than requested or even empty. The source image is never indexed
/// outside its bounds.
pub fn extract(image: &RgbImage, bbox: &BoundingBox, margin: u32) -> CroppedRegion {
    let (image_width, image_height) = image.dimensions();
    let margin = i64::from(margin);

    let clamp_x = |v: i64| v.clamp(0, i64::from(image_width));
    let clamp_y = |v: i64| v.clamp(0, i64::from(image_height));

    let x_min = clamp_x(i64::from(bbox.x) - margin);
    let y_min = clamp_y(i64::from(bbox.y) - margin);
    let x_max = clamp_x(i64::from(bbox.x) + i64::from(bbox.width) + margin).max(x_min);
    let y_max = clamp_y(i64::from(bbox.y) + i64::from(bbox.height) + margin).max(y_min);

    let bounds = BoundingBox::new(
        x_min as i32,
        y_min as i32,
        (x_max - x_min) as u32,
        (y_max - y_min) as u32,
    );

    let crop = imageops::crop_imm(
        image,
        x_min as u32,
        y_min as u32,
        bounds.width,
        bounds.height,
    )
    .to_image();

    tracing::trace!(
        "Cropped {}x{} at ({}, {})",
        bounds.width,
        bounds.height,
        bounds.x,
        bounds.y
    );

    CroppedRegion {
        image: crop,
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn inner_box_grows_by_margin() {
        let image = gradient(100, 80);
        let region = extract(&image, &BoundingBox::new(20, 30, 10, 12), 5);
        assert_eq!(region.image.dimensions(), (20, 22));
        assert_eq!(region.bounds, BoundingBox::new(15, 25, 20, 22));
        assert_eq!(region.image.get_pixel(0, 0), &Rgb([15, 25, 0]));
    }

    #[test]
    fn edges_clamp_independently() {
        let image = gradient(50, 40);
        let region = extract(&image, &BoundingBox::new(2, 35, 60, 10), 5);
        assert_eq!(region.bounds, BoundingBox::new(0, 30, 50, 10));
        assert_eq!(region.image.dimensions(), (50, 10));
    }

    #[test]
    fn box_outside_image_is_empty() {
        let image = gradient(50, 40);
        let region = extract(&image, &BoundingBox::new(200, -90, 10, 10), 5);
        assert!(region.is_empty());
        assert_eq!(region.bounds.x, 50);
        assert_eq!(region.bounds.y, 0);
    }

    #[test]
    fn zero_sized_box_keeps_margin() {
        let image = gradient(50, 40);
        let region = extract(&image, &BoundingBox::new(10, 10, 0, 0), 3);
        assert_eq!(region.image.dimensions(), (6, 6));
    }
}
