use geo::{Coord, LineString, MinimumRotatedRect, Polygon};
use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::geometry::{contour_area, min_area_rect};
use imageproc::point::Point;

/// Closed polygon outlining a silhouette, in cropped-region pixel coordinates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle from the origin to `(width, height)`
    ///
    /// Sizes beyond `i32::MAX` saturate.
    pub fn rectangle(width: u32, height: u32) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        Self::new(vec![
            Point::new(0, 0),
            Point::new(w, 0),
            Point::new(w, h),
            Point::new(0, h),
        ])
    }

    /// At least three points are needed to enclose anything
    pub fn is_usable(&self) -> bool {
        self.points.len() >= 3
    }

    /// Enclosed area, independent of winding
    pub fn area(&self) -> f64 {
        contour_area(&self.points)
    }

    /// Side lengths `(long, short)` of the minimal-area enclosing rectangle
    pub fn min_rect_sides(&self) -> (f64, f64) {
        if self.points.is_empty() {
            return (0.0, 0.0);
        }
        if self.area() == 0.0 {
            // Collinear hull: imageproc returns the two extremes, exact in integers
            let rect = min_area_rect(&self.points);
            let (a, b) = (distance(rect[0], rect[1]), distance(rect[1], rect[2]));
            return (a.max(b), a.min(b));
        }

        let exterior: LineString<f64> = self
            .points
            .iter()
            .map(|p| Coord {
                x: f64::from(p.x),
                y: f64::from(p.y),
            })
            .collect();
        let Some(rect) = Polygon::new(exterior, Vec::new()).minimum_rotated_rect() else {
            return (0.0, 0.0);
        };

        let corners = &rect.exterior().0;
        if corners.len() < 3 {
            return (0.0, 0.0);
        }
        let side = |p: Coord<f64>, q: Coord<f64>| (q.x - p.x).hypot(q.y - p.y);
        let (a, b) = (side(corners[0], corners[1]), side(corners[1], corners[2]));
        (a.max(b), a.min(b))
    }

    /// Long side of the minimal-area rectangle, never below one pixel
    pub fn long_side(&self) -> f64 {
        self.min_rect_sides().0.max(1.0)
    }
}

fn distance(p: Point<i32>, q: Point<i32>) -> f64 {
    let dx = f64::from(p.x) - f64::from(q.x);
    let dy = f64::from(p.y) - f64::from(q.y);
    dx.hypot(dy)
}

/// Every border (outer and hole) in a binary image, without hierarchy
pub fn extract_contours(binary: &GrayImage) -> Vec<Contour> {
    if binary.width() == 0 || binary.height() == 0 {
        return Vec::new();
    }
    find_contours::<i32>(binary)
        .into_iter()
        .map(|contour| Contour::new(contour.points))
        .collect()
}

/// Contours paired with their area, sorted ascending by area
pub fn sort_by_area(contours: Vec<Contour>) -> Vec<(f64, Contour)> {
    let mut with_area: Vec<(f64, Contour)> = contours
        .into_iter()
        .map(|contour| (contour.area(), contour))
        .collect();
    with_area.sort_by(|a, b| a.0.total_cmp(&b.0));
    with_area
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn area_of_triangle() {
        let triangle = Contour::new(vec![Point::new(0, 0), Point::new(4, 0), Point::new(2, 3)]);
        assert!((triangle.area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn area_ignores_winding() {
        let cw = Contour::new(vec![
            Point::new(0, 0),
            Point::new(0, 5),
            Point::new(5, 5),
            Point::new(5, 0),
        ]);
        assert_eq!(cw.area(), 25.0);
    }

    #[test]
    fn degenerate_contours_have_zero_area() {
        assert_eq!(Contour::default().area(), 0.0);
        let line = Contour::new(vec![Point::new(0, 0), Point::new(3, 4), Point::new(6, 8)]);
        assert_eq!(line.area(), 0.0);
        assert_eq!(line.min_rect_sides(), (10.0, 0.0));
    }

    #[test]
    fn long_side_is_at_least_one_pixel() {
        let single = Contour::new(vec![Point::new(2, 2)]);
        assert_eq!(single.long_side(), 1.0);
        assert_eq!(Contour::default().long_side(), 1.0);
    }

    #[test]
    fn rectangle_sides() {
        let rect = Contour::rectangle(40, 10);
        let (long, short) = rect.min_rect_sides();
        assert!((long - 40.0).abs() < 1e-9);
        assert!((short - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rotated_rectangle_sides_are_exact() {
        let rect = Contour::new(vec![
            Point::new(0, 30),
            Point::new(30, 0),
            Point::new(40, 10),
            Point::new(10, 40),
        ]);
        let (long, short) = rect.min_rect_sides();
        assert!((long - 30.0 * std::f64::consts::SQRT_2).abs() < 1e-6);
        assert!((short - 10.0 * std::f64::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn rotated_square_sides_are_equal() {
        let square = Contour::new(vec![
            Point::new(0, 20),
            Point::new(20, 0),
            Point::new(40, 20),
            Point::new(20, 40),
        ]);
        let (long, short) = square.min_rect_sides();
        assert!((long - 20.0 * std::f64::consts::SQRT_2).abs() < 1e-6);
        assert!((short - 20.0 * std::f64::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn rectangle_saturates_huge_sizes() {
        let rect = Contour::rectangle(u32::MAX, 7);
        assert!(rect.points.iter().all(|p| p.x >= 0 && p.y >= 0));
        assert_eq!(rect.points[2], Point::new(i32::MAX, 7));
    }

    #[test]
    fn finds_filled_square_border() {
        let binary = GrayImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let contours = extract_contours(&binary);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].area(), 81.0);
    }

    #[test]
    fn sorts_ascending() {
        let sorted = sort_by_area(vec![
            Contour::rectangle(10, 10),
            Contour::rectangle(2, 2),
            Contour::rectangle(5, 5),
        ]);
        let areas: Vec<f64> = sorted.iter().map(|(area, _)| *area).collect();
        assert_eq!(areas, vec![4.0, 25.0, 100.0]);
    }
}
