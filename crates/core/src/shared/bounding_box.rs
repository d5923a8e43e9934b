/// Axis-aligned pixel box in `(x1, y1, x2, y2)` form, exclusive on the
/// right and bottom edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// A box is valid when it has strictly positive width and height.
    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// Integer center, rounding toward the top-left.
    pub fn center(&self) -> (i32, i32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    pub fn clamp_to(&self, width: u32, height: u32) -> BoundingBox {
        let w = width as i32;
        let h = height as i32;
        BoundingBox {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let union = self.area() as f64 + other.area() as f64 - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_center_of_pick_box() {
        assert_eq!(BoundingBox::new(10, 10, 60, 60).center(), (35, 35));
    }

    #[test]
    fn test_iou_identical() {
        let a = BoundingBox::new(10, 10, 110, 110);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // a: [0,0]-[100,100], b: [50,0]-[150,100]
        // intersection 5000, union 15000
        let a = BoundingBox::new(0, 0, 100, 100);
        let b = BoundingBox::new(50, 0, 150, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = BoundingBox::new(0, 0, 50, 50);
        let b = BoundingBox::new(50, 0, 100, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[rstest]
    #[case::zero_width(BoundingBox::new(5, 0, 5, 10), false)]
    #[case::zero_height(BoundingBox::new(0, 5, 10, 5), false)]
    #[case::inverted(BoundingBox::new(10, 10, 0, 0), false)]
    #[case::proper(BoundingBox::new(0, 0, 1, 1), true)]
    fn test_validity(#[case] bbox: BoundingBox, #[case] expected: bool) {
        assert_eq!(bbox.is_valid(), expected);
    }

    #[test]
    fn test_inverted_box_has_zero_area() {
        assert_eq!(BoundingBox::new(10, 10, 0, 0).area(), 0);
    }

    #[test]
    fn test_clamp_to_frame() {
        let clamped = BoundingBox::new(-10, 5, 700, 900).clamp_to(640, 480);
        assert_eq!(clamped, BoundingBox::new(0, 5, 640, 480));
    }
}
