use nalgebra::{Point2, Vector2};
use serde::Serialize;

/// Axis-aligned integer rectangle used for selections and search windows.
///
/// Supports two formats:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y (exclusive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: i32,
    /// Top-left y coordinate
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format. The bottom-right corner is exclusive.
    #[inline]
    pub fn from_tlbr(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// The box spanned by two corner points, in any order.
    #[inline]
    pub fn spanning(a: (i32, i32), b: (i32, i32)) -> Self {
        Self::from_tlbr(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1))
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [i32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [i32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Integer center point (rounded towards the top-left).
    #[inline]
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Area in pixels. Negative extents count as empty.
    #[inline]
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Intersection of two rectangles. Disjoint rectangles give an empty
    /// default rectangle.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            Rect::default()
        } else {
            Rect::from_tlbr(x1, y1, x2, y2)
        }
    }

    /// Clip to the bounds of a `width` x `height` frame.
    #[inline]
    pub fn clip_to(&self, width: u32, height: u32) -> Rect {
        self.intersect(&Rect::new(0, 0, width as i32, height as i32))
    }
}

/// Rectangle rotated by an arbitrary angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RotatedRect {
    pub center: Point2<f64>,
    /// Extent along the rotated x axis.
    pub width: f64,
    /// Extent along the rotated y axis.
    pub height: f64,
    /// Rotation of the width axis from the image x axis, in radians.
    pub angle: f64,
}

impl RotatedRect {
    pub fn new(center: Point2<f64>, width: f64, height: f64, angle: f64) -> Self {
        Self {
            center,
            width,
            height,
            angle,
        }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// The four corners in cyclic order, so that corner `i` and corner
    /// `(i + 1) % 4` share an edge.
    pub fn corners(&self) -> [Point2<f64>; 4] {
        let (sin, cos) = self.angle.sin_cos();
        let half_w = Vector2::new(cos, sin) * (self.width * 0.5);
        let half_h = Vector2::new(-sin, cos) * (self.height * 0.5);

        [
            self.center - half_w + half_h,
            self.center - half_w - half_h,
            self.center + half_w - half_h,
            self.center + half_w + half_h,
        ]
    }

    /// Edge lengths in corner order: edge `i` joins corner `i` and corner
    /// `(i + 1) % 4`.
    pub fn edge_lengths(&self) -> [f64; 4] {
        let corners = self.corners();
        std::array::from_fn(|i| (corners[(i + 1) % 4] - corners[i]).norm())
    }
}
