use crate::geometry::Geometry;
use std::fmt;

/// An axis-aligned bounding box, stored as `[x, y, w, h]` with `x, y` the
/// top-left corner. This project uses the standard convention of the left
/// side of the image being `x = 0` and the top of the image being `y = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl BoundingBox {
    /// Checks that a box has positive width and height before constructing it.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Result<Self, String> {
        if w <= 0.0 {
            Err(format!("Failed to create BoundingBox, width must be > 0 (got {}).", w))
        } else if h <= 0.0 {
            Err(format!("Failed to create BoundingBox, height must be > 0 (got {}).", h))
        } else {
            Ok(BoundingBox { x, y, w, h })
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn w(&self) -> f32 {
        self.w
    }

    pub fn h(&self) -> f32 {
        self.h
    }

    fn left(&self) -> f32 {
        self.x
    }

    fn top(&self) -> f32 {
        self.y
    }

    fn right(&self) -> f32 {
        self.x + self.w
    }

    fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundingBox {{ x: {}, y: {}, w: {}, h: {} }}", self.x, self.y, self.w, self.h)
    }
}

impl Geometry for BoundingBox {
    fn area(&self) -> f64 {
        (self.w as f64) * (self.h as f64)
    }

    fn intersection_area(&self, other: &Self) -> f64 {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let width = (right - left).max(0.0);
        let height = (bottom - top).max(0.0);
        (width as f64) * (height as f64)
    }
}
