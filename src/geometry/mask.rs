use crate::geometry::Geometry;
use std::collections::HashSet;
use std::fmt;

/// A binary mask, represented as the set of covered pixel coordinates rather
/// than a dense bitmap. Rasterisation from polygons/RLE is an external
/// collaborator's job (§1, out of scope); this is deliberately the smallest
/// representation that lets `iou`/`io_max` exercise real pixel counts.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    pixels: HashSet<(u32, u32)>,
}

impl Mask {
    /// Builds a mask from an explicit set of covered pixels. `width`/`height`
    /// bound the coordinate space but are not otherwise checked against
    /// `pixels` — a mask with zero covered pixels is valid (area 0).
    pub fn new(width: u32, height: u32, pixels: HashSet<(u32, u32)>) -> Self {
        Mask { width, height, pixels }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Mask {{ width: {}, height: {}, pixels: {} }}",
            self.width,
            self.height,
            self.pixels.len()
        )
    }
}

impl Geometry for Mask {
    fn area(&self) -> f64 {
        self.pixels.len() as f64
    }

    fn intersection_area(&self, other: &Self) -> f64 {
        self.pixels.intersection(&other.pixels).count() as f64
    }
}
