//! Pairwise overlap computation for boxes and masks.
//!
//! Every geometry kind used by the rest of the crate implements [`Geometry`],
//! which exposes only what the overlap formulas below need: an area and an
//! intersection area against another geometry of the same kind. `iou` and
//! `io_max` are written once, generically, rather than once per geometry
//! kind — the same split the teacher draws with `BoundingBoxGeometry`, here
//! extended to a second concrete shape (`Mask`).

mod bounding_box;
mod mask;

pub use bounding_box::BoundingBox;
pub use mask::Mask;

/// A geometry that can be overlapped against another of the same concrete type.
///
/// Degenerate (zero-area) geometries are expected to be rejected well before
/// they reach this trait — `DataSet` validates `w, h > 0` at ingest — so
/// `iou`/`io_max` only need to guard against a zero-area *union*, which
/// happens when both operands are degenerate.
pub trait Geometry {
    /// The geometry's own area, in whatever unit its coordinates are in.
    fn area(&self) -> f64;

    /// The area of the intersection of `self` and `other`.
    fn intersection_area(&self, other: &Self) -> f64;
}

/// Intersection-over-union. Returns 0.0 for a zero-area union instead of NaN.
pub fn iou<G: Geometry>(a: &G, b: &G) -> f32 {
    let intersection = a.intersection_area(b);
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 { 0.0 } else { (intersection / union) as f32 }
}

/// Intersection over `a`'s own area: what fraction of `a` falls inside `b`.
/// Used only for ignore-region absorption, always called as `io_max(detection,
/// ignore_region)`: a detection mostly contained within an ignore region
/// should be absorbed by it even though its IoU against that region is low.
/// Deliberately asymmetric rather than dividing by whichever operand is
/// smaller — an ignore region wholly enclosed by a much larger detection
/// should not make that detection look fully absorbed; only a detection
/// mostly *inside* the ignore region should.
pub fn io_max<G: Geometry>(a: &G, b: &G) -> f32 {
    let area_a = a.area();
    if area_a <= 0.0 { 0.0 } else { (a.intersection_area(b) / area_a) as f32 }
}

/// The geometry mode a `DataSet` is locked to, chosen by whichever shape its
/// first item is added with (§4.2, §7: "mixed geometry modes in one DataSet"
/// is a validation failure).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Mode {
    Box,
    Mask,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Box => write!(f, "box"),
            Mode::Mask => write!(f, "mask"),
        }
    }
}

/// Either of the two geometry kinds a `DataSet` can hold, tagged by which one
/// it is so a dataset can refuse to mix them (§7).
#[derive(Clone, Debug)]
pub enum Shape {
    Box(BoundingBox),
    Mask(Mask),
}

impl Shape {
    pub fn mode(&self) -> Mode {
        match self {
            Shape::Box(_) => Mode::Box,
            Shape::Mask(_) => Mode::Mask,
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            Shape::Box(b) => b.area(),
            Shape::Mask(m) => m.area(),
        }
    }
}

/// Overlap between two shapes of the same mode. Shapes of differing modes
/// never occur within a single `DataSet` (enforced at ingest) and evaluation
/// always pairs detections against ground truths of the same mode, so a
/// mode mismatch here indicates a programmer error upstream rather than a
/// value this function should paper over with a default.
pub fn shape_iou(a: &Shape, b: &Shape) -> f32 {
    match (a, b) {
        (Shape::Box(a), Shape::Box(b)) => iou(a, b),
        (Shape::Mask(a), Shape::Mask(b)) => iou(a, b),
        _ => unreachable!("Shape pairs are only ever compared within one evaluation mode"),
    }
}

pub fn shape_io_max(a: &Shape, b: &Shape) -> f32 {
    match (a, b) {
        (Shape::Box(a), Shape::Box(b)) => io_max(a, b),
        (Shape::Mask(a), Shape::Mask(b)) => io_max(a, b),
        _ => unreachable!("Shape pairs are only ever compared within one evaluation mode"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BoundingBox::new(10.0, 10.0, 50.0, 50.0).unwrap();
        let b = BoundingBox::new(10.0, 10.0, 50.0, 50.0).unwrap();
        assert!((iou(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = BoundingBox::new(100.0, 100.0, 10.0, 10.0).unwrap();
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn io_max_absorbs_small_box_fully_inside_large_ignore_region() {
        let small = BoundingBox::new(10.0, 10.0, 5.0, 5.0).unwrap();
        let ignore = BoundingBox::new(0.0, 0.0, 100.0, 100.0).unwrap();
        // small is entirely inside ignore: IoMax should be 1.0 even though IoU is tiny.
        assert!((io_max(&small, &ignore) - 1.0).abs() < 1e-6);
        assert!(iou(&small, &ignore) < 0.01);
    }

    #[test]
    fn io_max_does_not_absorb_large_detection_enclosing_tiny_ignore_region() {
        let huge = BoundingBox::new(0.0, 0.0, 100.0, 100.0).unwrap();
        let tiny_ignore = BoundingBox::new(10.0, 10.0, 5.0, 5.0).unwrap();
        // tiny_ignore sits entirely inside huge, but huge is mostly not ignore
        // region, so it must not be reported as fully absorbed.
        let ratio = io_max(&huge, &tiny_ignore);
        assert!(ratio < 0.01, "expected a small fraction, got {ratio}");
    }
}
