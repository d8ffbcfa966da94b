//! The shared data model that the rest of the crate operates on: detections,
//! ground truths, and the stable ids that tie them to images and classes.

mod detection;
mod ground_truth;

pub use detection::Detection;
pub use ground_truth::GroundTruth;

/// A detection or ground truth's stable id, assigned at ingest in insertion
/// order (§4.2). Detection ids and ground truth ids are drawn from separate
/// sequences — a `Detection` with id `3` and a `GroundTruth` with id `3` are
/// unrelated.
pub type ItemId = u32;

/// The image an annotation belongs to.
pub type ImageId = u32;

/// The class an annotation belongs to.
pub type ClassId = u32;
