//! TIDE: an error-attribution engine for object-detection evaluation.
//!
//! Consumes a set of predictions and matching ground-truth annotations,
//! computes Average Precision, and attributes the gap between observed AP
//! and a perfect score to a fixed taxonomy of error kinds — so that, for
//! each error kind, the caller can ask "what would AP be if every detection
//! of this kind had been correct instead?"
//!
//! The pipeline is leaf-first: [`geometry`] computes overlap, [`dataset`]
//! indexes detections and ground truths, [`matcher`] assigns predictions to
//! ground truths, [`errors`] classifies the result, [`ap_curve`] integrates
//! precision/recall into AP, [`fix`] recomputes AP under a counterfactual,
//! and [`report`] aggregates runs across thresholds.

pub mod annotations;
pub mod ap_curve;
pub mod dataset;
pub mod errors;
pub mod fix;
pub mod geometry;
pub mod matcher;
pub mod report;

pub use annotations::{ClassId, Detection, GroundTruth, ImageId, ItemId};
pub use ap_curve::{ApCurve, ClassAp};
pub use dataset::{DataSet, DataSetError};
pub use errors::{classify, Error, MainErrorKind, SpecialErrorKind, Subject};
pub use geometry::{BoundingBox, Geometry, Mask, Mode, Shape};
pub use report::{CocoSummary, Run, RunSummary, ThresholdSchedule, Tide};
