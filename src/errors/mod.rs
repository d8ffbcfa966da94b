//! Turns match outcomes into one of the seven error variants (§3, §4.4).
//!
//! Error variants are modelled as a tagged sum rather than as subclasses of a
//! common base (§9) — pattern matching over `MainErrorKind`/`SpecialErrorKind`
//! replaces the source's `isinstance` dispatch.

use crate::annotations::{ClassId, ItemId};
use crate::dataset::DataSet;
use crate::matcher::{self, MatchOutcome};
use std::collections::HashSet;
use std::fmt;

/// The five mutually-exclusive, detection-level error kinds (§3). Stable
/// names match verbatim what §6 requires for downstream output dictionaries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MainErrorKind {
    Classification,
    Localization,
    Both,
    Duplicate,
    Background,
    Missed,
}

impl MainErrorKind {
    /// The seven-way summary-table short name (§6).
    pub fn short_name(&self) -> &'static str {
        match self {
            MainErrorKind::Classification => "Cls",
            MainErrorKind::Localization => "Loc",
            MainErrorKind::Both => "Both",
            MainErrorKind::Duplicate => "Dupe",
            MainErrorKind::Background => "Bkg",
            MainErrorKind::Missed => "Miss",
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            MainErrorKind::Classification => "ClassificationError",
            MainErrorKind::Localization => "LocalizationError",
            MainErrorKind::Both => "BothError",
            MainErrorKind::Duplicate => "DuplicateError",
            MainErrorKind::Background => "BackgroundError",
            MainErrorKind::Missed => "MissedError",
        }
    }

    pub fn all() -> [MainErrorKind; 6] {
        [
            MainErrorKind::Classification,
            MainErrorKind::Localization,
            MainErrorKind::Both,
            MainErrorKind::Duplicate,
            MainErrorKind::Background,
            MainErrorKind::Missed,
        ]
    }
}

impl fmt::Display for MainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variant_name())
    }
}

/// The two coarse-grained special error kinds (§3).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SpecialErrorKind {
    FalsePositive,
    FalseNegative,
}

impl SpecialErrorKind {
    pub fn short_name(&self) -> &'static str {
        match self {
            SpecialErrorKind::FalsePositive => "FalsePos",
            SpecialErrorKind::FalseNegative => "FalseNeg",
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            SpecialErrorKind::FalsePositive => "FalsePositiveError",
            SpecialErrorKind::FalseNegative => "FalseNegativeError",
        }
    }
}

impl fmt::Display for SpecialErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variant_name())
    }
}

/// What a main error's detection-side variants attach to versus what
/// `MissedError` attaches to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Subject {
    Detection(ItemId),
    GroundTruth(ItemId),
}

/// A single attributed error. `kind` is one of the five main variants;
/// `subject` is the detection or (for `Missed`) ground truth it is attached
/// to (§3).
#[derive(Clone, Copy, Debug)]
pub struct Error {
    pub kind: MainErrorKind,
    pub subject: Subject,
    pub class_id: ClassId,
}

impl Error {
    /// Which special (coarse) error kind this main error re-partitions into
    /// (§3: "Special errors... are a coarser re-partition of the same
    /// population, not additional items").
    pub fn special_kind(&self) -> SpecialErrorKind {
        match self.kind {
            MainErrorKind::Missed => SpecialErrorKind::FalseNegative,
            _ => SpecialErrorKind::FalsePositive,
        }
    }

    pub fn detection_id(&self) -> Option<ItemId> {
        match self.subject {
            Subject::Detection(id) => Some(id),
            Subject::GroundTruth(_) => None,
        }
    }

    pub fn ground_truth_id(&self) -> Option<ItemId> {
        match self.subject {
            Subject::GroundTruth(id) => Some(id),
            Subject::Detection(_) => None,
        }
    }
}

/// Runs the matcher and classifies every non-TP detection and every
/// unmatched, non-ignore ground truth into exactly one `Error` (§4.4).
///
/// Decision order per detection (first applicable wins): Duplicate →
/// Classification → Both → Localization → Background. This resolves the
/// open question in §9: when a detection sits in the IoU band against both a
/// same-class and a differing-class ground truth, BothError wins over
/// LocalizationError regardless of which of the two has the higher IoU.
pub fn classify(
    gt_dataset: &DataSet,
    pred_dataset: &DataSet,
    pos_threshold: f32,
    background_threshold: f32,
) -> (MatchOutcome, Vec<Error>) {
    let outcome = matcher::run(gt_dataset, pred_dataset, pos_threshold, background_threshold);
    let mut errors = Vec::new();
    let mut named_gts: HashSet<ItemId> = HashSet::new();

    for det in pred_dataset.all_detections() {
        if !outcome.surviving.contains(&det.id) {
            // Dropped by the per-image max_dets cap before the matcher ever
            // considered it: no global_best/same_class_best/off_class_in_band
            // entries exist for it, so it must not be classified at all.
            continue;
        }
        if outcome.tp.contains_key(&det.id) || outcome.ignored.contains(&det.id) {
            continue;
        }

        if let Some(&gt_id) = outcome.duplicate_of.get(&det.id) {
            errors.push(Error { kind: MainErrorKind::Duplicate, subject: Subject::Detection(det.id), class_id: det.class_id });
            let _ = gt_id; // already matched elsewhere; does not need to be "named" (§4.4)
            continue;
        }

        let global_best = outcome.global_best.get(&det.id).copied().flatten();
        let same_class_best = outcome.same_class_best.get(&det.id).copied().flatten();
        let off_class_in_band = outcome.off_class_in_band.get(&det.id).copied().flatten();

        if let Some((gt_id, gt_class, iou)) = global_best {
            if iou >= pos_threshold && gt_class != det.class_id {
                errors.push(Error { kind: MainErrorKind::Classification, subject: Subject::Detection(det.id), class_id: det.class_id });
                named_gts.insert(gt_id);
                continue;
            }
        }

        if let Some((gt_id, _, _)) = off_class_in_band {
            errors.push(Error { kind: MainErrorKind::Both, subject: Subject::Detection(det.id), class_id: det.class_id });
            named_gts.insert(gt_id);
            continue;
        }

        if let Some((gt_id, iou)) = same_class_best {
            if iou >= background_threshold && iou < pos_threshold {
                errors.push(Error { kind: MainErrorKind::Localization, subject: Subject::Detection(det.id), class_id: det.class_id });
                named_gts.insert(gt_id);
                continue;
            }
        }

        errors.push(Error { kind: MainErrorKind::Background, subject: Subject::Detection(det.id), class_id: det.class_id });
    }

    for gt in gt_dataset.all_ground_truths() {
        if gt.ignore {
            continue;
        }
        if outcome.matched_by.contains_key(&gt.id) {
            continue;
        }
        if named_gts.contains(&gt.id) {
            continue;
        }
        errors.push(Error { kind: MainErrorKind::Missed, subject: Subject::GroundTruth(gt.id), class_id: gt.class_id });
    }

    (outcome, errors)
}
