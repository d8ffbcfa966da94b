//! Greedy score-ordered assignment of predictions to ground truths, per
//! (image, class) (§4.3).
//!
//! The per-class walk only ever needs to know, for each detection, whether
//! its best *unmatched* same-class ground truth clears the positive
//! threshold (→ TP) — everything else the error classifier needs (the
//! overall best same-class GT regardless of who holds it, the best GT of
//! any class, whether some other-class GT sits in the localization band,
//! and the best ignore-region IoMax) is a pure geometric quantity that does
//! not depend on assignment order, so it is computed once per detection
//! rather than threaded through the greedy loop.

use crate::annotations::{ClassId, Detection, GroundTruth, ImageId, ItemId};
use crate::dataset::DataSet;
use crate::geometry::{shape_io_max, shape_iou};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Everything the error classifier (§4.4) needs, for every detection and
/// ground truth across an entire evaluation.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    /// detection id -> the ground truth it was assigned to as a true positive.
    pub tp: HashMap<ItemId, ItemId>,
    /// ground truth id -> the detection that claimed it as a true positive.
    pub matched_by: HashMap<ItemId, ItemId>,
    /// detection id -> a same-class ground truth it overlaps ≥ t with, that
    /// was already claimed by a higher-scoring detection.
    pub duplicate_of: HashMap<ItemId, ItemId>,
    /// detection id -> (gt id, iou) of the best same-class, non-ignore
    /// ground truth in the same image, regardless of whether it was taken.
    pub same_class_best: HashMap<ItemId, Option<(ItemId, f32)>>,
    /// detection id -> (gt id, gt class, iou) of the best non-ignore ground
    /// truth of *any* class in the same image.
    pub global_best: HashMap<ItemId, Option<(ItemId, ClassId, f32)>>,
    /// detection id -> the best differing-class, non-ignore ground truth in
    /// the same image whose IoU falls in `[background_threshold,
    /// pos_threshold)`, if any.
    pub off_class_in_band: HashMap<ItemId, Option<(ItemId, ClassId, f32)>>,
    /// detection ids absorbed by an ignore region: removed from the error
    /// population entirely (§4.3, "Ignore handling").
    pub ignored: HashSet<ItemId>,
    /// detection ids that survived the per-image `max_dets` cap — the exact
    /// population the matcher evaluated. `errors::classify` and
    /// `ap_curve::compute` must both filter against this rather than a
    /// dataset's full, uncapped detection list, or a dropped low-score
    /// detection would be scored as background/counted as a false positive
    /// despite never having been given a chance to match anything.
    pub surviving: HashSet<ItemId>,
}

/// Picks the highest-IoU entry from `candidates`, breaking ties by the
/// lowest ground-truth id (the tie-break rule in §3 only pins detection
/// ordering; this extends the same "lowest id wins" idea to GT selection).
fn best_of<'a>(candidates: impl Iterator<Item = (&'a GroundTruth, f32)>) -> Option<(ItemId, f32)> {
    candidates.fold(None, |best, (gt, iou)| match best {
        None => Some((gt.id, iou)),
        Some((best_id, best_iou)) => {
            if iou > best_iou || (iou == best_iou && gt.id < best_id) {
                Some((gt.id, iou))
            } else {
                Some((best_id, best_iou))
            }
        }
    })
}

pub fn run(
    gt_dataset: &DataSet,
    pred_dataset: &DataSet,
    pos_threshold: f32,
    background_threshold: f32,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();

    let images: BTreeSet<ImageId> =
        gt_dataset.image_ids().into_iter().chain(pred_dataset.image_ids()).collect();

    for image_id in images {
        let dets_in_image = pred_dataset.detections_in_image(image_id);
        outcome.surviving.extend(dets_in_image.iter().map(|d| d.id));
        let gts_in_image = gt_dataset.ground_truths_in_image(image_id);
        let non_ignore_gts: Vec<&GroundTruth> =
            gts_in_image.iter().copied().filter(|g| !g.ignore).collect();
        let ignore_gts: Vec<&GroundTruth> =
            gts_in_image.iter().copied().filter(|g| g.ignore).collect();

        let classes_in_image: BTreeSet<ClassId> = dets_in_image
            .iter()
            .map(|d| d.class_id)
            .chain(non_ignore_gts.iter().map(|g| g.class_id))
            .collect();

        for class_id in classes_in_image {
            let dets_of_class: Vec<&Detection> =
                dets_in_image.iter().copied().filter(|d| d.class_id == class_id).collect();
            let gts_of_class: Vec<&GroundTruth> =
                non_ignore_gts.iter().copied().filter(|g| g.class_id == class_id).collect();

            let mut taken: HashSet<ItemId> = HashSet::new();
            for det in dets_of_class {
                if gts_of_class.is_empty() {
                    outcome.same_class_best.insert(det.id, None);
                    continue;
                }

                let unmatched_best = best_of(
                    gts_of_class
                        .iter()
                        .copied()
                        .filter(|gt| !taken.contains(&gt.id))
                        .map(|gt| (gt, shape_iou(&det.geometry, &gt.geometry))),
                );

                if let Some((gt_id, iou)) = unmatched_best {
                    if iou >= pos_threshold {
                        outcome.tp.insert(det.id, gt_id);
                        outcome.matched_by.insert(gt_id, det.id);
                        outcome.same_class_best.insert(det.id, Some((gt_id, iou)));
                        taken.insert(gt_id);
                        continue;
                    }
                }

                let overall_best = best_of(
                    gts_of_class.iter().copied().map(|gt| (gt, shape_iou(&det.geometry, &gt.geometry))),
                );
                outcome.same_class_best.insert(det.id, overall_best);
                if let Some((gt_id, iou)) = overall_best {
                    if iou >= pos_threshold && taken.contains(&gt_id) {
                        outcome.duplicate_of.insert(det.id, gt_id);
                    }
                }
            }
        }

        for det in dets_in_image.iter().copied() {
            let global_best = best_of(
                non_ignore_gts.iter().copied().map(|gt| (gt, shape_iou(&det.geometry, &gt.geometry))),
            );
            outcome.global_best.insert(
                det.id,
                global_best.map(|(gt_id, iou)| {
                    let class = non_ignore_gts.iter().find(|g| g.id == gt_id).unwrap().class_id;
                    (gt_id, class, iou)
                }),
            );

            let off_class_in_band = best_of(
                non_ignore_gts
                    .iter()
                    .copied()
                    .filter(|gt| gt.class_id != det.class_id)
                    .map(|gt| (gt, shape_iou(&det.geometry, &gt.geometry)))
                    .filter(|(_, iou)| *iou >= background_threshold && *iou < pos_threshold),
            );
            outcome.off_class_in_band.insert(
                det.id,
                off_class_in_band.map(|(gt_id, iou)| {
                    let class = non_ignore_gts.iter().find(|g| g.id == gt_id).unwrap().class_id;
                    (gt_id, class, iou)
                }),
            );

            let ignore_best_io_max = ignore_gts
                .iter()
                .map(|gt| shape_io_max(&det.geometry, &gt.geometry))
                .fold(0.0_f32, f32::max);
            if ignore_best_io_max > pos_threshold && !outcome.tp.contains_key(&det.id) {
                outcome.ignored.insert(det.id);
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Shape};

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> Shape {
        Shape::Box(BoundingBox::new(x, y, w, h).unwrap())
    }

    #[test]
    fn single_tp_and_single_background() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("pred", 100);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();
        preds.add_detection(0, 1, 0.8, bbox(100.0, 100.0, 30.0, 30.0)).unwrap();

        let outcome = run(&gts, &preds, 0.5, 0.1);
        assert_eq!(outcome.tp.len(), 1);
        assert!(outcome.tp.contains_key(&0));
        assert!(!outcome.tp.contains_key(&1));
        let global_best_1 = outcome.global_best.get(&1).unwrap();
        assert!(global_best_1.unwrap().2 < 0.1);
    }

    #[test]
    fn duplicate_when_same_box_claimed_by_higher_score() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("pred", 100);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();
        preds.add_detection(0, 1, 0.8, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();

        let outcome = run(&gts, &preds, 0.5, 0.1);
        assert!(outcome.tp.contains_key(&0));
        assert_eq!(outcome.duplicate_of.get(&1), Some(&0));
    }

    #[test]
    fn ignore_region_absorbs_detection() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(0.0, 0.0, 100.0, 100.0), true).unwrap();
        let mut preds = DataSet::new("pred", 100);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 5.0, 5.0)).unwrap();

        let outcome = run(&gts, &preds, 0.5, 0.1);
        assert!(outcome.ignored.contains(&0));
        assert!(!outcome.tp.contains_key(&0));
    }

    #[test]
    fn max_dets_excludes_lowest_scoring_from_surviving() {
        let mut gts = DataSet::new("gt", 1);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("pred", 1);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();
        // Lower score, same image: dropped by max_dets = 1.
        preds.add_detection(0, 1, 0.2, bbox(100.0, 100.0, 10.0, 10.0)).unwrap();

        let outcome = run(&gts, &preds, 0.5, 0.1);
        assert!(outcome.surviving.contains(&0));
        assert!(!outcome.surviving.contains(&1));
    }
}
