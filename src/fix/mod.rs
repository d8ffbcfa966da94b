//! Counterfactual AP recomputation: "what would AP be if every detection
//! tagged with this error kind were fixed?" (§4.6).
//!
//! `fix_main_error` is a free function dispatched on the variant tag rather
//! than a method on `Error` (§9) — there is one fix rule per main error kind,
//! plus the missed-ground-truth rule, and neither needs anything attached to
//! the data itself.

use crate::annotations::{Detection, ItemId};
use crate::ap_curve;
use crate::dataset::DataSet;
use crate::errors::{Error, MainErrorKind, SpecialErrorKind};
use crate::matcher;
use std::collections::HashSet;

fn recompute_map(gt_dataset: &DataSet, pred_dataset: &DataSet, pos_threshold: f32, background_threshold: f32) -> f64 {
    let outcome = matcher::run(gt_dataset, pred_dataset, pos_threshold, background_threshold);
    ap_curve::compute(gt_dataset, pred_dataset, &outcome).map
}

fn min_tp_score(pred_dataset: &DataSet, tp_ids: &HashSet<ItemId>) -> f32 {
    pred_dataset
        .all_detections()
        .iter()
        .filter(|d| tp_ids.contains(&d.id))
        .map(|d| d.score)
        .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.min(s))))
        .unwrap_or(0.0)
}

/// Rewrites every targeted detection's score strictly below `floor`,
/// preserving every other detection's score and the ordering among them
/// (§4.6: "effectively removing it from the ranked list").
fn rewrite_below(pred_dataset: &DataSet, target_ids: &HashSet<ItemId>, floor: f32) -> DataSet {
    let rewritten: Vec<Detection> = pred_dataset
        .all_detections()
        .iter()
        .map(|d| {
            if target_ids.contains(&d.id) {
                Detection { score: floor - 1.0, ..d.clone() }
            } else {
                d.clone()
            }
        })
        .collect();
    pred_dataset.with_detections(rewritten)
}

/// Injects one synthetic, perfectly-matching detection per targeted ground
/// truth, scored `1 + ε` so it always ranks above every real detection
/// (§4.6: "Missed fix").
fn inject_perfect_detections(gt_dataset: &DataSet, pred_dataset: &DataSet, gt_ids: &[ItemId]) -> DataSet {
    let mut detections = pred_dataset.all_detections().to_vec();
    let mut next_id = detections.iter().map(|d| d.id).max().map_or(0, |max| max + 1);
    for gt_id in gt_ids {
        let gt = gt_dataset
            .all_ground_truths()
            .iter()
            .find(|g| g.id == *gt_id)
            .expect("a MissedError names a ground truth that exists in this run's gt_dataset");
        detections.push(Detection {
            id: next_id,
            image_id: gt.image_id,
            class_id: gt.class_id,
            score: 1.0 + f32::EPSILON,
            geometry: gt.geometry.clone(),
        });
        next_id += 1;
    }
    pred_dataset.with_detections(detections)
}

/// ΔAP from fixing every detection (or ground truth, for `Missed`) tagged
/// with `kind`, relative to `base_map` (normally the run's own `ap_curve`
/// mAP). Returns `0.0` without recomputing anything if no error of this kind
/// occurred (§8: "Monotone fix" — a kind with nothing to fix never makes AP
/// worse).
pub fn fix_main_error(
    kind: MainErrorKind,
    gt_dataset: &DataSet,
    pred_dataset: &DataSet,
    errors: &[Error],
    base_map: f64,
    pos_threshold: f32,
    background_threshold: f32,
) -> f64 {
    if kind == MainErrorKind::Missed {
        let gt_ids: Vec<ItemId> = errors.iter().filter(|e| e.kind == kind).filter_map(|e| e.ground_truth_id()).collect();
        if gt_ids.is_empty() {
            return 0.0;
        }
        let fixed = inject_perfect_detections(gt_dataset, pred_dataset, &gt_ids);
        return recompute_map(gt_dataset, &fixed, pos_threshold, background_threshold) - base_map;
    }

    let target_ids: HashSet<ItemId> =
        errors.iter().filter(|e| e.kind == kind).filter_map(|e| e.detection_id()).collect();
    if target_ids.is_empty() {
        return 0.0;
    }

    let outcome = matcher::run(gt_dataset, pred_dataset, pos_threshold, background_threshold);
    let tp_ids: HashSet<ItemId> = outcome.tp.keys().copied().collect();
    let floor = min_tp_score(pred_dataset, &tp_ids);
    let fixed = rewrite_below(pred_dataset, &target_ids, floor);
    recompute_map(gt_dataset, &fixed, pos_threshold, background_threshold) - base_map
}

/// ΔAP for one of the two coarse special-error kinds: `FalsePositive` folds
/// in every main error except `Missed`; `FalseNegative` is exactly `Missed`
/// (§3: "special errors... a coarser re-partition of the same population").
pub fn fix_special_error(
    kind: SpecialErrorKind,
    gt_dataset: &DataSet,
    pred_dataset: &DataSet,
    errors: &[Error],
    base_map: f64,
    pos_threshold: f32,
    background_threshold: f32,
) -> f64 {
    match kind {
        SpecialErrorKind::FalseNegative => fix_main_error(
            MainErrorKind::Missed,
            gt_dataset,
            pred_dataset,
            errors,
            base_map,
            pos_threshold,
            background_threshold,
        ),
        SpecialErrorKind::FalsePositive => {
            let target_ids: HashSet<ItemId> = errors
                .iter()
                .filter(|e| e.kind != MainErrorKind::Missed)
                .filter_map(|e| e.detection_id())
                .collect();
            if target_ids.is_empty() {
                return 0.0;
            }
            let outcome = matcher::run(gt_dataset, pred_dataset, pos_threshold, background_threshold);
            let tp_ids: HashSet<ItemId> = outcome.tp.keys().copied().collect();
            let floor = min_tp_score(pred_dataset, &tp_ids);
            let fixed = rewrite_below(pred_dataset, &target_ids, floor);
            recompute_map(gt_dataset, &fixed, pos_threshold, background_threshold) - base_map
        }
    }
}

/// `Run.fix_errors(transform)` (§6): applies an arbitrary caller-supplied
/// rewrite to the prediction set and returns the resulting mAP, for
/// counterfactuals the fixed variant set doesn't cover.
pub fn fix_with(
    gt_dataset: &DataSet,
    pred_dataset: &DataSet,
    pos_threshold: f32,
    background_threshold: f32,
    transform: impl FnOnce(Vec<Detection>) -> Vec<Detection>,
) -> f64 {
    let transformed = transform(pred_dataset.all_detections().to_vec());
    let fixed = pred_dataset.with_detections(transformed);
    recompute_map(gt_dataset, &fixed, pos_threshold, background_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors;
    use crate::geometry::{BoundingBox, Shape};

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> Shape {
        Shape::Box(BoundingBox::new(x, y, w, h).unwrap())
    }

    #[test]
    fn fixing_background_error_never_decreases_ap() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("pred", 100);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();
        preds.add_detection(0, 1, 0.8, bbox(100.0, 100.0, 30.0, 30.0)).unwrap();

        let (outcome, errs) = errors::classify(&gts, &preds, 0.5, 0.1);
        let base_map = ap_curve::compute(&gts, &preds, &outcome).map;
        let delta = fix_main_error(MainErrorKind::Background, &gts, &preds, &errs, base_map, 0.5, 0.1);
        assert!(delta >= 0.0);
    }

    #[test]
    fn fixing_missed_ground_truth_raises_ap_to_one() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        gts.add_ground_truth(1, 1, bbox(30.0, 30.0, 30.0, 30.0), false).unwrap();
        let mut preds = DataSet::new("pred", 100);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();

        let (outcome, errs) = errors::classify(&gts, &preds, 0.5, 0.1);
        let base_map = ap_curve::compute(&gts, &preds, &outcome).map;
        assert!(base_map < 1.0);
        let delta = fix_main_error(MainErrorKind::Missed, &gts, &preds, &errs, base_map, 0.5, 0.1);
        assert!((base_map + delta - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fixing_a_kind_with_no_errors_is_a_noop() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("pred", 100);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();

        let (outcome, errs) = errors::classify(&gts, &preds, 0.5, 0.1);
        let base_map = ap_curve::compute(&gts, &preds, &outcome).map;
        let delta = fix_main_error(MainErrorKind::Duplicate, &gts, &preds, &errs, base_map, 0.5, 0.1);
        assert_eq!(delta, 0.0);
    }
}
