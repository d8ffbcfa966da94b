//! Builds the precision-recall curve and integrates AP per class and overall
//! (§4.5).

use crate::annotations::{ClassId, Detection, ItemId};
use crate::dataset::DataSet;
use crate::matcher::MatchOutcome;
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap, HashSet};

/// One class's precision-recall curve: the envelope points (after the
/// right-monotone pass) and the area under it.
#[derive(Clone, Debug)]
pub struct ClassAp {
    pub class_id: ClassId,
    pub num_ground_truth: usize,
    pub ap: f64,
    /// `(recall, precision)` pairs after the monotone-non-increasing
    /// envelope, in ascending recall order.
    pub points: Vec<(f64, f64)>,
}

/// The per-class curves plus the mean over classes that have at least one
/// non-ignore ground truth. Classes with zero non-ignore ground truths are
/// omitted, not zero-weighted (§4.5, §7, §9).
#[derive(Clone, Debug)]
pub struct ApCurve {
    pub per_class: HashMap<ClassId, ClassAp>,
    pub map: f64,
}

impl ApCurve {
    pub fn ap_for_class(&self, class_id: ClassId) -> Option<f64> {
        self.per_class.get(&class_id).map(|c| c.ap)
    }
}

/// Integrates one class's AP: cumulative TP/FP over score-descending
/// detections, a right-monotone precision envelope, then trapezoidal
/// integration against recall (§4.5).
fn class_ap(dets_sorted: &[&Detection], tp_ids: &HashSet<ItemId>, num_ground_truth: usize) -> Vec<(f64, f64)> {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut points: Vec<(f64, f64)> = Vec::with_capacity(dets_sorted.len());
    for det in dets_sorted {
        if tp_ids.contains(&det.id) {
            tp += 1;
        } else {
            fp += 1;
        }
        let precision = tp as f64 / (tp + fp) as f64;
        let recall = tp as f64 / num_ground_truth as f64;
        points.push((recall, precision));
    }

    let mut envelope = points;
    for i in (0..envelope.len().saturating_sub(1)).rev() {
        let next = envelope[i + 1].1;
        if next > envelope[i].1 {
            envelope[i].1 = next;
        }
    }
    envelope
}

fn integrate_trapezoidal(points: &[(f64, f64)]) -> f64 {
    let mut area = 0.0;
    let mut prev_recall = 0.0;
    let mut prev_precision = points.first().map(|p| p.1).unwrap_or(0.0);
    for &(recall, precision) in points {
        area += (recall - prev_recall) * (precision + prev_precision) / 2.0;
        prev_recall = recall;
        prev_precision = precision;
    }
    area
}

/// Builds the AP curve for one evaluation run (§4.5). `outcome` supplies
/// which detections are true positives and which are absorbed by an ignore
/// region (and so excluded from both TP and FP counts, §4.3).
pub fn compute(gt_dataset: &DataSet, pred_dataset: &DataSet, outcome: &MatchOutcome) -> ApCurve {
    let classes: BTreeSet<ClassId> =
        gt_dataset.class_ids().into_iter().chain(pred_dataset.class_ids()).collect();

    // Group once rather than filtering the whole detection list per class.
    // Detections dropped by the per-image max_dets cap were never given a
    // chance to match anything, so they must not enter the ranking as false
    // positives either — only the surviving, non-ignored population counts.
    let dets_by_class: HashMap<ClassId, Vec<&Detection>> = pred_dataset
        .all_detections()
        .iter()
        .filter(|d| outcome.surviving.contains(&d.id) && !outcome.ignored.contains(&d.id))
        .into_group_map_by(|d| d.class_id);

    let mut per_class = HashMap::new();
    for class_id in classes {
        let num_ground_truth = gt_dataset.non_ignore_ground_truth_count(class_id);
        if num_ground_truth == 0 {
            continue;
        }

        let mut dets: Vec<&Detection> = dets_by_class.get(&class_id).cloned().unwrap_or_default();
        dets.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.id.cmp(&b.id))
        });

        let tp_ids: HashSet<ItemId> =
            dets.iter().filter(|d| outcome.tp.contains_key(&d.id)).map(|d| d.id).collect();

        let points = class_ap(&dets, &tp_ids, num_ground_truth);
        let ap = integrate_trapezoidal(&points);
        per_class.insert(class_id, ClassAp { class_id, num_ground_truth, ap, points });
    }

    let map = if per_class.is_empty() {
        0.0
    } else {
        per_class.values().map(|c| c.ap).sum::<f64>() / per_class.len() as f64
    };

    ApCurve { per_class, map }
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
    fn perfect_single_detection_has_ap_one() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("pred", 100);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();

        let (outcome, _errors) = errors::classify(&gts, &preds, 0.5, 0.1);
        let curve = compute(&gts, &preds, &outcome);
        assert!((curve.map - 1.0).abs() < 1e-9);
    }

    #[test]
    fn class_with_no_ground_truth_is_omitted_not_zeroed() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("pred", 100);
        preds.add_class(1, "c1");
        preds.add_class(2, "c2");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();
        preds.add_detection(1, 2, 0.8, bbox(0.0, 0.0, 10.0, 10.0)).unwrap();

        let (outcome, _errors) = errors::classify(&gts, &preds, 0.5, 0.1);
        let curve = compute(&gts, &preds, &outcome);
        assert_eq!(curve.per_class.len(), 1);
        assert!(curve.per_class.contains_key(&1));
        assert!(!curve.per_class.contains_key(&2));
        assert!((curve.map - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_ground_truth_at_all_gives_zero_map_without_panicking() {
        let gts = DataSet::new("gt", 100);
        let mut preds = DataSet::new("pred", 100);
        preds.add_class(1, "c1");
        preds.add_class(2, "c2");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();
        preds.add_detection(1, 2, 0.8, bbox(100.0, 100.0, 30.0, 30.0)).unwrap();

        let (outcome, errors) = errors::classify(&gts, &preds, 0.5, 0.1);
        let curve = compute(&gts, &preds, &outcome);
        assert_eq!(curve.map, 0.0);
        assert_eq!(curve.per_class.len(), 0);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn detection_dropped_by_max_dets_does_not_depress_ap() {
        let mut gts = DataSet::new("gt", 1);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("pred", 1);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();
        // Lower score, same image: dropped by max_dets = 1. Must not be
        // counted as a false positive against this class's curve.
        preds.add_detection(0, 1, 0.1, bbox(200.0, 200.0, 10.0, 10.0)).unwrap();

        let (outcome, _errors) = errors::classify(&gts, &preds, 0.5, 0.1);
        let curve = compute(&gts, &preds, &outcome);
        assert!((curve.map - 1.0).abs() < 1e-9);
    }
}
