//! Aggregates per-threshold, per-mode evaluation results; exposes the
//! main-error and special-error ΔAP tables (§4.7).
//!
//! `Tide` is the owned, per-evaluator registry the source keeps as
//! process-wide mutable state on its evaluator object (§9: "Global evaluator
//! state"); here it is a plain `HashMap<String, Vec<Run>>` field on a value
//! the caller owns, populated by repeated `Tide::evaluate` calls.

use crate::annotations::Detection;
use crate::ap_curve::{self, ApCurve};
use crate::dataset::DataSet;
use crate::errors::{self, Error, MainErrorKind, SpecialErrorKind};
use crate::fix;
use crate::geometry::Mode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One `evaluate()` call's outcome: the two datasets it ran over, the
/// thresholds, the attributed errors, and the AP curve (§3: "Run"). Immutable
/// — `fix_main_errors`/`fix_special_errors`/`fix_errors` all derive
/// counterfactual AP values without mutating anything on `self`.
pub struct Run<'a> {
    pub gt_dataset: &'a DataSet,
    pub pred_dataset: &'a DataSet,
    pub pos_threshold: f32,
    pub background_threshold: f32,
    pub mode: Option<Mode>,
    pub errors: Vec<Error>,
    pub ap_curve: ApCurve,
}

impl<'a> Run<'a> {
    pub fn evaluate(
        gt_dataset: &'a DataSet,
        pred_dataset: &'a DataSet,
        pos_threshold: f32,
        background_threshold: f32,
    ) -> Run<'a> {
        let (outcome, errors) = errors::classify(gt_dataset, pred_dataset, pos_threshold, background_threshold);
        let ap_curve = ap_curve::compute(gt_dataset, pred_dataset, &outcome);
        Run {
            gt_dataset,
            pred_dataset,
            pos_threshold,
            background_threshold,
            mode: gt_dataset.mode().or_else(|| pred_dataset.mode()),
            errors,
            ap_curve,
        }
    }

    pub fn ap(&self) -> f64 {
        self.ap_curve.map
    }

    /// `Run.fix_main_errors()` (§6): ΔAP for every main error kind,
    /// including `Missed` (the one GT-attached main kind).
    pub fn fix_main_errors(&self) -> HashMap<MainErrorKind, f64> {
        MainErrorKind::all()
            .into_iter()
            .map(|kind| {
                let delta = fix::fix_main_error(
                    kind,
                    self.gt_dataset,
                    self.pred_dataset,
                    &self.errors,
                    self.ap(),
                    self.pos_threshold,
                    self.background_threshold,
                );
                (kind, delta)
            })
            .collect()
    }

    /// `Run.fix_special_errors()` (§6).
    pub fn fix_special_errors(&self) -> HashMap<SpecialErrorKind, f64> {
        [SpecialErrorKind::FalsePositive, SpecialErrorKind::FalseNegative]
            .into_iter()
            .map(|kind| {
                let delta = fix::fix_special_error(
                    kind,
                    self.gt_dataset,
                    self.pred_dataset,
                    &self.errors,
                    self.ap(),
                    self.pos_threshold,
                    self.background_threshold,
                );
                (kind, delta)
            })
            .collect()
    }

    /// `Run.fix_errors(transform)` (§6): the mAP of the prediction set after
    /// an arbitrary caller-supplied rewrite, for counterfactuals none of the
    /// named variants cover.
    pub fn fix_errors(&self, transform: impl FnOnce(Vec<Detection>) -> Vec<Detection>) -> f64 {
        fix::fix_with(self.gt_dataset, self.pred_dataset, self.pos_threshold, self.background_threshold, transform)
    }
}

/// The default COCO-style threshold schedule (§4.7): `pos_threshold` swept
/// `0.50..=0.95` in steps of `0.05`, `background_threshold` fixed at `0.1`.
/// Plain `serde`-round-trippable config, the same shape the teacher uses for
/// its own parameter structs (`CpdParameters`, `BoundingBoxModelParameters`)
/// — no file or environment loading is implemented here (out of scope, §1);
/// callers construct or deserialize one themselves.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThresholdSchedule {
    pub pos_thresholds: Vec<f32>,
    pub background_threshold: f32,
}

impl Default for ThresholdSchedule {
    fn default() -> Self {
        ThresholdSchedule {
            pos_thresholds: (50..=95).step_by(5).map(|hundredths| hundredths as f32 / 100.0).collect(),
            background_threshold: 0.1,
        }
    }
}

/// A single dataset's fix tables, un-averaged — what `Tide::summarize`
/// reports for the most recently evaluated `Run` of that name (§4.7).
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub dataset_name: String,
    pub ap: f64,
    pub main_errors: HashMap<MainErrorKind, f64>,
    pub special_errors: HashMap<SpecialErrorKind, f64>,
}

/// The COCO-style summary (§4.7): AP and every fix ΔAP averaged over a
/// `ThresholdSchedule`, keyed by the stable variant names (§6) rather than
/// the enum itself so the struct can derive `Serialize` directly.
#[derive(Clone, Debug, Serialize)]
pub struct CocoSummary {
    pub dataset_name: String,
    pub ap: f64,
    pub main_errors: HashMap<String, f64>,
    pub special_errors: HashMap<String, f64>,
}

/// The owned per-evaluator registry (§9): every `Run` produced so far,
/// grouped by the prediction `DataSet`'s name. Replaces the source's
/// process-wide evaluator-object dictionaries with a value the caller holds
/// and can drop.
#[derive(Default)]
pub struct Tide<'a> {
    runs: HashMap<String, Vec<Run<'a>>>,
}

impl<'a> Tide<'a> {
    pub fn new() -> Self {
        Tide { runs: HashMap::new() }
    }

    /// Runs one evaluation and records it under `pred_dataset.name()`,
    /// returning a reference to the stored `Run`.
    pub fn evaluate(
        &mut self,
        gt_dataset: &'a DataSet,
        pred_dataset: &'a DataSet,
        pos_threshold: f32,
        background_threshold: f32,
    ) -> &Run<'a> {
        let run = Run::evaluate(gt_dataset, pred_dataset, pos_threshold, background_threshold);
        let entry = self.runs.entry(pred_dataset.name().to_string()).or_default();
        entry.push(run);
        entry.last().expect("just pushed")
    }

    pub fn runs_for(&self, dataset_name: &str) -> &[Run<'a>] {
        self.runs.get(dataset_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `RunReport.summarize()` (§4.7): the AP and fix tables of the most
    /// recently evaluated `Run` recorded for `dataset_name`.
    pub fn summarize(&self, dataset_name: &str) -> Option<RunSummary> {
        let run = self.runs.get(dataset_name)?.last()?;
        Some(RunSummary {
            dataset_name: dataset_name.to_string(),
            ap: run.ap(),
            main_errors: run.fix_main_errors(),
            special_errors: run.fix_special_errors(),
        })
    }

    /// `RunReport::coco_summary()` (§4.7, expanded): evaluates
    /// `gt_dataset`/`pred_dataset` at every threshold in `schedule`,
    /// recording each run in the registry, then averages AP and every fix
    /// ΔAP across the schedule.
    pub fn coco_summary(
        &mut self,
        gt_dataset: &'a DataSet,
        pred_dataset: &'a DataSet,
        schedule: &ThresholdSchedule,
    ) -> CocoSummary {
        let n = schedule.pos_thresholds.len().max(1) as f64;
        let mut ap_sum = 0.0;
        let mut main_sums: HashMap<MainErrorKind, f64> = HashMap::new();
        let mut special_sums: HashMap<SpecialErrorKind, f64> = HashMap::new();

        for &pos_threshold in &schedule.pos_thresholds {
            let run = self.evaluate(gt_dataset, pred_dataset, pos_threshold, schedule.background_threshold);
            ap_sum += run.ap();
            for (kind, delta) in run.fix_main_errors() {
                *main_sums.entry(kind).or_insert(0.0) += delta;
            }
            for (kind, delta) in run.fix_special_errors() {
                *special_sums.entry(kind).or_insert(0.0) += delta;
            }
        }

        CocoSummary {
            dataset_name: pred_dataset.name().to_string(),
            ap: ap_sum / n,
            main_errors: main_sums.into_iter().map(|(k, v)| (k.variant_name().to_string(), v / n)).collect(),
            special_errors: special_sums.into_iter().map(|(k, v)| (k.variant_name().to_string(), v / n)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Shape};

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> Shape {
        Shape::Box(BoundingBox::new(x, y, w, h).unwrap())
    }

    #[test]
    fn default_schedule_matches_coco_convention() {
        let schedule = ThresholdSchedule::default();
        assert_eq!(schedule.pos_thresholds.len(), 10);
        assert!((schedule.pos_thresholds[0] - 0.5).abs() < 1e-6);
        assert!((schedule.pos_thresholds[9] - 0.95).abs() < 1e-6);
        assert!((schedule.background_threshold - 0.1).abs() < 1e-6);
    }

    #[test]
    fn registry_groups_runs_by_prediction_dataset_name() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("model_a", 100);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();

        let mut tide = Tide::new();
        tide.evaluate(&gts, &preds, 0.5, 0.1);
        tide.evaluate(&gts, &preds, 0.75, 0.1);
        assert_eq!(tide.runs_for("model_a").len(), 2);
        assert!(tide.runs_for("nonexistent").is_empty());

        let summary = tide.summarize("model_a").unwrap();
        assert!((summary.ap - 1.0).abs() < 1e-6);
    }

    #[test]
    fn coco_summary_averages_over_default_schedule() {
        let mut gts = DataSet::new("gt", 100);
        gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0), false).unwrap();
        let mut preds = DataSet::new("model_a", 100);
        preds.add_class(1, "c1");
        preds.add_detection(0, 1, 0.9, bbox(10.0, 10.0, 50.0, 50.0)).unwrap();

        let mut tide = Tide::new();
        let schedule = ThresholdSchedule::default();
        let summary = tide.coco_summary(&gts, &preds, &schedule);
        assert_eq!(summary.dataset_name, "model_a");
        assert!((0.0..=1.0).contains(&summary.ap));
        assert!(summary.main_errors.contains_key("MissedError"));
        assert!(summary.special_errors.contains_key("FalsePositiveError"));
        assert_eq!(tide.runs_for("model_a").len(), schedule.pos_thresholds.len());
    }
}
