//! Immutable-once-built container of detections, ground truths, and the
//! per-image/per-class indices the rest of the engine reads.
//!
//! Mirrors the ingestion surface the teacher's `object_detection` module
//! builds around `Detection<T>` (incremental `add_*` calls, ids assigned at
//! construction time), generalised from "one model's output" to "a named
//! collection of either predictions or ground truths" (§4.2, §6).

mod error;

pub use error::DataSetError;

use crate::annotations::{ClassId, Detection, GroundTruth, ImageId, ItemId};
use crate::geometry::{Mode, Shape};
use std::collections::{BTreeSet, HashMap};

/// A named, incrementally-built collection of either detections or ground
/// truths for one evaluation run. A single `DataSet` holds one or the other,
/// never both — `evaluate()` takes two (§6).
#[derive(Debug)]
pub struct DataSet {
    name: String,
    max_dets: usize,
    mode: Option<Mode>,
    classes: HashMap<ClassId, String>,
    detections: Vec<Detection>,
    ground_truths: Vec<GroundTruth>,
}

impl DataSet {
    /// `max_dets` caps the number of detections retained per image, keeping
    /// the highest-scoring ones with ties broken by ingest order. `0` means
    /// unlimited, a convenience not present in the Python original (which
    /// always passed a finite cap) but harmless since it degrades to "keep
    /// everything".
    pub fn new(name: impl Into<String>, max_dets: usize) -> Self {
        DataSet {
            name: name.into(),
            max_dets,
            mode: None,
            classes: HashMap::new(),
            detections: Vec::new(),
            ground_truths: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_dets(&self) -> usize {
        self.max_dets
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Names a class. Optional — a class referenced only by a ground truth
    /// defaults to its id's string form (§6); calling this overrides that
    /// default for reporting.
    pub fn add_class(&mut self, class_id: ClassId, name: impl Into<String>) {
        self.classes.insert(class_id, name.into());
    }

    pub fn class_name(&self, class_id: ClassId) -> String {
        self.classes.get(&class_id).cloned().unwrap_or_else(|| class_id.to_string())
    }

    /// Ground truths implicitly declare their own class (a GT dataset is the
    /// source of truth for which classes exist); detections may only
    /// reference a class already known to this same `DataSet` (§4.2, §7).
    pub fn add_detection(
        &mut self,
        image_id: ImageId,
        class_id: ClassId,
        score: f32,
        geometry: Shape,
    ) -> Result<ItemId, DataSetError> {
        if !(0.0..=1.0).contains(&score) {
            return Err(DataSetError::ScoreOutOfRange { score });
        }
        if !self.classes.contains_key(&class_id) {
            return Err(DataSetError::UnknownClass { class_id });
        }
        self.check_mode(geometry.mode())?;
        let id = self.detections.len() as ItemId;
        self.detections.push(Detection { id, image_id, class_id, score, geometry });
        Ok(id)
    }

    pub fn add_ground_truth(
        &mut self,
        image_id: ImageId,
        class_id: ClassId,
        geometry: Shape,
        ignore: bool,
    ) -> Result<ItemId, DataSetError> {
        self.check_mode(geometry.mode())?;
        self.classes.entry(class_id).or_insert_with(|| class_id.to_string());
        let id = self.ground_truths.len() as ItemId;
        self.ground_truths.push(GroundTruth { id, image_id, class_id, geometry, ignore });
        Ok(id)
    }

    fn check_mode(&mut self, mode: Mode) -> Result<(), DataSetError> {
        match self.mode {
            None => {
                self.mode = Some(mode);
                Ok(())
            }
            Some(existing) if existing == mode => Ok(()),
            Some(existing) => Err(DataSetError::MixedGeometryModes { existing, attempted: mode }),
        }
    }

    pub fn image_ids(&self) -> BTreeSet<ImageId> {
        self.detections
            .iter()
            .map(|d| d.image_id)
            .chain(self.ground_truths.iter().map(|g| g.image_id))
            .collect()
    }

    pub fn class_ids(&self) -> BTreeSet<ClassId> {
        self.detections
            .iter()
            .map(|d| d.class_id)
            .chain(self.ground_truths.iter().map(|g| g.class_id))
            .collect()
    }

    pub fn all_detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn all_ground_truths(&self) -> &[GroundTruth] {
        &self.ground_truths
    }

    /// Detections in `image_id`, capped to `max_dets` by score (ties broken
    /// by ascending id, i.e. ingest order), highest score first.
    pub fn detections_in_image(&self, image_id: ImageId) -> Vec<&Detection> {
        let mut dets: Vec<&Detection> =
            self.detections.iter().filter(|d| d.image_id == image_id).collect();
        dets.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.id.cmp(&b.id))
        });
        if self.max_dets > 0 && dets.len() > self.max_dets {
            dets.truncate(self.max_dets);
        }
        dets
    }

    pub fn detections_in_image_class(&self, image_id: ImageId, class_id: ClassId) -> Vec<&Detection> {
        self.detections_in_image(image_id).into_iter().filter(|d| d.class_id == class_id).collect()
    }

    pub fn ground_truths_in_image(&self, image_id: ImageId) -> Vec<&GroundTruth> {
        self.ground_truths.iter().filter(|g| g.image_id == image_id).collect()
    }

    pub fn ground_truths_in_image_class(&self, image_id: ImageId, class_id: ClassId) -> Vec<&GroundTruth> {
        self.ground_truths
            .iter()
            .filter(|g| g.image_id == image_id && g.class_id == class_id)
            .collect()
    }

    /// `P` in the AP formula (§4.5): the number of non-ignore ground truths
    /// for a class, across every image.
    pub fn non_ignore_ground_truth_count(&self, class_id: ClassId) -> usize {
        self.ground_truths.iter().filter(|g| g.class_id == class_id && !g.ignore).count()
    }

    /// Builds a derived `DataSet` sharing this one's name, class registry,
    /// mode and `max_dets`, but with `detections` substituted wholesale.
    /// Used only by `fix` (§4.6) to produce the score-rewritten or
    /// synthetic-detection-augmented counterfactual datasets a fix
    /// recomputes AP against; it bypasses `add_detection`'s validation
    /// deliberately, since a fixed score (or a synthetic detection's score
    /// of `1 + ε`) is not required to stay inside `[0, 1]`.
    pub(crate) fn with_detections(&self, detections: Vec<Detection>) -> DataSet {
        DataSet {
            name: self.name.clone(),
            max_dets: self.max_dets,
            mode: self.mode,
            classes: self.classes.clone(),
            detections,
            ground_truths: self.ground_truths.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> Shape {
        Shape::Box(BoundingBox::new(x, y, w, h).unwrap())
    }

    #[test]
    fn rejects_detection_for_undeclared_class() {
        let mut ds = DataSet::new("preds", 100);
        let err = ds.add_detection(0, 1, 0.9, bbox(0.0, 0.0, 10.0, 10.0)).unwrap_err();
        assert!(matches!(err, DataSetError::UnknownClass { class_id: 1 }));
    }

    #[test]
    fn ground_truth_self_declares_its_class() {
        let mut ds = DataSet::new("gts", 100);
        let id = ds.add_ground_truth(0, 1, bbox(0.0, 0.0, 10.0, 10.0), false).unwrap();
        assert_eq!(id, 0);
        assert_eq!(ds.class_name(1), "1");
    }

    #[test]
    fn rejects_score_outside_unit_interval() {
        let mut ds = DataSet::new("preds", 100);
        ds.add_class(1, "cat");
        let err = ds.add_detection(0, 1, 1.5, bbox(0.0, 0.0, 10.0, 10.0)).unwrap_err();
        assert!(matches!(err, DataSetError::ScoreOutOfRange { .. }));
    }

    #[test]
    fn max_dets_keeps_highest_scores() {
        let mut ds = DataSet::new("preds", 2);
        ds.add_class(1, "cat");
        ds.add_detection(0, 1, 0.5, bbox(0.0, 0.0, 10.0, 10.0)).unwrap();
        ds.add_detection(0, 1, 0.9, bbox(1.0, 1.0, 10.0, 10.0)).unwrap();
        ds.add_detection(0, 1, 0.7, bbox(2.0, 2.0, 10.0, 10.0)).unwrap();
        let kept = ds.detections_in_image(0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.7);
    }

    #[test]
    fn rejects_mixed_geometry_modes() {
        let mut ds = DataSet::new("preds", 100);
        ds.add_class(1, "cat");
        ds.add_detection(0, 1, 0.9, bbox(0.0, 0.0, 10.0, 10.0)).unwrap();
        let mask = Shape::Mask(crate::geometry::Mask::new(10, 10, Default::default()));
        let err = ds.add_detection(0, 1, 0.8, mask).unwrap_err();
        assert!(matches!(err, DataSetError::MixedGeometryModes { .. }));
    }
}
