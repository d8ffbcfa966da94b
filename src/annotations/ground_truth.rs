use crate::annotations::{ClassId, ImageId, ItemId};
use crate::geometry::Shape;
use std::fmt;

/// A ground-truth annotation. GTs with `ignore = true` never produce a
/// `MissedError` and suppress matched detections from contributing to either
/// TP or FP counts (§3).
#[derive(Clone, Debug)]
pub struct GroundTruth {
    pub id: ItemId,
    pub image_id: ImageId,
    pub class_id: ClassId,
    pub geometry: Shape,
    pub ignore: bool,
}

impl fmt::Display for GroundTruth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GroundTruth {{ id: {}, image_id: {}, class_id: {}, ignore: {} }}",
            self.id, self.image_id, self.class_id, self.ignore
        )
    }
}
