use crate::annotations::{ClassId, ImageId, ItemId};
use crate::geometry::Shape;
use std::fmt;

/// A detection is what is produced as output from an object detection model:
/// any annotation combined with a confidence score, a probability value that
/// encodes the model's belief that the detection is true.
#[derive(Clone, Debug)]
pub struct Detection {
    pub id: ItemId,
    pub image_id: ImageId,
    pub class_id: ClassId,
    pub score: f32,
    pub geometry: Shape,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Detection {{ id: {}, image_id: {}, class_id: {}, score: {} }}",
            self.id, self.image_id, self.class_id, self.score
        )
    }
}
