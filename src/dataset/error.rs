use crate::annotations::ClassId;
use crate::geometry::Mode;
use std::fmt;

/// Input-validation failures reported at ingest time (§7) — never deferred
/// to `evaluate`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DataSetError {
    UnknownClass { class_id: ClassId },
    ScoreOutOfRange { score: f32 },
    MixedGeometryModes { existing: Mode, attempted: Mode },
}

impl fmt::Display for DataSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSetError::UnknownClass { class_id } => {
                write!(
                    f,
                    "Failed to add detection, class id {} was never declared via add_class or a ground truth.",
                    class_id
                )
            }
            DataSetError::ScoreOutOfRange { score } => {
                write!(f, "Failed to add detection, score ({}) is outside [0, 1].", score)
            }
            DataSetError::MixedGeometryModes { existing, attempted } => {
                write!(
                    f,
                    "Failed to add item, this DataSet is locked to {} mode but a {} geometry was given.",
                    existing, attempted
                )
            }
        }
    }
}

impl std::error::Error for DataSetError {}
