use crate::{JointId, LinkId, ModelId, ShapeId, WorldId};
use thiserror::Error;

/// Errors raised while building or querying the kinematic tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicError {
    #[error("unknown world {0}")]
    UnknownWorld(WorldId),

    #[error("unknown model {0}")]
    UnknownModel(ModelId),

    #[error("unknown link {0}")]
    UnknownLink(LinkId),

    #[error("unknown joint {0}")]
    UnknownJoint(JointId),

    #[error("unknown shape {0}")]
    UnknownShape(ShapeId),

    #[error("links {child} and {parent} belong to different models")]
    ModelMismatch { child: LinkId, parent: LinkId },

    #[error("attaching {child} below {parent} would create a cycle")]
    Cycle { child: LinkId, parent: LinkId },

    #[error("joint axis must be finite and non-zero")]
    InvalidAxis,

    #[error("shape dimensions must be finite and positive")]
    InvalidShape,
}
