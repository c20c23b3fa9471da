// entity.rs - Handles and records for the kinematic tree
//
// Handles are plain indices into the engine's arenas. Entities are never
// destroyed, so an index stays valid for the life of the engine.

use std::fmt;
use glam::{DQuat, DVec3};
use strand_core::quantities::Pose;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index as u32)
            }

            /// Return the raw index backing this handle.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_handle!(
    /// Handle to a world.
    WorldId
);
define_handle!(
    /// Handle to a model.
    ModelId
);
define_handle!(
    /// Handle to a link (rigid body).
    LinkId
);
define_handle!(
    /// Handle to a joint.
    JointId
);
define_handle!(
    /// Handle to a collision shape.
    ShapeId
);

impl JointId {
    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    pub fn raw(self) -> u64 {
        u64::from(self.0)
    }
}

pub(crate) struct WorldRecord {
    pub name: String,
}

pub(crate) struct ModelRecord {
    pub name: String,
    pub world: WorldId,
}

pub(crate) struct LinkRecord {
    pub name: String,
    pub model: ModelId,
    /// Joint connecting this link to its parent (or to the world).
    pub parent_joint: Option<JointId>,
    pub shapes: Vec<ShapeId>,
}

/// Motion permitted by a single-axis joint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JointKind {
    /// Rotation about the axis.
    Revolute,
    /// Translation along the axis.
    Prismatic,
}

pub(crate) struct JointRecord {
    pub name: String,
    pub kind: JointKind,
    pub child: LinkId,
    /// `None` attaches the child to the world frame.
    pub parent: Option<LinkId>,
    /// Unit axis in the parent frame.
    pub axis: DVec3,
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

impl JointRecord {
    /// Pose of the child relative to the parent for the current position.
    pub fn local_pose(&self) -> Pose {
        match self.kind {
            JointKind::Revolute => Pose::from_rotation(DQuat::from_axis_angle(self.axis, self.position)),
            JointKind::Prismatic => Pose::from_translation(self.axis * self.position),
        }
    }
}

/// Geometry of a shape.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ShapeGeometry {
    Box { size: DVec3 },
    Sphere { radius: f64 },
}

pub(crate) struct ShapeRecord {
    pub name: String,
    pub link: LinkId,
    pub geometry: ShapeGeometry,
    /// Pose relative to the owning link.
    pub pose: Pose,
}
