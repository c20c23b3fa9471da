//! Strand Kinematic Backend
//!
//! A tree of links connected by single-axis joints. Worlds hold models,
//! models hold links, and each link hangs off its parent (or the world)
//! through at most one revolute or prismatic joint. Shapes are rigidly
//! attached to links.
//!
//! There are no forces: joint accelerations are inputs, and stepping
//! integrates them into velocities and positions.

mod backend;
mod engine;
mod entity;
mod error;

pub use backend::JointCommands;
pub use engine::KinematicEngine;
pub use entity::{JointId, JointKind, LinkId, ModelId, ShapeGeometry, ShapeId, WorldId};
pub use error::KinematicError;

use strand_core::{Capability, CapabilitySet, Plugin, StepBackend, StepConfig};

/// Plugin publishing an empty [`KinematicEngine`].
///
/// Callers build their tree through
/// [`EngineHandle::downcast_mut`](strand_core::EngineHandle::downcast_mut).
pub struct KinematicPlugin;

impl KinematicPlugin {
    pub const NAME: &'static str = "kinematic";
}

impl Plugin for KinematicPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        [
            Capability::FORWARD_STEP,
            Capability::SET_STATE,
            Capability::WRITE_STATE,
            Capability::ENTITY_MANAGEMENT,
            Capability::JOINT_KINEMATICS,
            Capability::FRAME_DATA,
            Capability::SHAPES,
        ]
        .into_iter()
        .collect()
    }

    fn instantiate(&self, config: &StepConfig) -> Box<dyn StepBackend> {
        Box::new(KinematicEngine::new(config))
    }
}
