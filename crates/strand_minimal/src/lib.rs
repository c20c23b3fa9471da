//! Strand Minimal Backend
//!
//! Reference backend with no real physics: a fixed set of bodies that
//! fall at a constant rate. Useful for exercising the step protocol and
//! as the smallest example of a [`StepBackend`](strand_core::StepBackend).

mod scene;

pub use scene::MinimalFallingScene;

use strand_core::{Capability, CapabilitySet, Plugin, StepBackend, StepConfig};

/// Plugin publishing [`MinimalFallingScene`].
pub struct MinimalPlugin;

impl MinimalPlugin {
    pub const NAME: &'static str = "minimal";
}

impl Plugin for MinimalPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::FORWARD_STEP)
            .with(Capability::SET_STATE)
            .with(Capability::WRITE_STATE)
    }

    fn instantiate(&self, config: &StepConfig) -> Box<dyn StepBackend> {
        Box::new(MinimalFallingScene::new(config))
    }
}
