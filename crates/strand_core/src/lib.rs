//! Strand Core
//!
//! Demand-driven exchange of simulation quantities between physics
//! backends and their consumers:
//! - Type-erased, query-tracked data containers
//! - Input / Output / State roles and the per-tick step protocol
//! - Required / expected / on-demand computation policy
//! - Load-time capability registry for backends

pub mod capability;
pub mod config;
pub mod data;
pub mod quantities;
pub mod step;
pub mod time;

pub use glam;

pub use capability::{Capability, CapabilityError, CapabilitySet, EngineHandle, Plugin, PluginRegistry};
pub use config::StepConfig;
pub use data::{CompositeData, Data, DataError, TypeKey};
pub use step::{
    ComputePlan, Demand, DemandPolicy, Input, Output, State, StepBackend, StepError, StepPhase,
    Stepper,
};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
