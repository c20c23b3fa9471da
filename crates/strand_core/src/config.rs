//! Step configuration

use serde::{Deserialize, Serialize};

/// Settings shared by every backend driven through a [`Stepper`](crate::step::Stepper).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Simulated seconds per tick.
    pub time_step: f64,
    /// Quantities to produce on the first tick, by type name.
    pub initial_demand: Vec<String>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            time_step: crate::time::DEFAULT_TIME_STEP,
            initial_demand: Vec::new(),
        }
    }
}
