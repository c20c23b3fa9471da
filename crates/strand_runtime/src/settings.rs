//! Runtime settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strand_core::{Capability, StepConfig};

/// What the runtime loads and how long it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Plugin to load. `None` picks the first plugin offering every
    /// requested capability.
    pub backend: Option<String>,
    /// Capability names the backend must implement.
    pub capabilities: Vec<String>,
    pub ticks: u64,
    pub step: StepConfig,
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn requested_capabilities(&self) -> Vec<Capability> {
        self.capabilities.iter().cloned().map(Capability::named).collect()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: None,
            capabilities: vec![Capability::FORWARD_STEP.name().to_string()],
            ticks: 10,
            step: StepConfig::default(),
        }
    }
}
