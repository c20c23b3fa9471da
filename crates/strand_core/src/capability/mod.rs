//! Load-time capability registry.
//!
//! Backends publish the capabilities they implement when registered. A
//! caller asks for a backend by name (or for any backend) together with
//! the capabilities it needs, and either gets a handle or an error naming
//! what is missing. Capability ids are free-form strings, so sets unknown
//! when this crate was built work the same as the built-in ones.

mod error;

pub use error::CapabilityError;

use crate::config::StepConfig;
use crate::step::{StepBackend, Stepper};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Named unit of backend functionality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    pub const FORWARD_STEP: Capability = Capability::new("forward_step");
    pub const SET_STATE: Capability = Capability::new("set_state");
    pub const WRITE_STATE: Capability = Capability::new("write_state");
    pub const ENTITY_MANAGEMENT: Capability = Capability::new("entity_management");
    pub const JOINT_KINEMATICS: Capability = Capability::new("joint_kinematics");
    pub const FRAME_DATA: Capability = Capability::new("frame_data");
    pub const SHAPES: Capability = Capability::new("shapes");

    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Set of capabilities published by one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    capabilities: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Requested capabilities this set lacks, in request order.
    pub fn missing<'a>(&self, requested: &'a [Capability]) -> Vec<&'a Capability> {
        requested
            .iter()
            .filter(|capability| !self.capabilities.contains(*capability))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}

/// A loadable backend.
pub trait Plugin: Send + Sync {
    /// Unique plugin name.
    fn name(&self) -> &str;

    /// Everything this plugin's backends implement.
    fn capabilities(&self) -> CapabilitySet;

    /// Build a fresh backend.
    fn instantiate(&self, config: &StepConfig) -> Box<dyn StepBackend>;
}

/// Backend instance together with the capabilities it was checked for.
pub struct EngineHandle {
    plugin: String,
    capabilities: CapabilitySet,
    backend: Box<dyn StepBackend>,
}

impl EngineHandle {
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn supports(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn backend(&self) -> &dyn StepBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn StepBackend {
        self.backend.as_mut()
    }

    /// Concrete backend access for capability-specific APIs.
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.backend.as_any_mut().downcast_mut::<T>()
    }

    pub fn into_backend(self) -> Box<dyn StepBackend> {
        self.backend
    }

    /// Wrap the backend in a stepper seeded from `config`.
    pub fn into_stepper(self, config: &StepConfig) -> Stepper {
        Stepper::with_config(self.backend, config)
    }
}

/// Owns every registered plugin and resolves capability requests.
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
    by_name: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), CapabilityError> {
        let name = plugin.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(CapabilityError::DuplicatePlugin { name });
        }
        tracing::debug!(
            plugin = %name,
            capabilities = plugin.capabilities().len(),
            "registered plugin"
        );
        self.by_name.insert(name, self.plugins.len());
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|plugin| plugin.name())
    }

    pub fn capabilities_of(&self, name: &str) -> Option<CapabilitySet> {
        self.plugin(name).map(|plugin| plugin.capabilities())
    }

    fn plugin(&self, name: &str) -> Option<&dyn Plugin> {
        self.by_name
            .get(name)
            .and_then(|&idx| self.plugins.get(idx))
            .map(|boxed| &**boxed)
    }

    /// Instantiate plugin `name`, checking it implements all of `requested`.
    pub fn request(
        &self,
        name: &str,
        requested: &[Capability],
        config: &StepConfig,
    ) -> Result<EngineHandle, CapabilityError> {
        let plugin = self
            .plugin(name)
            .ok_or_else(|| CapabilityError::UnknownPlugin {
                name: name.to_string(),
            })?;

        let capabilities = plugin.capabilities();
        let missing = capabilities.missing(requested);
        if !missing.is_empty() {
            return Err(CapabilityError::Unsupported {
                plugin: name.to_string(),
                missing: missing.into_iter().cloned().collect(),
            });
        }

        Ok(EngineHandle {
            plugin: name.to_string(),
            capabilities,
            backend: plugin.instantiate(config),
        })
    }

    /// Instantiate the first registered plugin that implements all of `requested`.
    pub fn find(
        &self,
        requested: &[Capability],
        config: &StepConfig,
    ) -> Result<EngineHandle, CapabilityError> {
        let plugin = self
            .plugins
            .iter()
            .find(|plugin| plugin.capabilities().missing(requested).is_empty())
            .ok_or_else(|| CapabilityError::NoMatch {
                requested: requested.to_vec(),
            })?;
        self.request(plugin.name(), requested, config)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TypeKey;
    use crate::step::{ComputePlan, DemandPolicy, Input, Output, State, StepError};
    use std::any::Any;

    struct NullBackend {
        policy: DemandPolicy,
    }

    impl StepBackend for NullBackend {
        fn name(&self) -> &str {
            "null"
        }

        fn policy(&self) -> &DemandPolicy {
            &self.policy
        }

        fn policy_mut(&mut self) -> &mut DemandPolicy {
            &mut self.policy
        }

        fn required_state(&self) -> Vec<TypeKey> {
            Vec::new()
        }

        fn simulate(&mut self, _input: &Input) {}

        fn write(&self, _state: &mut State) {}

        fn write_required_data(&self, _output: &mut Output, _plan: &ComputePlan) {}

        fn apply_state(&mut self, _state: &State) -> Result<(), StepError> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct NullPlugin {
        name: &'static str,
        capabilities: CapabilitySet,
    }

    impl Plugin for NullPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> CapabilitySet {
            self.capabilities.clone()
        }

        fn instantiate(&self, _config: &StepConfig) -> Box<dyn StepBackend> {
            Box::new(NullBackend {
                policy: DemandPolicy::new(),
            })
        }
    }

    fn registry() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry
            .register(Box::new(NullPlugin {
                name: "stepper-only",
                capabilities: CapabilitySet::new().with(Capability::FORWARD_STEP),
            }))
            .unwrap();
        registry
            .register(Box::new(NullPlugin {
                name: "full",
                capabilities: [
                    Capability::FORWARD_STEP,
                    Capability::SET_STATE,
                    Capability::named("soft_bodies"),
                ]
                .into_iter()
                .collect(),
            }))
            .unwrap();
        registry
    }

    #[test]
    fn request_checks_capabilities() {
        let registry = registry();
        let config = StepConfig::default();

        let handle = registry
            .request("full", &[Capability::SET_STATE], &config)
            .unwrap();
        assert!(handle.supports(&Capability::named("soft_bodies")));
        assert_eq!(handle.plugin(), "full");

        match registry.request("stepper-only", &[Capability::SET_STATE, Capability::SHAPES], &config) {
            Err(CapabilityError::Unsupported { plugin, missing }) => {
                assert_eq!(plugin, "stepper-only");
                assert_eq!(missing, vec![Capability::SET_STATE, Capability::SHAPES]);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("capability check passed unexpectedly"),
        }
    }

    #[test]
    fn unknown_capabilities_resolve_by_name() {
        let registry = registry();
        let handle = registry
            .find(&[Capability::named("soft_bodies")], &StepConfig::default())
            .unwrap();
        assert_eq!(handle.plugin(), "full");

        assert!(matches!(
            registry.find(&[Capability::named("fluids")], &StepConfig::default()),
            Err(CapabilityError::NoMatch { .. })
        ));
    }

    #[test]
    fn duplicate_and_unknown_plugins_are_errors() {
        let mut registry = registry();
        let duplicate = registry.register(Box::new(NullPlugin {
            name: "full",
            capabilities: CapabilitySet::new(),
        }));
        assert!(matches!(duplicate, Err(CapabilityError::DuplicatePlugin { .. })));
        assert!(matches!(
            registry.request("missing", &[], &StepConfig::default()),
            Err(CapabilityError::UnknownPlugin { .. })
        ));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["stepper-only", "full"]);
    }

    #[test]
    fn handle_downcasts_to_concrete_backend() {
        let mut handle = registry()
            .request("full", &[], &StepConfig::default())
            .unwrap();
        assert!(handle.downcast_mut::<NullBackend>().is_some());
        let stepper = handle.into_stepper(&StepConfig::default());
        assert_eq!(stepper.backend().name(), "null");
    }
}
