use crate::capability::Capability;
use thiserror::Error;

/// Errors that can occur while registering or requesting backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("plugin '{name}' is already registered")]
    DuplicatePlugin { name: String },

    #[error("no plugin named '{name}' is registered")]
    UnknownPlugin { name: String },

    #[error("plugin '{plugin}' does not support: {}", join(.missing))]
    Unsupported {
        plugin: String,
        missing: Vec<Capability>,
    },

    #[error("no registered plugin supports all of: {}", join(.requested))]
    NoMatch { requested: Vec<Capability> },
}

fn join(capabilities: &[Capability]) -> String {
    capabilities
        .iter()
        .map(Capability::name)
        .collect::<Vec<_>>()
        .join(", ")
}
