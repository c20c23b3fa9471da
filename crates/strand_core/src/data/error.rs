use thiserror::Error;

/// Errors reported by composite data checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("missing required data: {}", .missing.join(", "))]
    MissingRequired { missing: Vec<&'static str> },
}
