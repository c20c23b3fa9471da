use crate::data::DataError;
use crate::step::StepPhase;
use thiserror::Error;

/// Errors raised while driving the step protocol.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("cannot {action} while the stepper is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: StepPhase,
    },

    #[error("{operation} aborted: {source}")]
    MissingRequiredData {
        operation: &'static str,
        source: DataError,
    },

    #[error("backend '{backend}' rejected the state: {reason}")]
    RejectedState { backend: String, reason: String },
}
