//! Step-data exchange between a backend and its consumers.
//!
//! Each tick a backend reads an [`Input`], writes its live quantities into
//! a [`State`] and refreshes an [`Output`]. What goes into the output is
//! decided by the backend's [`DemandPolicy`] from the queries consumers made
//! on the previous output. [`Stepper`] drives the cycle and enforces its
//! order.

mod backend;
mod demand;
mod error;
mod roles;
mod stepper;

pub use backend::StepBackend;
pub use demand::{ComputePlan, Demand, DemandPolicy};
pub use error::StepError;
pub use roles::{DataRequests, Input, Output, State};
pub use stepper::{StepPhase, Stepper};
