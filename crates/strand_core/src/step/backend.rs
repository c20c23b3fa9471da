// backend.rs - Contract every physics backend implements

use crate::data::TypeKey;
use crate::step::{ComputePlan, DemandPolicy, Input, Output, State, StepError};
use std::any::Any;

/// Adapter between the step protocol and a concrete engine.
///
/// The live engine state stays inside the implementor. Everything that
/// crosses this boundary is a deep copy in an [`Input`], [`Output`] or
/// [`State`].
pub trait StepBackend: Send {
    /// Backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Quantities this backend can write into an [`Output`].
    fn policy(&self) -> &DemandPolicy;

    /// Mutable policy, so callers can seed the first-cycle set.
    fn policy_mut(&mut self) -> &mut DemandPolicy;

    /// Keys a [`State`] must carry to be accepted by [`set_state_to`](Self::set_state_to).
    fn required_state(&self) -> Vec<TypeKey>;

    /// Advance the live engine by one tick.
    fn simulate(&mut self, input: &Input);

    /// Export live quantities into `state`.
    fn write(&self, state: &mut State);

    /// Populate at least the quantities named by `plan`.
    fn write_required_data(&self, output: &mut Output, plan: &ComputePlan);

    /// Replace live state with `state`. Called only once every key from
    /// [`required_state`](Self::required_state) is known to be present.
    /// Must validate fully before touching live state.
    fn apply_state(&mut self, state: &State) -> Result<(), StepError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// One full tick: simulate, snapshot, then refresh the output.
    ///
    /// `plan` must have been computed from `output` before this call.
    /// Producible quantities left out of `plan` are dropped from `output`,
    /// so a slot present after the tick always holds this tick's value.
    fn tick(&mut self, output: &mut Output, state: &mut State, input: &Input, plan: &ComputePlan) {
        self.simulate(input);
        self.write(state);
        output.reset_queries();
        self.write_required_data(output, plan);

        let stale: Vec<TypeKey> = self
            .policy()
            .keys()
            .filter(|(key, _)| !plan.wants_key(*key))
            .map(|(key, _)| key)
            .collect();
        for key in stale {
            output.remove_key(key);
        }
    }

    /// All-or-nothing restore of live state from `state`.
    fn set_state_to(&mut self, state: &State) -> Result<(), StepError> {
        state
            .require_all(&self.required_state())
            .map_err(|source| StepError::MissingRequiredData {
                operation: "set_state_to",
                source,
            })?;
        self.apply_state(state)
    }
}
