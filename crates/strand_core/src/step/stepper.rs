// stepper.rs - Step protocol state machine
//
// Idle -> InputPrepared -> Simulating -> OutputPopulated -> OutputConsumed -> Idle
//
// The stepper is the boundary where backend failures are logged; the
// containers and the backend only return structured errors.

use crate::config::StepConfig;
use crate::step::{ComputePlan, Input, Output, State, StepBackend, StepError};
use std::fmt;

/// Position in the per-tick exchange cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StepPhase {
    Idle,
    InputPrepared,
    Simulating,
    OutputPopulated,
    OutputConsumed,
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepPhase::Idle => "idle",
            StepPhase::InputPrepared => "holding prepared input",
            StepPhase::Simulating => "simulating",
            StepPhase::OutputPopulated => "holding populated output",
            StepPhase::OutputConsumed => "holding consumed output",
        };
        f.write_str(name)
    }
}

/// Drives one backend through the step protocol.
///
/// The stepper owns the [`Output`] across ticks so that queries made by
/// consumers on one tick's output decide what the next tick computes.
pub struct Stepper {
    backend: Box<dyn StepBackend>,
    phase: StepPhase,
    input: Input,
    output: Output,
    state: State,
    last_plan: ComputePlan,
    ticks: u64,
}

impl Stepper {
    pub fn new(backend: Box<dyn StepBackend>) -> Self {
        Self {
            backend,
            phase: StepPhase::Idle,
            input: Input::new(),
            output: Output::new(),
            state: State::new(),
            last_plan: ComputePlan::default(),
            ticks: 0,
        }
    }

    /// Build a stepper and seed the backend's first-cycle demand from `config`.
    ///
    /// Names the backend cannot produce are logged and skipped.
    pub fn with_config(mut backend: Box<dyn StepBackend>, config: &StepConfig) -> Self {
        for name in &config.initial_demand {
            let policy = backend.policy_mut();
            match policy.key_named(name) {
                Some(key) => {
                    policy.add_initial(key);
                }
                None => tracing::warn!(
                    backend = backend.name(),
                    quantity = %name,
                    "initial demand names a quantity this backend cannot produce"
                ),
            }
        }
        Self::new(backend)
    }

    #[inline]
    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Plan used by the most recent tick.
    pub fn last_plan(&self) -> &ComputePlan {
        &self.last_plan
    }

    fn expect_phase(&self, expected: StepPhase, action: &'static str) -> Result<(), StepError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(StepError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }

    /// Hand over the commands for the coming tick.
    pub fn prepare_input(&mut self, input: Input) -> Result<(), StepError> {
        self.expect_phase(StepPhase::Idle, "prepare input")?;
        self.input = input;
        self.phase = StepPhase::InputPrepared;
        Ok(())
    }

    /// Run one tick and return the refreshed output.
    pub fn step(&mut self) -> Result<&Output, StepError> {
        self.expect_phase(StepPhase::InputPrepared, "step")?;
        self.phase = StepPhase::Simulating;

        let plan = self
            .backend
            .policy()
            .plan(&self.output, self.input.requests());
        if !plan.unsupported().is_empty() {
            let names: Vec<&str> = plan.unsupported().iter().map(|key| key.name()).collect();
            tracing::debug!(
                backend = self.backend.name(),
                ?names,
                "consumers asked for quantities the backend does not produce"
            );
        }
        tracing::trace!(
            backend = self.backend.name(),
            tick = self.ticks,
            planned = plan.len(),
            first_cycle = plan.is_first_cycle(),
            "computed step plan"
        );

        self.backend
            .tick(&mut self.output, &mut self.state, &self.input, &plan);
        self.last_plan = plan;
        self.ticks += 1;
        self.phase = StepPhase::OutputPopulated;
        Ok(&self.output)
    }

    /// Read the output of the tick that just ran.
    pub fn output(&self) -> Result<&Output, StepError> {
        self.expect_phase(StepPhase::OutputPopulated, "read output")?;
        Ok(&self.output)
    }

    /// Mutable output access, for consumers that create slots to ask for
    /// on-demand quantities next tick.
    pub fn output_mut(&mut self) -> Result<&mut Output, StepError> {
        self.expect_phase(StepPhase::OutputPopulated, "read output")?;
        Ok(&mut self.output)
    }

    /// Mark the output as read by all consumers.
    pub fn consume(&mut self) -> Result<(), StepError> {
        self.expect_phase(StepPhase::OutputPopulated, "consume output")?;
        self.phase = StepPhase::OutputConsumed;
        Ok(())
    }

    /// Close the cycle and go back to idle.
    pub fn finish(&mut self) -> Result<(), StepError> {
        self.expect_phase(StepPhase::OutputConsumed, "finish the cycle")?;
        self.phase = StepPhase::Idle;
        Ok(())
    }

    /// Whole cycle in one call: prepare, step, let `consumer` read, finish.
    pub fn run_tick<F>(&mut self, input: Input, consumer: F) -> Result<(), StepError>
    where
        F: FnOnce(&mut Output),
    {
        self.prepare_input(input)?;
        self.step()?;
        consumer(&mut self.output);
        self.consume()?;
        self.finish()
    }

    /// State written by the most recent tick.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Export the backend's live quantities into `state`.
    pub fn write_state(&self, state: &mut State) {
        self.backend.write(state);
    }

    /// Fresh snapshot of the backend's live quantities.
    pub fn snapshot(&self) -> State {
        let mut state = State::new();
        self.backend.write(&mut state);
        state
    }

    /// Restore live engine state from `state`. Only valid while idle.
    ///
    /// On failure the live state is untouched and the error is logged
    /// once here before being returned. On success [`state`](Self::state)
    /// reflects the restored engine.
    pub fn set_state_to(&mut self, state: &State) -> Result<(), StepError> {
        self.expect_phase(StepPhase::Idle, "set state")?;
        self.backend.set_state_to(state).inspect_err(|err| {
            tracing::error!(backend = self.backend.name(), %err, "state snapshot rejected");
        })?;
        self.backend.write(&mut self.state);
        Ok(())
    }

    pub fn backend(&self) -> &dyn StepBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn StepBackend {
        self.backend.as_mut()
    }

    /// Concrete backend access for capability-specific APIs.
    pub fn backend_as<T: 'static>(&self) -> Option<&T> {
        self.backend.as_any().downcast_ref::<T>()
    }

    pub fn backend_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.backend.as_any_mut().downcast_mut::<T>()
    }
}
