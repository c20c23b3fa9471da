//! Simulation clock
//!
//! Fixed step size chosen at construction, counted in ticks

/// Default step size (1 kHz)
pub const DEFAULT_TIME_STEP: f64 = 0.001;

/// Simulation time tracker
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationTime {
    tick_count: u64,
    time_step: f64,
}

impl SimulationTime {
    pub fn new(time_step: f64) -> Self {
        Self {
            tick_count: 0,
            time_step,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
    }

    /// Elapsed simulated seconds. Computed from the tick count so it does
    /// not drift with repeated addition.
    pub fn seconds(&self) -> f64 {
        self.tick_count as f64 * self.time_step
    }

    pub fn set_tick_count(&mut self, tick_count: u64) {
        self.tick_count = tick_count;
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP)
    }
}
