//! Live temperature state for one run.

use super::config::CoolingLaw;

/// Current temperature of an annealing run.
///
/// Starts at `initial`; every [`decrease`](Temperature::decrease) bumps the
/// iteration counter and recomputes the value from `initial` through the
/// cooling law.
#[derive(Debug, Clone, PartialEq)]
pub struct Temperature {
    law: CoolingLaw,
    initial: f64,
    current: f64,
    iteration: u64,
}

impl Temperature {
    pub fn new(law: CoolingLaw, initial: f64) -> Self {
        Self {
            law,
            initial,
            current: initial,
            iteration: 0,
        }
    }

    /// Advances one cool-down step.
    pub fn decrease(&mut self) {
        self.iteration += 1;
        self.current = self.law.temperature_at(self.initial, self.iteration);
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    /// Number of `decrease` calls so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn law(&self) -> CoolingLaw {
        self.law
    }
}
