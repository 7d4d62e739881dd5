//! Biased job exchange between the heaviest and lightest processor.

use rand::Rng;

use super::temperature::Temperature;
use super::types::Mutator;
use crate::assignment::Assignment;
use crate::error::{BalanceError, Result};

/// Default per-job move probability.
pub const DEFAULT_MOVE_PROBABILITY: f64 = 0.1;

/// Neighbor operator that trades random jobs between the most and the
/// least loaded processor, followed by Metropolis acceptance.
///
/// Every job on the heaviest processor independently moves to the lightest
/// one with probability `move_probability`, and vice versa. All other
/// processors are left untouched. When the heaviest and lightest
/// processor coincide (one processor, or all loads equal) no move exists
/// and the input is returned unchanged.
#[derive(Debug, Clone, Copy)]
pub struct BiasedExchange {
    move_probability: f64,
}

impl Default for BiasedExchange {
    fn default() -> Self {
        Self {
            move_probability: DEFAULT_MOVE_PROBABILITY,
        }
    }
}

impl BiasedExchange {
    pub fn new(move_probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&move_probability) {
            return Err(BalanceError::InvalidConfig(format!(
                "move_probability must be in [0, 1], got {move_probability}"
            )));
        }
        Ok(Self { move_probability })
    }

    pub fn move_probability(&self) -> f64 {
        self.move_probability
    }

    /// Builds the exchange candidate without deciding acceptance.
    pub fn propose<R: Rng>(&self, current: &Assignment, rng: &mut R) -> Option<Assignment> {
        let heavy = current.heaviest();
        let light = current.lightest();
        if heavy == light {
            return None;
        }

        let mut heavy_jobs = Vec::with_capacity(current.lane(heavy).len());
        let mut light_jobs = Vec::with_capacity(current.lane(light).len());
        let mut to_light = Vec::new();
        let mut to_heavy = Vec::new();

        for &job in current.lane(heavy) {
            if rng.random_bool(self.move_probability) {
                to_light.push(job);
            } else {
                heavy_jobs.push(job);
            }
        }
        for &job in current.lane(light) {
            if rng.random_bool(self.move_probability) {
                to_heavy.push(job);
            } else {
                light_jobs.push(job);
            }
        }

        heavy_jobs.extend(to_heavy);
        light_jobs.extend(to_light);
        Some(current.with_exchange(heavy, heavy_jobs, light, light_jobs))
    }
}

impl Mutator for BiasedExchange {
    fn mutate<R: Rng>(
        &self,
        current: &Assignment,
        temperature: &Temperature,
        rng: &mut R,
    ) -> Assignment {
        let Some(candidate) = self.propose(current, rng) else {
            return current.clone();
        };
        let (from, to) = (current.objective(), candidate.objective());
        if metropolis_accept(from, to, temperature.current(), rng) {
            candidate
        } else {
            current.clone()
        }
    }
}

/// Metropolis criterion for minimization.
///
/// Strict improvements are always accepted. Otherwise a uniform draw
/// `r` in `[0, 1)` is compared against `exp(-(candidate - current) / T)`.
/// At `T == 0` a non-improving candidate is rejected.
pub fn metropolis_accept<R: Rng>(
    current: u64,
    candidate: u64,
    temperature: f64,
    rng: &mut R,
) -> bool {
    if candidate < current {
        return true;
    }
    let delta = candidate as f64 - current as f64;
    let threshold = (-delta / temperature).exp();
    let r: f64 = rng.random();
    r <= threshold
}
