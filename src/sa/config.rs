//! Annealer configuration and cooling laws.

use std::fmt;
use std::str::FromStr;

use crate::error::{BalanceError, Result};

/// Cooling law applied at every cool-down.
///
/// Each law computes the temperature from the initial value `T_0` and the
/// number `k` of cool-downs performed so far:
///
/// - Cauchy: `T_k = T_0 / (1 + k)`
/// - LogDiv: `T_k = T_0 * ln(1 + k) / (1 + k)`
/// - Boltzmann: `T_k = T_0 / ln(1 + k)`
///
/// Boltzmann overshoots `T_0` at `k = 1` (`1 / ln 2 > 1`) and cools very
/// slowly afterwards; a run needs roughly `e^(T_0 / T_min)` cool-downs to
/// reach the floor. Bound it with [`AnnealConfig::with_max_cooling_steps`]
/// for large job durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CoolingLaw {
    /// Fast cooling, `T_0 / (1 + k)`.
    #[default]
    Cauchy,

    /// Logarithmic division, `T_0 * ln(1 + k) / (1 + k)`.
    LogDiv,

    /// Boltzmann cooling, `T_0 / ln(1 + k)`.
    Boltzmann,
}

impl CoolingLaw {
    /// Temperature after `iteration` cool-downs from `initial`.
    ///
    /// `iteration == 0` yields `initial` for every law.
    pub fn temperature_at(self, initial: f64, iteration: u64) -> f64 {
        if iteration == 0 {
            return initial;
        }
        let k = iteration as f64;
        match self {
            CoolingLaw::Cauchy => initial / (1.0 + k),
            CoolingLaw::LogDiv => initial * (1.0 + k).ln() / (1.0 + k),
            CoolingLaw::Boltzmann => initial / (1.0 + k).ln(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CoolingLaw::Cauchy => "cauchy",
            CoolingLaw::LogDiv => "logdiv",
            CoolingLaw::Boltzmann => "boltzmann",
        }
    }
}

impl fmt::Display for CoolingLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CoolingLaw {
    type Err = BalanceError;

    /// Accepts the law name (case-insensitive) or its menu code `1`-`3`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "cauchy" => Ok(CoolingLaw::Cauchy),
            "2" | "logdiv" | "log-div" => Ok(CoolingLaw::LogDiv),
            "3" | "boltzmann" => Ok(CoolingLaw::Boltzmann),
            other => Err(BalanceError::InvalidConfig(format!(
                "unknown cooling law '{other}'"
            ))),
        }
    }
}

/// Configuration for the [`Annealer`](super::Annealer).
///
/// The initial temperature is not configured: it is always the mean job
/// duration of the instance being balanced.
///
/// # Examples
///
/// ```
/// use u_balance::sa::{AnnealConfig, CoolingLaw};
///
/// let config = AnnealConfig::default()
///     .with_cooling(CoolingLaw::LogDiv)
///     .with_min_temperature(2.0)
///     .with_stagnation_limit(100)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnealConfig {
    /// Cooling law.
    pub cooling: CoolingLaw,

    /// Temperature floor. The run terminates once a cool-down brings the
    /// temperature to this value or below.
    pub min_temperature: f64,

    /// Consecutive mutations without an objective change that trigger a
    /// cool-down.
    pub stagnation_limit: usize,

    /// Per-job probability of being moved between the heaviest and the
    /// lightest processor in one mutation.
    pub move_probability: f64,

    /// Maximum total mutations. 0 = no limit.
    pub max_iterations: usize,

    /// Maximum cool-downs. 0 = no limit.
    pub max_cooling_steps: usize,

    /// Random seed for reproducibility. `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            cooling: CoolingLaw::default(),
            min_temperature: 2.0,
            stagnation_limit: 100,
            move_probability: 0.1,
            max_iterations: 0,
            max_cooling_steps: 0,
            seed: None,
        }
    }
}

impl AnnealConfig {
    pub fn with_cooling(mut self, cooling: CoolingLaw) -> Self {
        self.cooling = cooling;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_stagnation_limit(mut self, n: usize) -> Self {
        self.stagnation_limit = n;
        self
    }

    pub fn with_move_probability(mut self, p: f64) -> Self {
        self.move_probability = p;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_max_cooling_steps(mut self, n: usize) -> Self {
        self.max_cooling_steps = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.min_temperature.is_finite() || self.min_temperature <= 0.0 {
            return Err(BalanceError::InvalidConfig(format!(
                "min_temperature must be finite and positive, got {}",
                self.min_temperature
            )));
        }
        if self.stagnation_limit == 0 {
            return Err(BalanceError::InvalidConfig(
                "stagnation_limit must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.move_probability) {
            return Err(BalanceError::InvalidConfig(format!(
                "move_probability must be in [0, 1], got {}",
                self.move_probability
            )));
        }
        Ok(())
    }
}
