//! Simulated annealing over job assignments.
//!
//! A single-solution trajectory search. Each mutation trades random jobs
//! between the most and the least loaded processor and keeps the candidate
//! under the Metropolis criterion. After a run of mutations that leave the
//! load spread unchanged the temperature is lowered through one of three
//! cooling laws, until it reaches a floor.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Szu & Hartley (1987), "Fast Simulated Annealing" (Cauchy schedule)
//! - Geman & Geman (1984), logarithmic (Boltzmann) schedule

mod config;
mod mutator;
mod runner;
mod temperature;
mod types;

pub use config::{AnnealConfig, CoolingLaw};
pub use mutator::{metropolis_accept, BiasedExchange, DEFAULT_MOVE_PROBABILITY};
pub use runner::{AnnealResult, Annealer};
pub use temperature::Temperature;
pub use types::Mutator;
