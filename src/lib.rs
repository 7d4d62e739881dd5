//! Simulated-annealing load balancer for identical parallel processors.
//!
//! Given a set of jobs with fixed durations and `P` identical processors,
//! searches for an assignment that minimizes the load spread: the total
//! duration on the most loaded processor minus that on the least loaded
//! one.
//!
//! - [`JobSet`] / [`Job`]: the input jobs
//! - [`Assignment`]: a complete partition of the jobs over the processors
//! - [`sa`]: cooling laws, the neighbor operator and the [`sa::Annealer`]
//! - [`instance`]: the job-list text format and the result report
//!
//! # Examples
//!
//! ```
//! use u_balance::instance::Instance;
//! use u_balance::sa::{AnnealConfig, Annealer, CoolingLaw};
//!
//! let instance: Instance = "2\n4\n5,5,5,5".parse().unwrap();
//! let jobs = instance.job_set().unwrap();
//!
//! let config = AnnealConfig::default()
//!     .with_cooling(CoolingLaw::Cauchy)
//!     .with_seed(7);
//! let result = Annealer::new(config)
//!     .unwrap()
//!     .run(&jobs, instance.processors)
//!     .unwrap();
//!
//! assert!(result.best_objective <= result.initial_objective);
//! println!("{}", result.report());
//! ```
//!
//! # Logging
//!
//! Runs emit [`tracing`] events: `info` at start and finish, `debug` at
//! every cool-down and `trace` for each mutation. No subscriber is
//! installed by this crate.

pub mod assignment;
pub mod error;
pub mod instance;
pub mod jobs;
pub mod sa;

pub use assignment::Assignment;
pub use error::{BalanceError, Result};
pub use jobs::{Job, JobSet};
