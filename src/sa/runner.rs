//! Annealing state machine.
//!
//! # Algorithm
//!
//! 1. Place every job on a random processor; `T = mean job duration`
//! 2. Inner loop: mutate until the objective has stayed the same for
//!    `stagnation_limit` consecutive mutations
//! 3. Cool down; if `T > min_temperature`, reset the stagnation counter and
//!    go back to 2
//! 4. Return the current (last) assignment

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use super::config::AnnealConfig;
use super::mutator::BiasedExchange;
use super::temperature::Temperature;
use super::types::Mutator;
use crate::assignment::Assignment;
use crate::error::Result;
use crate::instance::Report;
use crate::jobs::JobSet;

/// Result of an annealing run.
#[derive(Debug, Clone)]
pub struct AnnealResult {
    /// Assignment current when the run stopped.
    ///
    /// Not necessarily the best one visited: worsening moves are accepted
    /// along the way. See [`best_objective`](AnnealResult::best_objective).
    pub assignment: Assignment,

    /// Objective of `assignment`.
    pub objective: u64,

    /// Objective of the random initial placement.
    pub initial_objective: u64,

    /// Lowest objective observed at any point of the run.
    pub best_objective: u64,

    /// Total mutation calls.
    pub iterations: usize,

    /// Number of cool-downs performed.
    pub cooling_steps: usize,

    /// Temperature when the run stopped.
    pub final_temperature: f64,

    /// Mutations that lowered the objective.
    pub improving_moves: usize,

    /// Mutations that raised the objective.
    pub worsening_moves: usize,

    /// Whether cancelled externally.
    pub cancelled: bool,

    /// Whether `max_iterations` or `max_cooling_steps` ended the run.
    pub budget_exhausted: bool,

    /// Current objective at the start and after every cool-down.
    pub objective_history: Vec<u64>,
}

impl AnnealResult {
    /// Per-processor job ids and the final objective.
    pub fn report(&self) -> Report {
        Report::from_assignment(&self.assignment)
    }
}

/// Drives the inner-loop / cool-down state machine.
///
/// # Examples
///
/// ```
/// use u_balance::JobSet;
/// use u_balance::sa::{AnnealConfig, Annealer, CoolingLaw};
///
/// let jobs = JobSet::from_durations(&[5, 5, 5, 5]).unwrap();
/// let config = AnnealConfig::default()
///     .with_cooling(CoolingLaw::Cauchy)
///     .with_seed(42);
///
/// let result = Annealer::new(config).unwrap().run(&jobs, 2).unwrap();
/// assert_eq!(result.assignment.processors(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Annealer<M = BiasedExchange> {
    config: AnnealConfig,
    mutator: M,
}

impl Annealer<BiasedExchange> {
    /// Creates an annealer using [`BiasedExchange`] with the configured
    /// move probability.
    pub fn new(config: AnnealConfig) -> Result<Self> {
        let mutator = BiasedExchange::new(config.move_probability)?;
        Self::with_mutator(config, mutator)
    }
}

impl<M: Mutator> Annealer<M> {
    /// Creates an annealer with a custom neighbor operator.
    ///
    /// `config.move_probability` is not used by custom operators.
    pub fn with_mutator(config: AnnealConfig, mutator: M) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, mutator })
    }

    pub fn config(&self) -> &AnnealConfig {
        &self.config
    }

    pub fn mutator(&self) -> &M {
        &self.mutator
    }

    /// Balances `jobs` over `processors` processors.
    pub fn run(&self, jobs: &JobSet, processors: usize) -> Result<AnnealResult> {
        self.run_with_cancel(jobs, processors, None)
    }

    /// Runs with an optional cancellation flag, checked before every
    /// mutation.
    pub fn run_with_cancel(
        &self,
        jobs: &JobSet,
        processors: usize,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<AnnealResult> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        debug!(seed, "seeded run");
        let initial = Assignment::random(jobs, processors, &mut rng)?;
        self.anneal(jobs, initial, &mut rng, cancel.as_deref())
    }

    /// Runs with a caller-supplied random source and an optional
    /// cancellation flag. `config.seed` is ignored.
    pub fn run_with_rng<R: Rng>(
        &self,
        jobs: &JobSet,
        processors: usize,
        rng: &mut R,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<AnnealResult> {
        let initial = Assignment::random(jobs, processors, rng)?;
        self.anneal(jobs, initial, rng, cancel.as_deref())
    }

    /// Runs from a given starting assignment instead of a random one.
    pub fn run_from<R: Rng>(
        &self,
        jobs: &JobSet,
        initial: Assignment,
        rng: &mut R,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<AnnealResult> {
        initial.validate(jobs)?;
        self.anneal(jobs, initial, rng, cancel.as_deref())
    }

    fn anneal<R: Rng>(
        &self,
        jobs: &JobSet,
        initial: Assignment,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Result<AnnealResult> {
        let config = &self.config;
        let mut temperature = Temperature::new(config.cooling, jobs.mean_duration());

        let initial_objective = initial.objective();
        let mut current = initial;
        let mut last_objective = initial_objective;
        let mut best_objective = initial_objective;

        let mut iterations = 0usize;
        let mut cooling_steps = 0usize;
        let mut improving_moves = 0usize;
        let mut worsening_moves = 0usize;
        let mut cancelled = false;
        let mut budget_exhausted = false;
        let mut objective_history = vec![initial_objective];

        info!(
            jobs = jobs.len(),
            processors = current.processors(),
            cooling = %config.cooling,
            initial_temperature = temperature.current(),
            initial_objective,
            "annealing started"
        );

        'anneal: loop {
            let mut stagnation = 0usize;

            while stagnation < config.stagnation_limit {
                if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                    cancelled = true;
                    break 'anneal;
                }
                if config.max_iterations > 0 && iterations >= config.max_iterations {
                    budget_exhausted = true;
                    break 'anneal;
                }

                let next = self.mutator.mutate(&current, &temperature, rng);
                iterations += 1;

                let objective = next.objective();
                if objective < current.objective() {
                    improving_moves += 1;
                } else if objective > current.objective() {
                    worsening_moves += 1;
                }

                if objective == last_objective {
                    stagnation += 1;
                } else {
                    last_objective = objective;
                    stagnation = 0;
                }
                best_objective = best_objective.min(objective);

                trace!(iteration = iterations, objective, stagnation, "mutation");
                current = next;
            }

            temperature.decrease();
            cooling_steps += 1;
            objective_history.push(current.objective());
            debug!(
                step = cooling_steps,
                temperature = temperature.current(),
                objective = current.objective(),
                iterations,
                "cool-down"
            );

            if temperature.current() <= config.min_temperature {
                break;
            }
            if config.max_cooling_steps > 0 && cooling_steps >= config.max_cooling_steps {
                budget_exhausted = true;
                break;
            }
        }

        current.validate(jobs)?;

        info!(
            objective = current.objective(),
            best_objective,
            iterations,
            cooling_steps,
            final_temperature = temperature.current(),
            cancelled,
            budget_exhausted,
            "annealing finished"
        );

        Ok(AnnealResult {
            objective: current.objective(),
            assignment: current,
            initial_objective,
            best_objective,
            iterations,
            cooling_steps,
            final_temperature: temperature.current(),
            improving_moves,
            worsening_moves,
            cancelled,
            budget_exhausted,
            objective_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BalanceError;
    use crate::jobs::Job;
    use crate::sa::CoolingLaw;
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};

    /// Returns its input unchanged and counts calls.
    struct Frozen {
        calls: Cell<usize>,
    }

    impl Frozen {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl Mutator for Frozen {
        fn mutate<R: Rng>(
            &self,
            current: &Assignment,
            _t: &Temperature,
            _rng: &mut R,
        ) -> Assignment {
            self.calls.set(self.calls.get() + 1);
            current.clone()
        }
    }

    /// Wraps the default operator and checks every produced assignment.
    struct Checked {
        inner: BiasedExchange,
        jobs: JobSet,
        violations: Cell<usize>,
        negative_temperature: Cell<bool>,
    }

    impl Mutator for Checked {
        fn mutate<R: Rng>(
            &self,
            current: &Assignment,
            t: &Temperature,
            rng: &mut R,
        ) -> Assignment {
            if t.current() < 0.0 {
                self.negative_temperature.set(true);
            }
            let next = self.inner.mutate(current, t, rng);
            if next.validate(&self.jobs).is_err() {
                self.violations.set(self.violations.get() + 1);
            }
            next
        }
    }

    /// Wraps the default operator and records the lanes of every output.
    struct Recording {
        inner: BiasedExchange,
        steps: RefCell<Vec<Vec<Vec<u64>>>>,
    }

    impl Recording {
        fn new() -> Self {
            Self {
                inner: BiasedExchange::default(),
                steps: RefCell::new(Vec::new()),
            }
        }
    }

    impl Mutator for Recording {
        fn mutate<R: Rng>(
            &self,
            current: &Assignment,
            t: &Temperature,
            rng: &mut R,
        ) -> Assignment {
            let next = self.inner.mutate(current, t, rng);
            self.steps.borrow_mut().push(next.processor_job_ids());
            next
        }
    }

    fn jobs(durations: &[u64]) -> JobSet {
        JobSet::from_durations(durations).unwrap()
    }

    #[test]
    fn test_stagnation_triggers_cooldown_after_limit() {
        // mean 3: Cauchy gives 1.5 after one cool-down, below the floor of 2
        let set = jobs(&[3, 3]);
        let config = AnnealConfig::default().with_seed(1);
        let annealer = Annealer::with_mutator(config, Frozen::new()).unwrap();
        let result = annealer.run(&set, 2).unwrap();

        assert_eq!(annealer.mutator().calls.get(), 100);
        assert_eq!(result.iterations, 100);
        assert_eq!(result.cooling_steps, 1);
        assert!((result.final_temperature - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_stagnation_resets_after_each_cooldown() {
        // mean 6: 6 -> 3 (continue) -> 2 (stop, not above the floor)
        let set = jobs(&[6, 6, 6]);
        let config = AnnealConfig::default().with_seed(1);
        let annealer = Annealer::with_mutator(config, Frozen::new()).unwrap();
        let result = annealer.run(&set, 2).unwrap();

        assert_eq!(result.iterations, 200);
        assert_eq!(result.cooling_steps, 2);
        assert_eq!(result.objective_history.len(), 3);
        assert_eq!(result.objective_history.last(), Some(&result.objective));
    }

    #[test]
    fn test_custom_stagnation_limit() {
        let set = jobs(&[3, 3]);
        let config = AnnealConfig::default().with_stagnation_limit(7).with_seed(1);
        let result = Annealer::with_mutator(config, Frozen::new())
            .unwrap()
            .run(&set, 3)
            .unwrap();
        assert_eq!(result.iterations, 7);
    }

    #[test]
    fn test_equal_jobs_reach_zero_spread() {
        let set = jobs(&[5, 5, 5, 5]);
        for seed in 0..20 {
            let config = AnnealConfig::default().with_seed(seed);
            let result = Annealer::new(config).unwrap().run(&set, 2).unwrap();
            assert_eq!(result.objective, 0, "seed {seed}");
            assert_eq!(result.assignment.loads(), &[10, 10]);
        }
    }

    #[test]
    fn test_single_processor_run() {
        let set = jobs(&[4, 8, 1]);
        let result = Annealer::new(AnnealConfig::default().with_seed(9))
            .unwrap()
            .run(&set, 1)
            .unwrap();

        assert_eq!(result.objective, 0);
        assert_eq!(result.improving_moves, 0);
        assert_eq!(result.worsening_moves, 0);
        assert_eq!(result.assignment.processor_job_ids(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let set = jobs(&[13, 7, 22, 4, 9, 18, 3, 11, 6, 15, 8, 2]);
        let config = AnnealConfig::default()
            .with_cooling(CoolingLaw::LogDiv)
            .with_max_iterations(5_000)
            .with_seed(123);
        let first = Annealer::with_mutator(config.clone(), Recording::new()).unwrap();
        let second = Annealer::with_mutator(config, Recording::new()).unwrap();

        let a = first.run(&set, 3).unwrap();
        let b = second.run(&set, 3).unwrap();

        let steps_a = first.mutator().steps.borrow();
        let steps_b = second.mutator().steps.borrow();
        assert_eq!(steps_a.len(), a.iterations);
        assert!(!steps_a.is_empty());
        assert_eq!(*steps_a, *steps_b);
        assert_eq!(a.assignment.processor_job_ids(), b.assignment.processor_job_ids());
        assert_eq!(a.objective_history, b.objective_history);
    }

    #[test]
    fn test_run_with_rng_matches_seeded_run() {
        let set = jobs(&[10, 20, 30, 40, 50]);
        let config = AnnealConfig::default().with_max_iterations(5_000).with_seed(77);
        let annealer = Annealer::new(config).unwrap();

        let seeded = annealer.run(&set, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(77);
        let injected = annealer.run_with_rng(&set, 2, &mut rng, None).unwrap();

        assert_eq!(
            seeded.assignment.processor_job_ids(),
            injected.assignment.processor_job_ids()
        );
        assert_eq!(seeded.iterations, injected.iterations);
    }

    #[test]
    fn test_zero_processors_rejected() {
        let set = jobs(&[1, 2]);
        let err = Annealer::new(AnnealConfig::default()).unwrap().run(&set, 0).unwrap_err();
        assert!(matches!(err, BalanceError::InvalidProcessorCount(0)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnnealConfig::default().with_stagnation_limit(0);
        assert!(matches!(
            Annealer::new(config),
            Err(BalanceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_run_from_rejects_foreign_assignment() {
        let set = jobs(&[1, 2]);
        let other = jobs(&[1, 2, 3]);
        let initial = Assignment::new(vec![other.jobs().to_vec()], &other).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let err = Annealer::new(AnnealConfig::default())
            .unwrap()
            .run_from(&set, initial, &mut rng, None)
            .unwrap_err();
        assert!(matches!(err, BalanceError::PartitionInvariantViolation { .. }));
    }

    #[test]
    fn test_run_from_improves_skewed_start() {
        let set = jobs(&[10, 10, 10, 10, 10, 10]);
        let initial = Assignment::new(vec![set.jobs().to_vec(), vec![]], &set).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let config = AnnealConfig::default().with_max_iterations(5_000);
        let result = Annealer::new(config)
            .unwrap()
            .run_from(&set, initial, &mut rng, None)
            .unwrap();

        assert_eq!(result.initial_objective, 60);
        assert!(result.best_objective < 60);
        assert!(result.improving_moves > 0);
    }

    #[test]
    fn test_cancel_before_start() {
        let set = jobs(&[5, 9, 2]);
        let annealer = Annealer::new(AnnealConfig::default().with_seed(3)).unwrap();
        let cancel = Arc::new(AtomicBool::new(true));

        let result = annealer.run_with_cancel(&set, 2, Some(cancel)).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.objective, result.initial_objective);
    }

    #[test]
    fn test_cancel_with_injected_rng() {
        let set = jobs(&[5, 9, 2]);
        let annealer = Annealer::new(AnnealConfig::default()).unwrap();
        let cancel = Arc::new(AtomicBool::new(true));
        let mut rng = StdRng::seed_from_u64(3);

        let result = annealer
            .run_with_rng(&set, 2, &mut rng, Some(cancel))
            .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_cancel_from_given_start() {
        let set = jobs(&[5, 9, 2]);
        let initial = Assignment::new(vec![set.jobs().to_vec(), vec![]], &set).unwrap();
        let cancel = Arc::new(AtomicBool::new(true));
        let mut rng = StdRng::seed_from_u64(3);

        let result = Annealer::new(AnnealConfig::default())
            .unwrap()
            .run_from(&set, initial, &mut rng, Some(cancel))
            .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.objective, 16);
    }

    #[test]
    fn test_max_iterations_budget() {
        // Boltzmann at mean 40 would need ~e^20 cool-downs
        let set = jobs(&[40, 40, 40, 40, 40]);
        let config = AnnealConfig::default()
            .with_cooling(CoolingLaw::Boltzmann)
            .with_max_iterations(1_000)
            .with_seed(8);
        let result = Annealer::new(config).unwrap().run(&set, 3).unwrap();

        assert!(result.budget_exhausted);
        assert_eq!(result.iterations, 1_000);
    }

    #[test]
    fn test_max_cooling_steps_budget() {
        let set = jobs(&[40, 40, 40, 40, 40]);
        let config = AnnealConfig::default()
            .with_cooling(CoolingLaw::Boltzmann)
            .with_max_cooling_steps(5)
            .with_seed(8);
        let result = Annealer::with_mutator(config, Frozen::new())
            .unwrap()
            .run(&set, 3)
            .unwrap();

        assert!(result.budget_exhausted);
        assert_eq!(result.cooling_steps, 5);
        assert_eq!(result.iterations, 500);
    }

    #[test]
    fn test_boltzmann_terminates_for_small_durations() {
        // T_0 = 4: needs ln(1 + k) >= 2, i.e. k >= 7
        let set = jobs(&[4, 4, 4]);
        let config = AnnealConfig::default()
            .with_cooling(CoolingLaw::Boltzmann)
            .with_seed(2);
        let result = Annealer::with_mutator(config, Frozen::new())
            .unwrap()
            .run(&set, 2)
            .unwrap();

        assert_eq!(result.cooling_steps, 7);
        assert!(result.final_temperature <= 2.0);
        assert!(!result.budget_exhausted);
    }

    #[test]
    fn test_zero_durations_terminate() {
        let set = jobs(&[0, 0, 0, 0]);
        let result = Annealer::new(AnnealConfig::default().with_seed(5))
            .unwrap()
            .run(&set, 3)
            .unwrap();
        assert_eq!(result.objective, 0);
        assert_eq!(result.cooling_steps, 1);
    }

    #[test]
    fn test_best_objective_bounds_final() {
        let set = jobs(&[17, 3, 29, 8, 14, 21, 5, 12, 9, 26, 2, 19]);
        let config = AnnealConfig::default().with_max_iterations(5_000).with_seed(31);
        let result = Annealer::new(config).unwrap().run(&set, 4).unwrap();

        assert!(result.best_objective <= result.objective);
        assert!(result.best_objective <= result.initial_objective);
        assert_eq!(result.objective, result.assignment.objective());
        assert_eq!(result.objective_history.first(), Some(&result.initial_objective));
    }

    #[test]
    fn test_report_lists_every_job() {
        let set = JobSet::new(vec![Job::new(10, 4), Job::new(20, 6), Job::new(30, 5)]).unwrap();
        let config = AnnealConfig::default().with_max_iterations(2_000).with_seed(6);
        let result = Annealer::new(config).unwrap().run(&set, 2).unwrap();
        let report = result.report();

        let mut ids: Vec<u64> = report.per_processor.iter().flatten().copied().collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(report.objective, result.objective);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_every_step_keeps_partition(
            durations in prop::collection::vec(0u64..50, 1..40),
            processors in 1usize..6,
            seed in any::<u64>(),
        ) {
            let set = JobSet::from_durations(&durations).unwrap();
            let checked = Checked {
                inner: BiasedExchange::default(),
                jobs: set.clone(),
                violations: Cell::new(0),
                negative_temperature: Cell::new(false),
            };
            let config = AnnealConfig::default()
                .with_cooling(CoolingLaw::LogDiv)
                .with_max_iterations(2_000)
                .with_seed(seed);
            let annealer = Annealer::with_mutator(config, checked).unwrap();
            let result = annealer.run(&set, processors).unwrap();

            prop_assert_eq!(annealer.mutator().violations.get(), 0);
            prop_assert!(!annealer.mutator().negative_temperature.get());
            prop_assert!(result.assignment.validate(&set).is_ok());
            prop_assert_eq!(
                result.assignment.loads().iter().sum::<u64>(),
                set.total_duration()
            );
            let max = *result.assignment.loads().iter().max().unwrap();
            let min = *result.assignment.loads().iter().min().unwrap();
            prop_assert_eq!(result.objective, max - min);
        }
    }
}
