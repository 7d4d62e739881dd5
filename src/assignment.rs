//! Job-to-processor assignments and the load-spread objective.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::Rng;

use crate::error::{BalanceError, Result};
use crate::jobs::{Job, JobSet};

/// Complete partition of a [`JobSet`] across `P` identical processors.
///
/// Each processor's job list ("lane") is an immutable shared snapshot.
/// Producing a neighbor replaces the lanes it touches and shares the rest,
/// so keeping or discarding a candidate is a plain value swap.
///
/// The objective is the load spread: the heaviest processor's total
/// duration minus the lightest one's.
#[derive(Debug, Clone)]
pub struct Assignment {
    lanes: Vec<Arc<[Job]>>,
    loads: Vec<u64>,
    objective: u64,
}

impl Assignment {
    /// Builds an assignment from explicit per-processor job lists.
    ///
    /// Fails if `lanes` is empty or if the jobs across all lanes are not
    /// exactly the jobs of `jobs`, each appearing once.
    pub fn new(lanes: Vec<Vec<Job>>, jobs: &JobSet) -> Result<Self> {
        let lanes: Vec<Arc<[Job]>> = lanes.into_iter().map(Arc::<[Job]>::from).collect();
        // checked before any load is summed: foreign jobs could overflow
        check_partition(&lanes, jobs)?;
        Self::from_lanes(lanes)
    }

    /// Places every job on a uniformly random processor, in job-set order.
    pub fn random<R: Rng>(jobs: &JobSet, processors: usize, rng: &mut R) -> Result<Self> {
        if processors == 0 {
            return Err(BalanceError::InvalidProcessorCount(processors));
        }

        let mut lanes: Vec<Vec<Job>> = vec![Vec::new(); processors];
        for job in jobs.jobs() {
            lanes[rng.random_range(0..processors)].push(*job);
        }

        Self::from_lanes(lanes.into_iter().map(Arc::<[Job]>::from).collect())
    }

    fn from_lanes(lanes: Vec<Arc<[Job]>>) -> Result<Self> {
        if lanes.is_empty() {
            return Err(BalanceError::InvalidProcessorCount(0));
        }
        let loads: Vec<u64> = lanes.iter().map(|lane| lane_load(lane)).collect();
        let objective = spread(&loads);
        Ok(Self {
            lanes,
            loads,
            objective,
        })
    }

    /// Returns a copy with lanes `a` and `b` replaced and every other lane
    /// shared with `self`.
    ///
    /// The caller is responsible for `a_jobs` and `b_jobs` together holding
    /// exactly the jobs previously on `a` and `b`.
    pub(crate) fn with_exchange(
        &self,
        a: usize,
        a_jobs: Vec<Job>,
        b: usize,
        b_jobs: Vec<Job>,
    ) -> Self {
        debug_assert_ne!(a, b);
        debug_assert_eq!(
            a_jobs.len() + b_jobs.len(),
            self.lanes[a].len() + self.lanes[b].len()
        );

        let mut lanes = self.lanes.clone();
        let mut loads = self.loads.clone();
        loads[a] = lane_load(&a_jobs);
        loads[b] = lane_load(&b_jobs);
        lanes[a] = Arc::from(a_jobs);
        lanes[b] = Arc::from(b_jobs);
        let objective = spread(&loads);

        Self {
            lanes,
            loads,
            objective,
        }
    }

    /// Number of processors.
    pub fn processors(&self) -> usize {
        self.lanes.len()
    }

    /// Jobs on processor `p`, in placement order.
    ///
    /// # Panics
    ///
    /// Panics if `p >= self.processors()`.
    pub fn lane(&self, p: usize) -> &[Job] {
        &self.lanes[p]
    }

    /// Sum of durations on processor `p`.
    ///
    /// # Panics
    ///
    /// Panics if `p >= self.processors()`.
    pub fn total_load(&self, p: usize) -> u64 {
        self.loads[p]
    }

    /// Total load of every processor, in index order.
    pub fn loads(&self) -> &[u64] {
        &self.loads
    }

    /// Load spread: `max(load) - min(load)`.
    pub fn objective(&self) -> u64 {
        self.objective
    }

    /// First processor index holding the maximum load.
    pub fn heaviest(&self) -> usize {
        let mut best = 0;
        for (p, &load) in self.loads.iter().enumerate().skip(1) {
            if load > self.loads[best] {
                best = p;
            }
        }
        best
    }

    /// First processor index holding the minimum load.
    pub fn lightest(&self) -> usize {
        let mut best = 0;
        for (p, &load) in self.loads.iter().enumerate().skip(1) {
            if load < self.loads[best] {
                best = p;
            }
        }
        best
    }

    /// Job ids per processor, in index and placement order.
    pub fn processor_job_ids(&self) -> Vec<Vec<u64>> {
        self.lanes
            .iter()
            .map(|lane| lane.iter().map(|j| j.id).collect())
            .collect()
    }

    /// Checks that the lanes hold exactly the jobs of `jobs`, once each.
    pub fn validate(&self, jobs: &JobSet) -> Result<()> {
        check_partition(&self.lanes, jobs)
    }
}

fn check_partition(lanes: &[Arc<[Job]>], jobs: &JobSet) -> Result<()> {
    let expected: HashMap<u64, Job> = jobs.jobs().iter().map(|j| (j.id, *j)).collect();
    let mut seen = HashSet::with_capacity(expected.len());

    for (p, lane) in lanes.iter().enumerate() {
        for job in lane.iter() {
            match expected.get(&job.id) {
                None => {
                    return Err(violation(format!(
                        "job {} on processor {p} is not in the job set",
                        job.id
                    )))
                }
                Some(original) if original != job => {
                    return Err(violation(format!(
                        "job {} on processor {p} has duration {} (expected {})",
                        job.id, job.duration, original.duration
                    )))
                }
                Some(_) => {}
            }
            if !seen.insert(job.id) {
                return Err(violation(format!("job {} assigned more than once", job.id)));
            }
        }
    }

    if seen.len() != expected.len() {
        return Err(violation(format!(
            "{} of {} jobs assigned",
            seen.len(),
            expected.len()
        )));
    }
    Ok(())
}

fn lane_load(lane: &[Job]) -> u64 {
    lane.iter().map(|j| j.duration).sum()
}

fn spread(loads: &[u64]) -> u64 {
    let max = loads.iter().copied().max().unwrap_or(0);
    let min = loads.iter().copied().min().unwrap_or(0);
    max - min
}

fn violation(reason: String) -> BalanceError {
    BalanceError::PartitionInvariantViolation { reason }
}
