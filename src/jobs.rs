//! Jobs and job sets.

use std::collections::HashSet;

use crate::error::{BalanceError, Result};

/// A unit of work with a fixed processing duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Job {
    /// Stable identity, unique within a [`JobSet`].
    pub id: u64,
    /// Processing duration.
    pub duration: u64,
}

impl Job {
    pub fn new(id: u64, duration: u64) -> Self {
        Self { id, duration }
    }
}

/// Ordered, non-empty collection of jobs with unique ids.
///
/// The total duration must fit in a `u64`, so every processor load of an
/// assignment built from the set fits too.
///
/// # Examples
///
/// ```
/// use u_balance::JobSet;
///
/// let jobs = JobSet::from_durations(&[4, 6, 8]).unwrap();
/// assert_eq!(jobs.len(), 3);
/// assert!((jobs.mean_duration() - 6.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct JobSet {
    jobs: Vec<Job>,
    total_duration: u64,
    mean_duration: f64,
}

impl JobSet {
    /// Builds a job set from explicit jobs, keeping their order.
    pub fn new(jobs: Vec<Job>) -> Result<Self> {
        if jobs.is_empty() {
            return Err(BalanceError::EmptyJobSet);
        }

        let mut seen = HashSet::with_capacity(jobs.len());
        for job in &jobs {
            if !seen.insert(job.id) {
                return Err(BalanceError::DuplicateJobId(job.id));
            }
        }

        let total_duration = jobs
            .iter()
            .try_fold(0u64, |acc, j| acc.checked_add(j.duration))
            .ok_or_else(|| {
                BalanceError::InvalidInstance("total duration overflows u64".into())
            })?;
        let mean_duration = total_duration as f64 / jobs.len() as f64;

        Ok(Self {
            jobs,
            total_duration,
            mean_duration,
        })
    }

    /// Builds a job set from durations; ids are assigned `0..n` in order.
    pub fn from_durations(durations: &[u64]) -> Result<Self> {
        let jobs = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| Job::new(i as u64, d))
            .collect();
        Self::new(jobs)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Always `false`: construction rejects empty sets.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Arithmetic mean of all durations.
    pub fn mean_duration(&self) -> f64 {
        self.mean_duration
    }

    /// Sum of all durations.
    pub fn total_duration(&self) -> u64 {
        self.total_duration
    }
}
