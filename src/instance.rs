//! Job-list files and result reports.
//!
//! An instance file holds three lines: the processor count, the job count,
//! and the comma-separated job durations:
//!
//! ```text
//! 3
//! 5
//! 12,7,30,4,9
//! ```
//!
//! A report lists the job ids placed on each processor followed by the
//! final load spread:
//!
//! ```text
//! proc: number_of_tasks
//! 0 : 2,
//! 1 : 0,3,
//! 2 : 1,4,
//! K_3: 4
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use tracing::info;

use crate::assignment::Assignment;
use crate::error::{BalanceError, Result};
use crate::jobs::JobSet;

/// A balancing problem: processor count plus job durations in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instance {
    pub processors: usize,
    pub durations: Vec<u64>,
}

impl Instance {
    pub fn new(processors: usize, durations: Vec<u64>) -> Result<Self> {
        if processors == 0 {
            return Err(BalanceError::InvalidProcessorCount(processors));
        }
        if durations.is_empty() {
            return Err(BalanceError::EmptyJobSet);
        }
        Ok(Self {
            processors,
            durations,
        })
    }

    /// Draws `jobs` durations uniformly from `min..=max`.
    pub fn generate<R: Rng>(
        processors: usize,
        jobs: usize,
        min: u64,
        max: u64,
        rng: &mut R,
    ) -> Result<Self> {
        if min > max {
            return Err(BalanceError::InvalidInstance(format!(
                "duration range is empty: {min}..={max}"
            )));
        }
        let durations = (0..jobs).map(|_| rng.random_range(min..=max)).collect();
        Self::new(processors, durations)
    }

    /// Parses the three-line text format.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let processors: usize = parse_field(lines.next(), "processor count")?;
        let count: usize = parse_field(lines.next(), "job count")?;

        let durations = match lines.next() {
            Some(line) => line
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u64>().map_err(|e| {
                        BalanceError::InvalidInstance(format!("bad duration '{s}': {e}"))
                    })
                })
                .collect::<Result<Vec<u64>>>()?,
            None => Vec::new(),
        };

        if let Some(extra) = lines.next() {
            return Err(BalanceError::InvalidInstance(format!(
                "unexpected trailing line '{extra}'"
            )));
        }
        if durations.len() != count {
            return Err(BalanceError::InvalidInstance(format!(
                "job count says {count} but {} durations given",
                durations.len()
            )));
        }

        Self::new(processors, durations)
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let instance = Self::parse(&text)?;
        info!(
            path = %path.display(),
            processors = instance.processors,
            jobs = instance.durations.len(),
            "loaded instance"
        );
        Ok(instance)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Jobs with ids `0..n` in input order.
    pub fn job_set(&self) -> Result<JobSet> {
        JobSet::from_durations(&self.durations)
    }
}

fn parse_field(line: Option<&str>, what: &str) -> Result<usize> {
    let line = line.ok_or_else(|| BalanceError::InvalidInstance(format!("missing {what}")))?;
    line.parse()
        .map_err(|e| BalanceError::InvalidInstance(format!("bad {what} '{line}': {e}")))
}

impl FromStr for Instance {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Instance {
    /// Writes the file format; no newline after the durations.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.processors)?;
        writeln!(f, "{}", self.durations.len())?;
        for (i, d) in self.durations.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Final placement handed to reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    /// Job ids per processor, in processor index order.
    pub per_processor: Vec<Vec<u64>>,
    /// Load spread of the placement.
    pub objective: u64,
}

impl Report {
    pub fn from_assignment(assignment: &Assignment) -> Self {
        Self {
            per_processor: assignment.processor_job_ids(),
            objective: assignment.objective(),
        }
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "proc: number_of_tasks")?;
        for (p, ids) in self.per_processor.iter().enumerate() {
            write!(f, "{p} : ")?;
            for id in ids {
                write!(f, "{id},")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "K_3: {}", self.objective)
    }
}
