//! Parallel cohort runs.
//!
//! Patients are split into fixed-size chunks that rayon workers process
//! independently, each with its own statistics. Every patient draws from its
//! own stream keyed by the run seed and the patient id, and chunk results are
//! merged in chunk order after all workers finish, so the totals do not
//! depend on the number of threads.

use std::fmt;
use std::time::{Duration, Instant};

use log::info;
use rayon::prelude::*;

use super::patient_run::run_patient;
use crate::config::SimContext;
use crate::error::Result;
use crate::random::PatientStream;
use crate::stats::{CostStats, RunStats};
use crate::utils::cohort_progress_bar;

/// Patients per work unit
pub const DEFAULT_CHUNK_SIZE: u64 = 256;

/// How a cohort is run
#[derive(Debug, Clone)]
pub struct CohortOptions {
    pub num_patients: u64,
    pub seed: u64,
    /// Worker threads; `None` uses one per CPU
    pub num_threads: Option<usize>,
    pub chunk_size: u64,
    pub show_progress: bool,
}

impl Default for CohortOptions {
    fn default() -> Self {
        Self {
            num_patients: 1000,
            seed: 42,
            num_threads: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            show_progress: false,
        }
    }
}

/// Merged statistics of a cohort run
#[derive(Debug, Clone)]
pub struct CohortResults {
    pub run_stats: RunStats,
    pub cost_stats: CostStats,
    pub elapsed: Duration,
}

impl CohortResults {
    /// Mean undiscounted cost per patient
    #[must_use]
    pub fn mean_cost(&self) -> f64 {
        if self.run_stats.num_patients == 0 {
            return 0.0;
        }
        self.cost_stats.total_undiscounted() / self.run_stats.num_patients as f64
    }
}

impl fmt::Display for CohortResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.run_stats;
        writeln!(f, "Cohort Results:")?;
        writeln!(f, "  Patients: {}", stats.num_patients)?;
        writeln!(f, "  HIV positive at start: {}", stats.num_hiv_positive_at_init)?;
        writeln!(f, "  Incident infections: {}", stats.incident_infections)?;
        writeln!(f, "  Deaths: {}", stats.total_deaths())?;
        writeln!(f, "  Mean life months: {:.2}", stats.mean_life_months())?;
        writeln!(f, "  Total QALMs (discounted): {:.2}", stats.total_qalms_discounted)?;
        writeln!(f, "  Mean cost (undiscounted): {:.2}", self.mean_cost())?;
        writeln!(f, "  Elapsed: {:?}", self.elapsed)?;
        write!(f, "{}", self.cost_stats)
    }
}

/// Run patients `[start, end)` sequentially into fresh accumulators
fn run_chunk(config: &SimContext, seed: u64, start: u64, end: u64) -> (RunStats, CostStats) {
    let mut run_stats = RunStats::new();
    let mut cost_stats = CostStats::new();
    for patient_id in start..end {
        let mut rng = PatientStream::new(seed, patient_id);
        run_patient(patient_id, config, &mut rng, &mut run_stats, &mut cost_stats);
    }
    (run_stats, cost_stats)
}

/// Simulate a cohort in parallel and merge the per-chunk statistics
pub fn run_cohort(config: &SimContext, options: &CohortOptions) -> Result<CohortResults> {
    let start = Instant::now();
    let num_threads = options.num_threads.unwrap_or_else(num_cpus::get).max(1);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(num_threads).build()?;
    let chunk_size = options.chunk_size.max(1);
    let num_chunks = options.num_patients.div_ceil(chunk_size);
    info!(
        "Simulating {} patients in {} chunks on {} threads (seed {})",
        options.num_patients, num_chunks, num_threads, options.seed
    );

    let pb = cohort_progress_bar(options.num_patients, options.show_progress, "Simulating");
    let chunks: Vec<(RunStats, CostStats)> = pool.install(|| {
        (0..num_chunks)
            .into_par_iter()
            .map(|chunk| {
                let first = chunk * chunk_size;
                let last = (first + chunk_size).min(options.num_patients);
                let result = run_chunk(config, options.seed, first, last);
                pb.inc(last - first);
                result
            })
            .collect()
    });
    pb.finish_with_message("Simulation complete");

    let mut run_stats = RunStats::new();
    let mut cost_stats = CostStats::new();
    for (chunk_run, chunk_cost) in &chunks {
        run_stats.merge(chunk_run);
        cost_stats.merge(chunk_cost);
    }
    let elapsed = start.elapsed();
    info!(
        "Finished {} patients in {:?}: {} deaths, mean life months {:.2}",
        run_stats.num_patients,
        elapsed,
        run_stats.total_deaths(),
        run_stats.mean_life_months()
    );
    Ok(CohortResults {
        run_stats,
        cost_stats,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimContext {
        let mut config = SimContext::default();
        config.run.max_months = Some(24);
        config
    }

    #[test]
    fn test_totals_independent_of_threads_and_chunks() {
        let config = small_config();
        let one = run_cohort(
            &config,
            &CohortOptions {
                num_patients: 40,
                num_threads: Some(1),
                chunk_size: 40,
                ..CohortOptions::default()
            },
        )
        .unwrap();
        let many = run_cohort(
            &config,
            &CohortOptions {
                num_patients: 40,
                num_threads: Some(4),
                chunk_size: 40,
                ..CohortOptions::default()
            },
        )
        .unwrap();
        assert_eq!(one.run_stats.num_patients, 40);
        assert_eq!(one.run_stats.deaths_by_family, many.run_stats.deaths_by_family);
        assert_eq!(one.run_stats.total_lms_undiscounted, many.run_stats.total_lms_undiscounted);
        assert_eq!(one.cost_stats.undiscounted, many.cost_stats.undiscounted);

        let rechunked = run_cohort(
            &config,
            &CohortOptions {
                num_patients: 40,
                chunk_size: 7,
                ..CohortOptions::default()
            },
        )
        .unwrap();
        assert_eq!(one.run_stats.deaths_by_family, rechunked.run_stats.deaths_by_family);
        assert_eq!(one.run_stats.alive_by_month, rechunked.run_stats.alive_by_month);
    }

    #[test]
    fn test_empty_cohort() {
        let results = run_cohort(
            &SimContext::default(),
            &CohortOptions {
                num_patients: 0,
                ..CohortOptions::default()
            },
        )
        .unwrap();
        assert_eq!(results.run_stats.num_patients, 0);
        assert_eq!(results.mean_cost(), 0.0);
    }
}
