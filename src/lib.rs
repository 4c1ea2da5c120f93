//! Monthly Monte Carlo microsimulation of HIV and TB natural history, the
//! HIV care cascade and its costs and quality-adjusted survival.
//!
//! A run simulates patients one at a time. Each patient is created from the
//! cohort inputs, then advanced month by month through a fixed pipeline of
//! updaters until death or the run horizon. Population statistics are
//! accumulated per worker and merged at the end.

pub mod config;
pub mod error;
pub mod patient;
pub mod random;
pub mod simulation;
pub mod stats;
pub mod updaters;
pub mod utils;

// Re-export the most common types for easier use
pub use config::SimContext;
pub use error::{Result, SimError};
pub use patient::{MonthScratch, Patient};
pub use random::{DrawId, PatientStream, RandomStream, ScriptedStream};
pub use simulation::{CohortOptions, CohortResults, run_cohort, run_patient};
pub use stats::{CostCategory, CostStats, RunStats};
pub use updaters::{PIPELINE, Tracer, UpdateContext, Updater};
