//! Population accumulators filled during a run.
//!
//! Each cohort worker owns its own `RunStats` and `CostStats`; they are
//! merged once every patient has finished.

pub mod cost_stats;
pub mod run_stats;

pub use cost_stats::{CostCategory, CostStats};
pub use run_stats::{CascadeCounts, RunStats, TbCounts, TestChainCounts};
