//! Utility functions shared by the runner and the binary

pub mod progress;

pub use progress::cohort_progress_bar;
