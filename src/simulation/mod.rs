//! Per-patient driver and parallel cohort runner.

pub mod cohort;
pub mod patient_run;

pub use cohort::{CohortOptions, CohortResults, run_cohort};
pub use patient_run::{initialize_patient, run_month, run_patient};
