//! Cohort progress reporting over indicatif.

use indicatif::{ProgressBar, ProgressStyle};

/// Bar layout: elapsed time, bar, patients done and patients per second
pub const COHORT_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} patients ({per_sec}) {msg}";

/// Progress bar over `num_patients`; hidden unless `visible`, so workers can
/// tick it unconditionally
#[must_use]
pub fn cohort_progress_bar(num_patients: u64, visible: bool, message: &str) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(num_patients);
    let style = ProgressStyle::default_bar()
        .template(COHORT_TEMPLATE)
        .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("#>-"));
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}
