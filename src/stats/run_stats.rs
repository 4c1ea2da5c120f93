//! Population event counters and survival totals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::patient::{CareState, CauseOfDeath, DetectionMethod, HivState, TestKind};

/// Outcome counters for one diagnostic test chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestChainCounts {
    pub offered: u64,
    pub accepted: u64,
    pub declined: u64,
    pub results_returned: u64,
    pub results_lost: u64,
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
    pub confirmed: u64,
    pub linked: u64,
}

impl TestChainCounts {
    fn merge(&mut self, other: &Self) {
        self.offered += other.offered;
        self.accepted += other.accepted;
        self.declined += other.declined;
        self.results_returned += other.results_returned;
        self.results_lost += other.results_lost;
        self.true_positive += other.true_positive;
        self.false_positive += other.false_positive;
        self.true_negative += other.true_negative;
        self.false_negative += other.false_negative;
        self.confirmed += other.confirmed;
        self.linked += other.linked;
    }
}

/// Care cascade transition counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeCounts {
    pub first_detected: u64,
    pub detected_events: u64,
    pub first_linked: u64,
    pub linked_events: u64,
    pub first_lost: u64,
    pub lost_events: u64,
    pub lost_on_art: u64,
    pub first_returned: u64,
    pub returned_events: u64,
}

impl CascadeCounts {
    fn merge(&mut self, other: &Self) {
        self.first_detected += other.first_detected;
        self.detected_events += other.detected_events;
        self.first_linked += other.first_linked;
        self.linked_events += other.linked_events;
        self.first_lost += other.first_lost;
        self.lost_events += other.lost_events;
        self.lost_on_art += other.lost_on_art;
        self.first_returned += other.first_returned;
        self.returned_events += other.returned_events;
    }
}

/// TB event counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TbCounts {
    pub infections: u64,
    pub reinfections: u64,
    pub activations: u64,
    pub relapses: u64,
    pub self_cures: u64,
    pub treatment_starts: u64,
    pub cures: u64,
    pub treatment_failures: u64,
    pub defaults: u64,
    pub proph_starts: u64,
    pub proph_completions: u64,
}

impl TbCounts {
    fn merge(&mut self, other: &Self) {
        self.infections += other.infections;
        self.reinfections += other.reinfections;
        self.activations += other.activations;
        self.relapses += other.relapses;
        self.self_cures += other.self_cures;
        self.treatment_starts += other.treatment_starts;
        self.cures += other.cures;
        self.treatment_failures += other.treatment_failures;
        self.defaults += other.defaults;
        self.proph_starts += other.proph_starts;
        self.proph_completions += other.proph_completions;
    }
}

/// Population-level run statistics.
///
/// Updaters only ever call the `record_*` methods; totals are read by the
/// driver once the cohort is finished.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub num_patients: u64,
    pub num_hiv_positive_at_init: u64,
    pub deaths_by_family: [u64; CauseOfDeath::FAMILY_COUNT],
    pub deaths_by_oi: Vec<u64>,
    pub deaths_by_chrm: Vec<u64>,
    pub deaths_by_risk_factor: Vec<u64>,
    pub cascade: CascadeCounts,
    pub detections_by_method: [u64; DetectionMethod::COUNT],
    pub incident_infections: u64,
    pub pediatric_infections: [u64; 3],
    pub chronic_transitions: u64,
    pub prep_starts: u64,
    pub prep_dropouts: u64,
    /// First starts of each ART line (restarts are not counted)
    pub art_line_starts: Vec<u64>,
    pub art_starts_total: u64,
    pub art_initial_failures: u64,
    pub art_late_failures: u64,
    pub art_resuppressions: u64,
    pub art_toxicities: u64,
    pub art_interruptions: u64,
    pub art_sti_interruptions: u64,
    pub art_sti_restarts: u64,
    pub oi_events: Vec<u64>,
    pub oi_proph_starts: u64,
    pub oi_proph_resistance: u64,
    pub oi_proph_toxicities: u64,
    pub chrm_onsets: Vec<u64>,
    pub tb: TbCounts,
    pub tests: [TestChainCounts; TestKind::COUNT],
    pub cd4_tests: u64,
    pub hvl_tests: u64,
    pub hvl_tests_failed: u64,
    pub hvl_failures_diagnosed: u64,
    pub patient_months_by_care_state: [u64; CareState::COUNT],
    pub patient_months_by_hiv_state: [u64; HivState::COUNT],
    /// Patients alive at the start of each simulated month
    pub alive_by_month: Vec<u64>,
    pub on_art_by_month: Vec<u64>,
    pub total_lms_undiscounted: f64,
    pub total_lms_discounted: f64,
    pub total_qalms_undiscounted: f64,
    pub total_qalms_discounted: f64,
    pub total_age_at_death_months: f64,
}

/// Increment `counts[index]`, growing the vector if needed
fn bump(counts: &mut Vec<u64>, index: usize) {
    if counts.len() <= index {
        counts.resize(index + 1, 0);
    }
    counts[index] += 1;
}

/// Element-wise add `other` into `counts`
fn add_counts(counts: &mut Vec<u64>, other: &[u64]) {
    if counts.len() < other.len() {
        counts.resize(other.len(), 0);
    }
    for (slot, value) in counts.iter_mut().zip(other) {
        *slot += value;
    }
}

impl RunStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_patient_start(&mut self, hiv_positive: bool) {
        self.num_patients += 1;
        if hiv_positive {
            self.num_hiv_positive_at_init += 1;
        }
    }

    pub fn record_death(&mut self, cause: CauseOfDeath, age_months: u32) {
        self.deaths_by_family[cause.family_index()] += 1;
        match cause {
            CauseOfDeath::AcuteOi(oi) => bump(&mut self.deaths_by_oi, oi),
            CauseOfDeath::Chrm(chrm) => bump(&mut self.deaths_by_chrm, chrm),
            CauseOfDeath::RiskFactor(factor) => bump(&mut self.deaths_by_risk_factor, factor),
            _ => {}
        }
        self.total_age_at_death_months += f64::from(age_months);
    }

    pub fn record_detection(&mut self, method: DetectionMethod, first_time: bool) {
        self.cascade.detected_events += 1;
        self.detections_by_method[method.index()] += 1;
        if first_time {
            self.cascade.first_detected += 1;
        }
    }

    pub fn record_linkage(&mut self, first_time: bool) {
        self.cascade.linked_events += 1;
        if first_time {
            self.cascade.first_linked += 1;
        }
    }

    pub fn record_lost(&mut self, first_time: bool, was_on_art: bool) {
        self.cascade.lost_events += 1;
        if first_time {
            self.cascade.first_lost += 1;
        }
        if was_on_art {
            self.cascade.lost_on_art += 1;
        }
    }

    pub fn record_return_to_care(&mut self, first_time: bool) {
        self.cascade.returned_events += 1;
        if first_time {
            self.cascade.first_returned += 1;
        }
    }

    pub fn record_infection(&mut self) {
        self.incident_infections += 1;
    }

    pub fn record_pediatric_infection(&mut self, route: usize) {
        if let Some(slot) = self.pediatric_infections.get_mut(route) {
            *slot += 1;
        }
    }

    pub fn record_chronic_transition(&mut self) {
        self.chronic_transitions += 1;
    }

    pub fn record_prep_start(&mut self) {
        self.prep_starts += 1;
    }

    pub fn record_prep_dropout(&mut self) {
        self.prep_dropouts += 1;
    }

    /// Record an ART start; line-level counts only on the first start of a line
    pub fn record_art_start(&mut self, line: usize, first_time_on_line: bool) {
        self.art_starts_total += 1;
        if first_time_on_line {
            bump(&mut self.art_line_starts, line);
        }
    }

    pub fn record_art_initial_failure(&mut self) {
        self.art_initial_failures += 1;
    }

    pub fn record_art_late_failure(&mut self) {
        self.art_late_failures += 1;
    }

    pub fn record_art_resuppression(&mut self) {
        self.art_resuppressions += 1;
    }

    pub fn record_art_toxicity(&mut self) {
        self.art_toxicities += 1;
    }

    pub fn record_art_interruption(&mut self) {
        self.art_interruptions += 1;
    }

    pub fn record_sti_interruption(&mut self) {
        self.art_sti_interruptions += 1;
    }

    pub fn record_sti_restart(&mut self) {
        self.art_sti_restarts += 1;
    }

    pub fn record_oi(&mut self, oi: usize) {
        bump(&mut self.oi_events, oi);
    }

    pub fn record_oi_proph_start(&mut self) {
        self.oi_proph_starts += 1;
    }

    pub fn record_oi_proph_resistance(&mut self) {
        self.oi_proph_resistance += 1;
    }

    pub fn record_oi_proph_toxicity(&mut self) {
        self.oi_proph_toxicities += 1;
    }

    pub fn record_chrm_onset(&mut self, chrm: usize) {
        bump(&mut self.chrm_onsets, chrm);
    }

    /// Mutable access to the TB counters
    pub fn tb_mut(&mut self) -> &mut TbCounts {
        &mut self.tb
    }

    /// Mutable access to the counters of one test chain
    pub fn test_mut(&mut self, kind: TestKind) -> &mut TestChainCounts {
        &mut self.tests[kind.index()]
    }

    pub fn record_cd4_test(&mut self) {
        self.cd4_tests += 1;
    }

    pub fn record_hvl_test(&mut self, failed: bool) {
        self.hvl_tests += 1;
        if failed {
            self.hvl_tests_failed += 1;
        }
    }

    pub fn record_hvl_failure_diagnosed(&mut self) {
        self.hvl_failures_diagnosed += 1;
    }

    /// Record one patient-month of exposure at the start of `month`
    pub fn record_exposure(&mut self, month: u32, care: CareState, hiv: HivState, on_art: bool) {
        self.patient_months_by_care_state[care.index()] += 1;
        self.patient_months_by_hiv_state[hiv.index()] += 1;
        let month = month as usize;
        bump(&mut self.alive_by_month, month);
        if on_art {
            bump(&mut self.on_art_by_month, month);
        } else if self.on_art_by_month.len() <= month {
            self.on_art_by_month.resize(month + 1, 0);
        }
    }

    pub fn record_survival(&mut self, lms: f64, lms_discounted: f64, qalms: f64, qalms_discounted: f64) {
        self.total_lms_undiscounted += lms;
        self.total_lms_discounted += lms_discounted;
        self.total_qalms_undiscounted += qalms;
        self.total_qalms_discounted += qalms_discounted;
    }

    #[must_use]
    pub fn total_deaths(&self) -> u64 {
        self.deaths_by_family.iter().sum()
    }

    /// Mean undiscounted life months per patient
    #[must_use]
    pub fn mean_life_months(&self) -> f64 {
        if self.num_patients == 0 {
            return 0.0;
        }
        self.total_lms_undiscounted / self.num_patients as f64
    }

    /// Fold another worker's statistics into this one
    pub fn merge(&mut self, other: &Self) {
        self.num_patients += other.num_patients;
        self.num_hiv_positive_at_init += other.num_hiv_positive_at_init;
        for (slot, value) in self.deaths_by_family.iter_mut().zip(&other.deaths_by_family) {
            *slot += value;
        }
        add_counts(&mut self.deaths_by_oi, &other.deaths_by_oi);
        add_counts(&mut self.deaths_by_chrm, &other.deaths_by_chrm);
        add_counts(&mut self.deaths_by_risk_factor, &other.deaths_by_risk_factor);
        self.cascade.merge(&other.cascade);
        for (slot, value) in self
            .detections_by_method
            .iter_mut()
            .zip(&other.detections_by_method)
        {
            *slot += value;
        }
        self.incident_infections += other.incident_infections;
        for (slot, value) in self
            .pediatric_infections
            .iter_mut()
            .zip(&other.pediatric_infections)
        {
            *slot += value;
        }
        self.chronic_transitions += other.chronic_transitions;
        self.prep_starts += other.prep_starts;
        self.prep_dropouts += other.prep_dropouts;
        add_counts(&mut self.art_line_starts, &other.art_line_starts);
        self.art_starts_total += other.art_starts_total;
        self.art_initial_failures += other.art_initial_failures;
        self.art_late_failures += other.art_late_failures;
        self.art_resuppressions += other.art_resuppressions;
        self.art_toxicities += other.art_toxicities;
        self.art_interruptions += other.art_interruptions;
        self.art_sti_interruptions += other.art_sti_interruptions;
        self.art_sti_restarts += other.art_sti_restarts;
        add_counts(&mut self.oi_events, &other.oi_events);
        self.oi_proph_starts += other.oi_proph_starts;
        self.oi_proph_resistance += other.oi_proph_resistance;
        self.oi_proph_toxicities += other.oi_proph_toxicities;
        add_counts(&mut self.chrm_onsets, &other.chrm_onsets);
        self.tb.merge(&other.tb);
        for (slot, value) in self.tests.iter_mut().zip(&other.tests) {
            slot.merge(value);
        }
        self.cd4_tests += other.cd4_tests;
        self.hvl_tests += other.hvl_tests;
        self.hvl_tests_failed += other.hvl_tests_failed;
        self.hvl_failures_diagnosed += other.hvl_failures_diagnosed;
        for (slot, value) in self
            .patient_months_by_care_state
            .iter_mut()
            .zip(&other.patient_months_by_care_state)
        {
            *slot += value;
        }
        for (slot, value) in self
            .patient_months_by_hiv_state
            .iter_mut()
            .zip(&other.patient_months_by_hiv_state)
        {
            *slot += value;
        }
        add_counts(&mut self.alive_by_month, &other.alive_by_month);
        add_counts(&mut self.on_art_by_month, &other.on_art_by_month);
        self.total_lms_undiscounted += other.total_lms_undiscounted;
        self.total_lms_discounted += other.total_lms_discounted;
        self.total_qalms_undiscounted += other.total_qalms_undiscounted;
        self.total_qalms_discounted += other.total_qalms_discounted;
        self.total_age_at_death_months += other.total_age_at_death_months;
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run Statistics:")?;
        writeln!(f, "  Patients: {}", self.num_patients)?;
        writeln!(f, "  HIV Positive at Start: {}", self.num_hiv_positive_at_init)?;
        writeln!(f, "  Incident Infections: {}", self.incident_infections)?;
        writeln!(f, "  Deaths: {}", self.total_deaths())?;
        writeln!(f, "  Mean Life Months: {:.2}", self.mean_life_months())?;
        if self.num_patients > 0 {
            let n = self.num_patients as f64;
            writeln!(f, "  Mean QALMs: {:.2}", self.total_qalms_undiscounted / n)?;
            writeln!(f, "  Mean Discounted QALMs: {:.2}", self.total_qalms_discounted / n)?;
        }
        writeln!(f, "  First Detections: {}", self.cascade.first_detected)?;
        writeln!(f, "  First Linkages: {}", self.cascade.first_linked)?;
        writeln!(f, "  First LTFU: {}", self.cascade.first_lost)?;
        writeln!(f, "  ART Starts: {}", self.art_starts_total)?;
        writeln!(f, "  OI Events: {}", self.oi_events.iter().sum::<u64>())?;
        writeln!(f, "  TB Activations: {}", self.tb.activations)?;
        Ok(())
    }
}
