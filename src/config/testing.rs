//! HIV acquisition, PrEP, diagnostic test chains, clinic policy and
//! prophylaxis inputs.

use serde::{Deserialize, Serialize};

use super::strata::{GENDER_NUM, HVL_NUM_STRATA};

/// A confirmatory test following a positive result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmatoryTest {
    pub prob_accept: f64,
    pub prob_result_return: f64,
    pub result_delay_months: u32,
    pub sensitivity: f64,
    pub specificity: f64,
    pub cost: f64,
}

impl Default for ConfirmatoryTest {
    fn default() -> Self {
        Self {
            prob_accept: 1.0,
            prob_result_return: 1.0,
            result_delay_months: 0,
            sensitivity: 1.0,
            specificity: 1.0,
            cost: 20.0,
        }
    }
}

/// Parameters of one offer → accept → result → confirm → link chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestChainParams {
    /// Monthly probability a test is offered
    pub prob_offer: f64,
    pub prob_accept: f64,
    pub prob_result_return: f64,
    pub result_delay_months: u32,
    pub sensitivity: f64,
    pub specificity: f64,
    pub cost: f64,
    /// At most two confirmatory tests
    pub confirmatory: Vec<ConfirmatoryTest>,
    /// Probability of linking to care after a confirmed positive
    pub prob_link: f64,
}

impl Default for TestChainParams {
    fn default() -> Self {
        Self {
            prob_offer: 0.01,
            prob_accept: 0.9,
            prob_result_return: 0.95,
            result_delay_months: 0,
            sensitivity: 0.99,
            specificity: 0.995,
            cost: 10.0,
            confirmatory: vec![ConfirmatoryTest::default()],
            prob_link: 0.8,
        }
    }
}

/// Pre-exposure prophylaxis rollout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepInputs {
    pub enabled: bool,
    pub rollout_month: u32,
    /// Cumulative uptake reached after `uptake_duration_months`
    pub coverage: f64,
    pub uptake_duration_months: f64,
    pub uptake_shape: f64,
    /// Cumulative dropout reached after `dropout_duration_months` on PrEP
    pub dropout_coverage: f64,
    pub dropout_duration_months: f64,
    pub dropout_shape: f64,
    /// Relative reduction in infection probability while on PrEP
    pub efficacy: f64,
    pub monthly_cost: f64,
    pub initial_cost: f64,
    /// Risk categories eligible for PrEP; empty means every category
    pub eligible_risk_categories: Vec<usize>,
}

impl Default for PrepInputs {
    fn default() -> Self {
        Self {
            enabled: false,
            rollout_month: 0,
            coverage: 0.5,
            uptake_duration_months: 24.0,
            uptake_shape: 1.0,
            dropout_coverage: 0.3,
            dropout_duration_months: 12.0,
            dropout_shape: 1.0,
            efficacy: 0.9,
            monthly_cost: 30.0,
            initial_cost: 50.0,
            eligible_risk_categories: Vec::new(),
        }
    }
}

/// Incident infection and adult HIV testing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HivTestingInputs {
    pub enabled: bool,
    /// Inclusive upper age bounds (months) of the infection age categories
    pub infection_age_bounds: Vec<u32>,
    /// Monthly infection probability by `[age category][gender]`
    pub monthly_infection_prob: Vec<[f64; GENDER_NUM]>,
    /// Multiplier on infection probability by transmission risk category
    pub risk_multipliers: Vec<f64>,
    pub acute_hvl_distribution: [f64; HVL_NUM_STRATA],
    pub setpoint_distribution: [f64; HVL_NUM_STRATA],
    pub infection_cd4_mean: f64,
    pub infection_cd4_sd: f64,
    pub routine_test: TestChainParams,
    /// Monthly probability that a detected, unlinked patient links to care
    pub monthly_prob_link_after_detection: f64,
    pub prep: PrepInputs,
}

impl Default for HivTestingInputs {
    fn default() -> Self {
        Self {
            enabled: true,
            infection_age_bounds: vec![24 * 12, 49 * 12],
            monthly_infection_prob: vec![[0.0005, 0.0006], [0.0003, 0.0003], [0.00005, 0.00005]],
            risk_multipliers: vec![3.0, 5.0, 1.0],
            acute_hvl_distribution: [0.0, 0.0, 0.0, 0.05, 0.15, 0.30, 0.50],
            setpoint_distribution: [0.0, 0.05, 0.10, 0.25, 0.25, 0.20, 0.15],
            infection_cd4_mean: 600.0,
            infection_cd4_sd: 150.0,
            routine_test: TestChainParams::default(),
            monthly_prob_link_after_detection: 0.1,
            prep: PrepInputs::default(),
        }
    }
}

/// Structured treatment interruption policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StiPolicy {
    /// Interrupt after this many consecutive months suppressed on the regimen
    pub interrupt_after_months_suppressed: u32,
    /// Restart when the observed CD4 falls below this value
    pub restart_cd4_threshold: f64,
}

/// Clinic visit, CD4 testing, ART start policy and loss to follow-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicInputs {
    pub visit_interval_months: u32,
    pub cd4_test_sd: f64,
    pub cd4_perc_test_sd: f64,
    pub cd4_test_cost: f64,
    pub visit_cost: f64,
    /// Start ART when the observed CD4 is below this value; `None` treats everyone
    pub art_start_cd4_threshold: Option<f64>,
    pub art_start_cd4_perc_threshold: Option<f64>,
    pub start_art_on_severe_oi_history: bool,
    pub monthly_prob_ltfu_on_art: f64,
    pub monthly_prob_ltfu_off_art: f64,
    pub monthly_prob_rtc: f64,
    pub sti: Option<StiPolicy>,
}

impl Default for ClinicInputs {
    fn default() -> Self {
        Self {
            visit_interval_months: 3,
            cd4_test_sd: 30.0,
            cd4_perc_test_sd: 0.02,
            cd4_test_cost: 15.0,
            visit_cost: 25.0,
            art_start_cd4_threshold: None,
            art_start_cd4_perc_threshold: None,
            start_art_on_severe_oi_history: true,
            monthly_prob_ltfu_on_art: 0.005,
            monthly_prob_ltfu_off_art: 0.01,
            monthly_prob_rtc: 0.02,
            sti: None,
        }
    }
}

/// One prophylaxis line against an OI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphLine {
    /// Relative reduction in OI incidence
    pub efficacy: f64,
    /// Efficacy once the OI has become resistant
    pub resistant_efficacy: f64,
    pub monthly_cost: f64,
    pub monthly_prob_resistance: f64,
    pub monthly_prob_toxicity: f64,
    pub toxicity_cost: f64,
    pub switch_on_toxicity: bool,
}

impl Default for ProphLine {
    fn default() -> Self {
        Self {
            efficacy: 0.8,
            resistant_efficacy: 0.2,
            monthly_cost: 5.0,
            monthly_prob_resistance: 0.001,
            monthly_prob_toxicity: 0.002,
            toxicity_cost: 50.0,
            switch_on_toxicity: true,
        }
    }
}

/// Prophylaxis policy for one OI type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphPolicy {
    pub start_cd4_below: Option<f64>,
    pub stop_cd4_above: Option<f64>,
    pub lines: Vec<ProphLine>,
}

impl Default for ProphPolicy {
    fn default() -> Self {
        Self {
            start_cd4_below: Some(200.0),
            stop_cd4_above: Some(250.0),
            lines: vec![ProphLine::default()],
        }
    }
}

/// Prophylaxis inputs, one policy per OI type (missing entries mean no proph)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphInputs {
    pub by_oi: Vec<ProphPolicy>,
}

/// HVL testing and failure criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HvlTestInputs {
    pub enabled: bool,
    pub months_to_first_test: u32,
    pub interval_months: u32,
    /// Probability the observed strata is off by one (split evenly up and down)
    pub prob_observation_error: f64,
    pub cost: f64,
    /// Failure when observed strata rose this many strata above the observed nadir
    pub failure_strata_increase: Option<usize>,
    /// Failure when observed strata is at or above the setpoint
    pub failure_at_setpoint: bool,
    /// Failure when observed strata is at or above this stratum
    pub failure_absolute_strata: Option<usize>,
    pub min_months_since_regimen_start: u32,
    pub num_failed_tests_to_diagnose: u32,
    pub switch_on_diagnosed_failure: bool,
}

impl Default for HvlTestInputs {
    fn default() -> Self {
        Self {
            enabled: true,
            months_to_first_test: 6,
            interval_months: 6,
            prob_observation_error: 0.05,
            cost: 40.0,
            failure_strata_increase: Some(2),
            failure_at_setpoint: false,
            failure_absolute_strata: Some(3),
            min_months_since_regimen_start: 6,
            num_failed_tests_to_diagnose: 2,
            switch_on_diagnosed_failure: true,
        }
    }
}
