//! Tuberculosis natural history, diagnostics, treatment and prophylaxis inputs.

use serde::{Deserialize, Serialize};

use super::strata::{Cd4Table, TB_NUM_STRAINS};
use super::testing::TestChainParams;

/// One TB treatment line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TbTreatmentLine {
    pub duration_months: u32,
    pub initial_cost: f64,
    pub monthly_cost: f64,
    /// Probability of cure at completion by strain
    pub prob_cure: [f64; TB_NUM_STRAINS],
    pub monthly_prob_default: f64,
    /// Death rate ratio multiplier while on treatment
    pub death_rate_ratio_multiplier: f64,
}

impl Default for TbTreatmentLine {
    fn default() -> Self {
        Self {
            duration_months: 6,
            initial_cost: 50.0,
            monthly_cost: 30.0,
            prob_cure: [0.9, 0.5, 0.3],
            monthly_prob_default: 0.01,
            death_rate_ratio_multiplier: 0.5,
        }
    }
}

/// TB preventive therapy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TbProph {
    /// Monthly probability of starting while in HIV care without active TB
    pub monthly_prob_start_in_care: f64,
    pub duration_months: u32,
    /// Relative reduction of reactivation while on proph and for the protection window after
    pub efficacy: f64,
    pub protection_months_after_completion: u32,
    pub monthly_cost: f64,
}

impl Default for TbProph {
    fn default() -> Self {
        Self {
            monthly_prob_start_in_care: 0.1,
            duration_months: 6,
            efficacy: 0.6,
            protection_months_after_completion: 24,
            monthly_cost: 2.0,
        }
    }
}

/// TB inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TbInputs {
    pub enabled: bool,
    pub prob_latent_at_init: f64,
    /// Monthly infection probability (HIV negative, HIV positive)
    pub monthly_infection_prob: [f64; 2],
    /// Multiplier applied to infection probability for the already infected
    pub reinfection_multiplier: f64,
    pub strain_distribution: [f64; TB_NUM_STRAINS],
    pub prob_pulmonary: f64,
    pub monthly_reactivation_prob_hiv_negative: f64,
    pub monthly_reactivation_prob_by_cd4: Cd4Table,
    /// Multiplier on reactivation within `recent_infection_months` of infection
    pub recent_infection_multiplier: f64,
    pub recent_infection_months: u32,
    pub monthly_relapse_prob: f64,
    /// Relapse only possible within this many months of treatment end
    pub relapse_window_months: u32,
    pub monthly_self_cure_prob: f64,
    pub monthly_symptom_prob: f64,
    pub death_rate_ratio_pulmonary: f64,
    pub death_rate_ratio_extrapulmonary: f64,
    pub active_qol_modifier: f64,
    pub death_cost: f64,
    pub testing: TestChainParams,
    /// Routine screening interval for patients in HIV care
    pub screening_interval_months: Option<u32>,
    pub treatment_lines: Vec<TbTreatmentLine>,
    pub proph: Option<TbProph>,
}

impl Default for TbInputs {
    fn default() -> Self {
        Self {
            enabled: false,
            prob_latent_at_init: 0.2,
            monthly_infection_prob: [0.0005, 0.001],
            reinfection_multiplier: 0.5,
            strain_distribution: [0.9, 0.08, 0.02],
            prob_pulmonary: 0.8,
            monthly_reactivation_prob_hiv_negative: 0.0002,
            monthly_reactivation_prob_by_cd4: [0.01, 0.008, 0.005, 0.003, 0.002, 0.001],
            recent_infection_multiplier: 5.0,
            recent_infection_months: 24,
            monthly_relapse_prob: 0.002,
            relapse_window_months: 24,
            monthly_self_cure_prob: 0.01,
            monthly_symptom_prob: 0.5,
            death_rate_ratio_pulmonary: 10.0,
            death_rate_ratio_extrapulmonary: 15.0,
            active_qol_modifier: 0.7,
            death_cost: 2000.0,
            testing: TestChainParams {
                prob_offer: 0.5,
                sensitivity: 0.8,
                specificity: 0.98,
                cost: 20.0,
                confirmatory: Vec::new(),
                prob_link: 0.9,
                ..TestChainParams::default()
            },
            screening_interval_months: Some(12),
            treatment_lines: vec![
                TbTreatmentLine::default(),
                TbTreatmentLine {
                    duration_months: 18,
                    initial_cost: 500.0,
                    monthly_cost: 300.0,
                    prob_cure: [0.9, 0.7, 0.5],
                    ..TbTreatmentLine::default()
                },
            ],
            proph: Some(TbProph::default()),
        }
    }
}
