//! Natural history inputs: CD4 decline, HVL setpoint transitions, HIV
//! mortality and opportunistic infections.

use serde::{Deserialize, Serialize};

use super::strata::{CD4_NUM_STRATA, Cd4Table, HVL_NUM_STRATA};

/// Monthly CD4 decline keyed by `[hvl strata][cd4 strata]`.
///
/// Used for absolute CD4 and, in the early childhood branch, for CD4
/// percentage (the column index is then the CD4 percentage stratum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cd4DeclineTable {
    pub mean: [[f64; CD4_NUM_STRATA]; HVL_NUM_STRATA],
    pub sd: [[f64; CD4_NUM_STRATA]; HVL_NUM_STRATA],
}

impl Cd4DeclineTable {
    /// Build a table whose rows grow linearly with HVL strata
    #[must_use]
    pub fn graded(base_mean: f64, step: f64, sd: f64) -> Self {
        let mut mean = [[0.0; CD4_NUM_STRATA]; HVL_NUM_STRATA];
        for (hvl, row) in mean.iter_mut().enumerate() {
            row.fill(base_mean + step * hvl as f64);
        }
        Self {
            mean,
            sd: [[sd; CD4_NUM_STRATA]; HVL_NUM_STRATA],
        }
    }
}

impl Default for Cd4DeclineTable {
    fn default() -> Self {
        Self::graded(0.5, 1.0, 1.0)
    }
}

/// One opportunistic infection type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OiType {
    pub name: String,
    /// Monthly incidence off prophylaxis, by CD4 strata
    pub monthly_prob: Cd4Table,
    /// Severe OIs drive the history class and the severe-history mortality effect
    pub severe: bool,
    /// Death rate ratio in the month the OI occurs
    pub acute_death_rate_ratio: f64,
    /// Death rate ratio while a severe OI is within its history effect window
    pub history_death_rate_ratio: f64,
    /// Months after the OI during which the history ratio applies
    pub history_effect_months: u32,
    pub treatment_cost: f64,
    pub death_cost: f64,
    /// QOL in the month of the acute episode
    pub acute_qol: f64,
    /// Routine care QOL while within the history lookback
    pub history_qol: f64,
    /// Probability that an undetected patient is diagnosed with HIV when presenting
    pub prob_detection: f64,
    /// Probability that a lost patient returns to care when presenting
    pub prob_return_to_care: f64,
}

impl Default for OiType {
    fn default() -> Self {
        Self {
            name: "OI".to_string(),
            monthly_prob: [0.02, 0.012, 0.006, 0.003, 0.0015, 0.0008],
            severe: true,
            acute_death_rate_ratio: 20.0,
            history_death_rate_ratio: 2.0,
            history_effect_months: 12,
            treatment_cost: 1500.0,
            death_cost: 3000.0,
            acute_qol: 0.6,
            history_qol: 0.8,
            prob_detection: 0.5,
            prob_return_to_care: 0.5,
        }
    }
}

/// Opportunistic infection inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OiInputs {
    pub types: Vec<OiType>,
    /// Multiplier on OI incidence for a full responder on suppressive ART
    pub art_effect_ratio: f64,
    /// Months an OI affects routine-care QOL after the episode
    pub history_qol_lookback_months: u32,
}

impl Default for OiInputs {
    fn default() -> Self {
        let mild = OiType {
            name: "mild OI".to_string(),
            monthly_prob: [0.03, 0.02, 0.012, 0.008, 0.004, 0.002],
            severe: false,
            acute_death_rate_ratio: 2.0,
            history_death_rate_ratio: 1.0,
            history_effect_months: 0,
            treatment_cost: 200.0,
            death_cost: 500.0,
            acute_qol: 0.85,
            history_qol: 0.95,
            prob_detection: 0.1,
            prob_return_to_care: 0.1,
        };
        Self {
            types: vec![
                OiType {
                    name: "PCP".to_string(),
                    ..OiType::default()
                },
                OiType {
                    name: "toxoplasmosis".to_string(),
                    monthly_prob: [0.008, 0.004, 0.002, 0.001, 0.0005, 0.0002],
                    ..OiType::default()
                },
                mild,
            ],
            art_effect_ratio: 0.3,
            history_qol_lookback_months: 6,
        }
    }
}

/// Adult natural history inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NatHistInputs {
    pub cd4_decline: Cd4DeclineTable,
    /// Patient-specific decline percentage, drawn once per life
    pub patient_cd4_decline_perc_mean: f64,
    pub patient_cd4_decline_perc_sd: f64,
    /// Months from infection to the chronic transition
    pub acute_to_chronic_months: u32,
    /// `[current setpoint][new setpoint]` transition probabilities at the chronic transition
    pub setpoint_transition: [[f64; HVL_NUM_STRATA]; HVL_NUM_STRATA],
    /// CD4 drop at the chronic transition
    pub chronic_cd4_shift_mean: f64,
    pub chronic_cd4_shift_sd: f64,
    /// HIV death rate ratio by CD4 strata
    pub hiv_death_rate_ratio: Cd4Table,
    pub oi: OiInputs,
}

impl Default for NatHistInputs {
    fn default() -> Self {
        let mut setpoint_transition = [[0.0; HVL_NUM_STRATA]; HVL_NUM_STRATA];
        for (i, row) in setpoint_transition.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self {
            cd4_decline: Cd4DeclineTable::graded(2.0, 1.5, 2.0),
            patient_cd4_decline_perc_mean: 0.0,
            patient_cd4_decline_perc_sd: 0.1,
            acute_to_chronic_months: 2,
            setpoint_transition,
            chronic_cd4_shift_mean: 0.0,
            chronic_cd4_shift_sd: 0.0,
            hiv_death_rate_ratio: [12.0, 6.0, 3.0, 1.8, 1.3, 1.1],
            oi: OiInputs::default(),
        }
    }
}
