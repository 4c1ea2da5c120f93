//! Pediatric, maternal and adolescent inputs.

use serde::{Deserialize, Serialize};

use super::art::ArtLine;
use super::nat_hist::Cd4DeclineTable;
use super::strata::{CD4_PERC_NUM_STRATA, Cd4PercTable, Cd4Table, HVL_NUM_STRATA};
use super::testing::TestChainParams;

/// Number of maternal ART categories (off ART, suppressed, not suppressed)
pub const MATERNAL_ART_NUM: usize = 3;
/// Number of maternal HVL tiers (low, high)
pub const MATERNAL_HVL_NUM: usize = 2;

/// Vertical transmission probabilities around birth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PerinatalTransmission {
    pub in_utero: f64,
    pub intra_partum: f64,
}

/// Infant prophylaxis against postpartum transmission
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfantProph {
    /// Probability the infant receives prophylaxis when the mother's status is known
    pub prob_given_if_status_known: f64,
    pub efficacy: f64,
    pub duration_months: u32,
    pub monthly_cost: f64,
}

impl Default for InfantProph {
    fn default() -> Self {
        Self {
            prob_given_if_status_known: 0.9,
            efficacy: 0.7,
            duration_months: 6,
            monthly_cost: 3.0,
        }
    }
}

/// Early infant diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EidInputs {
    pub enabled: bool,
    /// Ages (months) at which a test is offered to HIV-exposed infants
    pub test_ages_months: Vec<u32>,
    pub chain: TestChainParams,
}

impl Default for EidInputs {
    fn default() -> Self {
        Self {
            enabled: true,
            test_ages_months: vec![2, 9, 18],
            chain: TestChainParams {
                prob_offer: 0.8,
                result_delay_months: 1,
                ..TestChainParams::default()
            },
        }
    }
}

/// Pediatric model inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PedsInputs {
    pub enabled: bool,
    /// Inclusive upper age (months) of early childhood, which uses CD4 percentage
    pub early_childhood_upper_months: u32,
    /// Inclusive upper age (months) of late childhood
    pub late_childhood_upper_months: u32,
    pub prob_breastfeeding: f64,
    pub breastfeeding_stop_age_mean: f64,
    pub breastfeeding_stop_age_sd: f64,
    pub max_breastfeeding_months: u32,
    pub prob_mother_positive: f64,
    pub prob_maternal_status_known: f64,
    /// Maternal ART distribution (off ART, on ART suppressed, on ART not suppressed)
    pub maternal_art_distribution: [f64; MATERNAL_ART_NUM],
    /// Probability of the high HVL tier by maternal ART category
    pub prob_maternal_high_hvl: [f64; MATERNAL_ART_NUM],
    /// Perinatal transmission by `[maternal ART][maternal HVL tier]`
    pub perinatal_transmission: [[PerinatalTransmission; MATERNAL_HVL_NUM]; MATERNAL_ART_NUM],
    /// Monthly postpartum transmission while breastfeeding by `[maternal ART][HVL tier]`
    pub monthly_postpartum_transmission: [[f64; MATERNAL_HVL_NUM]; MATERNAL_ART_NUM],
    /// Monthly probability an HIV-negative mother is infected while breastfeeding
    pub monthly_maternal_incidence: f64,
    pub monthly_maternal_art_dropout: f64,
    pub infant_proph: Option<InfantProph>,
    /// Initial CD4 percentage mean for in utero, intra partum and postpartum infections
    pub initial_cd4_perc_mean: [f64; 3],
    pub initial_cd4_perc_sd: f64,
    pub setpoint_distribution: [f64; HVL_NUM_STRATA],
    pub early_childhood_decline: Cd4DeclineTable,
    pub late_childhood_decline: Cd4DeclineTable,
    pub early_childhood_death_rate_ratio: Cd4PercTable,
    pub late_childhood_death_rate_ratio: Cd4Table,
    /// Mean absolute CD4 assigned at the early→late transition, by CD4 percentage strata
    pub transition_cd4_mean: [f64; CD4_PERC_NUM_STRATA],
    pub transition_cd4_sd: f64,
    pub art_lines: Vec<ArtLine>,
    pub eid: EidInputs,
}

impl Default for PedsInputs {
    fn default() -> Self {
        let peds_line = ArtLine {
            name: "pediatric first line".to_string(),
            cd4_slope_stages: vec![crate::config::art::SlopeStage {
                months_upper: None,
                mean: 0.01,
                sd: 0.002,
            }],
            cd4_noise_sd: 0.002,
            ..ArtLine::default()
        };
        Self {
            enabled: false,
            early_childhood_upper_months: 59,
            late_childhood_upper_months: 155,
            prob_breastfeeding: 0.9,
            breastfeeding_stop_age_mean: 12.0,
            breastfeeding_stop_age_sd: 6.0,
            max_breastfeeding_months: 24,
            prob_mother_positive: 0.1,
            prob_maternal_status_known: 0.8,
            maternal_art_distribution: [0.3, 0.6, 0.1],
            prob_maternal_high_hvl: [0.7, 0.0, 0.6],
            perinatal_transmission: [
                [
                    PerinatalTransmission {
                        in_utero: 0.05,
                        intra_partum: 0.1,
                    },
                    PerinatalTransmission {
                        in_utero: 0.1,
                        intra_partum: 0.15,
                    },
                ],
                [
                    PerinatalTransmission {
                        in_utero: 0.005,
                        intra_partum: 0.005,
                    },
                    PerinatalTransmission {
                        in_utero: 0.01,
                        intra_partum: 0.01,
                    },
                ],
                [
                    PerinatalTransmission {
                        in_utero: 0.03,
                        intra_partum: 0.05,
                    },
                    PerinatalTransmission {
                        in_utero: 0.06,
                        intra_partum: 0.08,
                    },
                ],
            ],
            monthly_postpartum_transmission: [[0.005, 0.01], [0.0005, 0.001], [0.003, 0.006]],
            monthly_maternal_incidence: 0.002,
            monthly_maternal_art_dropout: 0.01,
            infant_proph: Some(InfantProph::default()),
            initial_cd4_perc_mean: [0.25, 0.30, 0.32],
            initial_cd4_perc_sd: 0.08,
            setpoint_distribution: [0.0, 0.0, 0.05, 0.10, 0.20, 0.30, 0.35],
            early_childhood_decline: Cd4DeclineTable::graded(0.002, 0.0005, 0.001),
            late_childhood_decline: Cd4DeclineTable::graded(4.0, 1.0, 2.0),
            early_childhood_death_rate_ratio: [15.0, 8.0, 4.0, 2.5, 1.5, 1.2],
            late_childhood_death_rate_ratio: [10.0, 5.0, 3.0, 1.8, 1.3, 1.1],
            transition_cd4_mean: [80.0, 200.0, 350.0, 500.0, 650.0, 900.0],
            transition_cd4_sd: 50.0,
            art_lines: vec![peds_line],
            eid: EidInputs::default(),
        }
    }
}

/// Adolescent inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdolescentInputs {
    pub enabled: bool,
    /// Inclusive age range (months) during which the adolescent tables apply
    pub lower_age_months: u32,
    pub upper_age_months: u32,
    pub art_lines: Vec<ArtLine>,
    /// Inclusive upper age bounds of the adolescent ART age categories
    pub art_age_category_bounds: Vec<u32>,
    /// Multiplier on suppression probability by adolescent ART age category
    pub suppression_multiplier_by_age_category: Vec<f64>,
    /// Off-ART CD4 decline while in the adolescent age range
    pub cd4_decline: Cd4DeclineTable,
    /// HIV death rate ratio by CD4 strata while in the adolescent age range
    pub hiv_death_rate_ratio: Cd4Table,
}

impl Default for AdolescentInputs {
    fn default() -> Self {
        Self {
            enabled: false,
            lower_age_months: 156,
            upper_age_months: 299,
            art_lines: vec![ArtLine {
                name: "adolescent first line".to_string(),
                ..ArtLine::default()
            }],
            art_age_category_bounds: vec![191, 239],
            suppression_multiplier_by_age_category: vec![0.85, 0.9, 0.95],
            cd4_decline: Cd4DeclineTable::graded(2.0, 1.5, 2.0),
            hiv_death_rate_ratio: [12.0, 6.0, 3.0, 1.8, 1.3, 1.1],
        }
    }
}
