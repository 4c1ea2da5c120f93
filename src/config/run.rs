//! Run-level scalars, cohort initialization and background mortality inputs.

use serde::{Deserialize, Serialize};

use super::strata::{CD4_NUM_STRATA, CD4_PERC_NUM_STRATA, GENDER_NUM, HVL_NUM_STRATA};

/// How QOL modifiers for one month are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QolCalcMode {
    /// Each modifier multiplies the running value
    #[default]
    Multiplicative,
    /// Each modifier is a decrement subtracted from the running value
    Subtractive,
    /// The running value is the minimum of all modifiers
    Minimum,
    /// Each modifier is a signed marginal value added to the running value
    Marginal,
}

/// Global adjustment applied to background mortality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MortalityModifier {
    /// `p' = p + m - p*m`, applied on the probability scale
    Incremental(f64),
    /// `rate' = rate * m`
    Multiplicative(f64),
}

/// Run specifications shared by every patient
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSpecs {
    /// Annual discount rate for the primary discounted accumulators
    pub discount_rate_annual: f64,
    /// Additional annual discount rates tracked alongside the primary one
    pub secondary_discount_rates: Vec<f64>,
    /// Patients older than this are removed by background mortality
    pub max_patient_age_months: u32,
    /// Optional horizon; patients still alive after this many months stop
    pub max_months: Option<u32>,
    /// QOL combination rule
    pub qol_calc_mode: QolCalcMode,
    /// Upper clamp for absolute CD4
    pub cd4_max: f64,
    /// Strict upper bounds of the lower five CD4 strata
    pub cd4_strata_upper_bounds: [f64; CD4_NUM_STRATA - 1],
    /// Upper clamp for CD4 percentage (fraction)
    pub cd4_percentage_max: f64,
    /// Strict upper bounds of the lower five CD4 percentage strata
    pub cd4_percentage_strata_upper_bounds: [f64; CD4_PERC_NUM_STRATA - 1],
    /// Number of leading patient ids that emit trace output
    pub num_patients_to_trace: u64,
}

impl Default for RunSpecs {
    fn default() -> Self {
        Self {
            discount_rate_annual: 0.03,
            secondary_discount_rates: vec![0.0, 0.05],
            max_patient_age_months: 100 * 12,
            max_months: None,
            qol_calc_mode: QolCalcMode::Multiplicative,
            cd4_max: 2000.0,
            cd4_strata_upper_bounds: [50.0, 100.0, 200.0, 300.0, 500.0],
            cd4_percentage_max: 1.0,
            cd4_percentage_strata_upper_bounds: [0.05, 0.10, 0.15, 0.20, 0.25],
            num_patients_to_trace: 0,
        }
    }
}

/// Initial HIV state distribution for non-pediatric patients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialHivDistribution {
    pub negative: f64,
    pub acute: f64,
    pub chronic: f64,
}

impl Default for InitialHivDistribution {
    fn default() -> Self {
        Self {
            negative: 0.0,
            acute: 0.0,
            chronic: 1.0,
        }
    }
}

impl InitialHivDistribution {
    /// Probabilities in draw order
    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.negative, self.acute, self.chronic]
    }
}

/// A generic mortality risk factor assigned at initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericRiskFactor {
    pub name: String,
    pub prevalence: f64,
    pub death_rate_ratio: f64,
}

impl Default for GenericRiskFactor {
    fn default() -> Self {
        Self {
            name: "risk factor".to_string(),
            prevalence: 0.0,
            death_rate_ratio: 1.0,
        }
    }
}

/// Cohort characteristics drawn when a patient is created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortInputs {
    pub initial_age_mean_months: f64,
    pub initial_age_sd_months: f64,
    pub prob_male: f64,
    /// Distribution over transmission risk categories
    pub risk_category_distribution: Vec<f64>,
    pub initial_hiv_distribution: InitialHivDistribution,
    pub initial_cd4_mean: f64,
    pub initial_cd4_sd: f64,
    /// When set the mean and sd are on the square-root scale and the draw is squared
    pub initial_cd4_sqrt_transform: bool,
    /// Setpoint HVL distribution by initial CD4 strata
    pub initial_hvl_distribution: [[f64; HVL_NUM_STRATA]; CD4_NUM_STRATA],
    /// HVL distribution for patients starting in acute infection
    pub initial_acute_hvl_distribution: [f64; HVL_NUM_STRATA],
    pub prob_detected_at_init: f64,
    pub prob_linked_at_init: f64,
    pub generic_risk_factors: Vec<GenericRiskFactor>,
}

impl Default for CohortInputs {
    fn default() -> Self {
        Self {
            initial_age_mean_months: 35.0 * 12.0,
            initial_age_sd_months: 10.0 * 12.0,
            prob_male: 0.5,
            risk_category_distribution: vec![0.2, 0.1, 0.7],
            initial_hiv_distribution: InitialHivDistribution::default(),
            initial_cd4_mean: 350.0,
            initial_cd4_sd: 150.0,
            initial_cd4_sqrt_transform: false,
            initial_hvl_distribution: [
                [0.0, 0.02, 0.05, 0.13, 0.25, 0.30, 0.25],
                [0.0, 0.03, 0.07, 0.15, 0.25, 0.30, 0.20],
                [0.0, 0.05, 0.10, 0.20, 0.25, 0.25, 0.15],
                [0.0, 0.08, 0.12, 0.25, 0.25, 0.20, 0.10],
                [0.0, 0.10, 0.15, 0.30, 0.25, 0.15, 0.05],
                [0.0, 0.15, 0.20, 0.30, 0.20, 0.10, 0.05],
            ],
            initial_acute_hvl_distribution: [0.0, 0.0, 0.0, 0.05, 0.15, 0.30, 0.50],
            prob_detected_at_init: 0.0,
            prob_linked_at_init: 1.0,
            generic_risk_factors: Vec::new(),
        }
    }
}

/// Background (non-HIV) mortality
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MortalityInputs {
    /// Monthly background death rate by gender, indexed by age in whole years;
    /// ages past the end of the table use the last entry
    pub background_monthly_rate: [Vec<f64>; GENDER_NUM],
    pub background_modifier: Option<MortalityModifier>,
}

impl Default for MortalityInputs {
    fn default() -> Self {
        // Gompertz-shaped monthly rates; close enough for a runnable baseline
        let table = |scale: f64| -> Vec<f64> {
            (0..=100)
                .map(|age| {
                    let annual = scale * 0.0002 * (0.085 * f64::from(age)).exp();
                    annual.min(0.9) / 12.0
                })
                .collect()
        };
        Self {
            background_monthly_rate: [table(1.2), table(1.0)],
            background_modifier: None,
        }
    }
}
