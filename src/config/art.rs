//! Antiretroviral therapy regimens and response heterogeneity.

use serde::{Deserialize, Serialize};

/// A CD4 slope stage on a suppressive regimen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeStage {
    /// Inclusive last month on regimen covered by this stage; `None` for the final stage
    pub months_upper: Option<u32>,
    pub mean: f64,
    pub sd: f64,
}

/// HVL drift parameters keyed by efficacy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HvlChange {
    pub prob_change_success: f64,
    pub strata_per_month_success: usize,
    pub prob_change_failure: f64,
    pub strata_per_month_failure: usize,
    /// Drift used off ART (e.g. back to setpoint after interruption)
    pub prob_change_off_art: f64,
    pub strata_per_month_off_art: usize,
}

impl Default for HvlChange {
    fn default() -> Self {
        Self {
            prob_change_success: 1.0,
            strata_per_month_success: 2,
            prob_change_failure: 1.0,
            strata_per_month_failure: 1,
            prob_change_off_art: 1.0,
            strata_per_month_off_art: 1,
        }
    }
}

/// Major toxicity of a regimen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtToxicity {
    pub monthly_prob: f64,
    /// Toxicity can only start within this many months of regimen start
    pub window_months: u32,
    pub death_rate_ratio: f64,
    pub cost: f64,
    pub qol_modifier: f64,
    /// A chronic toxicity forces a switch to the next line
    pub forces_switch: bool,
}

impl Default for ArtToxicity {
    fn default() -> Self {
        Self {
            monthly_prob: 0.005,
            window_months: 6,
            death_rate_ratio: 1.5,
            cost: 300.0,
            qol_modifier: 0.9,
            forces_switch: true,
        }
    }
}

/// One ART line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtLine {
    pub name: String,
    /// Added to the patient's propensity logit for this line
    pub propensity_adjustment: f64,
    pub initial_cost: f64,
    pub monthly_cost: f64,
    /// Share of the monthly cost paid by a complete non-responder
    pub non_responder_cost_proportion: f64,
    /// Suppression probability for response factor 0 and 1
    pub prob_suppression_nonresponder: f64,
    pub prob_suppression_responder: f64,
    /// Monthly late failure probability for response factor 0 and 1
    pub late_failure_prob_nonresponder: f64,
    pub late_failure_prob_responder: f64,
    /// Monthly resuppression probability while failed on this line
    pub prob_resuppression: f64,
    pub cd4_slope_stages: Vec<SlopeStage>,
    /// Monthly Gaussian noise around the suppressed slope
    pub cd4_noise_sd: f64,
    pub failed_cd4_multiplier_early: f64,
    pub failed_cd4_multiplier_late: f64,
    /// Months after failure start before the late-stage multiplier replaces the latched one
    pub months_until_late_stage_multiplier: u32,
    pub late_stage_multiplier: f64,
    pub hvl_change: HvlChange,
    /// HVL drift by adolescent ART age category; categories past the end use `hvl_change`
    pub hvl_change_by_age_category: Vec<HvlChange>,
    /// HIV death rate ratio multiplier for a full responder
    pub hiv_mortality_ratio_on_art: f64,
    pub toxicity: Option<ArtToxicity>,
}

impl Default for ArtLine {
    fn default() -> Self {
        Self {
            name: "first line".to_string(),
            propensity_adjustment: 0.0,
            initial_cost: 100.0,
            monthly_cost: 40.0,
            non_responder_cost_proportion: 0.5,
            prob_suppression_nonresponder: 0.3,
            prob_suppression_responder: 0.95,
            late_failure_prob_nonresponder: 0.02,
            late_failure_prob_responder: 0.002,
            prob_resuppression: 0.0,
            cd4_slope_stages: vec![
                SlopeStage {
                    months_upper: Some(2),
                    mean: 40.0,
                    sd: 10.0,
                },
                SlopeStage {
                    months_upper: Some(12),
                    mean: 10.0,
                    sd: 3.0,
                },
                SlopeStage {
                    months_upper: None,
                    mean: 2.0,
                    sd: 1.0,
                },
            ],
            cd4_noise_sd: 5.0,
            failed_cd4_multiplier_early: 1.0,
            failed_cd4_multiplier_late: 0.5,
            months_until_late_stage_multiplier: 12,
            late_stage_multiplier: 1.0,
            hvl_change: HvlChange::default(),
            hvl_change_by_age_category: Vec::new(),
            hiv_mortality_ratio_on_art: 0.3,
            toxicity: Some(ArtToxicity::default()),
        }
    }
}

impl ArtLine {
    /// Slope stage covering the given month on regimen
    #[must_use]
    pub fn slope_stage(&self, months_on_regimen: u32) -> Option<(usize, &SlopeStage)> {
        self.cd4_slope_stages
            .iter()
            .enumerate()
            .find(|(_, stage)| stage.months_upper.is_none_or(|upper| months_on_regimen <= upper))
    }
}

/// Logit bounds mapping the patient's propensity onto a response factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogitBounds {
    /// Logit at or below which the response factor is 0
    pub lower: f64,
    /// Logit at or above which the response factor is 1
    pub upper: f64,
}

impl Default for LogitBounds {
    fn default() -> Self {
        Self {
            lower: -2.0,
            upper: 2.0,
        }
    }
}

impl LogitBounds {
    /// Linear interpolation of `logit` between the bounds, clamped to `[0, 1]`
    #[must_use]
    pub fn response_factor(&self, logit: f64) -> f64 {
        if self.upper <= self.lower {
            return if logit >= self.upper { 1.0 } else { 0.0 };
        }
        ((logit - self.lower) / (self.upper - self.lower)).clamp(0.0, 1.0)
    }
}

/// Response heterogeneity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeterogeneityInputs {
    /// Inclusive upper age bounds (months) of the heterogeneity age categories
    pub age_category_bounds: Vec<u32>,
    /// Mean propensity logit by heterogeneity age category
    pub propensity_mean_by_age_category: Vec<f64>,
    pub propensity_sd: f64,
    pub suppression: LogitBounds,
    pub late_failure: LogitBounds,
    pub art_effect_mortality: LogitBounds,
    pub art_effect_oi: LogitBounds,
    pub resuppression: LogitBounds,
    pub cost: LogitBounds,
    /// Increasing suppression response factor thresholds splitting the four response types
    pub response_type_thresholds: [f64; 3],
}

impl Default for HeterogeneityInputs {
    fn default() -> Self {
        Self {
            age_category_bounds: vec![24 * 12, 50 * 12],
            propensity_mean_by_age_category: vec![0.5, 1.0, 1.0],
            propensity_sd: 1.0,
            suppression: LogitBounds::default(),
            late_failure: LogitBounds::default(),
            art_effect_mortality: LogitBounds::default(),
            art_effect_oi: LogitBounds::default(),
            resuppression: LogitBounds::default(),
            cost: LogitBounds::default(),
            response_type_thresholds: [0.25, 0.5, 0.75],
        }
    }
}

/// Adult ART inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtInputs {
    pub lines: Vec<ArtLine>,
    pub heterogeneity: HeterogeneityInputs,
    /// Cap real CD4 gains by the continuous-suppression envelope
    pub envelope_enabled: bool,
}

impl Default for ArtInputs {
    fn default() -> Self {
        Self {
            lines: vec![
                ArtLine::default(),
                ArtLine {
                    name: "second line".to_string(),
                    initial_cost: 200.0,
                    monthly_cost: 120.0,
                    prob_suppression_nonresponder: 0.25,
                    prob_suppression_responder: 0.9,
                    ..ArtLine::default()
                },
            ],
            heterogeneity: HeterogeneityInputs::default(),
            envelope_enabled: true,
        }
    }
}
