//! Cost, quality-of-life and chronic comorbidity inputs.

use serde::{Deserialize, Serialize};

use super::strata::Cd4Table;
use crate::patient::CauseOfDeath;

/// A value per cause-of-death family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathCauseTable {
    pub background: f64,
    pub hiv: f64,
    pub acute_oi: f64,
    pub tb: f64,
    pub art_toxicity: f64,
    pub chrm: f64,
    pub risk_factor: f64,
}

impl DeathCauseTable {
    /// Same value for every cause
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self {
            background: value,
            hiv: value,
            acute_oi: value,
            tb: value,
            art_toxicity: value,
            chrm: value,
            risk_factor: value,
        }
    }

    /// Look up the entry for a cause
    #[must_use]
    pub const fn get(&self, cause: CauseOfDeath) -> f64 {
        match cause {
            CauseOfDeath::Background => self.background,
            CauseOfDeath::Hiv => self.hiv,
            CauseOfDeath::AcuteOi(_) => self.acute_oi,
            CauseOfDeath::Tb => self.tb,
            CauseOfDeath::ArtToxicity => self.art_toxicity,
            CauseOfDeath::Chrm(_) => self.chrm,
            CauseOfDeath::RiskFactor(_) => self.risk_factor,
        }
    }
}

impl Default for DeathCauseTable {
    fn default() -> Self {
        Self::uniform(0.0)
    }
}

/// Monthly routine care cost by cost age category for each care setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutineCareCosts {
    pub hiv_negative: Vec<f64>,
    pub undetected: Vec<f64>,
    pub detected_unlinked: Vec<f64>,
    pub in_care_off_art: Vec<f64>,
    pub in_care_on_art: Vec<f64>,
    pub lost: Vec<f64>,
}

impl Default for RoutineCareCosts {
    fn default() -> Self {
        Self {
            hiv_negative: vec![10.0, 15.0, 25.0],
            undetected: vec![15.0, 20.0, 30.0],
            detected_unlinked: vec![15.0, 20.0, 30.0],
            in_care_off_art: vec![40.0, 50.0, 60.0],
            in_care_on_art: vec![50.0, 60.0, 70.0],
            lost: vec![15.0, 20.0, 30.0],
        }
    }
}

/// Cost inputs not attached to a specific intervention section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostInputs {
    /// Inclusive upper age bounds (months) of the cost age categories
    pub age_category_bounds: Vec<u32>,
    pub routine_care: RoutineCareCosts,
    pub death_cost_by_cause: DeathCauseTable,
    /// Additional end-of-life cost for patients dying in care, by cost age category
    pub death_cost_in_care_by_age: Vec<f64>,
}

impl Default for CostInputs {
    fn default() -> Self {
        Self {
            age_category_bounds: vec![14 * 12, 64 * 12],
            routine_care: RoutineCareCosts::default(),
            death_cost_by_cause: DeathCauseTable {
                background: 500.0,
                hiv: 2000.0,
                acute_oi: 1000.0,
                tb: 1000.0,
                art_toxicity: 1000.0,
                chrm: 1500.0,
                risk_factor: 500.0,
            },
            death_cost_in_care_by_age: vec![500.0, 800.0, 1000.0],
        }
    }
}

/// Quality-of-life inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QolInputs {
    pub hiv_negative: f64,
    pub undetected_by_cd4: Cd4Table,
    pub routine_care_by_cd4: Cd4Table,
    pub death_by_cause: DeathCauseTable,
}

impl Default for QolInputs {
    fn default() -> Self {
        Self {
            hiv_negative: 1.0,
            undetected_by_cd4: [0.75, 0.8, 0.85, 0.9, 0.92, 0.95],
            routine_care_by_cd4: [0.78, 0.82, 0.87, 0.91, 0.94, 0.96],
            death_by_cause: DeathCauseTable::uniform(0.5),
        }
    }
}

/// A chronic non-HIV, non-TB comorbidity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chrm {
    pub name: String,
    /// Prevalence at initialization (HIV negative, HIV positive)
    pub prevalence: [f64; 2],
    /// Monthly incidence (HIV negative, HIV positive)
    pub monthly_incidence: [f64; 2],
    pub death_rate_ratio: f64,
    pub monthly_cost: f64,
    pub qol_modifier: f64,
}

impl Default for Chrm {
    fn default() -> Self {
        Self {
            name: "comorbidity".to_string(),
            prevalence: [0.05, 0.08],
            monthly_incidence: [0.0005, 0.001],
            death_rate_ratio: 1.5,
            monthly_cost: 20.0,
            qol_modifier: 0.95,
        }
    }
}

/// Chronic comorbidity inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChrmInputs {
    pub enabled: bool,
    pub chrms: Vec<Chrm>,
}
