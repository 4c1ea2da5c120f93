//! Values that only live for the current simulated month.
//!
//! The driver creates a fresh `MonthScratch` at the start of every month and
//! hands it to each updater, so nothing here has to be cleared by hand.

use smallvec::SmallVec;

use super::types::CauseOfDeath;

/// A competing mortality risk for this month
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MortalityRisk {
    pub cause: CauseOfDeath,
    pub rate_ratio: f64,
    /// One-time cost charged if this risk is the cause of death
    pub death_cost: f64,
}

/// Per-month scratch state shared by the updaters of one month
#[derive(Debug, Clone)]
pub struct MonthScratch {
    pub mortality_risks: SmallVec<[MortalityRisk; 8]>,
    /// OI type that occurred this month
    pub acute_oi: Option<usize>,
    /// ART line whose toxicity occurred this month
    pub art_toxicity: Option<usize>,
    pub qol_modifiers: SmallVec<[f64; 4]>,
    /// Risk resolved as the cause of death this month
    pub death: Option<MortalityRisk>,
    /// Whether ART was started this month (the full initial cost applies)
    pub art_started: bool,
}

impl Default for MonthScratch {
    fn default() -> Self {
        Self::new()
    }
}

impl MonthScratch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mortality_risks: SmallVec::new(),
            acute_oi: None,
            art_toxicity: None,
            qol_modifiers: SmallVec::new(),
            death: None,
            art_started: false,
        }
    }

    /// Register a competing mortality risk for this month
    pub fn add_mortality_risk(&mut self, cause: CauseOfDeath, rate_ratio: f64, death_cost: f64) {
        self.mortality_risks.push(MortalityRisk {
            cause,
            rate_ratio,
            death_cost,
        });
    }

    /// Queue a QOL modifier for end-of-month settlement
    pub fn add_qol_modifier(&mut self, modifier: f64) {
        self.qol_modifiers.push(modifier);
    }

    /// Product of all registered rate ratios
    #[must_use]
    pub fn combined_rate_ratio(&self) -> f64 {
        self.mortality_risks.iter().map(|r| r.rate_ratio).product()
    }

    #[must_use]
    pub const fn died(&self) -> bool {
        self.death.is_some()
    }
}
