//! The simulated patient.
//!
//! A `Patient` owns every piece of mutable state for one simulated life. It is
//! created blank by [`Patient::new`], filled in by the initial updates of each
//! updater and then mutated month by month.

pub mod month;
pub mod state;
pub mod types;

use serde::{Deserialize, Serialize};

use crate::config::SimContext;

pub use month::{MonthScratch, MortalityRisk};
pub use state::{
    ArtState, Cd4Envelope, DiseaseState, GeneralState, MonitoringState, OiProphState,
    PedsState, PendingTestResult, ProphState, TbState, ToxicityEvent,
};
pub use types::{
    ArtEfficacy, CareState, CauseOfDeath, DetectionMethod, FailureType, HetOutcome, HivState,
    LtfuState, MaternalArt, MaternalHivState, MaternalHvl, OiHistoryClass, PedsAgeCategory,
    PedsHivType, ResponseType, StiState, TbStatus, TbStrain, TestKind,
};

/// One simulated patient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Patient {
    pub general: GeneralState,
    pub disease: DiseaseState,
    pub art: ArtState,
    pub monitoring: MonitoringState,
    pub proph: ProphState,
    pub tb: TbState,
    pub peds: PedsState,
}

impl Patient {
    /// Create a blank patient with every per-type table sized from the configuration
    #[must_use]
    pub fn new(patient_id: u64, context: &SimContext) -> Self {
        let secondary = context.run.secondary_discount_rates.len();
        let num_oi = context.nat_hist.oi.types.len();
        let num_lines = context
            .art
            .lines
            .len()
            .max(context.peds.art_lines.len())
            .max(context.adolescent.art_lines.len());

        let general = GeneralState {
            patient_id,
            is_alive: true,
            tracing_enabled: patient_id < context.run.num_patients_to_trace,
            risk_factors: vec![false; context.cohort.generic_risk_factors.len()],
            discount_factor: 1.0,
            secondary_discount_factors: vec![1.0; secondary],
            costs_secondary_discounted: vec![0.0; secondary],
            lms_secondary_discounted: vec![0.0; secondary],
            qalms_secondary_discounted: vec![0.0; secondary],
            qol_value: 1.0,
            ..GeneralState::default()
        };
        let disease = DiseaseState {
            last_oi_month: vec![None; num_oi],
            chrm_onset_months: vec![None; context.chrms.chrms.len()],
            ..DiseaseState::default()
        };
        let art = ArtState {
            has_taken_line: vec![false; num_lines],
            response_factors: [1.0; HetOutcome::COUNT],
            ..ArtState::default()
        };
        let proph = ProphState {
            by_oi: vec![OiProphState::default(); num_oi],
        };

        Self {
            general,
            disease,
            art,
            proph,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.general.is_alive
    }

    #[must_use]
    pub const fn is_hiv_positive(&self) -> bool {
        self.disease.hiv_state.is_positive()
    }

    /// Months spent on the current regimen, `None` when off ART
    #[must_use]
    pub fn months_on_regimen(&self) -> Option<u32> {
        if !self.art.is_on_art {
            return None;
        }
        self.art
            .month_started
            .map(|start| self.general.month_num.saturating_sub(start))
    }

    /// Whether the current regimen is suppressing the virus
    #[must_use]
    pub fn is_suppressed_on_art(&self) -> bool {
        self.art.is_on_art && self.art.efficacy == ArtEfficacy::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient_tables_match_config() {
        let context = SimContext::default();
        let patient = Patient::new(7, &context);
        assert!(patient.is_alive());
        assert_eq!(patient.general.patient_id, 7);
        assert_eq!(patient.disease.last_oi_month.len(), context.nat_hist.oi.types.len());
        assert_eq!(patient.proph.by_oi.len(), context.nat_hist.oi.types.len());
        assert_eq!(
            patient.general.secondary_discount_factors.len(),
            context.run.secondary_discount_rates.len()
        );
        assert_eq!(patient.general.discount_factor, 1.0);
    }

    #[test]
    fn test_tracing_only_for_leading_ids() {
        let mut context = SimContext::default();
        context.run.num_patients_to_trace = 2;
        assert!(Patient::new(1, &context).general.tracing_enabled);
        assert!(!Patient::new(2, &context).general.tracing_enabled);
    }

    #[test]
    fn test_months_on_regimen() {
        let mut patient = Patient::new(0, &SimContext::default());
        assert_eq!(patient.months_on_regimen(), None);
        patient.art.is_on_art = true;
        patient.art.month_started = Some(4);
        patient.general.month_num = 10;
        assert_eq!(patient.months_on_regimen(), Some(6));
    }
}
