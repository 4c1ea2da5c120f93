//! Per-axis state records owned by a `Patient`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::types::{
    ArtEfficacy, CareState, CauseOfDeath, DetectionMethod, FailureType, HetOutcome, HivState,
    LtfuState, MaternalArt, MaternalHivState, MaternalHvl, OiHistoryClass, PedsAgeCategory,
    PedsHivType, ResponseType, StiState, TbStatus, TbStrain,
};
use crate::config::Gender;

/// Demographics, survival and lifetime accumulators
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralState {
    pub patient_id: u64,
    pub month_num: u32,
    pub age_months: u32,
    pub initial_age_months: u32,
    pub gender: Gender,
    pub is_pediatric: bool,
    pub is_adolescent: bool,
    pub is_alive: bool,
    pub tracing_enabled: bool,
    pub risk_category: usize,
    /// Set by an external transmission model to keep the patient out of the prevalent pool
    pub pre_designated_hiv_negative: bool,
    /// One flag per configured generic risk factor
    pub risk_factors: Vec<bool>,
    pub discount_factor: f64,
    /// One factor per configured secondary discount rate
    pub secondary_discount_factors: Vec<f64>,
    pub costs_undiscounted: f64,
    pub costs_discounted: f64,
    pub costs_secondary_discounted: Vec<f64>,
    pub lms_undiscounted: f64,
    pub lms_discounted: f64,
    pub lms_secondary_discounted: Vec<f64>,
    pub qalms_undiscounted: f64,
    pub qalms_discounted: f64,
    pub qalms_secondary_discounted: Vec<f64>,
    /// QOL of the most recently settled month
    pub qol_value: f64,
}

/// Disease state: HIV, CD4, HVL, OIs, comorbidities and death
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiseaseState {
    pub hiv_state: HivState,
    /// Authoritative CD4 metric is the percentage while in early childhood
    pub uses_cd4_percentage: bool,
    pub true_cd4: f64,
    pub true_cd4_strata: usize,
    pub true_cd4_perc: f64,
    pub true_cd4_perc_strata: usize,
    pub min_true_cd4: f64,
    pub min_true_cd4_strata: usize,
    pub min_true_cd4_perc: f64,
    pub true_hvl_strata: usize,
    pub setpoint_hvl_strata: usize,
    pub target_hvl_strata: usize,
    pub month_of_infection: Option<u32>,
    pub chronic_transition_month: Option<u32>,
    /// Lifetime CD4 decline multiplier, drawn once
    pub patient_cd4_decline_perc: Option<f64>,
    pub oi_history_bits: u32,
    pub oi_history_class: OiHistoryClass,
    /// Month of the most recent episode of each OI type
    pub last_oi_month: Vec<Option<u32>>,
    pub num_oi_episodes: u32,
    pub chrm_onset_months: Vec<Option<u32>>,
    pub cause_of_death: Option<CauseOfDeath>,
    pub death_month: Option<u32>,
}

impl DiseaseState {
    /// Whether the OI type appears in the patient's history
    #[must_use]
    pub const fn has_oi_history(&self, oi: usize) -> bool {
        oi < u32::BITS as usize && self.oi_history_bits & (1 << oi) != 0
    }
}

/// Shadow CD4 trajectory under continuous suppression
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cd4Envelope {
    pub is_active: bool,
    pub slope: f64,
    pub value: f64,
    pub start_month: Option<u32>,
    pub regimen: Option<usize>,
}

/// A toxicity episode on ART
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToxicityEvent {
    pub line: usize,
    pub month: u32,
    pub forces_switch: bool,
}

/// ART state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtState {
    pub curr_line: Option<usize>,
    pub prev_line: Option<usize>,
    pub is_on_art: bool,
    pub month_started: Option<u32>,
    pub efficacy: ArtEfficacy,
    pub failure_type: Option<FailureType>,
    pub month_failure_started: Option<u32>,
    /// Failed-ART CD4 multiplier latched when failure began
    pub latched_failed_multiplier: Option<f64>,
    pub propensity_logit: f64,
    pub response_factors: [f64; HetOutcome::COUNT],
    pub response_type: ResponseType,
    pub regimen_cd4_slope: f64,
    pub regimen_slope_stage: Option<usize>,
    pub overall_envelope: Cd4Envelope,
    pub individual_envelope: Cd4Envelope,
    pub toxicities: SmallVec<[ToxicityEvent; 2]>,
    pub sti: StiState,
    pub months_suppressed: u32,
    pub failed_hvl_tests: u32,
    pub observed_hvl_nadir: Option<usize>,
    pub has_taken_line: Vec<bool>,
    /// Line interrupted by loss to follow-up, resumed on return to care
    pub interrupted_line: Option<usize>,
    pub num_regimens_started: u32,
}

impl ArtState {
    /// Response factor for a heterogeneity outcome
    #[must_use]
    pub const fn response_factor(&self, outcome: HetOutcome) -> f64 {
        self.response_factors[outcome.index()]
    }
}

/// A diagnostic result waiting to come back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTestResult {
    /// 0 for the initial test, 1.. for confirmatory tests
    pub depth: usize,
    pub positive: bool,
    pub return_month: u32,
}

/// Care cascade, observed values and PrEP
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringState {
    pub care_state: CareState,
    pub ltfu_state: LtfuState,
    pub is_detected: bool,
    pub month_detected: Option<u32>,
    pub detection_method: Option<DetectionMethod>,
    pub is_linked: bool,
    pub month_linked: Option<u32>,
    pub had_prev_detection: bool,
    pub had_prev_linkage: bool,
    pub had_prev_ltfu: bool,
    pub had_prev_rtc: bool,
    pub was_on_art_when_lost: Option<bool>,
    pub month_lost: Option<u32>,
    pub observed_cd4: Option<f64>,
    pub observed_cd4_strata: Option<usize>,
    pub observed_cd4_perc: Option<f64>,
    pub observed_cd4_month: Option<u32>,
    pub observed_hvl_strata: Option<usize>,
    pub observed_hvl_month: Option<u32>,
    pub next_clinic_visit_month: Option<u32>,
    pub next_hvl_test_month: Option<u32>,
    pub pending_hiv_test: Option<PendingTestResult>,
    pub num_missed_tests: u32,
    pub on_prep: bool,
    pub ever_prep: bool,
    pub month_prep_started: Option<u32>,
    pub month_prep_stopped: Option<u32>,
    pub prep_months: u32,
}

/// Prophylaxis state for one OI type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OiProphState {
    pub is_on: bool,
    pub line: Option<usize>,
    pub month_started: Option<u32>,
    pub is_resistant: bool,
    pub had_toxicity: bool,
    /// Set when every configured line has been used up
    pub lines_exhausted: bool,
}

/// OI prophylaxis state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProphState {
    pub by_oi: Vec<OiProphState>,
}

/// TB state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TbState {
    pub status: TbStatus,
    pub strain: Option<TbStrain>,
    pub is_symptomatic: bool,
    pub month_infected: Option<u32>,
    pub month_activated: Option<u32>,
    pub on_treatment: bool,
    pub treatment_line: Option<usize>,
    pub month_treatment_started: Option<u32>,
    pub month_treatment_ended: Option<u32>,
    pub on_proph: bool,
    pub month_proph_started: Option<u32>,
    pub month_proph_completed: Option<u32>,
    pub had_proph: bool,
    pub pending_test: Option<PendingTestResult>,
    pub next_screening_month: Option<u32>,
    pub num_episodes: u32,
}

/// Maternal and infant state for pediatric patients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PedsState {
    pub age_category: PedsAgeCategory,
    pub maternal_status: MaternalHivState,
    pub maternal_status_known: bool,
    pub maternal_art: MaternalArt,
    pub maternal_hvl: MaternalHvl,
    pub is_breastfeeding: bool,
    pub breastfeeding_stop_age: u32,
    pub infection_type: Option<PedsHivType>,
    pub on_infant_proph: bool,
    pub infant_proph_month_started: Option<u32>,
    pub pending_eid: Option<PendingTestResult>,
    pub eid_tests_offered: u32,
}

impl PedsState {
    /// HIV-exposed infants are those with an HIV-positive mother
    #[must_use]
    pub const fn is_hiv_exposed(&self) -> bool {
        !matches!(self.maternal_status, MaternalHivState::Negative)
    }
}
