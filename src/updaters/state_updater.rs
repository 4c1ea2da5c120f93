//! Shared mutators used by every updater.
//!
//! These functions own the cross-cutting rules: CD4 clamping and envelope
//! capping, care cascade transitions with their first-time counters, ART
//! regimen starts and stops, discounted cost accrual, QOL combination and the
//! age-category and categorical-draw helpers.

use std::fmt;

use log::debug;
use smallvec::SmallVec;

use crate::config::strata::{HVL_HIGHEST, HVL_SUPPRESSED, cd4_perc_strata, cd4_strata};
use crate::config::{ArtLine, QolCalcMode, SimContext};
use crate::patient::{
    ArtEfficacy, CareState, Cd4Envelope, DetectionMethod, FailureType, HetOutcome, LtfuState,
    MonthScratch, Patient, PedsAgeCategory, ResponseType, StiState,
};
use crate::random::{DrawId, RandomStream};
use crate::stats::{CostCategory, CostStats, RunStats};

/// Log target for per-patient trace output
pub const TRACE_TARGET: &str = "hivsim::trace";

/// Per-patient trace sink; silent unless tracing is enabled for the patient
#[derive(Debug, Clone, Copy)]
pub struct Tracer {
    enabled: bool,
    patient_id: u64,
}

impl Tracer {
    #[must_use]
    pub const fn new(enabled: bool, patient_id: u64) -> Self {
        Self {
            enabled,
            patient_id,
        }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(false, 0)
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn trace(&self, month: u32, args: fmt::Arguments<'_>) {
        if self.enabled {
            debug!(target: TRACE_TARGET, "[patient {} month {}] {}", self.patient_id, month, args);
        }
    }
}

/// Everything an updater may touch besides the patient
pub struct UpdateContext<'a> {
    pub config: &'a SimContext,
    pub rng: &'a mut dyn RandomStream,
    pub run_stats: &'a mut RunStats,
    pub cost_stats: &'a mut CostStats,
    pub tracer: Tracer,
}

impl<'a> UpdateContext<'a> {
    pub fn new(
        config: &'a SimContext,
        rng: &'a mut dyn RandomStream,
        run_stats: &'a mut RunStats,
        cost_stats: &'a mut CostStats,
        tracer: Tracer,
    ) -> Self {
        Self {
            config,
            rng,
            run_stats,
            cost_stats,
            tracer,
        }
    }

    /// Bernoulli trial on the patient's stream
    pub fn chance(&mut self, prob: f64, id: DrawId) -> bool {
        self.rng.chance(prob, id)
    }

    pub fn uniform(&mut self, id: DrawId) -> f64 {
        self.rng.uniform(id)
    }

    pub fn gaussian(&mut self, mean: f64, sd: f64, id: DrawId) -> f64 {
        self.rng.gaussian(mean, sd, id)
    }

    /// Categorical draw over `probs`
    pub fn draw_category(&mut self, probs: &[f64], id: DrawId) -> usize {
        let u = self.rng.uniform(id);
        draw_category(u, probs)
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Walk `probs` subtracting each bucket from `u`; the first bucket whose
/// probability exceeds the remainder wins. Exhaustion falls into the last bucket.
#[must_use]
pub fn draw_category(u: f64, probs: &[f64]) -> usize {
    let mut remaining = u;
    for (index, &prob) in probs.iter().enumerate() {
        if remaining < prob {
            return index;
        }
        remaining -= prob;
    }
    probs.len().saturating_sub(1)
}

/// Convert a monthly probability into a rate
#[must_use]
pub fn prob_to_rate(prob: f64) -> f64 {
    if prob >= 1.0 {
        return f64::INFINITY;
    }
    -(1.0 - prob.max(0.0)).ln()
}

/// Convert a monthly rate into a probability
#[must_use]
pub fn rate_to_prob(rate: f64) -> f64 {
    1.0 - (-rate.max(0.0)).exp()
}

/// Index of the first inclusive upper bound the age fits under; the last
/// category catches everything older
#[must_use]
pub fn age_category(age_months: u32, upper_bounds: &[u32]) -> usize {
    upper_bounds
        .iter()
        .position(|&bound| age_months <= bound)
        .unwrap_or(upper_bounds.len())
}

#[must_use]
pub fn peds_age_category(age_months: u32, config: &SimContext) -> PedsAgeCategory {
    if !config.peds.enabled {
        return PedsAgeCategory::Adult;
    }
    match age_category(
        age_months,
        &[config.peds.early_childhood_upper_months, config.peds.late_childhood_upper_months],
    ) {
        0 => PedsAgeCategory::EarlyChildhood,
        1 => PedsAgeCategory::LateChildhood,
        _ => PedsAgeCategory::Adult,
    }
}

#[must_use]
pub fn cost_age_category(age_months: u32, config: &SimContext) -> usize {
    age_category(age_months, &config.costs.age_category_bounds)
}

#[must_use]
pub fn heterogeneity_age_category(age_months: u32, config: &SimContext) -> usize {
    age_category(age_months, &config.art.heterogeneity.age_category_bounds)
}

#[must_use]
pub fn infection_age_category(age_months: u32, config: &SimContext) -> usize {
    age_category(age_months, &config.hiv_testing.infection_age_bounds)
}

#[must_use]
pub fn adolescent_art_age_category(age_months: u32, config: &SimContext) -> usize {
    age_category(age_months, &config.adolescent.art_age_category_bounds)
}

/// Row of a table indexed by age in whole years; ages past the end use the last row
#[must_use]
pub fn age_year_index(age_months: u32, table_len: usize) -> usize {
    ((age_months / 12) as usize).min(table_len.saturating_sub(1))
}

/// Fold one QOL modifier into the running value
#[must_use]
pub fn accumulate_qol_modifier(current: f64, modifier: f64, mode: QolCalcMode) -> f64 {
    match mode {
        QolCalcMode::Multiplicative => current * modifier,
        QolCalcMode::Subtractive => current - (1.0 - modifier),
        QolCalcMode::Minimum => current.min(modifier),
        QolCalcMode::Marginal => current + modifier,
    }
}

/// Clamp the month's QOL into `[0, 1]`
#[must_use]
pub fn finalize_qol_value(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Weibull-shaped incremental uptake probability for month `t` (1-based) of a
/// rollout reaching `coverage` after `duration` months
#[must_use]
pub fn weibull_monthly_prob(coverage: f64, duration: f64, shape: f64, t: u32) -> f64 {
    if t == 0 || duration <= 0.0 || coverage <= 0.0 {
        return 0.0;
    }
    if coverage >= 1.0 {
        return 1.0;
    }
    let t = f64::from(t);
    let exponent = (t.powf(shape) - (t - 1.0).powf(shape)) / duration.powf(shape);
    1.0 - (1.0 - coverage).powf(exponent)
}

// ---------------------------------------------------------------------------
// CD4 and HVL
// ---------------------------------------------------------------------------

/// Smallest value among the active envelopes
fn envelope_cap(patient: &Patient) -> Option<f64> {
    [patient.art.overall_envelope, patient.art.individual_envelope]
        .iter()
        .filter(|env| env.is_active)
        .map(|env| env.value)
        .reduce(f64::min)
}

/// Set absolute CD4, clamped to `[0, cd4_max]` and, after initialization, to
/// the lowest active envelope
pub fn set_true_cd4(patient: &mut Patient, config: &SimContext, value: f64, is_initial: bool) {
    let mut cd4 = value.clamp(0.0, config.run.cd4_max);
    if !is_initial {
        if let Some(cap) = envelope_cap(patient) {
            cd4 = cd4.min(cap.max(0.0));
        }
    }
    let strata = cd4_strata(cd4, &config.run.cd4_strata_upper_bounds);
    let disease = &mut patient.disease;
    disease.true_cd4 = cd4;
    disease.true_cd4_strata = strata;
    if is_initial || cd4 < disease.min_true_cd4 {
        disease.min_true_cd4 = cd4;
        disease.min_true_cd4_strata = strata;
    }
}

/// Set CD4 percentage, clamped like [`set_true_cd4`]
pub fn set_true_cd4_percentage(
    patient: &mut Patient,
    config: &SimContext,
    value: f64,
    is_initial: bool,
) {
    let mut perc = value.clamp(0.0, config.run.cd4_percentage_max);
    if !is_initial {
        if let Some(cap) = envelope_cap(patient) {
            perc = perc.min(cap.max(0.0));
        }
    }
    let disease = &mut patient.disease;
    disease.true_cd4_perc = perc;
    disease.true_cd4_perc_strata = cd4_perc_strata(perc, &config.run.cd4_percentage_strata_upper_bounds);
    if is_initial || perc < disease.min_true_cd4_perc {
        disease.min_true_cd4_perc = perc;
    }
}

/// Current value of the authoritative CD4 metric
#[must_use]
pub const fn authoritative_cd4(patient: &Patient) -> f64 {
    if patient.disease.uses_cd4_percentage {
        patient.disease.true_cd4_perc
    } else {
        patient.disease.true_cd4
    }
}

/// Set whichever CD4 metric is authoritative for the patient
pub fn set_authoritative_cd4(patient: &mut Patient, config: &SimContext, value: f64, is_initial: bool) {
    if patient.disease.uses_cd4_percentage {
        set_true_cd4_percentage(patient, config, value, is_initial);
    } else {
        set_true_cd4(patient, config, value, is_initial);
    }
}

pub fn set_true_hvl_strata(patient: &mut Patient, strata: usize) {
    patient.disease.true_hvl_strata = strata.min(HVL_HIGHEST);
}

pub fn set_setpoint_hvl_strata(patient: &mut Patient, strata: usize) {
    patient.disease.setpoint_hvl_strata = strata.min(HVL_HIGHEST);
}

pub fn set_target_hvl_strata(patient: &mut Patient, strata: usize) {
    patient.disease.target_hvl_strata = strata.min(HVL_HIGHEST);
}

// ---------------------------------------------------------------------------
// Care cascade
// ---------------------------------------------------------------------------

pub fn set_care_state(patient: &mut Patient, state: CareState) {
    patient.monitoring.care_state = state;
}

/// Mark HIV as detected. Detection stops PrEP.
pub fn set_detected_hiv_state(patient: &mut Patient, ctx: &mut UpdateContext<'_>, method: DetectionMethod) {
    let month = patient.general.month_num;
    let monitoring = &mut patient.monitoring;
    if monitoring.is_detected {
        return;
    }
    monitoring.is_detected = true;
    monitoring.month_detected = Some(month);
    monitoring.detection_method = Some(method);
    if !monitoring.is_linked {
        monitoring.care_state = CareState::DetectedUnlinked;
    }
    let first_time = !monitoring.had_prev_detection;
    monitoring.had_prev_detection = true;
    ctx.run_stats.record_detection(method, first_time);
    if monitoring.on_prep {
        stop_prep(patient, ctx);
    }
    ctx.tracer.trace(month, format_args!("HIV detected via {method:?}"));
}

/// Link a detected patient to care; the first clinic visit happens this month
pub fn set_linked_state(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let month = patient.general.month_num;
    let monitoring = &mut patient.monitoring;
    if monitoring.is_linked {
        return;
    }
    monitoring.is_linked = true;
    monitoring.month_linked = Some(month);
    monitoring.care_state = CareState::InCare;
    monitoring.next_clinic_visit_month = Some(month);
    let first_time = !monitoring.had_prev_linkage;
    monitoring.had_prev_linkage = true;
    ctx.run_stats.record_linkage(first_time);
    ctx.tracer.trace(month, format_args!("linked to care"));
}

/// Move the patient into or out of loss to follow-up.
///
/// Every call counts an event; the first-time counters only move once per
/// life. Loss records whether ART was running and interrupts it; return to
/// care resumes the interrupted regimen.
pub fn set_curr_ltfu_state(patient: &mut Patient, ctx: &mut UpdateContext<'_>, state: LtfuState) {
    let month = patient.general.month_num;
    match state {
        LtfuState::Lost => {
            let was_on_art = patient.art.is_on_art;
            let first_time = !patient.monitoring.had_prev_ltfu;
            patient.monitoring.had_prev_ltfu = true;
            ctx.run_stats.record_lost(first_time, was_on_art);
            if patient.monitoring.ltfu_state == LtfuState::Lost {
                return;
            }
            patient.monitoring.ltfu_state = LtfuState::Lost;
            patient.monitoring.care_state = CareState::Lost;
            patient.monitoring.month_lost = Some(month);
            patient.monitoring.was_on_art_when_lost = Some(was_on_art);
            patient.monitoring.next_clinic_visit_month = None;
            patient.monitoring.next_hvl_test_month = None;
            if was_on_art {
                patient.art.interrupted_line = patient.art.curr_line;
                stop_curr_art_regimen(patient, ctx);
                ctx.run_stats.record_art_interruption();
            }
            stop_all_oi_proph(patient);
            ctx.tracer.trace(month, format_args!("lost to follow-up (on ART: {was_on_art})"));
        }
        LtfuState::Returned => {
            let first_time = !patient.monitoring.had_prev_rtc;
            patient.monitoring.had_prev_rtc = true;
            ctx.run_stats.record_return_to_care(first_time);
            if patient.monitoring.ltfu_state != LtfuState::Lost {
                return;
            }
            patient.monitoring.ltfu_state = LtfuState::Returned;
            patient.monitoring.care_state = CareState::ReturnedToCare;
            patient.monitoring.next_clinic_visit_month = Some(month);
            if patient.monitoring.was_on_art_when_lost == Some(true) {
                if let Some(line) = patient.art.interrupted_line.take() {
                    start_art_regimen(patient, ctx, None, line);
                }
            }
            ctx.tracer.trace(month, format_args!("returned to care"));
        }
        LtfuState::NeverLost => {
            patient.monitoring.ltfu_state = LtfuState::NeverLost;
        }
    }
}

fn stop_all_oi_proph(patient: &mut Patient) {
    for proph in &mut patient.proph.by_oi {
        proph.is_on = false;
    }
}

// ---------------------------------------------------------------------------
// PrEP
// ---------------------------------------------------------------------------

pub fn start_prep(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let month = patient.general.month_num;
    let monitoring = &mut patient.monitoring;
    monitoring.on_prep = true;
    monitoring.month_prep_started = Some(month);
    monitoring.month_prep_stopped = None;
    let first_time = !monitoring.ever_prep;
    monitoring.ever_prep = true;
    ctx.run_stats.record_prep_start();
    if first_time {
        let initial = ctx.config.hiv_testing.prep.initial_cost;
        increment_costs(patient, ctx, CostCategory::Prep, initial);
    }
    ctx.tracer.trace(month, format_args!("started PrEP"));
}

pub fn stop_prep(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let month = patient.general.month_num;
    patient.monitoring.on_prep = false;
    patient.monitoring.month_prep_stopped = Some(month);
    ctx.run_stats.record_prep_dropout();
    ctx.tracer.trace(month, format_args!("stopped PrEP"));
}

// ---------------------------------------------------------------------------
// ART
// ---------------------------------------------------------------------------

/// ART lines available to the patient at their current age.
///
/// Pediatric lines are dosed on the CD4 percentage scale and so only apply
/// during early childhood.
#[must_use]
pub fn art_lines_for<'c>(patient: &Patient, config: &'c SimContext) -> &'c [ArtLine] {
    if patient.general.is_pediatric
        && patient.peds.age_category == PedsAgeCategory::EarlyChildhood
        && !config.peds.art_lines.is_empty()
    {
        &config.peds.art_lines
    } else if patient.general.is_adolescent && !config.adolescent.art_lines.is_empty() {
        &config.adolescent.art_lines
    } else {
        &config.art.lines
    }
}

/// Parameters of a line, falling back to the last available line
#[must_use]
pub fn art_line<'c>(patient: &Patient, config: &'c SimContext, line: usize) -> Option<&'c ArtLine> {
    let lines = art_lines_for(patient, config);
    lines.get(line).or_else(|| lines.last())
}

/// Parameters of the current line, `None` when off ART
#[must_use]
pub fn current_art_line<'c>(patient: &Patient, config: &'c SimContext) -> Option<&'c ArtLine> {
    patient.art.curr_line.and_then(|line| art_line(patient, config, line))
}

/// Recompute per-outcome response factors for a line's propensity adjustment
pub fn update_response_factors(patient: &mut Patient, config: &SimContext, adjustment: f64) {
    let het = &config.art.heterogeneity;
    let logit = patient.art.propensity_logit + adjustment;
    for outcome in HetOutcome::ALL {
        let bounds = match outcome {
            HetOutcome::Suppression => het.suppression,
            HetOutcome::LateFailure => het.late_failure,
            HetOutcome::ArtEffectMortality => het.art_effect_mortality,
            HetOutcome::ArtEffectOi => het.art_effect_oi,
            HetOutcome::Resuppression => het.resuppression,
            HetOutcome::Cost => het.cost,
        };
        patient.art.response_factors[outcome.index()] = bounds.response_factor(logit);
    }
    patient.art.response_type = ResponseType::from_factor(
        patient.art.response_factor(HetOutcome::Suppression),
        &het.response_type_thresholds,
    );
}

/// Probability that a line suppresses the patient at start
#[must_use]
pub fn initial_suppression_prob(patient: &Patient, config: &SimContext, line: &ArtLine) -> f64 {
    let rf = patient.art.response_factor(HetOutcome::Suppression);
    let mut prob = line.prob_suppression_nonresponder
        + rf * (line.prob_suppression_responder - line.prob_suppression_nonresponder);
    if patient.general.is_adolescent {
        let category = adolescent_art_age_category(patient.general.age_months, config);
        if let Some(&multiplier) = config
            .adolescent
            .suppression_multiplier_by_age_category
            .get(category)
        {
            prob *= multiplier;
        }
    }
    prob.clamp(0.0, 1.0)
}

/// Start a specific ART line.
///
/// Suppression is drawn at start unless `forced` is given. Line-level start
/// statistics are only recorded the first time the patient takes the line.
pub fn start_art_regimen(
    patient: &mut Patient,
    ctx: &mut UpdateContext<'_>,
    forced: Option<ArtEfficacy>,
    line: usize,
) {
    let config = ctx.config;
    let Some(params) = art_line(patient, config, line) else {
        return;
    };
    let month = patient.general.month_num;
    let switching = patient.art.curr_line.is_some_and(|curr| curr != line);
    if switching || patient.art.individual_envelope.regimen != Some(line) {
        patient.art.individual_envelope.is_active = false;
    }
    if patient.art.curr_line.is_some() {
        patient.art.prev_line = patient.art.curr_line;
    }

    update_response_factors(patient, config, params.propensity_adjustment);
    let art = &mut patient.art;
    art.curr_line = Some(line);
    art.is_on_art = true;
    art.month_started = Some(month);
    art.months_suppressed = 0;
    art.failed_hvl_tests = 0;
    art.observed_hvl_nadir = None;
    art.failure_type = None;
    art.month_failure_started = None;
    art.latched_failed_multiplier = None;
    art.regimen_slope_stage = None;
    art.num_regimens_started += 1;

    let first_time = !art.has_taken_line.get(line).copied().unwrap_or(false);
    if let Some(flag) = art.has_taken_line.get_mut(line) {
        *flag = true;
    } else {
        art.has_taken_line.resize(line + 1, false);
        art.has_taken_line[line] = true;
    }
    ctx.run_stats.record_art_start(line, first_time);

    let efficacy = forced.unwrap_or_else(|| {
        let prob = initial_suppression_prob(patient, config, params);
        if ctx.chance(prob, DrawId::InitialSuppression) {
            ArtEfficacy::Success
        } else {
            ArtEfficacy::Failure
        }
    });
    patient.art.efficacy = efficacy;
    match efficacy {
        ArtEfficacy::Success => {
            set_target_hvl_strata(patient, HVL_SUPPRESSED);
        }
        ArtEfficacy::Failure => {
            let setpoint = patient.disease.setpoint_hvl_strata;
            set_target_hvl_strata(patient, setpoint);
            patient.art.failure_type = Some(FailureType::Early);
            patient.art.month_failure_started = Some(month);
            patient.art.latched_failed_multiplier = Some(params.failed_cd4_multiplier_early);
            ctx.run_stats.record_art_initial_failure();
        }
    }
    draw_regimen_cd4_slope(patient, ctx);
    if efficacy == ArtEfficacy::Success && config.art.envelope_enabled {
        activate_envelopes(patient);
    }
    ctx.tracer.trace(
        month,
        format_args!("started ART line {line} ({efficacy:?}, first time: {first_time})"),
    );
}

/// Start the line after the current (or previous) one; stays on the last
/// available line once every line has been used. Returns the started line.
pub fn start_next_art_regimen(patient: &mut Patient, ctx: &mut UpdateContext<'_>) -> Option<usize> {
    let num_lines = art_lines_for(patient, ctx.config).len();
    if num_lines == 0 {
        return None;
    }
    let next = match patient.art.curr_line.or(patient.art.prev_line) {
        Some(line) if patient.art.curr_line.is_some() => (line + 1).min(num_lines - 1),
        Some(line) => line.min(num_lines - 1),
        None => 0,
    };
    start_art_regimen(patient, ctx, None, next);
    Some(next)
}

/// Stop the current regimen; HVL drifts back to setpoint
pub fn stop_curr_art_regimen(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    if !patient.art.is_on_art {
        return;
    }
    let month = patient.general.month_num;
    let art = &mut patient.art;
    art.prev_line = art.curr_line;
    art.curr_line = None;
    art.is_on_art = false;
    art.month_started = None;
    art.regimen_slope_stage = None;
    art.months_suppressed = 0;
    art.toxicities.clear();
    let setpoint = patient.disease.setpoint_hvl_strata;
    set_target_hvl_strata(patient, setpoint);
    ctx.tracer.trace(month, format_args!("stopped ART"));
}

/// Draw the regimen CD4 slope when the patient enters a new slope stage
pub fn draw_regimen_cd4_slope(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let Some(line) = current_art_line(patient, ctx.config) else {
        return;
    };
    let Some(months) = patient.months_on_regimen() else {
        return;
    };
    let Some((stage_index, stage)) = line.slope_stage(months) else {
        return;
    };
    if patient.art.regimen_slope_stage == Some(stage_index) {
        return;
    }
    let slope = ctx.gaussian(stage.mean, stage.sd, DrawId::RegimenCd4Slope);
    patient.art.regimen_cd4_slope = slope;
    patient.art.regimen_slope_stage = Some(stage_index);
    let curr = patient.art.curr_line;
    if patient.art.individual_envelope.is_active && patient.art.individual_envelope.regimen == curr {
        patient.art.individual_envelope.slope = slope;
    }
    if patient.art.overall_envelope.is_active && patient.art.overall_envelope.regimen == curr {
        patient.art.overall_envelope.slope = slope;
    }
}

/// Activate the overall envelope (once) and the individual envelope for the
/// current regimen, starting at the current CD4
pub fn activate_envelopes(patient: &mut Patient) {
    let month = patient.general.month_num;
    let value = authoritative_cd4(patient);
    let slope = patient.art.regimen_cd4_slope;
    let line = patient.art.curr_line;
    let fresh = Cd4Envelope {
        is_active: true,
        slope,
        value,
        start_month: Some(month),
        regimen: line,
    };
    if !patient.art.overall_envelope.is_active {
        patient.art.overall_envelope = fresh;
    }
    if !patient.art.individual_envelope.is_active || patient.art.individual_envelope.regimen != line {
        patient.art.individual_envelope = fresh;
    }
}

/// Advance every active envelope by its own slope
pub fn increment_cd4_envelope(patient: &mut Patient, config: &SimContext) {
    let max = if patient.disease.uses_cd4_percentage {
        config.run.cd4_percentage_max
    } else {
        config.run.cd4_max
    };
    for envelope in [&mut patient.art.overall_envelope, &mut patient.art.individual_envelope] {
        if envelope.is_active {
            envelope.value = (envelope.value + envelope.slope).clamp(0.0, max);
        }
    }
}

/// Drop both envelopes, e.g. when the authoritative CD4 metric changes
pub fn deactivate_envelopes(patient: &mut Patient) {
    patient.art.overall_envelope.is_active = false;
    patient.art.individual_envelope.is_active = false;
}

/// Mark the current regimen as failed
pub fn set_art_failure(patient: &mut Patient, config: &SimContext, failure_type: FailureType) {
    let month = patient.general.month_num;
    let multiplier = current_art_line(patient, config).map_or(1.0, |line| match failure_type {
        FailureType::Early => line.failed_cd4_multiplier_early,
        FailureType::Late => line.failed_cd4_multiplier_late,
    });
    patient.art.efficacy = ArtEfficacy::Failure;
    patient.art.failure_type = Some(failure_type);
    patient.art.month_failure_started = Some(month);
    patient.art.latched_failed_multiplier = Some(multiplier);
    patient.art.months_suppressed = 0;
    let setpoint = patient.disease.setpoint_hvl_strata;
    set_target_hvl_strata(patient, setpoint);
}

/// Interrupt ART under a structured treatment interruption
pub fn start_sti_interruption(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let month = patient.general.month_num;
    patient.art.interrupted_line = patient.art.curr_line;
    stop_curr_art_regimen(patient, ctx);
    patient.art.sti = StiState::Interrupted { since_month: month };
    ctx.run_stats.record_sti_interruption();
}

// ---------------------------------------------------------------------------
// Costs and discounting
// ---------------------------------------------------------------------------

/// Add a cost to the patient and population accumulators, discounted by the
/// patient's current factors
pub fn increment_costs(patient: &mut Patient, ctx: &mut UpdateContext<'_>, category: CostCategory, amount: f64) {
    if amount == 0.0 {
        return;
    }
    let general = &mut patient.general;
    let discounted = amount * general.discount_factor;
    general.costs_undiscounted += amount;
    general.costs_discounted += discounted;
    let secondary: SmallVec<[f64; 4]> = general
        .secondary_discount_factors
        .iter()
        .map(|factor| amount * factor)
        .collect();
    for (total, value) in general.costs_secondary_discounted.iter_mut().zip(&secondary) {
        *total += value;
    }
    ctx.cost_stats
        .record_cost(category, amount, discounted, &secondary, general.month_num);
}

/// Monthly discount multiplier for an annual rate
#[must_use]
pub fn monthly_discount_multiplier(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(-1.0 / 12.0)
}

/// Advance the discount factors by one month
pub fn increment_discount_factor(patient: &mut Patient, config: &SimContext) {
    let general = &mut patient.general;
    general.discount_factor *= monthly_discount_multiplier(config.run.discount_rate_annual);
    for (factor, rate) in general
        .secondary_discount_factors
        .iter_mut()
        .zip(&config.run.secondary_discount_rates)
    {
        *factor *= monthly_discount_multiplier(*rate);
    }
}

/// Register the toxicity death risk and QOL modifier of the month's toxicity
pub fn apply_month_toxicity(month: &mut MonthScratch, death_rate_ratio: f64, qol_modifier: f64) {
    month.add_mortality_risk(crate::patient::CauseOfDeath::ArtToxicity, death_rate_ratio, 0.0);
    month.add_qol_modifier(qol_modifier);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedStream;

    fn with_ctx<F: FnOnce(&mut UpdateContext<'_>)>(config: &SimContext, f: F) -> (RunStats, CostStats) {
        let mut rng = ScriptedStream::new(0.5);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        {
            let mut ctx = UpdateContext::new(config, &mut rng, &mut run_stats, &mut cost_stats, Tracer::disabled());
            f(&mut ctx);
        }
        (run_stats, cost_stats)
    }

    #[test]
    fn test_draw_category_boundaries() {
        let probs = [0.2, 0.3, 0.5];
        assert_eq!(draw_category(0.0, &probs), 0);
        assert_eq!(draw_category(0.1999, &probs), 0);
        assert_eq!(draw_category(0.2, &probs), 1);
        assert_eq!(draw_category(0.5, &probs), 2);
        assert_eq!(draw_category(0.99, &probs), 2);
    }

    #[test]
    fn test_draw_category_exhaustion() {
        assert_eq!(draw_category(0.95, &[0.3, 0.3, 0.3]), 2);
        assert_eq!(draw_category(0.5, &[]), 0);
    }

    #[test]
    fn test_rate_prob_round_trip() {
        for p in [0.0, 0.01, 0.3, 0.9] {
            assert!((rate_to_prob(prob_to_rate(p)) - p).abs() < 1e-12);
        }
        assert!(prob_to_rate(1.0).is_infinite());
    }

    #[test]
    fn test_age_category_inclusive_bounds() {
        let bounds = [168, 768];
        assert_eq!(age_category(0, &bounds), 0);
        assert_eq!(age_category(168, &bounds), 0);
        assert_eq!(age_category(169, &bounds), 1);
        assert_eq!(age_category(2000, &bounds), 2);
    }

    #[test]
    fn test_qol_modes() {
        assert!((accumulate_qol_modifier(0.9, 0.8, QolCalcMode::Multiplicative) - 0.72).abs() < 1e-12);
        assert!((accumulate_qol_modifier(0.9, 0.8, QolCalcMode::Subtractive) - 0.7).abs() < 1e-12);
        assert_eq!(accumulate_qol_modifier(0.9, 0.8, QolCalcMode::Minimum), 0.8);
        assert!((accumulate_qol_modifier(0.9, -0.1, QolCalcMode::Marginal) - 0.8).abs() < 1e-12);
        assert_eq!(finalize_qol_value(1.3), 1.0);
        assert_eq!(finalize_qol_value(-0.2), 0.0);
    }

    #[test]
    fn test_weibull_uptake_accumulates_to_coverage() {
        let mut not_taken = 1.0;
        for t in 1..=24 {
            not_taken *= 1.0 - weibull_monthly_prob(0.5, 24.0, 1.5, t);
        }
        assert!((1.0 - not_taken - 0.5).abs() < 1e-9);
        assert_eq!(weibull_monthly_prob(0.5, 24.0, 1.0, 0), 0.0);
    }

    #[test]
    fn test_set_true_cd4_clamps_and_tracks_minimum() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        set_true_cd4(&mut patient, &config, 350.0, true);
        assert_eq!(patient.disease.min_true_cd4, 350.0);
        set_true_cd4(&mut patient, &config, -20.0, false);
        assert_eq!(patient.disease.true_cd4, 0.0);
        assert_eq!(patient.disease.true_cd4_strata, 0);
        assert_eq!(patient.disease.min_true_cd4, 0.0);
        set_true_cd4(&mut patient, &config, 5000.0, false);
        assert_eq!(patient.disease.true_cd4, config.run.cd4_max);
        assert_eq!(patient.disease.min_true_cd4, 0.0);
    }

    #[test]
    fn test_envelope_caps_cd4_after_initialization() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        set_true_cd4(&mut patient, &config, 200.0, true);
        patient.art.overall_envelope = Cd4Envelope {
            is_active: true,
            slope: 10.0,
            value: 250.0,
            start_month: Some(0),
            regimen: Some(0),
        };
        patient.art.individual_envelope = Cd4Envelope {
            value: 230.0,
            ..patient.art.overall_envelope
        };
        set_true_cd4(&mut patient, &config, 400.0, false);
        assert_eq!(patient.disease.true_cd4, 230.0);
        set_true_cd4(&mut patient, &config, 400.0, true);
        assert_eq!(patient.disease.true_cd4, 400.0);
    }

    #[test]
    fn test_ltfu_first_time_counter_not_doubled() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        patient.monitoring.care_state = CareState::InCare;
        let (stats, _) = with_ctx(&config, |ctx| {
            set_curr_ltfu_state(&mut patient, ctx, LtfuState::Lost);
            set_curr_ltfu_state(&mut patient, ctx, LtfuState::Lost);
        });
        assert_eq!(stats.cascade.first_lost, 1);
        assert_eq!(stats.cascade.lost_events, 2);
        assert_eq!(patient.monitoring.care_state, CareState::Lost);
    }

    #[test]
    fn test_ltfu_interrupts_and_rtc_resumes_art() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        set_true_cd4(&mut patient, &config, 300.0, true);
        let (stats, _) = with_ctx(&config, |ctx| {
            start_art_regimen(&mut patient, ctx, Some(ArtEfficacy::Success), 0);
            set_curr_ltfu_state(&mut patient, ctx, LtfuState::Lost);
            assert!(!patient.art.is_on_art);
            assert_eq!(patient.monitoring.was_on_art_when_lost, Some(true));
            set_curr_ltfu_state(&mut patient, ctx, LtfuState::Returned);
        });
        assert!(patient.art.is_on_art);
        assert_eq!(patient.art.curr_line, Some(0));
        assert_eq!(stats.art_starts_total, 2);
        assert_eq!(stats.art_line_starts, vec![1]);
        assert_eq!(stats.cascade.first_returned, 1);
    }

    #[test]
    fn test_detection_stops_prep_and_counts_once() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        patient.monitoring.on_prep = true;
        let (stats, _) = with_ctx(&config, |ctx| {
            set_detected_hiv_state(&mut patient, ctx, DetectionMethod::RoutineTest);
            set_detected_hiv_state(&mut patient, ctx, DetectionMethod::RoutineTest);
        });
        assert!(!patient.monitoring.on_prep);
        assert_eq!(stats.cascade.first_detected, 1);
        assert_eq!(patient.monitoring.care_state, CareState::DetectedUnlinked);
    }

    #[test]
    fn test_increment_costs_discounts() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        patient.general.discount_factor = 0.5;
        patient.general.secondary_discount_factors = vec![1.0, 0.25];
        let (_, costs) = with_ctx(&config, |ctx| {
            increment_costs(&mut patient, ctx, CostCategory::Art, 100.0);
        });
        assert_eq!(patient.general.costs_undiscounted, 100.0);
        assert_eq!(patient.general.costs_discounted, 50.0);
        assert_eq!(patient.general.costs_secondary_discounted, vec![100.0, 25.0]);
        assert_eq!(costs.discounted[CostCategory::Art.index()], 50.0);
    }

    #[test]
    fn test_increment_costs_keeps_every_secondary_rate() {
        let mut config = SimContext::default();
        config.run.secondary_discount_rates = vec![0.0; 10];
        let mut patient = Patient::new(0, &config);
        patient.general.secondary_discount_factors[9] = 0.5;
        let (_, costs) = with_ctx(&config, |ctx| {
            increment_costs(&mut patient, ctx, CostCategory::Art, 100.0);
        });
        assert_eq!(patient.general.costs_secondary_discounted.len(), 10);
        assert_eq!(patient.general.costs_secondary_discounted[8], 100.0);
        assert_eq!(patient.general.costs_secondary_discounted[9], 50.0);
        assert_eq!(costs.secondary_discounted.len(), 10);
        assert_eq!(costs.secondary_discounted[9], 50.0);
    }

    #[test]
    fn test_discount_factor_reaches_annual_rate() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        for _ in 0..12 {
            increment_discount_factor(&mut patient, &config);
        }
        assert!((patient.general.discount_factor - 1.0 / 1.03).abs() < 1e-12);
    }

    #[test]
    fn test_next_regimen_stays_on_last_line() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        let (stats, _) = with_ctx(&config, |ctx| {
            assert_eq!(start_next_art_regimen(&mut patient, ctx), Some(0));
            assert_eq!(start_next_art_regimen(&mut patient, ctx), Some(1));
            assert_eq!(start_next_art_regimen(&mut patient, ctx), Some(1));
        });
        assert_eq!(stats.art_line_starts, vec![1, 1]);
        assert_eq!(stats.art_starts_total, 3);
        assert_eq!(patient.art.prev_line, Some(1));
    }
}
