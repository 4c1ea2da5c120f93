//! End-of-month settlement: the month's recurring costs, death costs, QOL,
//! exposure and survival accounting, then the clock moves forward.
//!
//! This is the only updater that runs in the month a patient dies.

use crate::config::SimContext;
use crate::patient::{CareState, HetOutcome, MonthScratch, Patient};
use crate::stats::CostCategory;

use super::Updater;
use super::state_updater::{
    UpdateContext, accumulate_qol_modifier, cost_age_category, current_art_line, finalize_qol_value,
    increment_costs, increment_discount_factor,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct EndMonthUpdater;

impl Updater for EndMonthUpdater {
    fn name(&self) -> &'static str {
        "end_month"
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        let config = ctx.config;
        let weight = percent_of_month(month);
        let routine = routine_care_cost(patient, config) * weight;
        increment_costs(patient, ctx, CostCategory::RoutineCare, routine);
        settle_prep(patient, month, ctx, weight);
        settle_art(patient, month, ctx, weight);
        settle_proph(patient, ctx, weight);
        settle_death_costs(patient, month, ctx);

        let qol = month_qol(patient, month, config);
        patient.general.qol_value = qol;

        ctx.run_stats.record_exposure(
            patient.general.month_num,
            patient.monitoring.care_state,
            patient.disease.hiv_state,
            patient.art.is_on_art,
        );
        settle_survival(patient, month, ctx, qol);

        if patient.is_alive() {
            patient.general.month_num += 1;
            patient.general.age_months += 1;
            increment_discount_factor(patient, config);
        }
    }
}

/// Share of the month lived: half in the month of death
#[must_use]
pub fn percent_of_month(month: &MonthScratch) -> f64 {
    if month.died() { 0.5 } else { 1.0 }
}

/// Routine care cost by care setting and cost age category
#[must_use]
pub fn routine_care_cost(patient: &Patient, config: &SimContext) -> f64 {
    let routine = &config.costs.routine_care;
    let by_age = match patient.monitoring.care_state {
        CareState::HivNegative => &routine.hiv_negative,
        CareState::Undetected => &routine.undetected,
        CareState::DetectedUnlinked => &routine.detected_unlinked,
        CareState::InCare | CareState::ReturnedToCare if patient.art.is_on_art => &routine.in_care_on_art,
        CareState::InCare | CareState::ReturnedToCare => &routine.in_care_off_art,
        CareState::Lost => &routine.lost,
    };
    let category = cost_age_category(patient.general.age_months, config);
    by_age.get(category).or_else(|| by_age.last()).copied().unwrap_or(0.0)
}

fn settle_prep(patient: &mut Patient, month: &MonthScratch, ctx: &mut UpdateContext<'_>, weight: f64) {
    if !patient.monitoring.on_prep {
        return;
    }
    let cost = ctx.config.hiv_testing.prep.monthly_cost * weight;
    increment_costs(patient, ctx, CostCategory::Prep, cost);
    patient.monitoring.prep_months += 1;
    if month.died() {
        patient.monitoring.on_prep = false;
        patient.monitoring.month_prep_stopped = Some(patient.general.month_num);
    }
}

/// Initial plus full monthly cost in the month a regimen starts; afterwards the
/// monthly cost is scaled between the non-responder share and the full cost by
/// the cost response factor. `weight` scales the monthly part only.
#[must_use]
pub fn art_monthly_cost(patient: &Patient, config: &SimContext, started_this_month: bool, weight: f64) -> f64 {
    let Some(line) = current_art_line(patient, config) else {
        return 0.0;
    };
    if started_this_month {
        return line.initial_cost + line.monthly_cost * weight;
    }
    let nonresp = line.non_responder_cost_proportion;
    let rf = patient.art.response_factor(HetOutcome::Cost);
    line.monthly_cost * (nonresp + rf * (1.0 - nonresp)) * weight
}

fn settle_art(patient: &mut Patient, month: &MonthScratch, ctx: &mut UpdateContext<'_>, weight: f64) {
    let Some(line) = patient.art.curr_line.filter(|_| patient.art.is_on_art) else {
        return;
    };
    let cost = art_monthly_cost(patient, ctx.config, month.art_started, weight);
    increment_costs(patient, ctx, CostCategory::Art, cost);
    ctx.cost_stats.record_art_line_cost(line, cost);
}

/// OI and infant prophylaxis; TB courses are charged as they run
fn settle_proph(patient: &mut Patient, ctx: &mut UpdateContext<'_>, weight: f64) {
    let config = ctx.config;
    let oi_cost: f64 = patient
        .proph
        .by_oi
        .iter()
        .zip(&config.proph.by_oi)
        .filter(|(state, _)| state.is_on)
        .filter_map(|(state, policy)| state.line.and_then(|line| policy.lines.get(line)))
        .map(|line| line.monthly_cost * weight)
        .sum();
    increment_costs(patient, ctx, CostCategory::OiProph, oi_cost);

    if patient.peds.on_infant_proph {
        if let Some(proph) = &config.peds.infant_proph {
            increment_costs(patient, ctx, CostCategory::InfantProph, proph.monthly_cost * weight);
        }
    }
}

/// Cause cost, in-care end-of-life cost and the cost attached to the fatal risk
fn settle_death_costs(patient: &mut Patient, month: &MonthScratch, ctx: &mut UpdateContext<'_>) {
    let Some(risk) = month.death else {
        return;
    };
    let config = ctx.config;
    let costs = &config.costs;
    let mut cost = costs.death_cost_by_cause.get(risk.cause) + risk.death_cost;
    if patient.monitoring.care_state.is_in_care() {
        let category = cost_age_category(patient.general.age_months, config);
        cost += costs
            .death_cost_in_care_by_age
            .get(category)
            .or_else(|| costs.death_cost_in_care_by_age.last())
            .copied()
            .unwrap_or(0.0);
    }
    increment_costs(patient, ctx, CostCategory::Death, cost);
}

/// QOL of the month before modifiers.
///
/// A death month uses the death QOL of the cause. Otherwise an acute OI takes
/// precedence, then undetected HIV, then routine care lowered by any OI still
/// within the history lookback.
#[must_use]
pub fn base_qol(patient: &Patient, month: &MonthScratch, config: &SimContext) -> f64 {
    let qol = &config.qol;
    if let Some(risk) = month.death {
        return qol.death_by_cause.get(risk.cause);
    }
    if !patient.is_hiv_positive() {
        return qol.hiv_negative;
    }
    let oi_types = &config.nat_hist.oi.types;
    if let Some(oi) = month.acute_oi.and_then(|oi| oi_types.get(oi)) {
        return oi.acute_qol;
    }
    let disease = &patient.disease;
    let strata = if disease.uses_cd4_percentage {
        disease.true_cd4_perc_strata
    } else {
        disease.true_cd4_strata
    };
    if !patient.monitoring.is_detected {
        return qol.undetected_by_cd4[strata];
    }
    let month_num = patient.general.month_num;
    let lookback = config.nat_hist.oi.history_qol_lookback_months;
    oi_types
        .iter()
        .zip(&disease.last_oi_month)
        .filter(|(_, last)| last.is_some_and(|last| month_num.saturating_sub(last) < lookback))
        .map(|(oi, _)| oi.history_qol)
        .fold(qol.routine_care_by_cd4[strata], f64::min)
}

/// Base QOL folded with the month's modifiers, clamped to `[0, 1]`
#[must_use]
pub fn month_qol(patient: &Patient, month: &MonthScratch, config: &SimContext) -> f64 {
    let mode = config.run.qol_calc_mode;
    let value = month
        .qol_modifiers
        .iter()
        .fold(base_qol(patient, month, config), |acc, &modifier| {
            accumulate_qol_modifier(acc, modifier, mode)
        });
    finalize_qol_value(value)
}

/// Life months (half a month in the death month), QALMs and death statistics
fn settle_survival(patient: &mut Patient, month: &MonthScratch, ctx: &mut UpdateContext<'_>, qol: f64) {
    let lms = percent_of_month(month);
    let qalms = lms * qol;
    let general = &mut patient.general;
    let factor = general.discount_factor;
    general.lms_undiscounted += lms;
    general.lms_discounted += lms * factor;
    general.qalms_undiscounted += qalms;
    general.qalms_discounted += qalms * factor;
    for (i, secondary) in general.secondary_discount_factors.iter().enumerate() {
        general.lms_secondary_discounted[i] += lms * secondary;
        general.qalms_secondary_discounted[i] += qalms * secondary;
    }
    ctx.run_stats.record_survival(lms, lms * factor, qalms, qalms * factor);

    if let Some(risk) = month.death {
        ctx.run_stats.record_death(risk.cause, general.age_months);
        ctx.tracer.trace(
            general.month_num,
            format_args!(
                "settled death: {:.1} life months, {:.2} QALMs, cost {:.2}",
                general.lms_undiscounted, general.qalms_undiscounted, general.costs_undiscounted
            ),
        );
    }
}
