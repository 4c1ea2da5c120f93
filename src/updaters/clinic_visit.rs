//! Clinic visits and the care policies evaluated at them: loss to follow-up
//! and return to care, CD4 testing, ART start, structured treatment
//! interruptions and OI prophylaxis.

use crate::config::strata::cd4_strata;
use crate::config::{SimContext, StiPolicy};
use crate::patient::{CareState, LtfuState, MonthScratch, OiHistoryClass, Patient, StiState};
use crate::random::DrawId;
use crate::stats::CostCategory;

use super::Updater;
use super::state_updater::{
    UpdateContext, increment_costs, set_curr_ltfu_state, start_art_regimen, start_next_art_regimen,
    start_sti_interruption,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ClinicVisitUpdater;

impl Updater for ClinicVisitUpdater {
    fn name(&self) -> &'static str {
        "clinic_visit"
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        if !patient.is_hiv_positive() || !patient.monitoring.is_linked {
            return;
        }
        if perform_ltfu_update(patient, month, ctx) {
            return;
        }
        let month_num = patient.general.month_num;
        let visit_due = patient.monitoring.care_state.is_in_care()
            && patient
                .monitoring
                .next_clinic_visit_month
                .is_some_and(|due| month_num >= due);
        if !visit_due {
            return;
        }
        perform_clinic_visit(patient, month, ctx);
    }
}

/// Monthly loss to follow-up and return to care draws. Returns true when the
/// patient left care this month.
fn perform_ltfu_update(patient: &mut Patient, month: &mut MonthScratch, ctx: &mut UpdateContext<'_>) -> bool {
    let config = ctx.config;
    let clinic = &config.clinic;
    match patient.monitoring.care_state {
        CareState::InCare | CareState::ReturnedToCare => {
            let prob = if patient.art.is_on_art {
                clinic.monthly_prob_ltfu_on_art
            } else {
                clinic.monthly_prob_ltfu_off_art
            };
            if ctx.chance(prob, DrawId::LossToFollowUp) {
                set_curr_ltfu_state(patient, ctx, LtfuState::Lost);
                return true;
            }
        }
        CareState::Lost => {
            let prob = clinic.monthly_prob_rtc;
            if ctx.chance(prob, DrawId::ReturnToCare) {
                set_curr_ltfu_state(patient, ctx, LtfuState::Returned);
                if patient.art.is_on_art {
                    month.art_started = true;
                }
            }
        }
        _ => {}
    }
    false
}

fn perform_clinic_visit(patient: &mut Patient, month: &mut MonthScratch, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let clinic = &config.clinic;
    let month_num = patient.general.month_num;
    increment_costs(patient, ctx, CostCategory::ClinicVisit, clinic.visit_cost);
    perform_cd4_test(patient, ctx);

    if let Some(policy) = clinic.sti {
        perform_sti_update(patient, month, ctx, policy);
    }
    if !patient.art.is_on_art
        && !matches!(patient.art.sti, StiState::Interrupted { .. })
        && meets_art_start_criteria(patient, config)
    {
        if let Some(line) = start_next_art_regimen(patient, ctx) {
            month.art_started = true;
            ctx.tracer.trace(month_num, format_args!("clinic started ART line {line}"));
        }
    }
    perform_oi_proph_policy(patient, ctx);
    patient.monitoring.next_clinic_visit_month = Some(month_num + clinic.visit_interval_months.max(1));
}

/// Observe CD4 with measurement error
fn perform_cd4_test(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let clinic = &config.clinic;
    let month_num = patient.general.month_num;
    let observed = (patient.disease.true_cd4 + ctx.gaussian(0.0, clinic.cd4_test_sd, DrawId::Cd4TestError))
        .clamp(0.0, config.run.cd4_max);
    let monitoring = &mut patient.monitoring;
    monitoring.observed_cd4 = Some(observed);
    monitoring.observed_cd4_strata = Some(cd4_strata(observed, &config.run.cd4_strata_upper_bounds));
    monitoring.observed_cd4_month = Some(month_num);
    if patient.disease.uses_cd4_percentage {
        let perc = (patient.disease.true_cd4_perc
            + ctx.gaussian(0.0, clinic.cd4_perc_test_sd, DrawId::Cd4PercTestError))
        .clamp(0.0, config.run.cd4_percentage_max);
        patient.monitoring.observed_cd4_perc = Some(perc);
    }
    increment_costs(patient, ctx, CostCategory::Cd4Test, clinic.cd4_test_cost);
    ctx.run_stats.record_cd4_test();
}

/// Treat-all when no threshold is configured; otherwise observed CD4 below
/// the threshold or a severe OI history
#[must_use]
pub fn meets_art_start_criteria(patient: &Patient, config: &SimContext) -> bool {
    let clinic = &config.clinic;
    if clinic.start_art_on_severe_oi_history && patient.disease.oi_history_class == OiHistoryClass::Severe {
        return true;
    }
    if patient.disease.uses_cd4_percentage {
        return match (clinic.art_start_cd4_perc_threshold, patient.monitoring.observed_cd4_perc) {
            (None, _) => true,
            (Some(threshold), Some(observed)) => observed < threshold,
            (Some(_), None) => false,
        };
    }
    match (clinic.art_start_cd4_threshold, patient.monitoring.observed_cd4) {
        (None, _) => true,
        (Some(threshold), Some(observed)) => observed < threshold,
        (Some(_), None) => false,
    }
}

fn perform_sti_update(patient: &mut Patient, month: &mut MonthScratch, ctx: &mut UpdateContext<'_>, policy: StiPolicy) {
    let month_num = patient.general.month_num;
    match patient.art.sti {
        StiState::None if patient.is_suppressed_on_art() => {
            if patient.art.months_suppressed >= policy.interrupt_after_months_suppressed {
                start_sti_interruption(patient, ctx);
                ctx.tracer.trace(month_num, format_args!("structured treatment interruption"));
            }
        }
        StiState::Interrupted { .. } => {
            let below = patient
                .monitoring
                .observed_cd4
                .is_some_and(|cd4| cd4 < policy.restart_cd4_threshold);
            if below {
                if let Some(line) = patient.art.interrupted_line.take() {
                    start_art_regimen(patient, ctx, None, line);
                    month.art_started = true;
                }
                patient.art.sti = StiState::Restarted;
                ctx.run_stats.record_sti_restart();
                ctx.tracer.trace(month_num, format_args!("restarted ART after interruption"));
            }
        }
        _ => {}
    }
}

/// Start or stop prophylaxis against each OI by observed CD4
fn perform_oi_proph_policy(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let Some(observed) = patient.monitoring.observed_cd4 else {
        return;
    };
    let month_num = patient.general.month_num;
    for (oi, policy) in config.proph.by_oi.iter().enumerate() {
        let Some(state) = patient.proph.by_oi.get_mut(oi) else {
            continue;
        };
        if state.is_on {
            if policy.stop_cd4_above.is_some_and(|threshold| observed > threshold) {
                state.is_on = false;
                ctx.tracer.trace(month_num, format_args!("stopped OI {oi} prophylaxis"));
            }
        } else if !state.lines_exhausted
            && !policy.lines.is_empty()
            && policy.start_cd4_below.is_some_and(|threshold| observed < threshold)
        {
            state.is_on = true;
            state.line = Some(state.line.unwrap_or(0));
            state.month_started = Some(month_num);
            ctx.run_stats.record_oi_proph_start();
            ctx.tracer.trace(month_num, format_args!("started OI {oi} prophylaxis"));
        }
    }
}
