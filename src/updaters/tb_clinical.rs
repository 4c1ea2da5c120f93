//! TB diagnosis, treatment courses and preventive therapy.

use crate::config::TbInputs;
use crate::patient::{MonthScratch, Patient, TbStatus, TestKind};
use crate::random::DrawId;
use crate::stats::CostCategory;

use super::Updater;
use super::state_updater::{UpdateContext, increment_costs};
use super::test_chain::{ChainOutcome, TestChain};

#[derive(Debug, Clone, Copy, Default)]
pub struct TbClinicalUpdater;

impl Updater for TbClinicalUpdater {
    fn name(&self) -> &'static str {
        "tb_clinical"
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        _month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        let config = ctx.config;
        let tb = &config.tb;
        if !tb.enabled {
            return;
        }
        if patient.tb.on_treatment {
            perform_treatment_update(patient, ctx, tb);
        }
        if patient.tb.on_proph {
            perform_proph_update(patient, ctx, tb);
        }
        perform_testing_update(patient, ctx, tb);
        perform_proph_start(patient, ctx, tb);
    }
}

/// Monthly treatment cost, default and end-of-course outcome
fn perform_treatment_update(patient: &mut Patient, ctx: &mut UpdateContext<'_>, tb: &TbInputs) {
    let month_num = patient.general.month_num;
    let Some(line) = patient.tb.treatment_line.and_then(|line| tb.treatment_lines.get(line)) else {
        patient.tb.on_treatment = false;
        return;
    };
    let started = patient.tb.month_treatment_started.unwrap_or(month_num);
    if month_num == started {
        return;
    }
    increment_costs(patient, ctx, CostCategory::TbTreatment, line.monthly_cost);

    if ctx.chance(line.monthly_prob_default, DrawId::TbTreatmentDefault) {
        let state = &mut patient.tb;
        state.on_treatment = false;
        state.month_treatment_ended = Some(month_num);
        state.status = TbStatus::TreatmentDefault;
        state.is_symptomatic = false;
        ctx.run_stats.tb_mut().defaults += 1;
        ctx.tracer.trace(month_num, format_args!("defaulted from TB treatment"));
        return;
    }

    if month_num - started < line.duration_months {
        return;
    }
    let strain = patient.tb.strain.map_or(0, |strain| strain.index());
    let cured = ctx.chance(line.prob_cure[strain], DrawId::TbCure);
    let state = &mut patient.tb;
    state.on_treatment = false;
    state.month_treatment_ended = Some(month_num);
    if cured {
        state.status = TbStatus::PreviouslyTreated;
        state.is_symptomatic = false;
        ctx.run_stats.tb_mut().cures += 1;
    } else {
        ctx.run_stats.tb_mut().treatment_failures += 1;
    }
    ctx.tracer.trace(month_num, format_args!("TB treatment completed (cured: {cured})"));
}

fn perform_proph_update(patient: &mut Patient, ctx: &mut UpdateContext<'_>, tb: &TbInputs) {
    let Some(proph) = tb.proph else {
        patient.tb.on_proph = false;
        return;
    };
    let month_num = patient.general.month_num;
    increment_costs(patient, ctx, CostCategory::TbProph, proph.monthly_cost);
    let started = patient.tb.month_proph_started.unwrap_or(month_num);
    if month_num.saturating_sub(started) + 1 >= proph.duration_months {
        patient.tb.on_proph = false;
        patient.tb.month_proph_completed = Some(month_num);
        ctx.run_stats.tb_mut().proph_completions += 1;
        ctx.tracer.trace(month_num, format_args!("completed TB prophylaxis"));
    }
}

/// Symptom-driven testing of active disease and routine screening in HIV care
fn perform_testing_update(patient: &mut Patient, ctx: &mut UpdateContext<'_>, tb: &TbInputs) {
    if patient.tb.on_treatment {
        return;
    }
    let month_num = patient.general.month_num;
    let truly_active = patient.tb.status.is_active();
    let chain = TestChain::new(TestKind::Tb, &tb.testing);

    let outcome = if let Some(pending) = patient.tb.pending_test.take() {
        chain.resume(patient, ctx, pending, truly_active)
    } else {
        let symptomatic = truly_active && patient.tb.is_symptomatic;
        let screening_due = patient.monitoring.care_state.is_in_care()
            && tb.screening_interval_months.is_some()
            && patient.tb.next_screening_month.is_none_or(|due| month_num >= due);
        if !symptomatic && !screening_due {
            return;
        }
        if screening_due {
            patient.tb.next_screening_month = tb.screening_interval_months.map(|interval| month_num + interval);
        }
        chain.run(patient, ctx, truly_active)
    };

    match outcome {
        ChainOutcome::Pending(pending) => patient.tb.pending_test = Some(pending),
        ChainOutcome::Positive { linked: true } if truly_active => start_treatment(patient, ctx, tb),
        _ => {}
    }
}

/// First course uses line 0; any retreatment uses the next line
fn start_treatment(patient: &mut Patient, ctx: &mut UpdateContext<'_>, tb: &TbInputs) {
    let month_num = patient.general.month_num;
    let previously_treated = patient.tb.month_treatment_ended.is_some();
    let line = if previously_treated {
        1.min(tb.treatment_lines.len().saturating_sub(1))
    } else {
        0
    };
    let Some(params) = tb.treatment_lines.get(line) else {
        return;
    };
    let state = &mut patient.tb;
    state.on_treatment = true;
    state.treatment_line = Some(line);
    state.month_treatment_started = Some(month_num);
    state.on_proph = false;
    increment_costs(patient, ctx, CostCategory::TbTreatment, params.initial_cost);
    ctx.run_stats.tb_mut().treatment_starts += 1;
    ctx.tracer.trace(month_num, format_args!("started TB treatment line {line}"));
}

/// Preventive therapy is offered once per life to HIV patients in care without active TB
fn perform_proph_start(patient: &mut Patient, ctx: &mut UpdateContext<'_>, tb: &TbInputs) {
    let Some(proph) = tb.proph else {
        return;
    };
    let state = &patient.tb;
    let eligible = patient.monitoring.care_state.is_in_care()
        && !state.status.is_active()
        && !state.on_treatment
        && !state.on_proph
        && !state.had_proph;
    if !eligible || !ctx.chance(proph.monthly_prob_start_in_care, DrawId::TbProphStart) {
        return;
    }
    let month_num = patient.general.month_num;
    patient.tb.on_proph = true;
    patient.tb.had_proph = true;
    patient.tb.month_proph_started = Some(month_num);
    increment_costs(patient, ctx, CostCategory::TbProph, proph.monthly_cost);
    ctx.run_stats.tb_mut().proph_starts += 1;
    ctx.tracer.trace(month_num, format_args!("started TB prophylaxis"));
}
