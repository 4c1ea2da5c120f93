//! ART late failure, resuppression and toxicity; OI prophylaxis resistance
//! and toxicity.

use crate::config::strata::HVL_SUPPRESSED;
use crate::patient::{ArtEfficacy, FailureType, HetOutcome, MonthScratch, Patient, ToxicityEvent};
use crate::random::DrawId;
use crate::stats::CostCategory;

use super::Updater;
use super::state_updater::{
    UpdateContext, activate_envelopes, apply_month_toxicity, current_art_line, draw_regimen_cd4_slope,
    increment_costs, set_art_failure, set_target_hvl_strata, start_next_art_regimen,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct DrugEfficacyUpdater;

impl Updater for DrugEfficacyUpdater {
    fn name(&self) -> &'static str {
        "drug_efficacy"
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        if !patient.is_hiv_positive() {
            return;
        }
        if patient.art.is_on_art {
            match patient.art.efficacy {
                ArtEfficacy::Success => perform_late_failure_update(patient, ctx),
                ArtEfficacy::Failure => perform_resuppression_update(patient, ctx),
            }
            perform_toxicity_update(patient, month, ctx);
        }
        perform_oi_proph_updates(patient, ctx);
    }
}

/// Monthly late failure probability, interpolated by the late-failure response factor
#[must_use]
pub fn late_failure_prob(patient: &Patient, nonresponder: f64, responder: f64) -> f64 {
    let rf = patient.art.response_factor(HetOutcome::LateFailure);
    (nonresponder + rf * (responder - nonresponder)).clamp(0.0, 1.0)
}

fn perform_late_failure_update(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let Some(line) = current_art_line(patient, config) else {
        return;
    };
    let prob = late_failure_prob(patient, line.late_failure_prob_nonresponder, line.late_failure_prob_responder);
    if !ctx.chance(prob, DrawId::LateFailure) {
        return;
    }
    set_art_failure(patient, config, FailureType::Late);
    ctx.run_stats.record_art_late_failure();
    ctx.tracer.trace(patient.general.month_num, format_args!("late ART failure"));
}

fn perform_resuppression_update(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let Some(line) = current_art_line(patient, config) else {
        return;
    };
    if line.prob_resuppression <= 0.0 {
        return;
    }
    let prob = line.prob_resuppression * patient.art.response_factor(HetOutcome::Resuppression);
    if !ctx.chance(prob, DrawId::Resuppression) {
        return;
    }
    let art = &mut patient.art;
    art.efficacy = ArtEfficacy::Success;
    art.failure_type = None;
    art.month_failure_started = None;
    art.latched_failed_multiplier = None;
    art.failed_hvl_tests = 0;
    art.regimen_slope_stage = None;
    set_target_hvl_strata(patient, HVL_SUPPRESSED);
    draw_regimen_cd4_slope(patient, ctx);
    if config.art.envelope_enabled {
        activate_envelopes(patient);
    }
    ctx.run_stats.record_art_resuppression();
    ctx.tracer.trace(patient.general.month_num, format_args!("resuppressed on ART"));
}

/// Major toxicity within the regimen's window; at most one episode per regimen
fn perform_toxicity_update(patient: &mut Patient, month: &mut MonthScratch, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let (Some(line_index), Some(months_on)) = (patient.art.curr_line, patient.months_on_regimen()) else {
        return;
    };
    let Some(toxicity) = current_art_line(patient, config).and_then(|line| line.toxicity) else {
        return;
    };
    if months_on >= toxicity.window_months || patient.art.toxicities.iter().any(|t| t.line == line_index) {
        return;
    }
    if !ctx.chance(toxicity.monthly_prob, DrawId::ArtToxicity) {
        return;
    }
    let month_num = patient.general.month_num;
    patient.art.toxicities.push(ToxicityEvent {
        line: line_index,
        month: month_num,
        forces_switch: toxicity.forces_switch,
    });
    month.art_toxicity = Some(line_index);
    apply_month_toxicity(month, toxicity.death_rate_ratio, toxicity.qol_modifier);
    increment_costs(patient, ctx, CostCategory::ArtToxicity, toxicity.cost);
    ctx.run_stats.record_art_toxicity();
    ctx.tracer.trace(month_num, format_args!("ART toxicity on line {line_index}"));

    if toxicity.forces_switch {
        if let Some(next) = start_next_art_regimen(patient, ctx) {
            month.art_started = true;
            ctx.tracer.trace(month_num, format_args!("switched to line {next} after toxicity"));
        }
    }
}

fn perform_oi_proph_updates(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let month_num = patient.general.month_num;
    for (oi, policy) in config.proph.by_oi.iter().enumerate() {
        let Some(state) = patient.proph.by_oi.get(oi).copied() else {
            continue;
        };
        if !state.is_on {
            continue;
        }
        let Some(line_index) = state.line else {
            continue;
        };
        let Some(line) = policy.lines.get(line_index) else {
            continue;
        };
        let mut state = state;
        if !state.is_resistant && ctx.chance(line.monthly_prob_resistance, DrawId::ProphResistance) {
            state.is_resistant = true;
            ctx.run_stats.record_oi_proph_resistance();
        }
        if ctx.chance(line.monthly_prob_toxicity, DrawId::ProphToxicity) {
            state.had_toxicity = true;
            ctx.run_stats.record_oi_proph_toxicity();
            patient.proph.by_oi[oi] = state;
            increment_costs(patient, ctx, CostCategory::OiProph, line.toxicity_cost);
            let next = line_index + 1;
            if line.switch_on_toxicity && next < policy.lines.len() {
                state.line = Some(next);
                state.month_started = Some(month_num);
                state.is_resistant = false;
            } else {
                state.is_on = false;
                state.lines_exhausted = next >= policy.lines.len();
            }
            ctx.tracer.trace(month_num, format_args!("OI {oi} prophylaxis toxicity"));
        }
        patient.proph.by_oi[oi] = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArtToxicity, ProphLine, ProphPolicy, SimContext};
    use crate::patient::{HivState, OiProphState};
    use crate::random::ScriptedStream;
    use crate::stats::{CostStats, RunStats};
    use crate::updaters::Tracer;
    use crate::updaters::state_updater::start_art_regimen;

    fn on_art(config: &SimContext) -> Patient {
        let mut patient = Patient::new(0, config);
        patient.disease.hiv_state = HivState::AsymptomaticChronic;
        patient.disease.setpoint_hvl_strata = 5;
        patient
    }

    fn run(config: &SimContext, patient: &mut Patient, rng: &mut ScriptedStream) -> (MonthScratch, RunStats, CostStats) {
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        let mut month = MonthScratch::new();
        {
            let mut ctx = UpdateContext::new(config, rng, &mut run_stats, &mut cost_stats, Tracer::disabled());
            if !patient.art.is_on_art {
                start_art_regimen(patient, &mut ctx, Some(ArtEfficacy::Success), 0);
            }
            DrugEfficacyUpdater.perform_monthly_updates(patient, &mut month, &mut ctx);
        }
        (month, run_stats, cost_stats)
    }

    #[test]
    fn test_late_failure_interpolation() {
        let config = SimContext::default();
        let mut patient = on_art(&config);
        patient.art.response_factors[HetOutcome::LateFailure.index()] = 0.5;
        assert!((late_failure_prob(&patient, 0.02, 0.002) - 0.011).abs() < 1e-12);
        patient.art.response_factors[HetOutcome::LateFailure.index()] = 1.0;
        assert!((late_failure_prob(&patient, 0.02, 0.002) - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_late_failure_targets_setpoint() {
        let mut config = SimContext::default();
        config.art.lines[0].late_failure_prob_nonresponder = 1.0;
        config.art.lines[0].late_failure_prob_responder = 1.0;
        config.art.lines[0].toxicity = None;
        let mut patient = on_art(&config);
        let mut rng = ScriptedStream::new(0.5);
        let (_, stats, _) = run(&config, &mut patient, &mut rng);
        assert_eq!(patient.art.efficacy, ArtEfficacy::Failure);
        assert_eq!(patient.art.failure_type, Some(FailureType::Late));
        assert_eq!(patient.disease.target_hvl_strata, 5);
        assert_eq!(
            patient.art.latched_failed_multiplier,
            Some(config.art.lines[0].failed_cd4_multiplier_late)
        );
        assert_eq!(stats.art_late_failures, 1);
    }

    #[test]
    fn test_toxicity_forces_switch() {
        let mut config = SimContext::default();
        for line in &mut config.art.lines {
            line.late_failure_prob_nonresponder = 0.0;
            line.late_failure_prob_responder = 0.0;
            line.toxicity = Some(ArtToxicity {
                monthly_prob: 1.0,
                ..ArtToxicity::default()
            });
        }
        let mut patient = on_art(&config);
        let mut rng = ScriptedStream::new(0.5);
        let (month, stats, costs) = run(&config, &mut patient, &mut rng);
        assert_eq!(month.art_toxicity, Some(0));
        assert!(month.art_started);
        assert_eq!(patient.art.curr_line, Some(1));
        assert_eq!(stats.art_toxicities, 1);
        assert_eq!(costs.undiscounted_for(CostCategory::ArtToxicity), ArtToxicity::default().cost);
        assert_eq!(month.mortality_risks.len(), 1);
    }

    #[test]
    fn test_oi_proph_toxicity_switches_line() {
        let mut config = SimContext::default();
        config.art.lines[0].toxicity = None;
        config.proph.by_oi = vec![ProphPolicy {
            lines: vec![
                ProphLine {
                    monthly_prob_toxicity: 1.0,
                    monthly_prob_resistance: 1.0,
                    ..ProphLine::default()
                },
                ProphLine::default(),
            ],
            ..ProphPolicy::default()
        }];
        let mut patient = on_art(&config);
        patient.proph.by_oi[0] = OiProphState {
            is_on: true,
            line: Some(0),
            month_started: Some(0),
            ..OiProphState::default()
        };
        let mut rng = ScriptedStream::new(0.5);
        let (_, stats, _) = run(&config, &mut patient, &mut rng);
        let state = patient.proph.by_oi[0];
        assert!(state.is_on);
        assert_eq!(state.line, Some(1));
        assert!(!state.is_resistant);
        assert!(state.had_toxicity);
        assert_eq!(stats.oi_proph_resistance, 1);
        assert_eq!(stats.oi_proph_toxicities, 1);
    }
}
