//! Acute opportunistic infections.

use crate::config::SimContext;
use crate::patient::{
    CareState, CauseOfDeath, DetectionMethod, HetOutcome, HivState, LtfuState, MonthScratch,
    OiHistoryClass, Patient,
};
use crate::random::DrawId;
use crate::stats::CostCategory;

use super::Updater;
use super::state_updater::{
    UpdateContext, increment_costs, set_curr_ltfu_state, set_detected_hiv_state, set_linked_state,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct AcuteOiUpdater;

impl Updater for AcuteOiUpdater {
    fn name(&self) -> &'static str {
        "acute_oi"
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
        let config = ctx.config;
        for oi in 0..config.nat_hist.oi.types.len() {
            let prob = oi_monthly_prob(patient, config, oi);
            if ctx.chance(prob, DrawId::OiIncidence) {
                record_acute_oi(patient, month, ctx, oi);
                break;
            }
        }
    }
}

/// Incidence of one OI type after prophylaxis and ART effects
#[must_use]
pub fn oi_monthly_prob(patient: &Patient, config: &SimContext, oi: usize) -> f64 {
    let Some(oi_type) = config.nat_hist.oi.types.get(oi) else {
        return 0.0;
    };
    let strata = if patient.disease.uses_cd4_percentage {
        patient.disease.true_cd4_perc_strata
    } else {
        patient.disease.true_cd4_strata
    };
    let mut prob = oi_type.monthly_prob[strata];

    let proph = patient.proph.by_oi.get(oi).copied().unwrap_or_default();
    if proph.is_on {
        let line = proph
            .line
            .and_then(|line| config.proph.by_oi.get(oi).and_then(|policy| policy.lines.get(line)));
        if let Some(line) = line {
            let efficacy = if proph.is_resistant {
                line.resistant_efficacy
            } else {
                line.efficacy
            };
            prob *= 1.0 - efficacy;
        }
    }

    if patient.is_suppressed_on_art() {
        let rf = patient.art.response_factor(HetOutcome::ArtEffectOi);
        prob *= 1.0 - rf * (1.0 - config.nat_hist.oi.art_effect_ratio);
    }
    prob.clamp(0.0, 1.0)
}

fn record_acute_oi(patient: &mut Patient, month: &mut MonthScratch, ctx: &mut UpdateContext<'_>, oi: usize) {
    let config = ctx.config;
    let Some(oi_type) = config.nat_hist.oi.types.get(oi) else {
        return;
    };
    let month_num = patient.general.month_num;
    let disease = &mut patient.disease;
    if oi < u32::BITS as usize {
        disease.oi_history_bits |= 1 << oi;
    }
    let class = if oi_type.severe {
        OiHistoryClass::Severe
    } else {
        OiHistoryClass::Mild
    };
    disease.oi_history_class = disease.oi_history_class.max(class);
    if let Some(last) = disease.last_oi_month.get_mut(oi) {
        *last = Some(month_num);
    }
    disease.num_oi_episodes += 1;
    if disease.hiv_state == HivState::AsymptomaticChronic {
        disease.hiv_state = HivState::SymptomaticChronic;
    }

    month.acute_oi = Some(oi);
    month.add_mortality_risk(CauseOfDeath::AcuteOi(oi), oi_type.acute_death_rate_ratio, oi_type.death_cost);
    increment_costs(patient, ctx, CostCategory::OiTreatment, oi_type.treatment_cost);
    ctx.run_stats.record_oi(oi);
    ctx.tracer.trace(month_num, format_args!("acute {}", oi_type.name));

    if !patient.monitoring.is_detected {
        if ctx.chance(oi_type.prob_detection, DrawId::OiDetection) {
            set_detected_hiv_state(patient, ctx, DetectionMethod::OiPresentation);
            set_linked_state(patient, ctx);
        }
    } else if patient.monitoring.care_state == CareState::Lost
        && oi_type.severe
        && ctx.chance(oi_type.prob_return_to_care, DrawId::OiReturnToCare)
    {
        set_curr_ltfu_state(patient, ctx, LtfuState::Returned);
    }
}
