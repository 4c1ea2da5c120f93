//! TB natural history: infection, reinfection, reactivation, relapse,
//! self-cure and symptom onset. Active disease registers its mortality risk
//! and QOL burden for the month.

use crate::config::{SimContext, TbInputs};
use crate::patient::{CauseOfDeath, MonthScratch, Patient, TbStatus, TbStrain};
use crate::random::DrawId;

use super::Updater;
use super::state_updater::UpdateContext;

#[derive(Debug, Clone, Copy, Default)]
pub struct TbDiseaseUpdater;

impl Updater for TbDiseaseUpdater {
    fn name(&self) -> &'static str {
        "tb_disease"
    }

    fn perform_initial_updates(&self, patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
        let config = ctx.config;
        if !config.tb.enabled {
            return;
        }
        if ctx.chance(config.tb.prob_latent_at_init, DrawId::InitTbLatent) {
            patient.tb.status = TbStatus::Latent;
            patient.tb.month_infected = Some(patient.general.month_num);
            let strain = ctx.draw_category(&config.tb.strain_distribution, DrawId::InitTbStrain);
            patient.tb.strain = Some(TbStrain::ALL[strain]);
        }
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        let config = ctx.config;
        let tb = &config.tb;
        if !tb.enabled {
            return;
        }
        perform_infection_update(patient, ctx, tb);
        match patient.tb.status {
            TbStatus::Latent => {
                let prob = reactivation_prob(patient, config);
                if ctx.chance(prob, DrawId::TbReactivation) {
                    activate(patient, ctx, tb);
                    ctx.run_stats.tb_mut().activations += 1;
                }
            }
            TbStatus::PreviouslyTreated | TbStatus::TreatmentDefault => {
                let month_num = patient.general.month_num;
                let within_window = patient
                    .tb
                    .month_treatment_ended
                    .is_some_and(|end| month_num.saturating_sub(end) < tb.relapse_window_months);
                if within_window && ctx.chance(tb.monthly_relapse_prob, DrawId::TbRelapse) {
                    activate(patient, ctx, tb);
                    ctx.run_stats.tb_mut().relapses += 1;
                }
            }
            TbStatus::ActivePulmonary | TbStatus::ActiveExtrapulmonary => {
                if !patient.tb.on_treatment && ctx.chance(tb.monthly_self_cure_prob, DrawId::TbSelfCure) {
                    patient.tb.status = TbStatus::Latent;
                    patient.tb.is_symptomatic = false;
                    ctx.run_stats.tb_mut().self_cures += 1;
                    ctx.tracer.trace(patient.general.month_num, format_args!("TB self-cure"));
                } else if !patient.tb.is_symptomatic && ctx.chance(tb.monthly_symptom_prob, DrawId::TbSymptoms) {
                    patient.tb.is_symptomatic = true;
                }
            }
            TbStatus::Uninfected => {}
        }

        if patient.tb.status.is_active() {
            let mut ratio = if patient.tb.status == TbStatus::ActivePulmonary {
                tb.death_rate_ratio_pulmonary
            } else {
                tb.death_rate_ratio_extrapulmonary
            };
            if patient.tb.on_treatment {
                if let Some(line) = patient.tb.treatment_line.and_then(|line| tb.treatment_lines.get(line)) {
                    ratio *= line.death_rate_ratio_multiplier;
                }
            }
            month.add_mortality_risk(CauseOfDeath::Tb, ratio, tb.death_cost);
            month.add_qol_modifier(tb.active_qol_modifier);
        }
    }
}

/// New infection or reinfection; not possible while active or on treatment
fn perform_infection_update(patient: &mut Patient, ctx: &mut UpdateContext<'_>, tb: &TbInputs) {
    if patient.tb.status.is_active() || patient.tb.on_treatment {
        return;
    }
    let infected = patient.tb.status.is_infected();
    let mut prob = tb.monthly_infection_prob[usize::from(patient.is_hiv_positive())];
    if infected {
        prob *= tb.reinfection_multiplier;
    }
    if !ctx.chance(prob, DrawId::TbInfection) {
        return;
    }
    let month_num = patient.general.month_num;
    let strain = ctx.draw_category(&tb.strain_distribution, DrawId::TbStrain);
    patient.tb.strain = Some(TbStrain::ALL[strain]);
    patient.tb.month_infected = Some(month_num);
    if infected {
        ctx.run_stats.tb_mut().reinfections += 1;
    } else {
        ctx.run_stats.tb_mut().infections += 1;
    }
    if patient.tb.status == TbStatus::Uninfected {
        patient.tb.status = TbStatus::Latent;
    }
    ctx.tracer.trace(month_num, format_args!("TB infection (reinfection: {infected})"));
}

/// Monthly reactivation probability of latent TB
#[must_use]
pub fn reactivation_prob(patient: &Patient, config: &SimContext) -> f64 {
    let tb = &config.tb;
    let month_num = patient.general.month_num;
    let mut prob = if patient.is_hiv_positive() {
        tb.monthly_reactivation_prob_by_cd4[patient.disease.true_cd4_strata]
    } else {
        tb.monthly_reactivation_prob_hiv_negative
    };
    let recent = patient
        .tb
        .month_infected
        .is_some_and(|infected| month_num.saturating_sub(infected) < tb.recent_infection_months);
    if recent {
        prob *= tb.recent_infection_multiplier;
    }
    if let Some(proph) = tb.proph {
        let protected = patient.tb.on_proph
            || patient.tb.month_proph_completed.is_some_and(|completed| {
                month_num.saturating_sub(completed) < proph.protection_months_after_completion
            });
        if protected {
            prob *= 1.0 - proph.efficacy;
        }
    }
    prob.clamp(0.0, 1.0)
}

fn activate(patient: &mut Patient, ctx: &mut UpdateContext<'_>, tb: &TbInputs) {
    let month_num = patient.general.month_num;
    let pulmonary = ctx.chance(tb.prob_pulmonary, DrawId::TbPulmonary);
    let state = &mut patient.tb;
    state.status = if pulmonary {
        TbStatus::ActivePulmonary
    } else {
        TbStatus::ActiveExtrapulmonary
    };
    state.month_activated = Some(month_num);
    state.is_symptomatic = false;
    state.num_episodes += 1;
    if state.on_proph {
        state.on_proph = false;
    }
    ctx.tracer.trace(month_num, format_args!("TB activated ({:?})", patient.tb.status));
}
