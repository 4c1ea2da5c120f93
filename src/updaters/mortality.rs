//! Competing-risk mortality.
//!
//! Every other updater has already registered its month's risks (acute OI,
//! active TB, ART toxicity) on the [`MonthScratch`]. This updater adds the
//! background, HIV, risk factor and comorbidity risks, draws death from the
//! combined rate and picks the cause in proportion to each risk's implied rate.

use crate::config::{MortalityModifier, SimContext};
use crate::patient::{CauseOfDeath, HetOutcome, MonthScratch, MortalityRisk, Patient};
use crate::random::DrawId;

use super::Updater;
use super::cd4_hvl::Cd4Branch;
use super::chrms::active_chrms;
use super::state_updater::{
    UpdateContext, age_year_index, current_art_line, draw_category, prob_to_rate, rate_to_prob,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct MortalityUpdater;

impl Updater for MortalityUpdater {
    fn name(&self) -> &'static str {
        "mortality"
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        let config = ctx.config;
        let background = background_monthly_rate(patient, config);

        if patient.general.age_months > config.run.max_patient_age_months {
            let risk = MortalityRisk {
                cause: CauseOfDeath::Background,
                rate_ratio: 1.0,
                death_cost: 0.0,
            };
            set_dead(patient, month, ctx, risk);
            return;
        }

        if patient.is_hiv_positive() {
            let ratio = hiv_death_rate_ratio(patient, config);
            if ratio > 1.0 {
                month.add_mortality_risk(CauseOfDeath::Hiv, ratio, 0.0);
            }
        }
        for (index, factor) in config.cohort.generic_risk_factors.iter().enumerate() {
            if patient.general.risk_factors.get(index).copied().unwrap_or(false) {
                month.add_mortality_risk(CauseOfDeath::RiskFactor(index), factor.death_rate_ratio, 0.0);
            }
        }
        if config.chrms.enabled {
            for index in active_chrms(patient) {
                if let Some(chrm) = config.chrms.chrms.get(index) {
                    month.add_mortality_risk(CauseOfDeath::Chrm(index), chrm.death_rate_ratio, 0.0);
                }
            }
        }

        let prob = rate_to_prob(background * month.combined_rate_ratio());
        if !ctx.chance(prob, DrawId::Death) {
            return;
        }
        let risk = select_cause(month, background, ctx.uniform(DrawId::CauseOfDeath));
        set_dead(patient, month, ctx, risk);
    }
}

/// Background monthly rate by age year and gender, with the run-level modifier
#[must_use]
pub fn background_monthly_rate(patient: &Patient, config: &SimContext) -> f64 {
    let table = &config.mortality.background_monthly_rate[patient.general.gender.index()];
    let rate = table
        .get(age_year_index(patient.general.age_months, table.len()))
        .copied()
        .unwrap_or(0.0);
    match config.mortality.background_modifier {
        None => rate,
        Some(MortalityModifier::Multiplicative(m)) => rate * m,
        Some(MortalityModifier::Incremental(m)) => {
            let p = rate_to_prob(rate);
            prob_to_rate(p + m - p * m)
        }
    }
}

/// HIV death rate ratio from CD4, reduced by effective ART and raised by a
/// recent severe OI
#[must_use]
pub fn hiv_death_rate_ratio(patient: &Patient, config: &SimContext) -> f64 {
    let disease = &patient.disease;
    let mut ratio = match Cd4Branch::for_patient(patient) {
        Cd4Branch::EarlyChildhood => config.peds.early_childhood_death_rate_ratio[disease.true_cd4_perc_strata],
        Cd4Branch::LateChildhood => config.peds.late_childhood_death_rate_ratio[disease.true_cd4_strata],
        Cd4Branch::Adolescent => config.adolescent.hiv_death_rate_ratio[disease.true_cd4_strata],
        Cd4Branch::Adult => config.nat_hist.hiv_death_rate_ratio[disease.true_cd4_strata],
    };
    if patient.is_suppressed_on_art() {
        if let Some(line) = current_art_line(patient, config) {
            let rf = patient.art.response_factor(HetOutcome::ArtEffectMortality);
            ratio *= 1.0 - rf * (1.0 - line.hiv_mortality_ratio_on_art);
        }
    }
    let month_num = patient.general.month_num;
    let history = config
        .nat_hist
        .oi
        .types
        .iter()
        .zip(&disease.last_oi_month)
        .filter(|(oi, last)| {
            oi.severe && last.is_some_and(|last| month_num.saturating_sub(last) < oi.history_effect_months)
        })
        .map(|(oi, _)| oi.history_death_rate_ratio)
        .fold(1.0, f64::max);
    ratio * history
}

/// Pick the cause of death by implied rate: the background rate for
/// background death and `background * ratio` for every registered risk
#[must_use]
pub fn select_cause(month: &MonthScratch, background: f64, u: f64) -> MortalityRisk {
    let fallback = MortalityRisk {
        cause: CauseOfDeath::Background,
        rate_ratio: 1.0,
        death_cost: 0.0,
    };
    let mut rates = Vec::with_capacity(month.mortality_risks.len() + 1);
    rates.push(background);
    rates.extend(month.mortality_risks.iter().map(|risk| background * risk.rate_ratio));
    let total: f64 = rates.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return fallback;
    }
    let probs: Vec<f64> = rates.iter().map(|rate| rate / total).collect();
    match draw_category(u, &probs) {
        0 => fallback,
        index => month.mortality_risks[index - 1],
    }
}

fn set_dead(patient: &mut Patient, month: &mut MonthScratch, ctx: &mut UpdateContext<'_>, risk: MortalityRisk) {
    let month_num = patient.general.month_num;
    month.death = Some(risk);
    patient.general.is_alive = false;
    patient.disease.cause_of_death = Some(risk.cause);
    patient.disease.death_month = Some(month_num);
    ctx.tracer.trace(month_num, format_args!("died of {}", risk.cause));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::HivState;
    use crate::random::ScriptedStream;
    use crate::stats::{CostStats, RunStats};
    use crate::updaters::Tracer;

    fn run_month(config: &SimContext, patient: &mut Patient, month: &mut MonthScratch, rng: &mut ScriptedStream) {
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        let mut ctx = UpdateContext::new(config, rng, &mut run_stats, &mut cost_stats, Tracer::disabled());
        MortalityUpdater.perform_monthly_updates(patient, month, &mut ctx);
    }

    #[test]
    fn test_modifiers_on_background_rate() {
        let mut config = SimContext::default();
        config.mortality.background_monthly_rate = [vec![0.01], vec![0.01]];
        let patient = Patient::new(0, &config);
        assert_eq!(background_monthly_rate(&patient, &config), 0.01);

        config.mortality.background_modifier = Some(MortalityModifier::Multiplicative(2.0));
        assert!((background_monthly_rate(&patient, &config) - 0.02).abs() < 1e-15);

        config.mortality.background_modifier = Some(MortalityModifier::Incremental(0.0));
        assert!((background_monthly_rate(&patient, &config) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_cause_selection_by_implied_rate() {
        let mut month = MonthScratch::new();
        month.add_mortality_risk(CauseOfDeath::Hiv, 3.0, 0.0);
        // background share is 0.25, HIV share 0.75
        assert_eq!(select_cause(&month, 0.01, 0.2).cause, CauseOfDeath::Background);
        assert_eq!(select_cause(&month, 0.01, 0.3).cause, CauseOfDeath::Hiv);
        assert_eq!(select_cause(&month, 0.0, 0.9).cause, CauseOfDeath::Background);
    }

    #[test]
    fn test_severe_oi_history_raises_ratio() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        patient.disease.hiv_state = HivState::AsymptomaticChronic;
        patient.disease.true_cd4_strata = 5;
        let base = hiv_death_rate_ratio(&patient, &config);
        assert_eq!(base, config.nat_hist.hiv_death_rate_ratio[5]);
        patient.general.month_num = 20;
        patient.disease.last_oi_month[0] = Some(15);
        let with_history = hiv_death_rate_ratio(&patient, &config);
        assert!((with_history - base * config.nat_hist.oi.types[0].history_death_rate_ratio).abs() < 1e-12);
        patient.disease.last_oi_month[0] = Some(1);
        assert_eq!(hiv_death_rate_ratio(&patient, &config), base);
    }

    #[test]
    fn test_adolescent_death_ratio_table() {
        let mut config = SimContext::default();
        config.adolescent.hiv_death_rate_ratio = [20.0, 10.0, 5.0, 2.5, 2.0, 1.5];
        let mut patient = Patient::new(0, &config);
        patient.disease.hiv_state = HivState::AsymptomaticChronic;
        patient.disease.true_cd4_strata = 2;
        assert_eq!(hiv_death_rate_ratio(&patient, &config), config.nat_hist.hiv_death_rate_ratio[2]);
        patient.general.is_adolescent = true;
        assert_eq!(hiv_death_rate_ratio(&patient, &config), 5.0);
    }

    #[test]
    fn test_max_age_is_certain_background_death() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        patient.general.age_months = config.run.max_patient_age_months + 1;
        let mut month = MonthScratch::new();
        let mut rng = ScriptedStream::new(0.99);
        run_month(&config, &mut patient, &mut month, &mut rng);
        assert!(!patient.is_alive());
        assert_eq!(patient.disease.cause_of_death, Some(CauseOfDeath::Background));
        assert!(month.died());
    }

    #[test]
    fn test_registered_risk_can_be_cause() {
        let mut config = SimContext::default();
        config.mortality.background_monthly_rate = [vec![1.0], vec![1.0]];
        let mut patient = Patient::new(0, &config);
        patient.general.age_months = 30 * 12;
        let mut month = MonthScratch::new();
        month.add_mortality_risk(CauseOfDeath::Tb, 9.0, 250.0);
        let mut rng = ScriptedStream::new(0.5).with_uniforms(DrawId::CauseOfDeath, &[0.95]);
        run_month(&config, &mut patient, &mut month, &mut rng);
        assert_eq!(patient.disease.cause_of_death, Some(CauseOfDeath::Tb));
        assert_eq!(month.death.map(|d| d.death_cost), Some(250.0));
        assert_eq!(patient.disease.death_month, Some(0));
    }
}
