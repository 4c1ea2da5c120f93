//! HIV acquisition: initial serostatus, incident and vertical infection,
//! the acute to chronic transition and PrEP.

use crate::config::strata::cd4_strata;
use crate::config::{Gender, SimContext};
use crate::patient::{
    CareState, DetectionMethod, HivState, MaternalArt, MaternalHivState, MaternalHvl, MonthScratch,
    Patient, PedsAgeCategory, PedsHivType,
};
use crate::random::DrawId;

use super::Updater;
use super::state_updater::{
    UpdateContext, activate_envelopes, authoritative_cd4, deactivate_envelopes, heterogeneity_age_category,
    infection_age_category, peds_age_category, set_authoritative_cd4, set_detected_hiv_state,
    set_linked_state, set_setpoint_hvl_strata, set_target_hvl_strata, set_true_cd4,
    set_true_cd4_percentage, set_true_hvl_strata, start_prep, stop_prep, update_response_factors,
    weibull_monthly_prob,
};

/// Redraws allowed before a truncated Gaussian falls back to clamping
const MAX_REDRAWS: usize = 1000;

/// Draw a CD4 count.
///
/// With the square-root transform the Gaussian is on the square-root scale:
/// the draw is squared and re-rolled until under `max`. Otherwise the draw is
/// re-rolled until it lies in `[0, max]`.
pub fn draw_initial_cd4(
    ctx: &mut UpdateContext<'_>,
    mean: f64,
    sd: f64,
    sqrt_transform: bool,
    max: f64,
    id: DrawId,
) -> f64 {
    let mut draw = mean;
    for _ in 0..MAX_REDRAWS {
        draw = ctx.gaussian(mean, sd, id);
        if sqrt_transform {
            let squared = draw * draw;
            if squared < max {
                return squared;
            }
        } else if (0.0..=max).contains(&draw) {
            return draw;
        }
    }
    if sqrt_transform {
        (draw * draw).min(max)
    } else {
        draw.clamp(0.0, max)
    }
}

/// HIV acquisition and staging
#[derive(Debug, Clone, Copy, Default)]
pub struct HivInfectionUpdater;

impl Updater for HivInfectionUpdater {
    fn name(&self) -> &'static str {
        "hiv_infection"
    }

    fn perform_initial_updates(&self, patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
        let config = ctx.config;
        let cohort = &config.cohort;

        let age = ctx
            .gaussian(cohort.initial_age_mean_months, cohort.initial_age_sd_months, DrawId::InitAge)
            .max(0.0)
            .round() as u32;
        patient.general.age_months = age;
        patient.general.initial_age_months = age;
        patient.general.gender = if ctx.chance(cohort.prob_male, DrawId::InitGender) {
            Gender::Male
        } else {
            Gender::Female
        };
        patient.general.risk_category =
            ctx.draw_category(&cohort.risk_category_distribution, DrawId::InitRiskCategory);
        for (flag, factor) in patient
            .general
            .risk_factors
            .iter_mut()
            .zip(&cohort.generic_risk_factors)
        {
            *flag = ctx.chance(factor.prevalence, DrawId::InitRiskFactor);
        }

        let het = &config.art.heterogeneity;
        let category = heterogeneity_age_category(age, config);
        let mean = het
            .propensity_mean_by_age_category
            .get(category)
            .or_else(|| het.propensity_mean_by_age_category.last())
            .copied()
            .unwrap_or(0.0);
        patient.art.propensity_logit = ctx.gaussian(mean, het.propensity_sd, DrawId::InitPropensity);
        update_response_factors(patient, config, 0.0);

        patient.general.is_pediatric = config.is_pediatric_age(age);
        patient.general.is_adolescent = config.is_adolescent_age(age);
        patient.peds.age_category = peds_age_category(age, config);

        if patient.general.is_pediatric {
            initialize_pediatric(patient, ctx);
        } else {
            initialize_adult(patient, ctx);
        }
        ctx.run_stats.record_patient_start(patient.is_hiv_positive());
        ctx.tracer.trace(
            0,
            format_args!(
                "initialized: age {} months, {:?}, HIV {:?}, CD4 {:.1}",
                age, patient.general.gender, patient.disease.hiv_state, patient.disease.true_cd4
            ),
        );
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        _month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        if patient.general.is_pediatric {
            perform_pediatric_updates(patient, ctx);
        }
        perform_adolescent_updates(patient, ctx);
        if !patient.is_hiv_positive() {
            perform_hiv_new_infection_updates(patient, ctx);
            perform_prep_updates(patient, ctx);
        }
        if patient.disease.chronic_transition_month == Some(patient.general.month_num) {
            perform_chronic_transition(patient, ctx);
        }
    }
}

fn initialize_adult(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let cohort = &config.cohort;
    let state = if patient.general.pre_designated_hiv_negative {
        0
    } else {
        ctx.draw_category(&cohort.initial_hiv_distribution.as_array(), DrawId::InitHivState)
    };
    patient.disease.hiv_state = match state {
        0 => HivState::Negative,
        1 => HivState::Acute,
        _ => HivState::AsymptomaticChronic,
    };
    if !patient.is_hiv_positive() {
        patient.monitoring.care_state = CareState::HivNegative;
        return;
    }

    let cd4 = draw_initial_cd4(
        ctx,
        cohort.initial_cd4_mean,
        cohort.initial_cd4_sd,
        cohort.initial_cd4_sqrt_transform,
        config.run.cd4_max,
        DrawId::InitCd4,
    );
    set_true_cd4(patient, config, cd4, true);
    let strata = cd4_strata(cd4, &config.run.cd4_strata_upper_bounds);
    let setpoint = ctx.draw_category(&cohort.initial_hvl_distribution[strata], DrawId::InitSetpointHvl);
    set_setpoint_hvl_strata(patient, setpoint);
    let current = if patient.disease.hiv_state == HivState::Acute {
        patient.disease.month_of_infection = Some(0);
        patient.disease.chronic_transition_month = Some(config.nat_hist.acute_to_chronic_months);
        ctx.draw_category(&cohort.initial_acute_hvl_distribution, DrawId::InitAcuteHvl)
    } else {
        setpoint
    };
    set_true_hvl_strata(patient, current);
    set_target_hvl_strata(patient, current);

    patient.monitoring.care_state = CareState::Undetected;
    if ctx.chance(cohort.prob_detected_at_init, DrawId::InitDetected) {
        set_detected_hiv_state(patient, ctx, DetectionMethod::AtInitialization);
        if ctx.chance(cohort.prob_linked_at_init, DrawId::InitLinked) {
            set_linked_state(patient, ctx);
        }
    }
}

fn initialize_pediatric(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let peds = &config.peds;
    patient.monitoring.care_state = CareState::HivNegative;

    if ctx.chance(peds.prob_breastfeeding, DrawId::PedsBreastfeeding) {
        let max = f64::from(peds.max_breastfeeding_months);
        let mut stop_age = max;
        for _ in 0..MAX_REDRAWS {
            let draw = ctx.gaussian(
                peds.breastfeeding_stop_age_mean,
                peds.breastfeeding_stop_age_sd,
                DrawId::PedsBreastfeedingStopAge,
            );
            if draw <= max {
                stop_age = draw.max(0.0);
                break;
            }
        }
        patient.peds.breastfeeding_stop_age = stop_age.round() as u32;
        patient.peds.is_breastfeeding = patient.general.age_months < patient.peds.breastfeeding_stop_age;
    }

    if !ctx.chance(peds.prob_mother_positive, DrawId::PedsMotherPositive) {
        return;
    }
    patient.peds.maternal_status = MaternalHivState::Chronic;
    patient.peds.maternal_status_known =
        ctx.chance(peds.prob_maternal_status_known, DrawId::PedsMaternalStatusKnown);
    let art = MaternalArt::ALL[ctx.draw_category(&peds.maternal_art_distribution, DrawId::PedsMaternalArt)];
    patient.peds.maternal_art = art;
    patient.peds.maternal_hvl = if ctx.chance(peds.prob_maternal_high_hvl[art.index()], DrawId::PedsMaternalHvl) {
        MaternalHvl::High
    } else {
        MaternalHvl::Low
    };

    let transmission = peds.perinatal_transmission[art.index()][patient.peds.maternal_hvl.index()];
    let none = (1.0 - transmission.in_utero - transmission.intra_partum).max(0.0);
    let route = match ctx.draw_category(
        &[transmission.in_utero, transmission.intra_partum, none],
        DrawId::PedsPerinatalTransmission,
    ) {
        0 => Some(PedsHivType::InUtero),
        1 => Some(PedsHivType::IntraPartum),
        _ => None,
    };

    if let Some(route) = route {
        infect_pediatric(patient, ctx, route);
    } else if patient.peds.maternal_status_known {
        if let Some(proph) = peds.infant_proph {
            if ctx.chance(proph.prob_given_if_status_known, DrawId::PedsInfantProph) {
                patient.peds.on_infant_proph = true;
                patient.peds.infant_proph_month_started = Some(patient.general.month_num);
            }
        }
    }
}

/// Infect a child by vertical transmission; children start chronic
fn infect_pediatric(patient: &mut Patient, ctx: &mut UpdateContext<'_>, route: PedsHivType) {
    let config = ctx.config;
    let peds = &config.peds;
    let month = patient.general.month_num;
    patient.disease.hiv_state = HivState::AsymptomaticChronic;
    patient.disease.month_of_infection = Some(month);
    patient.peds.infection_type = Some(route);
    patient.peds.on_infant_proph = false;
    patient.monitoring.care_state = CareState::Undetected;

    let perc = ctx.gaussian(
        peds.initial_cd4_perc_mean[route.index()],
        peds.initial_cd4_perc_sd,
        DrawId::PedsInitialCd4Perc,
    );
    set_true_cd4_percentage(patient, config, perc, true);
    patient.disease.uses_cd4_percentage = true;
    if patient.peds.age_category != PedsAgeCategory::EarlyChildhood {
        convert_cd4_percentage_to_absolute(patient, ctx);
    }

    let setpoint = ctx.draw_category(&peds.setpoint_distribution, DrawId::PedsSetpointHvl);
    set_setpoint_hvl_strata(patient, setpoint);
    set_true_hvl_strata(patient, setpoint);
    set_target_hvl_strata(patient, setpoint);
    ctx.run_stats.record_pediatric_infection(route.index());
    ctx.tracer.trace(month, format_args!("pediatric infection ({route:?})"));
}

/// Early to late childhood: absolute CD4 is drawn around a mean chosen by CD4 percentage strata
fn convert_cd4_percentage_to_absolute(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let peds = &config.peds;
    let mean = peds.transition_cd4_mean[patient.disease.true_cd4_perc_strata];
    let cd4 = ctx.gaussian(mean, peds.transition_cd4_sd, DrawId::PedsTransitionCd4);
    patient.disease.uses_cd4_percentage = false;
    deactivate_envelopes(patient);
    set_true_cd4(patient, config, cd4, true);
    patient.art.regimen_slope_stage = None;
    if patient.is_suppressed_on_art() && config.art.envelope_enabled {
        activate_envelopes(patient);
    }
}

fn perform_pediatric_updates(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let peds = &config.peds;
    let month = patient.general.month_num;
    let age = patient.general.age_months;

    let category = peds_age_category(age, config);
    if category != patient.peds.age_category {
        let previous = patient.peds.age_category;
        patient.peds.age_category = category;
        if previous == PedsAgeCategory::EarlyChildhood && patient.is_hiv_positive() {
            convert_cd4_percentage_to_absolute(patient, ctx);
        }
        if category == PedsAgeCategory::Adult {
            patient.general.is_pediatric = false;
        }
        ctx.tracer.trace(month, format_args!("pediatric age category {previous:?} -> {category:?}"));
    }

    if patient.peds.is_breastfeeding && age >= patient.peds.breastfeeding_stop_age {
        patient.peds.is_breastfeeding = false;
    }

    if patient.peds.is_breastfeeding && patient.peds.maternal_status == MaternalHivState::Negative {
        if ctx.chance(peds.monthly_maternal_incidence, DrawId::PedsMaternalIncidence) {
            patient.peds.maternal_status = MaternalHivState::AcuteDuringBreastfeeding;
            patient.peds.maternal_status_known = false;
            patient.peds.maternal_art = MaternalArt::OffArt;
            patient.peds.maternal_hvl = MaternalHvl::High;
        }
    } else if patient.peds.maternal_art != MaternalArt::OffArt
        && ctx.chance(peds.monthly_maternal_art_dropout, DrawId::PedsMaternalArtDropout)
    {
        patient.peds.maternal_art = MaternalArt::OffArt;
        let high = peds.prob_maternal_high_hvl[MaternalArt::OffArt.index()];
        patient.peds.maternal_hvl = if ctx.chance(high, DrawId::PedsMaternalHvl) {
            MaternalHvl::High
        } else {
            MaternalHvl::Low
        };
    }

    if patient.peds.on_infant_proph {
        let duration = peds.infant_proph.map_or(0, |p| p.duration_months);
        let started = patient.peds.infant_proph_month_started.unwrap_or(month);
        if month.saturating_sub(started) >= duration {
            patient.peds.on_infant_proph = false;
        }
    }

    if patient.peds.is_breastfeeding && patient.peds.is_hiv_exposed() && !patient.is_hiv_positive() {
        let mut prob = peds.monthly_postpartum_transmission[patient.peds.maternal_art.index()]
            [patient.peds.maternal_hvl.index()];
        if patient.peds.on_infant_proph {
            prob *= 1.0 - peds.infant_proph.map_or(0.0, |p| p.efficacy);
        }
        if ctx.chance(prob, DrawId::PedsPostpartumTransmission) {
            infect_pediatric(patient, ctx, PedsHivType::PostPartum);
        }
    }
}

fn perform_adolescent_updates(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let is_adolescent = ctx.config.is_adolescent_age(patient.general.age_months);
    if is_adolescent != patient.general.is_adolescent {
        patient.general.is_adolescent = is_adolescent;
        patient.art.regimen_slope_stage = None;
        ctx.tracer.trace(
            patient.general.month_num,
            format_args!("adolescent model {}", if is_adolescent { "entered" } else { "left" }),
        );
    }
}

/// Incident adult infection; a no-op for patients already infected
fn perform_hiv_new_infection_updates(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let testing = &config.hiv_testing;
    if patient.is_hiv_positive() || patient.general.is_pediatric || !testing.enabled {
        return;
    }
    let category = infection_age_category(patient.general.age_months, config);
    let Some(probs) = testing
        .monthly_infection_prob
        .get(category)
        .or_else(|| testing.monthly_infection_prob.last())
    else {
        return;
    };
    let multiplier = testing
        .risk_multipliers
        .get(patient.general.risk_category)
        .copied()
        .unwrap_or(1.0);
    let mut prob = probs[patient.general.gender.index()] * multiplier;
    if patient.monitoring.on_prep {
        prob *= 1.0 - testing.prep.efficacy;
    }
    if !ctx.chance(prob, DrawId::HivInfection) {
        return;
    }

    let month = patient.general.month_num;
    patient.disease.hiv_state = HivState::Acute;
    patient.disease.month_of_infection = Some(month);
    patient.disease.chronic_transition_month = Some(month + config.nat_hist.acute_to_chronic_months);
    let cd4 = draw_initial_cd4(
        ctx,
        testing.infection_cd4_mean,
        testing.infection_cd4_sd,
        false,
        config.run.cd4_max,
        DrawId::InfectionCd4,
    );
    set_true_cd4(patient, config, cd4, true);
    let acute = ctx.draw_category(&testing.acute_hvl_distribution, DrawId::InfectionAcuteHvl);
    set_true_hvl_strata(patient, acute);
    set_target_hvl_strata(patient, acute);
    let setpoint = ctx.draw_category(&testing.setpoint_distribution, DrawId::InfectionSetpointHvl);
    set_setpoint_hvl_strata(patient, setpoint);
    if patient.monitoring.care_state == CareState::HivNegative {
        patient.monitoring.care_state = CareState::Undetected;
    }
    ctx.run_stats.record_infection();
    ctx.tracer.trace(month, format_args!("incident HIV infection (CD4 {cd4:.1})"));
}

/// PrEP uptake and dropout for HIV-negative patients
fn perform_prep_updates(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let prep = &config.hiv_testing.prep;
    let month = patient.general.month_num;
    if !prep.enabled || patient.is_hiv_positive() || month < prep.rollout_month {
        return;
    }
    if patient.monitoring.on_prep {
        let started = patient.monitoring.month_prep_started.unwrap_or(month);
        let t = month.saturating_sub(started);
        let prob = weibull_monthly_prob(prep.dropout_coverage, prep.dropout_duration_months, prep.dropout_shape, t);
        if ctx.chance(prob, DrawId::PrepDropout) {
            stop_prep(patient, ctx);
        }
        return;
    }
    if !is_prep_eligible(patient, config) || patient.monitoring.ever_prep {
        return;
    }
    let t = month - prep.rollout_month + 1;
    let prob = weibull_monthly_prob(prep.coverage, prep.uptake_duration_months, prep.uptake_shape, t);
    if ctx.chance(prob, DrawId::PrepUptake) {
        start_prep(patient, ctx);
    }
}

/// Acute to chronic: new setpoint, HVL reset unless suppressed, CD4 drop
fn perform_chronic_transition(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let nat_hist = &config.nat_hist;
    let current = patient.disease.setpoint_hvl_strata;
    let setpoint = ctx.draw_category(&nat_hist.setpoint_transition[current], DrawId::ChronicSetpointHvl);
    set_setpoint_hvl_strata(patient, setpoint);
    if !patient.is_suppressed_on_art() {
        set_true_hvl_strata(patient, setpoint);
        set_target_hvl_strata(patient, setpoint);
    }
    let shift = ctx.gaussian(
        nat_hist.chronic_cd4_shift_mean,
        nat_hist.chronic_cd4_shift_sd,
        DrawId::ChronicCd4Shift,
    );
    let current_cd4 = authoritative_cd4(patient);
    set_authoritative_cd4(patient, config, current_cd4 - shift, false);
    if patient.disease.hiv_state == HivState::Acute {
        patient.disease.hiv_state = HivState::AsymptomaticChronic;
    }
    ctx.run_stats.record_chronic_transition();
    ctx.tracer.trace(
        patient.general.month_num,
        format_args!("chronic transition, setpoint {current} -> {setpoint}"),
    );
}

/// Whether the patient may take up PrEP once the rollout has started
#[must_use]
pub fn is_prep_eligible(patient: &Patient, config: &SimContext) -> bool {
    let prep = &config.hiv_testing.prep;
    prep.enabled
        && !patient.is_hiv_positive()
        && !patient.general.is_pediatric
        && (prep.eligible_risk_categories.is_empty()
            || prep.eligible_risk_categories.contains(&patient.general.risk_category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedStream;
    use crate::stats::{CostStats, RunStats};
    use crate::updaters::Tracer;

    fn run<F: FnOnce(&mut UpdateContext<'_>)>(config: &SimContext, rng: &mut ScriptedStream, f: F) -> RunStats {
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        {
            let mut ctx = UpdateContext::new(config, rng, &mut run_stats, &mut cost_stats, Tracer::disabled());
            f(&mut ctx);
        }
        run_stats
    }

    #[test]
    fn test_sqrt_transform_squares_and_rerolls() {
        let config = SimContext::default();
        let mut rng = ScriptedStream::new(0.5).with_scores(DrawId::InitCd4, &[10.0, 1.0]);
        let mut value = 0.0;
        run(&config, &mut rng, |ctx| {
            // 20 + 2*10 = 40 -> 1600 > 1000 rejected; 20 + 2*1 = 22 -> 484 accepted
            value = draw_initial_cd4(ctx, 20.0, 2.0, true, 1000.0, DrawId::InitCd4);
        });
        assert_eq!(value, 484.0);
    }

    #[test]
    fn test_plain_cd4_draw_rerolls_negative() {
        let config = SimContext::default();
        let mut rng = ScriptedStream::new(0.5).with_scores(DrawId::InitCd4, &[-5.0, 0.5]);
        let mut value = 0.0;
        run(&config, &mut rng, |ctx| {
            value = draw_initial_cd4(ctx, 100.0, 100.0, false, 2000.0, DrawId::InitCd4);
        });
        assert_eq!(value, 150.0);
    }

    #[test]
    fn test_pre_designated_negative_is_not_prevalent() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        patient.general.pre_designated_hiv_negative = true;
        let mut rng = ScriptedStream::new(0.5);
        let stats = run(&config, &mut rng, |ctx| {
            HivInfectionUpdater.perform_initial_updates(&mut patient, ctx);
        });
        assert!(!patient.is_hiv_positive());
        assert_eq!(patient.monitoring.care_state, CareState::HivNegative);
        assert_eq!(stats.num_hiv_positive_at_init, 0);
    }

    #[test]
    fn test_default_cohort_starts_chronic_and_undetected() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        let mut rng = ScriptedStream::new(0.5);
        run(&config, &mut rng, |ctx| {
            HivInfectionUpdater.perform_initial_updates(&mut patient, ctx);
        });
        assert_eq!(patient.disease.hiv_state, HivState::AsymptomaticChronic);
        assert_eq!(patient.monitoring.care_state, CareState::Undetected);
        assert_eq!(patient.disease.true_cd4, config.cohort.initial_cd4_mean);
        assert_eq!(patient.general.age_months, 420);
    }

    #[test]
    fn test_incident_infection_sets_acute_and_transition_month() {
        let mut config = SimContext::default();
        config.hiv_testing.monthly_infection_prob = vec![[1.0, 1.0]];
        config.hiv_testing.infection_age_bounds = Vec::new();
        let mut patient = Patient::new(0, &config);
        patient.general.month_num = 5;
        patient.general.age_months = 300;
        let mut rng = ScriptedStream::new(0.5);
        let stats = run(&config, &mut rng, |ctx| {
            let mut month = MonthScratch::new();
            HivInfectionUpdater.perform_monthly_updates(&mut patient, &mut month, ctx);
            // second call in the same state must not infect twice
            HivInfectionUpdater.perform_monthly_updates(&mut patient, &mut month, ctx);
        });
        assert_eq!(patient.disease.hiv_state, HivState::Acute);
        assert_eq!(patient.disease.chronic_transition_month, Some(7));
        assert_eq!(patient.monitoring.care_state, CareState::Undetected);
        assert_eq!(stats.incident_infections, 1);
    }

    #[test]
    fn test_chronic_transition_resets_hvl_to_setpoint() {
        let config = SimContext::default();
        let mut patient = Patient::new(0, &config);
        patient.disease.hiv_state = HivState::Acute;
        patient.disease.setpoint_hvl_strata = 3;
        patient.disease.true_hvl_strata = 6;
        patient.disease.chronic_transition_month = Some(2);
        patient.general.month_num = 2;
        set_true_cd4(&mut patient, &config, 500.0, true);
        let mut rng = ScriptedStream::new(0.5);
        run(&config, &mut rng, |ctx| {
            let mut month = MonthScratch::new();
            HivInfectionUpdater.perform_monthly_updates(&mut patient, &mut month, ctx);
        });
        assert_eq!(patient.disease.hiv_state, HivState::AsymptomaticChronic);
        assert_eq!(patient.disease.true_hvl_strata, 3);
        assert_eq!(patient.disease.target_hvl_strata, 3);
    }

    #[test]
    fn test_prep_uptake_and_efficacy() {
        let mut config = SimContext::default();
        config.hiv_testing.prep.enabled = true;
        config.hiv_testing.prep.coverage = 1.0;
        config.hiv_testing.monthly_infection_prob = vec![[0.0, 0.0]];
        config.hiv_testing.infection_age_bounds = Vec::new();
        let mut patient = Patient::new(0, &config);
        patient.general.age_months = 300;
        let mut rng = ScriptedStream::new(0.5);
        let stats = run(&config, &mut rng, |ctx| {
            let mut month = MonthScratch::new();
            HivInfectionUpdater.perform_monthly_updates(&mut patient, &mut month, ctx);
        });
        assert!(patient.monitoring.on_prep);
        assert!(patient.monitoring.ever_prep);
        assert_eq!(stats.prep_starts, 1);
        assert!(is_prep_eligible(&patient, &config));
    }

    #[test]
    fn test_prep_uptake_respects_risk_category() {
        let mut config = SimContext::default();
        config.hiv_testing.prep.enabled = true;
        config.hiv_testing.prep.coverage = 1.0;
        config.hiv_testing.prep.eligible_risk_categories = vec![1];
        config.hiv_testing.monthly_infection_prob = vec![[0.0, 0.0]];
        config.hiv_testing.infection_age_bounds = Vec::new();
        let mut patient = Patient::new(0, &config);
        patient.general.age_months = 300;
        patient.general.risk_category = 0;
        assert!(!is_prep_eligible(&patient, &config));
        let mut rng = ScriptedStream::new(0.5);
        let stats = run(&config, &mut rng, |ctx| {
            let mut month = MonthScratch::new();
            HivInfectionUpdater.perform_monthly_updates(&mut patient, &mut month, ctx);
        });
        assert!(!patient.monitoring.on_prep);
        assert_eq!(stats.prep_starts, 0);
    }
}
