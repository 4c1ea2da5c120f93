use hivsim::config::{InitialHivDistribution, PerinatalTransmission};
use hivsim::patient::{CareState, HivState};
use hivsim::random::RandomStream;
use hivsim::updaters::state_updater::set_true_cd4;
use hivsim::{CostStats, Patient, RunStats, SimContext, Tracer, UpdateContext};

/// Everyone starts HIV negative and stays negative
#[must_use]
pub fn hiv_negative_config() -> SimContext {
    let mut config = SimContext::default();
    config.cohort.initial_hiv_distribution = InitialHivDistribution {
        negative: 1.0,
        acute: 0.0,
        chronic: 0.0,
    };
    for row in &mut config.hiv_testing.monthly_infection_prob {
        *row = [0.0, 0.0];
    }
    config
}

/// Everyone starts with chronic HIV
#[must_use]
pub fn hiv_positive_config() -> SimContext {
    let mut config = SimContext::default();
    config.cohort.initial_hiv_distribution = InitialHivDistribution {
        negative: 0.0,
        acute: 0.0,
        chronic: 1.0,
    };
    config
}

/// Four-year-olds infected in utero, on the pediatric model
#[must_use]
pub fn pediatric_config() -> SimContext {
    let mut config = SimContext::default();
    config.peds.enabled = true;
    config.peds.prob_mother_positive = 1.0;
    for row in &mut config.peds.perinatal_transmission {
        row.fill(PerinatalTransmission {
            in_utero: 1.0,
            intra_partum: 0.0,
        });
    }
    config.cohort.initial_age_mean_months = 48.0;
    config.cohort.initial_age_sd_months = 0.0;
    config
}

/// Remove background mortality so runs end at the horizon
pub fn without_background_mortality(config: &mut SimContext) {
    config.mortality.background_monthly_rate = [vec![0.0], vec![0.0]];
}

/// Run `f` with an update context over the given stream and accumulators
pub fn with_context<R>(
    config: &SimContext,
    rng: &mut dyn RandomStream,
    run_stats: &mut RunStats,
    cost_stats: &mut CostStats,
    f: impl FnOnce(&mut UpdateContext<'_>) -> R,
) -> R {
    let mut ctx = UpdateContext::new(config, rng, run_stats, cost_stats, Tracer::disabled());
    f(&mut ctx)
}

/// A 30-year-old patient with chronic, undetected HIV at the given CD4
#[must_use]
pub fn chronic_patient(config: &SimContext, cd4: f64) -> Patient {
    let mut patient = Patient::new(0, config);
    patient.general.age_months = 30 * 12;
    patient.disease.hiv_state = HivState::AsymptomaticChronic;
    patient.disease.setpoint_hvl_strata = 5;
    patient.disease.true_hvl_strata = 5;
    patient.disease.target_hvl_strata = 5;
    set_true_cd4(&mut patient, config, cd4, true);
    patient.monitoring.care_state = CareState::Undetected;
    patient
}
