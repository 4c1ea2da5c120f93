//! Drive one patient from creation to death or the run horizon.

use crate::config::SimContext;
use crate::patient::{MonthScratch, Patient};
use crate::random::RandomStream;
use crate::stats::{CostStats, RunStats};
use crate::updaters::{PIPELINE, Tracer, UpdateContext};

/// Create a patient and apply every updater's initial draws
pub fn initialize_patient(patient_id: u64, ctx: &mut UpdateContext<'_>) -> Patient {
    let mut patient = Patient::new(patient_id, ctx.config);
    for updater in &PIPELINE {
        updater.perform_initial_updates(&mut patient, ctx);
    }
    ctx.tracer.trace(
        0,
        format_args!(
            "initialized: age {} months, {:?}, CD4 {:.0}",
            patient.general.age_months, patient.disease.hiv_state, patient.disease.true_cd4
        ),
    );
    patient
}

/// Run one month of the pipeline. Once mortality kills the patient, only the
/// settlement updater still runs.
pub fn run_month(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let mut month = MonthScratch::new();
    let Some((settle, monthly)) = PIPELINE.split_last() else {
        return;
    };
    for updater in monthly {
        if !patient.is_alive() {
            break;
        }
        updater.perform_monthly_updates(patient, &mut month, ctx);
    }
    settle.perform_monthly_updates(patient, &mut month, ctx);
}

/// Whether the patient should simulate another month
#[must_use]
pub fn should_continue(patient: &Patient, config: &SimContext) -> bool {
    patient.is_alive()
        && config
            .run
            .max_months
            .is_none_or(|horizon| patient.general.month_num < horizon)
}

/// Simulate a patient to completion, returning the final state
pub fn run_patient(
    patient_id: u64,
    config: &SimContext,
    rng: &mut dyn RandomStream,
    run_stats: &mut RunStats,
    cost_stats: &mut CostStats,
) -> Patient {
    let tracer = Tracer::new(patient_id < config.run.num_patients_to_trace, patient_id);
    let mut ctx = UpdateContext::new(config, rng, run_stats, cost_stats, tracer);
    let mut patient = initialize_patient(patient_id, &mut ctx);
    while should_continue(&patient, config) {
        run_month(&mut patient, &mut ctx);
    }
    patient
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitialHivDistribution;
    use crate::random::ScriptedStream;

    #[test]
    fn test_horizon_stops_living_patient() {
        let mut config = SimContext::default();
        config.run.max_months = Some(6);
        config.mortality.background_monthly_rate = [vec![0.0], vec![0.0]];
        let mut rng = ScriptedStream::new(0.5);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        let patient = run_patient(0, &config, &mut rng, &mut run_stats, &mut cost_stats);
        assert!(patient.is_alive());
        assert_eq!(patient.general.month_num, 6);
        assert_eq!(run_stats.num_patients, 1);
        assert_eq!(run_stats.total_lms_undiscounted, 6.0);
    }

    #[test]
    fn test_certain_death_settles_once() {
        let mut config = SimContext::default();
        config.cohort.initial_hiv_distribution = InitialHivDistribution {
            negative: 1.0,
            acute: 0.0,
            chronic: 0.0,
        };
        config.mortality.background_monthly_rate = [vec![50.0], vec![50.0]];
        let mut rng = ScriptedStream::new(0.5);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        let patient = run_patient(0, &config, &mut rng, &mut run_stats, &mut cost_stats);
        assert!(!patient.is_alive());
        assert_eq!(patient.general.month_num, 0);
        assert_eq!(patient.general.lms_undiscounted, 0.5);
        assert_eq!(run_stats.total_deaths(), 1);
    }
}
