#[cfg(test)]
mod tests {
    use hivsim::simulation::run_patient;
    use hivsim::updaters::state_updater::monthly_discount_multiplier;
    use hivsim::{CostCategory, CostStats, PatientStream, RunStats};

    use crate::utils::{hiv_negative_config, without_background_mortality};

    #[test]
    fn test_hiv_negative_patient_lives_full_horizon() {
        let mut config = hiv_negative_config();
        without_background_mortality(&mut config);
        config.run.max_months = Some(120);
        let mut rng = PatientStream::new(7, 3);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        let patient = run_patient(3, &config, &mut rng, &mut run_stats, &mut cost_stats);

        assert!(patient.is_alive());
        assert!(!patient.is_hiv_positive());
        assert_eq!(patient.general.month_num, 120);
        assert_eq!(patient.general.age_months, patient.general.initial_age_months + 120);
        assert_eq!(patient.general.lms_undiscounted, 120.0);
        assert_eq!(patient.general.qalms_undiscounted, 120.0 * config.qol.hiv_negative);

        let m = monthly_discount_multiplier(config.run.discount_rate_annual);
        let expected_discounted: f64 = (0..120).map(|k| m.powi(k)).sum();
        assert!((patient.general.lms_discounted - expected_discounted).abs() < 1e-9);
        assert!((patient.general.discount_factor - m.powi(120)).abs() < 1e-12);

        assert_eq!(run_stats.total_deaths(), 0);
        assert_eq!(run_stats.alive_by_month.len(), 120);
        assert!(run_stats.alive_by_month.iter().all(|&n| n == 1));
        assert!(cost_stats.undiscounted_for(CostCategory::RoutineCare) > 0.0);
        assert_eq!(cost_stats.undiscounted_for(CostCategory::Art), 0.0);
    }

    #[test]
    fn test_certain_death_in_first_month() {
        let mut config = hiv_negative_config();
        config.mortality.background_monthly_rate = [vec![100.0], vec![100.0]];
        let mut rng = PatientStream::new(1, 0);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        let patient = run_patient(0, &config, &mut rng, &mut run_stats, &mut cost_stats);

        assert!(!patient.is_alive());
        assert_eq!(patient.disease.death_month, Some(0));
        assert_eq!(patient.general.month_num, 0);
        assert_eq!(patient.general.lms_undiscounted, 0.5);
        assert_eq!(run_stats.total_deaths(), 1);
        assert_eq!(
            cost_stats.undiscounted_for(CostCategory::Death),
            config.costs.death_cost_by_cause.background
        );
    }
}
