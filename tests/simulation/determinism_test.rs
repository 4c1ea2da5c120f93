#[cfg(test)]
mod tests {
    use hivsim::simulation::run_patient;
    use hivsim::{CohortOptions, CostStats, PatientStream, RunStats, run_cohort};

    use crate::utils::hiv_positive_config;

    #[test]
    fn test_same_seed_same_patient() {
        let config = hiv_positive_config();
        let run = |seed: u64| {
            let mut rng = PatientStream::new(seed, 11);
            let mut run_stats = RunStats::new();
            let mut cost_stats = CostStats::new();
            let patient = run_patient(11, &config, &mut rng, &mut run_stats, &mut cost_stats);
            (patient, run_stats, cost_stats)
        };
        let (a, stats_a, costs_a) = run(99);
        let (b, stats_b, costs_b) = run(99);
        assert_eq!(a.general.month_num, b.general.month_num);
        assert_eq!(a.disease.cause_of_death, b.disease.cause_of_death);
        assert_eq!(a.disease.true_cd4, b.disease.true_cd4);
        assert_eq!(a.general.costs_undiscounted, b.general.costs_undiscounted);
        assert_eq!(a.general.qalms_discounted, b.general.qalms_discounted);
        assert_eq!(stats_a.deaths_by_family, stats_b.deaths_by_family);
        assert_eq!(costs_a, costs_b);
    }

    #[test]
    fn test_cohort_repeatable() {
        let mut config = hiv_positive_config();
        config.run.max_months = Some(60);
        let options = CohortOptions {
            num_patients: 64,
            seed: 5,
            chunk_size: 16,
            ..CohortOptions::default()
        };
        let first = run_cohort(&config, &options).expect("cohort run");
        let second = run_cohort(&config, &options).expect("cohort run");
        assert_eq!(first.run_stats.num_patients, 64);
        assert_eq!(first.run_stats.num_hiv_positive_at_init, 64);
        assert_eq!(first.run_stats.deaths_by_family, second.run_stats.deaths_by_family);
        assert_eq!(first.run_stats.total_lms_undiscounted, second.run_stats.total_lms_undiscounted);
        assert_eq!(first.cost_stats, second.cost_stats);
    }
}
