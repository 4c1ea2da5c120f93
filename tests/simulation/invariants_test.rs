#[cfg(test)]
mod tests {
    use hivsim::config::strata::{HVL_NUM_STRATA, cd4_strata};
    use hivsim::simulation::{initialize_patient, run_month};
    use hivsim::updaters::state_updater::monthly_discount_multiplier;
    use hivsim::{CostStats, Patient, PatientStream, RunStats, SimContext};

    use crate::utils::{hiv_positive_config, with_context, without_background_mortality};

    const HORIZON: u32 = 120;

    fn check_state(patient: &Patient, config: &SimContext) {
        let disease = &patient.disease;
        let general = &patient.general;
        assert!((0.0..=1.0).contains(&general.qol_value), "qol {}", general.qol_value);
        assert!((0.0..=config.run.cd4_max).contains(&disease.true_cd4));
        assert!((0.0..=config.run.cd4_percentage_max).contains(&disease.true_cd4_perc));
        assert_eq!(
            disease.true_cd4_strata,
            cd4_strata(disease.true_cd4, &config.run.cd4_strata_upper_bounds)
        );
        assert!(disease.min_true_cd4 <= disease.true_cd4);
        assert!(disease.true_hvl_strata < HVL_NUM_STRATA);
        assert!(general.lms_discounted <= general.lms_undiscounted + 1e-9);
        assert!(general.qalms_undiscounted <= general.lms_undiscounted + 1e-9);
        assert!(general.costs_discounted <= general.costs_undiscounted + 1e-9);
    }

    #[test]
    fn test_state_invariants_hold_every_month() {
        let config = hiv_positive_config();
        let multiplier = monthly_discount_multiplier(config.run.discount_rate_annual);

        for patient_id in 0..25 {
            let mut rng = PatientStream::new(17, patient_id);
            let mut run_stats = RunStats::new();
            let mut cost_stats = CostStats::new();
            with_context(&config, &mut rng, &mut run_stats, &mut cost_stats, |ctx| {
                let mut patient = initialize_patient(patient_id, ctx);
                assert!(patient.is_hiv_positive());
                check_state(&patient, &config);

                while patient.is_alive() && patient.general.month_num < HORIZON {
                    let month_before = patient.general.month_num;
                    let age_before = patient.general.age_months;
                    let discount_before = patient.general.discount_factor;
                    let lms_before = patient.general.lms_undiscounted;

                    run_month(&mut patient, ctx);
                    check_state(&patient, &config);

                    if patient.is_alive() {
                        assert_eq!(patient.general.month_num, month_before + 1);
                        assert_eq!(patient.general.age_months, age_before + 1);
                        let expected = discount_before * multiplier;
                        assert!((patient.general.discount_factor - expected).abs() < 1e-12);
                        assert_eq!(patient.general.lms_undiscounted, lms_before + 1.0);
                    } else {
                        assert_eq!(patient.general.month_num, month_before);
                        assert_eq!(patient.disease.death_month, Some(month_before));
                        assert!(patient.disease.cause_of_death.is_some());
                        assert_eq!(patient.general.lms_undiscounted, lms_before + 0.5);
                    }
                }
            });
            assert_eq!(run_stats.num_patients, 1);
            assert!(run_stats.total_deaths() <= 1);
        }
    }

    #[test]
    fn test_hiv_states_never_revert_to_negative() {
        let config = hiv_positive_config();
        let mut rng = PatientStream::new(3, 8);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        with_context(&config, &mut rng, &mut run_stats, &mut cost_stats, |ctx| {
            let mut patient = initialize_patient(8, ctx);
            while patient.is_alive() && patient.general.month_num < 60 {
                run_month(&mut patient, ctx);
                assert!(patient.is_hiv_positive());
            }
        });
    }

    #[test]
    fn test_envelopes_cap_cd4_across_running_pipeline() {
        let mut config = hiv_positive_config();
        without_background_mortality(&mut config);
        config.cohort.prob_detected_at_init = 1.0;
        config.cohort.prob_linked_at_init = 1.0;
        assert!(config.art.envelope_enabled);

        let mut capped_months = 0;
        for patient_id in 0..10 {
            let mut rng = PatientStream::new(41, patient_id);
            let mut run_stats = RunStats::new();
            let mut cost_stats = CostStats::new();
            with_context(&config, &mut rng, &mut run_stats, &mut cost_stats, |ctx| {
                let mut patient = initialize_patient(patient_id, ctx);
                while patient.is_alive() && patient.general.month_num < HORIZON {
                    run_month(&mut patient, ctx);
                    let art = &patient.art;
                    let cap = [art.overall_envelope, art.individual_envelope]
                        .iter()
                        .filter(|env| env.is_active)
                        .map(|env| env.value)
                        .reduce(f64::min);
                    if let Some(cap) = cap {
                        capped_months += 1;
                        assert!(
                            patient.disease.true_cd4 <= cap + 1e-9,
                            "CD4 {} above envelope {}",
                            patient.disease.true_cd4,
                            cap
                        );
                    }
                }
            });
        }
        assert!(capped_months > 0);
    }
}
