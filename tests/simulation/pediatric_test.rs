#[cfg(test)]
mod tests {
    use hivsim::config::strata::{cd4_perc_strata, cd4_strata};
    use hivsim::patient::PedsAgeCategory;
    use hivsim::simulation::{initialize_patient, run_month};
    use hivsim::{CostStats, PatientStream, RunStats};

    use crate::utils::{pediatric_config, with_context, without_background_mortality};

    #[test]
    fn test_cd4_percentage_bounds_and_childhood_transition() {
        let mut config = pediatric_config();
        without_background_mortality(&mut config);
        let late_upper = config.peds.late_childhood_upper_months;

        for patient_id in 0..8 {
            let mut rng = PatientStream::new(31, patient_id);
            let mut run_stats = RunStats::new();
            let mut cost_stats = CostStats::new();
            let mut early_months = 0;
            let mut late_months = 0;
            with_context(&config, &mut rng, &mut run_stats, &mut cost_stats, |ctx| {
                let mut patient = initialize_patient(patient_id, ctx);
                assert!(patient.general.is_pediatric);
                assert!(patient.is_hiv_positive());
                assert_eq!(patient.peds.age_category, PedsAgeCategory::EarlyChildhood);
                assert!(patient.disease.uses_cd4_percentage);

                while patient.is_alive() && patient.general.age_months <= late_upper + 2 {
                    run_month(&mut patient, ctx);
                    let disease = &patient.disease;
                    assert!((0.0..=config.run.cd4_percentage_max).contains(&disease.true_cd4_perc));
                    assert_eq!(
                        disease.true_cd4_perc_strata,
                        cd4_perc_strata(disease.true_cd4_perc, &config.run.cd4_percentage_strata_upper_bounds)
                    );
                    match patient.peds.age_category {
                        PedsAgeCategory::EarlyChildhood => {
                            early_months += 1;
                            assert!(disease.uses_cd4_percentage);
                        }
                        PedsAgeCategory::LateChildhood | PedsAgeCategory::Adult => {
                            late_months += 1;
                            assert!(!disease.uses_cd4_percentage);
                            assert!((0.0..=config.run.cd4_max).contains(&disease.true_cd4));
                            assert_eq!(
                                disease.true_cd4_strata,
                                cd4_strata(disease.true_cd4, &config.run.cd4_strata_upper_bounds)
                            );
                            assert!(disease.min_true_cd4 <= disease.true_cd4);
                        }
                    }
                }
                assert!(patient.is_alive());
                assert!(patient.general.age_months > late_upper);
                assert_eq!(patient.peds.age_category, PedsAgeCategory::Adult);
                assert!(!patient.general.is_pediatric);
            });
            assert!(early_months > 0);
            assert!(late_months > 0);
            assert_eq!(run_stats.pediatric_infections.iter().sum::<u64>(), 1);
        }
    }
}
