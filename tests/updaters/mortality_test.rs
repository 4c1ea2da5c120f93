#[cfg(test)]
mod tests {
    use hivsim::patient::{CauseOfDeath, MonthScratch};
    use hivsim::updaters::mortality::select_cause;
    use hivsim::{DrawId, PatientStream, RandomStream};

    #[test]
    fn test_cause_frequencies_follow_rate_shares() {
        let mut month = MonthScratch::new();
        month.add_mortality_risk(CauseOfDeath::Hiv, 3.0, 0.0);
        month.add_mortality_risk(CauseOfDeath::Tb, 2.0, 0.0);

        let draws = 60_000;
        let mut counts = [0u32; 3];
        for patient_id in 0..draws {
            let mut rng = PatientStream::new(2024, patient_id);
            let u = rng.uniform(DrawId::CauseOfDeath);
            match select_cause(&month, 0.01, u).cause {
                CauseOfDeath::Background => counts[0] += 1,
                CauseOfDeath::Hiv => counts[1] += 1,
                CauseOfDeath::Tb => counts[2] += 1,
                other => panic!("unexpected cause {other}"),
            }
        }

        let expected = [1.0 / 6.0, 3.0 / 6.0, 2.0 / 6.0];
        for (count, share) in counts.iter().zip(expected) {
            let observed = f64::from(*count) / draws as f64;
            assert!((observed - share).abs() < 0.01, "observed {observed}, expected {share}");
        }
    }

    #[test]
    fn test_zero_background_falls_back() {
        let mut month = MonthScratch::new();
        month.add_mortality_risk(CauseOfDeath::Hiv, 3.0, 0.0);
        assert_eq!(select_cause(&month, 0.0, 0.9).cause, CauseOfDeath::Background);
    }

    #[test]
    fn test_selected_risk_carries_death_cost() {
        let mut month = MonthScratch::new();
        month.add_mortality_risk(CauseOfDeath::AcuteOi(0), 4.0, 250.0);
        let risk = select_cause(&month, 0.02, 0.99);
        assert_eq!(risk.cause, CauseOfDeath::AcuteOi(0));
        assert_eq!(risk.death_cost, 250.0);
    }
}
