#[cfg(test)]
mod tests {
    use hivsim::patient::{CareState, LtfuState};
    use hivsim::updaters::state_updater::{draw_category, set_curr_ltfu_state};
    use hivsim::{CostStats, RunStats, ScriptedStream};

    use crate::utils::{chronic_patient, hiv_positive_config, with_context};

    #[test]
    fn test_first_time_loss_counted_once() {
        let config = hiv_positive_config();
        let mut patient = chronic_patient(&config, 350.0);
        patient.monitoring.care_state = CareState::InCare;
        patient.monitoring.is_detected = true;
        patient.monitoring.is_linked = true;

        let mut rng = ScriptedStream::new(0.5);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        with_context(&config, &mut rng, &mut run_stats, &mut cost_stats, |ctx| {
            set_curr_ltfu_state(&mut patient, ctx, LtfuState::Lost);
            assert_eq!(patient.monitoring.care_state, CareState::Lost);
            set_curr_ltfu_state(&mut patient, ctx, LtfuState::Returned);
            assert_eq!(patient.monitoring.care_state, CareState::ReturnedToCare);
            set_curr_ltfu_state(&mut patient, ctx, LtfuState::Lost);
        });

        assert_eq!(patient.monitoring.ltfu_state, LtfuState::Lost);
        assert!(patient.monitoring.had_prev_ltfu);
        assert_eq!(run_stats.cascade.first_lost, 1);
        assert_eq!(run_stats.cascade.lost_events, 2);
        assert_eq!(run_stats.cascade.first_returned, 1);
        assert_eq!(run_stats.cascade.returned_events, 1);
    }

    #[test]
    fn test_categorical_draw_boundaries() {
        let probs = [0.2, 0.3, 0.5];
        assert_eq!(draw_category(0.0, &probs), 0);
        assert_eq!(draw_category(0.19, &probs), 0);
        assert_eq!(draw_category(0.2, &probs), 1);
        assert_eq!(draw_category(0.5, &probs), 2);
        assert_eq!(draw_category(0.6, &probs), 2);
        assert_eq!(draw_category(0.999, &probs), 2);
    }

    #[test]
    fn test_categorical_draw_exhaustion_falls_into_last() {
        assert_eq!(draw_category(0.95, &[0.5, 0.4]), 1);
        assert_eq!(draw_category(0.3, &[]), 0);
    }
}
