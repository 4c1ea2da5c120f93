//! HIV detection: routine testing of undetected adults, early infant
//! diagnosis for HIV-exposed infants and linkage of detected patients.

use crate::patient::{CareState, DetectionMethod, MonthScratch, Patient, TestKind};
use crate::random::DrawId;

use super::Updater;
use super::state_updater::{UpdateContext, set_detected_hiv_state, set_linked_state};
use super::test_chain::{ChainOutcome, TestChain};

#[derive(Debug, Clone, Copy, Default)]
pub struct HivTestUpdater;

impl Updater for HivTestUpdater {
    fn name(&self) -> &'static str {
        "hiv_test"
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        _month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        perform_linkage_update(patient, ctx);
        if patient.monitoring.is_detected {
            return;
        }
        if patient.general.is_pediatric {
            perform_eid_update(patient, ctx);
        } else {
            perform_routine_test_update(patient, ctx);
        }
    }
}

/// Detected patients not yet in care link with a monthly probability
fn perform_linkage_update(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let month_num = patient.general.month_num;
    let detected_earlier = patient
        .monitoring
        .month_detected
        .is_some_and(|detected| detected < month_num);
    if patient.monitoring.care_state != CareState::DetectedUnlinked || !detected_earlier {
        return;
    }
    let prob = ctx.config.hiv_testing.monthly_prob_link_after_detection;
    if ctx.chance(prob, DrawId::LinkAfterDetection) {
        set_linked_state(patient, ctx);
    }
}

fn perform_routine_test_update(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let testing = &config.hiv_testing;
    if !testing.enabled {
        return;
    }
    let chain = TestChain::new(TestKind::RoutineHiv, &testing.routine_test);
    let truly_positive = patient.is_hiv_positive();
    let outcome = match patient.monitoring.pending_hiv_test.take() {
        Some(pending) => chain.resume(patient, ctx, pending, truly_positive),
        None => chain.run(patient, ctx, truly_positive),
    };
    apply_outcome(patient, ctx, outcome, DetectionMethod::RoutineTest);
}

/// EID is offered at the configured ages to infants whose mother is HIV positive
fn perform_eid_update(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let config = ctx.config;
    let eid = &config.peds.eid;
    if !eid.enabled || !patient.peds.is_hiv_exposed() {
        return;
    }
    let chain = TestChain::new(TestKind::EarlyInfantDiagnosis, &eid.chain);
    let truly_positive = patient.is_hiv_positive();
    let outcome = if let Some(pending) = patient.peds.pending_eid.take() {
        chain.resume(patient, ctx, pending, truly_positive)
    } else if eid.test_ages_months.contains(&patient.general.age_months) {
        patient.peds.eid_tests_offered += 1;
        chain.run(patient, ctx, truly_positive)
    } else {
        return;
    };
    if let ChainOutcome::Pending(pending) = outcome {
        patient.peds.pending_eid = Some(pending);
        return;
    }
    apply_outcome(patient, ctx, outcome, DetectionMethod::EarlyInfantDiagnosis);
}

fn apply_outcome(patient: &mut Patient, ctx: &mut UpdateContext<'_>, outcome: ChainOutcome, method: DetectionMethod) {
    match outcome {
        ChainOutcome::Pending(pending) => patient.monitoring.pending_hiv_test = Some(pending),
        // False positives are counted by the chain; they never enter care
        ChainOutcome::Positive { linked } if patient.is_hiv_positive() => {
            set_detected_hiv_state(patient, ctx, method);
            if linked {
                set_linked_state(patient, ctx);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimContext, TestChainParams};
    use crate::patient::{HivState, MaternalHivState};
    use crate::random::ScriptedStream;
    use crate::stats::{CostStats, RunStats};
    use crate::updaters::Tracer;

    fn certain_chain() -> TestChainParams {
        TestChainParams {
            prob_offer: 1.0,
            prob_accept: 1.0,
            prob_result_return: 1.0,
            result_delay_months: 0,
            sensitivity: 1.0,
            specificity: 1.0,
            confirmatory: Vec::new(),
            prob_link: 0.0,
            ..TestChainParams::default()
        }
    }

    fn run_month(config: &SimContext, patient: &mut Patient) -> RunStats {
        let mut rng = ScriptedStream::new(0.5);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        {
            let mut ctx = UpdateContext::new(config, &mut rng, &mut run_stats, &mut cost_stats, Tracer::disabled());
            let mut month = MonthScratch::new();
            HivTestUpdater.perform_monthly_updates(patient, &mut month, &mut ctx);
        }
        run_stats
    }

    #[test]
    fn test_routine_detection_then_linkage_next_month() {
        let mut config = SimContext::default();
        config.hiv_testing.routine_test = certain_chain();
        config.hiv_testing.monthly_prob_link_after_detection = 1.0;
        let mut patient = Patient::new(0, &config);
        patient.disease.hiv_state = HivState::AsymptomaticChronic;
        patient.monitoring.care_state = CareState::Undetected;

        let stats = run_month(&config, &mut patient);
        assert!(patient.monitoring.is_detected);
        assert_eq!(patient.monitoring.care_state, CareState::DetectedUnlinked);
        assert_eq!(stats.detections_by_method[DetectionMethod::RoutineTest.index()], 1);

        // linkage is not drawn in the detection month
        let _ = run_month(&config, &mut patient);
        assert_eq!(patient.monitoring.care_state, CareState::DetectedUnlinked);
        patient.general.month_num = 1;
        let stats = run_month(&config, &mut patient);
        assert_eq!(patient.monitoring.care_state, CareState::InCare);
        assert_eq!(stats.cascade.first_linked, 1);
    }

    #[test]
    fn test_false_positive_does_not_detect() {
        let mut config = SimContext::default();
        let mut chain = certain_chain();
        chain.specificity = 0.0;
        config.hiv_testing.routine_test = chain;
        let mut patient = Patient::new(0, &config);
        let stats = run_month(&config, &mut patient);
        assert!(!patient.monitoring.is_detected);
        assert_eq!(stats.tests[TestKind::RoutineHiv.index()].false_positive, 1);
    }

    #[test]
    fn test_eid_only_at_scheduled_ages() {
        let mut config = SimContext::default();
        config.peds.enabled = true;
        config.peds.eid.chain = TestChainParams {
            prob_link: 1.0,
            ..certain_chain()
        };
        let mut patient = Patient::new(0, &config);
        patient.general.is_pediatric = true;
        patient.peds.maternal_status = MaternalHivState::Chronic;
        patient.disease.hiv_state = HivState::AsymptomaticChronic;
        patient.general.age_months = 1;
        run_month(&config, &mut patient);
        assert!(!patient.monitoring.is_detected);
        patient.general.age_months = 2;
        run_month(&config, &mut patient);
        assert_eq!(
            patient.monitoring.detection_method,
            Some(DetectionMethod::EarlyInfantDiagnosis)
        );
        assert_eq!(patient.monitoring.care_state, CareState::InCare);
        assert_eq!(patient.peds.eid_tests_offered, 1);
    }
}
