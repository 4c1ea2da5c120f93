//! Offer → accept → result → confirm → link machinery shared by routine HIV
//! testing, early infant diagnosis and TB testing.
//!
//! A chain is stateless; a result with a return delay is handed back to the
//! caller as [`ChainOutcome::Pending`] and resumed with [`TestChain::resume`]
//! in a later month.

use crate::config::TestChainParams;
use crate::patient::{Patient, PendingTestResult, TestKind};
use crate::random::{DrawId, TestStage};
use crate::stats::{CostCategory, TestChainCounts};

use super::state_updater::{UpdateContext, increment_costs};

/// Where a chain stopped this month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    NotOffered,
    Declined,
    ResultLost,
    /// A result is on its way back
    Pending(PendingTestResult),
    Negative,
    /// Final positive result after every confirmatory test
    Positive { linked: bool },
}

/// Stage parameters of the initial or a confirmatory test
#[derive(Debug, Clone, Copy)]
struct StageParams {
    prob_accept: f64,
    prob_result_return: f64,
    result_delay_months: u32,
    sensitivity: f64,
    specificity: f64,
    cost: f64,
}

/// One configured diagnostic chain
#[derive(Debug, Clone, Copy)]
pub struct TestChain<'p> {
    kind: TestKind,
    params: &'p TestChainParams,
}

impl<'p> TestChain<'p> {
    #[must_use]
    pub const fn new(kind: TestKind, params: &'p TestChainParams) -> Self {
        Self { kind, params }
    }

    const fn cost_category(&self) -> CostCategory {
        match self.kind {
            TestKind::RoutineHiv => CostCategory::HivTest,
            TestKind::EarlyInfantDiagnosis => CostCategory::EidTest,
            TestKind::Tb => CostCategory::TbTest,
        }
    }

    const fn draw(&self, stage: TestStage) -> DrawId {
        DrawId::TestChain(self.kind, stage)
    }

    fn stage(&self, depth: usize) -> Option<StageParams> {
        if depth == 0 {
            let p = self.params;
            return Some(StageParams {
                prob_accept: p.prob_accept,
                prob_result_return: p.prob_result_return,
                result_delay_months: p.result_delay_months,
                sensitivity: p.sensitivity,
                specificity: p.specificity,
                cost: p.cost,
            });
        }
        self.params.confirmatory.get(depth - 1).map(|c| StageParams {
            prob_accept: c.prob_accept,
            prob_result_return: c.prob_result_return,
            result_delay_months: c.result_delay_months,
            sensitivity: c.sensitivity,
            specificity: c.specificity,
            cost: c.cost,
        })
    }

    fn counts<'c>(&self, ctx: &'c mut UpdateContext<'_>) -> &'c mut TestChainCounts {
        ctx.run_stats.test_mut(self.kind)
    }

    /// Draw the offer and, if offered, run the chain as far as it goes this month
    pub fn run(&self, patient: &mut Patient, ctx: &mut UpdateContext<'_>, truly_positive: bool) -> ChainOutcome {
        if !ctx.chance(self.params.prob_offer, self.draw(TestStage::Offer)) {
            return ChainOutcome::NotOffered;
        }
        self.counts(ctx).offered += 1;
        self.perform_test(patient, ctx, 0, truly_positive)
    }

    /// Continue from a pending result; stays pending until its return month
    pub fn resume(
        &self,
        patient: &mut Patient,
        ctx: &mut UpdateContext<'_>,
        pending: PendingTestResult,
        truly_positive: bool,
    ) -> ChainOutcome {
        if patient.general.month_num < pending.return_month {
            return ChainOutcome::Pending(pending);
        }
        self.receive_result(patient, ctx, pending.depth, pending.positive, truly_positive)
    }

    fn perform_test(
        &self,
        patient: &mut Patient,
        ctx: &mut UpdateContext<'_>,
        depth: usize,
        truly_positive: bool,
    ) -> ChainOutcome {
        let Some(stage) = self.stage(depth) else {
            return ChainOutcome::Negative;
        };
        let (accept_id, result_id) = if depth == 0 {
            (TestStage::Accept, TestStage::Result)
        } else {
            (TestStage::ConfirmAccept, TestStage::ConfirmResult)
        };
        if !ctx.chance(stage.prob_accept, self.draw(accept_id)) {
            if depth == 0 {
                self.counts(ctx).declined += 1;
            }
            patient.monitoring.num_missed_tests += 1;
            return ChainOutcome::Declined;
        }
        if depth == 0 {
            self.counts(ctx).accepted += 1;
        }
        increment_costs(patient, ctx, self.cost_category(), stage.cost);

        let positive = if truly_positive {
            ctx.chance(stage.sensitivity, self.draw(result_id))
        } else {
            !ctx.chance(stage.specificity, self.draw(result_id))
        };
        if depth == 0 {
            let counts = self.counts(ctx);
            match (truly_positive, positive) {
                (true, true) => counts.true_positive += 1,
                (true, false) => counts.false_negative += 1,
                (false, true) => counts.false_positive += 1,
                (false, false) => counts.true_negative += 1,
            }
        }

        if stage.result_delay_months == 0 {
            self.receive_result(patient, ctx, depth, positive, truly_positive)
        } else {
            ChainOutcome::Pending(PendingTestResult {
                depth,
                positive,
                return_month: patient.general.month_num + stage.result_delay_months,
            })
        }
    }

    fn receive_result(
        &self,
        patient: &mut Patient,
        ctx: &mut UpdateContext<'_>,
        depth: usize,
        positive: bool,
        truly_positive: bool,
    ) -> ChainOutcome {
        let Some(stage) = self.stage(depth) else {
            return ChainOutcome::Negative;
        };
        let return_id = if depth == 0 {
            TestStage::ResultReturn
        } else {
            TestStage::ConfirmResultReturn
        };
        if !ctx.chance(stage.prob_result_return, self.draw(return_id)) {
            self.counts(ctx).results_lost += 1;
            patient.monitoring.num_missed_tests += 1;
            return ChainOutcome::ResultLost;
        }
        self.counts(ctx).results_returned += 1;
        if !positive {
            return ChainOutcome::Negative;
        }
        if depth < self.params.confirmatory.len() {
            return self.perform_test(patient, ctx, depth + 1, truly_positive);
        }
        self.counts(ctx).confirmed += 1;
        let linked = ctx.chance(self.params.prob_link, self.draw(TestStage::Link));
        if linked {
            self.counts(ctx).linked += 1;
        }
        ChainOutcome::Positive { linked }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfirmatoryTest, SimContext};
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
            cost: 10.0,
            confirmatory: vec![ConfirmatoryTest::default()],
            prob_link: 1.0,
        }
    }

    #[test]
    fn test_positive_runs_confirmatory_and_links() {
        let config = SimContext::default();
        let params = certain_chain();
        let chain = TestChain::new(TestKind::RoutineHiv, &params);
        let mut patient = Patient::new(0, &config);
        let mut rng = ScriptedStream::new(0.5);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        let outcome = {
            let mut ctx = UpdateContext::new(&config, &mut rng, &mut run_stats, &mut cost_stats, Tracer::disabled());
            chain.run(&mut patient, &mut ctx, true)
        };
        assert_eq!(outcome, ChainOutcome::Positive { linked: true });
        let counts = run_stats.tests[TestKind::RoutineHiv.index()];
        assert_eq!(counts.offered, 1);
        assert_eq!(counts.true_positive, 1);
        assert_eq!(counts.results_returned, 2);
        assert_eq!(counts.confirmed, 1);
        assert_eq!(counts.linked, 1);
        let expected = params.cost + params.confirmatory[0].cost;
        assert_eq!(cost_stats.undiscounted_for(CostCategory::HivTest), expected);
    }

    #[test]
    fn test_declined_records_missed_test() {
        let config = SimContext::default();
        let mut params = certain_chain();
        params.prob_accept = 0.0;
        let chain = TestChain::new(TestKind::Tb, &params);
        let mut patient = Patient::new(0, &config);
        let mut rng = ScriptedStream::new(0.5);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        let outcome = {
            let mut ctx = UpdateContext::new(&config, &mut rng, &mut run_stats, &mut cost_stats, Tracer::disabled());
            chain.run(&mut patient, &mut ctx, true)
        };
        assert_eq!(outcome, ChainOutcome::Declined);
        assert_eq!(patient.monitoring.num_missed_tests, 1);
        assert_eq!(run_stats.tests[TestKind::Tb.index()].declined, 1);
        assert_eq!(cost_stats.total_undiscounted(), 0.0);
    }

    #[test]
    fn test_delayed_result_resumes_at_return_month() {
        let config = SimContext::default();
        let mut params = certain_chain();
        params.result_delay_months = 2;
        params.confirmatory.clear();
        let chain = TestChain::new(TestKind::EarlyInfantDiagnosis, &params);
        let mut patient = Patient::new(0, &config);
        patient.general.month_num = 5;
        let mut rng = ScriptedStream::new(0.5);
        let mut run_stats = RunStats::new();
        let mut cost_stats = CostStats::new();
        let mut ctx = UpdateContext::new(&config, &mut rng, &mut run_stats, &mut cost_stats, Tracer::disabled());
        let ChainOutcome::Pending(pending) = chain.run(&mut patient, &mut ctx, false) else {
            panic!("expected a pending result");
        };
        assert_eq!(pending.return_month, 7);
        patient.general.month_num = 6;
        assert_eq!(chain.resume(&mut patient, &mut ctx, pending, false), ChainOutcome::Pending(pending));
        patient.general.month_num = 7;
        assert_eq!(chain.resume(&mut patient, &mut ctx, pending, false), ChainOutcome::Negative);
    }
}
