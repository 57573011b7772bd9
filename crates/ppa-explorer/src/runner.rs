//! Side-by-side comparison of the random sweep and the surrogate search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use ppa_oracle::Evaluator;
use ppa_types::{Cost, ParameterSpace};

use crate::error::{ExplorationError, StrategyFailure};
use crate::search::{
    ExhaustiveOrRandomStrategy, SampleBudget, SurrogateGuidedStrategy, SurrogateOptimizer,
};
use crate::tracker::{Incumbent, RunOutcome, Trajectory};

/// Budgets and seed shared by one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPlan {
    pub random_budget: SampleBudget,
    pub surrogate_rounds: usize,
    pub surrogate_batch_size: usize,
    pub seed: u64,
}

/// Result of one strategy inside a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy: String,
    pub evaluations: usize,
    pub best: Option<Incumbent>,
    pub trajectory: Trajectory,
    /// Set when the strategy aborted; the trajectory is then partial.
    pub error: Option<String>,
}

impl StrategyReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn best_cost(&self) -> Option<Cost> {
        self.best.as_ref().map(|b| b.cost)
    }
}

impl From<RunOutcome> for StrategyReport {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            strategy: outcome.strategy,
            evaluations: outcome.evaluations,
            best: outcome.incumbent,
            trajectory: outcome.trajectory,
            error: None,
        }
    }
}

impl From<StrategyFailure> for StrategyReport {
    fn from(failure: StrategyFailure) -> Self {
        let mut report = Self::from(failure.partial);
        report.error = Some(failure.error.to_string());
        report
    }
}

/// Trajectories and incumbents of both strategies, ready for plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub id: Uuid,
    pub name: String,
    pub plan: ComparisonPlan,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub random: StrategyReport,
    pub surrogate: StrategyReport,
}

impl ComparisonReport {
    pub fn random_best(&self) -> Option<&Incumbent> {
        self.random.best.as_ref()
    }

    pub fn surrogate_best(&self) -> Option<&Incumbent> {
        self.surrogate.best.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.random.is_complete() && self.surrogate.is_complete()
    }

    /// Evaluations the surrogate needed to match the random sweep's best cost.
    pub fn surrogate_evaluations_to_match_random(&self) -> Option<usize> {
        let target = self.random.best_cost()?;
        self.surrogate.trajectory.evaluations_to_reach(target)
    }
}

/// Runs both strategies against one space and evaluator.
#[derive(Debug, Clone)]
pub struct ExplorationRunner {
    name: String,
}

impl ExplorationRunner {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Run the random sweep, then the surrogate search, each with its own
    /// tracker. A failure in one strategy never stops the other; if either
    /// fails, the full report travels inside the returned error.
    pub fn compare<E, O, F>(
        &self,
        space: &ParameterSpace,
        evaluator: &mut E,
        plan: &ComparisonPlan,
        optimizer_factory: F,
    ) -> Result<ComparisonReport, ExplorationError>
    where
        E: Evaluator + ?Sized,
        O: SurrogateOptimizer,
        F: FnOnce(&ParameterSpace, u64) -> O,
    {
        let started_at = Utc::now();
        info!(comparison = %self.name, dimensions = space.len(), "starting comparison");

        let mut failures = Vec::new();

        let random = ExhaustiveOrRandomStrategy::new(plan.random_budget, plan.seed)
            .run(space, evaluator)
            .map(StrategyReport::from)
            .unwrap_or_else(|failure| {
                failures.push(failure.to_string());
                StrategyReport::from(failure)
            });

        let mut optimizer = optimizer_factory(space, plan.seed);
        let surrogate =
            SurrogateGuidedStrategy::new(plan.surrogate_rounds, plan.surrogate_batch_size)
                .run(space, evaluator, &mut optimizer)
                .map(StrategyReport::from)
                .unwrap_or_else(|failure| {
                    failures.push(failure.to_string());
                    StrategyReport::from(failure)
                });

        let report = ComparisonReport {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            plan: *plan,
            started_at,
            finished_at: Utc::now(),
            random,
            surrogate,
        };

        if !failures.is_empty() {
            warn!(comparison = %self.name, failures = failures.len(), "comparison incomplete");
            return Err(ExplorationError::Comparison {
                report: Box::new(report),
                failures,
            });
        }

        info!(
            comparison = %self.name,
            random_best = ?report.random.best_cost(),
            surrogate_best = ?report.surrogate.best_cost(),
            surrogate_evaluations_to_match = ?report.surrogate_evaluations_to_match_random(),
            "comparison finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surrogate::PerturbationSurrogate;
    use ppa_oracle::FnEvaluator;
    use ppa_types::{Configuration, OracleError};

    fn space() -> ParameterSpace {
        ParameterSpace::builder()
            .int("x", 0, 7)
            .int("y", 0, 7)
            .build()
            .unwrap()
    }

    fn cost(config: &Configuration) -> Cost {
        let x = config.get("x").and_then(|v| v.as_int()).unwrap_or(0);
        let y = config.get("y").and_then(|v| v.as_int()).unwrap_or(0);
        ((x - 5) * (x - 5) + (y - 2) * (y - 2)) as Cost
    }

    fn plan() -> ComparisonPlan {
        ComparisonPlan {
            random_budget: SampleBudget::Limited(20),
            surrogate_rounds: 5,
            surrogate_batch_size: 4,
            seed: 42,
        }
    }

    #[test]
    fn compare_runs_both_strategies() {
        let space = space();
        let mut evaluator = FnEvaluator::new(|c: &Configuration| Ok(cost(c)));
        let report = ExplorationRunner::new("unit")
            .compare(&space, &mut evaluator, &plan(), |space, seed| {
                PerturbationSurrogate::new(space.clone(), 0.3, seed)
            })
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.random.strategy, "random");
        assert_eq!(report.surrogate.strategy, "surrogate");
        assert_eq!(report.random.trajectory.len(), 20);
        assert_eq!(report.surrogate.trajectory.len(), 20);
        assert_eq!(evaluator.calls(), 40);
        assert!(report.random_best().is_some());
        assert!(report.surrogate_best().is_some());
        assert!(report.finished_at >= report.started_at);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["plan"]["random_budget"]["limited"], 20);
        assert!(json["random"]["trajectory"].is_array());
    }

    #[test]
    fn factory_receives_the_plan_seed() {
        let space = space();
        let mut evaluator = FnEvaluator::new(|c: &Configuration| Ok(cost(c)));
        let mut seen_seed = None;
        ExplorationRunner::new("seed")
            .compare(&space, &mut evaluator, &plan(), |space, seed| {
                seen_seed = Some(seed);
                PerturbationSurrogate::new(space.clone(), 0.3, seed)
            })
            .unwrap();
        assert_eq!(seen_seed, Some(42));
    }

    #[test]
    fn random_failure_does_not_stop_surrogate() {
        let space = space();
        let mut calls = 0;
        let mut evaluator = FnEvaluator::new(|c: &Configuration| {
            calls += 1;
            if calls == 6 {
                return Err(OracleError::Callback {
                    message: "license server timeout".into(),
                });
            }
            Ok(cost(c))
        });

        let err = ExplorationRunner::new("isolation")
            .compare(&space, &mut evaluator, &plan(), |space, seed| {
                PerturbationSurrogate::new(space.clone(), 0.3, seed)
            })
            .unwrap_err();

        match err {
            ExplorationError::Comparison { report, failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("license server timeout"));
                assert!(!report.random.is_complete());
                assert_eq!(report.random.trajectory.len(), 5);
                assert!(report.surrogate.is_complete());
                assert_eq!(report.surrogate.trajectory.len(), 20);
            }
            other => panic!("expected Comparison error, got {other:?}"),
        }
    }

    #[test]
    fn surrogate_failure_keeps_complete_random_report() {
        let space = space();
        let mut calls = 0;
        // random sweep uses calls 1..=20; the surrogate's third batch fails
        let mut evaluator = FnEvaluator::new(|c: &Configuration| {
            calls += 1;
            if calls == 31 {
                return Err(OracleError::Callback {
                    message: "simulator crashed".into(),
                });
            }
            Ok(cost(c))
        });

        let err = ExplorationRunner::new("reverse-isolation")
            .compare(&space, &mut evaluator, &plan(), |space, seed| {
                PerturbationSurrogate::new(space.clone(), 0.3, seed)
            })
            .unwrap_err();

        match err {
            ExplorationError::Comparison { report, failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("simulator crashed"));
                assert!(report.random.is_complete());
                assert_eq!(report.random.trajectory.len(), 20);
                assert!(report.random_best().is_some());

                let error = report.surrogate.error.as_deref().unwrap();
                assert!(error.contains("simulator crashed"));
                assert_eq!(report.surrogate.evaluations, 8);
                assert_eq!(report.surrogate.trajectory.len(), 8);
                assert!(report.surrogate_best().is_some());
            }
            other => panic!("expected Comparison error, got {other:?}"),
        }
    }

    #[test]
    fn surrogate_contract_breach_is_reported_not_fatal() {
        struct Stingy(PerturbationSurrogate);

        impl SurrogateOptimizer for Stingy {
            fn suggest(&mut self, count: usize) -> Vec<Configuration> {
                self.0.suggest(count.saturating_sub(1))
            }

            fn observe(&mut self, configs: &[Configuration], costs: &[Cost]) {
                self.0.observe(configs, costs)
            }

            fn name(&self) -> &str {
                "stingy"
            }
        }

        let space = space();
        let mut evaluator = FnEvaluator::new(|c: &Configuration| Ok(cost(c)));
        let err = ExplorationRunner::new("contract")
            .compare(&space, &mut evaluator, &plan(), |space, seed| {
                Stingy(PerturbationSurrogate::new(space.clone(), 0.3, seed))
            })
            .unwrap_err();

        match err {
            ExplorationError::Comparison { report, failures } => {
                assert_eq!(failures.len(), 1);
                assert!(report.random.is_complete());
                assert_eq!(report.random.trajectory.len(), 20);
                assert!(report.surrogate.error.is_some());
                assert!(report.surrogate.trajectory.is_empty());
                assert!(report.surrogate_best().is_none());
            }
            other => panic!("expected Comparison error, got {other:?}"),
        }
        assert_eq!(evaluator.calls(), 20);
    }

    #[test]
    fn report_compares_sample_efficiency() {
        let space = space();
        let mut evaluator = FnEvaluator::new(|c: &Configuration| Ok(cost(c)));
        let plan = ComparisonPlan {
            random_budget: SampleBudget::Unbounded,
            ..plan()
        };
        let report = ExplorationRunner::new("efficiency")
            .compare(&space, &mut evaluator, &plan, |space, seed| {
                PerturbationSurrogate::new(space.clone(), 0.3, seed)
            })
            .unwrap();

        // exhaustive sweep always reaches the optimum
        assert_eq!(report.random.best_cost(), Some(0));
        assert_eq!(report.random.evaluations, 64);
        match report.surrogate_evaluations_to_match_random() {
            Some(n) => assert!(n <= report.surrogate.evaluations),
            None => assert!(report.surrogate.best_cost().unwrap() > 0),
        }
    }
}
