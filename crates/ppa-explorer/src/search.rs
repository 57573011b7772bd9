//! Search strategies: seeded random sweeps over the grid and
//! surrogate-guided batch search.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ppa_oracle::Evaluator;
use ppa_types::{Configuration, Cost, OracleError, ParameterSpace};

use crate::error::{ExplorationError, StrategyFailure};
use crate::sampling::LazyPermutation;
use crate::tracker::{BestTracker, RunOutcome};

/// How many grid points a random sweep may evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleBudget {
    Unbounded,
    Limited(usize),
}

impl SampleBudget {
    /// Number of samples actually drawn from a grid of `grid_size` points.
    pub fn cap(&self, grid_size: u64) -> u64 {
        match self {
            Self::Unbounded => grid_size,
            Self::Limited(n) => grid_size.min(*n as u64),
        }
    }
}

impl From<usize> for SampleBudget {
    fn from(n: usize) -> Self {
        Self::Limited(n)
    }
}

impl From<Option<usize>> for SampleBudget {
    fn from(n: Option<usize>) -> Self {
        n.map_or(Self::Unbounded, Self::Limited)
    }
}

fn expect_costs(expected: usize, costs: Vec<Cost>) -> Result<Vec<Cost>, OracleError> {
    if costs.len() != expected {
        return Err(OracleError::CostCountMismatch {
            expected,
            got: costs.len(),
        });
    }
    Ok(costs)
}

fn finish(
    tracker: BestTracker,
    strategy: &str,
    result: Result<(), ExplorationError>,
) -> Result<RunOutcome, StrategyFailure> {
    let outcome = tracker.into_outcome(strategy);
    match result {
        Ok(()) => {
            info!(
                strategy,
                evaluations = outcome.evaluations,
                best = ?outcome.incumbent.as_ref().map(|i| i.cost),
                "strategy finished"
            );
            Ok(outcome)
        }
        Err(error) => {
            warn!(strategy, evaluations = outcome.evaluations, error = %error, "strategy aborted");
            Err(StrategyFailure {
                error,
                partial: outcome,
            })
        }
    }
}

// ---- Exhaustive / random sweep ----

/// Visits grid points in a seeded random order, one evaluation at a time.
///
/// With a budget at least as large as the grid, every point is evaluated
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExhaustiveOrRandomStrategy {
    budget: SampleBudget,
    seed: u64,
}

impl ExhaustiveOrRandomStrategy {
    pub const NAME: &'static str = "random";

    pub fn new(budget: impl Into<SampleBudget>, seed: u64) -> Self {
        Self {
            budget: budget.into(),
            seed,
        }
    }

    pub fn budget(&self) -> SampleBudget {
        self.budget
    }

    /// Order in which grid indices will be visited.
    pub fn schedule(&self, space: &ParameterSpace) -> Result<LazyPermutation, ExplorationError> {
        let grid_size = space.grid_size()?;
        Ok(LazyPermutation::seeded(grid_size, self.seed))
    }

    pub fn run<E>(
        &self,
        space: &ParameterSpace,
        evaluator: &mut E,
    ) -> Result<RunOutcome, StrategyFailure>
    where
        E: Evaluator + ?Sized,
    {
        let mut tracker = BestTracker::new();
        let result = self.run_with_tracker(space, evaluator, &mut tracker);
        finish(tracker, Self::NAME, result)
    }

    /// Run into a caller-owned tracker, which keeps any partial progress.
    pub fn run_with_tracker<E>(
        &self,
        space: &ParameterSpace,
        evaluator: &mut E,
        tracker: &mut BestTracker,
    ) -> Result<(), ExplorationError>
    where
        E: Evaluator + ?Sized,
    {
        let grid_size = space.grid_size()?;
        let samples = self.budget.cap(grid_size);
        info!(
            strategy = Self::NAME,
            grid_size,
            samples,
            seed = self.seed,
            evaluator = evaluator.name(),
            "starting grid sweep"
        );

        let take = usize::try_from(samples).unwrap_or(usize::MAX);
        for index in self.schedule(space)?.take(take) {
            let config = space.configuration_at(index)?;
            let costs = expect_costs(1, evaluator.evaluate(std::slice::from_ref(&config))?)?;
            let cost = costs[0];
            debug!(grid_index = index, cost, %config, "evaluated");
            if tracker.observe(&config, cost) {
                info!(evaluation = tracker.evaluations(), cost, %config, "new incumbent");
            }
        }
        Ok(())
    }
}

// ---- Surrogate-guided search ----

/// Sample-efficient optimizer capability injected into the surrogate strategy.
///
/// Implementations own their model entirely; the harness only asks for
/// candidates and reports their costs back.
pub trait SurrogateOptimizer {
    /// Propose the next `count` configurations to evaluate.
    fn suggest(&mut self, count: usize) -> Vec<Configuration>;

    /// Report evaluated configurations and their costs, index-aligned.
    fn observe(&mut self, configs: &[Configuration], costs: &[Cost]);

    /// Human-readable optimizer name.
    fn name(&self) -> &str;
}

impl<T: SurrogateOptimizer + ?Sized> SurrogateOptimizer for Box<T> {
    fn suggest(&mut self, count: usize) -> Vec<Configuration> {
        (**self).suggest(count)
    }

    fn observe(&mut self, configs: &[Configuration], costs: &[Cost]) {
        (**self).observe(configs, costs)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Batch loop around a [`SurrogateOptimizer`]: suggest, evaluate, observe.
///
/// Performs exactly `rounds * batch_size` evaluations on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurrogateGuidedStrategy {
    rounds: usize,
    batch_size: usize,
}

impl SurrogateGuidedStrategy {
    pub const NAME: &'static str = "surrogate";

    pub fn new(rounds: usize, batch_size: usize) -> Self {
        Self { rounds, batch_size }
    }

    pub fn evaluation_budget(&self) -> usize {
        self.rounds * self.batch_size
    }

    pub fn run<E, O>(
        &self,
        space: &ParameterSpace,
        evaluator: &mut E,
        optimizer: &mut O,
    ) -> Result<RunOutcome, StrategyFailure>
    where
        E: Evaluator + ?Sized,
        O: SurrogateOptimizer + ?Sized,
    {
        let mut tracker = BestTracker::new();
        let result = self.run_with_tracker(space, evaluator, optimizer, &mut tracker);
        finish(tracker, Self::NAME, result)
    }

    /// Run into a caller-owned tracker, which keeps any partial progress.
    pub fn run_with_tracker<E, O>(
        &self,
        space: &ParameterSpace,
        evaluator: &mut E,
        optimizer: &mut O,
        tracker: &mut BestTracker,
    ) -> Result<(), ExplorationError>
    where
        E: Evaluator + ?Sized,
        O: SurrogateOptimizer + ?Sized,
    {
        info!(
            strategy = Self::NAME,
            optimizer = optimizer.name(),
            rounds = self.rounds,
            batch_size = self.batch_size,
            evaluator = evaluator.name(),
            "starting surrogate search"
        );

        for round in 0..self.rounds {
            let batch = optimizer.suggest(self.batch_size);
            if batch.len() != self.batch_size {
                return Err(ExplorationError::SurrogateContract {
                    round,
                    expected: self.batch_size,
                    got: batch.len(),
                });
            }
            for config in &batch {
                space.validate(config)?;
            }

            let costs = expect_costs(batch.len(), evaluator.evaluate(&batch)?)?;
            optimizer.observe(&batch, &costs);

            if tracker.observe_batch(&batch, &costs) {
                if let Some(best) = tracker.best() {
                    info!(
                        evaluation = best.index + 1,
                        cost = best.cost,
                        config = %best.configuration,
                        "new incumbent"
                    );
                }
            }
            info!(round, best = ?tracker.best_cost(), "surrogate round complete");
        }
        Ok(())
    }
}
