//! Incumbent and best-cost trajectory tracking for a single run.

use serde::{Deserialize, Serialize};

use ppa_types::{Configuration, Cost};

/// One trajectory entry: best cost seen after evaluation `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub index: usize,
    pub best_cost: Cost,
}

/// Best-cost-so-far history, non-increasing by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrajectoryPoint> {
        self.points.iter()
    }

    /// The best-cost column on its own.
    pub fn best_costs(&self) -> Vec<Cost> {
        self.points.iter().map(|p| p.best_cost).collect()
    }

    pub fn final_best(&self) -> Option<Cost> {
        self.points.last().map(|p| p.best_cost)
    }

    /// Number of evaluations needed before the best cost reached `target`.
    pub fn evaluations_to_reach(&self, target: Cost) -> Option<usize> {
        self.points
            .iter()
            .find(|p| p.best_cost <= target)
            .map(|p| p.index + 1)
    }

    fn push(&mut self, point: TrajectoryPoint) {
        self.points.push(point);
    }
}

/// The best configuration observed in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incumbent {
    pub configuration: Configuration,
    pub cost: Cost,
    /// Evaluation index at which it was found.
    pub index: usize,
}

/// Final state of one strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub strategy: String,
    pub evaluations: usize,
    pub incumbent: Option<Incumbent>,
    pub trajectory: Trajectory,
}

/// Maintains the running incumbent and the trajectory for one run.
///
/// A new tracker is created per run; trackers never share state.
#[derive(Debug, Clone, Default)]
pub struct BestTracker {
    incumbent: Option<Incumbent>,
    trajectory: Trajectory,
    next_index: usize,
}

impl BestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one evaluation. Returns true when it became the new incumbent.
    ///
    /// Only a strictly lower cost replaces the incumbent, so the first
    /// configuration to reach a cost keeps it.
    pub fn observe(&mut self, configuration: &Configuration, cost: Cost) -> bool {
        let (index, improved) = self.consider(configuration, cost);
        self.record(index);
        improved
    }

    /// Record a batch evaluated together. Members are considered in order
    /// for the incumbent, but every member's trajectory entry carries the
    /// best cost after the whole batch. Returns true if the batch improved
    /// the incumbent.
    pub fn observe_batch(&mut self, configurations: &[Configuration], costs: &[Cost]) -> bool {
        let first = self.next_index;
        let mut improved = false;
        for (configuration, cost) in configurations.iter().zip(costs) {
            improved |= self.consider(configuration, *cost).1;
        }
        for index in first..self.next_index {
            self.record(index);
        }
        improved
    }

    fn consider(&mut self, configuration: &Configuration, cost: Cost) -> (usize, bool) {
        let index = self.next_index;
        self.next_index += 1;

        let improved = match &self.incumbent {
            None => true,
            Some(current) => cost < current.cost,
        };
        if improved {
            self.incumbent = Some(Incumbent {
                configuration: configuration.clone(),
                cost,
                index,
            });
        }
        (index, improved)
    }

    fn record(&mut self, index: usize) {
        if let Some(best_cost) = self.best_cost() {
            self.trajectory.push(TrajectoryPoint { index, best_cost });
        }
    }

    pub fn best(&self) -> Option<&Incumbent> {
        self.incumbent.as_ref()
    }

    pub fn best_cost(&self) -> Option<Cost> {
        self.incumbent.as_ref().map(|i| i.cost)
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Number of `observe` calls so far.
    pub fn evaluations(&self) -> usize {
        self.next_index
    }

    pub fn into_outcome(self, strategy: impl Into<String>) -> RunOutcome {
        RunOutcome {
            strategy: strategy.into(),
            evaluations: self.next_index,
            incumbent: self.incumbent,
            trajectory: self.trajectory,
        }
    }
}
