//! # ppa-explorer
//!
//! Design-space exploration for PPA tuning.
//!
//! Provides a seeded random sweep over the configuration grid, a
//! surrogate-guided batch search driven by an injected optimizer, best-cost
//! trajectory tracking, and a runner that compares the two strategies'
//! sample efficiency against the same oracle.

mod config;
mod error;
mod runner;
mod sampling;
mod search;
mod surrogate;
mod tracker;

pub use config::{ExplorationConfig, OracleConfig};
pub use error::{ExplorationError, StrategyFailure};
pub use runner::{ComparisonPlan, ComparisonReport, ExplorationRunner, StrategyReport};
pub use sampling::LazyPermutation;
pub use search::{
    ExhaustiveOrRandomStrategy, SampleBudget, SurrogateGuidedStrategy, SurrogateOptimizer,
};
pub use surrogate::PerturbationSurrogate;
pub use tracker::{BestTracker, Incumbent, RunOutcome, Trajectory, TrajectoryPoint};
