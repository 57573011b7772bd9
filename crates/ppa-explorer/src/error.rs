use thiserror::Error;

use ppa_types::{OracleError, SpaceError};

use crate::runner::ComparisonReport;
use crate::tracker::RunOutcome;

/// Failures raised while running a search strategy or a comparison.
#[derive(Error, Debug)]
pub enum ExplorationError {
    #[error("Parameter space error: {0}")]
    Space(#[from] SpaceError),

    #[error("Oracle invocation failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Surrogate suggested {got} configurations in round {round}, expected {expected}")]
    SurrogateContract {
        round: usize,
        expected: usize,
        got: usize,
    },

    /// At least one strategy of a comparison failed. The report still holds
    /// the completed strategy and the partial trajectory of the failed one.
    #[error("Comparison failed: {}", .failures.join("; "))]
    Comparison {
        report: Box<ComparisonReport>,
        failures: Vec<String>,
    },
}

/// A strategy error together with the progress made before it.
#[derive(Error, Debug)]
#[error("{} strategy failed after {} evaluations: {}", .partial.strategy, .partial.evaluations, .error)]
pub struct StrategyFailure {
    #[source]
    pub error: ExplorationError,
    pub partial: RunOutcome,
}
