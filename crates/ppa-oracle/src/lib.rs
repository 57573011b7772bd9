//! # ppa-oracle
//!
//! Adapters between configurations and the external PPA oracle: the
//! request/response protocol, the subprocess evaluator and an in-process
//! evaluator for analytic cost models.

mod evaluator;
pub mod protocol;

pub use evaluator::{ArtifactPolicy, Evaluator, FnEvaluator, SubprocessEvaluator};
pub use protocol::{parse_response, render_request};
