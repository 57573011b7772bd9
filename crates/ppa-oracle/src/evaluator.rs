//! Evaluators: adapters from batches of configurations to costs.

use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

use ppa_types::{Configuration, Cost, OracleError};

use crate::protocol::{parse_response, render_request};

/// Scores batches of configurations.
///
/// Takes `&mut self`, so one evaluator instance can never be driven from two
/// threads at once.
pub trait Evaluator {
    /// Return one cost per configuration, in input order.
    fn evaluate(&mut self, batch: &[Configuration]) -> Result<Vec<Cost>, OracleError>;

    /// Human-readable evaluator name.
    fn name(&self) -> &str {
        "evaluator"
    }
}

/// Where request artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactPolicy {
    /// A fresh temporary file per invocation, removed once the oracle exits.
    Temporary { dir: Option<PathBuf> },
    /// One path reused for every invocation.
    Fixed(PathBuf),
}

impl Default for ArtifactPolicy {
    fn default() -> Self {
        Self::Temporary { dir: None }
    }
}

/// Runs the external oracle as `<binary> <scenario> <flag> <request>`.
#[derive(Debug)]
pub struct SubprocessEvaluator {
    binary: PathBuf,
    scenario: PathBuf,
    config_flag: String,
    artifacts: ArtifactPolicy,
    parallel: bool,
    invocations: AtomicUsize,
}

impl SubprocessEvaluator {
    pub fn new(binary: impl Into<PathBuf>, scenario: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            scenario: scenario.into(),
            config_flag: "-c".to_string(),
            artifacts: ArtifactPolicy::default(),
            parallel: false,
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn with_config_flag(mut self, flag: impl Into<String>) -> Self {
        self.config_flag = flag.into();
        self
    }

    pub fn with_artifacts(mut self, policy: ArtifactPolicy) -> Self {
        self.artifacts = policy;
        self.check_parallelism();
        self
    }

    /// Reuse one request file for every call (the simulator's historical mode).
    pub fn with_fixed_artifact(self, path: impl Into<PathBuf>) -> Self {
        self.with_artifacts(ArtifactPolicy::Fixed(path.into()))
    }

    /// Evaluate batch members concurrently. Only honoured with temporary
    /// artifacts, since concurrent oracles must not share a request file.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self.check_parallelism();
        self
    }

    fn check_parallelism(&self) {
        if self.parallel && matches!(self.artifacts, ArtifactPolicy::Fixed(_)) {
            warn!(
                binary = %self.binary.display(),
                "parallel evaluation disabled: request artifact path is shared"
            );
        }
    }

    fn runs_parallel(&self) -> bool {
        self.parallel && matches!(self.artifacts, ArtifactPolicy::Temporary { .. })
    }

    /// Number of oracle processes launched so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::Relaxed)
    }

    fn invoke(&self, config: &Configuration) -> Result<Cost, OracleError> {
        let request = render_request(config);
        match &self.artifacts {
            ArtifactPolicy::Fixed(path) => {
                std::fs::write(path, &request).map_err(|source| OracleError::Artifact {
                    path: path.clone(),
                    source,
                })?;
                self.run_oracle(path)
            }
            ArtifactPolicy::Temporary { dir } => {
                let dir = dir.clone().unwrap_or_else(std::env::temp_dir);
                let artifact_error = |source| OracleError::Artifact {
                    path: dir.clone(),
                    source,
                };
                let mut file = tempfile::Builder::new()
                    .prefix("ppa-probe-")
                    .suffix(".cfg")
                    .tempfile_in(&dir)
                    .map_err(artifact_error)?;
                file.write_all(request.as_bytes()).map_err(artifact_error)?;
                file.flush().map_err(artifact_error)?;
                // `file` is removed when dropped, on success and failure alike
                self.run_oracle(file.path())
            }
        }
    }

    fn run_oracle(&self, request: &Path) -> Result<Cost, OracleError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        debug!(
            binary = %self.binary.display(),
            request = %request.display(),
            "invoking oracle"
        );

        let output = Command::new(&self.binary)
            .arg(&self.scenario)
            .arg(&self.config_flag)
            .arg(request)
            .output()
            .map_err(|source| OracleError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OracleError::NonZeroExit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let cost = parse_response(&String::from_utf8_lossy(&output.stdout))?;
        debug!(cost, "oracle returned");
        Ok(cost)
    }
}

impl Evaluator for SubprocessEvaluator {
    fn evaluate(&mut self, batch: &[Configuration]) -> Result<Vec<Cost>, OracleError> {
        if self.runs_parallel() && batch.len() > 1 {
            let this = &*self;
            batch.par_iter().map(|config| this.invoke(config)).collect()
        } else {
            batch.iter().map(|config| self.invoke(config)).collect()
        }
    }

    fn name(&self) -> &str {
        "subprocess"
    }
}

/// In-process evaluator backed by a cost function.
pub struct FnEvaluator<F> {
    cost_fn: F,
    calls: usize,
}

impl<F> FnEvaluator<F>
where
    F: FnMut(&Configuration) -> Result<Cost, OracleError>,
{
    pub fn new(cost_fn: F) -> Self {
        Self { cost_fn, calls: 0 }
    }

    /// Number of configurations scored so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: FnMut(&Configuration) -> Result<Cost, OracleError>,
{
    fn evaluate(&mut self, batch: &[Configuration]) -> Result<Vec<Cost>, OracleError> {
        let mut costs = Vec::with_capacity(batch.len());
        for config in batch {
            self.calls += 1;
            costs.push((self.cost_fn)(config)?);
        }
        Ok(costs)
    }

    fn name(&self) -> &str {
        "function"
    }
}
