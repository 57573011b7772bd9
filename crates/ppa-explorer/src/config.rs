//! Exploration run configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ppa_oracle::{ArtifactPolicy, SubprocessEvaluator};
use ppa_types::{config_error, ParameterSpace, PpaResult};

use crate::runner::ComparisonPlan;
use crate::search::SampleBudget;

/// How to launch the external PPA oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Simulator executable.
    pub binary: PathBuf,
    /// Scenario (program image) passed as the first argument.
    pub scenario: PathBuf,
    /// Flag preceding the request artifact path.
    pub config_flag: String,
    /// Directory for per-call temporary request files.
    pub artifact_dir: Option<PathBuf>,
    /// Reuse a single request file instead of temporary ones.
    pub fixed_artifact: Option<PathBuf>,
    /// Evaluate surrogate batches concurrently (temporary artifacts only).
    pub parallel: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("../bin/tcsim"),
            scenario: PathBuf::from("../tce/count.tce"),
            config_flag: "-c".to_string(),
            artifact_dir: None,
            fixed_artifact: None,
            parallel: false,
        }
    }
}

impl OracleConfig {
    pub fn artifact_policy(&self) -> ArtifactPolicy {
        match &self.fixed_artifact {
            Some(path) => ArtifactPolicy::Fixed(path.clone()),
            None => ArtifactPolicy::Temporary {
                dir: self.artifact_dir.clone(),
            },
        }
    }

    pub fn evaluator(&self) -> SubprocessEvaluator {
        SubprocessEvaluator::new(&self.binary, &self.scenario)
            .with_config_flag(self.config_flag.clone())
            .with_artifacts(self.artifact_policy())
            .with_parallelism(self.parallel)
    }
}

/// Top-level configuration for a comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub name: String,
    pub description: String,

    /// Parameter space declaration.
    pub space: ParameterSpace,

    pub oracle: OracleConfig,

    /// Samples for the random sweep.
    pub random_budget: SampleBudget,

    /// Suggest/evaluate/observe rounds for the surrogate search.
    pub surrogate_rounds: usize,

    /// Configurations per surrogate round.
    pub surrogate_batch_size: usize,

    /// Probability that the built-in surrogate samples at random instead of
    /// perturbing its incumbent.
    pub exploration_weight: f64,

    pub seed: u64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            name: "tinycore".to_string(),
            description: String::new(),
            space: ParameterSpace::tinycore(),
            oracle: OracleConfig::default(),
            random_budget: SampleBudget::Limited(100),
            surrogate_rounds: 20,
            surrogate_batch_size: 4,
            exploration_weight: 0.3,
            seed: 42,
        }
    }
}

impl ExplorationConfig {
    pub fn new(name: impl Into<String>, space: ParameterSpace) -> Self {
        Self {
            name: name.into(),
            space,
            ..Self::default()
        }
    }

    pub fn with_oracle(mut self, oracle: OracleConfig) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_random_budget(mut self, budget: impl Into<SampleBudget>) -> Self {
        self.random_budget = budget.into();
        self
    }

    pub fn with_surrogate(mut self, rounds: usize, batch_size: usize) -> Self {
        self.surrogate_rounds = rounds;
        self.surrogate_batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn from_json(json: &str) -> PpaResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> PpaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> PpaResult<()> {
        if self.surrogate_rounds > 0 && self.surrogate_batch_size == 0 {
            return Err(config_error!("surrogate_batch_size must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.exploration_weight) {
            return Err(config_error!(
                "exploration_weight must lie in [0, 1], got {}",
                self.exploration_weight
            ));
        }
        if self.oracle.config_flag.is_empty() {
            return Err(config_error!("oracle.config_flag must not be empty"));
        }
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> PpaResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(binary) = lookup("PPA_ORACLE_BIN") {
            self.oracle.binary = PathBuf::from(binary);
        }
        if let Some(scenario) = lookup("PPA_ORACLE_SCENARIO") {
            self.oracle.scenario = PathBuf::from(scenario);
        }
        if let Some(seed) = lookup("PPA_SEED") {
            self.seed = seed
                .trim()
                .parse()
                .map_err(|_| config_error!("PPA_SEED is not an unsigned integer: {seed}"))?;
        }
        self.validate()
    }

    pub fn plan(&self) -> ComparisonPlan {
        ComparisonPlan {
            random_budget: self.random_budget,
            surrogate_rounds: self.surrogate_rounds,
            surrogate_batch_size: self.surrogate_batch_size,
            seed: self.seed,
        }
    }
}
