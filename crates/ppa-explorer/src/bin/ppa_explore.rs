use anyhow::Context;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ppa_explorer::{
    ComparisonReport, ExplorationConfig, ExplorationError, ExplorationRunner,
    PerturbationSurrogate,
};

fn write_report(report: &ComparisonReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match std::env::var("PPA_REPORT_PATH") {
        Ok(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing report to {path}"))?;
            info!(path = %path, "report written");
        }
        Err(_) => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PPA_EXPLORE_CONFIG").ok())
        .map(PathBuf::from);

    let mut config = match &config_path {
        Some(path) => ExplorationConfig::from_path(path)
            .with_context(|| format!("loading exploration config {}", path.display()))?,
        None => ExplorationConfig::default(),
    };
    config
        .apply_overrides(|key| std::env::var(key).ok())
        .context("applying environment overrides")?;

    info!(
        name = %config.name,
        oracle = %config.oracle.binary.display(),
        scenario = %config.oracle.scenario.display(),
        "PPA explorer starting"
    );

    let mut evaluator = config.oracle.evaluator();
    let exploration_weight = config.exploration_weight;
    let result = ExplorationRunner::new(config.name.clone()).compare(
        &config.space,
        &mut evaluator,
        &config.plan(),
        |space, seed| PerturbationSurrogate::new(space.clone(), exploration_weight, seed),
    );
    info!(invocations = evaluator.invocations(), "oracle calls issued");

    match result {
        Ok(report) => write_report(&report),
        Err(ExplorationError::Comparison { report, failures }) => {
            write_report(&report)?;
            for failure in &failures {
                error!(%failure, "strategy failed");
            }
            anyhow::bail!("{} of 2 strategies failed", failures.len())
        }
        Err(other) => Err(other.into()),
    }
}
