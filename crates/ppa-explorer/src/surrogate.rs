//! Built-in surrogate optimizer.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

use ppa_types::{Configuration, Cost, Domain, ParameterSpace};

use crate::search::SurrogateOptimizer;

/// Retries spent looking for a configuration that has not been seen yet.
const FRESH_ATTEMPTS: usize = 16;

/// Centre and half-width of `[low, high]`, finite for any finite bounds.
fn midpoint_and_half_span(low: f64, high: f64) -> (f64, f64) {
    (low / 2.0 + high / 2.0, high / 2.0 - low / 2.0)
}

/// Explore/exploit optimizer that learns only from its incumbent.
///
/// With probability `exploration_weight` (and always before the first
/// observation) it samples uniformly; otherwise it perturbs the best
/// configuration observed so far: integers move by up to two levels, reals by
/// up to a tenth of their range, clamped to bounds. Suggestions avoid
/// configurations already observed or already in the current batch while
/// fresh ones can be found.
#[derive(Debug, Clone)]
pub struct PerturbationSurrogate {
    space: ParameterSpace,
    rng: ChaCha8Rng,
    exploration_weight: f64,
    best: Option<(Configuration, Cost)>,
    seen: HashSet<String>,
    observations: usize,
}

impl PerturbationSurrogate {
    pub fn new(space: ParameterSpace, exploration_weight: f64, seed: u64) -> Self {
        Self {
            space,
            rng: ChaCha8Rng::seed_from_u64(seed),
            exploration_weight: exploration_weight.clamp(0.0, 1.0),
            best: None,
            seen: HashSet::new(),
            observations: 0,
        }
    }

    pub fn best(&self) -> Option<&(Configuration, Cost)> {
        self.best.as_ref()
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Pure exploration sample.
    fn explore(&mut self) -> Configuration {
        let mut config = Configuration::with_capacity(self.space.len());
        for dimension in self.space.dimensions() {
            match dimension.domain {
                Domain::Integer { low, high } => {
                    config.push(dimension.name.clone(), self.rng.random_range(low..=high))
                }
                Domain::Real { low, high } => {
                    let (mid, half) = midpoint_and_half_span(low, high);
                    let offset = self.rng.random_range(-1.0..=1.0) * half;
                    config.push(dimension.name.clone(), (mid + offset).clamp(low, high))
                }
            }
        }
        config
    }

    /// Exploitation: perturb the incumbent.
    fn exploit(&mut self, base: &Configuration) -> Configuration {
        let mut config = Configuration::with_capacity(self.space.len());
        for (dimension, value) in self.space.dimensions().iter().zip(base.values()) {
            match dimension.domain {
                Domain::Integer { low, high } => {
                    let delta: i64 = self.rng.random_range(-2..=2);
                    let v = value.as_int().unwrap_or(low);
                    config.push(dimension.name.clone(), v.saturating_add(delta).clamp(low, high));
                }
                Domain::Real { low, high } => {
                    let (_, half) = midpoint_and_half_span(low, high);
                    let noise = self.rng.random_range(-0.2..=0.2) * half;
                    config.push(dimension.name.clone(), (value.as_f64() + noise).clamp(low, high));
                }
            }
        }
        config
    }

    fn propose(&mut self) -> Configuration {
        let explore = self.rng.random::<f64>() < self.exploration_weight;
        match self.best.clone() {
            Some((base, _)) if !explore => self.exploit(&base),
            _ => self.explore(),
        }
    }
}

impl SurrogateOptimizer for PerturbationSurrogate {
    fn suggest(&mut self, count: usize) -> Vec<Configuration> {
        let mut batch = Vec::with_capacity(count);
        let mut batch_keys = HashSet::new();
        for _ in 0..count {
            let mut candidate = self.propose();
            for _ in 1..FRESH_ATTEMPTS {
                let key = candidate.key();
                if !self.seen.contains(&key) && !batch_keys.contains(&key) {
                    break;
                }
                candidate = self.propose();
            }
            batch_keys.insert(candidate.key());
            batch.push(candidate);
        }
        batch
    }

    fn observe(&mut self, configs: &[Configuration], costs: &[Cost]) {
        for (config, cost) in configs.iter().zip(costs) {
            self.observations += 1;
            self.seen.insert(config.key());
            let improved = match &self.best {
                None => true,
                Some((_, best)) => cost < best,
            };
            if improved {
                self.best = Some((config.clone(), *cost));
            }
        }
    }

    fn name(&self) -> &str {
        "perturbation"
    }
}
