//! Monte Carlo goal simulation.
//!
//! Each trial compounds the portfolio value with one normally distributed
//! annual return per year. A fractional final year draws from
//! `N(μ·f, σ·√f)`. Values are floored at zero. Trials run in fixed-size
//! batches, each seeded with `seed + batch_index`, so results do not depend
//! on the Rayon thread count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{Result, TierfolioError};
use crate::core::types::GoalOutcome;

/// Configuration for goal simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub trials: usize,
    /// Base seed. `None` draws one from OS entropy per call.
    pub seed: Option<u64>,
    pub batch_size: usize,
    /// Run batches on the Rayon pool.
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: 10_000,
            seed: Some(42),
            batch_size: 1_000,
            parallel: true,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(TierfolioError::config("simulation.trials must be positive"));
        }
        if self.batch_size == 0 {
            return Err(TierfolioError::config("simulation.batch_size must be positive"));
        }
        Ok(())
    }
}

/// Inputs of one goal simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalParameters {
    pub initial_value: f64,
    pub target_value: f64,
    pub horizon_years: f64,
    /// Annual expected return.
    pub expected_return: f64,
    /// Annual volatility.
    pub volatility: f64,
}

impl GoalParameters {
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.initial_value) || !positive(self.target_value) || !positive(self.horizon_years) {
            return Err(TierfolioError::invalid_request(format!(
                "goal simulation needs positive initial value, target and horizon (got {}, {}, {})",
                self.initial_value, self.target_value, self.horizon_years
            )));
        }
        if !self.expected_return.is_finite() || !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(TierfolioError::invariant(format!(
                "goal simulation needs finite return and non-negative volatility (got {}, {})",
                self.expected_return, self.volatility
            )));
        }
        Ok(())
    }
}

/// Yearly return draws for one parameter set.
struct Path {
    full_years: usize,
    annual: Normal<f64>,
    partial: Option<Normal<f64>>,
}

impl Path {
    fn new(params: &GoalParameters) -> Result<Self> {
        let full_years = params.horizon_years.floor() as usize;
        let fraction = params.horizon_years - full_years as f64;
        let normal = |mean: f64, std: f64| {
            Normal::new(mean, std)
                .map_err(|e| TierfolioError::invariant(format!("invalid return distribution: {e}")))
        };
        let annual = normal(params.expected_return, params.volatility)?;
        let partial = if fraction > 1e-9 {
            Some(normal(params.expected_return * fraction, params.volatility * fraction.sqrt())?)
        } else {
            None
        };
        Ok(Self {
            full_years,
            annual,
            partial,
        })
    }

    fn ending_value<R: Rng + ?Sized>(&self, initial: f64, rng: &mut R) -> f64 {
        let mut value = initial;
        for _ in 0..self.full_years {
            value = (value * (1.0 + self.annual.sample(rng))).max(0.0);
        }
        if let Some(partial) = &self.partial {
            value = (value * (1.0 + partial.sample(rng))).max(0.0);
        }
        value
    }
}

/// Estimates the probability of reaching a wealth target.
#[derive(Debug, Clone, Default)]
pub struct GoalSimulator {
    config: SimulationConfig,
}

impl GoalSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate with the configured seed.
    pub fn simulate(&self, params: &GoalParameters) -> Result<GoalOutcome> {
        self.simulate_with_seed(params, self.config.seed)
    }

    /// Simulate in seeded batches. `None` seeds from entropy.
    pub fn simulate_with_seed(&self, params: &GoalParameters, seed: Option<u64>) -> Result<GoalOutcome> {
        self.config.validate()?;
        params.validate()?;
        let path = Path::new(params)?;
        let base_seed = seed.unwrap_or_else(|| rand::thread_rng().gen());

        let trials = self.config.trials;
        let batch_size = self.config.batch_size;
        let n_batches = (trials + batch_size - 1) / batch_size;

        let run_batch = |batch_idx: usize| -> Vec<f64> {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(batch_idx as u64));
            let start = batch_idx * batch_size;
            let end = (start + batch_size).min(trials);
            (start..end)
                .map(|_| path.ending_value(params.initial_value, &mut rng))
                .collect()
        };

        let ending_values: Vec<f64> = if self.config.parallel {
            (0..n_batches).into_par_iter().flat_map_iter(run_batch).collect()
        } else {
            (0..n_batches).flat_map(run_batch).collect()
        };

        let outcome = summarize(ending_values, params.target_value);
        debug!(
            "Goal simulation: {} trials, μ={:.4} σ={:.4}, P(reach {:.0})={:.4}",
            outcome.trials, params.expected_return, params.volatility, params.target_value, outcome.probability
        );
        Ok(outcome)
    }

    /// Single-threaded simulation drawing from a caller-supplied generator.
    pub fn probability_with_rng<R: Rng + ?Sized>(
        &self,
        params: &GoalParameters,
        trials: usize,
        rng: &mut R,
    ) -> Result<GoalOutcome> {
        params.validate()?;
        if trials == 0 {
            return Err(TierfolioError::invalid_request("trials must be positive"));
        }
        let path = Path::new(params)?;
        let ending_values = (0..trials)
            .map(|_| path.ending_value(params.initial_value, rng))
            .collect();
        Ok(summarize(ending_values, params.target_value))
    }
}

fn summarize(mut ending_values: Vec<f64>, target: f64) -> GoalOutcome {
    let n = ending_values.len();
    let hits = ending_values.iter().filter(|&&v| v >= target).count();
    ending_values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let percentile = |pct: f64| {
        let idx = ((pct / 100.0) * (n as f64 - 1.0)).round() as usize;
        ending_values[idx.min(n - 1)]
    };

    GoalOutcome {
        probability: hits as f64 / n as f64,
        trials: n,
        median_ending_value: percentile(50.0),
        p10_ending_value: percentile(10.0),
        p90_ending_value: percentile(90.0),
    }
}
