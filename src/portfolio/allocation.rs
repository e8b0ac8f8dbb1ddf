//! Constrained mean-variance allocation.
//!
//! Two objectives over the same feasible set `{ 1ᵀw = 1, lower <= w <= upper }`:
//!
//! - **Minimize variance**: `min wᵀΣw`, a convex QP.
//! - **Maximize Sharpe**: `max (wᵀμ - r_f) / √(wᵀΣw)`. Solved exactly through
//!   the homogenised QP `min yᵀΣy` s.t. `(μ - r_f)ᵀy = 1`, `1ᵀy = κ`,
//!   `lower·κ <= y <= upper·κ`, `κ >= 0`, with `w = y / κ`.
//!
//! Failures are returned as errors; no fallback allocation is ever produced.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bounds::BoundsTable;
use super::qp::{QuadraticProgram, SolverConfig};
use crate::core::error::{Result, TierfolioError};
use crate::core::types::StrategyTier;
use crate::core::universe::AssetWeights;
use crate::statistics::ReturnStatistics;

/// Objective value used when a candidate has no volatility.
const ZERO_VOLATILITY_PENALTY: f64 = 1e10;

/// Optimization objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMode {
    MinimizeVariance,
    MaximizeSharpe,
}

impl ObjectiveMode {
    /// Conservative portfolios minimize variance; the others maximize Sharpe.
    pub fn for_tier(tier: StrategyTier) -> Self {
        match tier {
            StrategyTier::Conservative => ObjectiveMode::MinimizeVariance,
            StrategyTier::Balanced | StrategyTier::Aggressive => ObjectiveMode::MaximizeSharpe,
        }
    }
}

/// Solves for weights within a bounds table.
#[derive(Debug, Clone)]
pub struct AllocationOptimizer {
    solver: SolverConfig,
    risk_free_rate: f64,
}

impl AllocationOptimizer {
    pub fn new(solver: SolverConfig, risk_free_rate: f64) -> Self {
        Self {
            solver,
            risk_free_rate,
        }
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Value minimized for `mode`. Zero volatility maps to a very large value
    /// under the Sharpe objective.
    pub fn objective(&self, stats: &ReturnStatistics, weights: &[f64], mode: ObjectiveMode) -> f64 {
        match mode {
            ObjectiveMode::MinimizeVariance => stats.portfolio_variance(weights),
            ObjectiveMode::MaximizeSharpe => {
                let vol = stats.portfolio_volatility(weights);
                if vol <= f64::EPSILON {
                    return ZERO_VOLATILITY_PENALTY;
                }
                -(stats.portfolio_return(weights) - self.risk_free_rate) / vol
            }
        }
    }

    /// Weights summing to one within every bound.
    ///
    /// # Errors
    /// - `InvariantViolation` if the statistics and bounds disagree on the
    ///   universe, or the solved weights needed more than the configured
    ///   tolerance of correction.
    /// - `OptimizationFailure` for infeasible bounds, solver non-convergence, or
    ///   (Sharpe only) when no feasible allocation beats the risk-free rate.
    pub fn optimize(
        &self,
        stats: &ReturnStatistics,
        bounds: &BoundsTable,
        mode: ObjectiveMode,
    ) -> Result<AssetWeights> {
        stats
            .universe()
            .ensure_same(bounds.universe(), "allocation optimizer")?;
        let initial = bounds.initial_guess()?;
        let baseline = self.objective(stats, &initial, mode);

        let (raw, iterations) = match mode {
            ObjectiveMode::MinimizeVariance => self.solve_min_variance(stats, bounds)?,
            ObjectiveMode::MaximizeSharpe => self.solve_max_sharpe(stats, bounds)?,
        };
        let weights = self.finalize(raw, bounds)?;

        let achieved = self.objective(stats, &weights, mode);
        if achieved > baseline + 1e-6 * (1.0 + baseline.abs()) {
            return Err(bounds.failure(format!(
                "solver result (objective {achieved:.6}) is worse than the initial guess ({baseline:.6})"
            )));
        }

        debug!(
            "{:?} solved in {} iterations for {}: objective {:.6} (initial guess {:.6})",
            mode,
            iterations,
            bounds.strategy().map(|s| s.as_str()).unwrap_or("custom"),
            achieved,
            baseline
        );

        AssetWeights::new(stats.universe().clone(), weights)
    }

    fn solve_min_variance(
        &self,
        stats: &ReturnStatistics,
        bounds: &BoundsTable,
    ) -> Result<(Vec<f64>, u32)> {
        let n = stats.universe().len();
        let cov = stats.covariance();
        let mut qp = QuadraticProgram::new(n);
        for i in 0..n {
            for j in i..n {
                qp.set_quadratic(i, j, 2.0 * cov[(i, j)]);
            }
        }
        qp.add_equality(vec![1.0; n], 1.0);
        for (i, b) in bounds.bounds().iter().enumerate() {
            qp.add_inequality(unit(n, i, 1.0), b.upper);
            qp.add_inequality(unit(n, i, -1.0), -b.lower);
        }

        let solution = qp.solve(&self.solver).map_err(|msg| bounds.failure(msg))?;
        Ok((solution.x, solution.iterations))
    }

    fn solve_max_sharpe(
        &self,
        stats: &ReturnStatistics,
        bounds: &BoundsTable,
    ) -> Result<(Vec<f64>, u32)> {
        let n = stats.universe().len();
        let excess: Vec<f64> = stats
            .expected_returns()
            .iter()
            .map(|r| r - self.risk_free_rate)
            .collect();

        let best_excess = max_feasible_return(&excess, bounds);
        if best_excess <= 1e-12 {
            return Err(bounds.failure(format!(
                "no feasible allocation earns more than the risk-free rate {:.4} (best excess {best_excess:.6})",
                self.risk_free_rate
            )));
        }

        // Variables: y (n), kappa.
        let m = n + 1;
        let kappa = n;
        let cov = stats.covariance();
        let mut qp = QuadraticProgram::new(m);
        for i in 0..n {
            for j in i..n {
                qp.set_quadratic(i, j, 2.0 * cov[(i, j)]);
            }
        }

        let mut excess_row = excess;
        excess_row.push(0.0);
        qp.add_equality(excess_row, 1.0);

        let mut budget_row = vec![1.0; n];
        budget_row.push(-1.0);
        qp.add_equality(budget_row, 0.0);

        for (i, b) in bounds.bounds().iter().enumerate() {
            let mut upper = unit(m, i, 1.0);
            upper[kappa] = -b.upper;
            qp.add_inequality(upper, 0.0);

            let mut lower = unit(m, i, -1.0);
            lower[kappa] = b.lower;
            qp.add_inequality(lower, 0.0);
        }
        qp.add_inequality(unit(m, kappa, -1.0), 0.0);

        let solution = qp.solve(&self.solver).map_err(|msg| bounds.failure(msg))?;
        let k = solution.x[kappa];
        if !k.is_finite() || k <= 1e-12 {
            return Err(bounds.failure(format!("degenerate homogenisation scale {k}")));
        }
        let weights = solution.x[..n].iter().map(|y| y / k).collect();
        Ok((weights, solution.iterations))
    }

    /// Clamp solver noise into the bands and renormalise, rejecting results
    /// that needed more than `weight_tolerance` of correction.
    fn finalize(&self, raw: Vec<f64>, bounds: &BoundsTable) -> Result<Vec<f64>> {
        let tol = self.solver.weight_tolerance;
        if raw.iter().any(|w| !w.is_finite()) {
            return Err(TierfolioError::invariant("solver returned non-finite weights"));
        }
        if !bounds.contains(&raw, tol) {
            return Err(TierfolioError::invariant(format!(
                "solved weights {raw:?} violate bounds beyond tolerance {tol}"
            )));
        }

        let clamped: Vec<f64> = raw
            .iter()
            .zip(bounds.bounds())
            .map(|(w, b)| w.clamp(b.lower, b.upper))
            .collect();
        let total: f64 = clamped.iter().sum();
        if (total - 1.0).abs() > tol {
            return Err(TierfolioError::invariant(format!(
                "solved weights sum to {total}, outside tolerance {tol}"
            )));
        }

        let normalized: Vec<f64> = clamped.iter().map(|w| w / total).collect();
        if !bounds.contains(&normalized, tol) {
            return Err(TierfolioError::invariant(
                "renormalised weights left their bounds",
            ));
        }
        Ok(normalized)
    }
}

/// `e_i * scale` in `n` dimensions.
fn unit(n: usize, i: usize, scale: f64) -> Vec<f64> {
    let mut row = vec![0.0; n];
    row[i] = scale;
    row
}

/// Largest `cᵀw` over the bounded simplex: start at the lower bounds and fill
/// the remaining budget greedily by descending coefficient.
fn max_feasible_return(coefficients: &[f64], bounds: &BoundsTable) -> f64 {
    let table = bounds.bounds();
    let mut weights: Vec<f64> = table.iter().map(|b| b.lower).collect();
    let mut remaining = 1.0 - weights.iter().sum::<f64>();

    let mut order: Vec<usize> = (0..coefficients.len()).collect();
    order.sort_by(|&a, &b| {
        coefficients[b]
            .partial_cmp(&coefficients[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for i in order {
        if remaining <= 0.0 {
            break;
        }
        let add = (table[i].upper - table[i].lower).min(remaining);
        weights[i] += add;
        remaining -= add;
    }

    weights.iter().zip(coefficients).map(|(w, c)| w * c).sum()
}
