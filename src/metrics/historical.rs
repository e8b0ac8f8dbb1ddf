//! Historical replay of an allocation.

use serde::{Deserialize, Serialize};

use super::drawdown::{calculate_drawdown_curve, DrawdownTracker};
use crate::core::error::Result;
use crate::core::timeseries::ReturnPanel;
use crate::core::universe::AssetWeights;

/// Drawdown profile of an allocation over the return history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRisk {
    /// Largest peak-to-trough decline, in [0, 1].
    pub max_drawdown: f64,
    /// Longest stretch of periods below a prior peak.
    pub max_drawdown_duration: usize,
    /// Number of periods replayed.
    pub periods: usize,
}

/// Replays weights over historical returns.
#[derive(Debug, Clone)]
pub struct HistoricalRiskEvaluator {
    /// Covered weight may deviate from 1 by this much before returns are
    /// rescaled by the covered weight.
    coverage_tolerance: f64,
}

impl Default for HistoricalRiskEvaluator {
    fn default() -> Self {
        Self {
            coverage_tolerance: 0.01,
        }
    }
}

impl HistoricalRiskEvaluator {
    pub fn new(coverage_tolerance: f64) -> Self {
        Self { coverage_tolerance }
    }

    /// Weighted return per period. Assets without data on a date contribute
    /// nothing; if the remaining weight is off by more than the coverage
    /// tolerance the period return is divided by the covered weight.
    pub fn portfolio_returns(&self, weights: &AssetWeights, returns: &ReturnPanel) -> Result<Vec<f64>> {
        weights
            .universe()
            .ensure_same(returns.universe(), "historical risk evaluation")?;
        let w = weights.as_slice();

        Ok((0..returns.len())
            .map(|t| {
                let mut total = 0.0;
                let mut covered = 0.0;
                for (weight, r) in w.iter().zip(returns.period(t)) {
                    if let Some(r) = r {
                        total += weight * r;
                        covered += weight;
                    }
                }
                if covered <= 0.0 {
                    0.0
                } else if (covered - 1.0).abs() > self.coverage_tolerance {
                    total / covered
                } else {
                    total
                }
            })
            .collect())
    }

    /// Cumulative growth of one unit, starting at 1.0.
    pub fn growth_curve(&self, weights: &AssetWeights, returns: &ReturnPanel) -> Result<Vec<f64>> {
        let period_returns = self.portfolio_returns(weights, returns)?;
        let mut curve = Vec::with_capacity(period_returns.len() + 1);
        let mut value = 1.0;
        curve.push(value);
        for r in period_returns {
            value = (value * (1.0 + r)).max(0.0);
            curve.push(value);
        }
        Ok(curve)
    }

    /// Drawdown (`growth / peak - 1`) at each point of the growth curve.
    pub fn drawdown_curve(&self, weights: &AssetWeights, returns: &ReturnPanel) -> Result<Vec<f64>> {
        Ok(calculate_drawdown_curve(&self.growth_curve(weights, returns)?))
    }

    /// Max drawdown and duration. An empty history has no drawdown.
    pub fn evaluate(&self, weights: &AssetWeights, returns: &ReturnPanel) -> Result<HistoricalRisk> {
        let curve = self.growth_curve(weights, returns)?;
        let mut tracker = DrawdownTracker::with_initial(curve[0]);
        for &value in &curve[1..] {
            tracker.update(value);
        }
        Ok(HistoricalRisk {
            max_drawdown: tracker.max_drawdown(),
            max_drawdown_duration: tracker.max_duration(),
            periods: curve.len() - 1,
        })
    }
}
