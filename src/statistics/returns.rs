//! Annualized return statistics.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::moments::{RunningCovariance, RunningMoments};
use crate::core::error::{Result, TierfolioError};
use crate::core::timeseries::{PricePanel, ReturnPanel};
use crate::core::universe::AssetUniverse;

/// Annualized expected returns, volatilities, covariance and correlation.
///
/// All vectors and matrices follow the order of [`ReturnStatistics::universe`].
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct ReturnStatistics {
    universe: AssetUniverse,
    expected_returns: DVector<f64>,
    volatilities: DVector<f64>,
    covariance: DMatrix<f64>,
    correlation: DMatrix<f64>,
    observations: usize,
}

impl ReturnStatistics {
    /// Build from already-annualized estimates; covariance is `D * corr * D`.
    pub fn from_parts(
        universe: &AssetUniverse,
        expected_returns: Vec<f64>,
        volatilities: Vec<f64>,
        correlation: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let n = universe.len();
        universe.check_len(expected_returns.len())?;
        universe.check_len(volatilities.len())?;
        universe.check_len(correlation.len())?;
        for row in &correlation {
            universe.check_len(row.len())?;
        }
        if volatilities.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(TierfolioError::invalid_request(
                "volatilities must be finite and non-negative",
            ));
        }
        if expected_returns.iter().any(|r| !r.is_finite()) {
            return Err(TierfolioError::invalid_request("expected returns must be finite"));
        }

        let corr = DMatrix::from_fn(n, n, |i, j| correlation[i][j]);
        for i in 0..n {
            if (corr[(i, i)] - 1.0).abs() > 1e-9 {
                return Err(TierfolioError::invalid_request(format!(
                    "correlation diagonal must be 1, got {} for {}",
                    corr[(i, i)],
                    universe.assets()[i].symbol
                )));
            }
            for j in 0..n {
                let c = corr[(i, j)];
                if !c.is_finite() || c.abs() > 1.0 + 1e-12 || (c - corr[(j, i)]).abs() > 1e-9 {
                    return Err(TierfolioError::invalid_request(
                        "correlation matrix must be symmetric with entries in [-1, 1]",
                    ));
                }
            }
        }

        let vols = DVector::from_vec(volatilities);
        let covariance = DMatrix::from_fn(n, n, |i, j| vols[i] * corr[(i, j)] * vols[j]);

        Ok(Self {
            universe: universe.clone(),
            expected_returns: DVector::from_vec(expected_returns),
            volatilities: vols,
            covariance,
            correlation: corr,
            observations: 0,
        })
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn expected_returns(&self) -> &DVector<f64> {
        &self.expected_returns
    }

    pub fn volatilities(&self) -> &DVector<f64> {
        &self.volatilities
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    pub fn correlation(&self) -> &DMatrix<f64> {
        &self.correlation
    }

    /// Number of return periods the estimates were built from (0 for `from_parts`).
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// `wᵀμ`.
    pub fn portfolio_return(&self, weights: &[f64]) -> f64 {
        weights
            .iter()
            .zip(self.expected_returns.iter())
            .map(|(w, r)| w * r)
            .sum()
    }

    /// `wᵀΣw`.
    pub fn portfolio_variance(&self, weights: &[f64]) -> f64 {
        let n = weights.len().min(self.covariance.nrows());
        let mut variance = 0.0;
        for i in 0..n {
            for j in 0..n {
                variance += weights[i] * self.covariance[(i, j)] * weights[j];
            }
        }
        variance.max(0.0)
    }

    pub fn portfolio_volatility(&self, weights: &[f64]) -> f64 {
        self.portfolio_variance(weights).sqrt()
    }
}

/// Sharpe ratio for reporting; zero volatility gives 0.0.
pub fn sharpe_ratio(expected_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility <= f64::EPSILON {
        return 0.0;
    }
    (expected_return - risk_free_rate) / volatility
}

/// Turns a return panel into annualized [`ReturnStatistics`].
#[derive(Debug, Clone)]
pub struct ReturnStatisticsCalculator {
    periods_per_year: usize,
    min_history_periods: usize,
}

impl ReturnStatisticsCalculator {
    pub fn new(periods_per_year: usize, min_history_periods: usize) -> Self {
        Self {
            periods_per_year,
            min_history_periods,
        }
    }

    pub fn periods_per_year(&self) -> usize {
        self.periods_per_year
    }

    /// Statistics straight from a price panel.
    pub fn from_prices(&self, prices: &PricePanel) -> Result<ReturnStatistics> {
        self.compute(&prices.returns())
    }

    /// Annualize mean, standard deviation and covariance over the periods where
    /// every asset has a return.
    ///
    /// Fails with `InsufficientData` naming the first asset with fewer than
    /// `min_history_periods` returns, or the overlapping window when the
    /// assets' histories do not overlap enough.
    pub fn compute(&self, returns: &ReturnPanel) -> Result<ReturnStatistics> {
        let universe = returns.universe();
        let n = universe.len();
        let required = self.min_history_periods.max(2);

        for (i, asset) in universe.assets().iter().enumerate() {
            let available = returns.available(i);
            if available < required {
                return Err(TierfolioError::insufficient_data(
                    asset.symbol.clone(),
                    required,
                    available,
                ));
            }
        }

        let periods = returns.complete_periods();
        if periods.len() < required {
            return Err(TierfolioError::insufficient_data(
                format!("overlapping window of {universe}"),
                required,
                periods.len(),
            ));
        }

        let columns: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let col = returns.asset(i);
                periods.iter().filter_map(|&t| col[t]).collect()
            })
            .collect();

        let ppy = self.periods_per_year as f64;
        let mut moments = Vec::with_capacity(n);
        for column in &columns {
            let mut m = RunningMoments::new();
            column.iter().for_each(|&r| m.update(r));
            moments.push(m);
        }

        let mut covariance = DMatrix::zeros(n, n);
        for i in 0..n {
            covariance[(i, i)] = moments[i].variance() * ppy;
            for j in (i + 1)..n {
                let mut c = RunningCovariance::new();
                for (x, y) in columns[i].iter().zip(&columns[j]) {
                    c.update(*x, *y);
                }
                let value = c.covariance() * ppy;
                covariance[(i, j)] = value;
                covariance[(j, i)] = value;
            }
        }

        let expected_returns = DVector::from_iterator(n, moments.iter().map(|m| m.mean() * ppy));
        let volatilities = DVector::from_iterator(n, (0..n).map(|i| covariance[(i, i)].sqrt()));
        let correlation = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                1.0
            } else {
                let denom = volatilities[i] * volatilities[j];
                if denom > 0.0 {
                    (covariance[(i, j)] / denom).clamp(-1.0, 1.0)
                } else {
                    0.0
                }
            }
        });

        debug!(
            "Return statistics over {} periods for {}: mu={:?} vol={:?}",
            periods.len(),
            universe,
            expected_returns.as_slice(),
            volatilities.as_slice()
        );

        Ok(ReturnStatistics {
            universe: universe.clone(),
            expected_returns,
            volatilities,
            covariance,
            correlation,
            observations: periods.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::universe::{Asset, AssetClass};
    use chrono::NaiveDate;

    fn universe() -> AssetUniverse {
        AssetUniverse::new(vec![
            Asset::new("AAA", AssetClass::Equity),
            Asset::new("BBB", AssetClass::Bonds),
        ])
        .unwrap()
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    #[test]
    fn test_annualization() {
        // Alternating +2% / 0% has mean 1% and sample std ~1%.
        let a: Vec<f64> = (0..300).map(|i| if i % 2 == 0 { 0.02 } else { 0.0 }).collect();
        let b: Vec<f64> = (0..300).map(|i| if i % 2 == 0 { 0.0 } else { 0.01 }).collect();
        let panel = ReturnPanel::from_dense(&universe(), start(), vec![a, b]).unwrap();

        let stats = ReturnStatisticsCalculator::new(252, 252).compute(&panel).unwrap();
        assert!((stats.expected_returns()[0] - 0.01 * 252.0).abs() < 1e-9);
        assert!((stats.expected_returns()[1] - 0.005 * 252.0).abs() < 1e-9);

        let expected_vol = (0.0001f64 * 300.0 / 299.0).sqrt() * 252f64.sqrt();
        assert!((stats.volatilities()[0] - expected_vol).abs() < 1e-9);

        // Perfectly anti-correlated by construction.
        assert!((stats.correlation()[(0, 1)] + 1.0).abs() < 1e-9);
        assert_eq!(stats.observations(), 300);
    }

    #[test]
    fn test_insufficient_data_names_asset() {
        let a = vec![0.01; 300];
        let b = vec![0.01; 300];
        let mut panel_cols: Vec<Vec<Option<f64>>> =
            vec![a.into_iter().map(Some).collect(), b.into_iter().map(Some).collect()];
        for r in panel_cols[1].iter_mut().take(100) {
            *r = None;
        }
        let dates = start().iter_days().take(300).collect();
        let panel = ReturnPanel::from_columns(&universe(), dates, panel_cols).unwrap();

        let err = ReturnStatisticsCalculator::new(252, 252).compute(&panel).unwrap_err();
        match err {
            TierfolioError::InsufficientData {
                asset,
                required,
                available,
            } => {
                assert_eq!(asset, "BBB");
                assert_eq!(required, 252);
                assert_eq!(available, 200);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_non_overlapping_history_is_insufficient() {
        let mut a: Vec<Option<f64>> = vec![Some(0.01); 400];
        let mut b: Vec<Option<f64>> = vec![Some(0.02); 400];
        for r in a.iter_mut().skip(260) {
            *r = None;
        }
        for r in b.iter_mut().take(140) {
            *r = None;
        }
        let dates = start().iter_days().take(400).collect();
        let panel = ReturnPanel::from_columns(&universe(), dates, vec![a, b]).unwrap();
        let err = ReturnStatisticsCalculator::new(252, 252).compute(&panel).unwrap_err();
        assert!(matches!(err, TierfolioError::InsufficientData { available: 120, .. }));
    }

    #[test]
    fn test_from_parts_builds_covariance() {
        let stats = ReturnStatistics::from_parts(
            &universe(),
            vec![0.08, 0.03],
            vec![0.20, 0.05],
            vec![vec![1.0, 0.5], vec![0.5, 1.0]],
        )
        .unwrap();
        assert!((stats.covariance()[(0, 0)] - 0.04).abs() < 1e-12);
        assert!((stats.covariance()[(0, 1)] - 0.005).abs() < 1e-12);
        let w = [0.5, 0.5];
        let expected_var = 0.25 * 0.04 + 0.25 * 0.0025 + 2.0 * 0.25 * 0.005;
        assert!((stats.portfolio_variance(&w) - expected_var).abs() < 1e-12);
        assert!((stats.portfolio_return(&w) - 0.055).abs() < 1e-12);
    }

    #[test]
    fn test_from_parts_rejects_asymmetric_correlation() {
        let err = ReturnStatistics::from_parts(
            &universe(),
            vec![0.08, 0.03],
            vec![0.20, 0.05],
            vec![vec![1.0, 0.5], vec![0.2, 1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, TierfolioError::InvalidRequest { .. }));

        let err = ReturnStatistics::from_parts(&universe(), vec![0.08], vec![0.2, 0.05], vec![])
            .unwrap_err();
        assert!(matches!(err, TierfolioError::LengthMismatch { .. }));
    }

    #[test]
    fn test_sharpe_ratio_zero_volatility() {
        assert_eq!(sharpe_ratio(0.05, 0.0, 0.02), 0.0);
        assert!((sharpe_ratio(0.12, 0.2, 0.02) - 0.5).abs() < 1e-12);
    }
}
