//! Engine configuration.
//!
//! Every section has defaults, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! risk_free_rate = 0.03
//!
//! [simulation]
//! trials = 20000
//! seed = 7
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{Result, TierfolioError};
use crate::portfolio::bounds::BoundsConfig;
use crate::portfolio::monte_carlo::SimulationConfig;
use crate::portfolio::qp::SolverConfig;
use crate::portfolio::rebalancing::RebalancingConfig;

/// Configuration for the optimization engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Annual risk-free rate used for Sharpe ratios.
    pub risk_free_rate: f64,
    /// Return periods per year (252 for daily prices).
    pub periods_per_year: usize,
    /// Minimum return periods required per asset. Defaults to one year of
    /// periods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_history_periods: Option<usize>,
    pub solver: SolverConfig,
    pub bounds: BoundsConfig,
    pub rebalancing: RebalancingConfig,
    pub simulation: SimulationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            periods_per_year: 252,
            min_history_periods: None,
            solver: SolverConfig::default(),
            bounds: BoundsConfig::default(),
            rebalancing: RebalancingConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| TierfolioError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| TierfolioError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Return periods each asset needs before statistics are computed.
    pub fn min_history_periods(&self) -> usize {
        self.min_history_periods.unwrap_or(self.periods_per_year)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.risk_free_rate.is_finite() || !(-1.0..1.0).contains(&self.risk_free_rate) {
            return Err(TierfolioError::config(format!(
                "risk_free_rate must be a decimal fraction, got {}",
                self.risk_free_rate
            )));
        }
        if self.periods_per_year == 0 {
            return Err(TierfolioError::config("periods_per_year must be positive"));
        }
        if self.min_history_periods() < 2 {
            return Err(TierfolioError::config("min_history_periods must be at least 2"));
        }
        self.solver.validate()?;
        self.bounds.validate()?;
        self.rebalancing.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.periods_per_year, 252);
        assert_eq!(config.simulation.seed, Some(42));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            risk_free_rate = 0.03

            [simulation]
            trials = 500
            parallel = false

            [rebalancing.annual]
            alpha = 0.004
            volatility_multiplier = 0.98
            "#,
        )
        .unwrap();
        assert!((config.risk_free_rate - 0.03).abs() < 1e-12);
        assert_eq!(config.simulation.trials, 500);
        assert!(!config.simulation.parallel);
        assert_eq!(config.simulation.batch_size, 1_000);
        assert!((config.rebalancing.annual.alpha - 0.004).abs() < 1e-12);
        assert_eq!(config.rebalancing.quarterly, RebalancingConfig::default().quarterly);
        assert_eq!(config.solver, SolverConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("periods_per_year = 0"),
            Err(TierfolioError::Config { .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[simulation]\ntrials = 0"),
            Err(TierfolioError::Config { .. })
        ));
        assert!(EngineConfig::from_toml_str("risk_free_rate = \"high\"").is_err());
    }

    #[test]
    fn test_min_history_follows_periods_per_year() {
        assert_eq!(EngineConfig::default().min_history_periods(), 252);

        let monthly = EngineConfig::from_toml_str("periods_per_year = 12").unwrap();
        assert_eq!(monthly.min_history_periods(), 12);

        let explicit =
            EngineConfig::from_toml_str("periods_per_year = 12\nmin_history_periods = 36").unwrap();
        assert_eq!(explicit.min_history_periods(), 36);

        assert!(matches!(
            EngineConfig::from_toml_str("min_history_periods = 1"),
            Err(TierfolioError::Config { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/tierfolio.toml").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
