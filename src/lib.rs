//! Tierfolio - risk-tiered portfolio recommendation engine.
//!
//! This crate turns a historical price panel and a savings request into three
//! recommended allocations (conservative, balanced, aggressive) with:
//! - Annualized return statistics over a typed, ordered asset universe
//! - Per-tier, horizon-aware allocation bounds with diversification floors
//! - Constrained minimum-variance and maximum-Sharpe optimization (Clarabel)
//! - Historical drawdown replay
//! - Rebalancing cadence scoring by account type
//! - Monte Carlo estimates of reaching a wealth target
//!
//! ```no_run
//! use tierfolio::{AssetUniverse, EngineConfig, OptimizationOrchestrator, OptimizationRequest, PricePanel};
//!
//! # fn main() -> tierfolio::Result<()> {
//! let universe = AssetUniverse::default_etf();
//! let file = std::fs::File::open("prices.csv").map_err(|e| tierfolio::TierfolioError::malformed_data(e.to_string()))?;
//! let prices = PricePanel::from_csv_reader(&universe, file)?;
//!
//! let engine = OptimizationOrchestrator::new(EngineConfig::default(), universe)?;
//! let request = OptimizationRequest::new(100_000.0, 20.0).with_target(500_000.0);
//! let result = engine.optimize(&request, &prices)?;
//! println!("{:?}", result.balanced.weights);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod logging;
pub mod metrics;
pub mod portfolio;
pub mod statistics;

pub use crate::core::{
    AccountType, Asset, AssetClass, AssetUniverse, AssetWeights, EngineConfig, OptimizationRequest,
    OptimizationResult, OptimizedPortfolio, PricePanel, PriceRow, RebalanceCadence, Result,
    ReturnPanel, StrategyTier, TierfolioError,
};
pub use crate::metrics::{HistoricalRisk, HistoricalRiskEvaluator};
pub use crate::portfolio::{
    AllocationOptimizer, BoundsPolicy, BoundsTable, GoalSimulator, ObjectiveMode,
    OptimizationOrchestrator, RebalancingAnalyzer,
};
pub use crate::statistics::{ReturnStatistics, ReturnStatisticsCalculator};
