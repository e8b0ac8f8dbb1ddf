//! End-to-end optimization of the three strategy tiers.

use chrono::Utc;
use tracing::info;

use super::allocation::{AllocationOptimizer, ObjectiveMode};
use super::bounds::BoundsPolicy;
use super::monte_carlo::{GoalParameters, GoalSimulator};
use super::rebalancing::RebalancingAnalyzer;
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::timeseries::{PricePanel, ReturnPanel};
use crate::core::types::{
    GoalOutcome, OptimizationRequest, OptimizationResult, OptimizedPortfolio, ResultMetadata,
    StrategyTier, TargetAnalysis,
};
use crate::core::universe::AssetUniverse;
use crate::metrics::HistoricalRiskEvaluator;
use crate::statistics::{sharpe_ratio, ReturnStatistics, ReturnStatisticsCalculator};

/// Runs the full pipeline for a request.
///
/// Statistics are computed once; each tier then goes through bounds,
/// optimization, historical risk and rebalancing analysis, plus goal
/// simulation when the request has a target. Any failure aborts the whole
/// call. The orchestrator holds no per-call state and can be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct OptimizationOrchestrator {
    config: EngineConfig,
    universe: AssetUniverse,
    calculator: ReturnStatisticsCalculator,
    policy: BoundsPolicy,
    optimizer: AllocationOptimizer,
    evaluator: HistoricalRiskEvaluator,
    rebalancer: RebalancingAnalyzer,
    simulator: GoalSimulator,
}

impl OptimizationOrchestrator {
    /// Build from a validated configuration.
    pub fn new(config: EngineConfig, universe: AssetUniverse) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            calculator: ReturnStatisticsCalculator::new(
                config.periods_per_year,
                config.min_history_periods(),
            ),
            policy: BoundsPolicy::new(config.bounds.clone()),
            optimizer: AllocationOptimizer::new(config.solver.clone(), config.risk_free_rate),
            evaluator: HistoricalRiskEvaluator::default(),
            rebalancer: RebalancingAnalyzer::new(config.rebalancing.clone(), config.risk_free_rate),
            simulator: GoalSimulator::new(config.simulation.clone()),
            config,
            universe,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    /// Optimize from a price panel.
    pub fn optimize(
        &self,
        request: &OptimizationRequest,
        prices: &PricePanel,
    ) -> Result<OptimizationResult> {
        request.validate()?;
        self.universe.ensure_same(prices.universe(), "price panel")?;
        self.optimize_with_returns(request, &prices.returns())
    }

    /// Optimize from periodic returns.
    pub fn optimize_with_returns(
        &self,
        request: &OptimizationRequest,
        returns: &ReturnPanel,
    ) -> Result<OptimizationResult> {
        request.validate()?;
        self.universe.ensure_same(returns.universe(), "return panel")?;
        let stats = self.calculator.compute(returns)?;
        self.optimize_with_statistics(request, &stats, returns)
    }

    /// Optimize with precomputed statistics. `returns` is still needed for
    /// the historical drawdown replay.
    pub fn optimize_with_statistics(
        &self,
        request: &OptimizationRequest,
        stats: &ReturnStatistics,
        returns: &ReturnPanel,
    ) -> Result<OptimizationResult> {
        request.validate()?;
        self.universe.ensure_same(stats.universe(), "return statistics")?;
        self.universe.ensure_same(returns.universe(), "return panel")?;

        info!(
            "Optimizing {} tiers for savings {:.2} over {} years ({} account, {} observations)",
            StrategyTier::ALL.len(),
            request.current_savings,
            request.time_horizon_years,
            request.account_type,
            stats.observations()
        );

        let [conservative, balanced, aggressive] = [
            self.optimize_tier(StrategyTier::Conservative, request, stats, returns)?,
            self.optimize_tier(StrategyTier::Balanced, request, stats, returns)?,
            self.optimize_tier(StrategyTier::Aggressive, request, stats, returns)?,
        ];

        let target_analysis = request.target_amount.and_then(|target| {
            target_analysis(request, target, [&conservative, &balanced, &aggressive])
        });

        Ok(OptimizationResult {
            request: request.clone(),
            conservative,
            balanced,
            aggressive,
            target_analysis,
            metadata: ResultMetadata {
                computation_date: Utc::now().date_naive(),
                asset_universe: self.universe.clone(),
                risk_free_rate: self.config.risk_free_rate,
                periods_per_year: self.config.periods_per_year,
                observations: stats.observations(),
                history_start: returns.dates().first().copied(),
                history_end: returns.dates().last().copied(),
            },
        })
    }

    /// Run one tier through the pipeline.
    pub fn optimize_tier(
        &self,
        tier: StrategyTier,
        request: &OptimizationRequest,
        stats: &ReturnStatistics,
        returns: &ReturnPanel,
    ) -> Result<OptimizedPortfolio> {
        let bounds = self
            .policy
            .bounds(&self.universe, tier, request.time_horizon_years)?;
        let weights = self
            .optimizer
            .optimize(stats, &bounds, ObjectiveMode::for_tier(tier))?;

        let expected_return = stats.portfolio_return(weights.as_slice());
        let expected_volatility = stats.portfolio_volatility(weights.as_slice());
        let sharpe = sharpe_ratio(expected_return, expected_volatility, self.config.risk_free_rate);

        let risk = self.evaluator.evaluate(&weights, returns)?;
        let rebalancing =
            self.rebalancer
                .analyze(&weights, expected_return, expected_volatility, request)?;

        let goal_outcome = match request.target_amount {
            Some(target) => Some(self.simulate_goal(
                tier,
                request,
                target,
                expected_return,
                expected_volatility,
            )?),
            None => None,
        };

        info!(
            "{} tier: return {:.4}, volatility {:.4}, Sharpe {:.3}, max drawdown {:.4}, {}",
            tier, expected_return, expected_volatility, sharpe, risk.max_drawdown, rebalancing.cadence
        );

        Ok(OptimizedPortfolio {
            strategy: tier,
            weights,
            expected_return,
            expected_volatility,
            sharpe_ratio: sharpe,
            max_drawdown: risk.max_drawdown,
            max_drawdown_duration: risk.max_drawdown_duration,
            rebalancing,
            target_probability: goal_outcome.map(|o| o.probability),
            goal_outcome,
        })
    }

    /// Each tier gets its own seed stream so tiers do not share draws.
    fn simulate_goal(
        &self,
        tier: StrategyTier,
        request: &OptimizationRequest,
        target: f64,
        expected_return: f64,
        volatility: f64,
    ) -> Result<GoalOutcome> {
        let params = GoalParameters {
            initial_value: request.current_savings,
            target_value: target,
            horizon_years: request.time_horizon_years,
            expected_return,
            volatility,
        };
        let seed = self
            .config
            .simulation
            .seed
            .map(|s| s.wrapping_add(tier_index(tier)));
        self.simulator.simulate_with_seed(&params, seed)
    }
}

fn tier_index(tier: StrategyTier) -> u64 {
    match tier {
        StrategyTier::Conservative => 0,
        StrategyTier::Balanced => 1,
        StrategyTier::Aggressive => 2,
    }
}

fn target_analysis(
    request: &OptimizationRequest,
    target: f64,
    portfolios: [&OptimizedPortfolio; 3],
) -> Option<TargetAnalysis> {
    let probabilities: Vec<(StrategyTier, f64)> = portfolios
        .iter()
        .map(|p| p.target_probability.map(|prob| (p.strategy, prob)))
        .collect::<Option<_>>()?;

    let mut most_likely = probabilities[0];
    for &candidate in &probabilities[1..] {
        if candidate.1 > most_likely.1 {
            most_likely = candidate;
        }
    }

    Some(TargetAnalysis {
        target_amount: target,
        time_horizon_years: request.time_horizon_years,
        required_annual_return: (target / request.current_savings)
            .powf(1.0 / request.time_horizon_years)
            - 1.0,
        probabilities,
        most_likely_strategy: most_likely.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AccountType;

    fn portfolio_stub(strategy: StrategyTier, probability: Option<f64>) -> OptimizedPortfolio {
        use crate::core::types::{RebalanceCadence, RebalancingRecommendation};
        use crate::core::universe::{Asset, AssetClass, AssetWeights};

        let universe = AssetUniverse::new(vec![Asset::new("A", AssetClass::Equity)]).unwrap();
        OptimizedPortfolio {
            strategy,
            weights: AssetWeights::new(universe, vec![1.0]).unwrap(),
            expected_return: 0.05,
            expected_volatility: 0.1,
            sharpe_ratio: 0.3,
            max_drawdown: 0.1,
            max_drawdown_duration: 10,
            rebalancing: RebalancingRecommendation {
                cadence: RebalanceCadence::Annual,
                rationale: String::new(),
                scores: vec![],
                new_money: None,
            },
            target_probability: probability,
            goal_outcome: None,
        }
    }

    #[test]
    fn test_target_analysis_picks_highest_probability() {
        let request = OptimizationRequest::new(100_000.0, 10.0)
            .with_target(200_000.0)
            .with_account_type(AccountType::TaxFree);
        let c = portfolio_stub(StrategyTier::Conservative, Some(0.4));
        let b = portfolio_stub(StrategyTier::Balanced, Some(0.7));
        let a = portfolio_stub(StrategyTier::Aggressive, Some(0.6));
        let analysis = target_analysis(&request, 200_000.0, [&c, &b, &a]).unwrap();

        assert_eq!(analysis.most_likely_strategy, StrategyTier::Balanced);
        assert_eq!(analysis.probabilities.len(), 3);
        // Doubling in ten years needs about 7.18% a year.
        assert!((analysis.required_annual_return - (2f64.powf(0.1) - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_target_analysis_absent_without_probabilities() {
        let request = OptimizationRequest::new(100_000.0, 10.0);
        let c = portfolio_stub(StrategyTier::Conservative, None);
        let b = portfolio_stub(StrategyTier::Balanced, None);
        let a = portfolio_stub(StrategyTier::Aggressive, None);
        assert!(target_analysis(&request, 200_000.0, [&c, &b, &a]).is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.periods_per_year = 0;
        assert!(OptimizationOrchestrator::new(config, AssetUniverse::default_etf()).is_err());
    }
}
