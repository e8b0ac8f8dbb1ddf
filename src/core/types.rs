//! Core data types for Tierfolio.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{Result, TierfolioError};
use super::universe::{AssetUniverse, AssetWeights};

/// Risk tier of a recommended portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTier {
    Conservative,
    Balanced,
    Aggressive,
}

impl StrategyTier {
    /// All tiers in presentation order.
    pub const ALL: [StrategyTier; 3] = [
        StrategyTier::Conservative,
        StrategyTier::Balanced,
        StrategyTier::Aggressive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyTier::Conservative => "conservative",
            StrategyTier::Balanced => "balanced",
            StrategyTier::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for StrategyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tax treatment of the account holding the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Taxable,
    TaxDeferred,
    TaxFree,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Taxable => "taxable",
            AccountType::TaxDeferred => "tax_deferred",
            AccountType::TaxFree => "tax_free",
        }
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Taxable
    }
}

impl FromStr for AccountType {
    type Err = TierfolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "taxable" | "brokerage" => Ok(AccountType::Taxable),
            "tax_deferred" | "traditional" | "ira" | "401k" => Ok(AccountType::TaxDeferred),
            "tax_free" | "roth" => Ok(AccountType::TaxFree),
            other => Err(TierfolioError::invalid_request(format!(
                "unknown account type '{other}' (expected taxable, tax_deferred or tax_free)"
            ))),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rebalancing cadence. Serialized names are part of the caller contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebalanceCadence {
    #[serde(rename = "annual")]
    Annual,
    #[serde(rename = "quarterly")]
    Quarterly,
    #[serde(rename = "threshold_5pct")]
    Threshold5Pct,
    #[serde(rename = "threshold_10pct")]
    Threshold10Pct,
    #[serde(rename = "new_money")]
    NewMoney,
}

impl RebalanceCadence {
    /// Menu order; earlier cadences win ties.
    pub const ALL: [RebalanceCadence; 5] = [
        RebalanceCadence::Annual,
        RebalanceCadence::Quarterly,
        RebalanceCadence::Threshold5Pct,
        RebalanceCadence::Threshold10Pct,
        RebalanceCadence::NewMoney,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RebalanceCadence::Annual => "annual",
            RebalanceCadence::Quarterly => "quarterly",
            RebalanceCadence::Threshold5Pct => "threshold_5pct",
            RebalanceCadence::Threshold10Pct => "threshold_10pct",
            RebalanceCadence::NewMoney => "new_money",
        }
    }

    /// Human-readable label used in rationales.
    pub fn label(self) -> &'static str {
        match self {
            RebalanceCadence::Annual => "Annual rebalancing",
            RebalanceCadence::Quarterly => "Quarterly rebalancing",
            RebalanceCadence::Threshold5Pct => "Threshold rebalancing at 5% drift",
            RebalanceCadence::Threshold10Pct => "Threshold rebalancing at 10% drift",
            RebalanceCadence::NewMoney => "New-money rebalancing",
        }
    }
}

impl fmt::Display for RebalanceCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for three risk-tiered portfolio recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub current_savings: f64,
    pub target_amount: Option<f64>,
    pub time_horizon_years: f64,
    pub account_type: AccountType,
    pub new_money_available: bool,
    pub max_annual_contribution: Option<f64>,
}

impl OptimizationRequest {
    /// Create a request for a taxable account with no target and no new money.
    pub fn new(current_savings: f64, time_horizon_years: f64) -> Self {
        Self {
            current_savings,
            target_amount: None,
            time_horizon_years,
            account_type: AccountType::Taxable,
            new_money_available: false,
            max_annual_contribution: None,
        }
    }

    pub fn with_target(mut self, target_amount: f64) -> Self {
        self.target_amount = Some(target_amount);
        self
    }

    pub fn with_account_type(mut self, account_type: AccountType) -> Self {
        self.account_type = account_type;
        self
    }

    pub fn with_new_money(mut self, max_annual_contribution: Option<f64>) -> Self {
        self.new_money_available = true;
        self.max_annual_contribution = max_annual_contribution;
        self
    }

    /// Reject malformed requests before any computation.
    pub fn validate(&self) -> Result<()> {
        if !self.current_savings.is_finite() || self.current_savings <= 0.0 {
            return Err(TierfolioError::invalid_request(format!(
                "current savings must be positive, got {}",
                self.current_savings
            )));
        }
        if !self.time_horizon_years.is_finite() || self.time_horizon_years <= 0.0 {
            return Err(TierfolioError::invalid_request(format!(
                "time horizon must be positive, got {}",
                self.time_horizon_years
            )));
        }
        if let Some(target) = self.target_amount {
            if !target.is_finite() || target <= 0.0 {
                return Err(TierfolioError::invalid_request(format!(
                    "target amount must be positive, got {target}"
                )));
            }
        }
        if let Some(max) = self.max_annual_contribution {
            if !max.is_finite() || max < 0.0 {
                return Err(TierfolioError::invalid_request(format!(
                    "max annual contribution must be non-negative, got {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Contribution estimated to keep a portfolio near target weights without selling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewMoneySizing {
    pub annual_contribution: f64,
    pub monthly_contribution: f64,
    /// Assets weighted above the materiality threshold.
    pub material_assets: usize,
    /// Whether the request's max annual contribution covers the estimate.
    pub within_max_contribution: Option<bool>,
}

/// Score of one rebalancing cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CadenceScore {
    pub cadence: RebalanceCadence,
    pub adjusted_return: f64,
    pub adjusted_volatility: f64,
    pub sharpe_ratio: f64,
    pub events_per_year: f64,
}

/// Chosen rebalancing cadence with its rationale and alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingRecommendation {
    pub cadence: RebalanceCadence,
    pub rationale: String,
    pub scores: Vec<CadenceScore>,
    pub new_money: Option<NewMoneySizing>,
}

/// Monte Carlo estimate of reaching a wealth target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalOutcome {
    pub probability: f64,
    pub trials: usize,
    pub median_ending_value: f64,
    pub p10_ending_value: f64,
    pub p90_ending_value: f64,
}

/// One recommended allocation.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizedPortfolio {
    pub strategy: StrategyTier,
    pub weights: AssetWeights,
    pub expected_return: f64,
    pub expected_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub rebalancing: RebalancingRecommendation,
    /// Present only when the request has a target amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_outcome: Option<GoalOutcome>,
}

/// Cross-tier view of the wealth target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAnalysis {
    pub target_amount: f64,
    pub time_horizon_years: f64,
    /// Constant annual growth rate needed to reach the target.
    pub required_annual_return: f64,
    pub probabilities: Vec<(StrategyTier, f64)>,
    pub most_likely_strategy: StrategyTier,
}

/// Provenance of a result.
#[derive(Debug, Clone, Serialize)]
pub struct ResultMetadata {
    pub computation_date: NaiveDate,
    pub asset_universe: AssetUniverse,
    pub risk_free_rate: f64,
    pub periods_per_year: usize,
    pub observations: usize,
    pub history_start: Option<NaiveDate>,
    pub history_end: Option<NaiveDate>,
}

/// Full three-tier recommendation.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub request: OptimizationRequest,
    pub conservative: OptimizedPortfolio,
    pub balanced: OptimizedPortfolio,
    pub aggressive: OptimizedPortfolio,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_analysis: Option<TargetAnalysis>,
    pub metadata: ResultMetadata,
}

impl OptimizationResult {
    /// Portfolio for a tier.
    pub fn portfolio(&self, tier: StrategyTier) -> &OptimizedPortfolio {
        match tier {
            StrategyTier::Conservative => &self.conservative,
            StrategyTier::Balanced => &self.balanced,
            StrategyTier::Aggressive => &self.aggressive,
        }
    }

    /// Portfolios in tier order.
    pub fn portfolios(&self) -> [&OptimizedPortfolio; 3] {
        [&self.conservative, &self.balanced, &self.aggressive]
    }
}
