//! Rebalancing cadence scoring.
//!
//! Every cadence adjusts the portfolio's expected return and volatility:
//!
//! ```text
//! drag    = sale_drag[account] + gain_drag[account] * max(μ, 0)
//! return' = μ + alpha[cadence] * credit[account] - sale_events * drag
//! vol'    = σ * volatility_multiplier[cadence]
//! sharpe' = (return' - r_f) / vol'
//! ```
//!
//! The cadence with the highest adjusted Sharpe wins. All constants are
//! heuristics and come from [`RebalancingConfig`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{Result, TierfolioError};
use crate::core::types::{
    AccountType, CadenceScore, NewMoneySizing, OptimizationRequest, RebalanceCadence,
    RebalancingRecommendation,
};
use crate::core::universe::AssetWeights;
use crate::statistics::sharpe_ratio;

/// Return uplift and volatility multiplier of one cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CadenceParameters {
    /// Annual expected-return uplift before the account credit.
    pub alpha: f64,
    /// Multiplier applied to portfolio volatility.
    pub volatility_multiplier: f64,
}

impl CadenceParameters {
    pub const fn new(alpha: f64, volatility_multiplier: f64) -> Self {
        Self {
            alpha,
            volatility_multiplier,
        }
    }
}

/// One value per account type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountFactors {
    pub taxable: f64,
    pub tax_deferred: f64,
    pub tax_free: f64,
}

impl AccountFactors {
    pub fn get(&self, account: AccountType) -> f64 {
        match account {
            AccountType::Taxable => self.taxable,
            AccountType::TaxDeferred => self.tax_deferred,
            AccountType::TaxFree => self.tax_free,
        }
    }
}

/// Heuristic rebalancing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalancingConfig {
    pub annual: CadenceParameters,
    pub quarterly: CadenceParameters,
    pub threshold_5pct: CadenceParameters,
    pub threshold_10pct: CadenceParameters,
    pub new_money: CadenceParameters,
    /// Share of the cadence alpha credited per account type.
    pub alpha_credit: AccountFactors,
    /// Fixed return lost per selling event per account type.
    pub sale_drag: AccountFactors,
    /// Share of expected return realized as tax per selling event. Realized
    /// gains grow with the return, so frequent selling costs more in
    /// high-return portfolios.
    pub gain_drag: AccountFactors,
    /// Drift that triggers the tighter threshold cadence.
    pub small_threshold: f64,
    /// Drift that triggers the wider threshold cadence.
    pub large_threshold: f64,
    /// Fewest sales per year assumed for a threshold cadence.
    pub min_threshold_events: f64,
    pub max_threshold_events: f64,
    /// Contributions per year under new-money rebalancing.
    pub contributions_per_year: f64,
    /// Fraction of annual drift that new contributions must absorb.
    pub drift_factor: f64,
    /// Weight above which an asset counts as material.
    pub material_weight: f64,
}

impl Default for RebalancingConfig {
    fn default() -> Self {
        Self {
            annual: CadenceParameters::new(0.0020, 0.990),
            quarterly: CadenceParameters::new(0.0030, 0.985),
            threshold_5pct: CadenceParameters::new(0.0035, 0.980),
            threshold_10pct: CadenceParameters::new(0.0018, 0.990),
            new_money: CadenceParameters::new(0.0025, 0.985),
            alpha_credit: AccountFactors {
                taxable: 0.5,
                tax_deferred: 1.0,
                tax_free: 1.0,
            },
            sale_drag: AccountFactors {
                taxable: 0.001,
                tax_deferred: 0.0,
                tax_free: 0.0,
            },
            gain_drag: AccountFactors {
                taxable: 0.01,
                tax_deferred: 0.0,
                tax_free: 0.0,
            },
            small_threshold: 0.05,
            large_threshold: 0.10,
            min_threshold_events: 3.0,
            max_threshold_events: 12.0,
            contributions_per_year: 12.0,
            drift_factor: 0.25,
            material_weight: 0.01,
        }
    }
}

impl RebalancingConfig {
    pub fn parameters(&self, cadence: RebalanceCadence) -> CadenceParameters {
        match cadence {
            RebalanceCadence::Annual => self.annual,
            RebalanceCadence::Quarterly => self.quarterly,
            RebalanceCadence::Threshold5Pct => self.threshold_5pct,
            RebalanceCadence::Threshold10Pct => self.threshold_10pct,
            RebalanceCadence::NewMoney => self.new_money,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for cadence in RebalanceCadence::ALL {
            let p = self.parameters(cadence);
            if !p.alpha.is_finite() || !(p.volatility_multiplier > 0.0) {
                return Err(TierfolioError::config(format!(
                    "rebalancing.{}: alpha must be finite and volatility_multiplier positive",
                    cadence.as_str()
                )));
            }
        }
        for (name, factors) in [
            ("alpha_credit", self.alpha_credit),
            ("sale_drag", self.sale_drag),
            ("gain_drag", self.gain_drag),
        ] {
            let values = [factors.taxable, factors.tax_deferred, factors.tax_free];
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(TierfolioError::config(format!(
                    "rebalancing.{name} values must be non-negative"
                )));
            }
        }
        if !(self.small_threshold > 0.0) || !(self.large_threshold > 0.0) {
            return Err(TierfolioError::config("rebalancing thresholds must be positive"));
        }
        if !(self.min_threshold_events > 0.0) || self.max_threshold_events < self.min_threshold_events {
            return Err(TierfolioError::config(
                "rebalancing threshold event range must be positive and ordered",
            ));
        }
        if !(self.contributions_per_year > 0.0) || !(self.drift_factor >= 0.0) {
            return Err(TierfolioError::config(
                "rebalancing.contributions_per_year must be positive and drift_factor non-negative",
            ));
        }
        if !(0.0..1.0).contains(&self.material_weight) {
            return Err(TierfolioError::config("rebalancing.material_weight must be in [0, 1)"));
        }
        Ok(())
    }
}

/// Chooses a rebalancing cadence for a portfolio.
#[derive(Debug, Clone, Default)]
pub struct RebalancingAnalyzer {
    config: RebalancingConfig,
    risk_free_rate: f64,
}

impl RebalancingAnalyzer {
    pub fn new(config: RebalancingConfig, risk_free_rate: f64) -> Self {
        Self {
            config,
            risk_free_rate,
        }
    }

    pub fn config(&self) -> &RebalancingConfig {
        &self.config
    }

    /// Expected selling events per year for a cadence.
    ///
    /// Threshold cadences trigger roughly `(σ / threshold)²` times a year,
    /// clamped to the configured range. New-money rebalancing never sells.
    pub fn sale_events(&self, cadence: RebalanceCadence, volatility: f64) -> f64 {
        let cfg = &self.config;
        let threshold_events = |threshold: f64| {
            (volatility / threshold)
                .powi(2)
                .clamp(cfg.min_threshold_events, cfg.max_threshold_events)
        };
        match cadence {
            RebalanceCadence::Annual => 1.0,
            RebalanceCadence::Quarterly => 4.0,
            RebalanceCadence::Threshold5Pct => threshold_events(cfg.small_threshold),
            RebalanceCadence::Threshold10Pct => threshold_events(cfg.large_threshold),
            RebalanceCadence::NewMoney => 0.0,
        }
    }

    /// Return lost per selling event.
    pub fn drag_per_sale(&self, expected_return: f64, account: AccountType) -> f64 {
        self.config.sale_drag.get(account)
            + self.config.gain_drag.get(account) * expected_return.max(0.0)
    }

    /// Score one cadence.
    pub fn score(
        &self,
        cadence: RebalanceCadence,
        expected_return: f64,
        volatility: f64,
        account: AccountType,
    ) -> CadenceScore {
        let params = self.config.parameters(cadence);
        let sales = self.sale_events(cadence, volatility);
        let adjusted_return = expected_return + params.alpha * self.config.alpha_credit.get(account)
            - sales * self.drag_per_sale(expected_return, account);
        let adjusted_volatility = volatility * params.volatility_multiplier;
        let events_per_year = match cadence {
            RebalanceCadence::NewMoney => self.config.contributions_per_year,
            _ => sales,
        };

        CadenceScore {
            cadence,
            adjusted_return,
            adjusted_volatility,
            sharpe_ratio: sharpe_ratio(adjusted_return, adjusted_volatility, self.risk_free_rate),
            events_per_year,
        }
    }

    /// Score the cadence menu and pick the best adjusted Sharpe. Earlier
    /// cadences win ties. New-money rebalancing is only considered when the
    /// request has new money available.
    pub fn analyze(
        &self,
        weights: &AssetWeights,
        expected_return: f64,
        volatility: f64,
        request: &OptimizationRequest,
    ) -> Result<RebalancingRecommendation> {
        if !expected_return.is_finite() || !volatility.is_finite() || volatility < 0.0 {
            return Err(TierfolioError::invariant(format!(
                "cannot score rebalancing for return {expected_return} and volatility {volatility}"
            )));
        }

        let scores: Vec<CadenceScore> = RebalanceCadence::ALL
            .iter()
            .filter(|c| **c != RebalanceCadence::NewMoney || request.new_money_available)
            .map(|&c| self.score(c, expected_return, volatility, request.account_type))
            .collect();

        let mut best = scores[0];
        for score in &scores[1..] {
            if score.sharpe_ratio > best.sharpe_ratio {
                best = *score;
            }
        }

        let new_money = request
            .new_money_available
            .then(|| self.new_money_sizing(weights, volatility, request));

        debug!(
            "Rebalancing for {} account: {} (Sharpe {:.4})",
            request.account_type, best.cadence, best.sharpe_ratio
        );

        Ok(RebalancingRecommendation {
            cadence: best.cadence,
            rationale: self.rationale(&best),
            scores,
            new_money,
        })
    }

    /// Contribution needed to absorb drift without selling.
    ///
    /// `value * σ * drift_factor * √(material assets)`, since drift compounds
    /// across independent positions.
    pub fn new_money_sizing(
        &self,
        weights: &AssetWeights,
        volatility: f64,
        request: &OptimizationRequest,
    ) -> NewMoneySizing {
        let material_assets = weights.count_above(self.config.material_weight);
        let annual = request.current_savings
            * volatility
            * self.config.drift_factor
            * (material_assets as f64).sqrt();
        NewMoneySizing {
            annual_contribution: annual,
            monthly_contribution: annual / 12.0,
            material_assets,
            within_max_contribution: request.max_annual_contribution.map(|max| max >= annual),
        }
    }

    fn rationale(&self, best: &CadenceScore) -> String {
        let events = match best.cadence {
            RebalanceCadence::NewMoney => format!(
                "about {:.0} contributions and no sales per year",
                best.events_per_year
            ),
            _ => format!("about {:.1} rebalancing events per year", best.events_per_year),
        };
        format!(
            "{} gives the best risk-adjusted return (Sharpe {:.2}) with {}",
            best.cadence.label(),
            best.sharpe_ratio,
            events
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::universe::{Asset, AssetClass, AssetUniverse};

    fn weights() -> AssetWeights {
        let universe = AssetUniverse::new(vec![
            Asset::new("A", AssetClass::Equity),
            Asset::new("B", AssetClass::Bonds),
            Asset::new("C", AssetClass::Gold),
            Asset::new("D", AssetClass::RealEstate),
        ])
        .unwrap();
        AssetWeights::new(universe, vec![0.50, 0.40, 0.095, 0.005]).unwrap()
    }

    fn analyzer() -> RebalancingAnalyzer {
        RebalancingAnalyzer::new(RebalancingConfig::default(), 0.02)
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(RebalancingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_taxable_low_volatility_prefers_annual() {
        let request = OptimizationRequest::new(100_000.0, 10.0);
        let rec = analyzer().analyze(&weights(), 0.07, 0.12, &request).unwrap();
        assert_eq!(rec.cadence, RebalanceCadence::Annual);
        assert_eq!(rec.scores.len(), 4);
        assert!(rec.new_money.is_none());
    }

    #[test]
    fn test_tax_advantaged_prefers_more_frequent() {
        for account in [AccountType::TaxDeferred, AccountType::TaxFree] {
            let request = OptimizationRequest::new(100_000.0, 10.0).with_account_type(account);
            let rec = analyzer().analyze(&weights(), 0.07, 0.12, &request).unwrap();
            assert!(matches!(
                rec.cadence,
                RebalanceCadence::Quarterly
                    | RebalanceCadence::Threshold5Pct
                    | RebalanceCadence::Threshold10Pct
            ));
        }
    }

    #[test]
    fn test_rationale_mentions_sharpe_and_events() {
        let request = OptimizationRequest::new(100_000.0, 10.0);
        let rec = analyzer().analyze(&weights(), 0.07, 0.12, &request).unwrap();
        assert!(rec.rationale.starts_with("Annual rebalancing"));
        assert!(rec.rationale.contains("Sharpe 0.41"), "{}", rec.rationale);
        assert!(rec.rationale.contains("about 1.0 rebalancing events per year"));
    }

    #[test]
    fn test_threshold_events_clamped() {
        let a = analyzer();
        assert_eq!(a.sale_events(RebalanceCadence::Threshold10Pct, 0.01), 3.0);
        assert_eq!(a.sale_events(RebalanceCadence::Threshold5Pct, 0.50), 12.0);
        assert!((a.sale_events(RebalanceCadence::Threshold5Pct, 0.10) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_money_sizing() {
        let request = OptimizationRequest::new(100_000.0, 10.0).with_new_money(Some(5_000.0));
        let rec = analyzer().analyze(&weights(), 0.07, 0.12, &request).unwrap();
        assert_eq!(rec.scores.len(), 5);

        let sizing = rec.new_money.unwrap();
        // D sits below the 1% materiality threshold.
        assert_eq!(sizing.material_assets, 3);
        let expected = 100_000.0 * 0.12 * 0.25 * 3f64.sqrt();
        assert!((sizing.annual_contribution - expected).abs() < 1e-6);
        assert!((sizing.monthly_contribution - expected / 12.0).abs() < 1e-6);
        // The estimate is about 5196, just over the 5000 limit.
        assert_eq!(sizing.within_max_contribution, Some(false));

        let a = analyzer();
        let roomy = request.clone().with_new_money(Some(6_000.0));
        assert_eq!(a.new_money_sizing(&weights(), 0.12, &roomy).within_max_contribution, Some(true));
        let exact = request.with_new_money(Some(expected));
        assert_eq!(a.new_money_sizing(&weights(), 0.12, &exact).within_max_contribution, Some(true));
    }

    #[test]
    fn test_more_material_assets_need_more_money() {
        let universe = weights().universe().clone();
        let concentrated = AssetWeights::new(universe.clone(), vec![0.97, 0.01, 0.01, 0.01]).unwrap();
        let spread = AssetWeights::new(universe, vec![0.25; 4]).unwrap();
        let request = OptimizationRequest::new(50_000.0, 10.0).with_new_money(None);
        let a = analyzer();
        let low = a.new_money_sizing(&concentrated, 0.12, &request);
        let high = a.new_money_sizing(&spread, 0.12, &request);
        assert!(high.annual_contribution > low.annual_contribution);
        assert_eq!(high.within_max_contribution, None);
    }

    #[test]
    fn test_taxable_very_low_volatility_still_annual() {
        let request = OptimizationRequest::new(100_000.0, 10.0);
        let rec = analyzer().analyze(&weights(), 0.04, 0.05, &request).unwrap();
        assert_eq!(rec.cadence, RebalanceCadence::Annual);
    }

    #[test]
    fn test_taxable_below_15pct_volatility_always_annual() {
        let a = analyzer();
        let request = OptimizationRequest::new(100_000.0, 10.0);
        for i in 0..=30 {
            let mu = i as f64 * 0.01;
            for j in 1..15 {
                let sigma = j as f64 * 0.01 - 0.0001;
                let rec = a.analyze(&weights(), mu, sigma, &request).unwrap();
                assert_eq!(rec.cadence, RebalanceCadence::Annual, "mu={mu} sigma={sigma}");
            }
        }
    }

    #[test]
    fn test_high_return_low_volatility_taxable_stays_annual() {
        let request = OptimizationRequest::new(100_000.0, 10.0);
        for mu in [0.15, 0.20] {
            let rec = analyzer().analyze(&weights(), mu, 0.08, &request).unwrap();
            assert_eq!(rec.cadence, RebalanceCadence::Annual);
        }
    }

    #[test]
    fn test_drag_grows_with_expected_return() {
        let a = analyzer();
        assert!((a.drag_per_sale(0.07, AccountType::Taxable) - 0.0017).abs() < 1e-12);
        assert!((a.drag_per_sale(-0.05, AccountType::Taxable) - 0.001).abs() < 1e-12);
        assert_eq!(a.drag_per_sale(0.20, AccountType::TaxFree), 0.0);
    }

    #[test]
    fn test_zero_volatility_scores_zero_sharpe() {
        let score = analyzer().score(RebalanceCadence::Annual, 0.05, 0.0, AccountType::Taxable);
        assert_eq!(score.sharpe_ratio, 0.0);
    }
}
