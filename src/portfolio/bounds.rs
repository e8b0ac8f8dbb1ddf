//! Per-tier, horizon-aware weight bounds.
//!
//! Each asset gets a `[lower, upper]` band derived from its asset class. The
//! lower end is never below the class floor, which keeps every asset in the
//! portfolio even when its stand-alone risk/return looks unattractive.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{Result, TierfolioError};
use crate::core::types::StrategyTier;
use crate::core::universe::{AssetClass, AssetUniverse};

/// Bounds for every asset of one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassBounds {
    pub min: f64,
    pub max: f64,
    /// Minimum allocation kept for diversification.
    pub floor: f64,
}

impl ClassBounds {
    pub const fn new(min: f64, max: f64, floor: f64) -> Self {
        Self { min, max, floor }
    }

    fn validate(&self, context: &str) -> Result<()> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(self.min) || !in_unit(self.max) || !in_unit(self.floor) {
            return Err(TierfolioError::config(format!(
                "{context}: bounds must lie in [0, 1]"
            )));
        }
        if self.min.max(self.floor) > self.max {
            return Err(TierfolioError::config(format!(
                "{context}: lower bound {} exceeds max {}",
                self.min.max(self.floor),
                self.max
            )));
        }
        Ok(())
    }
}

/// Class bounds for one strategy tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBounds {
    pub bonds: ClassBounds,
    pub equity: ClassBounds,
    pub real_estate: ClassBounds,
    pub gold: ClassBounds,
    pub emerging_markets: ClassBounds,
}

impl TierBounds {
    pub fn class(&self, class: AssetClass) -> ClassBounds {
        match class {
            AssetClass::Bonds => self.bonds,
            AssetClass::Equity => self.equity,
            AssetClass::RealEstate => self.real_estate,
            AssetClass::Gold => self.gold,
            AssetClass::EmergingMarkets => self.emerging_markets,
        }
    }

    fn validate(&self, tier: &str) -> Result<()> {
        self.bonds.validate(&format!("{tier}.bonds"))?;
        self.equity.validate(&format!("{tier}.equity"))?;
        self.real_estate.validate(&format!("{tier}.real_estate"))?;
        self.gold.validate(&format!("{tier}.gold"))?;
        self.emerging_markets
            .validate(&format!("{tier}.emerging_markets"))
    }
}

/// Bounds policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    pub conservative: TierBounds,
    pub balanced: TierBounds,
    pub aggressive: TierBounds,
    /// Horizons below this are short.
    pub short_horizon_years: f64,
    /// Horizons at or above this are long.
    pub long_horizon_years: f64,
    /// Change applied to equity and emerging-market maxima.
    pub equity_shift: f64,
    /// Change applied to the bond minimum.
    pub bond_shift: f64,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            conservative: TierBounds {
                bonds: ClassBounds::new(0.25, 0.45, 0.08),
                equity: ClassBounds::new(0.05, 0.20, 0.04),
                real_estate: ClassBounds::new(0.02, 0.08, 0.02),
                gold: ClassBounds::new(0.03, 0.10, 0.03),
                emerging_markets: ClassBounds::new(0.02, 0.05, 0.02),
            },
            balanced: TierBounds {
                bonds: ClassBounds::new(0.10, 0.30, 0.05),
                equity: ClassBounds::new(0.12, 0.35, 0.05),
                real_estate: ClassBounds::new(0.03, 0.12, 0.03),
                gold: ClassBounds::new(0.03, 0.10, 0.03),
                emerging_markets: ClassBounds::new(0.03, 0.12, 0.03),
            },
            aggressive: TierBounds {
                bonds: ClassBounds::new(0.02, 0.15, 0.02),
                equity: ClassBounds::new(0.20, 0.45, 0.05),
                real_estate: ClassBounds::new(0.03, 0.15, 0.03),
                gold: ClassBounds::new(0.02, 0.08, 0.02),
                emerging_markets: ClassBounds::new(0.05, 0.20, 0.04),
            },
            short_horizon_years: 5.0,
            long_horizon_years: 15.0,
            equity_shift: 0.10,
            bond_shift: 0.05,
        }
    }
}

impl BoundsConfig {
    pub fn tier(&self, tier: StrategyTier) -> &TierBounds {
        match tier {
            StrategyTier::Conservative => &self.conservative,
            StrategyTier::Balanced => &self.balanced,
            StrategyTier::Aggressive => &self.aggressive,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for tier in StrategyTier::ALL {
            self.tier(tier).validate(tier.as_str())?;
        }
        if !(self.short_horizon_years > 0.0 && self.short_horizon_years <= self.long_horizon_years)
        {
            return Err(TierfolioError::config(
                "horizon bands require 0 < short_horizon_years <= long_horizon_years",
            ));
        }
        for (name, shift) in [("equity_shift", self.equity_shift), ("bond_shift", self.bond_shift)] {
            if !shift.is_finite() || !(0.0..=1.0).contains(&shift) {
                return Err(TierfolioError::config(format!("{name} must lie in [0, 1]")));
            }
        }
        Ok(())
    }
}

/// Horizon classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonBand {
    Short,
    Medium,
    Long,
}

/// Effective bounds for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBounds {
    pub symbol: String,
    pub lower: f64,
    pub upper: f64,
    pub floor: f64,
}

impl AssetBounds {
    pub fn new(symbol: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            symbol: symbol.into(),
            lower,
            upper,
            floor: lower,
        }
    }
}

/// Bounds for every asset of a universe, in universe order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsTable {
    universe: AssetUniverse,
    strategy: Option<StrategyTier>,
    bounds: Vec<AssetBounds>,
}

impl BoundsTable {
    /// Build a table. Symbols must follow the universe order and each band
    /// must satisfy `0 <= lower <= upper <= 1`.
    pub fn new(
        universe: &AssetUniverse,
        strategy: Option<StrategyTier>,
        bounds: Vec<AssetBounds>,
    ) -> Result<Self> {
        universe.check_len(bounds.len())?;
        for (asset, b) in universe.assets().iter().zip(&bounds) {
            if asset.symbol != b.symbol {
                return Err(TierfolioError::invariant(format!(
                    "bounds for '{}' supplied where '{}' was expected",
                    b.symbol, asset.symbol
                )));
            }
            let ordered = 0.0 <= b.lower && b.lower <= b.upper && b.upper <= 1.0;
            if !ordered || !b.floor.is_finite() || b.floor > b.lower {
                return Err(TierfolioError::invalid_request(format!(
                    "invalid bounds for {}: floor {} lower {} upper {}",
                    b.symbol, b.floor, b.lower, b.upper
                )));
            }
        }
        Ok(Self {
            universe: universe.clone(),
            strategy,
            bounds,
        })
    }

    /// Build from `(symbol, lower, upper)` triples in universe order.
    pub fn from_ranges(
        universe: &AssetUniverse,
        strategy: Option<StrategyTier>,
        ranges: &[(&str, f64, f64)],
    ) -> Result<Self> {
        let bounds = ranges
            .iter()
            .map(|&(symbol, lower, upper)| AssetBounds::new(symbol, lower, upper))
            .collect();
        Self::new(universe, strategy, bounds)
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn strategy(&self) -> Option<StrategyTier> {
        self.strategy
    }

    pub fn bounds(&self) -> &[AssetBounds] {
        &self.bounds
    }

    pub fn lower(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.lower).collect()
    }

    pub fn upper(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.upper).collect()
    }

    /// Fail with `OptimizationFailure` when no weights within the bands sum to one.
    pub fn check_feasible(&self) -> Result<()> {
        let lower: f64 = self.bounds.iter().map(|b| b.lower).sum();
        let upper: f64 = self.bounds.iter().map(|b| b.upper).sum();
        if lower > 1.0 + 1e-12 || upper < 1.0 - 1e-12 {
            return Err(self.failure(format!(
                "infeasible bounds: lower bounds sum to {lower:.4}, upper bounds sum to {upper:.4}"
            )));
        }
        Ok(())
    }

    /// Feasible starting point: every asset at its lower bound, remaining
    /// weight spread in proportion to each asset's headroom.
    pub fn initial_guess(&self) -> Result<Vec<f64>> {
        self.check_feasible()?;
        let lower = self.lower();
        let headroom: Vec<f64> = self.bounds.iter().map(|b| b.upper - b.lower).collect();
        let remaining = 1.0 - lower.iter().sum::<f64>();
        let total_headroom: f64 = headroom.iter().sum();

        let guess: Vec<f64> = if total_headroom > 0.0 {
            lower
                .iter()
                .zip(&headroom)
                .map(|(l, h)| l + remaining * h / total_headroom)
                .collect()
        } else {
            lower
        };
        let sum: f64 = guess.iter().sum();
        Ok(guess.into_iter().map(|w| w / sum).collect())
    }

    /// True when every weight lies within its band, up to `tolerance`.
    pub fn contains(&self, weights: &[f64], tolerance: f64) -> bool {
        weights.len() == self.bounds.len()
            && weights
                .iter()
                .zip(&self.bounds)
                .all(|(w, b)| *w >= b.lower - tolerance && *w <= b.upper + tolerance)
    }

    /// Optimization failure tagged with this table's strategy and bounds.
    pub fn failure(&self, message: impl Into<String>) -> TierfolioError {
        TierfolioError::optimization_failure(self.strategy, message, self.bounds.clone())
    }
}

/// Produces bounds tables per (tier, horizon).
#[derive(Debug, Clone, Default)]
pub struct BoundsPolicy {
    config: BoundsConfig,
}

impl BoundsPolicy {
    pub fn new(config: BoundsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BoundsConfig {
        &self.config
    }

    /// Classify a horizon in years.
    pub fn horizon_band(&self, horizon_years: f64) -> HorizonBand {
        if horizon_years < self.config.short_horizon_years {
            HorizonBand::Short
        } else if horizon_years >= self.config.long_horizon_years {
            HorizonBand::Long
        } else {
            HorizonBand::Medium
        }
    }

    /// Class bounds after the horizon adjustment.
    ///
    /// Long horizons raise equity and emerging-market maxima and lower the bond
    /// minimum; short horizons do the reverse. Floors are never crossed.
    pub fn class_bounds(&self, tier: StrategyTier, class: AssetClass, band: HorizonBand) -> ClassBounds {
        let base = self.config.tier(tier).class(class);
        let eq = self.config.equity_shift;
        let bd = self.config.bond_shift;
        let lower_of = |b: &ClassBounds| b.min.max(b.floor);

        let mut adjusted = base;
        match (band, class) {
            (HorizonBand::Long, AssetClass::Equity | AssetClass::EmergingMarkets) => {
                adjusted.max = (base.max + eq).min(1.0);
            }
            (HorizonBand::Long, AssetClass::Bonds) => {
                adjusted.min = (base.min - bd).max(0.0);
            }
            (HorizonBand::Short, AssetClass::Equity | AssetClass::EmergingMarkets) => {
                adjusted.max = (base.max - eq).max(lower_of(&base));
            }
            (HorizonBand::Short, AssetClass::Bonds) => {
                adjusted.min = (base.min + bd).min(base.max);
            }
            _ => {}
        }
        adjusted
    }

    /// Bounds table for a tier and horizon. Deterministic in its inputs.
    pub fn bounds(
        &self,
        universe: &AssetUniverse,
        tier: StrategyTier,
        horizon_years: f64,
    ) -> Result<BoundsTable> {
        let band = self.horizon_band(horizon_years);
        let bounds: Vec<AssetBounds> = universe
            .assets()
            .iter()
            .map(|asset| {
                let cb = self.class_bounds(tier, asset.class, band);
                let lower = cb.min.max(cb.floor);
                AssetBounds {
                    symbol: asset.symbol.clone(),
                    lower,
                    upper: cb.max.max(lower),
                    floor: cb.floor,
                }
            })
            .collect();

        debug!(
            "Bounds for {} tier ({:?} horizon): {:?}",
            tier,
            band,
            bounds
                .iter()
                .map(|b| format!("{}=[{:.2},{:.2}]", b.symbol, b.lower, b.upper))
                .collect::<Vec<_>>()
        );

        BoundsTable::new(universe, Some(tier), bounds)
    }
}
