//! The canonical asset universe and weight vectors indexed against it.
//!
//! Every vector and matrix in the engine is ordered by an [`AssetUniverse`].
//! Statistics, bounds tables and weights all carry the universe they were
//! built against, so misaligned inputs are rejected instead of silently
//! mixing up assets.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::error::{Result, TierfolioError};

/// Broad asset class used by the bounds policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Bonds,
    Equity,
    RealEstate,
    Gold,
    EmergingMarkets,
}

impl AssetClass {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Bonds => "bonds",
            AssetClass::Equity => "equity",
            AssetClass::RealEstate => "real_estate",
            AssetClass::Gold => "gold",
            AssetClass::EmergingMarkets => "emerging_markets",
        }
    }
}

/// A tradable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub class: AssetClass,
}

impl Asset {
    pub fn new(symbol: impl Into<String>, class: AssetClass) -> Self {
        Self {
            symbol: symbol.into(),
            class,
        }
    }
}

/// Ordered, fixed list of assets.
///
/// Cloning is cheap; equality compares symbols and classes in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUniverse {
    assets: Arc<[Asset]>,
}

impl AssetUniverse {
    /// Create a universe. Rejects empty lists and duplicate symbols.
    pub fn new(assets: Vec<Asset>) -> Result<Self> {
        if assets.is_empty() {
            return Err(TierfolioError::config("asset universe is empty"));
        }
        let mut seen = HashSet::with_capacity(assets.len());
        for asset in &assets {
            if asset.symbol.trim().is_empty() {
                return Err(TierfolioError::config("asset symbol is blank"));
            }
            if !seen.insert(asset.symbol.as_str()) {
                return Err(TierfolioError::config(format!(
                    "duplicate symbol '{}' in asset universe",
                    asset.symbol
                )));
            }
        }
        Ok(Self {
            assets: assets.into(),
        })
    }

    /// Seven-ETF universe covering every asset class.
    pub fn default_etf() -> Self {
        let assets: Vec<Asset> = vec![
            Asset::new("VTI", AssetClass::Equity),
            Asset::new("VEA", AssetClass::Equity),
            Asset::new("BND", AssetClass::Bonds),
            Asset::new("TIP", AssetClass::Bonds),
            Asset::new("VNQ", AssetClass::RealEstate),
            Asset::new("GLD", AssetClass::Gold),
            Asset::new("VWO", AssetClass::EmergingMarkets),
        ];
        Self {
            assets: assets.into(),
        }
    }

    /// Number of assets.
    #[inline]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Position of a symbol in the canonical order.
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.assets.iter().position(|a| a.symbol == symbol)
    }

    /// Asset at a canonical index.
    pub fn get(&self, index: usize) -> Option<&Asset> {
        self.assets.get(index)
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|a| a.symbol.as_str())
    }

    /// Fail with `LengthMismatch` unless `len` matches the universe size.
    pub fn check_len(&self, len: usize) -> Result<()> {
        if len != self.len() {
            return Err(TierfolioError::length_mismatch(self.len(), len));
        }
        Ok(())
    }

    /// Fail with `InvariantViolation` unless `other` is this universe.
    pub fn ensure_same(&self, other: &AssetUniverse, context: &str) -> Result<()> {
        if self != other {
            return Err(TierfolioError::invariant(format!(
                "{context}: asset universe mismatch ({self} vs {other})"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for AssetUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<&str> = self.symbols().collect();
        write!(f, "[{}]", symbols.join(", "))
    }
}

impl Serialize for AssetUniverse {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.assets().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AssetUniverse {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let assets = Vec::<Asset>::deserialize(deserializer)?;
        AssetUniverse::new(assets).map_err(serde::de::Error::custom)
    }
}

/// Portfolio weights keyed by the universe order.
///
/// Serializes as a `{symbol: weight}` map in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetWeights {
    universe: AssetUniverse,
    weights: Vec<f64>,
}

impl AssetWeights {
    /// Wrap a weight vector. Its length must match the universe.
    pub fn new(universe: AssetUniverse, weights: Vec<f64>) -> Result<Self> {
        universe.check_len(weights.len())?;
        if let Some(w) = weights.iter().find(|w| !w.is_finite()) {
            return Err(TierfolioError::invariant(format!(
                "non-finite weight {w} in allocation"
            )));
        }
        Ok(Self { universe, weights })
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    /// Weight for a symbol.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.universe.index_of(symbol).map(|i| self.weights[i])
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Count of weights strictly above `threshold`.
    pub fn count_above(&self, threshold: f64) -> usize {
        self.weights.iter().filter(|&&w| w > threshold).count()
    }

    /// Iterator over (symbol, weight) in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.universe.symbols().zip(self.weights.iter().copied())
    }
}

impl Serialize for AssetWeights {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.weights.len()))?;
        for (symbol, weight) in self.iter() {
            map.serialize_entry(symbol, &weight)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_duplicates() {
        let assets = vec![
            Asset::new("A", AssetClass::Equity),
            Asset::new("A", AssetClass::Bonds),
        ];
        assert!(AssetUniverse::new(assets).is_err());
        assert!(AssetUniverse::new(vec![]).is_err());
    }

    #[test]
    fn test_index_and_order() {
        let universe = AssetUniverse::default_etf();
        assert_eq!(universe.len(), 7);
        assert_eq!(universe.index_of("VTI"), Some(0));
        assert_eq!(universe.index_of("VWO"), Some(6));
        assert_eq!(universe.index_of("SPY"), None);
        assert_eq!(universe.get(2).map(|a| a.class), Some(AssetClass::Bonds));
    }

    #[test]
    fn test_weights_length_checked() {
        let universe = AssetUniverse::default_etf();
        assert!(AssetWeights::new(universe.clone(), vec![0.5, 0.5]).is_err());

        let weights = AssetWeights::new(universe, vec![1.0 / 7.0; 7]).unwrap();
        assert!((weights.total() - 1.0).abs() < 1e-12);
        assert!((weights.get("GLD").unwrap() - 1.0 / 7.0).abs() < 1e-12);
        assert_eq!(weights.count_above(0.01), 7);
    }

    #[test]
    fn test_weights_serialize_in_order() {
        let universe = AssetUniverse::new(vec![
            Asset::new("B", AssetClass::Bonds),
            Asset::new("A", AssetClass::Equity),
        ])
        .unwrap();
        let weights = AssetWeights::new(universe, vec![0.25, 0.75]).unwrap();
        let json = serde_json::to_string(&weights).unwrap();
        assert_eq!(json, r#"{"B":0.25,"A":0.75}"#);
    }

    #[test]
    fn test_universe_mismatch_is_invariant_violation() {
        let a = AssetUniverse::default_etf();
        let b = AssetUniverse::new(vec![Asset::new("X", AssetClass::Gold)]).unwrap();
        let err = a.ensure_same(&b, "test").unwrap_err();
        assert!(matches!(err, TierfolioError::InvariantViolation { .. }));
    }
}
