//! Error types for Tierfolio.

use thiserror::Error;

use super::types::StrategyTier;
use crate::portfolio::bounds::AssetBounds;

/// Result type alias for Tierfolio operations.
pub type Result<T> = std::result::Result<T, TierfolioError>;

/// Error types for the optimization engine.
///
/// None of these are retried or replaced with a fallback allocation inside the
/// engine. The caller decides how to present them.
#[derive(Error, Debug, Clone)]
pub enum TierfolioError {
    /// Caller-correctable request problem, rejected before any computation.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Historical series too short for a required asset.
    #[error("Insufficient data for {asset}: need at least {required} return periods, got {available}")]
    InsufficientData {
        asset: String,
        required: usize,
        available: usize,
    },

    /// The solver did not converge or the constraints were infeasible.
    #[error(
        "Optimization failed for {} strategy: {message}",
        .strategy.map(|s| s.as_str()).unwrap_or("custom")
    )]
    OptimizationFailure {
        strategy: Option<StrategyTier>,
        message: String,
        bounds: Vec<AssetBounds>,
    },

    /// Internal consistency check failed. Always a bug.
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    /// Price row for a symbol outside the configured universe.
    #[error("Unknown symbol '{symbol}' is not part of the asset universe")]
    UnknownSymbol { symbol: String },

    /// Non-positive or non-finite price.
    #[error("Invalid price {price} for {symbol} on {date}")]
    InvalidPrice {
        symbol: String,
        date: String,
        price: f64,
    },

    /// Price history that cannot be parsed.
    #[error("Malformed price data: {message}")]
    MalformedData { message: String },

    /// Data length mismatch between arrays.
    #[error("Data length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Invalid engine configuration.
    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl TierfolioError {
    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(asset: impl Into<String>, required: usize, available: usize) -> Self {
        Self::InsufficientData {
            asset: asset.into(),
            required,
            available,
        }
    }

    /// Create an optimization failure.
    pub fn optimization_failure(
        strategy: Option<StrategyTier>,
        message: impl Into<String>,
        bounds: Vec<AssetBounds>,
    ) -> Self {
        Self::OptimizationFailure {
            strategy,
            message: message.into(),
            bounds,
        }
    }

    /// Create an invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a malformed data error.
    pub fn malformed_data(message: impl Into<String>) -> Self {
        Self::MalformedData {
            message: message.into(),
        }
    }

    /// Create a length mismatch error.
    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self::LengthMismatch { expected, actual }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Strategy tier attached to an optimization failure, if any.
    pub fn strategy(&self) -> Option<StrategyTier> {
        match self {
            Self::OptimizationFailure { strategy, .. } => *strategy,
            _ => None,
        }
    }
}
