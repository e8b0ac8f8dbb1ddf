//! Core types and utilities for Tierfolio.

pub mod config;
pub mod error;
pub mod timeseries;
pub mod types;
pub mod universe;

pub use config::EngineConfig;
pub use error::{Result, TierfolioError};
pub use timeseries::{PricePanel, PriceRow, ReturnPanel};
pub use types::*;
pub use universe::{Asset, AssetClass, AssetUniverse, AssetWeights};
