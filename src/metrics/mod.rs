//! Historical risk metrics.

pub mod drawdown;
pub mod historical;

pub use drawdown::{calculate_drawdown_curve, DrawdownTracker};
pub use historical::{HistoricalRisk, HistoricalRiskEvaluator};
