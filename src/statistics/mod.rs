//! Return statistics for Tierfolio.

pub mod moments;
pub mod returns;

pub use moments::{RunningCovariance, RunningMoments};
pub use returns::{sharpe_ratio, ReturnStatistics, ReturnStatisticsCalculator};
