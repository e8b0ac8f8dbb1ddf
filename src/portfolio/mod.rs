//! Portfolio construction: bounds, allocation, rebalancing and goal simulation.

pub mod allocation;
pub mod bounds;
pub mod monte_carlo;
pub mod orchestrator;
pub mod qp;
pub mod rebalancing;

pub use allocation::{AllocationOptimizer, ObjectiveMode};
pub use bounds::{AssetBounds, BoundsConfig, BoundsPolicy, BoundsTable, ClassBounds, HorizonBand, TierBounds};
pub use monte_carlo::{GoalParameters, GoalSimulator, SimulationConfig};
pub use orchestrator::OptimizationOrchestrator;
pub use qp::{QpSolution, QuadraticProgram, SolverConfig};
pub use rebalancing::{AccountFactors, CadenceParameters, RebalancingAnalyzer, RebalancingConfig};
