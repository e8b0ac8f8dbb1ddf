//! Integration tests for bounds and allocation.

mod common;

use common::realistic_statistics;
use tierfolio::portfolio::qp::SolverConfig;
use tierfolio::{
    AllocationOptimizer, Asset, AssetClass, AssetUniverse, BoundsPolicy, BoundsTable,
    ObjectiveMode, ReturnStatistics, StrategyTier, TierfolioError,
};

fn three_assets() -> AssetUniverse {
    AssetUniverse::new(vec![
        Asset::new("A", AssetClass::Equity),
        Asset::new("B", AssetClass::Bonds),
        Asset::new("C", AssetClass::Bonds),
    ])
    .unwrap()
}

fn three_asset_stats() -> ReturnStatistics {
    ReturnStatistics::from_parts(
        &three_assets(),
        vec![0.10, 0.06, 0.03],
        vec![0.15, 0.08, 0.03],
        vec![
            vec![1.0, 0.02, 0.01],
            vec![0.02, 1.0, 0.03],
            vec![0.01, 0.03, 1.0],
        ],
    )
    .unwrap()
}

fn optimizer() -> AllocationOptimizer {
    AllocationOptimizer::new(SolverConfig::default(), 0.02)
}

#[test]
fn test_conservative_three_asset_scenario() {
    let table = BoundsTable::from_ranges(
        &three_assets(),
        Some(StrategyTier::Conservative),
        &[("A", 0.0, 0.60), ("B", 0.0, 0.60), ("C", 0.25, 0.60)],
    )
    .unwrap();
    let stats = three_asset_stats();
    let weights = optimizer()
        .optimize(&stats, &table, ObjectiveMode::MinimizeVariance)
        .unwrap();

    assert!((weights.total() - 1.0).abs() < 1e-4);
    assert!(weights.get("C").unwrap() >= 0.25 - 1e-6);
    let vol = stats.portfolio_volatility(weights.as_slice());
    assert!(vol < 0.15 && vol < 0.08, "portfolio volatility {vol}");
}

#[test]
fn test_max_sharpe_three_asset_scenario_respects_floor() {
    let table = BoundsTable::from_ranges(
        &three_assets(),
        Some(StrategyTier::Balanced),
        &[("A", 0.0, 0.60), ("B", 0.0, 0.60), ("C", 0.25, 0.60)],
    )
    .unwrap();
    let stats = three_asset_stats();
    let weights = optimizer()
        .optimize(&stats, &table, ObjectiveMode::MaximizeSharpe)
        .unwrap();
    assert!(weights.get("C").unwrap() >= 0.25 - 1e-6);
    assert!(table.contains(weights.as_slice(), 1e-6));
}

#[test]
fn test_optimized_beats_initial_guess() {
    let stats = realistic_statistics();
    let policy = BoundsPolicy::default();
    let opt = optimizer();

    for tier in StrategyTier::ALL {
        let table = policy.bounds(stats.universe(), tier, 10.0).unwrap();
        let guess = table.initial_guess().unwrap();
        let mode = ObjectiveMode::for_tier(tier);
        let weights = opt.optimize(&stats, &table, mode).unwrap();

        let solved = opt.objective(&stats, weights.as_slice(), mode);
        let start = opt.objective(&stats, &guess, mode);
        assert!(solved <= start + 1e-9, "{tier}: {solved} vs {start}");
    }
}

#[test]
fn test_every_tier_and_horizon_within_bounds() {
    let stats = realistic_statistics();
    let policy = BoundsPolicy::default();

    for tier in StrategyTier::ALL {
        for horizon in [1.0, 4.9, 5.0, 14.9, 15.0, 30.0] {
            let table = policy.bounds(stats.universe(), tier, horizon).unwrap();
            let weights = optimizer()
                .optimize(&stats, &table, ObjectiveMode::for_tier(tier))
                .unwrap();
            assert!((weights.total() - 1.0).abs() < 1e-4);
            assert!(table.contains(weights.as_slice(), 1e-4), "{tier} {horizon}");
            for (w, b) in weights.as_slice().iter().zip(table.bounds()) {
                assert!(*w >= b.floor - 1e-4);
            }
        }
    }
}

#[test]
fn test_longer_horizon_allows_more_equity() {
    let stats = realistic_statistics();
    let policy = BoundsPolicy::default();
    let equity = |horizon: f64| {
        let table = policy
            .bounds(stats.universe(), StrategyTier::Aggressive, horizon)
            .unwrap();
        let w = optimizer()
            .optimize(&stats, &table, ObjectiveMode::MaximizeSharpe)
            .unwrap();
        w.get("VTI").unwrap() + w.get("VEA").unwrap()
    };
    assert!(equity(25.0) >= equity(2.0) - 1e-6);
}

#[test]
fn test_infeasible_table_reports_bounds() {
    let table = BoundsTable::from_ranges(
        &three_assets(),
        None,
        &[("A", 0.0, 0.2), ("B", 0.0, 0.2), ("C", 0.0, 0.2)],
    )
    .unwrap();
    let err = optimizer()
        .optimize(&three_asset_stats(), &table, ObjectiveMode::MinimizeVariance)
        .unwrap_err();
    match err {
        TierfolioError::OptimizationFailure { strategy, bounds, message } => {
            assert_eq!(strategy, None);
            assert_eq!(bounds.len(), 3);
            assert!(message.contains("infeasible"), "{message}");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_repeated_optimization_is_identical() {
    let stats = realistic_statistics();
    let table = BoundsPolicy::default()
        .bounds(stats.universe(), StrategyTier::Balanced, 10.0)
        .unwrap();
    let a = optimizer()
        .optimize(&stats, &table, ObjectiveMode::MaximizeSharpe)
        .unwrap();
    let b = optimizer()
        .optimize(&stats, &table, ObjectiveMode::MaximizeSharpe)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_bounds_table_rejects_misordered_symbols() {
    let err = BoundsTable::from_ranges(
        &three_assets(),
        None,
        &[("B", 0.0, 1.0), ("A", 0.0, 1.0), ("C", 0.0, 1.0)],
    )
    .unwrap_err();
    assert!(matches!(err, TierfolioError::InvariantViolation { .. }));
}
