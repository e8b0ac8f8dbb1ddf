//! Shared fixtures for integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use tierfolio::{AssetUniverse, PricePanel, PriceRow, ReturnPanel, ReturnStatistics};

/// Annual (μ, σ, market beta) per default ETF, in universe order.
pub const ETF_PARAMS: [(&str, f64, f64, f64); 7] = [
    ("VTI", 0.10, 0.16, 0.95),
    ("VEA", 0.07, 0.17, 0.85),
    ("BND", 0.035, 0.05, 0.05),
    ("TIP", 0.03, 0.06, 0.10),
    ("VNQ", 0.08, 0.20, 0.65),
    ("GLD", 0.05, 0.15, 0.05),
    ("VWO", 0.085, 0.22, 0.75),
];

/// Five years of trading days.
pub const HISTORY_DAYS: usize = 1260;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 2).unwrap()
}

/// Daily (date, symbol, price) rows for the default universe driven by one
/// market factor plus idiosyncratic noise. Noise runs at half the annual
/// volatility so sample means stay close to their targets.
pub fn etf_price_rows(days: usize, seed: u64) -> Vec<PriceRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut prices = [100.0f64; 7];
    let mut rows = Vec::with_capacity(days * 7);

    for date in start_date().iter_days().take(days) {
        let market: f64 = StandardNormal.sample(&mut rng);
        for (i, &(symbol, mu, sigma, beta)) in ETF_PARAMS.iter().enumerate() {
            let idio: f64 = StandardNormal.sample(&mut rng);
            let shock = beta * market + (1.0 - beta * beta).sqrt() * idio;
            let r = mu / 252.0 + 0.5 * sigma / 252f64.sqrt() * shock;
            rows.push(PriceRow::new(date, symbol, prices[i]));
            prices[i] *= 1.0 + r;
        }
    }
    rows
}

pub fn etf_prices(days: usize, seed: u64) -> PricePanel {
    PricePanel::from_rows(&AssetUniverse::default_etf(), etf_price_rows(days, seed)).unwrap()
}

/// Realistic annualized statistics for the default universe.
pub fn realistic_statistics() -> ReturnStatistics {
    let universe = AssetUniverse::default_etf();
    let mu = vec![0.10, 0.07, 0.035, 0.03, 0.08, 0.05, 0.085];
    let vol = vec![0.16, 0.17, 0.05, 0.06, 0.20, 0.15, 0.22];
    let corr = vec![
        vec![1.00, 0.85, 0.05, 0.10, 0.65, 0.05, 0.70],
        vec![0.85, 1.00, 0.08, 0.12, 0.55, 0.10, 0.78],
        vec![0.05, 0.08, 1.00, 0.70, 0.20, 0.30, 0.05],
        vec![0.10, 0.12, 0.70, 1.00, 0.20, 0.35, 0.12],
        vec![0.65, 0.55, 0.20, 0.20, 1.00, 0.10, 0.50],
        vec![0.05, 0.10, 0.30, 0.35, 0.10, 1.00, 0.20],
        vec![0.70, 0.78, 0.05, 0.12, 0.50, 0.20, 1.00],
    ];
    ReturnStatistics::from_parts(&universe, mu, vol, corr).unwrap()
}

/// Return history matching the default universe, for drawdown replay.
pub fn etf_returns(days: usize, seed: u64) -> ReturnPanel {
    etf_prices(days, seed).returns()
}
