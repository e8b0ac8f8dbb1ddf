//! Date-indexed price and return panels aligned to an asset universe.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{Result, TierfolioError};
use super::universe::AssetUniverse;

/// One row from the price-history provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub symbol: String,
    pub adj_close: f64,
}

impl PriceRow {
    pub fn new(date: NaiveDate, symbol: impl Into<String>, adj_close: f64) -> Self {
        Self {
            date,
            symbol: symbol.into(),
            adj_close,
        }
    }
}

/// Adjusted close prices, one column per asset, on a shared sorted date index.
#[derive(Debug, Clone)]
pub struct PricePanel {
    universe: AssetUniverse,
    dates: Vec<NaiveDate>,
    /// `prices[asset][t]`, `None` where the provider had no row.
    prices: Vec<Vec<Option<f64>>>,
}

impl PricePanel {
    /// Pivot (date, symbol, adjusted close) rows into per-asset series.
    ///
    /// Symbols outside the universe are an error. Duplicate (date, symbol)
    /// rows keep the last price seen.
    pub fn from_rows<I>(universe: &AssetUniverse, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = PriceRow>,
    {
        let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        let n_assets = universe.len();

        for row in rows {
            let idx = universe
                .index_of(&row.symbol)
                .ok_or_else(|| TierfolioError::UnknownSymbol {
                    symbol: row.symbol.clone(),
                })?;
            if !row.adj_close.is_finite() || row.adj_close <= 0.0 {
                return Err(TierfolioError::InvalidPrice {
                    symbol: row.symbol,
                    date: row.date.to_string(),
                    price: row.adj_close,
                });
            }
            let slot = &mut by_date
                .entry(row.date)
                .or_insert_with(|| vec![None; n_assets])[idx];
            if slot.is_some() {
                warn!("Duplicate price row for {} on {}, keeping last", row.symbol, row.date);
            }
            *slot = Some(row.adj_close);
        }

        let dates: Vec<NaiveDate> = by_date.keys().copied().collect();
        let mut prices = vec![Vec::with_capacity(dates.len()); n_assets];
        for row in by_date.into_values() {
            for (asset, price) in row.into_iter().enumerate() {
                prices[asset].push(price);
            }
        }

        Ok(Self {
            universe: universe.clone(),
            dates,
            prices,
        })
    }

    /// Read `date,symbol,adj_close` CSV with a header row.
    pub fn from_csv_reader<R: Read>(universe: &AssetUniverse, reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        for record in csv_reader.deserialize::<PriceRow>() {
            let row = record.map_err(|e| TierfolioError::malformed_data(e.to_string()))?;
            rows.push(row);
        }
        Self::from_rows(universe, rows)
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of dates.
    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Price column for an asset.
    pub fn asset(&self, index: usize) -> Option<&[Option<f64>]> {
        self.prices.get(index).map(|p| p.as_slice())
    }

    /// Period-over-period simple returns.
    ///
    /// A return is `None` unless both its start and end prices exist.
    pub fn returns(&self) -> ReturnPanel {
        let periods = self.dates.len().saturating_sub(1);
        let returns: Vec<Vec<Option<f64>>> = self
            .prices
            .iter()
            .map(|column| {
                column
                    .windows(2)
                    .map(|w| match (w[0], w[1]) {
                        (Some(prev), Some(curr)) => Some(curr / prev - 1.0),
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        let dates = self.dates.iter().skip(1).copied().collect::<Vec<_>>();
        debug_assert_eq!(dates.len(), periods);

        let gaps = returns
            .iter()
            .filter(|col| col.iter().any(Option::is_none))
            .count();
        if gaps > 0 {
            warn!("{} assets have gaps in their price history", gaps);
        }

        ReturnPanel {
            universe: self.universe.clone(),
            dates,
            returns,
        }
    }
}

/// Periodic returns, one column per asset, on a shared date index.
#[derive(Debug, Clone)]
pub struct ReturnPanel {
    universe: AssetUniverse,
    dates: Vec<NaiveDate>,
    /// `returns[asset][t]`.
    returns: Vec<Vec<Option<f64>>>,
}

impl ReturnPanel {
    /// Build from per-asset columns in universe order.
    pub fn from_columns(
        universe: &AssetUniverse,
        dates: Vec<NaiveDate>,
        returns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        universe.check_len(returns.len())?;
        for column in &returns {
            if column.len() != dates.len() {
                return Err(TierfolioError::length_mismatch(dates.len(), column.len()));
            }
        }
        let unsorted = dates.windows(2).any(|w| w[0] >= w[1]);
        if unsorted {
            return Err(TierfolioError::malformed_data(
                "return dates must be strictly increasing",
            ));
        }
        Ok(Self {
            universe: universe.clone(),
            dates,
            returns,
        })
    }

    /// Build from complete columns on consecutive daily dates starting at `start`.
    pub fn from_dense(
        universe: &AssetUniverse,
        start: NaiveDate,
        returns: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let periods = returns.first().map(Vec::len).unwrap_or(0);
        let dates: Vec<NaiveDate> = start.iter_days().take(periods).collect();
        let columns = returns
            .into_iter()
            .map(|c| c.into_iter().map(Some).collect())
            .collect();
        Self::from_columns(universe, dates, columns)
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of periods.
    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Return column for an asset.
    pub fn asset(&self, index: usize) -> &[Option<f64>] {
        &self.returns[index]
    }

    /// Number of periods with data for an asset.
    pub fn available(&self, index: usize) -> usize {
        self.returns[index].iter().filter(|r| r.is_some()).count()
    }

    /// Returns of every asset in period `t`, in universe order.
    pub fn period(&self, t: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.returns.iter().map(move |col| col[t])
    }

    /// Periods where every asset has a return.
    pub fn complete_periods(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&t| self.period(t).all(|r| r.is_some()))
            .collect()
    }

    /// Distinct dates on which at least one asset is missing.
    pub fn incomplete_dates(&self) -> BTreeSet<NaiveDate> {
        (0..self.len())
            .filter(|&t| self.period(t).any(|r| r.is_none()))
            .map(|t| self.dates[t])
            .collect()
    }
}
