//! # Market Data
//!
//! $$
//! \text{fetch}:(\text{symbol},\text{period})\mapsto \{(t_k, P_{t_k})\}_{k=1}^{n}
//! $$
//!
//! Boundary to historical price providers. The period token is opaque and is
//! passed through to the provider untouched.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use impl_new_derive::ImplNew;

/// One daily close.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq)]
pub struct PricePoint {
  /// Trading date.
  pub date: NaiveDate,
  /// Closing price.
  pub close: f64,
}

impl PricePoint {
  /// A close is usable when it is finite and strictly positive.
  pub fn is_valid(&self) -> bool {
    self.close.is_finite() && self.close > 0.0
  }
}

/// Price history of one symbol, ascending by date.
#[derive(Clone, Debug, Default)]
pub struct AssetSeries {
  pub symbol: String,
  pub prices: Vec<PricePoint>,
}

impl AssetSeries {
  pub fn new(symbol: impl Into<String>, mut prices: Vec<PricePoint>) -> Self {
    prices.sort_by_key(|p| p.date);
    Self {
      symbol: symbol.into(),
      prices,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.prices.is_empty()
  }

  pub fn len(&self) -> usize {
    self.prices.len()
  }
}

/// Source of historical closing prices.
pub trait MarketDataSource {
  /// Fetch the closing-price history of `symbol` over the lookback `period`
  /// (e.g. `"1mo"`, `"1y"`). An unknown symbol yields an empty vector.
  fn fetch_history(&self, symbol: &str, period: &str) -> Result<Vec<PricePoint>>;
}

impl<T: MarketDataSource + ?Sized> MarketDataSource for &T {
  fn fetch_history(&self, symbol: &str, period: &str) -> Result<Vec<PricePoint>> {
    (**self).fetch_history(symbol, period)
  }
}

/// In-memory price store. Ignores the period token and always returns the
/// full stored history.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMarketData {
  series: HashMap<String, Vec<PricePoint>>,
}

impl InMemoryMarketData {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store (or replace) the history of `symbol`.
  pub fn insert(&mut self, symbol: impl Into<String>, prices: Vec<PricePoint>) {
    self.series.insert(symbol.into(), prices);
  }

  /// Builder-style [`InMemoryMarketData::insert`].
  pub fn with_series(mut self, symbol: impl Into<String>, prices: Vec<PricePoint>) -> Self {
    self.insert(symbol, prices);
    self
  }

  /// Store a close series on consecutive calendar days starting at `start`.
  pub fn with_closes(self, symbol: impl Into<String>, start: NaiveDate, closes: &[f64]) -> Self {
    let prices = closes
      .iter()
      .zip(start.iter_days())
      .map(|(&close, date)| PricePoint::new(date, close))
      .collect();
    self.with_series(symbol, prices)
  }

  pub fn symbols(&self) -> impl Iterator<Item = &str> {
    self.series.keys().map(String::as_str)
  }
}

impl MarketDataSource for InMemoryMarketData {
  fn fetch_history(&self, symbol: &str, _period: &str) -> Result<Vec<PricePoint>> {
    let mut prices = self.series.get(symbol).cloned().unwrap_or_default();
    prices.sort_by_key(|p| p.date);
    Ok(prices)
  }
}
