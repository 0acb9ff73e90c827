//! # Yahoo Finance
//!
//! $$
//! (\text{symbol},\text{range})\xrightarrow{\ \text{1d}\ }\{(t_k, C_{t_k})\}
//! $$
//!
//! Daily closes from Yahoo Finance. The period token is passed through as
//! the chart range (`"1mo"`, `"6mo"`, `"1y"`, `"5y"`, ...).

use anyhow::Result;
use chrono::DateTime;
use tracing::debug;
use yahoo_finance_api::YahooConnector;

use super::market::MarketDataSource;
use super::market::PricePoint;

/// Bar interval requested from the chart API.
const DAILY: &str = "1d";

/// Close stamped with the UTC calendar day of a unix `timestamp`; `None` when
/// the timestamp is out of range.
fn daily_close(timestamp: i64, close: f64) -> Option<PricePoint> {
  DateTime::from_timestamp(timestamp, 0).map(|dt| PricePoint::new(dt.date_naive(), close))
}

/// [`MarketDataSource`] backed by the Yahoo Finance chart API.
pub struct YahooMarketData {
  provider: YahooConnector,
}

impl YahooMarketData {
  pub fn new() -> Result<Self> {
    Ok(Self {
      provider: YahooConnector::new()?,
    })
  }
}

impl MarketDataSource for YahooMarketData {
  fn fetch_history(&self, symbol: &str, period: &str) -> Result<Vec<PricePoint>> {
    let response = tokio_test::block_on(self.provider.get_quote_range(symbol, DAILY, period))?;
    let quotes = response.quotes()?;

    let prices: Vec<PricePoint> = quotes
      .iter()
      .filter_map(|q| daily_close(q.timestamp as i64, q.close))
      .collect();

    debug!(symbol, period, points = prices.len(), "fetched yahoo history");
    Ok(prices)
  }
}
