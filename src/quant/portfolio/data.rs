//! # Portfolio Data Preparation
//!
//! $$
//! r_{t,i} = \frac{P_{t,i}-P_{t-1,i}}{P_{t-1,i}},\qquad
//! \Sigma = \frac{1}{T-1}\sum_{t}(r_t-\bar r)(r_t-\bar r)^\top
//! $$
//!
//! Turns per-symbol price histories into an immutable [`MarketInputs`] value:
//! dates aligned on their strict intersection, simple returns, per-period mean
//! returns and the unannualized sample covariance.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray::s;
use ndarray_stats::CorrelationExt;
use tracing::debug;
use tracing::warn;

use super::error::PortfolioError;
use super::error::Result;
use crate::quant::market::AssetSeries;
use crate::quant::market::MarketDataSource;

/// Minimum number of assets an optimization is meaningful for.
pub const MIN_SYMBOLS: usize = 2;

/// Align price series on the dates valid for every series.
///
/// Returns the common dates and a `dates x series` price matrix. Closes that are
/// not finite or not strictly positive are treated as missing, and a date
/// missing from any series is dropped for all of them. For a date repeated
/// inside one series the last close wins.
pub fn align_price_series(series: &[AssetSeries]) -> (Vec<NaiveDate>, Array2<f64>) {
  let by_date: Vec<BTreeMap<NaiveDate, f64>> = series
    .iter()
    .map(|s| {
      s.prices
        .iter()
        .filter(|p| p.is_valid())
        .map(|p| (p.date, p.close))
        .collect()
    })
    .collect();

  let mut common: BTreeSet<NaiveDate> = match by_date.first() {
    Some(first) => first.keys().copied().collect(),
    None => return (Vec::new(), Array2::zeros((0, 0))),
  };
  for closes in &by_date[1..] {
    common.retain(|d| closes.contains_key(d));
  }

  let dates: Vec<NaiveDate> = common.into_iter().collect();
  let mut prices = Array2::zeros((dates.len(), series.len()));
  for (j, closes) in by_date.iter().enumerate() {
    for (i, date) in dates.iter().enumerate() {
      prices[[i, j]] = closes[date];
    }
  }

  (dates, prices)
}

/// Simple period-over-period returns of a `dates x assets` price matrix.
/// The first row has no prior price and is dropped.
pub fn simple_returns(prices: &Array2<f64>) -> Array2<f64> {
  if prices.nrows() < 2 {
    return Array2::zeros((0, prices.ncols()));
  }

  let prev = prices.slice(s![..-1, ..]);
  let next = prices.slice(s![1.., ..]);
  (&next - &prev) / &prev
}

/// Sample covariance (ddof = 1) of a `observations x assets` return matrix.
pub fn sample_covariance(returns: &Array2<f64>) -> Result<Array2<f64>> {
  let observations = returns.nrows();
  if observations < 2 {
    return Err(PortfolioError::InsufficientHistory { observations });
  }

  returns
    .t()
    .cov(1.0)
    .map_err(|_| PortfolioError::InsufficientHistory { observations })
}

/// Immutable optimizer inputs for one request.
#[derive(Clone, Debug)]
pub struct MarketInputs {
  symbols: Vec<String>,
  dates: Vec<NaiveDate>,
  returns: Array2<f64>,
  mean_returns: Array1<f64>,
  covariance: Array2<f64>,
}

impl MarketInputs {
  /// Fetch `symbols` from `source` and prepare the optimizer inputs.
  ///
  /// Symbols whose history is empty (or whose fetch fails) are excluded; the
  /// request only fails when the remaining universe is smaller than
  /// `min_symbols`.
  pub fn prepare<S, T>(source: &S, symbols: &[T], period: &str, min_symbols: usize) -> Result<Self>
  where
    S: MarketDataSource + ?Sized,
    T: AsRef<str>,
  {
    let mut seen = BTreeSet::new();
    let requested: Vec<&str> = symbols
      .iter()
      .map(AsRef::as_ref)
      .filter(|s| seen.insert(*s))
      .collect();

    if requested.len() < min_symbols {
      return Err(PortfolioError::InsufficientSymbols {
        found: requested.len(),
        required: min_symbols,
      });
    }

    let mut series = Vec::with_capacity(requested.len());
    for symbol in requested {
      match source.fetch_history(symbol, period) {
        Ok(prices) if !prices.is_empty() => series.push(AssetSeries::new(symbol, prices)),
        Ok(_) => warn!(symbol, period, "excluding symbol with empty price history"),
        Err(err) => warn!(symbol, period, error = %err, "excluding symbol, history fetch failed"),
      }
    }

    Self::from_series(series, min_symbols)
  }

  /// Prepare optimizer inputs from already fetched series.
  pub fn from_series(series: Vec<AssetSeries>, min_symbols: usize) -> Result<Self> {
    let usable: Vec<AssetSeries> = series
      .into_iter()
      .filter(|s| s.prices.iter().any(|p| p.is_valid()))
      .collect();

    if usable.is_empty() {
      return Err(PortfolioError::NoDataAvailable);
    }
    if usable.len() < min_symbols {
      return Err(PortfolioError::InsufficientSymbols {
        found: usable.len(),
        required: min_symbols,
      });
    }

    let (dates, prices) = align_price_series(&usable);
    let returns = simple_returns(&prices);
    let return_dates = dates.get(1..).map(<[NaiveDate]>::to_vec).unwrap_or_default();
    let symbols = usable.into_iter().map(|s| s.symbol).collect();

    let inputs = Self::build(symbols, return_dates, returns)?;
    debug!(
      assets = inputs.num_assets(),
      observations = inputs.num_observations(),
      "prepared market inputs"
    );
    Ok(inputs)
  }

  /// Build inputs directly from a `observations x assets` return matrix.
  /// The resulting value carries no dates.
  pub fn from_returns(symbols: Vec<String>, returns: Array2<f64>) -> Result<Self> {
    if symbols.len() != returns.ncols() {
      return Err(PortfolioError::InvalidParameter(format!(
        "{} symbols for {} return columns",
        symbols.len(),
        returns.ncols()
      )));
    }
    if returns.iter().any(|r| !r.is_finite()) {
      return Err(PortfolioError::InvalidParameter(
        "return matrix contains non-finite values".into(),
      ));
    }

    Self::build(symbols, Vec::new(), returns)
  }

  fn build(symbols: Vec<String>, dates: Vec<NaiveDate>, returns: Array2<f64>) -> Result<Self> {
    let covariance = sample_covariance(&returns)?;
    let mean_returns = returns
      .mean_axis(Axis(0))
      .ok_or(PortfolioError::InsufficientHistory { observations: 0 })?;

    Ok(Self {
      symbols,
      dates,
      returns,
      mean_returns,
      covariance,
    })
  }

  /// Fail with [`PortfolioError::DegenerateVolatility`] when two assets carry
  /// the same return series, i.e. the variance of their spread
  /// `C_ii + C_jj - 2 C_ij` vanishes relative to their own variances.
  pub fn check_distinct_assets(&self, tolerance: f64) -> Result<()> {
    let c = &self.covariance;
    let n = self.num_assets();

    for i in 0..n {
      for j in (i + 1)..n {
        let spread = c[[i, i]] + c[[j, j]] - 2.0 * c[[i, j]];
        let scale = c[[i, i]].max(c[[j, j]]);
        if spread <= tolerance * scale || spread <= 0.0 {
          warn!(
            first = %self.symbols[i],
            second = %self.symbols[j],
            "duplicate return series"
          );
          return Err(PortfolioError::DegenerateVolatility);
        }
      }
    }

    Ok(())
  }

  /// Fail with [`PortfolioError::DegenerateVolatility`] when an asset with
  /// vanishing variance earns more than `risk_free_rate` a year. The Sharpe
  /// ratio is unbounded as weight concentrates on such an asset.
  pub fn check_riskless_dominance(&self, risk_free_rate: f64, periods_per_year: f64, tolerance: f64) -> Result<()> {
    let c = &self.covariance;
    let scale = c.diag().iter().copied().fold(0.0, f64::max);

    for (i, mean) in self.mean_returns.iter().enumerate() {
      let variance = c[[i, i]];
      let riskless = variance <= tolerance * scale || variance <= 0.0;
      if riskless && periods_per_year * mean > risk_free_rate {
        warn!(
          symbol = %self.symbols[i],
          annual_return = periods_per_year * mean,
          "riskless asset beats the risk-free rate"
        );
        return Err(PortfolioError::DegenerateVolatility);
      }
    }

    Ok(())
  }

  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  /// Dates of the return rows (empty when built from raw returns).
  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn returns(&self) -> &Array2<f64> {
    &self.returns
  }

  /// Per-period mean return of each asset.
  pub fn mean_returns(&self) -> &Array1<f64> {
    &self.mean_returns
  }

  /// Per-period (unannualized) sample covariance.
  pub fn covariance(&self) -> &Array2<f64> {
    &self.covariance
  }

  pub fn num_assets(&self) -> usize {
    self.symbols.len()
  }

  pub fn num_observations(&self) -> usize {
    self.returns.nrows()
  }
}
