//! # Portfolio Performance
//!
//! $$
//! \mu_p = P\sum_i w_i \bar r_i,\qquad \sigma_p=\sqrt{P\,\mathbf{w}^\top \Sigma \mathbf{w}},\qquad
//! S=\frac{\mu_p-r_f}{\sigma_p}
//! $$
//!
//! Annualized return, volatility and Sharpe ratio of a weight vector. The
//! covariance stays per period; annualization happens here with an explicit
//! periods-per-year constant.

use ndarray::Array2;

use super::data::MarketInputs;
use super::error::PortfolioError;
use super::error::Result;

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Volatilities at or below this are treated as zero.
pub const MIN_VOLATILITY: f64 = 1e-12;

/// Evaluates annualized portfolio statistics against one set of inputs.
#[derive(Clone, Debug)]
pub struct PerformanceEvaluator {
  mean_returns: Vec<f64>,
  covariance: Array2<f64>,
  periods_per_year: f64,
}

impl PerformanceEvaluator {
  pub fn new(inputs: &MarketInputs, periods_per_year: f64) -> Self {
    Self {
      mean_returns: inputs.mean_returns().to_vec(),
      covariance: inputs.covariance().clone(),
      periods_per_year,
    }
  }

  pub fn num_assets(&self) -> usize {
    self.mean_returns.len()
  }

  pub fn periods_per_year(&self) -> f64 {
    self.periods_per_year
  }

  /// Per-period mean return of each asset.
  pub fn mean_returns(&self) -> &[f64] {
    &self.mean_returns
  }

  /// Annualized expected return `P * sum_i w_i * mean_i`.
  pub fn expected_return(&self, weights: &[f64]) -> f64 {
    self.periods_per_year * dot(weights, &self.mean_returns)
  }

  /// `Σ w`, per period.
  pub fn covariance_times(&self, weights: &[f64]) -> Vec<f64> {
    self
      .covariance
      .rows()
      .into_iter()
      .map(|row| row.iter().zip(weights).map(|(c, w)| c * w).sum())
      .collect()
  }

  /// Per-period variance `wᵀ Σ w`. Negative round-off is clamped to zero.
  pub fn variance(&self, weights: &[f64]) -> f64 {
    dot(weights, &self.covariance_times(weights)).max(0.0)
  }

  /// Annualized volatility `sqrt(P * wᵀ Σ w)`.
  pub fn volatility(&self, weights: &[f64]) -> f64 {
    (self.periods_per_year * self.variance(weights)).sqrt()
  }

  /// Annualized `(expected_return, volatility)`.
  pub fn performance(&self, weights: &[f64]) -> (f64, f64) {
    (self.expected_return(weights), self.volatility(weights))
  }

  /// Sharpe ratio at `weights`. Fails instead of producing an infinite or NaN ratio.
  pub fn sharpe(&self, weights: &[f64], risk_free_rate: f64) -> Result<f64> {
    let (ret, vol) = self.performance(weights);
    sharpe_ratio(ret, vol, risk_free_rate)
  }
}

/// `(ret - risk_free_rate) / vol`, rejecting zero or non-finite volatility.
pub fn sharpe_ratio(ret: f64, vol: f64, risk_free_rate: f64) -> Result<f64> {
  if !vol.is_finite() || vol <= MIN_VOLATILITY {
    return Err(PortfolioError::DegenerateVolatility);
  }

  let sharpe = (ret - risk_free_rate) / vol;
  if sharpe.is_finite() {
    Ok(sharpe)
  } else {
    Err(PortfolioError::DegenerateVolatility)
  }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
