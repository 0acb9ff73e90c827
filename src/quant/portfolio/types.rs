//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Full-precision results of the optimizer and frontier sampler, and the
//! rounded values reported to callers. Rounding only ever happens when a
//! report is built.

use serde::Deserialize;
use serde::Serialize;

/// Output of a portfolio optimization run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PortfolioResult {
  /// Asset universe, in the order of `weights`.
  pub symbols: Vec<String>,
  /// Final portfolio weights.
  pub weights: Vec<f64>,
  /// Annualized expected portfolio return.
  pub expected_return: f64,
  /// Annualized portfolio volatility.
  pub volatility: f64,
  /// Sharpe ratio computed as `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
}

impl PortfolioResult {
  /// Weight of `symbol`, if it is part of the universe.
  pub fn weight(&self, symbol: &str) -> Option<f64> {
    self
      .symbols
      .iter()
      .position(|s| s == symbol)
      .map(|i| self.weights[i])
  }

  /// Rounded caller-facing view.
  pub fn report(&self) -> PortfolioReport {
    let allocations = self
      .symbols
      .iter()
      .cloned()
      .zip(allocation_percentages(&self.weights))
      .map(|(symbol, percent)| Allocation { symbol, percent })
      .collect();

    PortfolioReport {
      allocations,
      expected_return: round2(self.expected_return * 100.0),
      volatility: round2(self.volatility * 100.0),
      sharpe_ratio: round2(self.sharpe),
    }
  }
}

/// One randomly sampled long-only, fully-invested portfolio.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrontierPoint {
  /// Sampled weights, on the simplex.
  pub weights: Vec<f64>,
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe: f64,
}

/// Share of the portfolio held in one symbol, in percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
  pub symbol: String,
  pub percent: f64,
}

/// Maximum-Sharpe portfolio as reported to callers. Return and volatility are
/// percentages; every value is rounded to 2 decimals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
  pub allocations: Vec<Allocation>,
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe_ratio: f64,
}

impl PortfolioReport {
  pub fn allocation(&self, symbol: &str) -> Option<f64> {
    self
      .allocations
      .iter()
      .find(|a| a.symbol == symbol)
      .map(|a| a.percent)
  }

  /// Sum of all reported allocation percentages.
  pub fn total_allocation(&self) -> f64 {
    self.allocations.iter().map(|a| a.percent).sum()
  }
}

/// Frontier point as reported to callers, in percent and rounded to 2 decimals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontierSample {
  #[serde(rename = "return")]
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe: f64,
}

impl From<&FrontierPoint> for FrontierSample {
  fn from(point: &FrontierPoint) -> Self {
    Self {
      expected_return: round2(point.expected_return * 100.0),
      volatility: round2(point.volatility * 100.0),
      sharpe: round2(point.sharpe),
    }
  }
}

/// Optimum plus the sampled frontier of one request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
  pub optimal_portfolio: PortfolioReport,
  pub efficient_frontier: Vec<FrontierSample>,
}

/// Round to 2 decimals, ties to even on the scaled value. Never returns `-0.0`.
pub fn round2(x: f64) -> f64 {
  (x * 100.0).round_ties_even() / 100.0 + 0.0
}

/// Weights as percentages, each rounded to 2 decimals on its own. The
/// rounded entries may miss 100.00 by a few hundredths.
pub fn allocation_percentages(weights: &[f64]) -> Vec<f64> {
  weights.iter().map(|w| round2(w * 100.0)).collect()
}
