//! # Portfolio Errors
//!
//! Terminal failure kinds of one optimization request. None of them is
//! retried internally.

use thiserror::Error;

/// Errors surfaced by data preparation, the optimizer and the frontier sampler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
  /// Fewer usable symbols than the optimizer needs.
  #[error("insufficient symbols: {found} usable, at least {required} required")]
  InsufficientSymbols { found: usize, required: usize },

  /// Every requested symbol came back with an empty history.
  #[error("no price data available for any requested symbol")]
  NoDataAvailable,

  /// Not enough aligned dates to estimate a sample covariance.
  #[error("insufficient history: {observations} aligned return observations, at least 2 required")]
  InsufficientHistory { observations: usize },

  /// Portfolio variance is zero, not finite, or the inputs contain duplicate series.
  #[error("degenerate portfolio volatility")]
  DegenerateVolatility,

  /// The constrained solver did not converge within its budget.
  #[error("optimization failed after {iterations} iterations: {reason}")]
  OptimizationFailed { iterations: u64, reason: String },

  /// A caller-supplied parameter is out of its domain.
  #[error("invalid parameter: {0}")]
  InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, PortfolioError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn messages_carry_context() {
    let err = PortfolioError::InsufficientSymbols {
      found: 1,
      required: 2,
    };
    assert_eq!(
      err.to_string(),
      "insufficient symbols: 1 usable, at least 2 required"
    );

    let err = PortfolioError::OptimizationFailed {
      iterations: 1000,
      reason: "max iterations reached".into(),
    };
    assert!(err.to_string().contains("1000 iterations"));
  }

  #[test]
  fn converts_into_anyhow() {
    let err: anyhow::Error = PortfolioError::NoDataAvailable.into();
    assert!(err.downcast_ref::<PortfolioError>().is_some());
  }
}
