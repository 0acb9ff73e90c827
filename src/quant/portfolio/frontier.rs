//! # Efficient Frontier Sampling
//!
//! $$
//! w_i = \frac{u_i}{\sum_j u_j},\qquad u_i \sim \mathcal U[0,1)\ \text{or}\ \operatorname{Exp}(1)
//! $$
//!
//! Random long-only, fully-invested portfolios scattered in the
//! return/volatility plane. The cloud approximates the attainable region; its
//! upper-left edge approximates the efficient frontier.

use rand::Rng;
use rand_distr::Exp1;

use super::data::MarketInputs;
use super::error::PortfolioError;
use super::error::Result;
use super::performance::PerformanceEvaluator;
use super::types::FrontierPoint;

/// Risk-free rate used for the Sharpe ratio of sampled portfolios,
/// independent of the rate used for the optimum.
pub const FRONTIER_RISK_FREE_RATE: f64 = 0.02;

/// How random weight vectors are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontierSampling {
  /// Uniform `[0, 1)` draws normalized by their sum. Concentrates around
  /// equal weights as the number of assets grows.
  #[default]
  NormalizedUniform,
  /// Flat Dirichlet (normalized `Exp(1)` draws), uniform on the simplex.
  Dirichlet,
}

impl FrontierSampling {
  /// One weight vector on the simplex.
  pub fn draw<R: Rng + ?Sized>(&self, num_assets: usize, rng: &mut R) -> Vec<f64> {
    if num_assets == 0 {
      return Vec::new();
    }

    loop {
      let raw: Vec<f64> = match self {
        FrontierSampling::NormalizedUniform => (0..num_assets).map(|_| rng.gen::<f64>()).collect(),
        FrontierSampling::Dirichlet => (0..num_assets).map(|_| rng.sample::<f64, _>(Exp1)).collect(),
      };

      let total: f64 = raw.iter().sum();
      if total > 0.0 {
        return raw.iter().map(|u| u / total).collect();
      }
    }
  }
}

/// Sample `num_portfolios` random portfolios and evaluate each at
/// [`FRONTIER_RISK_FREE_RATE`]. Zero portfolios give an empty vector.
pub fn sample_frontier<R: Rng + ?Sized>(
  inputs: &MarketInputs,
  num_portfolios: usize,
  sampling: FrontierSampling,
  periods_per_year: f64,
  rng: &mut R,
) -> Result<Vec<FrontierPoint>> {
  let n = inputs.num_assets();
  if n == 0 {
    return Err(PortfolioError::NoDataAvailable);
  }

  let evaluator = PerformanceEvaluator::new(inputs, periods_per_year);
  let mut points = Vec::with_capacity(num_portfolios);
  for _ in 0..num_portfolios {
    let weights = sampling.draw(n, rng);
    let (expected_return, volatility) = evaluator.performance(&weights);
    let sharpe = evaluator.sharpe(&weights, FRONTIER_RISK_FREE_RATE)?;

    points.push(FrontierPoint {
      weights,
      expected_return,
      volatility,
      sharpe,
    });
  }

  Ok(points)
}
