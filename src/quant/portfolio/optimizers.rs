//! # Portfolio Optimizers
//!
//! $$
//! \max_{\mathbf{w}\in\Delta}\ S(\mathbf{w})=\frac{P\,\bar{\mathbf r}^\top\mathbf{w}-r_f}{\sqrt{P\,\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! Long-only, fully-invested maximum-Sharpe allocation.

use argmin::core::CostFunction;
use argmin::core::Error;
use argmin::core::Gradient;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use tracing::info;
use tracing::warn;

use super::data::MarketInputs;
use super::error::PortfolioError;
use super::error::Result;
use super::performance::MIN_VOLATILITY;
use super::performance::PerformanceEvaluator;
use super::solver::SolverConfig;
use super::solver::minimize_on_simplex;
use super::types::PortfolioResult;

/// Negative Sharpe ratio as an argmin problem over raw weight vectors.
#[derive(Clone, Debug)]
pub struct NegativeSharpe {
  evaluator: PerformanceEvaluator,
  risk_free_rate: f64,
}

impl NegativeSharpe {
  pub fn new(evaluator: PerformanceEvaluator, risk_free_rate: f64) -> Self {
    Self {
      evaluator,
      risk_free_rate,
    }
  }

  pub fn evaluator(&self) -> &PerformanceEvaluator {
    &self.evaluator
  }
}

impl CostFunction for NegativeSharpe {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, w: &Self::Param) -> std::result::Result<Self::Output, Error> {
    Ok(-self.evaluator.sharpe(w, self.risk_free_rate)?)
  }
}

impl Gradient for NegativeSharpe {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  /// `-(P mean / V - (R - r_f) P Σw / V^3)`
  fn gradient(&self, w: &Self::Param) -> std::result::Result<Self::Gradient, Error> {
    let p = self.evaluator.periods_per_year();
    let (ret, vol) = self.evaluator.performance(w);
    if !vol.is_finite() || vol <= MIN_VOLATILITY {
      return Err(PortfolioError::DegenerateVolatility.into());
    }

    let excess = ret - self.risk_free_rate;
    let vol3 = vol * vol * vol;
    let grad = self
      .evaluator
      .mean_returns()
      .iter()
      .zip(self.evaluator.covariance_times(w))
      .map(|(m, cw)| -(p * m / vol - excess * p * cw / vol3))
      .collect();

    Ok(grad)
  }
}

/// Maximum-Sharpe weights for `inputs` at `risk_free_rate`.
///
/// Starts from equal weights, so identical inputs always give bit-identical
/// results. A solver that stops before convergence fails the call; no
/// best-effort point is returned. An asset with no variance that beats the
/// risk-free rate makes the ratio unbounded and is rejected up front.
pub fn optimize_max_sharpe(
  inputs: &MarketInputs,
  risk_free_rate: f64,
  periods_per_year: f64,
  duplicate_tolerance: f64,
  solver: &SolverConfig,
) -> Result<PortfolioResult> {
  if !risk_free_rate.is_finite() {
    return Err(PortfolioError::InvalidParameter(format!(
      "risk-free rate must be finite, got {risk_free_rate}"
    )));
  }
  if !(periods_per_year.is_finite() && periods_per_year > 0.0) {
    return Err(PortfolioError::InvalidParameter(format!(
      "periods per year must be positive, got {periods_per_year}"
    )));
  }

  inputs.check_distinct_assets(duplicate_tolerance)?;
  inputs.check_riskless_dominance(risk_free_rate, periods_per_year, duplicate_tolerance)?;

  let n = inputs.num_assets();
  let evaluator = PerformanceEvaluator::new(inputs, periods_per_year);
  let x0 = vec![1.0 / n as f64; n];
  evaluator.sharpe(&x0, risk_free_rate)?;

  let problem = NegativeSharpe::new(evaluator, risk_free_rate);
  let res = minimize_on_simplex(problem.clone(), x0, solver).map_err(|err| match err.downcast::<PortfolioError>() {
    Ok(portfolio_err) => portfolio_err,
    Err(err) => PortfolioError::OptimizationFailed {
      iterations: 0,
      reason: err.to_string(),
    },
  })?;

  let iterations = res.state.get_iter();
  let status = res.state.get_termination_status();
  if status != &TerminationStatus::Terminated(TerminationReason::SolverConverged) {
    warn!(
      iterations,
      stationarity = res.solver.stationarity(),
      reason = %status,
      "max-sharpe solver did not converge"
    );
    return Err(PortfolioError::OptimizationFailed {
      iterations,
      reason: status.to_string(),
    });
  }

  let Some(param) = res.state.get_param() else {
    return Err(PortfolioError::OptimizationFailed {
      iterations,
      reason: "solver returned no weights".to_string(),
    });
  };

  // round-off only, iterates are already feasible
  let clamped: Vec<f64> = param.iter().map(|w| w.clamp(0.0, 1.0)).collect();
  let total: f64 = clamped.iter().sum();
  let weights: Vec<f64> = clamped.iter().map(|w| w / total).collect();

  let evaluator = problem.evaluator();
  let (expected_return, volatility) = evaluator.performance(&weights);
  let sharpe = evaluator.sharpe(&weights, risk_free_rate)?;

  info!(
    assets = n,
    iterations,
    sharpe,
    "max-sharpe portfolio found"
  );

  Ok(PortfolioResult {
    symbols: inputs.symbols().to_vec(),
    weights,
    expected_return,
    volatility,
    sharpe,
  })
}
