//! # Portfolio Engine
//!
//! $$
//! \text{symbols}\xrightarrow{\ \text{fetch}\ }(\bar{\mathbf r},\Sigma)\xrightarrow{\ \text{optimize}\ }\mathbf{w}^\*
//! $$
//!
//! Request-level API: fetch prices, prepare inputs, solve for the
//! maximum-Sharpe portfolio and sample the frontier.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::data::MIN_SYMBOLS;
use super::data::MarketInputs;
use super::error::Result;
use super::frontier::FrontierSampling;
use super::frontier::sample_frontier;
use super::optimizers::optimize_max_sharpe;
use super::performance::TRADING_DAYS_PER_YEAR;
use super::solver::SolverConfig;
use super::types::FrontierPoint;
use super::types::FrontierSample;
use super::types::PortfolioAnalysis;
use super::types::PortfolioReport;
use super::types::PortfolioResult;
use crate::quant::market::MarketDataSource;

/// Runtime configuration for [`PortfolioOptimizer`].
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
  /// Risk-free rate used by [`PortfolioOptimizer::optimize_default`].
  pub risk_free_rate: f64,
  /// Annualization constant for returns and volatility.
  pub periods_per_year: f64,
  /// Frontier size used by [`PortfolioOptimizer::analyze`].
  pub num_portfolios: usize,
  /// Default lookback period token.
  pub period: String,
  /// Minimum number of usable symbols.
  pub min_symbols: usize,
  pub sampling: FrontierSampling,
  /// Seed of the frontier RNG; `None` seeds from entropy.
  pub seed: Option<u64>,
  /// Relative spread variance under which two assets count as duplicates.
  pub duplicate_tolerance: f64,
  pub solver: SolverConfig,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      risk_free_rate: 0.02,
      periods_per_year: TRADING_DAYS_PER_YEAR,
      num_portfolios: 100,
      period: "1y".to_string(),
      min_symbols: MIN_SYMBOLS,
      sampling: FrontierSampling::NormalizedUniform,
      seed: None,
      duplicate_tolerance: 1e-10,
      solver: SolverConfig::default(),
    }
  }
}

/// Max-Sharpe optimizer bound to one market data source.
#[derive(Clone, Debug)]
pub struct PortfolioOptimizer<S: MarketDataSource> {
  source: S,
  config: OptimizerConfig,
}

impl<S: MarketDataSource> PortfolioOptimizer<S> {
  pub fn new(source: S, config: OptimizerConfig) -> Self {
    Self { source, config }
  }

  pub fn config(&self) -> &OptimizerConfig {
    &self.config
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  /// Fetch `symbols` over `period` and prepare the optimizer inputs.
  pub fn prepare<T: AsRef<str>>(&self, symbols: &[T], period: &str) -> Result<MarketInputs> {
    MarketInputs::prepare(&self.source, symbols, period, self.config.min_symbols)
  }

  /// Full-precision maximum-Sharpe portfolio for prepared inputs.
  pub fn max_sharpe(&self, inputs: &MarketInputs, risk_free_rate: f64) -> Result<PortfolioResult> {
    optimize_max_sharpe(
      inputs,
      risk_free_rate,
      self.config.periods_per_year,
      self.config.duplicate_tolerance,
      &self.config.solver,
    )
  }

  /// Fetch, prepare and optimize; returns the rounded report.
  pub fn optimize<T: AsRef<str>>(&self, symbols: &[T], period: &str, risk_free_rate: f64) -> Result<PortfolioReport> {
    let inputs = self.prepare(symbols, period)?;
    Ok(self.max_sharpe(&inputs, risk_free_rate)?.report())
  }

  /// [`PortfolioOptimizer::optimize`] with the configured period and risk-free rate.
  pub fn optimize_default<T: AsRef<str>>(&self, symbols: &[T]) -> Result<PortfolioReport> {
    self.optimize(symbols, &self.config.period, self.config.risk_free_rate)
  }

  /// `num_portfolios` random frontier portfolios, using the configured seed.
  pub fn efficient_frontier(&self, inputs: &MarketInputs, num_portfolios: usize) -> Result<Vec<FrontierPoint>> {
    let mut rng = self.rng();
    self.efficient_frontier_with_rng(inputs, num_portfolios, &mut rng)
  }

  pub fn efficient_frontier_with_rng<R: Rng + ?Sized>(
    &self,
    inputs: &MarketInputs,
    num_portfolios: usize,
    rng: &mut R,
  ) -> Result<Vec<FrontierPoint>> {
    sample_frontier(
      inputs,
      num_portfolios,
      self.config.sampling,
      self.config.periods_per_year,
      rng,
    )
  }

  /// Optimum plus `config.num_portfolios` rounded frontier samples, both from
  /// one fetch.
  pub fn analyze<T: AsRef<str>>(&self, symbols: &[T], period: &str, risk_free_rate: f64) -> Result<PortfolioAnalysis> {
    let inputs = self.prepare(symbols, period)?;
    let optimal = self.max_sharpe(&inputs, risk_free_rate)?;
    let frontier = self.efficient_frontier(&inputs, self.config.num_portfolios)?;

    Ok(PortfolioAnalysis {
      optimal_portfolio: optimal.report(),
      efficient_frontier: frontier.iter().map(FrontierSample::from).collect(),
    })
  }

  fn rng(&self) -> StdRng {
    match self.config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;
  use tracing_test::traced_test;

  use super::*;
  use crate::quant::market::InMemoryMarketData;
  use crate::quant::portfolio::error::PortfolioError;
  use crate::quant::portfolio::optimizers::tests::tangency_weights;
  use crate::quant::portfolio::optimizers::tests::uncorrelated_returns;

  const SYMBOLS: [&str; 3] = ["AAA", "BBB", "CCC"];

  fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
  }

  /// Compounds the synthetic returns into 253 closes per symbol.
  fn synthetic_market() -> InMemoryMarketData {
    let returns = uncorrelated_returns();
    let mut market = InMemoryMarketData::new();

    for (i, symbol) in SYMBOLS.iter().enumerate() {
      let mut closes = vec![100.0];
      for r in returns.column(i) {
        let last = closes[closes.len() - 1];
        closes.push(last * (1.0 + r));
      }
      market = market.with_closes(*symbol, start(), &closes);
    }

    market
  }

  fn optimizer(config: OptimizerConfig) -> PortfolioOptimizer<InMemoryMarketData> {
    PortfolioOptimizer::new(synthetic_market(), config)
  }

  #[test]
  fn allocation_ordering_follows_excess_return_over_variance() {
    let report = optimizer(OptimizerConfig::default())
      .optimize(&SYMBOLS, "1y", 0.02)
      .unwrap();

    let a = report.allocation("AAA").unwrap();
    let b = report.allocation("BBB").unwrap();
    let c = report.allocation("CCC").unwrap();
    assert!(a > c && c > b);

    // prices round-trip the returns up to floating-point error
    for (symbol, expected) in SYMBOLS.iter().zip(tangency_weights(0.02)) {
      assert_abs_diff_eq!(report.allocation(symbol).unwrap(), expected * 100.0, epsilon = 0.05);
    }
  }

  #[test]
  fn allocations_are_percentages_summing_to_one_hundred() {
    let report = optimizer(OptimizerConfig::default())
      .optimize_default(&SYMBOLS)
      .unwrap();

    assert_eq!(report.allocations.len(), 3);
    assert_abs_diff_eq!(report.total_allocation(), 100.0, epsilon = 0.01 + 1e-9);
    assert!(report
      .allocations
      .iter()
      .all(|a| (0.0..=100.0).contains(&a.percent)));
    assert!(report.volatility > 0.0);
  }

  #[test]
  fn optimize_is_idempotent() {
    let opt = optimizer(OptimizerConfig::default());

    let first = opt.optimize(&SYMBOLS, "1y", 0.02).unwrap();
    let second = opt.optimize(&SYMBOLS, "1y", 0.02).unwrap();
    assert_eq!(first, second);
  }

  #[traced_test]
  #[test]
  fn empty_history_narrows_the_universe() {
    let closes: Vec<f64> = (0..10).map(|i| 100.0 + (i * i) as f64).collect();
    let market = InMemoryMarketData::new().with_closes("B", start(), &closes);
    let opt = PortfolioOptimizer::new(market, OptimizerConfig::default());

    let err = opt.optimize(&["A", "B"], "1y", 0.02).unwrap_err();

    assert_eq!(
      err,
      PortfolioError::InsufficientSymbols {
        found: 1,
        required: 2
      }
    );
    assert!(logs_contain("excluding symbol with empty price history"));
  }

  #[test]
  fn unknown_symbols_only_is_no_data() {
    let opt = optimizer(OptimizerConfig::default());
    let err = opt.optimize(&["X", "Y"], "1y", 0.02).unwrap_err();
    assert_eq!(err, PortfolioError::NoDataAvailable);
  }

  #[test]
  fn identical_series_are_degenerate() {
    let closes: Vec<f64> = (0..30).map(|i| 100.0 * (1.0 + 0.01 * ((i % 3) as f64 - 1.0))).collect();
    let market = InMemoryMarketData::new()
      .with_closes("A", start(), &closes)
      .with_closes("B", start(), &closes);
    let opt = PortfolioOptimizer::new(market, OptimizerConfig::default());

    let err = opt.optimize(&["A", "B"], "1y", 0.02).unwrap_err();
    assert_eq!(err, PortfolioError::DegenerateVolatility);
  }

  #[test]
  fn non_finite_risk_free_rate_is_invalid() {
    let err = optimizer(OptimizerConfig::default())
      .optimize(&SYMBOLS, "1y", f64::NAN)
      .unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidParameter(_)));
  }

  #[test]
  fn frontier_has_exactly_k_points_on_the_simplex() {
    let opt = optimizer(OptimizerConfig {
      seed: Some(7),
      ..OptimizerConfig::default()
    });
    let inputs = opt.prepare(&SYMBOLS, "1y").unwrap();

    for k in [0, 5, 250] {
      let points = opt.efficient_frontier(&inputs, k).unwrap();
      assert_eq!(points.len(), k);
      for p in &points {
        assert_abs_diff_eq!(p.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(p.weights.iter().all(|w| (0.0..=1.0).contains(w)));
      }
    }
  }

  #[test]
  fn optimizer_exposes_its_config_and_source() {
    let opt = optimizer(OptimizerConfig {
      num_portfolios: 7,
      ..OptimizerConfig::default()
    });

    assert_eq!(opt.config().num_portfolios, 7);
    assert_eq!(opt.config().period, "1y");
    assert_eq!(opt.source().fetch_history("AAA", "1y").unwrap().len(), 253);
  }

  #[test]
  fn seeded_frontier_is_reproducible() {
    let opt = optimizer(OptimizerConfig {
      seed: Some(2024),
      sampling: FrontierSampling::Dirichlet,
      ..OptimizerConfig::default()
    });
    let inputs = opt.prepare(&SYMBOLS, "1y").unwrap();

    assert_eq!(
      opt.efficient_frontier(&inputs, 20).unwrap(),
      opt.efficient_frontier(&inputs, 20).unwrap()
    );
  }

  #[test]
  fn analysis_combines_optimum_and_frontier() {
    let opt = optimizer(OptimizerConfig {
      num_portfolios: 40,
      seed: Some(1),
      ..OptimizerConfig::default()
    });

    let analysis = opt.analyze(&SYMBOLS, "1y", 0.02).unwrap();
    assert_eq!(analysis.efficient_frontier.len(), 40);
    assert_eq!(
      analysis.optimal_portfolio,
      opt.optimize(&SYMBOLS, "1y", 0.02).unwrap()
    );

    // no sampled portfolio beats the optimum on Sharpe (same rate here)
    let best = analysis.optimal_portfolio.sharpe_ratio;
    assert!(analysis
      .efficient_frontier
      .iter()
      .all(|s| s.sharpe <= best + 0.01));
  }
}
