//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Maximum-Sharpe allocation and random frontier sampling over historical
//! daily closes.

pub mod data;
pub mod engine;
pub mod error;
pub mod frontier;
pub mod optimizers;
pub mod performance;
pub mod solver;
pub mod types;

pub use data::MarketInputs;
pub use data::align_price_series;
pub use data::sample_covariance;
pub use data::simple_returns;
pub use engine::OptimizerConfig;
pub use engine::PortfolioOptimizer;
pub use error::PortfolioError;
pub use frontier::FRONTIER_RISK_FREE_RATE;
pub use frontier::FrontierSampling;
pub use frontier::sample_frontier;
pub use optimizers::NegativeSharpe;
pub use optimizers::optimize_max_sharpe;
pub use performance::PerformanceEvaluator;
pub use performance::TRADING_DAYS_PER_YEAR;
pub use solver::ProjectedGradient;
pub use solver::SolverConfig;
pub use solver::minimize_on_simplex;
pub use types::FrontierPoint;
pub use types::FrontierSample;
pub use types::PortfolioAnalysis;
pub use types::PortfolioReport;
pub use types::PortfolioResult;
