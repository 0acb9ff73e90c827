//! # stock-analyzer
//!
//! Long-only maximum-Sharpe portfolios and sampled efficient frontiers from
//! historical daily closes.
//!
//! - [`quant::market`]: price history sources.
//! - [`quant::portfolio`]: input preparation, optimizer and frontier sampler.
//! - [`visualization`]: frontier charts.

pub mod quant;
pub mod visualization;

pub use quant::market::InMemoryMarketData;
pub use quant::market::MarketDataSource;
pub use quant::market::PricePoint;
pub use quant::portfolio::OptimizerConfig;
pub use quant::portfolio::PortfolioError;
pub use quant::portfolio::PortfolioOptimizer;
