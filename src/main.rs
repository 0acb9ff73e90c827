use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use prettytable::Table;
use prettytable::row;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use stock_analyzer::quant::market::InMemoryMarketData;
use stock_analyzer::quant::market::MarketDataSource;
use stock_analyzer::quant::portfolio::OptimizerConfig;
use stock_analyzer::quant::portfolio::PortfolioAnalysis;
use stock_analyzer::quant::portfolio::PortfolioOptimizer;
use stock_analyzer::visualization::FrontierPlotter;

/// Maximum-Sharpe allocation and efficient frontier for a basket of stocks
#[derive(Parser, Debug)]
#[command(name = "stock-analyzer")]
#[command(version, about, long_about = None)]
struct Args {
  /// Ticker symbols
  #[arg(default_values_t = ["AAPL".to_string(), "MSFT".to_string(), "GOOGL".to_string(), "AMZN".to_string()])]
  symbols: Vec<String>,

  /// Lookback period (1mo, 3mo, 6mo, 1y, 2y, 5y)
  #[arg(short, long, default_value = "1y")]
  period: String,

  /// Annual risk-free rate
  #[arg(short, long, default_value_t = 0.02)]
  risk_free_rate: f64,

  /// Number of random frontier portfolios
  #[arg(short = 'n', long, default_value_t = 100)]
  portfolios: usize,

  /// Seed for synthetic prices and frontier sampling
  #[arg(short, long)]
  seed: Option<u64>,

  /// Fetch prices from Yahoo Finance instead of simulating them
  #[cfg(feature = "yahoo")]
  #[arg(long)]
  yahoo: bool,

  /// Write the frontier chart to this HTML file
  #[arg(long)]
  html: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> Result<()> {
  let args = Args::parse();

  let filter = if args.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt().with_env_filter(filter).init();

  let config = OptimizerConfig {
    num_portfolios: args.portfolios,
    period: args.period.clone(),
    risk_free_rate: args.risk_free_rate,
    seed: args.seed,
    ..OptimizerConfig::default()
  };

  #[cfg(feature = "yahoo")]
  if args.yahoo {
    let source = stock_analyzer::quant::yahoo::YahooMarketData::new()?;
    return run(source, config, &args);
  }

  let source = simulated_market(&args.symbols, args.seed.unwrap_or(42))?;
  run(source, config, &args)
}

fn run<S: MarketDataSource>(source: S, config: OptimizerConfig, args: &Args) -> Result<()> {
  let optimizer = PortfolioOptimizer::new(source, config);
  let analysis = optimizer.analyze(args.symbols.as_slice(), &args.period, args.risk_free_rate)?;

  print_analysis(&analysis);

  if let Some(path) = &args.html {
    FrontierPlotter::new()
      .title(&format!("Efficient frontier ({})", args.period))
      .plot(&analysis)
      .write_html(path);
    println!("Frontier chart written to {}", path.display());
  }

  Ok(())
}

fn print_analysis(analysis: &PortfolioAnalysis) {
  let optimum = &analysis.optimal_portfolio;

  let mut allocations = Table::new();
  allocations.add_row(row!["Symbol", "Allocation (%)"]);
  for a in &optimum.allocations {
    allocations.add_row(row![a.symbol, format!("{:.2}", a.percent)]);
  }
  allocations.printstd();

  let mut summary = Table::new();
  summary.add_row(row!["Expected return (%)", "Volatility (%)", "Sharpe ratio"]);
  summary.add_row(row![
    format!("{:.2}", optimum.expected_return),
    format!("{:.2}", optimum.volatility),
    format!("{:.2}", optimum.sharpe_ratio)
  ]);
  summary.printstd();

  let best = analysis
    .efficient_frontier
    .iter()
    .max_by(|a, b| a.sharpe.total_cmp(&b.sharpe));
  if let Some(best) = best {
    println!(
      "{} random portfolios, best sampled Sharpe {:.2} at {:.2}% volatility",
      analysis.efficient_frontier.len(),
      best.sharpe,
      best.volatility
    );
  }
}

/// One year of geometric Brownian motion closes per symbol.
fn simulated_market(symbols: &[String], seed: u64) -> Result<InMemoryMarketData> {
  let mut rng = StdRng::seed_from_u64(seed);
  let drift = Normal::new(0.0006, 0.0004)?;
  let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default();
  let mut market = InMemoryMarketData::new();

  for (i, symbol) in symbols.iter().enumerate() {
    let mu = drift.sample(&mut rng);
    let sigma = 0.01 + 0.004 * (i % 4) as f64;
    let shocks = Normal::new(mu - 0.5 * sigma * sigma, sigma)?;

    let mut close = 100.0;
    let mut closes = Vec::with_capacity(253);
    closes.push(close);
    for _ in 0..252 {
      close *= f64::exp(shocks.sample(&mut rng));
      closes.push(close);
    }
    market = market.with_closes(symbol.clone(), start, &closes);
  }

  Ok(market)
}
