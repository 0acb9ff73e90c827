//! # Visualization
//!
//! $$
//! \{(\sigma_k,\mu_k)\}_{k=1}^{m}\cup\{(\sigma^\*,\mu^\*)\}\mapsto \text{risk/return scatter}
//! $$
//!
use plotly::Layout;
use plotly::Plot;
use plotly::Scatter;
use plotly::color::NamedColor;
use plotly::common::Marker;
use plotly::common::MarkerSymbol;
use plotly::common::Mode;
use plotly::common::Title;
use plotly::layout::Axis;

use crate::quant::portfolio::PortfolioAnalysis;

/// Builder for the frontier chart of one [`PortfolioAnalysis`].
pub struct FrontierPlotter {
  title: String,
  marker_size: usize,
  optimum_size: usize,
  show_legend: bool,
}

impl Default for FrontierPlotter {
  fn default() -> Self {
    Self::new()
  }
}

impl FrontierPlotter {
  pub fn new() -> Self {
    Self {
      title: "Efficient frontier".to_string(),
      marker_size: 6,
      optimum_size: 16,
      show_legend: true,
    }
  }

  pub fn title(mut self, title: &str) -> Self {
    self.title = title.into();
    self
  }

  pub fn marker_size(mut self, size: usize) -> Self {
    self.marker_size = size.max(1);
    self
  }

  pub fn optimum_size(mut self, size: usize) -> Self {
    self.optimum_size = size.max(1);
    self
  }

  pub fn show_legend(mut self, show: bool) -> Self {
    self.show_legend = show;
    self
  }

  /// Frontier samples as markers (x = volatility %, y = return %) with the
  /// maximum-Sharpe portfolio highlighted on top.
  pub fn plot(&self, analysis: &PortfolioAnalysis) -> Plot {
    let samples = &analysis.efficient_frontier;
    let x: Vec<f64> = samples.iter().map(|s| s.volatility).collect();
    let y: Vec<f64> = samples.iter().map(|s| s.expected_return).collect();
    let hover_text: Vec<String> = samples
      .iter()
      .map(|s| {
        format!(
          "return: {:.2}%<br>volatility: {:.2}%<br>sharpe: {:.2}",
          s.expected_return, s.volatility, s.sharpe
        )
      })
      .collect();

    let frontier = Scatter::new(x, y)
      .mode(Mode::Markers)
      .name("Random portfolios")
      .marker(Marker::new().size(self.marker_size).color(NamedColor::SteelBlue))
      .hover_text_array(hover_text)
      .hover_template("%{hovertext}<extra></extra>")
      .show_legend(self.show_legend);

    let optimum = &analysis.optimal_portfolio;
    let allocation = optimum
      .allocations
      .iter()
      .map(|a| format!("{}: {:.2}%", a.symbol, a.percent))
      .collect::<Vec<String>>()
      .join("<br>");
    let optimal = Scatter::new(vec![optimum.volatility], vec![optimum.expected_return])
      .mode(Mode::Markers)
      .name("Max Sharpe")
      .marker(
        Marker::new()
          .size(self.optimum_size)
          .symbol(MarkerSymbol::Star)
          .color(NamedColor::Crimson),
      )
      .hover_text_array(vec![format!(
        "sharpe: {:.2}<br>{}",
        optimum.sharpe_ratio, allocation
      )])
      .hover_template("%{hovertext}<extra></extra>")
      .show_legend(self.show_legend);

    let mut plot = Plot::new();
    plot.set_layout(
      Layout::new()
        .title(self.title.as_str())
        .auto_size(true)
        .x_axis(Axis::new().title(Title::from("Volatility (%)")))
        .y_axis(Axis::new().title(Title::from("Expected return (%)"))),
    );
    plot.add_trace(frontier);
    plot.add_trace(optimal);

    plot
  }

  pub fn show(&self, analysis: &PortfolioAnalysis) {
    self.plot(analysis).show();
  }
}

/// Frontier chart with default styling.
pub fn frontier_plot(analysis: &PortfolioAnalysis) -> Plot {
  FrontierPlotter::new().plot(analysis)
}
