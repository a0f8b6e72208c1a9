//! # Report Rendering
//!
//! $$
//! (\mathbf{w}, \text{shares}, \text{leftover}, \text{metrics})
//! \mapsto \text{tables and charts}
//! $$
//!
//! Presentation collaborator: prettytable tables and plotly bar charts
//! over the pipeline's outputs, plus the user-facing warning strings the
//! error policy requires.

use std::collections::BTreeMap;

use plotly::Bar;
use plotly::Layout;
use plotly::Plot;
use prettytable::row;
use prettytable::Table;

use crate::catalog::AssetCatalog;
use crate::market::AssetWarning;
use crate::portfolio::DiscreteAllocation;
use crate::portfolio::PortfolioMetrics;
use crate::portfolio::WeightVector;

/// Standing note printed alongside every report.
pub const DISCLAIMER: &str = "Allocations are computed from historical data to maximize \
                              risk-adjusted return; markets remain subject to risk.";

/// Purchase breakdown table: display name, shares, latest price, value.
pub fn allocation_table(
  allocation: &DiscreteAllocation,
  latest_prices: &BTreeMap<String, f64>,
  catalog: &AssetCatalog,
) -> Table {
  let mut table = Table::new();
  table.add_row(row!["Asset", "Shares", "Latest Price", "Total Value"]);

  for (ticker, &count) in &allocation.shares {
    let price = latest_prices[ticker];
    table.add_row(row![
      catalog.display_name(ticker),
      count,
      format!("{price:.2}"),
      format!("{:.2}", count as f64 * price)
    ]);
  }

  table
}

/// Cleaned weights table, nonzero entries only.
pub fn weights_table(weights: &WeightVector, catalog: &AssetCatalog) -> Table {
  let mut table = Table::new();
  table.add_row(row!["Asset", "Weight (%)"]);

  for (ticker, weight) in weights.non_zero() {
    table.add_row(row![
      catalog.display_name(ticker),
      format!("{:.2}", weight * 100.0)
    ]);
  }

  table
}

/// Portfolio metrics table, in percent.
pub fn metrics_table(metrics: &PortfolioMetrics) -> Table {
  let mut table = Table::new();
  table.add_row(row!["Metric", "Value (%)"]);
  table.add_row(row![
    "Expected Annual Return",
    format!("{:.2}", metrics.expected_return * 100.0)
  ]);
  table.add_row(row![
    "Annual Volatility",
    format!("{:.2}", metrics.volatility * 100.0)
  ]);
  table.add_row(row![
    "Annual Variance",
    format!("{:.2}", metrics.variance * 100.0)
  ]);

  table
}

/// Bar chart of allocated value per asset.
pub fn allocation_chart(
  allocation: &DiscreteAllocation,
  latest_prices: &BTreeMap<String, f64>,
  catalog: &AssetCatalog,
) -> Plot {
  let names: Vec<String> = allocation
    .shares
    .keys()
    .map(|ticker| catalog.display_name(ticker).to_string())
    .collect();
  let values: Vec<f64> = allocation
    .shares
    .iter()
    .map(|(ticker, &count)| count as f64 * latest_prices[ticker])
    .collect();

  let mut plot = Plot::new();
  plot.add_trace(Bar::new(names, values).name("Allocated Value"));
  plot.set_layout(Layout::new().title("Suggested Allocation"));
  plot
}

/// Bar chart of the portfolio metrics, in percent.
pub fn metrics_chart(metrics: &PortfolioMetrics) -> Plot {
  let names = vec![
    "Expected Annual Return".to_string(),
    "Annual Volatility".to_string(),
    "Annual Variance".to_string(),
  ];
  let values = vec![
    metrics.expected_return * 100.0,
    metrics.volatility * 100.0,
    metrics.variance * 100.0,
  ];

  let mut plot = Plot::new();
  plot.add_trace(Bar::new(names, values).name("Metrics (%)"));
  plot.set_layout(Layout::new().title("Portfolio Metrics"));
  plot
}

/// Unspent-cash line for the report footer.
pub fn leftover_message(leftover: f64) -> String {
  format!("Remaining cash: {leftover:.2}")
}

/// Warning shown when the budget bought no share of any asset.
pub fn degenerate_message(budget: f64) -> String {
  format!(
    "Budget {budget:.2} is below the price of every selected asset; \
     nothing was allocated. Increase the budget or change the selection."
  )
}

/// One user-facing line per excluded asset.
pub fn exclusion_messages(warnings: &[AssetWarning]) -> Vec<String> {
  warnings.iter().map(|w| format!("Warning: {w}")).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::portfolio::allocate_discrete;

  fn fixture() -> (DiscreteAllocation, BTreeMap<String, f64>, AssetCatalog) {
    let weights =
      WeightVector::from_pairs(vec![("INFY.NS", 0.5), ("TCS.NS", 0.5)]).unwrap();
    let prices: BTreeMap<String, f64> = [
      ("INFY.NS".to_string(), 50.0),
      ("TCS.NS".to_string(), 100.0),
    ]
    .into();
    let allocation = allocate_discrete(&weights, &prices, 1000.0).unwrap();
    let catalog = AssetCatalog::from_pairs(vec![
      ("Infosys", "INFY.NS"),
      ("Tata Consultancy Services", "TCS.NS"),
    ]);
    (allocation, prices, catalog)
  }

  #[test]
  fn allocation_table_uses_display_names() {
    let (allocation, prices, catalog) = fixture();
    let rendered = allocation_table(&allocation, &prices, &catalog).to_string();

    assert!(rendered.contains("Infosys"));
    assert!(rendered.contains("Tata Consultancy Services"));
    assert!(rendered.contains("500.00"));
  }

  #[test]
  fn metrics_table_is_in_percent() {
    let metrics = PortfolioMetrics {
      expected_return: 0.15,
      volatility: 0.2,
      variance: 0.04,
    };
    let rendered = metrics_table(&metrics).to_string();

    assert!(rendered.contains("15.00"));
    assert!(rendered.contains("20.00"));
    assert!(rendered.contains("4.00"));
  }

  #[test]
  fn charts_build_from_pipeline_outputs() {
    let (allocation, prices, catalog) = fixture();
    let _ = allocation_chart(&allocation, &prices, &catalog);
    let _ = metrics_chart(&PortfolioMetrics::default());
  }

  #[test]
  fn degenerate_and_exclusion_messages_name_the_cause() {
    assert!(degenerate_message(25.0).contains("25.00"));

    let warnings = vec![AssetWarning {
      ticker: "WIPRO.NS".to_string(),
      reason: "no usable observations".to_string(),
    }];
    let messages = exclusion_messages(&warnings);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("WIPRO.NS"));
  }
}
