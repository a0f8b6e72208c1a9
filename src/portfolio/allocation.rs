//! # Discrete Allocation
//!
//! $$
//! \text{shares} = \operatorname{greedy}\bigl(\lfloor w_i B / p_i \rfloor\bigr),
//! \qquad \textstyle\sum_i \text{shares}_i\, p_i + \text{leftover} = B
//! $$
//!
//! Conversion of target weights into whole-share counts within a cash
//! budget: a floor pass on per-asset dollar targets, then one share at a
//! time to the affordable asset furthest below target relative to its
//! price. A heuristic in the largest-remainder family, not a proven
//! integer optimum.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use super::weights::WeightVector;
use crate::error::PortfolioError;

/// Whole-share purchase list plus unspent cash.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscreteAllocation {
  /// Share count per purchased asset; assets with zero shares are omitted.
  pub shares: BTreeMap<String, u64>,
  /// Budget remaining after all purchases.
  pub leftover: f64,
  degenerate: bool,
}

impl DiscreteAllocation {
  /// True when the budget bought no share of any weighted asset.
  ///
  /// Not an error; callers must surface it as a warning.
  pub fn is_degenerate(&self) -> bool {
    self.degenerate
  }

  /// Total cash spent on shares.
  pub fn spent(&self, latest_prices: &BTreeMap<String, f64>) -> f64 {
    self
      .shares
      .iter()
      .map(|(ticker, &count)| count as f64 * latest_prices[ticker])
      .sum()
  }
}

/// Allocate whole shares against `budget` following the target weights.
///
/// Fails with [`PortfolioError::Data`] when a nonzero-weight asset has
/// no usable latest price or the budget is not a non-negative finite
/// number. A budget below every weighted asset's price is a degenerate
/// allocation, not an error.
pub fn allocate_discrete(
  weights: &WeightVector,
  latest_prices: &BTreeMap<String, f64>,
  budget: f64,
) -> Result<DiscreteAllocation, PortfolioError> {
  if !budget.is_finite() || budget < 0.0 {
    return Err(PortfolioError::data(format!(
      "budget must be a non-negative finite number, got {budget}"
    )));
  }

  // Ticker-ascending order; ties in the greedy pass resolve to the
  // lowest index and therefore the smallest ticker.
  let mut active: Vec<(&str, f64, f64)> = Vec::new();
  for (ticker, weight) in weights.non_zero() {
    let price = latest_prices
      .get(ticker)
      .copied()
      .ok_or_else(|| PortfolioError::data(format!("no latest price for {ticker}")))?;
    if !price.is_finite() || price <= 0.0 {
      return Err(PortfolioError::data(format!(
        "latest price for {ticker} must be positive, got {price}"
      )));
    }
    active.push((ticker, weight, price));
  }

  let targets: Vec<f64> = active.iter().map(|(_, w, _)| w * budget).collect();
  let mut counts: Vec<u64> = active
    .iter()
    .zip(targets.iter())
    .map(|((_, _, price), target)| (target / price).floor() as u64)
    .collect();

  let spent = |counts: &[u64]| -> f64 {
    counts
      .iter()
      .zip(active.iter())
      .map(|(&count, (_, _, price))| count as f64 * price)
      .sum()
  };

  let mut remaining = budget - spent(&counts);
  loop {
    let next = active
      .iter()
      .enumerate()
      .filter(|(_, (_, _, price))| *price <= remaining)
      .filter_map(|(i, (_, _, price))| {
        let deficit = (targets[i] - counts[i] as f64 * price) / price;
        (deficit > 0.0).then_some((Reverse(OrderedFloat(deficit)), i))
      })
      .min();

    match next {
      Some((_, i)) => {
        counts[i] += 1;
        remaining = budget - spent(&counts);
      }
      None => break,
    }
  }

  let shares: BTreeMap<String, u64> = active
    .iter()
    .zip(counts.iter())
    .filter(|(_, &count)| count > 0)
    .map(|((ticker, _, _), &count)| (ticker.to_string(), count))
    .collect();
  let degenerate = shares.is_empty();

  if degenerate {
    tracing::warn!(budget, "budget below every weighted asset's price");
  }

  Ok(DiscreteAllocation {
    shares,
    leftover: remaining,
    degenerate,
  })
}
