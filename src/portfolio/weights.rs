//! # Weight Cleaning
//!
//! $$
//! w \mapsto \operatorname{renorm}\bigl(\operatorname{cut}_\varepsilon(\operatorname{round}_p(w))\bigr)
//! $$
//!
//! Deterministic post-processing of raw solver weights. Renormalization
//! runs as largest-remainder apportionment in integer weight units, so a
//! second application is a bitwise no-op.

use std::cmp::Reverse;

use crate::error::PortfolioError;

/// Long-only weight mapping, ordered by ascending ticker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightVector {
  entries: Vec<(String, f64)>,
}

impl WeightVector {
  /// Build from `(ticker, weight)` pairs.
  ///
  /// Fails with [`PortfolioError::Data`] on duplicate tickers or
  /// non-finite weights.
  pub fn from_pairs<I, S>(pairs: I) -> Result<Self, PortfolioError>
  where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
  {
    let mut entries: Vec<(String, f64)> = pairs
      .into_iter()
      .map(|(ticker, weight)| (ticker.into(), weight))
      .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if entries.windows(2).any(|w| w[0].0 == w[1].0) {
      return Err(PortfolioError::data("duplicate ticker in weight vector"));
    }
    if entries.iter().any(|(_, w)| !w.is_finite()) {
      return Err(PortfolioError::data("non-finite weight"));
    }

    Ok(Self { entries })
  }

  /// Weight for a ticker, if present.
  pub fn get(&self, ticker: &str) -> Option<f64> {
    self
      .entries
      .binary_search_by(|(t, _)| t.as_str().cmp(ticker))
      .ok()
      .map(|idx| self.entries[idx].1)
  }

  /// Ordered `(ticker, weight)` view.
  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.entries.iter().map(|(t, w)| (t.as_str(), *w))
  }

  /// Weights in ticker order.
  pub fn weights(&self) -> Vec<f64> {
    self.entries.iter().map(|(_, w)| *w).collect()
  }

  /// Tickers in ascending order.
  pub fn tickers(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(t, _)| t.as_str())
  }

  /// Sum of all weights.
  pub fn sum(&self) -> f64 {
    self.entries.iter().map(|(_, w)| w).sum()
  }

  /// Number of entries.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// True when no entries are present.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Entries carrying nonzero weight.
  pub fn non_zero(&self) -> impl Iterator<Item = (&str, f64)> {
    self.iter().filter(|(_, w)| *w > 0.0)
  }
}

/// Round, cut off, and renormalize a weight vector.
///
/// 1. Round each weight to `precision` decimals.
/// 2. Zero entries below `cutoff`.
/// 3. Apportion the full weight mass over the survivors by largest
///    remainder in units of `10^-precision`, ties broken by ascending
///    ticker.
///
/// The output sums to exactly one weight unit mass, and the transform
/// is idempotent. An input whose entries all fall below the cutoff
/// comes back all-zero; callers treat that as a degenerate weighting.
pub fn clean_weights(weights: &WeightVector, precision: u32, cutoff: f64) -> WeightVector {
  let scale = 10u64.pow(precision.min(12));
  let scale_f = scale as f64;

  let mut units: Vec<(String, u64)> = weights
    .iter()
    .map(|(ticker, weight)| {
      let rounded = (weight * scale_f).round() / scale_f;
      let unit = if rounded < cutoff {
        0
      } else {
        (rounded * scale_f).round() as u64
      };
      (ticker.to_string(), unit)
    })
    .collect();

  let total: u64 = units.iter().map(|(_, u)| u).sum();
  if total == 0 {
    return WeightVector {
      entries: units
        .into_iter()
        .map(|(ticker, _)| (ticker, 0.0))
        .collect(),
    };
  }

  if total != scale {
    // Integer largest-remainder apportionment of `scale` units.
    let shares: Vec<(u64, u64)> = units
      .iter()
      .map(|(_, u)| (u * scale / total, (u * scale) % total))
      .collect();
    let assigned: u64 = shares.iter().map(|(base, _)| base).sum();
    let residual = scale - assigned;

    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by_key(|&i| (Reverse(shares[i].1), i));

    for (rank, &i) in order.iter().enumerate() {
      units[i].1 = shares[i].0 + u64::from((rank as u64) < residual);
    }
  }

  WeightVector {
    entries: units
      .into_iter()
      .map(|(ticker, unit)| (ticker, unit as f64 / scale_f))
      .collect(),
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn vector(pairs: &[(&str, f64)]) -> WeightVector {
    WeightVector::from_pairs(pairs.iter().map(|&(t, w)| (t, w))).unwrap()
  }

  #[test]
  fn cleaning_is_idempotent() {
    let raw = vector(&[
      ("A", 0.333333),
      ("B", 0.333333),
      ("C", 0.333334),
      ("D", 0.00003),
    ]);

    let once = clean_weights(&raw, 4, 1e-4);
    let twice = clean_weights(&once, 4, 1e-4);
    assert_eq!(once, twice);
  }

  #[test]
  fn tiny_weights_are_cut_and_mass_redistributed() {
    let raw = vector(&[("A", 0.69995), ("B", 0.30002), ("C", 0.00003)]);
    let clean = clean_weights(&raw, 4, 1e-4);

    assert_eq!(clean.get("C"), Some(0.0));
    assert_abs_diff_eq!(clean.sum(), 1.0, epsilon = 1e-9);
  }

  #[test]
  fn solver_noise_is_removed() {
    let raw = vector(&[("A", 0.999999), ("B", 1.3e-7)]);
    let clean = clean_weights(&raw, 4, 1e-4);

    assert_eq!(clean.get("A"), Some(1.0));
    assert_eq!(clean.get("B"), Some(0.0));
  }

  #[test]
  fn renormalization_ties_break_by_ascending_ticker() {
    // Two equal survivors with an odd unit count: the extra unit must
    // land on the lexicographically smaller ticker.
    let raw = vector(&[("A", 0.3333), ("B", 0.3333), ("C", 0.3333)]);
    let clean = clean_weights(&raw, 4, 1e-4);

    assert_abs_diff_eq!(clean.sum(), 1.0, epsilon = 1e-9);
    assert!(clean.get("A").unwrap() >= clean.get("C").unwrap());
  }

  #[test]
  fn all_below_cutoff_comes_back_zeroed() {
    let raw = vector(&[("A", 0.00001), ("B", 0.00002)]);
    let clean = clean_weights(&raw, 4, 1e-4);

    assert_eq!(clean.sum(), 0.0);
    assert_eq!(clean.len(), 2);
  }

  #[test]
  fn duplicate_tickers_are_rejected() {
    let err = WeightVector::from_pairs(vec![("A", 0.5), ("A", 0.5)]).unwrap_err();
    assert!(matches!(err, PortfolioError::Data { .. }));
  }
}
