//! # Market Data Model
//!
//! $$
//! \{(\text{ticker}, (t_k, p_k)_k)\} \mapsto P \in \mathbb{R}^{T \times N}
//! $$
//!
//! Raw per-asset price series, the valid/invalid partition delivered by
//! data collaborators, and the aligned price panel the estimators consume.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use ndarray::Array2;

use crate::error::FetchError;
use crate::error::PortfolioError;

/// Minimum observations required for a non-degenerate return estimate.
pub const MIN_OBSERVATIONS: usize = 2;

/// Unaligned daily closes for a single asset, as delivered by a source.
///
/// May be unsorted, gappy, or carry unusable rows; only [`PriceSeries`]
/// guarantees the invariants the estimators rely on.
#[derive(Clone, Debug, Default)]
pub struct RawPriceSeries {
  /// Asset identifier.
  pub ticker: String,
  /// `(date, adjusted close)` observations.
  pub points: Vec<(NaiveDate, f64)>,
}

impl RawPriceSeries {
  /// Construct from raw observations.
  pub fn new(ticker: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
    Self {
      ticker: ticker.into(),
      points,
    }
  }

  /// Sorted observations with non-finite or non-positive closes dropped
  /// and duplicate dates collapsed to the last seen value.
  fn sanitized(&self) -> Vec<(NaiveDate, f64)> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for &(date, close) in &self.points {
      if close.is_finite() && close > 0.0 {
        by_date.insert(date, close);
      }
    }
    by_date.into_iter().collect()
  }
}

/// Per-asset outcome of a data fetch: a usable series or an explicit failure.
pub type FetchOutcome = Result<RawPriceSeries, FetchError>;

/// Reason an asset was excluded from the estimation set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetWarning {
  /// Excluded ticker.
  pub ticker: String,
  /// Human-readable exclusion reason.
  pub reason: String,
}

impl std::fmt::Display for AssetWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} excluded: {}", self.ticker, self.reason)
  }
}

/// Aligned close-price panel.
///
/// Invariants: tickers are sorted ascending and unique; every asset
/// shares the identical gap-free date index; every close is finite and
/// positive; at least [`MIN_OBSERVATIONS`] rows are present.
#[derive(Clone, Debug)]
pub struct PriceSeries {
  tickers: Vec<String>,
  dates: Vec<NaiveDate>,
  closes: Array2<f64>,
}

impl PriceSeries {
  /// Build an aligned panel from per-asset fetch outcomes.
  ///
  /// Assets with failed fetches, empty or too-short histories are
  /// excluded and reported as warnings; the panel date index is the
  /// intersection of the surviving assets' dates. Fails with
  /// [`PortfolioError::Data`] when no asset survives or the aligned
  /// index is shorter than `min_observations`.
  pub fn from_outcomes(
    outcomes: Vec<FetchOutcome>,
    min_observations: usize,
  ) -> Result<(Self, Vec<AssetWarning>), PortfolioError> {
    let min_observations = min_observations.max(MIN_OBSERVATIONS);
    let mut warnings = Vec::new();
    let mut survivors: Vec<(String, BTreeMap<NaiveDate, f64>)> = Vec::new();

    for outcome in outcomes {
      match outcome {
        Ok(raw) => {
          let points = raw.sanitized();
          if points.is_empty() {
            warnings.push(AssetWarning {
              ticker: raw.ticker.clone(),
              reason: "no usable observations".to_string(),
            });
          } else if points.len() < min_observations {
            warnings.push(AssetWarning {
              ticker: raw.ticker.clone(),
              reason: format!(
                "only {} observations, need at least {}",
                points.len(),
                min_observations
              ),
            });
          } else {
            survivors.push((raw.ticker, points.into_iter().collect()));
          }
        }
        Err(err) => {
          warnings.push(AssetWarning {
            ticker: err.ticker().to_string(),
            reason: err.to_string(),
          });
        }
      }
    }

    for warning in &warnings {
      tracing::warn!(ticker = %warning.ticker, reason = %warning.reason, "asset excluded");
    }

    if survivors.is_empty() {
      return Err(PortfolioError::data("no asset has a usable price history"));
    }

    survivors.sort_by(|a, b| a.0.cmp(&b.0));
    survivors.dedup_by(|a, b| a.0 == b.0);

    let mut common: BTreeSet<NaiveDate> = survivors[0].1.keys().copied().collect();
    for (_, points) in survivors.iter().skip(1) {
      let dates: BTreeSet<NaiveDate> = points.keys().copied().collect();
      common = common.intersection(&dates).copied().collect();
    }

    if common.len() < min_observations {
      return Err(PortfolioError::data(format!(
        "aligned history has {} common dates, need at least {}",
        common.len(),
        min_observations
      )));
    }

    let dates: Vec<NaiveDate> = common.into_iter().collect();
    let tickers: Vec<String> = survivors.iter().map(|(t, _)| t.clone()).collect();
    let mut closes = Array2::<f64>::zeros((dates.len(), tickers.len()));
    for (col, (_, points)) in survivors.iter().enumerate() {
      for (row, date) in dates.iter().enumerate() {
        closes[(row, col)] = points[date];
      }
    }

    Ok((
      Self {
        tickers,
        dates,
        closes,
      },
      warnings,
    ))
  }

  /// Build a panel directly from aligned columns.
  ///
  /// Intended for callers that already hold aligned data (and tests);
  /// the same invariants as [`PriceSeries::from_outcomes`] are enforced.
  pub fn from_columns(
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    closes: Array2<f64>,
  ) -> Result<Self, PortfolioError> {
    if tickers.is_empty() {
      return Err(PortfolioError::data("no asset has a usable price history"));
    }
    if dates.len() < MIN_OBSERVATIONS {
      return Err(PortfolioError::data(format!(
        "aligned history has {} common dates, need at least {}",
        dates.len(),
        MIN_OBSERVATIONS
      )));
    }
    if closes.nrows() != dates.len() || closes.ncols() != tickers.len() {
      return Err(PortfolioError::data(format!(
        "panel shape {}x{} does not match {} dates x {} tickers",
        closes.nrows(),
        closes.ncols(),
        dates.len(),
        tickers.len()
      )));
    }
    if closes.iter().any(|p| !p.is_finite() || *p <= 0.0) {
      return Err(PortfolioError::data(
        "panel contains non-finite or non-positive closes",
      ));
    }
    let mut sorted = tickers.clone();
    sorted.sort();
    sorted.dedup();
    if sorted != tickers {
      return Err(PortfolioError::data(
        "tickers must be unique and sorted ascending",
      ));
    }

    Ok(Self {
      tickers,
      dates,
      closes,
    })
  }

  /// Number of assets in the panel.
  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  /// Number of aligned observations per asset.
  pub fn n_observations(&self) -> usize {
    self.dates.len()
  }

  /// Sorted asset identifiers, column order of the panel.
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Shared date index, ascending.
  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  /// Close panel, rows = dates, columns = assets.
  pub fn closes(&self) -> &Array2<f64> {
    &self.closes
  }

  /// Most recent close per asset, keyed by ticker.
  pub fn latest_prices(&self) -> BTreeMap<String, f64> {
    let last = self.dates.len() - 1;
    self
      .tickers
      .iter()
      .enumerate()
      .map(|(col, ticker)| (ticker.clone(), self.closes[(last, col)]))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  fn raw(ticker: &str, rows: &[(&str, f64)]) -> FetchOutcome {
    Ok(RawPriceSeries::new(
      ticker,
      rows.iter().map(|&(d, p)| (date(d), p)).collect(),
    ))
  }

  #[test]
  fn aligns_on_common_dates_and_sorts_tickers() {
    let outcomes = vec![
      raw(
        "TCS.NS",
        &[
          ("2024-01-01", 10.0),
          ("2024-01-02", 11.0),
          ("2024-01-03", 12.0),
        ],
      ),
      raw(
        "INFY.NS",
        &[
          ("2024-01-01", 20.0),
          ("2024-01-03", 22.0),
          ("2024-01-04", 23.0),
        ],
      ),
    ];

    let (panel, warnings) = PriceSeries::from_outcomes(outcomes, 2).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(panel.tickers(), &["INFY.NS".to_string(), "TCS.NS".to_string()]);
    assert_eq!(panel.dates(), &[date("2024-01-01"), date("2024-01-03")]);
    assert_eq!(panel.closes()[(0, 0)], 20.0);
    assert_eq!(panel.closes()[(1, 1)], 12.0);
  }

  #[test]
  fn failed_and_short_assets_become_warnings() {
    let outcomes = vec![
      raw(
        "TCS.NS",
        &[
          ("2024-01-01", 10.0),
          ("2024-01-02", 11.0),
          ("2024-01-03", 12.0),
        ],
      ),
      raw("WIPRO.NS", &[("2024-01-01", 5.0)]),
      Err(FetchError::Empty {
        ticker: "HDFC.NS".to_string(),
      }),
    ];

    let (panel, warnings) = PriceSeries::from_outcomes(outcomes, 2).unwrap();
    assert_eq!(panel.n_assets(), 1);
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().any(|w| w.ticker == "WIPRO.NS"));
    assert!(warnings.iter().any(|w| w.ticker == "HDFC.NS"));
  }

  #[test]
  fn all_assets_invalid_is_a_data_error() {
    let outcomes = vec![
      raw("TCS.NS", &[]),
      Err(FetchError::Empty {
        ticker: "INFY.NS".to_string(),
      }),
    ];

    let err = PriceSeries::from_outcomes(outcomes, 2).unwrap_err();
    assert!(matches!(err, PortfolioError::Data { .. }));
  }

  #[test]
  fn non_positive_closes_are_dropped_before_alignment() {
    let outcomes = vec![raw(
      "TCS.NS",
      &[
        ("2024-01-01", 10.0),
        ("2024-01-02", -1.0),
        ("2024-01-03", 12.0),
      ],
    )];

    let (panel, _) = PriceSeries::from_outcomes(outcomes, 2).unwrap();
    assert_eq!(panel.n_observations(), 2);
  }

  #[test]
  fn latest_prices_reads_the_last_row() {
    let outcomes = vec![
      raw("A", &[("2024-01-01", 10.0), ("2024-01-02", 11.0)]),
      raw("B", &[("2024-01-01", 20.0), ("2024-01-02", 21.0)]),
    ];

    let (panel, _) = PriceSeries::from_outcomes(outcomes, 2).unwrap();
    let latest = panel.latest_prices();
    assert_eq!(latest["A"], 11.0);
    assert_eq!(latest["B"], 21.0);
  }
}
