//! # Return & Risk Estimators
//!
//! $$
//! \hat\mu = A\,\bar r, \qquad \hat\Sigma = A\,\widehat{\mathrm{Cov}}(r)
//! $$
//!
//! Annualized moment estimates from an aligned close-price panel.

use nalgebra::DMatrix;
use nalgebra::DVector;
use ndarray::Array2;

use crate::error::PortfolioError;
use crate::market::PriceSeries;

/// Default annualization factor for daily observations.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Per-period simple returns from consecutive closes.
///
/// Row `t` holds `p[t+1] / p[t] - 1` per asset. Fails with
/// [`PortfolioError::Estimation`] when fewer than 2 observations are
/// available.
pub fn simple_returns(panel: &PriceSeries) -> Result<Array2<f64>, PortfolioError> {
  let n_obs = panel.n_observations();
  if n_obs < 2 {
    return Err(PortfolioError::estimation(format!(
      "{} observations, need at least 2 to form returns",
      n_obs
    )));
  }

  let closes = panel.closes();
  let mut returns = Array2::<f64>::zeros((n_obs - 1, panel.n_assets()));
  for col in 0..panel.n_assets() {
    for row in 1..n_obs {
      returns[(row - 1, col)] = closes[(row, col)] / closes[(row - 1, col)] - 1.0;
    }
  }

  Ok(returns)
}

/// Annualized mean historical returns per asset.
pub fn mean_historical_returns(
  panel: &PriceSeries,
  annualization: f64,
) -> Result<DVector<f64>, PortfolioError> {
  let returns = simple_returns(panel)?;
  let n_periods = returns.nrows() as f64;

  Ok(DVector::from_iterator(
    panel.n_assets(),
    (0..panel.n_assets()).map(|col| returns.column(col).sum() / n_periods * annualization),
  ))
}

/// Annualized sample covariance of per-period returns.
///
/// Uses the unbiased `n - 1` denominator, so at least 3 price
/// observations are required. Symmetric and positive-semidefinite by
/// construction; near-singular outputs are the frontier solver's
/// concern (see [`condition_number`]).
pub fn sample_covariance(
  panel: &PriceSeries,
  annualization: f64,
) -> Result<DMatrix<f64>, PortfolioError> {
  let returns = simple_returns(panel)?;
  let n_periods = returns.nrows();
  if n_periods < 2 {
    return Err(PortfolioError::estimation(format!(
      "{} return periods, need at least 2 for a covariance estimate",
      n_periods
    )));
  }

  let n = panel.n_assets();
  let means: Vec<f64> = (0..n)
    .map(|col| returns.column(col).sum() / n_periods as f64)
    .collect();

  let mut cov = DMatrix::<f64>::zeros(n, n);
  for i in 0..n {
    for j in i..n {
      let mut acc = 0.0;
      for row in 0..n_periods {
        acc += (returns[(row, i)] - means[i]) * (returns[(row, j)] - means[j]);
      }
      let value = acc / (n_periods - 1) as f64 * annualization;
      cov[(i, j)] = value;
      cov[(j, i)] = value;
    }
  }

  Ok(cov)
}

/// Condition number of a covariance matrix via its singular values.
///
/// Returns `f64::INFINITY` for a numerically singular matrix.
pub fn condition_number(cov: &DMatrix<f64>) -> f64 {
  if cov.is_empty() {
    return f64::INFINITY;
  }

  let singular = cov.singular_values();
  let max = singular.iter().copied().fold(0.0_f64, f64::max);
  let min = singular.iter().copied().fold(f64::INFINITY, f64::min);

  if min <= 0.0 || !min.is_finite() {
    f64::INFINITY
  } else {
    max / min
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;
  use ndarray::array;

  use super::*;

  fn panel(closes: Array2<f64>) -> PriceSeries {
    let tickers: Vec<String> = (0..closes.ncols())
      .map(|i| format!("A{i}"))
      .collect();
    let dates: Vec<NaiveDate> = (0..closes.nrows())
      .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64))
      .collect();
    PriceSeries::from_columns(tickers, dates, closes).unwrap()
  }

  #[test]
  fn mean_returns_match_hand_computation() {
    // A: +10% twice, B: -10% then +10%.
    let panel = panel(array![[100.0, 100.0], [110.0, 90.0], [121.0, 99.0]]);
    let mu = mean_historical_returns(&panel, 252.0).unwrap();

    assert_abs_diff_eq!(mu[0], 0.1 * 252.0, epsilon = 1e-9);
    assert_abs_diff_eq!(mu[1], 0.0, epsilon = 1e-9);
  }

  #[test]
  fn covariance_matches_hand_computation() {
    let panel = panel(array![[100.0, 100.0], [110.0, 90.0], [121.0, 99.0]]);
    let cov = sample_covariance(&panel, 252.0).unwrap();

    // A has zero return variance, B has 0.02 per period.
    assert_abs_diff_eq!(cov[(0, 0)], 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(cov[(1, 1)], 0.02 * 252.0, epsilon = 1e-9);
    assert_abs_diff_eq!(cov[(0, 1)], cov[(1, 0)], epsilon = 1e-12);
  }

  #[test]
  fn covariance_needs_three_observations() {
    let panel = panel(array![[100.0], [101.0]]);
    let err = sample_covariance(&panel, 252.0).unwrap_err();
    assert!(matches!(err, PortfolioError::Estimation { .. }));
  }

  #[test]
  fn condition_number_flags_singular_covariance() {
    let well = DMatrix::from_diagonal(&DVector::from_vec(vec![0.04, 0.09]));
    assert!(condition_number(&well) < 10.0);

    let singular = DMatrix::from_element(2, 2, 0.04);
    assert!(condition_number(&singular) > 1e12);
  }
}
