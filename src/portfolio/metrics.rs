//! # Portfolio Metrics
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top\Sigma\,\mathbf{w}, \qquad
//! \mathbb{E}[R_p] = \mathbf{w}^\top\mu
//! $$

use nalgebra::DMatrix;
use nalgebra::DVector;

use super::weights::WeightVector;
use crate::error::PortfolioError;

/// Model statistics of a final weighting.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PortfolioMetrics {
  /// Annualized expected portfolio return.
  pub expected_return: f64,
  /// Annualized portfolio volatility.
  pub volatility: f64,
  /// Annualized portfolio variance.
  pub variance: f64,
}

/// Compute metrics for `weights` against the moment estimates that
/// produced them.
///
/// The same `mu`/`cov` basis from the estimation stage must be passed
/// in; re-deriving moments here would let metrics drift from the
/// weights they describe.
pub fn portfolio_metrics(
  weights: &WeightVector,
  mu: &DVector<f64>,
  cov: &DMatrix<f64>,
) -> Result<PortfolioMetrics, PortfolioError> {
  let n = weights.len();
  if mu.len() != n || cov.nrows() != n || cov.ncols() != n {
    return Err(PortfolioError::estimation(format!(
      "moment shapes ({}, {}x{}) do not match {} weights",
      mu.len(),
      cov.nrows(),
      cov.ncols(),
      n
    )));
  }

  let w = DVector::from_vec(weights.weights());
  let expected_return = mu.dot(&w);
  let variance = ((w.transpose() * cov * &w)[(0, 0)]).max(0.0);

  Ok(PortfolioMetrics {
    expected_return,
    volatility: variance.sqrt(),
    variance,
  })
}
