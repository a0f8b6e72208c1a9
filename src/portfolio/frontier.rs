//! # Efficient Frontier Solver
//!
//! $$
//! \mathbf{w}^\* = \arg\max_{\mathbf{w}\in\Delta^{n-1}}
//! \frac{\mathbf{w}^\top\mu - r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! Long-only max-Sharpe solve on the weight simplex. The simplex
//! constraints hold by construction through a softmax parameterization;
//! per-asset box bounds enter as a quadratic penalty.

use std::collections::BTreeMap;

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use nalgebra::DMatrix;
use nalgebra::DVector;

use super::estimators::condition_number;
use crate::error::PortfolioError;

/// Per-asset box bounds applied on top of the long-only simplex.
#[derive(Clone, Debug)]
pub struct WeightBounds {
  /// Bounds for assets without an explicit override.
  pub default: (f64, f64),
  /// Per-ticker overrides.
  pub per_asset: BTreeMap<String, (f64, f64)>,
}

impl Default for WeightBounds {
  fn default() -> Self {
    Self {
      default: (0.0, 1.0),
      per_asset: BTreeMap::new(),
    }
  }
}

impl WeightBounds {
  /// Uniform bounds for every asset.
  pub fn uniform(lower: f64, upper: f64) -> Self {
    Self {
      default: (lower, upper),
      per_asset: BTreeMap::new(),
    }
  }

  /// Resolve bounds per ticker, clamped into `[0, 1]`.
  pub fn resolve(&self, tickers: &[String]) -> Vec<(f64, f64)> {
    tickers
      .iter()
      .map(|ticker| {
        let (lo, hi) = self
          .per_asset
          .get(ticker)
          .copied()
          .unwrap_or(self.default);
        (lo.clamp(0.0, 1.0), hi.clamp(0.0, 1.0))
      })
      .collect()
  }
}

/// Solver configuration.
#[derive(Clone, Debug)]
pub struct FrontierConfig {
  /// Risk-free rate used in the Sharpe objective.
  pub risk_free: f64,
  /// Per-asset weight bounds.
  pub bounds: WeightBounds,
  /// Optional ridge added to the covariance diagonal when it is
  /// near-singular. Off by default; enabling it changes results.
  pub ridge: Option<f64>,
  /// Condition number above which the covariance is treated as singular.
  pub max_condition: f64,
  /// Iteration cap for the Nelder-Mead executor.
  pub max_iters: u64,
}

impl Default for FrontierConfig {
  fn default() -> Self {
    Self {
      risk_free: 0.0,
      bounds: WeightBounds::default(),
      ridge: None,
      max_condition: 1e12,
      max_iters: 5000,
    }
  }
}

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

fn check_bounds_feasible(bounds: &[(f64, f64)]) -> Result<(), PortfolioError> {
  if bounds.iter().any(|(lo, hi)| lo > hi) {
    return Err(PortfolioError::optimization(
      "per-asset lower bound exceeds its upper bound",
    ));
  }
  let lower: f64 = bounds.iter().map(|b| b.0).sum();
  let upper: f64 = bounds.iter().map(|b| b.1).sum();
  if lower - 1.0 > 1e-9 || upper + 1e-9 < 1.0 {
    return Err(PortfolioError::optimization(format!(
      "bounds infeasible for a fully-invested portfolio: lower sum {lower:.4}, upper sum {upper:.4}"
    )));
  }
  Ok(())
}

struct SharpeCost {
  mu: DVector<f64>,
  cov: DMatrix<f64>,
  risk_free: f64,
  bounds: Vec<(f64, f64)>,
  penalty: f64,
}

impl CostFunction for SharpeCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let w = softmax(x);
    let wv = DVector::from_vec(w.clone());
    let port_var = (wv.transpose() * &self.cov * &wv)[(0, 0)];
    if port_var < 1e-30 {
      return Ok(1e10);
    }

    let sharpe = (self.mu.dot(&wv) - self.risk_free) / port_var.sqrt();

    let mut bound_penalty = 0.0;
    for (wi, (lo, hi)) in w.iter().zip(self.bounds.iter()) {
      bound_penalty += (lo - wi).max(0.0).powi(2) + (wi - hi).max(0.0).powi(2);
    }

    Ok(-sharpe + self.penalty * bound_penalty)
  }
}

/// Solve for the raw max-Sharpe weights.
///
/// Output entries that should be exactly zero may carry negligible
/// noise; cleaning is the caller's next stage. Every infeasibility is
/// surfaced as [`PortfolioError::Optimization`]; the solver never
/// falls back to substitute weights.
pub fn max_sharpe(
  tickers: &[String],
  mu: &DVector<f64>,
  cov: &DMatrix<f64>,
  config: &FrontierConfig,
) -> Result<Vec<f64>, PortfolioError> {
  let n = tickers.len();
  if n == 0 {
    return Err(PortfolioError::optimization("empty asset set"));
  }
  if mu.len() != n || cov.nrows() != n || cov.ncols() != n {
    return Err(PortfolioError::optimization(format!(
      "moment shapes ({}, {}x{}) do not match {} assets",
      mu.len(),
      cov.nrows(),
      cov.ncols(),
      n
    )));
  }

  let bounds = config.bounds.resolve(tickers);
  check_bounds_feasible(&bounds)?;

  if mu.max() <= config.risk_free {
    return Err(PortfolioError::optimization(
      "no expected return exceeds the risk-free rate",
    ));
  }

  let cond = condition_number(cov);
  let cov = if cond > config.max_condition {
    match config.ridge {
      Some(ridge) => {
        tracing::debug!(
          condition = cond,
          ridge,
          "regularizing near-singular covariance"
        );
        cov + DMatrix::from_diagonal_element(n, n, ridge)
      }
      None => {
        return Err(PortfolioError::optimization(format!(
          "covariance matrix is near-singular (condition number {cond:.3e}); \
           configure ridge regularization or change the asset set"
        )));
      }
    }
  } else {
    cov.clone()
  };

  if n == 1 {
    return Ok(vec![1.0]);
  }

  let cost = SharpeCost {
    mu: mu.clone(),
    cov,
    risk_free: config.risk_free,
    bounds,
    penalty: 1e4,
  };

  let x0 = vec![0.0; n];
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] = 1.0;
    simplex.push(point);
  }

  let solver = NelderMead::new(simplex)
    .with_sd_tolerance(1e-8)
    .map_err(|e| PortfolioError::optimization(format!("solver setup failed: {e}")))?;
  let res = Executor::new(cost, solver)
    .configure(|state| state.max_iters(config.max_iters))
    .run()
    .map_err(|e| PortfolioError::optimization(format!("solver failed: {e}")))?;

  let best_x = res
    .state
    .best_param
    .ok_or_else(|| PortfolioError::optimization("solver returned no solution"))?;
  let weights = softmax(&best_x);

  if weights.iter().any(|w| !w.is_finite()) {
    return Err(PortfolioError::optimization("solver produced non-finite weights"));
  }

  Ok(weights)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn tickers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn weights_stay_on_the_simplex() {
    let tickers = tickers(&["A", "B", "C"]);
    let mu = DVector::from_vec(vec![0.08, 0.12, 0.10]);
    let cov = DMatrix::from_row_slice(
      3,
      3,
      &[0.04, 0.01, 0.0, 0.01, 0.09, 0.02, 0.0, 0.02, 0.16],
    );

    let w = max_sharpe(&tickers, &mu, &cov, &FrontierConfig::default()).unwrap();
    let sum: f64 = w.iter().sum();
    assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-6);
    assert!(w.iter().all(|&wi| wi >= 0.0));
  }

  #[test]
  fn tilts_toward_the_dominant_asset() {
    let tickers = tickers(&["A", "B"]);
    // Same risk, A returns far more: the solution should lean to A.
    let mu = DVector::from_vec(vec![0.20, 0.02]);
    let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.04]);

    let w = max_sharpe(&tickers, &mu, &cov, &FrontierConfig::default()).unwrap();
    assert!(w[0] > 0.8, "expected dominant weight, got {w:?}");
  }

  #[test]
  fn upper_bound_caps_the_dominant_asset() {
    let tickers = tickers(&["A", "B"]);
    let mu = DVector::from_vec(vec![0.20, 0.02]);
    let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.04]);

    let config = FrontierConfig {
      bounds: WeightBounds::uniform(0.0, 0.6),
      ..FrontierConfig::default()
    };

    let w = max_sharpe(&tickers, &mu, &cov, &config).unwrap();
    assert!(w[0] <= 0.6 + 1e-2, "bound violated: {w:?}");
  }

  #[test]
  fn all_returns_below_risk_free_is_infeasible() {
    let tickers = tickers(&["A", "B"]);
    let mu = DVector::from_vec(vec![0.01, 0.02]);
    let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.04]);

    let config = FrontierConfig {
      risk_free: 0.05,
      ..FrontierConfig::default()
    };

    let err = max_sharpe(&tickers, &mu, &cov, &config).unwrap_err();
    assert!(matches!(err, PortfolioError::Optimization { .. }));
  }

  #[test]
  fn singular_covariance_fails_without_ridge() {
    let tickers = tickers(&["A", "B"]);
    let mu = DVector::from_vec(vec![0.10, 0.10]);
    let cov = DMatrix::from_element(2, 2, 0.04);

    let err = max_sharpe(&tickers, &mu, &cov, &FrontierConfig::default()).unwrap_err();
    assert!(matches!(err, PortfolioError::Optimization { .. }));
  }

  #[test]
  fn singular_covariance_solves_with_ridge() {
    let tickers = tickers(&["A", "B"]);
    let mu = DVector::from_vec(vec![0.10, 0.10]);
    let cov = DMatrix::from_element(2, 2, 0.04);

    let config = FrontierConfig {
      ridge: Some(1e-6),
      ..FrontierConfig::default()
    };

    let w = max_sharpe(&tickers, &mu, &cov, &config).unwrap();
    let sum: f64 = w.iter().sum();
    assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-6);
  }

  #[test]
  fn infeasible_bounds_are_rejected() {
    let tickers = tickers(&["A", "B"]);
    let mu = DVector::from_vec(vec![0.10, 0.08]);
    let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.04]);

    let config = FrontierConfig {
      bounds: WeightBounds::uniform(0.0, 0.3),
      ..FrontierConfig::default()
    };

    let err = max_sharpe(&tickers, &mu, &cov, &config).unwrap_err();
    assert!(matches!(err, PortfolioError::Optimization { .. }));
  }

  #[test]
  fn single_asset_gets_full_weight() {
    let tickers = tickers(&["A"]);
    let mu = DVector::from_vec(vec![0.10]);
    let cov = DMatrix::from_element(1, 1, 0.04);

    let w = max_sharpe(&tickers, &mu, &cov, &FrontierConfig::default()).unwrap();
    assert_eq!(w, vec![1.0]);
  }
}
