//! Pipeline error types.

use thiserror::Error;

/// Errors produced by the optimization and allocation pipeline.
///
/// Estimation and optimization failures always abort a request; the
/// pipeline never substitutes fabricated or default weights.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortfolioError {
  /// Missing, empty, or too-short price history.
  #[error("invalid price data: {reason}")]
  Data {
    /// Why the data set is unusable.
    reason: String,
  },

  /// Not enough observations for a stable return/covariance estimate.
  #[error("estimation failed: {reason}")]
  Estimation {
    /// Why the estimate is unavailable.
    reason: String,
  },

  /// The constrained optimization problem is infeasible or unbounded.
  #[error("optimization failed: {reason}")]
  Optimization {
    /// Why the solve was rejected or did not converge.
    reason: String,
  },
}

impl PortfolioError {
  /// Construct a [`PortfolioError::Data`].
  pub fn data(reason: impl Into<String>) -> Self {
    Self::Data {
      reason: reason.into(),
    }
  }

  /// Construct a [`PortfolioError::Estimation`].
  pub fn estimation(reason: impl Into<String>) -> Self {
    Self::Estimation {
      reason: reason.into(),
    }
  }

  /// Construct a [`PortfolioError::Optimization`].
  pub fn optimization(reason: impl Into<String>) -> Self {
    Self::Optimization {
      reason: reason.into(),
    }
  }
}

/// Per-asset failure reported by a market-data collaborator.
///
/// Carried inside the per-asset `Result` partition so one bad ticker
/// never aborts the whole request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  /// The source returned no rows for the ticker.
  #[error("no data returned for {ticker}")]
  Empty {
    /// The requested ticker.
    ticker: String,
  },

  /// Transport or provider-side failure.
  #[error("provider error for {ticker}: {message}")]
  Provider {
    /// The requested ticker.
    ticker: String,
    /// Provider-reported failure.
    message: String,
  },

  /// A local source file could not be read or parsed.
  #[error("unreadable source for {ticker}: {message}")]
  Source {
    /// The requested ticker.
    ticker: String,
    /// I/O or parse failure.
    message: String,
  },
}

impl FetchError {
  /// Ticker the failure belongs to.
  pub fn ticker(&self) -> &str {
    match self {
      Self::Empty { ticker } => ticker,
      Self::Provider { ticker, .. } => ticker,
      Self::Source { ticker, .. } => ticker,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_display_carries_reason() {
    let err = PortfolioError::optimization("covariance matrix is singular");
    assert!(err.to_string().contains("optimization failed"));
    assert!(err.to_string().contains("singular"));
  }

  #[test]
  fn fetch_error_exposes_ticker() {
    let err = FetchError::Provider {
      ticker: "INFY.NS".to_string(),
      message: "timeout".to_string(),
    };
    assert_eq!(err.ticker(), "INFY.NS");
  }
}
