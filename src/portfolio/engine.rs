//! # Portfolio Engine
//!
//! $$
//! P \mapsto (\mu, \Sigma) \mapsto \mathbf{w}^\* \mapsto
//! (\text{shares}, \text{leftover}, \text{metrics})
//! $$
//!
//! Orchestration of the estimation, optimization, cleaning, and metrics
//! stages. Every stage is a pure function of its inputs; the engine
//! holds configuration only, so concurrent requests need no locking.

use std::collections::BTreeMap;

use super::allocation::allocate_discrete;
use super::allocation::DiscreteAllocation;
use super::estimators::mean_historical_returns;
use super::estimators::sample_covariance;
use super::estimators::TRADING_DAYS_PER_YEAR;
use super::frontier::max_sharpe;
use super::frontier::FrontierConfig;
use super::frontier::WeightBounds;
use super::metrics::portfolio_metrics;
use super::metrics::PortfolioMetrics;
use super::weights::clean_weights;
use super::weights::WeightVector;
use crate::error::PortfolioError;
use crate::market::AssetWarning;
use crate::market::FetchOutcome;
use crate::market::PriceSeries;
use crate::market::MIN_OBSERVATIONS;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
  /// Risk-free rate used in the Sharpe objective.
  pub risk_free: f64,
  /// Scale from per-period to annual statistics.
  pub annualization: f64,
  /// Minimum observations required per asset at ingestion.
  pub min_observations: usize,
  /// Per-asset weight bounds.
  pub bounds: WeightBounds,
  /// Optional ridge regularization for near-singular covariances.
  /// Off by default; enabling it changes results.
  pub ridge: Option<f64>,
  /// Condition number above which the covariance is treated as singular.
  pub max_condition: f64,
  /// Decimal places kept by the weight cleaner.
  pub weight_precision: u32,
  /// Absolute cutoff below which cleaned weights are zeroed.
  pub weight_cutoff: f64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      risk_free: 0.0,
      annualization: TRADING_DAYS_PER_YEAR,
      min_observations: MIN_OBSERVATIONS,
      bounds: WeightBounds::default(),
      ridge: None,
      max_condition: 1e12,
      weight_precision: 4,
      weight_cutoff: 1e-4,
    }
  }
}

/// Single entry-point engine for the optimization pipeline.
#[derive(Clone, Debug, Default)]
pub struct PortfolioEngine {
  config: EngineConfig,
}

impl PortfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: EngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Partition per-asset fetch outcomes into an aligned panel plus
  /// exclusion warnings.
  pub fn ingest(
    &self,
    outcomes: Vec<FetchOutcome>,
  ) -> Result<(PriceSeries, Vec<AssetWarning>), PortfolioError> {
    PriceSeries::from_outcomes(outcomes, self.config.min_observations)
  }

  /// Run estimation, the max-Sharpe solve, and weight cleaning.
  ///
  /// Returns cleaned weights together with metrics computed from the
  /// same moment estimates the solve used.
  pub fn optimize(
    &self,
    prices: &PriceSeries,
  ) -> Result<(WeightVector, PortfolioMetrics), PortfolioError> {
    tracing::debug!(
      n_assets = prices.n_assets(),
      n_observations = prices.n_observations(),
      "estimating moments"
    );
    let mu = mean_historical_returns(prices, self.config.annualization)?;
    let cov = sample_covariance(prices, self.config.annualization)?;

    let frontier = FrontierConfig {
      risk_free: self.config.risk_free,
      bounds: self.config.bounds.clone(),
      ridge: self.config.ridge,
      max_condition: self.config.max_condition,
      ..FrontierConfig::default()
    };
    let raw = max_sharpe(prices.tickers(), &mu, &cov, &frontier)?;

    let weights = WeightVector::from_pairs(
      prices.tickers().iter().cloned().zip(raw.into_iter()),
    )?;
    let weights = clean_weights(
      &weights,
      self.config.weight_precision,
      self.config.weight_cutoff,
    );
    let metrics = portfolio_metrics(&weights, &mu, &cov)?;

    tracing::debug!(
      expected_return = metrics.expected_return,
      volatility = metrics.volatility,
      "optimization complete"
    );
    Ok((weights, metrics))
  }

  /// Convert cleaned weights into a whole-share purchase list.
  pub fn allocate(
    &self,
    weights: &WeightVector,
    latest_prices: &BTreeMap<String, f64>,
    budget: f64,
  ) -> Result<DiscreteAllocation, PortfolioError> {
    allocate_discrete(weights, latest_prices, budget)
  }
}

/// Optimize a portfolio in one call; see [`PortfolioEngine::optimize`].
pub fn optimize_portfolio(
  prices: &PriceSeries,
  config: &EngineConfig,
) -> Result<(WeightVector, PortfolioMetrics), PortfolioError> {
  PortfolioEngine::new(config.clone()).optimize(prices)
}
