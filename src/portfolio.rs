//! # Portfolio Core
//!
//! $$
//! P \to (\mu, \Sigma) \to \mathbf{w}^\* \to (\text{shares}, \text{leftover})
//! $$
//!
//! Estimation, the long-only max-Sharpe solve, weight cleaning, discrete
//! share allocation, and portfolio metrics.

pub mod allocation;
pub mod engine;
pub mod estimators;
pub mod frontier;
pub mod metrics;
pub mod weights;

pub use allocation::allocate_discrete;
pub use allocation::DiscreteAllocation;
pub use engine::optimize_portfolio;
pub use engine::EngineConfig;
pub use engine::PortfolioEngine;
pub use frontier::WeightBounds;
pub use metrics::PortfolioMetrics;
pub use weights::clean_weights;
pub use weights::WeightVector;
