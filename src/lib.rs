//! # Optifolio
//!
//! $$
//! \mathbf{w}^\* = \arg\max_{\mathbf{w}\in\Delta^{n-1}}
//! \frac{\mathbf{w}^\top\mu - r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! Portfolio optimization and discrete share allocation: historical
//! price panels in, long-only max-Sharpe weightings and whole-share
//! purchase lists out. Market data, the asset catalog, and report
//! rendering are thin collaborators around the pure pipeline in
//! [`portfolio`].

pub mod catalog;
pub mod error;
pub mod market;
pub mod portfolio;
pub mod report;
#[cfg(feature = "yahoo")]
pub mod yahoo;
