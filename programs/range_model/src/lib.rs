//! Expected-value model for concentrated liquidity ranges under GBM, and the optimizer that
//! picks the range width maximizing it.
//!
//! - [`valuation`]: principal (`rho`) and fee (`psi`) values of a symmetric range
//! - [`optimizer`]: bounded maximization over the half-width, tick-width conversion
//! - [`minimizer`]: the scalar minimization seam and its Brent implementation
//! - [`fit`]: drift and volatility from a price history
//! - [`market`]: fee yield, relative liquidity and fee rate from pool state

pub mod errors;
pub mod fit;
pub mod market;
pub mod minimizer;
pub mod optimizer;
pub mod valuation;

pub use errors::ModelError;
pub use fit::{fit_distribution, PriceSample};
pub use optimizer::{find_optimal_delta, OptimizationResult, OptimizerConfig, WidthOptimizer};
pub use valuation::{psi, rho, DistributionParams, PsiMethod, ValuationInputs};
