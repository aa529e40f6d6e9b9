//! Range width optimization.
//!
//! Maximizes `rho + psi` over the half-width `delta` between the narrowest width the tick grid
//! allows and the full range. Below the fee level at which concentration can pay for itself,
//! and whenever the search fails, the full range is returned instead of an error.

use crate::errors::{ModelError, Result};
use crate::minimizer::{BrentMinimizer, ScalarMinimizer, SearchBounds};
use crate::valuation::{DistributionParams, PsiMethod, ValuationInputs};
use clmm_math::constants::{LN_TICK_BASE, MAX_TICK};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Optimizer settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub psi_method: PsiMethod,
    /// Absolute tolerance on `delta`
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Widths above this many ticks are replaced by the full range
    pub max_tick_width: Option<i32>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            psi_method: PsiMethod::ClosedForm,
            tolerance: 1e-8,
            max_iterations: 500,
            max_tick_width: None,
        }
    }
}

/// Why the full range was chosen over a concentrated one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullRangeReason {
    /// `theta <= (el + 1) sigma^2 / 8`
    InsufficientFees,
    /// The minimizer failed to converge
    NoConvergence,
    /// The optimal width exceeded `max_tick_width`
    WidthCapExceeded,
}

/// Outcome of a width optimization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Optimal log-price half-width
    pub delta: f64,
    /// `rho + psi` at `delta`, 1 for a zero-length period
    pub expected_value: f64,
    /// Tick width to deploy, 0 for the full range
    pub tick_width: i32,
    pub full_range: Option<FullRangeReason>,
}

impl OptimizationResult {
    pub fn is_full_range(&self) -> bool {
        self.full_range.is_some()
    }
}

/// One optimization problem
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeProblem {
    pub distribution: DistributionParams,
    /// Rebalance period in blocks
    pub tau: f64,
    pub ef: f64,
    pub el: f64,
    pub theta: f64,
    pub tick_spacing: i32,
}

/// Narrowest admissible half-width, half a tick spacing
pub fn delta_min(tick_spacing: i32) -> Result<f64> {
    check_spacing(tick_spacing)?;
    Ok(LN_TICK_BASE * tick_spacing as f64 / 2.0)
}

/// Half-width of the full range for the given spacing
pub fn delta_max(tick_spacing: i32) -> Result<f64> {
    check_spacing(tick_spacing)?;
    Ok(LN_TICK_BASE * (MAX_TICK - MAX_TICK % tick_spacing) as f64)
}

/// Fee yield at or below which the full range beats any concentrated range
pub fn theta_min(el: f64, sigma: f64) -> f64 {
    (el + 1.0) * sigma * sigma / 8.0
}

/// Converts a log-price half-width into a tick width that is a multiple of `2 * tick_spacing`
///
/// Widths that round to zero are raised to the narrowest usable width, `2 * tick_spacing`.
pub fn tick_width(delta: f64, tick_spacing: i32) -> Result<i32> {
    check_spacing(tick_spacing)?;
    if !(delta.is_finite() && delta > 0.0) {
        return Err(ModelError::InvalidParameter { name: "delta", value: delta });
    }
    let spacing = tick_spacing as f64;
    let units = (delta / LN_TICK_BASE / (2.0 * spacing)).floor();
    let width = 2.0 * units * spacing;
    if width > MAX_TICK as f64 * 2.0 {
        return Err(ModelError::InvalidParameter { name: "delta", value: delta });
    }
    let width = width as i32;
    Ok(if width == 0 { 2 * tick_spacing } else { width })
}

/// Log-price half-width a range of `tick_width` ticks actually covers
pub fn realized_half_width(tick_width: i32) -> f64 {
    tick_width as f64 * LN_TICK_BASE / 2.0
}

fn check_spacing(tick_spacing: i32) -> Result<()> {
    if tick_spacing <= 0 {
        return Err(ModelError::InvalidTickSpacing(tick_spacing));
    }
    Ok(())
}

/// Width optimizer over a pluggable minimizer
#[derive(Debug, Clone)]
pub struct WidthOptimizer<M = BrentMinimizer> {
    config: OptimizerConfig,
    minimizer: M,
}

impl WidthOptimizer<BrentMinimizer> {
    pub fn new(config: OptimizerConfig) -> Self {
        let minimizer = BrentMinimizer {
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
            ..BrentMinimizer::default()
        };
        Self { config, minimizer }
    }
}

impl Default for WidthOptimizer<BrentMinimizer> {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl<M: ScalarMinimizer> WidthOptimizer<M> {
    pub fn with_minimizer(config: OptimizerConfig, minimizer: M) -> Self {
        Self { config, minimizer }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Finds the half-width maximizing `rho + psi`
    ///
    /// # Errors
    /// * `InvalidParameter` / `InvalidTickSpacing` - for inputs outside the model's domain.
    ///   Search failures are not errors; they yield the full range.
    pub fn optimize(&self, problem: &RangeProblem) -> Result<OptimizationResult> {
        let lower = delta_min(problem.tick_spacing)?;
        let upper = delta_max(problem.tick_spacing)?;
        let method = self.config.psi_method;
        let inputs = ValuationInputs::new(
            lower,
            problem.distribution,
            problem.tau,
            problem.ef,
            problem.el,
            problem.theta,
        )?;

        let threshold = theta_min(problem.el, problem.distribution.sigma);
        if problem.theta <= threshold {
            warn!(
                theta = problem.theta,
                theta_min = threshold,
                "fee yield too low for a concentrated range, using full range"
            );
            return self.full_range(&inputs, upper, FullRangeReason::InsufficientFees);
        }

        let x0 = problem.distribution.sigma * problem.tau.sqrt();
        let mut objective = |delta: f64| -> f64 {
            match inputs.with_delta(delta) {
                Ok(at) => -at.expected_value(method),
                Err(_) => f64::NAN,
            }
        };

        let minimum = match self
            .minimizer
            .minimize(&mut objective, x0, SearchBounds::new(lower, upper))
        {
            Ok(minimum) => minimum,
            Err(failure) => {
                warn!(%failure, x0, "width optimization failed, using full range");
                return self.full_range(&inputs, upper, FullRangeReason::NoConvergence);
            }
        };
        debug!(
            delta = minimum.x,
            iterations = minimum.iterations,
            evaluations = minimum.evaluations,
            "width optimization converged"
        );

        let delta = minimum.x.max(lower);
        let width = tick_width(delta, problem.tick_spacing)?;
        if let Some(cap) = self.config.max_tick_width {
            if width > cap {
                warn!(tick_width = width, max_tick_width = cap, "optimal width above cap, using full range");
                return self.full_range(&inputs, upper, FullRangeReason::WidthCapExceeded);
            }
        }

        let expected_value = inputs.with_delta(delta)?.expected_value(method);
        info!(
            delta,
            tick_width = width,
            realized_delta = realized_half_width(width),
            expected_value,
            "optimal range width"
        );
        Ok(OptimizationResult {
            delta,
            expected_value,
            tick_width: width,
            full_range: None,
        })
    }

    fn full_range(&self, inputs: &ValuationInputs, upper: f64, reason: FullRangeReason) -> Result<OptimizationResult> {
        let expected_value = inputs.with_delta(upper)?.expected_value(self.config.psi_method);
        Ok(OptimizationResult {
            delta: upper,
            expected_value,
            tick_width: 0,
            full_range: Some(reason),
        })
    }
}

/// Finds the optimal half-width with the default optimizer settings
pub fn find_optimal_delta(
    mu: f64,
    sigma: f64,
    tau: f64,
    ef: f64,
    el: f64,
    theta: f64,
    tick_spacing: i32,
) -> Result<OptimizationResult> {
    WidthOptimizer::default().optimize(&RangeProblem {
        distribution: DistributionParams { mu, sigma },
        tau,
        ef,
        el,
        theta,
        tick_spacing,
    })
}
