//! Range width selection per strategy.

use crate::errors::{Result, SimError};
use crate::market::PoolState;
use range_model::market::{estimate_theta, relative_liquidity};
use range_model::optimizer::RangeProblem;
use range_model::{DistributionParams, OptimizerConfig, WidthOptimizer};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Mint once and hold the initial range
    FixedWidth,
    /// Recenter a configured width every rebalance period
    #[default]
    SimpleRebalance,
    /// Recenter with the width chosen by the range optimizer
    OptimizedRebalance,
}

impl StrategyKind {
    pub fn rebalances(&self) -> bool {
        !matches!(self, StrategyKind::FixedWidth)
    }
}

/// Everything a selector may look at when choosing a width
#[derive(Debug, Clone, Copy)]
pub struct WidthContext<'a> {
    pub block: u64,
    pub pool: &'a PoolState,
    /// Pool state one rebalance period ago, present when the selector asks for history
    pub reference_pool: Option<&'a PoolState>,
    /// Token amounts that will back the new position
    pub amount0: u128,
    pub amount1: u128,
    pub rebalance_period: u64,
}

pub trait WidthSelector: Send + Sync {
    /// Range width in ticks, 0 for the full range
    fn select_width(&self, ctx: &WidthContext<'_>) -> Result<i32>;

    /// Whether [`WidthContext::reference_pool`] must be filled in
    fn needs_history(&self) -> bool {
        false
    }
}

/// Always the configured width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguredWidth(pub i32);

impl WidthSelector for ConfiguredWidth {
    fn select_width(&self, _ctx: &WidthContext<'_>) -> Result<i32> {
        Ok(self.0)
    }
}

/// Width maximizing the expected value over the next rebalance period
///
/// Fee yield is estimated from the global fee growth over the previous period and the
/// relative liquidity from the amounts about to be deposited.
#[derive(Debug, Clone)]
pub struct OptimizedWidth {
    distribution: DistributionParams,
    optimizer: WidthOptimizer,
}

impl OptimizedWidth {
    pub fn new(distribution: DistributionParams, config: OptimizerConfig) -> Self {
        Self {
            distribution,
            optimizer: WidthOptimizer::new(config),
        }
    }
}

impl WidthSelector for OptimizedWidth {
    fn select_width(&self, ctx: &WidthContext<'_>) -> Result<i32> {
        let reference = ctx.reference_pool.ok_or_else(|| {
            SimError::MarketState(format!("no pool history {} blocks before {}", ctx.rebalance_period, ctx.block))
        })?;
        let market = ctx.pool.market_params()?;
        let theta = estimate_theta(
            reference.fee_growth_global(),
            ctx.pool.fee_growth_global(),
            ctx.pool.sqrt_price_x96,
            ctx.rebalance_period,
        )?;
        let el = relative_liquidity(ctx.amount0, ctx.amount1, ctx.pool.liquidity, ctx.pool.sqrt_price_x96)?;
        debug!(block = ctx.block, theta, el, fee_rate = market.fee_rate, "estimated market inputs");

        let result = self.optimizer.optimize(&RangeProblem {
            distribution: self.distribution,
            tau: ctx.rebalance_period as f64,
            ef: market.fee_rate,
            el,
            theta,
            tick_spacing: market.tick_spacing,
        })?;
        Ok(result.tick_width)
    }

    fn needs_history(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_math::constants::{Q128, Q96};
    use primitive_types::U256;

    fn pool(fee_growth: U256) -> PoolState {
        PoolState {
            sqrt_price_x96: Q96,
            tick: 0,
            liquidity: 1_000_000_000,
            fee_growth_global0_x128: fee_growth,
            fee_growth_global1_x128: fee_growth,
            fee_pips: 3000,
            tick_spacing: 60,
        }
    }

    #[test]
    fn test_configured_width() -> Result<()> {
        let pool = pool(U256::zero());
        let ctx = WidthContext {
            block: 1,
            pool: &pool,
            reference_pool: None,
            amount0: 0,
            amount1: 0,
            rebalance_period: 10,
        };
        assert_eq!(ConfiguredWidth(600).select_width(&ctx)?, 600);
        assert!(!ConfiguredWidth(600).needs_history());
        assert!(StrategyKind::SimpleRebalance.rebalances());
        assert!(!StrategyKind::FixedWidth.rebalances());
        Ok(())
    }

    #[test]
    fn test_optimized_width_concentrates_when_fees_pay() -> Result<()> {
        let selector = OptimizedWidth::new(DistributionParams::new(0.0, 0.001)?, OptimizerConfig::default());
        let reference = pool(U256::zero());
        // 2e-5 yield per block over 100 blocks
        let now = pool(Q128 / U256::from(500u64));
        let ctx = WidthContext {
            block: 200,
            pool: &now,
            reference_pool: Some(&reference),
            amount0: 0,
            amount1: 100_000_000,
            rebalance_period: 100,
        };
        let width = selector.select_width(&ctx)?;
        assert!(width > 0);
        assert_eq!(width % 120, 0);
        Ok(())
    }

    #[test]
    fn test_optimized_width_goes_full_range_without_fees() -> Result<()> {
        let selector = OptimizedWidth::new(DistributionParams::new(0.0, 0.001)?, OptimizerConfig::default());
        let idle = pool(Q128);
        let ctx = WidthContext {
            block: 200,
            pool: &idle,
            reference_pool: Some(&idle),
            amount0: 1_000,
            amount1: 1_000,
            rebalance_period: 100,
        };
        assert_eq!(selector.select_width(&ctx)?, 0);
        Ok(())
    }

    #[test]
    fn test_optimized_width_needs_history() -> Result<()> {
        let selector = OptimizedWidth::new(DistributionParams::new(0.0, 0.001)?, OptimizerConfig::default());
        assert!(selector.needs_history());
        let pool = pool(U256::zero());
        let ctx = WidthContext {
            block: 5,
            pool: &pool,
            reference_pool: None,
            amount0: 1,
            amount1: 1,
            rebalance_period: 100,
        };
        assert!(matches!(selector.select_width(&ctx), Err(SimError::MarketState(_))));
        Ok(())
    }
}
