//! Seeded synthetic pool for demos and backtests.
//!
//! The price follows a per-block geometric Brownian motion on the tick grid. Fees accrue to the
//! global accumulators at a fixed yield per unit of virtual liquidity, and tick outside growth
//! is derived from the path with the usual "all prior growth happened below" convention for
//! ticks at or below the starting price.

use crate::errors::{Result, SimError};
use crate::market::{MarketStateProvider, PoolState, TickInfo};
use clmm_math::constants::{LN_TICK_BASE, MAX_TICK, MIN_TICK, Q128};
use clmm_math::fees::FeeGrowth;
use clmm_math::full_math::{f64_to_u256, u256_to_f64};
use clmm_math::tick_math::sqrt_price_at_tick;
use primitive_types::U256;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticPoolConfig {
    pub seed: u64,
    pub start_block: u64,
    /// Number of blocks generated after `start_block`
    pub blocks: u64,
    pub initial_tick: i32,
    /// Log-price drift per block
    pub mu: f64,
    /// Log-price volatility per block
    pub sigma: f64,
    pub fee_pips: u32,
    pub tick_spacing: i32,
    pub pool_liquidity: u128,
    /// Fee yield per unit of virtual liquidity per block
    pub fee_yield_per_block: f64,
    /// Ticks on every `initialized_every`-th multiple of the spacing are initialized
    pub initialized_every: i32,
}

impl Default for SyntheticPoolConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_block: 1_000_000,
            blocks: 5_000,
            initial_tick: 0,
            mu: 0.0,
            sigma: 0.001,
            fee_pips: 3000,
            tick_spacing: 60,
            pool_liquidity: 1_000_000_000_000_000_000_000,
            fee_yield_per_block: 2e-5,
            initialized_every: 1,
        }
    }
}

impl SyntheticPoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_spacing <= 0 || self.initialized_every <= 0 {
            return Err(SimError::Configuration(
                "tick_spacing and initialized_every must be positive".to_string(),
            ));
        }
        if !(self.sigma.is_finite() && self.sigma >= 0.0 && self.mu.is_finite()) {
            return Err(SimError::Configuration(format!(
                "invalid price process mu={} sigma={}",
                self.mu, self.sigma
            )));
        }
        if !(self.fee_yield_per_block.is_finite() && self.fee_yield_per_block >= 0.0) {
            return Err(SimError::Configuration(format!(
                "invalid fee yield {}",
                self.fee_yield_per_block
            )));
        }
        if !(MIN_TICK..MAX_TICK).contains(&self.initial_tick) {
            return Err(SimError::Configuration(format!("initial tick {} out of range", self.initial_tick)));
        }
        if self.pool_liquidity == 0 {
            return Err(SimError::Configuration("pool_liquidity must be positive".to_string()));
        }
        Ok(())
    }
}

/// Pre-generated market path, queryable by block
#[derive(Debug, Clone)]
pub struct SyntheticPool {
    config: SyntheticPoolConfig,
    ticks: Vec<i32>,
    /// Global fee growth at each block
    fee_growth: Vec<FeeGrowth>,
    /// Growth accrued between block `i` and `i + 1`, at the price of block `i`
    accrued: Vec<FeeGrowth>,
}

impl SyntheticPool {
    pub fn generate(config: SyntheticPoolConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let normal = Normal::new(0.0, 1.0).map_err(|e| SimError::Configuration(e.to_string()))?;

        let len = config.blocks as usize + 1;
        let mut ticks = Vec::with_capacity(len);
        let mut fee_growth = Vec::with_capacity(len);
        let mut accrued = Vec::with_capacity(len);

        let drift = config.mu - config.sigma * config.sigma / 2.0;
        // Log price measured in ticks
        let mut position = config.initial_tick as f64;
        let mut global = FeeGrowth::default();
        for i in 0..len {
            let tick = (position.floor() as i32).clamp(MIN_TICK, MAX_TICK - 1);
            let growth = Self::growth_per_block(config.fee_yield_per_block, sqrt_price_at_tick(tick)?)?;

            ticks.push(tick);
            fee_growth.push(global);
            accrued.push(growth);

            if i + 1 < len {
                global = FeeGrowth::new(
                    global.token0.overflowing_add(growth.token0).0,
                    global.token1.overflowing_add(growth.token1).0,
                );
                let shock: f64 = normal.sample(&mut rng);
                position += (drift + config.sigma * shock) / LN_TICK_BASE;
            }
        }

        Ok(Self {
            config,
            ticks,
            fee_growth,
            accrued,
        })
    }

    /// Q128 growth per block for a yield of `fee_yield` on both sides of the virtual reserves
    fn growth_per_block(fee_yield: f64, sqrt_price_x96: U256) -> Result<FeeGrowth> {
        let sqrt_price = u256_to_f64(sqrt_price_x96) / 2f64.powi(96);
        let per_unit = fee_yield * u256_to_f64(Q128);
        Ok(FeeGrowth::new(
            f64_to_u256(per_unit / sqrt_price)?,
            f64_to_u256(per_unit * sqrt_price)?,
        ))
    }

    pub fn config(&self) -> &SyntheticPoolConfig {
        &self.config
    }

    pub fn blocks(&self) -> RangeInclusive<u64> {
        self.config.start_block..=self.config.start_block + self.config.blocks
    }

    pub fn tick_at(&self, block: u64) -> Result<i32> {
        Ok(self.ticks[self.index(block)?])
    }

    pub fn is_initialized(&self, tick: i32) -> bool {
        tick % (self.config.tick_spacing * self.config.initialized_every) == 0
    }

    fn index(&self, block: u64) -> Result<usize> {
        if !self.blocks().contains(&block) {
            return Err(SimError::MarketState(format!(
                "block {} outside synthetic range {:?}",
                block,
                self.blocks()
            )));
        }
        Ok((block - self.config.start_block) as usize)
    }

    /// Growth accrued while the price was below `tick`, up to block index `index`
    fn growth_below(&self, index: usize, tick: i32) -> FeeGrowth {
        let initial = if self.ticks[0] >= tick {
            self.fee_growth[0]
        } else {
            FeeGrowth::default()
        };
        self.ticks[..index]
            .iter()
            .zip(&self.accrued)
            .filter(|(t, _)| **t < tick)
            .fold(initial, |sum, (_, growth)| {
                FeeGrowth::new(
                    sum.token0.overflowing_add(growth.token0).0,
                    sum.token1.overflowing_add(growth.token1).0,
                )
            })
    }
}

impl MarketStateProvider for SyntheticPool {
    fn pool_state(&self, block: u64) -> Result<PoolState> {
        let index = self.index(block)?;
        let tick = self.ticks[index];
        let global = self.fee_growth[index];
        Ok(PoolState {
            sqrt_price_x96: sqrt_price_at_tick(tick)?,
            tick,
            liquidity: self.config.pool_liquidity,
            fee_growth_global0_x128: global.token0,
            fee_growth_global1_x128: global.token1,
            fee_pips: self.config.fee_pips,
            tick_spacing: self.config.tick_spacing,
        })
    }

    fn tick_info(&self, block: u64, tick: i32) -> Result<TickInfo> {
        let index = self.index(block)?;
        if !self.is_initialized(tick) {
            return Ok(TickInfo::default());
        }

        let below = self.growth_below(index, tick);
        let outside = if self.ticks[index] >= tick {
            below
        } else {
            self.fee_growth[index].wrapping_sub(below)
        };
        Ok(TickInfo {
            initialized: true,
            liquidity_gross: self.config.pool_liquidity,
            liquidity_net: 0,
            fee_growth_outside0_x128: outside.token0,
            fee_growth_outside1_x128: outside.token1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketSnapshot;
    use range_model::market::estimate_theta;

    fn pool(config: SyntheticPoolConfig) -> SyntheticPool {
        SyntheticPool::generate(config).unwrap()
    }

    #[test]
    fn test_same_seed_same_path() -> Result<()> {
        let a = pool(SyntheticPoolConfig::default());
        let b = pool(SyntheticPoolConfig::default());
        let c = pool(SyntheticPoolConfig { seed: 7, ..Default::default() });
        let blocks: Vec<u64> = a.blocks().step_by(250).collect();
        for block in &blocks {
            assert_eq!(a.pool_state(*block)?, b.pool_state(*block)?);
        }
        assert!(blocks.iter().any(|block| a.tick_at(*block).ok() != c.tick_at(*block).ok()));
        Ok(())
    }

    #[test]
    fn test_flat_market_recovers_fee_yield() -> Result<()> {
        let pool = pool(SyntheticPoolConfig {
            sigma: 0.0,
            initial_tick: 1200,
            blocks: 100,
            ..Default::default()
        });
        let start = pool.pool_state(1_000_000)?;
        let end = pool.pool_state(1_000_100)?;
        assert_eq!(end.tick, 1200);
        let theta = estimate_theta(start.fee_growth_global(), end.fee_growth_global(), end.sqrt_price_x96, 100)?;
        assert!((theta - 2e-5).abs() < 1e-12, "theta {theta}");
        Ok(())
    }

    #[test]
    fn test_in_range_position_earns_all_growth() -> Result<()> {
        let pool = pool(SyntheticPoolConfig {
            sigma: 0.0,
            blocks: 10,
            ..Default::default()
        });
        let first = MarketSnapshot::fetch(&pool, 1_000_000, -60, 60)?;
        let last = MarketSnapshot::fetch(&pool, 1_000_010, -60, 60)?;
        let inside = last.fee_growth_inside().wrapping_sub(first.fee_growth_inside());
        let global = last.pool.fee_growth_global().wrapping_sub(first.pool.fee_growth_global());
        assert_eq!(inside, global);

        // A range above the price earns nothing
        let first = MarketSnapshot::fetch(&pool, 1_000_000, 60, 120)?;
        let last = MarketSnapshot::fetch(&pool, 1_000_010, 60, 120)?;
        assert_eq!(last.fee_growth_inside().wrapping_sub(first.fee_growth_inside()), FeeGrowth::default());
        Ok(())
    }

    #[test]
    fn test_inside_growth_bounded_by_global_on_moving_path() -> Result<()> {
        let pool = pool(SyntheticPoolConfig {
            sigma: 0.002,
            blocks: 500,
            ..Default::default()
        });
        let start = MarketSnapshot::fetch(&pool, 1_000_000, -600, 600)?;
        let end = MarketSnapshot::fetch(&pool, 1_000_500, -600, 600)?;
        let inside = end.fee_growth_inside().wrapping_sub(start.fee_growth_inside());
        let global = end.pool.fee_growth_global().wrapping_sub(start.pool.fee_growth_global());
        assert!(inside.token0 <= global.token0);
        assert!(inside.token1 <= global.token1);
        Ok(())
    }

    #[test]
    fn test_initialized_tick_grid() -> Result<()> {
        let pool = pool(SyntheticPoolConfig {
            initialized_every: 4,
            blocks: 1,
            ..Default::default()
        });
        assert!(pool.tick_info(1_000_000, 240)?.initialized);
        assert!(pool.tick_info(1_000_000, -480)?.initialized);
        assert!(!pool.tick_info(1_000_000, 60)?.initialized);
        assert_eq!(pool.tick_info(1_000_000, 60)?, TickInfo::default());
        Ok(())
    }

    #[test]
    fn test_blocks_outside_path_rejected() {
        let pool = pool(SyntheticPoolConfig { blocks: 10, ..Default::default() });
        assert!(matches!(pool.pool_state(999_999), Err(SimError::MarketState(_))));
        assert!(matches!(pool.tick_info(1_000_011, 0), Err(SimError::MarketState(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        for config in [
            SyntheticPoolConfig { tick_spacing: 0, ..Default::default() },
            SyntheticPoolConfig { sigma: -1.0, ..Default::default() },
            SyntheticPoolConfig { fee_yield_per_block: f64::NAN, ..Default::default() },
            SyntheticPoolConfig { pool_liquidity: 0, ..Default::default() },
        ] {
            assert!(SyntheticPool::generate(config).is_err());
        }
    }
}
