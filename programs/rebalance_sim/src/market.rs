//! Venue state as seen by the simulator.
//!
//! A [`MarketStateProvider`] answers point-in-time queries for the pool and for individual
//! ticks. Historical replays, synthetic markets and test doubles all sit behind it.

use crate::errors::Result;
use clmm_math::fees::{fee_growth_inside, FeeGrowth};
use clmm_math::price::price_from_sqrt_price_x96;
use primitive_types::U256;
use range_model::market::MarketParams;

/// Pool state at one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    /// Active liquidity at the current tick
    pub liquidity: u128,
    pub fee_growth_global0_x128: U256,
    pub fee_growth_global1_x128: U256,
    /// Swap fee in hundredths of a basis point
    pub fee_pips: u32,
    pub tick_spacing: i32,
}

impl PoolState {
    pub fn fee_growth_global(&self) -> FeeGrowth {
        FeeGrowth::new(self.fee_growth_global0_x128, self.fee_growth_global1_x128)
    }

    /// Price of token0 in token1
    pub fn price(&self) -> f64 {
        price_from_sqrt_price_x96(self.sqrt_price_x96)
    }

    pub fn market_params(&self) -> Result<MarketParams> {
        Ok(MarketParams::new(self.fee_pips, self.tick_spacing, self.tick)?)
    }
}

/// Per-tick state at one block
///
/// Uninitialized ticks carry zero liquidity and zero outside growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInfo {
    pub initialized: bool,
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
    pub fee_growth_outside0_x128: U256,
    pub fee_growth_outside1_x128: U256,
}

impl TickInfo {
    pub fn fee_growth_outside(&self) -> FeeGrowth {
        FeeGrowth::new(self.fee_growth_outside0_x128, self.fee_growth_outside1_x128)
    }
}

/// Read-only access to historical or simulated venue state
pub trait MarketStateProvider {
    fn pool_state(&self, block: u64) -> Result<PoolState>;

    fn tick_info(&self, block: u64, tick: i32) -> Result<TickInfo>;
}

/// Pool state together with the boundary ticks of one range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub block_number: u64,
    pub pool: PoolState,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub tick_info_lower: TickInfo,
    pub tick_info_upper: TickInfo,
}

impl MarketSnapshot {
    pub fn fetch<P: MarketStateProvider + ?Sized>(
        provider: &P,
        block: u64,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Result<Self> {
        let pool = provider.pool_state(block)?;
        Self::with_pool(provider, block, pool, tick_lower, tick_upper)
    }

    /// Completes a snapshot around an already fetched pool state
    pub fn with_pool<P: MarketStateProvider + ?Sized>(
        provider: &P,
        block: u64,
        pool: PoolState,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Result<Self> {
        Ok(Self {
            block_number: block,
            pool,
            tick_lower,
            tick_upper,
            tick_info_lower: provider.tick_info(block, tick_lower)?,
            tick_info_upper: provider.tick_info(block, tick_upper)?,
        })
    }

    /// Fee growth per unit of liquidity accrued inside the range
    pub fn fee_growth_inside(&self) -> FeeGrowth {
        fee_growth_inside(
            self.pool.tick,
            self.tick_lower,
            self.tick_info_lower.fee_growth_outside(),
            self.tick_upper,
            self.tick_info_upper.fee_growth_outside(),
            self.pool.fee_growth_global(),
        )
    }
}
