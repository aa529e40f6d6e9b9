//! Fee growth accounting.
//!
//! Pools track fees as Q128.128 growth per unit of liquidity. Accumulators are allowed to
//! overflow, so every difference here is taken modulo 2^256.

use crate::constants::Q128;
use crate::errors::Result;
use crate::full_math::{mul_div, to_u128};
use primitive_types::U256;

/// Fee growth accumulated for both tokens, in Q128.128 per unit of liquidity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeGrowth {
    pub token0: U256,
    pub token1: U256,
}

impl FeeGrowth {
    pub fn new(token0: U256, token1: U256) -> Self {
        Self { token0, token1 }
    }

    /// Component-wise difference modulo 2^256
    pub fn wrapping_sub(self, rhs: Self) -> Self {
        Self {
            token0: self.token0.overflowing_sub(rhs.token0).0,
            token1: self.token1.overflowing_sub(rhs.token1).0,
        }
    }
}

/// Fee growth inside [tick_lower, tick_upper] given the global accumulator and the
/// fee growth recorded outside each boundary tick
pub fn fee_growth_inside(
    tick_current: i32,
    tick_lower: i32,
    outside_lower: FeeGrowth,
    tick_upper: i32,
    outside_upper: FeeGrowth,
    global: FeeGrowth,
) -> FeeGrowth {
    let below = if tick_current >= tick_lower {
        outside_lower
    } else {
        global.wrapping_sub(outside_lower)
    };
    let above = if tick_current < tick_upper {
        outside_upper
    } else {
        global.wrapping_sub(outside_upper)
    };
    global.wrapping_sub(below).wrapping_sub(above)
}

/// Token amounts owed to `liquidity` for the growth between two fee-growth-inside checkpoints
pub fn fees_owed(liquidity: u128, inside_now: FeeGrowth, inside_last: FeeGrowth) -> Result<(u128, u128)> {
    let delta = inside_now.wrapping_sub(inside_last);
    let liquidity = U256::from(liquidity);
    let fees0 = to_u128(mul_div(delta.token0, liquidity, Q128)?)?;
    let fees1 = to_u128(mul_div(delta.token1, liquidity, Q128)?)?;
    Ok((fees0, fees1))
}
