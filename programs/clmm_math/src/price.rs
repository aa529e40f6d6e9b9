//! Floating-point views of fixed-point prices.

use crate::constants::{LN_TICK_BASE, Q96};
use crate::full_math::u256_to_f64;
use primitive_types::U256;

/// sqrt(price) as a float from a Q64.96 sqrt price
#[inline(always)]
pub fn sqrt_price_x96_to_f64(sqrt_price_x96: U256) -> f64 {
    u256_to_f64(sqrt_price_x96) / u256_to_f64(Q96)
}

/// Price of token0 in units of token1 from a Q64.96 sqrt price
///
/// price = sqrt_price^2 / 2^192
pub fn price_from_sqrt_price_x96(sqrt_price_x96: U256) -> f64 {
    let sqrt_price = sqrt_price_x96_to_f64(sqrt_price_x96);
    sqrt_price * sqrt_price
}

/// Price at a tick, 1.0001^tick, evaluated in floating point
pub fn price_at_tick(tick: i32) -> f64 {
    (tick as f64 * LN_TICK_BASE).exp()
}
