/// Tick Math
///
/// Conversions between tick indices and Q64.96 sqrt prices on the 1.0001 tick grid, plus
/// helpers for snapping ticks onto a pool's tick spacing.
///
/// The sqrt price is computed as a product of precomputed Q128.128 factors
/// 1/sqrt(1.0001)^(2^i), one per set bit of |tick|, then inverted for positive ticks and
/// rounded up into Q64.96. The product never exceeds 2^128 so every step fits in a U256.
use crate::constants::*;
use crate::errors::{MathError, Result};
use primitive_types::U256;

/// 1/sqrt(1.0001)^(2^i) in Q128.128 for i in 0..20
///
/// Bit 0 is handled separately since its factor replaces the initial 1.0.
const RATIO_FACTORS: [u128; 20] = [
    0xfffcb933bd6fad37aa2d162d1a594001, // bit 0 → 2⁰
    0xfff97272373d413259a46990580e213a, // bit 1 → 2¹
    0xfff2e50f5f656932ef12357cf3c7fdcc, // bit 2 → 2²
    0xffe5caca7e10e4e61c3624eaa0941cd0, // bit 3 → 2³
    0xffcb9843d60f6159c9db58835c926644, // bit 4 → 2⁴
    0xff973b41fa98c081472e6896dfb254c0, // bit 5 → 2⁵
    0xff2ea16466c96a3843ec78b326b52861, // bit 6 → 2⁶
    0xfe5dee046a99a2a811c461f1969c3053, // bit 7 → 2⁷
    0xfcbe86c7900a88aedcffc83b479aa3a4, // bit 8 → 2⁸
    0xf987a7253ac413176f2b074cf7815e54, // bit 9 → 2⁹
    0xf3392b0822b70005940c7a398e4b70f3, // bit 10 → 2¹⁰
    0xe7159475a2c29b7443b29c7fa6e889d9, // bit 11 → 2¹¹
    0xd097f3bdfd2022b8845ad8f792aa5825, // bit 12 → 2¹²
    0xa9f746462d870fdf8a65dc1f90e061e5, // bit 13 → 2¹³
    0x70d869a156d2a1b890bb3df62baf32f7, // bit 14 → 2¹⁴
    0x31be135f97d08fd981231505542fcfa6, // bit 15 → 2¹⁵
    0x09aa508b5b7a84e1c677de54f3e99bc9, // bit 16 → 2¹⁶
    0x005d6af8dedb81196699c329225ee604, // bit 17 → 2¹⁷
    0x00002216e584f5fa1ea926041bedfe98, // bit 18 → 2¹⁸
    0x0000000048a170391f7dc42444e8fa2, // bit 19 → 2¹⁹
];

/// Converts a tick index to its sqrt price in Q64.96 fixed-point format
///
/// Computes sqrt(1.0001^tick) * 2^96, rounded up. The mapping is strictly increasing over
/// [MIN_TICK, MAX_TICK] and `sqrt_price_at_tick(0) == 2^96` exactly.
///
/// # Arguments
/// * `tick` - The tick index to convert
///
/// # Returns
/// * `Result<U256>` - The sqrt price in Q64.96 format
///
/// # Errors
/// * `TickOutOfBounds` - if the tick lies outside [MIN_TICK, MAX_TICK]
///
/// # Example
/// ```
/// use clmm_math::tick_math::sqrt_price_at_tick;
/// use clmm_math::constants::Q96;
/// assert_eq!(sqrt_price_at_tick(0).unwrap(), Q96);
/// ```
pub fn sqrt_price_at_tick(tick: i32) -> Result<U256> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(MathError::TickOutOfBounds { tick });
    }

    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        U256::from(RATIO_FACTORS[0])
    } else {
        Q128
    };
    for (bit, factor) in RATIO_FACTORS.iter().enumerate().skip(1) {
        if abs_tick & (1 << bit) != 0 {
            ratio = (ratio * U256::from(*factor)) >> 128;
        }
    }

    // The factors describe negative ticks; positive ticks take the reciprocal
    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 → Q64.96, rounding up so the tick → price mapping stays injective
    let remainder = ratio & U256::from(u32::MAX);
    let sqrt_price = (ratio >> 32) + if remainder.is_zero() { 0 } else { 1 };
    Ok(sqrt_price)
}

/// Converts a Q64.96 sqrt price to the greatest tick whose sqrt price is <= the input
///
/// # Arguments
/// * `sqrt_price` - The sqrt price in Q64.96 format
///
/// # Returns
/// * `Result<i32>` - The floor tick for the given sqrt price
///
/// # Errors
/// * `SqrtPriceOutOfRange` - if the price lies outside [MIN_SQRT_PRICE, MAX_SQRT_PRICE]
pub fn tick_at_sqrt_price(sqrt_price: U256) -> Result<i32> {
    if sqrt_price < MIN_SQRT_PRICE || sqrt_price > MAX_SQRT_PRICE {
        return Err(MathError::SqrtPriceOutOfRange { sqrt_price });
    }
    if sqrt_price == Q96 {
        return Ok(0);
    }

    // Binary search for the largest tick `i` such that sqrt_price_at_tick(i) <= sqrt_price
    let mut low = MIN_TICK;
    let mut high = MAX_TICK;
    let mut ans = MIN_TICK;

    while low <= high {
        let mid = low + (high - low) / 2;
        if sqrt_price_at_tick(mid)? <= sqrt_price {
            ans = mid;
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }

    Ok(ans)
}

/// Largest tick usable by a pool with the given spacing
///
/// Full-range positions span [-max_usable_tick, max_usable_tick].
pub fn max_usable_tick(tick_spacing: i32) -> Result<i32> {
    if tick_spacing <= 0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(MAX_TICK - MAX_TICK % tick_spacing)
}

/// Snaps a tick onto the nearest multiple of `tick_spacing`
///
/// Remainders of at least half a spacing round up, smaller ones round down. The result is
/// clamped to the usable range.
pub fn nearest_usable_tick(tick: i32, tick_spacing: i32) -> Result<i32> {
    let max_tick = max_usable_tick(tick_spacing)?;
    let remainder = tick.rem_euclid(tick_spacing);
    let rounded = if remainder == 0 {
        tick
    } else if remainder < tick_spacing / 2 {
        tick - remainder
    } else {
        tick + (tick_spacing - remainder)
    };
    Ok(rounded.clamp(-max_tick, max_tick))
}

/// Converts a log-price distance into a (fractional) number of ticks
#[inline(always)]
pub fn ticks_for_log_price(log_price: f64) -> f64 {
    log_price / LN_TICK_BASE
}

/// Converts a number of ticks into a log-price distance
#[inline(always)]
pub fn log_price_for_ticks(ticks: f64) -> f64 {
    ticks * LN_TICK_BASE
}
