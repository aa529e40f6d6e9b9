/// Liquidity Amounts
///
/// Conversions between a position's liquidity and the token amounts backing it over a
/// sqrt price range. All sqrt prices are Q64.96; amounts and liquidity are raw integer
/// token units. Intermediates are carried in 512 bits and results round down, so sizing
/// liquidity from amounts never asks for more tokens than supplied.
use crate::constants::Q96;
use crate::errors::{MathError, Result};
use crate::full_math::{mul_div, to_u128};
use primitive_types::U256;

/// Orders two sqrt price bounds so that the first is the lower one
#[inline(always)]
fn sorted(sqrt_price_a: U256, sqrt_price_b: U256) -> (U256, U256) {
    if sqrt_price_a > sqrt_price_b {
        (sqrt_price_b, sqrt_price_a)
    } else {
        (sqrt_price_a, sqrt_price_b)
    }
}

/// Calculates the amount of token0 backing `liquidity` between two sqrt prices
///
/// Formula: amount0 = L * 2^96 * (sqrt_b - sqrt_a) / sqrt_b / sqrt_a
///
/// # Arguments
/// * `sqrt_price_a` - One sqrt price bound in Q64.96 format
/// * `sqrt_price_b` - The other sqrt price bound in Q64.96 format
/// * `liquidity` - The amount of liquidity
///
/// # Returns
/// * `Result<u128>` - The amount of token0, rounded down
pub fn amount0_for_liquidity(sqrt_price_a: U256, sqrt_price_b: U256, liquidity: u128) -> Result<u128> {
    let (lower, upper) = sorted(sqrt_price_a, sqrt_price_b);
    if lower.is_zero() {
        return Err(MathError::DivisionByZero);
    }

    let numerator = U256::from(liquidity) << 96;
    let amount0 = mul_div(numerator, upper - lower, upper)? / lower;
    to_u128(amount0)
}

/// Calculates the amount of token1 backing `liquidity` between two sqrt prices
///
/// Formula: amount1 = L * (sqrt_b - sqrt_a) / 2^96
pub fn amount1_for_liquidity(sqrt_price_a: U256, sqrt_price_b: U256, liquidity: u128) -> Result<u128> {
    let (lower, upper) = sorted(sqrt_price_a, sqrt_price_b);
    to_u128(mul_div(U256::from(liquidity), upper - lower, Q96)?)
}

/// Calculates the token0/token1 split backing `liquidity` at the current price
///
/// amount0 covers the part of the range above the current price, amount1 the part below.
///
/// # Arguments
/// * `sqrt_price_current` - The current sqrt price in Q64.96 format
/// * `sqrt_price_lower` - The lower sqrt price bound in Q64.96 format
/// * `sqrt_price_upper` - The upper sqrt price bound in Q64.96 format
/// * `liquidity` - The amount of liquidity
///
/// # Returns
/// * `Result<(u128, u128)>` - The (amount0, amount1) pair, each rounded down
///
/// # Errors
/// * `InvalidPriceRange` - unless `sqrt_price_lower <= sqrt_price_current <= sqrt_price_upper`
pub fn amounts_for_liquidity(
    sqrt_price_current: U256,
    sqrt_price_lower: U256,
    sqrt_price_upper: U256,
    liquidity: u128,
) -> Result<(u128, u128)> {
    if !(sqrt_price_lower <= sqrt_price_current && sqrt_price_current <= sqrt_price_upper) {
        return Err(MathError::InvalidPriceRange {
            lower: sqrt_price_lower,
            current: sqrt_price_current,
            upper: sqrt_price_upper,
        });
    }

    let amount0 = amount0_for_liquidity(sqrt_price_current, sqrt_price_upper, liquidity)?;
    let amount1 = amount1_for_liquidity(sqrt_price_lower, sqrt_price_current, liquidity)?;
    Ok((amount0, amount1))
}

/// Calculates the liquidity supplied by `amount0` of token0 between two sqrt prices
///
/// Formula: L = amount0 * (sqrt_a * sqrt_b / 2^96) / (sqrt_b - sqrt_a)
///
/// # Errors
/// * `ZeroPriceRange` - if the bounds are equal and `amount0` is non-zero
pub fn liquidity_for_amount0(sqrt_price_a: U256, sqrt_price_b: U256, amount0: u128) -> Result<u128> {
    let (lower, upper) = sorted(sqrt_price_a, sqrt_price_b);
    if lower == upper {
        return if amount0 == 0 {
            Ok(0)
        } else {
            Err(MathError::ZeroPriceRange)
        };
    }

    let intermediate = mul_div(lower, upper, Q96)?;
    to_u128(mul_div(U256::from(amount0), intermediate, upper - lower)?)
}

/// Calculates the liquidity supplied by `amount1` of token1 between two sqrt prices
///
/// Formula: L = amount1 * 2^96 / (sqrt_b - sqrt_a)
pub fn liquidity_for_amount1(sqrt_price_a: U256, sqrt_price_b: U256, amount1: u128) -> Result<u128> {
    let (lower, upper) = sorted(sqrt_price_a, sqrt_price_b);
    if lower == upper {
        return if amount1 == 0 {
            Ok(0)
        } else {
            Err(MathError::ZeroPriceRange)
        };
    }

    to_u128(mul_div(U256::from(amount1), Q96, upper - lower)?)
}

/// Calculates the largest liquidity that both token amounts can back at the current price
///
/// - Current price at or below the range: only token0 is needed
/// - Current price at or above the range: only token1 is needed
/// - Current price inside the range: the minimum of the two single-sided solutions
///
/// # Arguments
/// * `sqrt_price_current` - The current sqrt price in Q64.96 format
/// * `sqrt_price_lower` - The lower sqrt price bound in Q64.96 format
/// * `sqrt_price_upper` - The upper sqrt price bound in Q64.96 format
/// * `amount0` - The available amount of token0
/// * `amount1` - The available amount of token1
pub fn liquidity_for_amounts(
    sqrt_price_current: U256,
    sqrt_price_lower: U256,
    sqrt_price_upper: U256,
    amount0: u128,
    amount1: u128,
) -> Result<u128> {
    let (lower, upper) = sorted(sqrt_price_lower, sqrt_price_upper);

    if sqrt_price_current <= lower {
        liquidity_for_amount0(lower, upper, amount0)
    } else if sqrt_price_current < upper {
        let liquidity0 = liquidity_for_amount0(sqrt_price_current, upper, amount0)?;
        let liquidity1 = liquidity_for_amount1(lower, sqrt_price_current, amount1)?;
        Ok(liquidity0.min(liquidity1))
    } else {
        liquidity_for_amount1(lower, upper, amount1)
    }
}
