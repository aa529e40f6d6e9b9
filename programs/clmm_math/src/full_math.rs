//! 512-bit intermediate multiply-divide helpers.
//!
//! Amount and liquidity formulas multiply a 224-bit scaled liquidity by a 160-bit sqrt price
//! difference, which overflows 256 bits. Products are therefore carried in `U512` and only
//! narrowed once divided.

use crate::errors::{MathError, Result};
use primitive_types::{U256, U512};

/// Narrows a 512-bit value, failing when any of the upper four limbs is set
#[inline(always)]
fn narrow(x: U512) -> Result<U256> {
    let U512(limbs) = x;
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return Err(MathError::MathOverflow);
    }
    Ok(U256([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

/// Calculates floor(a * b / denominator) with a full 512-bit intermediate
///
/// # Errors
/// * `DivisionByZero` - if `denominator` is zero
/// * `MathOverflow` - if the quotient does not fit in 256 bits
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    narrow(a.full_mul(b) / U512::from(denominator))
}

/// Calculates ceil(a * b / denominator) with a full 512-bit intermediate
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.full_mul(b);
    let denominator = U512::from(denominator);
    let quotient = narrow(product / denominator)?;
    if (product % denominator).is_zero() {
        Ok(quotient)
    } else {
        quotient.checked_add(U256::one()).ok_or(MathError::MathOverflow)
    }
}

/// Narrows a U256 into a u128, failing on overflow instead of truncating
#[inline(always)]
pub fn to_u128(x: U256) -> Result<u128> {
    if x.bits() > 128 {
        return Err(MathError::MathOverflow);
    }
    Ok(x.low_u128())
}

/// Converts a U256 into the nearest f64
///
/// Used as the bridge from fixed-point pool state into the floating-point valuation model.
pub fn u256_to_f64(x: U256) -> f64 {
    let U256(limbs) = x;
    limbs
        .iter()
        .rev()
        .fold(0.0_f64, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}

/// Converts a non-negative finite f64 into a U256, truncating the fractional part
///
/// # Errors
/// * `MathOverflow` - if the value is negative, non-finite or at least 2^256
pub fn f64_to_u256(x: f64) -> Result<U256> {
    if !x.is_finite() || x < 0.0 || x >= 2f64.powi(256) {
        return Err(MathError::MathOverflow);
    }
    let mut limbs = [0u64; 4];
    let mut rest = x.trunc();
    for (i, limb) in limbs.iter_mut().enumerate().rev() {
        let base = 2f64.powi(64 * i as i32);
        let digit = (rest / base).floor();
        *limb = digit as u64;
        rest -= digit * base;
    }
    Ok(U256(limbs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_uses_wide_intermediate() -> Result<()> {
        // (2^255 * 4) / 8 overflows 256 bits before the division
        let a = U256::one() << 255;
        assert_eq!(mul_div(a, U256::from(4u64), U256::from(8u64))?, U256::one() << 254);
        assert_eq!(mul_div(a, a, U256::one()), Err(MathError::MathOverflow));
        assert_eq!(mul_div(a, a, U256::zero()), Err(MathError::DivisionByZero));
        Ok(())
    }

    #[test]
    fn test_mul_div_rounding_up() -> Result<()> {
        assert_eq!(mul_div_rounding_up(U256::from(7u64), U256::from(3u64), U256::from(2u64))?, U256::from(11u64));
        assert_eq!(mul_div_rounding_up(U256::from(8u64), U256::from(3u64), U256::from(2u64))?, U256::from(12u64));
        Ok(())
    }

    #[test]
    fn test_to_u128_bounds() {
        assert_eq!(to_u128(U256::from(u128::MAX)), Ok(u128::MAX));
        assert_eq!(to_u128(U256::from(u128::MAX) + U256::one()), Err(MathError::MathOverflow));
    }

    #[test]
    fn test_float_conversions() -> Result<()> {
        assert_eq!(u256_to_f64(U256::one() << 200), 2f64.powi(200));
        assert_eq!(f64_to_u256(2f64.powi(200))?, U256::one() << 200);
        assert_eq!(f64_to_u256(12345.9)?, U256::from(12345u64));
        assert_eq!(f64_to_u256(3.0 * 2f64.powi(130))?, U256::from(3u64) << 130);
        assert!(f64_to_u256(-1.0).is_err());
        assert!(f64_to_u256(f64::NAN).is_err());
        assert!(f64_to_u256(2f64.powi(256)).is_err());
        Ok(())
    }
}
