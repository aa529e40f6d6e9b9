//! Model inputs estimated from pool state.

use crate::errors::{ModelError, Result};
use clmm_math::constants::FEE_PIPS_DENOMINATOR;
use clmm_math::fees::FeeGrowth;
use clmm_math::full_math::u256_to_f64;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Venue parameters refreshed on every simulation step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    pub fee_rate: f64,
    pub tick_spacing: i32,
    pub current_tick: i32,
}

impl MarketParams {
    pub fn new(fee_pips: u32, tick_spacing: i32, current_tick: i32) -> Result<Self> {
        if tick_spacing <= 0 {
            return Err(ModelError::InvalidTickSpacing(tick_spacing));
        }
        Ok(Self {
            fee_rate: fee_rate(fee_pips)?,
            tick_spacing,
            current_tick,
        })
    }
}

/// Fee rate from a fee in hundredths of a basis point
pub fn fee_rate(fee_pips: u32) -> Result<f64> {
    if fee_pips >= FEE_PIPS_DENOMINATOR {
        return Err(ModelError::InvalidParameter {
            name: "fee_pips",
            value: fee_pips as f64,
        });
    }
    Ok(fee_pips as f64 / FEE_PIPS_DENOMINATOR as f64)
}

/// Average fee yield per unit of virtual liquidity per block over the last `tau` blocks
///
/// Each token's Q128 fee growth is converted into a yield on its side of the virtual
/// reserves and the two are averaged:
/// - token0: `dfg0 * sqrtP / (tau * 2^224)`
/// - token1: `dfg1 / (tau * sqrtP * 2^32)`
pub fn estimate_theta(start: FeeGrowth, end: FeeGrowth, sqrt_price_x96: U256, tau: u64) -> Result<f64> {
    if tau == 0 {
        return Err(ModelError::InvalidParameter { name: "tau", value: 0.0 });
    }
    if sqrt_price_x96.is_zero() {
        return Err(ModelError::InvalidParameter {
            name: "sqrt_price_x96",
            value: 0.0,
        });
    }

    let growth = end.wrapping_sub(start);
    let sqrt_price = u256_to_f64(sqrt_price_x96);
    let tau = tau as f64;

    let theta0 = u256_to_f64(growth.token0) * sqrt_price / (tau * 2f64.powi(224));
    let theta1 = u256_to_f64(growth.token1) / (tau * sqrt_price * 2f64.powi(32));
    Ok((theta0 + theta1) / 2.0)
}

/// Position size relative to the pool's active liquidity
///
/// Measured on the token1 leg when there is one, otherwise on the token0 leg.
pub fn relative_liquidity(amount0: u128, amount1: u128, pool_liquidity: u128, sqrt_price_x96: U256) -> Result<f64> {
    if pool_liquidity == 0 {
        return Err(ModelError::InvalidParameter {
            name: "pool_liquidity",
            value: 0.0,
        });
    }
    if sqrt_price_x96.is_zero() {
        return Err(ModelError::InvalidParameter {
            name: "sqrt_price_x96",
            value: 0.0,
        });
    }

    let liquidity = pool_liquidity as f64;
    let sqrt_price = u256_to_f64(sqrt_price_x96);
    let q96 = 2f64.powi(96);

    if amount1 > 0 {
        Ok(amount1 as f64 * q96 / (liquidity * sqrt_price))
    } else if amount0 > 0 {
        Ok(amount0 as f64 * sqrt_price / (liquidity * q96))
    } else {
        Err(ModelError::InvalidParameter { name: "amount", value: 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_math::constants::{Q128, Q96};

    #[test]
    fn test_fee_rate_tiers() -> Result<()> {
        assert_eq!(fee_rate(500)?, 0.0005);
        assert_eq!(fee_rate(3000)?, 0.003);
        assert_eq!(fee_rate(0)?, 0.0);
        assert!(fee_rate(1_000_000).is_err());
        Ok(())
    }

    #[test]
    fn test_theta_at_unit_price() -> Result<()> {
        // At price 1, growth of one token per unit of liquidity per block is a yield of 1
        let start = FeeGrowth::default();
        let end = FeeGrowth::new(Q128 * U256::from(100u64), Q128 * U256::from(300u64));
        let theta = estimate_theta(start, end, Q96, 100)?;
        assert!((theta - 2.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_theta_across_accumulator_wrap() -> Result<()> {
        let start = FeeGrowth::new(U256::MAX - Q128 + U256::one(), U256::zero());
        let end = FeeGrowth::new(Q128, U256::zero());
        let theta = estimate_theta(start, end, Q96, 2)?;
        // token0 growth of 2 over 2 blocks, token1 idle
        assert!((theta - 0.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_theta_rejects_degenerate_inputs() {
        let growth = FeeGrowth::default();
        assert!(estimate_theta(growth, growth, Q96, 0).is_err());
        assert!(estimate_theta(growth, growth, U256::zero(), 10).is_err());
    }

    #[test]
    fn test_relative_liquidity_prefers_token1() -> Result<()> {
        let el = relative_liquidity(1_000, 500, 10_000, Q96)?;
        assert!((el - 0.05).abs() < 1e-15);

        let el = relative_liquidity(1_000, 0, 10_000, Q96 * U256::from(2u64))?;
        assert!((el - 0.2).abs() < 1e-15);
        Ok(())
    }

    #[test]
    fn test_relative_liquidity_needs_an_amount() {
        assert!(relative_liquidity(0, 0, 10_000, Q96).is_err());
        assert!(relative_liquidity(1, 1, 0, Q96).is_err());
    }

    #[test]
    fn test_market_params() -> Result<()> {
        let params = MarketParams::new(3000, 60, -12)?;
        assert_eq!(params.fee_rate, 0.003);
        assert_eq!(MarketParams::new(3000, 0, 0), Err(ModelError::InvalidTickSpacing(0)));
        Ok(())
    }
}
