/// Concentrated Liquidity Math Constants
///
/// This module defines the tick grid boundaries and fixed-point scales shared by the
/// tick, liquidity and fee arithmetic. The values follow the canonical 1.0001 tick grid
/// with sqrt prices carried in Q64.96 fixed point.
use primitive_types::U256;

/// The minimum tick index supported by the tick grid
///
/// Calculated as log_1.0001(2^-128). At this tick the price is approximately 2.9e-39.
pub const MIN_TICK: i32 = -887272;

/// The maximum tick index supported by the tick grid
///
/// Calculated as log_1.0001(2^128). At this tick the price is approximately 3.4e38.
pub const MAX_TICK: i32 = 887272;

/// Number of fractional bits in a Q64.96 sqrt price
pub const RESOLUTION: u32 = 96;

/// 1.0 in Q64.96 fixed point (2^96)
pub const Q96: U256 = U256([0, 0x1_0000_0000, 0, 0]);

/// 1.0 in Q128.128 fixed point (2^128), the scale of fee growth accumulators
pub const Q128: U256 = U256([0, 0, 1, 0]);

/// The sqrt price at MIN_TICK in Q64.96 (4295128739)
pub const MIN_SQRT_PRICE: U256 = U256([0x1_0002_76a3, 0, 0, 0]);

/// The sqrt price at MAX_TICK in Q64.96
///
/// Equals 1461446703485210103287273052203988822378723970342.
pub const MAX_SQRT_PRICE: U256 = U256([0x5d95_1d52_6398_8d26, 0xefd1_fc6a_5064_8849, 0xfffd_8963, 0]);

/// Natural log of the tick base, ln(1.0001)
///
/// One tick moves log-price by this amount; used to convert between tick counts and
/// log-price widths.
pub const LN_TICK_BASE: f64 = 9.999_500_033_329_732e-5;

/// Fee denominator for pool fees expressed in pips (hundredths of a basis point)
pub const FEE_PIPS_DENOMINATOR: u32 = 1_000_000;

/// Standard fee tiers (in pips) and their tick spacings
///
/// Low fee tier (0.05%)
pub const FEE_TIER_LOW: u32 = 500;
/// Tick spacing for the low fee tier
pub const TICK_SPACING_LOW: i32 = 10;

/// Medium fee tier (0.3%)
pub const FEE_TIER_MEDIUM: u32 = 3000;
/// Tick spacing for the medium fee tier
pub const TICK_SPACING_MEDIUM: i32 = 60;

/// High fee tier (1%)
pub const FEE_TIER_HIGH: u32 = 10000;
/// Tick spacing for the high fee tier
pub const TICK_SPACING_HIGH: i32 = 200;
