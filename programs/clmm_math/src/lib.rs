//! Concentrated liquidity math.
//!
//! Pure conversions used by the range optimizer and the rebalance simulator:
//! - tick ↔ Q64.96 sqrt price on the 1.0001 grid ([`tick_math`])
//! - liquidity ↔ token amounts over a price range ([`liquidity_amounts`])
//! - fee growth inside a range and fees owed ([`fees`])
//! - float views of fixed-point prices ([`price`])
//!
//! Nothing here holds state; every function is referentially transparent.

// Modules for constants, errors and 512-bit helpers
pub mod constants;
pub mod errors;
pub mod full_math;

// Tick, liquidity and fee arithmetic
pub mod fees;
pub mod liquidity_amounts;
pub mod price;
pub mod tick_math;

pub use errors::MathError;
pub use primitive_types::U256;

#[cfg(test)]
pub mod unit_test;
