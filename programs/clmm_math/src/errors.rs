/// Concentrated Liquidity Math Error Definitions
///
/// Every failure in this crate is a domain error: the caller supplied a tick, price or
/// amount the arithmetic cannot represent. None of them are retried.
use primitive_types::U256;
use thiserror::Error;

/// Error codes for tick, sqrt price and liquidity arithmetic
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    /// Returned when a tick lies outside [MIN_TICK, MAX_TICK]
    #[error("tick {tick} outside valid range [-887272, 887272]")]
    TickOutOfBounds { tick: i32 },

    /// Returned when a sqrt price lies outside [MIN_SQRT_PRICE, MAX_SQRT_PRICE]
    #[error("sqrt price {sqrt_price} outside the representable tick range")]
    SqrtPriceOutOfRange { sqrt_price: U256 },

    /// Returned when the current sqrt price is not inside [lower, upper] or lower > upper
    ///
    /// This error occurs when:
    /// - The lower bound is greater than the upper bound
    /// - An in-range computation is asked for a price outside the range
    #[error("invalid price range: lower {lower}, current {current}, upper {upper}")]
    InvalidPriceRange {
        lower: U256,
        current: U256,
        upper: U256,
    },

    /// Returned when a non-zero amount is sized against a zero-width range
    #[error("price range has zero width")]
    ZeroPriceRange,

    /// Returned when a fixed-point division has a zero denominator
    #[error("division by zero")]
    DivisionByZero,

    /// Returned when a result does not fit its output type
    #[error("arithmetic overflow")]
    MathOverflow,
}

pub type Result<T> = std::result::Result<T, MathError>;
