use clmm_math::MathError;
use range_model::ModelError;
use thiserror::Error;

/// Errors raised while driving a simulated position
#[derive(Error, Debug)]
pub enum SimError {
    /// Rejected simulator or market configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The widening fallback found no pair of initialized boundary ticks
    #[error("no initialized ticks around [{tick_lower}, {tick_upper}] after {attempts} widening attempts")]
    Convergence { attempts: u32, tick_lower: i32, tick_upper: i32 },

    /// The market provider could not serve the requested state
    #[error("market state unavailable: {0}")]
    MarketState(String),

    #[error("block {block} precedes the last processed block {last}")]
    OutOfOrderBlock { block: u64, last: u64 },

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
