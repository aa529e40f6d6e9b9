use clmm_math::MathError;
use thiserror::Error;

/// Errors raised by the valuation model, the width optimizer and parameter estimation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A model input is non-finite or outside its admissible domain
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("tick spacing must be positive, got {0}")]
    InvalidTickSpacing(i32),

    #[error("distribution fit needs at least {required} samples, got {provided}")]
    InsufficientSamples { required: usize, provided: usize },

    /// Price samples are not strictly increasing with a constant block spacing
    #[error("samples must be uniformly spaced: expected spacing {expected}, found {found} at block {block}")]
    NonUniformSampling { expected: u64, found: u64, block: u64 },

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, ModelError>;
