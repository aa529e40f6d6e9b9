//! GBM parameter fit from a price history.
//!
//! Log-price increments of a geometric Brownian motion are i.i.d. normal with mean
//! `(mu - sigma^2/2) t` and variance `sigma^2 t`, so a normal maximum-likelihood fit of the
//! increments recovers `mu` and `sigma` per block.

use crate::errors::{ModelError, Result};
use crate::valuation::DistributionParams;
use clmm_math::price::price_from_sqrt_price_x96;
use primitive_types::U256;
use tracing::debug;

pub const MIN_SAMPLES: usize = 3;

/// One observation of the pool price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSample {
    pub block_number: u64,
    pub sqrt_price_x96: U256,
}

/// Fits per-block drift and volatility to uniformly spaced price samples
///
/// # Errors
/// * `InsufficientSamples` - fewer than [`MIN_SAMPLES`] samples
/// * `NonUniformSampling` - block numbers not strictly increasing with a constant step
/// * `InvalidParameter` - a zero price, or a flat history with zero volatility
pub fn fit_distribution(samples: &[PriceSample]) -> Result<DistributionParams> {
    if samples.len() < MIN_SAMPLES {
        return Err(ModelError::InsufficientSamples {
            required: MIN_SAMPLES,
            provided: samples.len(),
        });
    }

    let spacing = samples[1].block_number.saturating_sub(samples[0].block_number);
    for pair in samples.windows(2) {
        let step = pair[1].block_number.saturating_sub(pair[0].block_number);
        if step == 0 || step != spacing {
            return Err(ModelError::NonUniformSampling {
                expected: spacing,
                found: step,
                block: pair[1].block_number,
            });
        }
    }

    let log_prices = samples
        .iter()
        .map(|sample| {
            let price = price_from_sqrt_price_x96(sample.sqrt_price_x96);
            if price > 0.0 && price.is_finite() {
                Ok(price.ln())
            } else {
                Err(ModelError::InvalidParameter { name: "price", value: price })
            }
        })
        .collect::<Result<Vec<f64>>>()?;

    let increments: Vec<f64> = log_prices.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let n = increments.len() as f64;
    let mean = increments.iter().sum::<f64>() / n;
    // MLE, population variance
    let variance = increments.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    let t = spacing as f64;
    let sigma = (variance / t).sqrt();
    let mu = mean / t + sigma * sigma / 2.0;
    debug!(samples = samples.len(), block_spacing = spacing, mu, sigma, "fitted log-price distribution");

    DistributionParams::new(mu, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_math::tick_math::sqrt_price_at_tick;

    fn samples_at_ticks(ticks: &[i32], spacing: u64) -> Vec<PriceSample> {
        ticks
            .iter()
            .enumerate()
            .map(|(i, tick)| PriceSample {
                block_number: 1_000 + i as u64 * spacing,
                sqrt_price_x96: sqrt_price_at_tick(*tick).unwrap(),
            })
            .collect()
    }

    #[test]
    fn test_alternating_path() -> Result<()> {
        // Increments of +-100 ticks: mean 0, std 100 ln(1.0001) per 10 blocks
        let samples = samples_at_ticks(&[0, 100, 0, 100, 0], 10);
        let params = fit_distribution(&samples)?;

        let step = 100.0 * clmm_math::constants::LN_TICK_BASE;
        let sigma = step / 10f64.sqrt();
        assert!((params.sigma - sigma).abs() < 1e-9);
        assert!((params.mu - sigma * sigma / 2.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_drifting_path_recovers_drift() -> Result<()> {
        let ticks: Vec<i32> = (0..50).map(|i| i * 20 + if i % 2 == 0 { 5 } else { -5 }).collect();
        let params = fit_distribution(&samples_at_ticks(&ticks, 1))?;
        let mean = (ticks[49] - ticks[0]) as f64 / 49.0 * clmm_math::constants::LN_TICK_BASE;
        assert!((params.mu - params.sigma.powi(2) / 2.0 - mean).abs() < 1e-4 * mean);
        Ok(())
    }

    #[test]
    fn test_too_few_samples() {
        let samples = samples_at_ticks(&[0, 1], 1);
        assert_eq!(
            fit_distribution(&samples),
            Err(ModelError::InsufficientSamples { required: 3, provided: 2 })
        );
    }

    #[test]
    fn test_non_uniform_spacing_rejected() {
        let mut samples = samples_at_ticks(&[0, 10, 20, 30], 5);
        samples[3].block_number += 1;
        assert_eq!(
            fit_distribution(&samples),
            Err(ModelError::NonUniformSampling {
                expected: 5,
                found: 6,
                block: samples[3].block_number,
            })
        );
    }

    #[test]
    fn test_unordered_blocks_rejected() {
        let mut samples = samples_at_ticks(&[0, 10, 20], 5);
        samples.swap(1, 2);
        assert!(matches!(
            fit_distribution(&samples),
            Err(ModelError::NonUniformSampling { .. })
        ));
    }

    #[test]
    fn test_flat_history_has_no_volatility() {
        let samples = samples_at_ticks(&[7, 7, 7, 7], 1);
        assert!(matches!(
            fit_distribution(&samples),
            Err(ModelError::InvalidParameter { name: "sigma", .. })
        ));
    }

    #[test]
    fn test_zero_price_rejected() {
        let mut samples = samples_at_ticks(&[0, 1, 2], 1);
        samples[1].sqrt_price_x96 = U256::zero();
        assert!(matches!(
            fit_distribution(&samples),
            Err(ModelError::InvalidParameter { name: "price", .. })
        ));
    }
}
