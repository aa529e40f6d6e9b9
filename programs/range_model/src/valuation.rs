//! Expected end-of-period value of a symmetric concentrated-liquidity position.
//!
//! The log-price follows a geometric Brownian motion with drift `mu` and volatility `sigma`
//! per block. A position is opened over the log-price band `[-delta, delta]` around the
//! current price and rebalanced back to the centre after `tau` blocks. Two quantities are
//! priced, each per unit of deposit value:
//!
//! - [`rho`]: the principal left after the rebalance, net of the swap fee and slippage paid
//!   to restore a 50/50 split
//! - [`psi`]: the fees accumulated while the price stayed inside the band
//!
//! Their sum is 1 for a zero-length period.

use crate::errors::{ModelError, Result};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Default number of Simpson panels for [`PsiMethod::Quadrature`]
pub const DEFAULT_QUADRATURE_PANELS: u32 = 200;

/// Log-price drift and volatility per block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionParams {
    pub mu: f64,
    pub sigma: f64,
}

impl DistributionParams {
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        check_finite("mu", mu)?;
        check_positive("sigma", sigma)?;
        Ok(Self { mu, sigma })
    }
}

/// How the fee integral inside [`psi`] is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsiMethod {
    /// Erf approximation that drops the O(sigma^2 tau) drift terms
    #[default]
    ClosedForm,
    /// Composite Simpson rule over `[0, tau]` on the full in-range probability
    Quadrature { panels: u32 },
}

/// Validated inputs of one valuation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationInputs {
    /// Half-width of the range in log-price
    pub delta: f64,
    pub mu: f64,
    pub sigma: f64,
    /// Rebalance period in blocks
    pub tau: f64,
    /// Pool fee rate paid on the rebalancing swap
    pub ef: f64,
    /// Position liquidity relative to the pool's
    pub el: f64,
    /// Fee yield per unit of virtual liquidity per block
    pub theta: f64,
}

impl ValuationInputs {
    /// Checks every input against its domain
    ///
    /// # Errors
    /// * `InvalidParameter` - for a non-finite value, `delta <= 0`, `sigma <= 0`, `tau <= 0`,
    ///   `el < 0`, `theta < 0` or `ef` outside `[0, 1)`
    pub fn new(delta: f64, params: DistributionParams, tau: f64, ef: f64, el: f64, theta: f64) -> Result<Self> {
        check_positive("delta", delta)?;
        check_finite("mu", params.mu)?;
        check_positive("sigma", params.sigma)?;
        check_positive("tau", tau)?;
        check_finite("ef", ef)?;
        if !(0.0..1.0).contains(&ef) {
            return Err(ModelError::InvalidParameter { name: "ef", value: ef });
        }
        check_non_negative("el", el)?;
        check_non_negative("theta", theta)?;

        Ok(Self {
            delta,
            mu: params.mu,
            sigma: params.sigma,
            tau,
            ef,
            el,
            theta,
        })
    }

    /// Same inputs evaluated at a different half-width
    ///
    /// The optimizer walks `delta` while every other input stays fixed, so only `delta` is
    /// re-checked here.
    pub fn with_delta(&self, delta: f64) -> Result<Self> {
        check_positive("delta", delta)?;
        Ok(Self { delta, ..*self })
    }

    /// Expected principal per unit of deposit value
    pub fn rho(&self) -> f64 {
        let g = Moments::at(self.mu, self.sigma, self.tau, self.delta);
        let (s, m, mp, dp, dm) = (g.s, g.m, g.mp, g.dp, g.dm);
        let half = self.delta / 2.0;
        let e = half.exp();
        let e_minus_one = half.exp_m1();
        let one_minus_inv_e = -(-half).exp_m1();
        let em = m.exp();

        // Principal before the rebalance. Mass outside the band is held entirely in one token.
        let outside = em * norm_cdf(dm - s) + norm_cdf(-dp);
        let rho_1a = (1.0 + e) * outside;
        let rho_1b = 2.0 * ((m - s * s / 4.0) / 2.0).exp() / one_minus_inv_e
            * (norm_cdf(dp - s / 2.0) - norm_cdf(dm - s / 2.0));
        let rho_1c = -(norm_cdf(dp) - norm_cdf(dm) + em * (norm_cdf(dp - s) - norm_cdf(dm - s))) / e_minus_one;

        // Swap fee paid on the rebalance
        let rho_2a = -(self.ef / 2.0) * (1.0 + e) * outside;
        let rho_2b = -(self.ef / 2.0) / e_minus_one
            * (em * norm_cdf(dp - s) + norm_cdf(dm - s) - 2.0 * norm_cdf(-mp / s - s) + 2.0 * norm_cdf(-mp / s)
                - norm_cdf(dp)
                - norm_cdf(dm));

        // Slippage lost on the rebalance
        let growth = ((m + 3.0 * s * s / 4.0) / 2.0).exp();
        let rho_3a = -(self.el / 4.0)
            * (e + 1.0).powi(2)
            * growth
            * ((-m).exp() * norm_cdf(-dp - s / 2.0) + em * norm_cdf(dm - 1.5 * s));
        let rho_3b = -(self.el / 4.0) * growth / e_minus_one.powi(2)
            * (em * (norm_cdf(dp - 1.5 * s) - norm_cdf(dm - 1.5 * s))
                + (-m).exp() * (norm_cdf(dp + s / 2.0) - norm_cdf(dm + s / 2.0)));
        let rho_3c = (self.el / 2.0) * ((m - s * s / 4.0) / 2.0).exp() / e_minus_one.powi(2)
            * (norm_cdf(dp - s / 2.0) - norm_cdf(dm - s / 2.0));

        let per_amount1 = rho_1a + rho_1b + rho_1c + rho_2a + rho_2b + rho_3a + rho_3b + rho_3c;
        // The deposit is worth twice its token1 leg
        per_amount1 / 2.0
    }

    /// Expected accumulated fees per unit of deposit value
    pub fn psi(&self, method: PsiMethod) -> f64 {
        let integral = match method {
            PsiMethod::ClosedForm => self.fee_integral_closed_form(),
            PsiMethod::Quadrature { panels } => self.fee_integral_quadrature(panels),
        };
        let factor = self.theta / (-(-self.delta / 2.0).exp_m1() + self.el);
        factor * integral / 2.0
    }

    /// `rho + psi`
    pub fn expected_value(&self, method: PsiMethod) -> f64 {
        self.rho() + self.psi(method)
    }

    fn fee_integral_closed_form(&self) -> f64 {
        let c = self.delta / self.sigma;
        let sqrt_tau = self.tau.sqrt();
        let a = c / sqrt_tau;
        // (c^2 + tau) erf(a/sqrt2) - c^2, rearranged around erfc to avoid cancelling two large terms
        let in_range_time = self.tau - (c * c + self.tau) * erfc(a * FRAC_1_SQRT_2)
            + (2.0 / PI).sqrt() * c * sqrt_tau * (-a * a / 2.0).exp();
        in_range_time.max(0.0) * (1.0 + (self.mu * self.tau).exp())
    }

    fn fee_integral_quadrature(&self, panels: u32) -> f64 {
        let panels = panels.max(2);
        let panels = panels + panels % 2;
        let h = self.tau / panels as f64;
        // Fees are sold at the end of the period, so the drift factor uses the full tau
        let em = (self.mu * self.tau).exp();

        let integrand = |t: f64| -> f64 {
            if t <= 0.0 {
                return 1.0 + em;
            }
            let g = Moments::at(self.mu, self.sigma, t, self.delta);
            norm_cdf(g.dp) - norm_cdf(g.dm) + em * (norm_cdf(g.dp - g.s) - norm_cdf(g.dm - g.s))
        };

        let interior: f64 = (1..panels)
            .map(|i| {
                let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
                weight * integrand(i as f64 * h)
            })
            .sum();
        (integrand(0.0) + interior + integrand(self.tau)) * h / 3.0
    }
}

/// GBM moments over a horizon of `tau` blocks
struct Moments {
    s: f64,
    m: f64,
    mp: f64,
    dp: f64,
    dm: f64,
}

impl Moments {
    #[inline(always)]
    fn at(mu: f64, sigma: f64, tau: f64, delta: f64) -> Self {
        let s = sigma * tau.sqrt();
        let mp = (mu - sigma * sigma / 2.0) * tau;
        Self {
            s,
            m: mu * tau,
            mp,
            dp: (delta - mp) / s,
            dm: (-delta - mp) / s,
        }
    }
}

/// Standard normal cumulative distribution function
#[inline(always)]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x * FRAC_1_SQRT_2)
}

/// Expected principal per unit of deposit value for half-width `delta`
pub fn rho(delta: f64, mu: f64, sigma: f64, tau: f64, ef: f64, el: f64) -> Result<f64> {
    let params = DistributionParams { mu, sigma };
    Ok(ValuationInputs::new(delta, params, tau, ef, el, 0.0)?.rho())
}

/// Expected fees per unit of deposit value for half-width `delta`, closed form
pub fn psi(delta: f64, mu: f64, sigma: f64, tau: f64, theta: f64, el: f64) -> Result<f64> {
    psi_with(PsiMethod::ClosedForm, delta, mu, sigma, tau, theta, el)
}

/// [`psi`] with an explicit integration method
pub fn psi_with(method: PsiMethod, delta: f64, mu: f64, sigma: f64, tau: f64, theta: f64, el: f64) -> Result<f64> {
    let params = DistributionParams { mu, sigma };
    Ok(ValuationInputs::new(delta, params, tau, 0.0, el, theta)?.psi(method))
}

fn check_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter { name, value })
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter { name, value })
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter { name, value })
    }
}
