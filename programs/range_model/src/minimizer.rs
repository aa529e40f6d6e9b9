//! Bounded one-dimensional minimization.
//!
//! The width optimizer only needs "find a local minimum of f on [lower, upper] starting near
//! x0". [`ScalarMinimizer`] is that seam; [`BrentMinimizer`] brackets the minimum by
//! geometric steps from the initial guess and then runs Brent's parabolic/golden-section
//! search inside the bracket.

use thiserror::Error;
use tracing::debug;

/// Closed search interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchBounds {
    pub lower: f64,
    pub upper: f64,
}

impl SearchBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    #[inline(always)]
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.lower, self.upper)
    }
}

/// A located minimum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    pub x: f64,
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinimizerFailure {
    #[error("empty or non-finite search interval [{lower}, {upper}]")]
    InvalidBounds { lower: f64, upper: f64 },

    #[error("objective is not finite at x = {x}")]
    NonFinite { x: f64 },

    #[error("no bracket found after {steps} expansion steps")]
    BracketNotFound { steps: usize },

    #[error("no convergence within {iterations} iterations")]
    IterationLimit { iterations: usize },
}

/// Minimizes a scalar objective over a closed interval
pub trait ScalarMinimizer {
    fn minimize(
        &self,
        objective: &mut dyn FnMut(f64) -> f64,
        initial: f64,
        bounds: SearchBounds,
    ) -> Result<Minimum, MinimizerFailure>;
}

/// Bracket-then-Brent minimizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrentMinimizer {
    /// Absolute tolerance on x
    pub tolerance: f64,
    /// Iteration budget for the Brent phase
    pub max_iterations: usize,
    /// Geometric factor used while bracketing
    pub growth: f64,
    /// Expansion budget for the bracketing phase
    pub max_expansions: usize,
}

impl Default for BrentMinimizer {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 500,
            growth: 2.0,
            max_expansions: 200,
        }
    }
}

// (3 - sqrt 5) / 2
const GOLDEN_SECTION: f64 = 0.381_966_011_250_105_1;

struct Counted<'a> {
    objective: &'a mut dyn FnMut(f64) -> f64,
    evaluations: usize,
}

impl Counted<'_> {
    fn eval(&mut self, x: f64) -> Result<f64, MinimizerFailure> {
        self.evaluations += 1;
        let value = (self.objective)(x);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(MinimizerFailure::NonFinite { x })
        }
    }
}

impl BrentMinimizer {
    /// Finds an interval inside `bounds` whose interior holds a local minimum
    ///
    /// Steps multiplicatively away from `x0` in the descending direction until the objective
    /// turns up again or the bound is reached.
    fn bracket(&self, f: &mut Counted<'_>, x0: f64, bounds: SearchBounds) -> Result<(f64, f64), MinimizerFailure> {
        let f0 = f.eval(x0)?;

        let up = bounds.clamp(x0 * self.growth);
        let f_up = f.eval(up)?;
        if f_up < f0 {
            let (mut previous, mut x, mut fx) = (x0, up, f_up);
            for _ in 0..self.max_expansions {
                if x >= bounds.upper {
                    return Ok((previous, bounds.upper));
                }
                let next = bounds.clamp(x * self.growth);
                let f_next = f.eval(next)?;
                if f_next >= fx {
                    return Ok((previous, next));
                }
                (previous, x, fx) = (x, next, f_next);
            }
            return Err(MinimizerFailure::BracketNotFound {
                steps: self.max_expansions,
            });
        }

        let down = bounds.clamp(x0 / self.growth);
        let f_down = f.eval(down)?;
        if f_down < f0 {
            let (mut previous, mut x, mut fx) = (x0, down, f_down);
            for _ in 0..self.max_expansions {
                if x <= bounds.lower {
                    return Ok((bounds.lower, previous));
                }
                let next = bounds.clamp(x / self.growth);
                let f_next = f.eval(next)?;
                if f_next >= fx {
                    return Ok((next, previous));
                }
                (previous, x, fx) = (x, next, f_next);
            }
            return Err(MinimizerFailure::BracketNotFound {
                steps: self.max_expansions,
            });
        }

        Ok((down, up))
    }

    /// Brent's localmin on `[a, b]`
    fn brent(&self, f: &mut Counted<'_>, mut a: f64, mut b: f64) -> Result<Minimum, MinimizerFailure> {
        let eps = f64::EPSILON.sqrt();
        let mut x = a + GOLDEN_SECTION * (b - a);
        let (mut w, mut v) = (x, x);
        let mut fx = f.eval(x)?;
        let (mut fw, mut fv) = (fx, fx);
        let (mut d, mut e) = (0.0_f64, 0.0_f64);

        for iteration in 0..self.max_iterations {
            let midpoint = 0.5 * (a + b);
            let tol = eps * x.abs() + self.tolerance;
            let tol2 = 2.0 * tol;

            if (x - midpoint).abs() <= tol2 - 0.5 * (b - a) {
                return Ok(Minimum {
                    x,
                    value: fx,
                    iterations: iteration,
                    evaluations: f.evaluations,
                });
            }

            let (mut p, mut q, mut r) = (0.0, 0.0, 0.0);
            if e.abs() > tol {
                // Parabola through x, w, v
                r = (x - w) * (fx - fv);
                q = (x - v) * (fx - fw);
                p = (x - v) * q - (x - w) * r;
                q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                } else {
                    q = -q;
                }
                r = e;
                e = d;
            }

            if p.abs() < (0.5 * q * r).abs() && p > q * (a - x) && p < q * (b - x) {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = if x < midpoint { tol } else { -tol };
                }
            } else {
                e = if x < midpoint { b - x } else { a - x };
                d = GOLDEN_SECTION * e;
            }

            let u = if d.abs() >= tol {
                x + d
            } else if d > 0.0 {
                x + tol
            } else {
                x - tol
            };
            let fu = f.eval(u)?;

            if fu <= fx {
                if u < x {
                    b = x;
                } else {
                    a = x;
                }
                (v, fv) = (w, fw);
                (w, fw) = (x, fx);
                (x, fx) = (u, fu);
            } else {
                if u < x {
                    a = u;
                } else {
                    b = u;
                }
                if fu <= fw || w == x {
                    (v, fv) = (w, fw);
                    (w, fw) = (u, fu);
                } else if fu <= fv || v == x || v == w {
                    (v, fv) = (u, fu);
                }
            }
        }

        Err(MinimizerFailure::IterationLimit {
            iterations: self.max_iterations,
        })
    }
}

impl ScalarMinimizer for BrentMinimizer {
    fn minimize(
        &self,
        objective: &mut dyn FnMut(f64) -> f64,
        initial: f64,
        bounds: SearchBounds,
    ) -> Result<Minimum, MinimizerFailure> {
        if !(bounds.lower.is_finite() && bounds.upper.is_finite() && bounds.lower < bounds.upper) {
            return Err(MinimizerFailure::InvalidBounds {
                lower: bounds.lower,
                upper: bounds.upper,
            });
        }

        let mut counted = Counted {
            objective,
            evaluations: 0,
        };
        let x0 = if initial.is_finite() {
            bounds.clamp(initial)
        } else {
            bounds.lower
        };

        let (a, b) = self.bracket(&mut counted, x0, bounds)?;
        debug!(x0, bracket_lower = a, bracket_upper = b, "bracketed minimum");
        self.brent(&mut counted, a, b)
    }
}
