// SPDX-License-Identifier: AGPL-3.0-only

//! Optimal rational approximation of x^{-1/2} in partial-fraction form.
//!
//!   x^{-1/2} ≈ a0 + Σ_k r_k / (x + p_k),   x ∈ [lo, hi]
//!
//! Coefficients come from Zolotarev's closed-form solution of the minimax
//! problem. With y = x/lo ∈ [1, b], b = hi/lo, the type-(n, n) optimum is
//!
//!   R(y) = D ∏_l (y + c_{2l}) / ∏_l (y + c_{2l−1}),
//!   c_l = sn²(l K'/(2n+1); κ') / cn²(l K'/(2n+1); κ'),   κ' = √(1 − 1/b)
//!
//! where K' is the complete elliptic integral at κ'. The normalization D is
//! fixed by locating the extrema of √y ∏(y+z)/∏(y+p) (log grid, then
//! golden-section refinement). Only the n + 1 highest maxima and n + 1
//! lowest minima of the grid are refined, the 2n + 2 alternation points of
//! the optimum; once g is flat to rounding the remaining sign flips are
//! noise. Each refinement step is one iteration against the
//! `max_iterations` budget. The reported error is clamped to
//! [`ERROR_FLOOR`]. The result is a pure function of its inputs.
//!
//! All poles and residues are positive, so every shifted system
//! (M + p_k) stays Hermitian positive definite.
//!
//! # References
//!
//! - Zolotarev (1877); Akhiezer, "Theory of Approximation" (1956)
//! - Chiu, Hsieh, Huang, Huang, PRD 66, 114502 (2002) — Zolotarev for lattice QCD
//! - Abramowitz & Stegun 16.4 — Jacobi functions by descending Landen / AGM

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApproximationError;

/// Points per pole of the log-spaced extremum search grid.
const GRID_POINTS_PER_TERM: usize = 64;

/// Golden-section stops when the log-y bracket is narrower than this.
const GOLDEN_BRACKET: f64 = 1e-6;

/// Candidates closer than this many grid points to an accepted extremum
/// of the same kind sit on the same peak.
const EXTREMUM_SEPARATION: usize = GRID_POINTS_PER_TERM / 8;

/// Smallest relative error a fit reports. Below it the spread of g is
/// rounding in the 2n-factor product, which does not shrink with degree.
pub const ERROR_FLOOR: f64 = 64.0 * f64::EPSILON;

/// AGM terminates once |c_n| drops below this.
const AGM_EPSILON: f64 = 1e-16;

/// Hard cap on AGM steps; convergence is quadratic, so 64 is never reached.
const AGM_MAX_STEPS: usize = 64;

/// Rational exponent `numerator / denominator` of the target function x^e.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exponent {
    pub numerator: i32,
    pub denominator: u32,
}

impl Exponent {
    /// x^{-1/2}
    pub const INVERSE_SQRT: Self = Self {
        numerator: -1,
        denominator: 2,
    };

    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

/// Approximation interval [lo, hi] with 0 < lo < hi.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpectralBounds {
    lo: f64,
    hi: f64,
}

impl SpectralBounds {
    pub fn new(lo: f64, hi: f64) -> Result<Self, ApproximationError> {
        if lo > 0.0 && hi > lo && hi.is_finite() {
            Ok(Self { lo, hi })
        } else {
            Err(ApproximationError::InvalidBounds { lo, hi })
        }
    }

    #[must_use]
    pub const fn lo(&self) -> f64 {
        self.lo
    }

    #[must_use]
    pub const fn hi(&self) -> f64 {
        self.hi
    }

    /// Whether [a, b] lies inside the bounds.
    #[must_use]
    pub fn covers(&self, a: f64, b: f64) -> bool {
        self.lo <= a && b <= self.hi
    }
}

/// Parameters of a rational fit. Immutable once the fit is built.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RationalParams {
    /// Lower spectral bound (must be > 0).
    pub lo: f64,
    /// Upper spectral bound.
    pub hi: f64,
    /// Number of partial-fraction terms.
    pub degree: usize,
    /// Target relative sup-norm error.
    pub precision: f64,
    /// Refinement step budget.
    pub max_iterations: usize,
}

impl Default for RationalParams {
    fn default() -> Self {
        Self {
            lo: 0.95,
            hi: 100.0,
            degree: 12,
            precision: 1e-12,
            max_iterations: 5000,
        }
    }
}

impl RationalParams {
    pub fn bounds(&self) -> Result<SpectralBounds, ApproximationError> {
        SpectralBounds::new(self.lo, self.hi)
    }
}

/// One partial-fraction term r / (x + p).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PoleTerm {
    pub residue: f64,
    pub pole: f64,
}

/// Partial-fraction approximation a0 + Σ r_k / (x + p_k) of x^e on [lo, hi].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RationalApproximation {
    exponent: Exponent,
    bounds: SpectralBounds,
    norm: f64,
    terms: Vec<PoleTerm>,
    error: f64,
    iterations: usize,
}

impl RationalApproximation {
    /// Build the optimal approximation for `params`.
    ///
    /// Fails with `NotConverged` if the achieved relative error exceeds
    /// `params.precision` or the refinement budget runs out.
    pub fn build(params: &RationalParams, exponent: Exponent) -> Result<Self, ApproximationError> {
        if exponent != Exponent::INVERSE_SQRT {
            return Err(ApproximationError::UnsupportedExponent {
                numerator: exponent.numerator,
                denominator: exponent.denominator,
            });
        }
        let bounds = params.bounds()?;
        if params.degree == 0 {
            return Err(ApproximationError::ZeroDegree);
        }

        let n = params.degree;
        let ratio = bounds.hi / bounds.lo;
        let (poles, zeros) = zolotarev_coefficients(n, ratio);
        let g = |t: f64| scaled_error_function(&poles, &zeros, t.exp());

        // Sampling grid in t = ln y
        let ln_ratio = ratio.ln();
        let grid_len = GRID_POINTS_PER_TERM * (n + 1) + 1;
        let ts: Vec<f64> = (0..grid_len)
            .map(|i| ln_ratio * i as f64 / (grid_len - 1) as f64)
            .collect();
        let gs: Vec<f64> = ts.iter().map(|&t| g(t)).collect();
        let mut g_max = gs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut g_min = gs.iter().copied().fold(f64::INFINITY, f64::min);

        let mut maxima = Vec::new();
        let mut minima = Vec::new();
        for i in 1..grid_len - 1 {
            let rising = gs[i] - gs[i - 1];
            let falling = gs[i + 1] - gs[i];
            if rising > 0.0 && falling <= 0.0 {
                maxima.push(i);
            } else if rising < 0.0 && falling >= 0.0 {
                minima.push(i);
            }
        }
        maxima.sort_by(|&a, &b| gs[b].total_cmp(&gs[a]));
        minima.sort_by(|&a, &b| gs[a].total_cmp(&gs[b]));

        let mut candidates: Vec<(usize, bool)> = distinct_extrema(&maxima, n + 1)
            .into_iter()
            .map(|i| (i, true))
            .chain(distinct_extrema(&minima, n + 1).into_iter().map(|i| (i, false)))
            .collect();
        candidates.sort_unstable();

        let mut iterations = 0;
        for (i, is_max) in candidates {
            let refined = golden_section(
                &g,
                ts[i - 1],
                ts[i + 1],
                is_max,
                &mut iterations,
                params.max_iterations,
            );
            match refined {
                Some(v) => {
                    g_max = g_max.max(v);
                    g_min = g_min.min(v);
                }
                None => {
                    return Err(ApproximationError::NotConverged {
                        achieved: relative_spread(g_max, g_min).max(ERROR_FLOOR),
                        target: params.precision,
                        iterations,
                    });
                }
            }
        }

        let spread = relative_spread(g_max, g_min);
        let error = if spread.is_nan() { spread } else { spread.max(ERROR_FLOOR) };
        if error.is_nan() || error > params.precision {
            return Err(ApproximationError::NotConverged {
                achieved: error,
                target: params.precision,
                iterations,
            });
        }

        let d = 2.0 / (g_max + g_min);
        let sqrt_lo = bounds.lo.sqrt();
        let terms = poles
            .iter()
            .enumerate()
            .map(|(j, &pj)| {
                let num: f64 = zeros.iter().map(|&z| z - pj).product();
                let den: f64 = poles
                    .iter()
                    .enumerate()
                    .filter(|&(l, _)| l != j)
                    .map(|(_, &pl)| pl - pj)
                    .product();
                PoleTerm {
                    residue: d * num / den * sqrt_lo,
                    pole: pj * bounds.lo,
                }
            })
            .collect();

        debug!(
            degree = n,
            lo = bounds.lo,
            hi = bounds.hi,
            error,
            iterations,
            "built rational approximation"
        );

        Ok(Self {
            exponent,
            bounds,
            norm: d / sqrt_lo,
            terms,
            error,
            iterations,
        })
    }

    /// a0 + Σ r_k / (x + p_k)
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        self.norm
            + self
                .terms
                .iter()
                .map(|t| t.residue / (x + t.pole))
                .sum::<f64>()
    }

    /// Largest |R(x) / x^e − 1| over `samples` log-spaced points of [lo, hi].
    #[must_use]
    pub fn max_relative_error(&self, samples: usize) -> f64 {
        let e = self.exponent.value();
        let (lo, hi) = (self.bounds.lo.ln(), self.bounds.hi.ln());
        let last = samples.max(2) - 1;
        (0..=last)
            .map(|i| {
                let x = (lo + (hi - lo) * i as f64 / last as f64).exp();
                (self.evaluate(x) * x.powf(-e) - 1.0).abs()
            })
            .fold(0.0, f64::max)
    }

    /// Normalization constant a0.
    #[must_use]
    pub const fn norm(&self) -> f64 {
        self.norm
    }

    #[must_use]
    pub fn terms(&self) -> &[PoleTerm] {
        &self.terms
    }

    pub fn poles(&self) -> impl Iterator<Item = f64> + '_ {
        self.terms.iter().map(|t| t.pole)
    }

    pub fn residues(&self) -> impl Iterator<Item = f64> + '_ {
        self.terms.iter().map(|t| t.residue)
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.terms.len()
    }

    /// Achieved relative sup-norm error.
    #[must_use]
    pub const fn error(&self) -> f64 {
        self.error
    }

    /// Refinement steps used.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    #[must_use]
    pub const fn bounds(&self) -> SpectralBounds {
        self.bounds
    }

    #[must_use]
    pub const fn exponent(&self) -> Exponent {
        self.exponent
    }
}

/// First `count` grid indices of `sorted` that are pairwise at least
/// `EXTREMUM_SEPARATION` apart.
fn distinct_extrema(sorted: &[usize], count: usize) -> Vec<usize> {
    let mut picked: Vec<usize> = Vec::with_capacity(count);
    for &i in sorted {
        if picked.len() == count {
            break;
        }
        if picked.iter().all(|&j| i.abs_diff(j) >= EXTREMUM_SEPARATION) {
            picked.push(i);
        }
    }
    picked
}

fn relative_spread(g_max: f64, g_min: f64) -> f64 {
    (g_max - g_min) / (g_max + g_min)
}

/// √y ∏ (y + z_l) / (y + p_l): constant up to the minimax deviation.
fn scaled_error_function(poles: &[f64], zeros: &[f64], y: f64) -> f64 {
    poles
        .iter()
        .zip(zeros)
        .fold(y.sqrt(), |g, (&p, &z)| g * (y + z) / (y + p))
}

/// Poles c_{2l−1} and zeros c_{2l} of the degree-n Zolotarev optimum on [1, ratio].
fn zolotarev_coefficients(n: usize, ratio: f64) -> (Vec<f64>, Vec<f64>) {
    let m = 1.0 - 1.0 / ratio;
    let k = complete_elliptic_k(m);
    let c = |l: usize| {
        let u = l as f64 * k / (2 * n + 1) as f64;
        let (sn, cn) = jacobi_sn_cn(u, m);
        (sn * sn) / (cn * cn)
    };
    let poles = (1..=n).map(|l| c(2 * l - 1)).collect();
    let zeros = (1..=n).map(|l| c(2 * l)).collect();
    (poles, zeros)
}

/// Descending AGM sequence (a_n, c_n) for parameter m.
fn agm_sequence(m: f64) -> (Vec<f64>, Vec<f64>) {
    let mut a = vec![1.0];
    let mut c = vec![m.sqrt()];
    let mut b = (1.0 - m).sqrt();
    for _ in 0..AGM_MAX_STEPS {
        let (an, cn) = (a[a.len() - 1], c[c.len() - 1]);
        if cn.abs() < AGM_EPSILON {
            break;
        }
        a.push(0.5 * (an + b));
        c.push(0.5 * (an - b));
        b = (an * b).sqrt();
    }
    (a, c)
}

/// Complete elliptic integral of the first kind K(m), parameter m = k².
fn complete_elliptic_k(m: f64) -> f64 {
    let (a, _) = agm_sequence(m);
    std::f64::consts::PI / (2.0 * a[a.len() - 1])
}

/// Jacobi sn(u|m) and cn(u|m) by descending Landen transformation (A&S 16.4).
fn jacobi_sn_cn(u: f64, m: f64) -> (f64, f64) {
    let (a, c) = agm_sequence(m);
    let steps = a.len() - 1;
    let mut phi = 2f64.powi(steps as i32) * a[steps] * u;
    for n in (1..=steps).rev() {
        phi = 0.5 * (phi + (c[n] / a[n] * phi.sin()).asin());
    }
    (phi.sin(), phi.cos())
}

/// Golden-section search for a local extremum of `f` on [lo, hi].
///
/// Returns the extremal value, or `None` once `used` reaches `budget`.
fn golden_section<F>(
    f: &F,
    mut lo: f64,
    mut hi: f64,
    maximize: bool,
    used: &mut usize,
    budget: usize,
) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    let inv_phi = 0.5 * (5f64.sqrt() - 1.0);
    let sign = if maximize { 1.0 } else { -1.0 };
    let h = |t: f64| sign * f(t);

    let mut c = hi - inv_phi * (hi - lo);
    let mut d = lo + inv_phi * (hi - lo);
    let mut hc = h(c);
    let mut hd = h(d);

    while hi - lo > GOLDEN_BRACKET {
        if *used >= budget {
            return None;
        }
        *used += 1;
        if hc > hd {
            hi = d;
            d = c;
            hd = hc;
            c = hi - inv_phi * (hi - lo);
            hc = h(c);
        } else {
            lo = c;
            c = d;
            hc = hd;
            d = lo + inv_phi * (hi - lo);
            hd = h(d);
        }
    }
    Some(sign * hc.max(hd))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(degree: usize, precision: f64) -> RationalParams {
        RationalParams {
            degree,
            precision,
            ..RationalParams::default()
        }
    }

    #[test]
    fn elliptic_k_limits() {
        assert!((complete_elliptic_k(0.0) - std::f64::consts::FRAC_PI_2).abs() < 1e-15);
        // K(1/2) = Γ(1/4)² / (4√π)
        let k_half = 1.854_074_677_301_372;
        assert!((complete_elliptic_k(0.5) - k_half).abs() < 1e-13);
    }

    #[test]
    fn jacobi_identities() {
        let m = 0.7;
        let k = complete_elliptic_k(m);
        for u in [0.1, 0.5, 1.0, 1.5] {
            let (sn, cn) = jacobi_sn_cn(u, m);
            assert!((sn * sn + cn * cn - 1.0).abs() < 1e-14);
        }
        let (sn_k, cn_k) = jacobi_sn_cn(k, m);
        assert!((sn_k - 1.0).abs() < 1e-12, "sn(K) = 1, got {sn_k}");
        assert!(cn_k.abs() < 1e-6, "cn(K) = 0, got {cn_k}");
        let (sn0, _) = jacobi_sn_cn(0.3, 0.0);
        assert!((sn0 - 0.3f64.sin()).abs() < 1e-15);
    }

    #[test]
    fn reference_fit_reaches_precision() {
        let fit = RationalApproximation::build(&params(12, 1e-12), Exponent::INVERSE_SQRT)
            .expect("degree 12 on [0.95, 100] reaches 1e-12");
        assert_eq!(fit.degree(), 12);
        assert!(fit.error() < 1e-13, "achieved {:.3e}", fit.error());
        let measured = fit.max_relative_error(20_000);
        assert!(measured < 1e-13, "fresh-grid error {measured:.3e}");
        assert!(fit.iterations() > 0 && fit.iterations() <= 5000);
    }

    #[test]
    fn poles_and_residues_are_positive() {
        let fit = RationalApproximation::build(&params(12, 1e-12), Exponent::INVERSE_SQRT)
            .expect("fit");
        assert!(fit.norm() > 0.0);
        for t in fit.terms() {
            assert!(t.pole > 0.0, "pole {}", t.pole);
            assert!(t.residue > 0.0, "residue {}", t.residue);
        }
    }

    #[test]
    fn error_decreases_with_degree() {
        let errors: Vec<f64> = (1..=24)
            .map(|d| {
                RationalApproximation::build(&params(d, 1.0), Exponent::INVERSE_SQRT)
                    .expect("fit")
                    .error()
            })
            .collect();
        // strictly decreasing until the fit reaches rounding
        for w in errors[..11].windows(2) {
            assert!(w[1] < w[0], "error must shrink with degree: {errors:?}");
        }
        for w in errors.windows(2) {
            assert!(w[1] <= w[0], "error must not grow with degree: {errors:?}");
        }
        assert!(errors[16..].iter().all(|&e| e == ERROR_FLOOR), "{errors:?}");
    }

    #[test]
    fn high_degree_fits_within_default_budget() {
        for degree in [36, 40] {
            let fit = RationalApproximation::build(&params(degree, 1e-12), Exponent::INVERSE_SQRT)
                .unwrap_or_else(|e| panic!("degree {degree}: {e}"));
            assert_eq!(fit.error(), ERROR_FLOOR);
            // 2n + 2 refinements, each well under 64 golden-section steps
            assert!(
                fit.iterations() <= 64 * (2 * degree + 2),
                "degree {degree}: {} iterations",
                fit.iterations()
            );
            let measured = fit.max_relative_error(4000);
            assert!(measured < 1e-11, "degree {degree}: fresh-grid error {measured:.3e}");
        }
    }

    #[test]
    fn build_is_bit_reproducible() {
        let a = RationalApproximation::build(&params(9, 1e-8), Exponent::INVERSE_SQRT)
            .expect("fit");
        let b = RationalApproximation::build(&params(9, 1e-8), Exponent::INVERSE_SQRT)
            .expect("fit");
        assert_eq!(a, b);
    }

    #[test]
    fn low_degree_reports_not_converged() {
        let err = RationalApproximation::build(&params(3, 1e-12), Exponent::INVERSE_SQRT)
            .expect_err("degree 3 cannot reach 1e-12");
        match err {
            ApproximationError::NotConverged {
                achieved, target, ..
            } => {
                assert!(achieved > 1e-6);
                assert_eq!(target, 1e-12);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn exhausted_budget_reports_not_converged() {
        let p = RationalParams {
            max_iterations: 10,
            ..RationalParams::default()
        };
        let err = RationalApproximation::build(&p, Exponent::INVERSE_SQRT)
            .expect_err("10 refinement steps are not enough");
        assert!(matches!(
            err,
            ApproximationError::NotConverged { iterations: 10, .. }
        ));
    }

    #[test]
    fn invalid_inputs_rejected() {
        let bad = RationalParams {
            lo: 0.0,
            ..RationalParams::default()
        };
        assert!(matches!(
            RationalApproximation::build(&bad, Exponent::INVERSE_SQRT),
            Err(ApproximationError::InvalidBounds { .. })
        ));
        let swapped = RationalParams {
            lo: 10.0,
            hi: 1.0,
            ..RationalParams::default()
        };
        assert!(swapped.bounds().is_err());
        assert!(matches!(
            RationalApproximation::build(&params(0, 1e-3), Exponent::INVERSE_SQRT),
            Err(ApproximationError::ZeroDegree)
        ));
        let quarter = Exponent {
            numerator: 1,
            denominator: 4,
        };
        assert!(matches!(
            RationalApproximation::build(&RationalParams::default(), quarter),
            Err(ApproximationError::UnsupportedExponent {
                numerator: 1,
                denominator: 4
            })
        ));
    }
}
