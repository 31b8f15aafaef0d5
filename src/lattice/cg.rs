// SPDX-License-Identifier: AGPL-3.0-only

//! Conjugate Gradient solvers for Hermitian positive-definite lattice systems.
//!
//! - [`cg_solve`]: one system A x = b.
//! - [`multishift_cg`]: (A + σ_k) x_k = b for a batch of shifts, sharing one
//!   Krylov space. Each shifted residual stays collinear with the base
//!   residual, r_k = ζ_k r, so only the base system costs operator
//!   applications.
//!
//! Both use the relative residual criterion ||r|| / ||b|| < tol and return
//! [`SolverDivergence`] when the iteration budget runs out.
//!
//! # References
//!
//! - Hestenes & Stiefel (1952) — original CG
//! - Jegerlehner, hep-lat/9612014 — Krylov space solvers for shifted systems
//! - Gattringer & Lang, "QCD on the Lattice" (2010), Ch. 8.4

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::constants::LATTICE_DIVISION_GUARD;
use super::fermion::FermionField;
use crate::error::SolverDivergence;

/// Convergence target and abort bound shared by every solve of an action.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Relative residual target ||r|| / ||b|| per shift.
    pub tolerance: f64,
    /// Iteration bound; exceeding it is a `SolverDivergence`.
    pub max_iterations: usize,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 5000,
        }
    }
}

/// CG solver result.
#[derive(Clone, Debug)]
pub struct CgResult {
    pub iterations: usize,
    pub final_residual: f64,
    pub initial_residual: f64,
}

/// Multi-shift solve output: one solution per requested shift, in order.
#[derive(Clone, Debug)]
pub struct MultiShiftResult {
    pub solutions: Vec<FermionField>,
    pub iterations: usize,
    /// Final relative residual estimate per shift.
    pub residuals: Vec<f64>,
}

/// Solve A x = b using Conjugate Gradient.
///
/// `x` holds the initial guess and is overwritten with the solution.
pub fn cg_solve<F>(
    apply: F,
    x: &mut FermionField,
    b: &FermionField,
    params: &SolverParams,
) -> Result<CgResult, SolverDivergence>
where
    F: Fn(&FermionField) -> FermionField,
{
    let b_norm_sq = b.norm_sq();
    if b_norm_sq < LATTICE_DIVISION_GUARD {
        x.zero();
        return Ok(CgResult {
            iterations: 0,
            final_residual: 0.0,
            initial_residual: 0.0,
        });
    }

    // r = b - A x
    let mut r = b.sub(&apply(x));
    let mut r_norm_sq = r.norm_sq();
    let initial_residual = (r_norm_sq / b_norm_sq).sqrt();
    let tol_sq = params.tolerance * params.tolerance * b_norm_sq;

    let mut p = r.clone();
    let mut iterations = 0;

    while r_norm_sq >= tol_sq && iterations < params.max_iterations {
        iterations += 1;

        let ap = apply(&p);
        let p_ap = p.dot(&ap).re;
        if p_ap.abs() < LATTICE_DIVISION_GUARD {
            break;
        }
        let alpha = r_norm_sq / p_ap;

        x.axpy_real(alpha, &p);
        r.axpy_real(-alpha, &ap);

        let r_norm_sq_new = r.norm_sq();
        let beta = r_norm_sq_new / r_norm_sq;
        r_norm_sq = r_norm_sq_new;

        // p = r + beta * p
        p.xpay(&r, beta);
    }

    let final_residual = (r_norm_sq / b_norm_sq).sqrt();
    debug!(iterations, initial_residual, final_residual, "cg solve");

    if r_norm_sq < tol_sq {
        Ok(CgResult {
            iterations,
            final_residual,
            initial_residual,
        })
    } else {
        Err(SolverDivergence {
            shift: 0.0,
            residual: final_residual,
            tolerance: params.tolerance,
            iterations,
        })
    }
}

/// Solve (A + σ_k) x_k = b for every shift σ_k in one Krylov pass.
///
/// The smallest shift is folded into the base operator, so every relative
/// shift is non-negative and |ζ_k| ≤ 1: the base system is always the
/// slowest to converge. Converged shifts are frozen. On failure the error
/// names the worst unconverged shift.
pub fn multishift_cg<F>(
    apply: F,
    b: &FermionField,
    shifts: &[f64],
    params: &SolverParams,
) -> Result<MultiShiftResult, SolverDivergence>
where
    F: Fn(&FermionField) -> FermionField,
{
    let n = shifts.len();
    let volume = b.volume;
    if n == 0 {
        return Ok(MultiShiftResult {
            solutions: Vec::new(),
            iterations: 0,
            residuals: Vec::new(),
        });
    }

    let b_norm_sq = b.norm_sq();
    if b_norm_sq < LATTICE_DIVISION_GUARD {
        return Ok(MultiShiftResult {
            solutions: vec![FermionField::zeros(volume); n],
            iterations: 0,
            residuals: vec![0.0; n],
        });
    }

    let base = shifts.iter().copied().fold(f64::INFINITY, f64::min);
    let relative: Vec<f64> = shifts.iter().map(|s| s - base).collect();
    let tol_sq = params.tolerance * params.tolerance * b_norm_sq;

    let mut x = vec![FermionField::zeros(volume); n];
    let mut p = vec![b.clone(); n];
    let mut r = b.clone();
    let mut p_base = b.clone();
    let mut rr = b_norm_sq;

    let mut zeta = vec![1.0_f64; n];
    let mut zeta_old = vec![1.0_f64; n];
    let mut residual_sq = vec![rr; n];
    let mut active = vec![true; n];
    let mut alpha_old = 1.0_f64;
    let mut beta = 0.0_f64;
    let mut iterations = 0;

    while iterations < params.max_iterations && active.iter().any(|&a| a) {
        iterations += 1;

        let mut ap = apply(&p_base);
        ap.axpy_real(base, &p_base);
        let p_ap = p_base.dot(&ap).re;
        if p_ap.abs() < LATTICE_DIVISION_GUARD {
            break;
        }
        let alpha = rr / p_ap;

        for k in 0..n {
            if !active[k] {
                continue;
            }
            let denom = alpha * beta * (zeta_old[k] - zeta[k])
                + zeta_old[k] * alpha_old * (1.0 + relative[k] * alpha);
            if denom.abs() <= LATTICE_DIVISION_GUARD {
                // Breakdown: freeze at the last residual, still unconverged.
                debug!(shift = shifts[k], iterations, "multishift breakdown");
                active[k] = false;
                continue;
            }
            let zeta_new = zeta[k] * zeta_old[k] * alpha_old / denom;
            x[k].axpy_real(alpha * zeta_new / zeta[k], &p[k]);
            zeta_old[k] = zeta[k];
            zeta[k] = zeta_new;
        }

        r.axpy_real(-alpha, &ap);
        let rr_new = r.norm_sq();
        let beta_new = rr_new / rr;

        for k in 0..n {
            if !active[k] {
                continue;
            }
            residual_sq[k] = zeta[k] * zeta[k] * rr_new;
            if residual_sq[k] < tol_sq {
                active[k] = false;
                continue;
            }
            let ratio = zeta[k] / zeta_old[k];
            p[k].scale_inplace(beta_new * ratio * ratio);
            p[k].axpy_real(zeta[k], &r);
        }

        p_base.xpay(&r, beta_new);
        alpha_old = alpha;
        beta = beta_new;
        rr = rr_new;
    }

    let residuals: Vec<f64> = residual_sq
        .iter()
        .map(|r2| (r2 / b_norm_sq).sqrt())
        .collect();
    let worst = (0..n)
        .filter(|&k| residual_sq[k] >= tol_sq)
        .max_by(|&i, &j| residuals[i].total_cmp(&residuals[j]));

    debug!(
        iterations,
        shifts = n,
        max_residual = residuals.iter().copied().fold(0.0, f64::max),
        "multishift cg"
    );

    match worst {
        None => Ok(MultiShiftResult {
            solutions: x,
            iterations,
            residuals,
        }),
        Some(k) => Err(SolverDivergence {
            shift: shifts[k],
            residual: residuals[k],
            tolerance: params.tolerance,
            iterations,
        }),
    }
}
