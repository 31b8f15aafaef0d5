// SPDX-License-Identifier: AGPL-3.0-only

//! Staggered Dirac operator and its link derivative.
//!
//! The staggered (Kogut-Susskind) operator acts on one color vector per site:
//!
//!   (D ψ)(x) = m ψ(x) + (1/2) Σ_μ η_μ(x) [U_μ(x) ψ(x+μ) − U_μ†(x−μ) ψ(x−μ)]
//!
//! with η_μ(x) = (−1)^{x_0 + … + x_{μ−1}}. The hopping part is anti-Hermitian,
//! so D† = m − D_hop and D†D = m² − D_hop² is Hermitian positive definite
//! with spectrum in [m², m² + 16].
//!
//! Every kernel is a per-site map writing only its own output slot.
//!
//! # References
//!
//! - Kogut & Susskind, PRD 11, 395 (1975)
//! - Gattringer & Lang, "QCD on the Lattice" (2010), Ch. 5

use rayon::prelude::*;

use super::complex_f64::Complex64;
use super::constants::N_DIM;
use super::fermion::{ColorVector, FermionField};
use super::gauge::GaugeField;
use super::su3::Su3Matrix;

/// Largest eigenvalue of −D_hop² in four dimensions: (Σ_μ 1)² = 16.
pub const HOPPING_SPECTRAL_RADIUS_SQ: f64 = (N_DIM * N_DIM) as f64;

/// Staggered phase η_μ(x) = (−1)^{x_0 + x_1 + … + x_{μ−1}}
#[must_use]
pub fn staggered_phase(x: [usize; 4], mu: usize) -> f64 {
    let sum: usize = x.iter().take(mu).sum();
    if sum.is_multiple_of(2) {
        1.0
    } else {
        -1.0
    }
}

/// (D_hop ψ)(x) at a single site.
fn hop_site(gauge: &GaugeField, psi: &FermionField, idx: usize) -> ColorVector {
    let x = gauge.site_coords(idx);
    let mut out = [Complex64::ZERO; 3];

    for mu in 0..N_DIM {
        let half_eta = 0.5 * staggered_phase(x, mu);

        let x_fwd = gauge.neighbor(x, mu, true);
        let fwd = gauge.links[idx * N_DIM + mu].mul_vec(&psi.data[gauge.site_index(x_fwd)]);

        let x_bwd = gauge.neighbor(x, mu, false);
        let idx_bwd = gauge.site_index(x_bwd);
        let bwd = gauge.links[idx_bwd * N_DIM + mu].adjoint_mul_vec(&psi.data[idx_bwd]);

        for c in 0..3 {
            out[c] += (fwd[c] - bwd[c]).scale(half_eta);
        }
    }
    out
}

/// out = m ψ + sign × D_hop ψ
fn apply_mass_hop(gauge: &GaugeField, psi: &FermionField, mass: f64, sign: f64) -> FermionField {
    debug_assert_eq!(gauge.volume(), psi.volume);
    let mut result = FermionField::zeros(psi.volume);
    result
        .data
        .par_iter_mut()
        .enumerate()
        .for_each(|(idx, out)| {
            let h = hop_site(gauge, psi, idx);
            for c in 0..3 {
                out[c] = psi.data[idx][c].scale(mass) + h[c].scale(sign);
            }
        });
    result
}

/// Apply the staggered Dirac operator: D ψ.
#[must_use]
pub fn apply_dirac(gauge: &GaugeField, psi: &FermionField, mass: f64) -> FermionField {
    apply_mass_hop(gauge, psi, mass, 1.0)
}

/// Apply D† = m − D_hop.
#[must_use]
pub fn apply_dirac_dagger(gauge: &GaugeField, psi: &FermionField, mass: f64) -> FermionField {
    apply_mass_hop(gauge, psi, mass, -1.0)
}

/// Apply D†D (Hermitian positive definite for m > 0).
#[must_use]
pub fn apply_dirac_sq(gauge: &GaugeField, psi: &FermionField, mass: f64) -> FermionField {
    let dpsi = apply_dirac(gauge, psi, mass);
    apply_dirac_dagger(gauge, &dpsi, mass)
}

/// Link derivative of Re a†D b, one matrix per link.
///
/// Returns G with Re δ(a† D b) = Σ_links Tr(ω · 2·Ta(G)) under
/// δU_μ(y) = ω_μ(y) U_μ(y):
///
///   G_μ(y) = (η_μ(y)/4) U_μ(y) [b(y+μ) ⊗ a(y)† − a(y+μ) ⊗ b(y)†]
///
/// The mass term does not depend on U, so D and D_hop share this kernel.
#[must_use]
pub fn dirac_link_derivative(
    gauge: &GaugeField,
    a: &FermionField,
    b: &FermionField,
) -> Vec<Su3Matrix> {
    debug_assert_eq!(gauge.volume(), a.volume);
    debug_assert_eq!(gauge.volume(), b.volume);
    let mut out = vec![Su3Matrix::ZERO; gauge.link_count()];
    out.par_chunks_mut(N_DIM)
        .enumerate()
        .for_each(|(idx, site_links)| {
            let x = gauge.site_coords(idx);
            for (mu, slot) in site_links.iter_mut().enumerate() {
                let fwd = gauge.site_index(gauge.neighbor(x, mu, true));
                let z = Su3Matrix::outer(&b.data[fwd], &a.data[idx])
                    - Su3Matrix::outer(&a.data[fwd], &b.data[idx]);
                *slot = (gauge.links[idx * N_DIM + mu] * z).scale(0.25 * staggered_phase(x, mu));
            }
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirac_on_zero_field_is_zero() {
        let lat = GaugeField::cold_start([4, 4, 4, 4]);
        let psi = FermionField::zeros(lat.volume());
        let result = apply_dirac(&lat, &psi, 0.1);
        assert!(result.norm_sq() < 1e-20, "D × 0 should be 0");
    }

    #[test]
    fn dagger_is_adjoint() {
        let lat = GaugeField::hot_start([4, 4, 2, 2], 11);
        let a = FermionField::random(lat.volume(), 1);
        let b = FermionField::random(lat.volume(), 2);
        let lhs = a.dot(&apply_dirac(&lat, &b, 0.3));
        let rhs = apply_dirac_dagger(&lat, &a, 0.3).dot(&b);
        assert!(
            (lhs - rhs).abs() < 1e-12,
            "<a|D b> = <D† a|b>: {lhs} vs {rhs}"
        );
    }

    #[test]
    fn dirac_sq_spectrum_bounds() {
        let lat = GaugeField::hot_start([4, 4, 4, 4], 42);
        let mass = 0.2;
        for seed in [3, 4, 5] {
            let psi = FermionField::random(lat.volume(), seed);
            let rayleigh = psi.dot(&apply_dirac_sq(&lat, &psi, mass)).re / psi.norm_sq();
            assert!(
                rayleigh >= mass * mass - 1e-12
                    && rayleigh <= mass * mass + HOPPING_SPECTRAL_RADIUS_SQ + 1e-12,
                "Rayleigh quotient {rayleigh} outside [m², m² + 16]"
            );
        }
    }

    #[test]
    fn staggered_phases() {
        assert_eq!(staggered_phase([0, 0, 0, 0], 0), 1.0);
        assert_eq!(staggered_phase([1, 0, 0, 0], 1), -1.0);
        assert_eq!(staggered_phase([1, 1, 0, 0], 2), 1.0);
        assert_eq!(staggered_phase([1, 1, 1, 0], 3), -1.0);
    }

    #[test]
    fn link_derivative_matches_directional_difference() {
        // U → U + ε ω U enters D linearly, so the difference quotient is exact
        // up to rounding.
        let lat = GaugeField::hot_start([2, 2, 2, 4], 8);
        let a = FermionField::random(lat.volume(), 21);
        let b = FermionField::random(lat.volume(), 22);
        let mass = 0.5;

        let mut seed = 1234u64;
        let omega: Vec<Su3Matrix> = (0..lat.link_count())
            .map(|_| Su3Matrix::random_algebra(&mut seed))
            .collect();

        let eps = 1e-3;
        let shifted = lat.map_links(|i, u| *u + (omega[i] * *u).scale(eps));

        let f0 = a.dot(&apply_dirac(&lat, &b, mass)).re;
        let f1 = a.dot(&apply_dirac(&shifted, &b, mass)).re;
        let measured = (f1 - f0) / eps;

        let g = dirac_link_derivative(&lat, &a, &b);
        let predicted: f64 = omega
            .iter()
            .zip(&g)
            .map(|(w, gi)| (*w * gi.traceless_antihermitian().scale(2.0)).re_trace())
            .sum();

        assert!(
            (measured - predicted).abs() < 1e-8 * predicted.abs().max(1.0),
            "directional derivative {measured:.12e} vs kernel {predicted:.12e}"
        );
    }
}
