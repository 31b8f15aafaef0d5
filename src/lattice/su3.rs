// SPDX-License-Identifier: AGPL-3.0-only

//! SU(3) matrix operations for link variables, forces and momenta.
//!
//! An SU(3) matrix is a 3×3 unitary matrix with determinant 1. Each link
//! `U_μ(x)` is the parallel transporter from x to x+μ. Forces and momenta live
//! in the algebra su(3): traceless anti-Hermitian 3×3 matrices.
//!
//! Storage: row-major, 9 Complex64 values (18 f64).
//!
//! # References
//!
//! - Gattringer & Lang, "QCD on the Lattice" (2010), Ch. 2
//! - Creutz, "Quarks, Gluons and Lattices" (1983), Ch. 8

use std::ops::{Add, AddAssign, Mul, Sub};

use super::complex_f64::Complex64;
use super::constants::{lcg_gaussian, LATTICE_DIVISION_GUARD};
use super::fermion::ColorVector;

/// 3×3 complex matrix — SU(3) link variable or su(3) algebra element.
///
/// Row-major storage: `m[row][col]`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[must_use]
pub struct Su3Matrix {
    /// Matrix elements m[row][col].
    pub m: [[Complex64; 3]; 3],
}

impl Mul for Su3Matrix {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                let mut s = Complex64::ZERO;
                for k in 0..3 {
                    s += self.m[i][k] * rhs.m[k][j];
                }
                r.m[i][j] = s;
            }
        }
        r
    }
}

impl Add for Su3Matrix {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut r = self;
        r += rhs;
        r
    }
}

impl AddAssign for Su3Matrix {
    fn add_assign(&mut self, rhs: Self) {
        for i in 0..3 {
            for j in 0..3 {
                self.m[i][j] += rhs.m[i][j];
            }
        }
    }
}

impl Sub for Su3Matrix {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j] - rhs.m[i][j];
            }
        }
        r
    }
}

impl Su3Matrix {
    /// 3×3 identity matrix.
    pub const IDENTITY: Self = Self {
        m: [
            [Complex64::ONE, Complex64::ZERO, Complex64::ZERO],
            [Complex64::ZERO, Complex64::ONE, Complex64::ZERO],
            [Complex64::ZERO, Complex64::ZERO, Complex64::ONE],
        ],
    };

    /// Zero matrix (all elements 0).
    pub const ZERO: Self = Self {
        m: [[Complex64::ZERO; 3]; 3],
    };

    /// Conjugate transpose (adjoint / dagger).
    pub fn adjoint(self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[j][i].conj();
            }
        }
        r
    }

    /// Trace: Tr(U) = sum\_i `U_ii`
    pub fn trace(self) -> Complex64 {
        self.m[0][0] + self.m[1][1] + self.m[2][2]
    }

    /// Real part of trace.
    #[must_use]
    pub fn re_trace(self) -> f64 {
        self.m[0][0].re + self.m[1][1].re + self.m[2][2].re
    }

    /// Determinant of a 3×3 complex matrix.
    pub fn det(self) -> Complex64 {
        let m = &self.m;
        let a = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]);
        let b = m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0]);
        let c = m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        a - b + c
    }

    /// Scale by a real number.
    pub fn scale(self, s: f64) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j].scale(s);
            }
        }
        r
    }

    /// Scale by a complex number.
    pub fn scale_complex(self, s: Complex64) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j] * s;
            }
        }
        r
    }

    /// Frobenius norm squared: sum |`m_ij`|²
    #[must_use]
    pub fn norm_sq(self) -> f64 {
        let mut s = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                s += self.m[i][j].abs_sq();
            }
        }
        s
    }

    /// Traceless anti-Hermitian projection:
    /// Ta(W) = (W − W†)/2 − Tr(W − W†)/6 · 1.
    ///
    /// Maps a link-space derivative onto the algebra su(3).
    pub fn traceless_antihermitian(self) -> Self {
        let wh = self.adjoint();
        let mut ta = Self::ZERO;
        for a in 0..3 {
            for b in 0..3 {
                ta.m[a][b] = (self.m[a][b] - wh.m[a][b]).scale(0.5);
            }
        }
        let tr = ta.trace().scale(1.0 / 3.0);
        for a in 0..3 {
            ta.m[a][a] -= tr;
        }
        ta
    }

    /// Color outer product `u ⊗ v†`: element (i, j) = u_i · conj(v_j).
    pub fn outer(u: &ColorVector, v: &ColorVector) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = u[i] * v[j].conj();
            }
        }
        r
    }

    /// U·v for a color vector.
    #[inline]
    #[must_use]
    pub fn mul_vec(&self, v: &ColorVector) -> ColorVector {
        let mut result = [Complex64::ZERO; 3];
        for (c, out) in result.iter_mut().enumerate() {
            for cp in 0..3 {
                *out += self.m[c][cp] * v[cp];
            }
        }
        result
    }

    /// U†·v without forming U†: result_c = Σ_c' conj(U_{c',c}) v_{c'}.
    #[inline]
    #[must_use]
    pub fn adjoint_mul_vec(&self, v: &ColorVector) -> ColorVector {
        let mut result = [Complex64::ZERO; 3];
        for (c, out) in result.iter_mut().enumerate() {
            for cp in 0..3 {
                *out += self.m[cp][c].conj() * v[cp];
            }
        }
        result
    }

    /// Frobenius distance of U U† from the identity.
    #[must_use]
    pub fn unitarity_deviation(self) -> f64 {
        (self * self.adjoint() - Self::IDENTITY).norm_sq().sqrt()
    }

    /// Project back onto SU(3) via modified Gram-Schmidt reunitarization.
    pub fn reunitarize(self) -> Self {
        let mut u = self;

        let n0 = row_norm(&u, 0);
        if n0 > LATTICE_DIVISION_GUARD {
            let inv = 1.0 / n0;
            for j in 0..3 {
                u.m[0][j] = u.m[0][j].scale(inv);
            }
        }

        let dot01 = row_dot(&u, 0, 1);
        for j in 0..3 {
            u.m[1][j] -= u.m[0][j] * dot01;
        }
        let n1 = row_norm(&u, 1);
        if n1 > LATTICE_DIVISION_GUARD {
            let inv = 1.0 / n1;
            for j in 0..3 {
                u.m[1][j] = u.m[1][j].scale(inv);
            }
        }

        // Row 2 = conj(row 0 × row 1) fixes det = 1
        u.m[2][0] = (u.m[0][1] * u.m[1][2] - u.m[0][2] * u.m[1][1]).conj();
        u.m[2][1] = (u.m[0][2] * u.m[1][0] - u.m[0][0] * u.m[1][2]).conj();
        u.m[2][2] = (u.m[0][0] * u.m[1][1] - u.m[0][1] * u.m[1][0]).conj();

        u
    }

    /// Random SU(3) matrix near identity, used for hot-start links.
    ///
    /// Second-order expansion of exp(i ε H) for a gaussian traceless
    /// Hermitian H, reunitarized.
    pub fn random_near_identity(seed: &mut u64, epsilon: f64) -> Self {
        let h = random_traceless_hermitian(seed, epsilon);

        let mut result = Self::IDENTITY;
        for (i, row) in result.m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell += Complex64::I * h.m[i][j];
            }
        }
        let h2 = h * h;
        for (i, row) in result.m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell -= h2.m[i][j].scale(0.5);
            }
        }

        result.reunitarize()
    }

    /// Random su(3) element P = iH (traceless anti-Hermitian).
    ///
    /// Generator coefficients `c_a` ~ N(0, 1/√2), the canonical momentum
    /// distribution for Tr(`T_a` `T_b`) = `δ_ab`/2.
    pub fn random_algebra(seed: &mut u64) -> Self {
        random_traceless_hermitian(seed, std::f64::consts::FRAC_1_SQRT_2)
            .scale_complex(Complex64::I)
    }
}

fn random_traceless_hermitian(seed: &mut u64, scale: f64) -> Su3Matrix {
    let mut rand_gauss = || -> f64 { scale * lcg_gaussian(seed) };
    let mut h = Su3Matrix::ZERO;

    // Diagonal: a3 λ3 + a8 λ8
    let a3 = rand_gauss();
    let a8 = rand_gauss();
    let inv_sqrt3 = 1.0 / 3.0_f64.sqrt();
    h.m[0][0] = Complex64::real(a3 + a8 * inv_sqrt3);
    h.m[1][1] = Complex64::real(-a3 + a8 * inv_sqrt3);
    h.m[2][2] = Complex64::real(-2.0 * a8 * inv_sqrt3);

    for (i, j) in [(0, 1), (0, 2), (1, 2)] {
        let re = rand_gauss();
        let im = rand_gauss();
        h.m[i][j] = Complex64::new(re, im);
        h.m[j][i] = Complex64::new(re, -im);
    }
    h
}

fn row_norm(u: &Su3Matrix, row: usize) -> f64 {
    let mut s = 0.0;
    for j in 0..3 {
        s += u.m[row][j].abs_sq();
    }
    s.sqrt()
}

fn row_dot(u: &Su3Matrix, r1: usize, r2: usize) -> Complex64 {
    let mut s = Complex64::ZERO;
    for j in 0..3 {
        s += u.m[r1][j].conj() * u.m[r2][j];
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_traceless_antihermitian(p: &Su3Matrix, label: &str) {
        assert!(
            p.trace().abs() < 1e-13,
            "{label}: trace should vanish, got {}",
            p.trace()
        );
        let sum = *p + p.adjoint();
        assert!(
            sum.norm_sq() < 1e-26,
            "{label}: P + P† should vanish, |.|²={:.3e}",
            sum.norm_sq()
        );
    }

    #[test]
    fn identity_properties() {
        let i = Su3Matrix::IDENTITY;
        assert!((i.det().re - 1.0).abs() < 1e-14);
        assert!(i.det().im.abs() < 1e-14);
        assert!((i.re_trace() - 3.0).abs() < 1e-14);
    }

    #[test]
    fn hot_link_is_special_unitary() {
        let mut seed = 123u64;
        let u = Su3Matrix::random_near_identity(&mut seed, 1.5);
        assert!(
            u.unitarity_deviation() < 1e-12,
            "U U† not identity: {:.3e}",
            u.unitarity_deviation()
        );
        let d = u.det();
        assert!((d.re - 1.0).abs() < 1e-12 && d.im.abs() < 1e-12, "det = {d}");
    }

    #[test]
    fn random_algebra_is_traceless_antihermitian() {
        let mut seed = 7u64;
        for k in 0..20 {
            let p = Su3Matrix::random_algebra(&mut seed);
            assert_traceless_antihermitian(&p, &format!("sample {k}"));
        }
    }

    #[test]
    fn ta_projection_is_idempotent() {
        let mut seed = 99u64;
        let u = Su3Matrix::random_near_identity(&mut seed, 0.8);
        let w = u * Su3Matrix::random_near_identity(&mut seed, 0.4).scale(1.7);
        let ta = w.traceless_antihermitian();
        assert_traceless_antihermitian(&ta, "Ta(W)");
        let again = ta.traceless_antihermitian();
        assert!((again - ta).norm_sq() < 1e-28);
    }

    #[test]
    fn ta_of_hermitian_vanishes() {
        let mut seed = 5u64;
        let p = Su3Matrix::random_algebra(&mut seed);
        let h = p.scale_complex(Complex64::new(0.0, -1.0));
        assert!(h.traceless_antihermitian().norm_sq() < 1e-28);
    }

    #[test]
    fn outer_product_trace_is_inner_product() {
        let u = [
            Complex64::new(1.0, 0.5),
            Complex64::new(-0.2, 0.3),
            Complex64::new(0.0, -1.1),
        ];
        let v = [
            Complex64::new(0.4, -0.6),
            Complex64::new(2.0, 0.0),
            Complex64::new(-0.3, 0.9),
        ];
        let tr = Su3Matrix::outer(&u, &v).trace();
        let inner: Complex64 = (0..3).map(|c| v[c].conj() * u[c]).sum();
        assert!((tr - inner).abs() < 1e-14);
    }

    #[test]
    fn adjoint_mul_vec_matches_explicit_adjoint() {
        let mut seed = 31u64;
        let u = Su3Matrix::random_near_identity(&mut seed, 1.0);
        let v = [
            Complex64::new(0.3, -0.1),
            Complex64::new(-1.2, 0.7),
            Complex64::new(0.5, 0.5),
        ];
        let a = u.adjoint_mul_vec(&v);
        let b = u.adjoint().mul_vec(&v);
        for c in 0..3 {
            assert!((a[c] - b[c]).abs() < 1e-15);
        }
    }

    #[test]
    fn reunitarize_fixes_drift() {
        let mut seed = 999u64;
        let mut u = Su3Matrix::random_near_identity(&mut seed, 0.5);
        u.m[0][0].re += 0.1;
        u.m[1][2].im -= 0.05;
        let fixed = u.reunitarize();
        assert!(
            fixed.unitarity_deviation() < 1e-10,
            "reunitarized U U† not identity"
        );
    }
}
