// SPDX-License-Identifier: AGPL-3.0-only

//! Staggered fermion fields: one color vector per site.
//!
//! Elementwise updates are rayon per-site maps. Inner products split the
//! site array into fixed `REDUCTION_CHUNK` blocks, sum each block
//! sequentially and combine the partials in block order, so a reduction is
//! bit-identical for any number of worker threads.
//!
//! Parallel methods run in whichever rayon pool is current; operators and
//! actions call them from inside their `ParallelContext`.

use rayon::prelude::*;

use super::complex_f64::Complex64;
use super::constants::{lcg_uniform_f64, N_COLORS, REDUCTION_CHUNK};

/// Color vector at a single lattice site: 3 complex components.
pub type ColorVector = [Complex64; N_COLORS];

/// Staggered fermion field: one `ColorVector` per lattice site.
#[derive(Clone, Debug, PartialEq)]
pub struct FermionField {
    pub data: Vec<ColorVector>,
    pub volume: usize,
}

impl FermionField {
    /// Create a zero fermion field.
    #[must_use]
    pub fn zeros(volume: usize) -> Self {
        Self {
            data: vec![[Complex64::ZERO; N_COLORS]; volume],
            volume,
        }
    }

    /// Uniform random components in [-0.5, 0.5) from the LCG stream at `seed`.
    #[must_use]
    pub fn random(volume: usize, seed: u64) -> Self {
        let mut rng = seed;
        let data = (0..volume)
            .map(|_| {
                std::array::from_fn(|_| {
                    let re = lcg_uniform_f64(&mut rng) - 0.5;
                    let im = lcg_uniform_f64(&mut rng) - 0.5;
                    Complex64::new(re, im)
                })
            })
            .collect();
        Self { data, volume }
    }

    /// Wrap per-site data.
    #[must_use]
    pub fn from_data(data: Vec<ColorVector>) -> Self {
        let volume = data.len();
        Self { data, volume }
    }

    /// Dot product: <self | other> = Σ_x Σ_c self(x,c)* × other(x,c)
    #[must_use]
    pub fn dot(&self, other: &Self) -> Complex64 {
        debug_assert_eq!(self.volume, other.volume);
        let partials: Vec<Complex64> = self
            .data
            .par_chunks(REDUCTION_CHUNK)
            .zip(other.data.par_chunks(REDUCTION_CHUNK))
            .map(|(a, b)| {
                let mut sum = Complex64::ZERO;
                for (sa, sb) in a.iter().zip(b) {
                    for c in 0..3 {
                        sum += sa[c].conj() * sb[c];
                    }
                }
                sum
            })
            .collect();
        partials.into_iter().sum()
    }

    /// Squared norm: ||self||², accumulated in real arithmetic.
    #[must_use]
    pub fn norm_sq(&self) -> f64 {
        let partials: Vec<f64> = self
            .data
            .par_chunks(REDUCTION_CHUNK)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|s| s[0].abs_sq() + s[1].abs_sq() + s[2].abs_sq())
                    .sum::<f64>()
            })
            .collect();
        partials.into_iter().sum()
    }

    /// axpy: self = a × x + self
    pub fn axpy(&mut self, a: Complex64, x: &Self) {
        debug_assert_eq!(self.volume, x.volume);
        self.data
            .par_iter_mut()
            .zip(x.data.par_iter())
            .for_each(|(si, xi)| {
                for c in 0..3 {
                    si[c] += a * xi[c];
                }
            });
    }

    /// Real-coefficient axpy: self = a × x + self
    pub fn axpy_real(&mut self, a: f64, x: &Self) {
        debug_assert_eq!(self.volume, x.volume);
        self.data
            .par_iter_mut()
            .zip(x.data.par_iter())
            .for_each(|(si, xi)| {
                for c in 0..3 {
                    si[c] += xi[c].scale(a);
                }
            });
    }

    /// self = x + b × self (CG search-direction update).
    pub fn xpay(&mut self, x: &Self, b: f64) {
        debug_assert_eq!(self.volume, x.volume);
        self.data
            .par_iter_mut()
            .zip(x.data.par_iter())
            .for_each(|(si, xi)| {
                for c in 0..3 {
                    si[c] = xi[c] + si[c].scale(b);
                }
            });
    }

    /// Scale in place: self *= a
    pub fn scale_inplace(&mut self, a: f64) {
        self.data.par_iter_mut().for_each(|site| {
            for c in site.iter_mut() {
                *c = c.scale(a);
            }
        });
    }

    /// New field a × self.
    #[must_use]
    pub fn scaled(&self, a: f64) -> Self {
        let mut out = self.clone();
        out.scale_inplace(a);
        out
    }

    /// New field self − other.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.axpy_real(-1.0, other);
        out
    }

    /// Σ_k c_k × x_k, evaluated per site in term order.
    ///
    /// All terms must share one volume; an empty list yields an empty field.
    #[must_use]
    pub fn linear_combination(terms: &[(f64, &Self)]) -> Self {
        let volume = terms.first().map_or(0, |(_, x)| x.volume);
        debug_assert!(terms.iter().all(|(_, x)| x.volume == volume));
        let mut out = Self::zeros(volume);
        out.data.par_iter_mut().enumerate().for_each(|(idx, site)| {
            for (coeff, x) in terms {
                for c in 0..3 {
                    site[c] += x.data[idx][c].scale(*coeff);
                }
            }
        });
        out
    }

    /// Zero all entries.
    pub fn zero(&mut self) {
        self.data.par_iter_mut().for_each(|site| {
            *site = [Complex64::ZERO; N_COLORS];
        });
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data
            .par_iter()
            .all(|site| site.iter().all(|c| c.is_finite()))
    }
}
