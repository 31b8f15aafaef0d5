// SPDX-License-Identifier: AGPL-3.0-only

//! Gaussian noise sources for pseudofermion refresh.
//!
//! A source fills one complex color vector per site with independent
//! N(0, 1) real and imaginary parts. The action applies its own noise
//! normalization afterwards, so sources stay convention free.
//!
//! Fields are drawn sequentially in site order: a seed fully determines the
//! field regardless of thread count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::complex_f64::Complex64;
use super::constants::{lcg_gaussian, LATTICE_DIVISION_GUARD};
use super::fermion::FermionField;

/// Deterministic-given-seed gaussian field generator.
pub trait NoiseSource {
    /// Complex gaussian field with Re, Im ~ N(0, 1) on `volume` sites.
    fn gaussian(&mut self, volume: usize) -> FermionField;
}

/// Production source backed by `StdRng`.
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    rng: StdRng,
}

impl GaussianNoise {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One Box-Muller pair: both outputs are used as (re, im).
    fn complex_gaussian(&mut self) -> Complex64 {
        let u1: f64 = self.rng.gen();
        let u2: f64 = self.rng.gen();
        let r = (-2.0 * (1.0 - u1).max(LATTICE_DIVISION_GUARD).ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        Complex64::new(r * theta.cos(), r * theta.sin())
    }
}

impl NoiseSource for GaussianNoise {
    fn gaussian(&mut self, volume: usize) -> FermionField {
        let data = (0..volume)
            .map(|_| std::array::from_fn(|_| self.complex_gaussian()))
            .collect();
        FermionField::from_data(data)
    }
}

/// Source on the hotSpring LCG stream, matching hot-start and momentum draws.
#[derive(Debug, Clone)]
pub struct LcgNoise {
    state: u64,
}

impl LcgNoise {
    #[must_use]
    pub const fn from_seed(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl NoiseSource for LcgNoise {
    fn gaussian(&mut self, volume: usize) -> FermionField {
        let data = (0..volume)
            .map(|_| {
                std::array::from_fn(|_| {
                    let re = lcg_gaussian(&mut self.state);
                    let im = lcg_gaussian(&mut self.state);
                    Complex64::new(re, im)
                })
            })
            .collect();
        FermionField::from_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component_moments(field: &FermionField) -> (f64, f64) {
        let values: Vec<f64> = field
            .data
            .iter()
            .flat_map(|s| s.iter().flat_map(|c| [c.re, c.im]))
            .collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var)
    }

    #[test]
    fn same_seed_same_field() {
        let a = GaussianNoise::from_seed(5).gaussian(64);
        let b = GaussianNoise::from_seed(5).gaussian(64);
        assert_eq!(a, b);
        let c = GaussianNoise::from_seed(6).gaussian(64);
        assert_ne!(a, c);

        let l1 = LcgNoise::from_seed(5).gaussian(64);
        let l2 = LcgNoise::from_seed(5).gaussian(64);
        assert_eq!(l1, l2);
    }

    #[test]
    fn unit_variance_components() {
        for field in [
            GaussianNoise::from_seed(11).gaussian(4096),
            LcgNoise::from_seed(11).gaussian(4096),
        ] {
            let (mean, var) = component_moments(&field);
            assert!(mean.abs() < 0.03, "mean {mean}");
            assert!((var - 1.0).abs() < 0.05, "variance {var}");
            assert!((field.norm_sq() / field.volume as f64 - 6.0).abs() < 0.3);
        }
    }

    #[test]
    fn consecutive_draws_differ() {
        let mut src = GaussianNoise::from_seed(1);
        let a = src.gaussian(16);
        let b = src.gaussian(16);
        assert_ne!(a, b);
    }
}
