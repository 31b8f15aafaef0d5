// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice constants, LCG PRNG and numerical guards.
//!
//! The LCG backs hot starts, momentum draws and the `LcgNoise` source; it
//! is deliberately simple so that a seed fully determines a configuration.

/// Number of colors in QCD (SU(3)).
pub const N_COLORS: usize = 3;

/// Number of spacetime dimensions.
pub const N_DIM: usize = 4;

/// LCG multiplier (Knuth MMIX).
pub const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// LCG increment (Knuth MMIX).
pub const LCG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// `(seed >> 11) as f64 / 2^53` gives a uniform deviate with 53 bits.
pub const LCG_53_DIVISOR: f64 = (1u64 << 53) as f64;

/// Division guard for norms, inner products and CG denominators.
///
/// Well below any physical lattice scale.
pub const LATTICE_DIVISION_GUARD: f64 = 1e-30;

/// Hot-start perturbation scale for SU(3) link matrices.
///
/// 1.5 gives a strongly disordered configuration, which exercises every
/// color component of the Dirac kernel and its link derivative.
pub const HOT_START_EPSILON: f64 = 1.5;

/// Sites per partial sum in deterministic reductions.
///
/// Partial sums are combined in chunk order, so the result does not depend
/// on the number of worker threads.
pub const REDUCTION_CHUNK: usize = 64;

/// Advance the LCG state by one step.
#[inline]
pub fn lcg_step(seed: &mut u64) {
    *seed = seed
        .wrapping_mul(LCG_MULTIPLIER)
        .wrapping_add(LCG_INCREMENT);
}

/// Generate a uniform f64 in [0, 1) from 53 bits of LCG state.
#[inline]
pub fn lcg_uniform_f64(seed: &mut u64) -> f64 {
    lcg_step(seed);
    (*seed >> 11) as f64 / LCG_53_DIVISOR
}

/// Box-Muller Gaussian deviate N(0, 1) from two LCG draws.
///
/// The `ln` argument is clamped to `LATTICE_DIVISION_GUARD` to avoid ln(0).
#[inline]
pub fn lcg_gaussian(seed: &mut u64) -> f64 {
    let u1 = lcg_uniform_f64(seed);
    let u2 = lcg_uniform_f64(seed);
    (-2.0 * u1.max(LATTICE_DIVISION_GUARD).ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcg_step_deterministic() {
        let mut a = 42u64;
        let mut b = 42u64;
        lcg_step(&mut a);
        lcg_step(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn lcg_uniform_in_range() {
        let mut seed = 12345u64;
        for _ in 0..1000 {
            let v = lcg_uniform_f64(&mut seed);
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    #[allow(clippy::assertions_on_constants)] // constants sanity check
    fn guards_are_positive() {
        assert!(LATTICE_DIVISION_GUARD > 0.0);
        assert!(HOT_START_EPSILON > 0.0);
        assert!(REDUCTION_CHUNK > 0);
    }

    #[test]
    fn lcg_gaussian_moments() {
        let mut seed = 42u64;
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| lcg_gaussian(&mut seed)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean should be near 0, got {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance should be near 1, got {var}");
    }
}
