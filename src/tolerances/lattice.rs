// SPDX-License-Identifier: AGPL-3.0-only

//! Pseudofermion action tolerances.

// ═══════════════════════════════════════════════════════════════════
// Heat bath
// ═══════════════════════════════════════════════════════════════════

/// Refresh identity: |⟨φ, K φ⟩ − ⟨η, η⟩| per real and imaginary part.
///
/// After a heat bath φ = W η with W† K W = 1 the action reproduces the noise
/// norm. Residual error comes from the rational fit (~1e-14 relative) and
/// the inner solves (1e-12 relative). Observed ~1e-11 on 2⁴·4 and 4⁴.
pub const REFRESH_IDENTITY_ABS: f64 = 1e-8;

/// Double refresh: |K R(R η) − η|² for a Hermitian heat-bath map R.
///
/// Holds for the exact-one-flavour action, where R(M) ≈ M^{-1/2} is a
/// function of the Hermitian kernel. Observed ~1e-25.
pub const DOUBLE_REFRESH_ABS: f64 = 1e-8;

// ═══════════════════════════════════════════════════════════════════
// Rational approximation
// ═══════════════════════════════════════════════════════════════════

/// Relative sup-norm target of the degree-12 x^(-1/2) fit on [0.95, 100].
///
/// Zolotarev's optimal fit reaches ~1.6e-14 at degree 12.
pub const RATIONAL_PRECISION: f64 = 1e-12;

/// Log-spaced points used to re-measure a built fit off its refinement grid.
pub const RATIONAL_FRESH_GRID_SAMPLES: usize = 4000;

// ═══════════════════════════════════════════════════════════════════
// Force consistency
// ═══════════════════════════════════════════════════════════════════

/// Step of the reference force check.
pub const FORCE_CHECK_DT: f64 = 1e-4;

/// Absolute bound on |S(U') − S(U) − ΔS_pred| at `FORCE_CHECK_DT`.
///
/// Smoke bound of the reference run. A correct force leaves O(dt²) ≈ 1e-5
/// on small lattices; a wrong normalization shows up at O(dt) ≈ 1e-3 or
/// worse. The dt sweep below is the sharp test.
pub const FORCE_CHECK_ABS: f64 = 1.0;

/// Steps of the convergence sweep, each half the previous.
pub const FORCE_SWEEP_DTS: [f64; 3] = [1e-2, 5e-3, 2.5e-3];

/// Lower bound on residual(dt) / residual(dt/2).
///
/// An exact force leaves a residual ∝ dt², ratio 4. A force off by a
/// constant factor leaves ∝ dt, ratio 2.
pub const FORCE_SWEEP_RATIO_MIN: f64 = 3.0;

/// Upper bound on residual(dt) / residual(dt/2).
pub const FORCE_SWEEP_RATIO_MAX: f64 = 5.0;
