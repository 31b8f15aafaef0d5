// SPDX-License-Identifier: AGPL-3.0-only

//! Machine-precision tolerances (IEEE 754 f64).

/// Tolerance for operations that should be exact in f64 arithmetic.
///
/// f64 has ~15.9 significant digits; 1e-10 allows 5 digits of accumulated
/// rounding in compositions of exact operations.
pub const EXACT_F64: f64 = 1e-10;

/// Tolerance for f64 results of converged iterative solves.
///
/// A Krylov solve stopped at relative residual 1e-12 on an operator with
/// condition number ~400 leaves ~7 digits after forming bilinears.
pub const ITERATIVE_F64: f64 = 1e-8;

/// Absolute floor used when the expected value is zero and a relative
/// comparison is undefined.
pub const NEAR_ZERO_EXPECTED: f64 = 1e-14;
