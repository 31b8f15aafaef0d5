// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized validation tolerances with physical justification.
//!
//! Every threshold used by tests and validation binaries is defined here
//! with its origin. No ad-hoc magic numbers.
//!
//! # Tolerance categories
//!
//! | Category | Basis | Example |
//! |----------|-------|---------|
//! | Machine precision | IEEE 754 f64 | 1e-10 for exact arithmetic |
//! | Numerical method | Solver and fit convergence | 1e-8 refresh identity |
//! | Smoke bound | Reference run acceptance | 1.0 force-check residual |

/// Machine-precision tolerances.
pub mod core;
/// Pseudofermion refresh, rational approximation and force-check bounds.
pub mod lattice;

pub use core::{EXACT_F64, ITERATIVE_F64, NEAR_ZERO_EXPECTED};

pub use lattice::{
    DOUBLE_REFRESH_ABS, FORCE_CHECK_ABS, FORCE_CHECK_DT, FORCE_SWEEP_DTS,
    FORCE_SWEEP_RATIO_MAX, FORCE_SWEEP_RATIO_MIN, RATIONAL_FRESH_GRID_SAMPLES,
    RATIONAL_PRECISION, REFRESH_IDENTITY_ABS,
};
