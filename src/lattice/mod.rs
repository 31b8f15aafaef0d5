// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice field theory: pseudofermion actions on SU(3) gauge fields.
//!
//! Dynamical fermions enter a gauge simulation through determinant ratios,
//! each estimated by a pseudofermion field that is refreshed once per
//! trajectory and contributes an action and a force on the links.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `complex_f64` | Complex f64 arithmetic |
//! | `su3` | SU(3) 3×3 complex matrix operations and algebra projection |
//! | `gauge` | Link field storage, site indexing, hot/cold starts |
//! | `fermion` | Staggered color-vector fields with deterministic reductions |
//! | `dirac` | Staggered Dirac operator and its link derivative |
//! | `cg` | Conjugate gradient and multi-shift CG |
//! | `operator` | `FermionOperator` capability and the staggered implementation |
//! | `rational` | Zolotarev partial-fraction approximation of x^(-1/2) |
//! | `noise` | Gaussian noise sources for the heat bath |
//! | `force` | Per-link force values and their contraction with momenta |
//! | `pseudofermion` | Two-flavour ratio and exact-one-flavour actions |
//! | `force_check` | Finite-step consistency of action and force |
//!
//! # References
//!
//! - Gattringer & Lang, "Quantum Chromodynamics on the Lattice" (2010)
//! - Kennedy, "Algorithms for dynamical fermions", hep-lat/0607038

/// Conjugate gradient and multi-shift CG for D†D systems.
pub mod cg;
/// Complex f64 arithmetic (re, im).
pub mod complex_f64;
/// LCG PRNG, lattice constants, and shared numerical guards.
pub mod constants;
/// Staggered Dirac operator and link derivative kernel.
pub mod dirac;
/// Staggered fermion fields.
pub mod fermion;
/// Per-link force fields.
pub mod force;
/// Finite-step force consistency harness.
pub mod force_check;
/// SU(3) link field on a periodic 4D lattice.
pub mod gauge;
/// Gaussian noise sources.
pub mod noise;
/// Fermion operator trait and staggered implementation.
pub mod operator;
/// Pseudofermion determinant-ratio actions.
pub mod pseudofermion;
/// Optimal rational approximation of x^(-1/2).
pub mod rational;
/// SU(3) 3x3 complex matrix operations.
pub mod su3;
