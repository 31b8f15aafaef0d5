// SPDX-License-Identifier: AGPL-3.0-only

//! hotSpring pseudofermion actions: determinant ratios for dynamical fermions.
//!
//! Builds the fermionic part of a lattice gauge simulation: a pseudofermion
//! heat bath, its action and its force on the SU(3) links, together with
//! the rational approximation and multi-shift solver the one-flavour action
//! needs, and a finite-step harness that validates force against action.
//!
//! ## Modules
//!   - `lattice` — fields, operators, solvers, actions, force check
//!   - `config` — JSON-configurable action settings
//!   - `error` — typed failure modes
//!   - `parallel` — explicit rayon worker pool
//!   - `telemetry` — `tracing` subscriber setup
//!   - `tolerances` — documented validation thresholds
//!   - `validation` — pass/fail harness for validation binaries
//!
//! ## Validation binaries
//!   - `validate_pseudofermion_force` — refresh identity, double refresh and
//!     force consistency for the exact-one-flavour (and, with `--ratio`, the
//!     two-flavour ratio) action

pub mod config;
pub mod error;
pub mod lattice;
pub mod parallel;
pub mod telemetry;
pub mod tolerances;
pub mod validation;

pub use config::ActionConfig;
pub use error::{ActionError, ApproximationError, ConfigError, ParallelError, SolverDivergence};
pub use lattice::force::ForceField;
pub use lattice::force_check::{ForceCheckReport, ForceConsistency};
pub use lattice::operator::{FermionOperator, StaggeredOperator};
pub use lattice::pseudofermion::{
    ExactOneFlavourRatioAction, PseudofermionAction, TwoFlavourRatioAction,
};
pub use lattice::rational::{RationalApproximation, RationalParams};
pub use parallel::ParallelContext;
