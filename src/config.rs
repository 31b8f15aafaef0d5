// SPDX-License-Identifier: AGPL-3.0-only

//! Run-time configuration for pseudofermion actions.
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes:
//!
//! ```json
//! { "rational": { "degree": 14 }, "solver": { "tolerance": 1e-10 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lattice::cg::SolverParams;
use crate::lattice::rational::RationalParams;

/// Settings shared by both action styles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Rational fit of x^(-1/2) (exact-one-flavour action only).
    pub rational: RationalParams,
    /// Convergence settings for every inner solve.
    pub solver: SolverParams,
    /// Multiplier applied to unit gaussian noise before refresh.
    pub noise_scale: f64,
    /// Bound on |Im S| relative to max(1, |Re S|).
    pub imaginary_tolerance: f64,
    /// Worker threads (0 = one per logical CPU).
    pub threads: usize,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            rational: RationalParams::default(),
            solver: SolverParams::default(),
            noise_scale: std::f64::consts::FRAC_1_SQRT_2,
            imaginary_tolerance: 1e-8,
            threads: 0,
        }
    }
}

impl ActionConfig {
    /// Production settings of the exact-one-flavour force test.
    #[must_use]
    pub fn exact_one_flavour() -> Self {
        Self::default()
    }

    /// Production settings of the two-flavour ratio (Pauli-Villars) runs.
    #[must_use]
    pub fn two_flavour_ratio() -> Self {
        Self {
            solver: SolverParams {
                tolerance: 1e-8,
                max_iterations: 10_000,
            },
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.rational;
        if !(r.lo > 0.0 && r.hi > r.lo && r.hi.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "rational bounds [{}, {}] must satisfy 0 < lo < hi",
                r.lo, r.hi
            )));
        }
        if r.degree == 0 {
            return Err(ConfigError::Invalid("rational degree must be at least 1".into()));
        }
        if !(r.precision > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "rational precision {} must be positive",
                r.precision
            )));
        }
        if !(self.solver.tolerance > 0.0) || self.solver.max_iterations == 0 {
            return Err(ConfigError::Invalid(format!(
                "solver needs tolerance > 0 and max_iterations > 0 (got {}, {})",
                self.solver.tolerance, self.solver.max_iterations
            )));
        }
        if !(self.noise_scale > 0.0 && self.noise_scale.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "noise_scale {} must be positive and finite",
                self.noise_scale
            )));
        }
        if !(self.imaginary_tolerance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "imaginary_tolerance {} must be positive",
                self.imaginary_tolerance
            )));
        }
        Ok(())
    }
}
