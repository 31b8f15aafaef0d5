// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for rational approximation, solvers and pseudofermion actions.
//!
//! Callers pattern-match on failure modes (fit did not converge, solver
//! diverged, field used before refresh) instead of parsing strings. Every
//! variant carries enough context (iteration count, residual) to log and
//! abort a trajectory.

use thiserror::Error;

/// The rational fit could not be built or did not reach its accuracy target.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApproximationError {
    /// Spectral interval is empty or touches zero.
    #[error("invalid spectral bounds [{lo}, {hi}]: require 0 < lo < hi")]
    InvalidBounds { lo: f64, hi: f64 },

    /// Degree zero has no partial-fraction terms.
    #[error("rational approximation degree must be at least 1")]
    ZeroDegree,

    /// Only the inverse square root has a closed-form optimal approximation here.
    #[error("unsupported exponent {numerator}/{denominator}: only x^(-1/2) is available")]
    UnsupportedExponent { numerator: i32, denominator: u32 },

    /// Iteration budget exhausted or error above target.
    #[error(
        "rational fit reached relative error {achieved:.3e} (target {target:.3e}) after {iterations} iterations"
    )]
    NotConverged {
        achieved: f64,
        target: f64,
        iterations: usize,
    },
}

/// An inner (shifted) linear solve failed to converge.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "solve with shift {shift:.6e} reached relative residual {residual:.3e} > {tolerance:.3e} after {iterations} iterations"
)]
pub struct SolverDivergence {
    /// Shift of the worst unconverged system (0.0 for an unshifted solve).
    pub shift: f64,
    /// Relative residual reached.
    pub residual: f64,
    /// Requested relative tolerance.
    pub tolerance: f64,
    /// Krylov iterations performed.
    pub iterations: usize,
}

/// Errors from pseudofermion refresh, action and force evaluation.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Approximation(#[from] ApproximationError),

    #[error(transparent)]
    Solver(#[from] SolverDivergence),

    /// `action` or `deriv` called before any `refresh`.
    #[error("{operation} called before refresh: stochastic field is undefined")]
    PreconditionViolation { operation: &'static str },

    /// A quantity that must vanish (imaginary action residue, force-check
    /// residual) exceeded its tolerance.
    #[error("numerical instability: {what} = {value:.3e} exceeds tolerance {tolerance:.3e}")]
    NumericalInstability {
        what: &'static str,
        value: f64,
        tolerance: f64,
    },

    /// Operator pair cannot form the requested ratio.
    #[error("incompatible operators: {0}")]
    IncompatibleOperators(String),

    /// A field does not live on the lattice it was paired with.
    #[error("field volume mismatch: expected {expected} sites, found {found}")]
    VolumeMismatch { expected: usize, found: usize },
}

/// Configuration could not be read or is out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// The worker pool could not be created.
#[derive(Debug, Error)]
#[error("failed to build parallel context: {0}")]
pub struct ParallelError(#[from] pub rayon::ThreadPoolBuildError);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_converged_carries_context() {
        let err = ApproximationError::NotConverged {
            achieved: 2.5e-5,
            target: 1e-12,
            iterations: 17,
        };
        let msg = err.to_string();
        assert!(msg.contains("2.500e-5"), "{msg}");
        assert!(msg.contains("17 iterations"), "{msg}");
    }

    #[test]
    fn solver_divergence_converts_into_action_error() {
        let div = SolverDivergence {
            shift: 0.5,
            residual: 1e-3,
            tolerance: 1e-10,
            iterations: 4,
        };
        let err: ActionError = div.clone().into();
        match err {
            ActionError::Solver(inner) => assert_eq!(inner, div),
            other => panic!("expected Solver variant, got {other:?}"),
        }
    }

    #[test]
    fn precondition_names_operation() {
        let err = ActionError::PreconditionViolation { operation: "deriv" };
        assert!(err.to_string().starts_with("deriv called before refresh"));
    }

    #[test]
    fn error_trait_works() {
        let err = ActionError::VolumeMismatch {
            expected: 256,
            found: 16,
        };
        let dyn_err: &dyn std::error::Error = &err;
        assert!(dyn_err.to_string().contains("256"));
    }
}
