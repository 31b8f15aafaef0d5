// SPDX-License-Identifier: AGPL-3.0-only

//! Validation harness for hotSpring binaries.
//!
//! Every validation binary follows the same pattern:
//!   - Explicit pass/fail checks against constants from `tolerances`
//!   - Exit code 0 (all checks pass) or 1 (any check fails)
//!   - Human-readable table plus a machine-readable JSON summary on stdout

use std::fmt::Write as _;
use std::process;

use serde::Serialize;

/// A single validation check with result tracking.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub label: String,
    pub passed: bool,
    pub observed: f64,
    /// Expected value, or the bound for one-sided checks
    pub expected: f64,
    pub tolerance: f64,
    pub mode: ToleranceMode,
}

/// How a tolerance threshold is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceMode {
    /// |observed - expected| < tolerance
    Absolute,
    /// |observed - expected| / |expected| < tolerance
    Relative,
    /// observed < threshold
    UpperBound,
    /// lo <= observed < hi
    Range,
    /// boolean outcome
    Flag,
}

impl std::fmt::Display for ToleranceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "abs"),
            Self::Relative => write!(f, "rel"),
            Self::UpperBound => write!(f, "<"),
            Self::Range => write!(f, "range"),
            Self::Flag => write!(f, "flag"),
        }
    }
}

/// Accumulates validation checks and produces a summary with exit code.
#[derive(Debug, Default, Serialize)]
#[must_use]
pub struct ValidationHarness {
    pub name: String,
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    #[must_use = "validation harness must be used to run checks"]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    /// |observed - expected| < tolerance
    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        self.push(
            label,
            (observed - expected).abs() < tolerance,
            observed,
            expected,
            tolerance,
            ToleranceMode::Absolute,
        );
    }

    /// |observed - expected| / |expected| < tolerance, absolute near zero.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > crate::tolerances::NEAR_ZERO_EXPECTED {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.push(label, passed, observed, expected, tolerance, ToleranceMode::Relative);
    }

    /// observed < threshold; NaN fails.
    pub fn check_upper(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed < threshold,
            observed,
            threshold,
            threshold,
            ToleranceMode::UpperBound,
        );
    }

    /// lo <= observed < hi. Recorded with expected = midpoint, tolerance = half width.
    pub fn check_range(&mut self, label: &str, observed: f64, lo: f64, hi: f64) {
        self.push(
            label,
            (lo..hi).contains(&observed),
            observed,
            0.5 * (lo + hi),
            0.5 * (hi - lo),
            ToleranceMode::Range,
        );
    }

    pub fn check_bool(&mut self, label: &str, passed: bool) {
        self.push(
            label,
            passed,
            f64::from(u8::from(passed)),
            1.0,
            0.0,
            ToleranceMode::Flag,
        );
    }

    fn push(
        &mut self,
        label: &str,
        passed: bool,
        observed: f64,
        expected: f64,
        tolerance: f64,
        mode: ToleranceMode,
    ) {
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            mode,
        });
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.checks.len()
    }

    /// Vacuously true with no checks.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Names of failed checks, in insertion order.
    #[must_use]
    pub fn failed_labels(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect()
    }

    /// Summary table as printed by [`finish`](Self::finish).
    #[must_use]
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {} validation: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.total_count()
        );
        for check in &self.checks {
            let icon = if check.passed { "✓" } else { "✗" };
            let _ = writeln!(
                s,
                "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                check.label, check.observed, check.expected, check.tolerance, check.mode
            );
        }
        s
    }

    /// Print summary and exit: 0 if all checks pass, 1 otherwise.
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.format_summary());

        if self.all_passed() {
            println!("ALL CHECKS PASSED");
            process::exit(0);
        } else {
            println!("FAILED CHECKS: {}", self.failed_labels().join(", "));
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_tracks_pass_fail() {
        let mut h = ValidationHarness::new("test");
        h.check_abs("refresh identity", 1e-11, 0.0, 1e-8);
        h.check_abs("close", 1.0001, 1.0, 1e-3);
        h.check_abs("far", 2.0, 1.0, 1e-3);
        assert_eq!(h.passed_count(), 2);
        assert_eq!(h.total_count(), 3);
        assert!(!h.all_passed());
        assert_eq!(h.failed_labels(), vec!["far"]);
    }

    #[test]
    fn relative_check_handles_zero() {
        let mut h = ValidationHarness::new("test");
        h.check_rel("near_zero", 1e-15, 0.0, 1e-10);
        h.check_rel("action", 112.131_190_3, 112.131_190_4, 1e-8);
        h.check_rel("wrong sign", 16.0, -16.0, 0.1);
        assert!(h.checks[0].passed);
        assert!(h.checks[1].passed);
        assert!(!h.checks[2].passed);
    }

    #[test]
    fn upper_bound_is_strict_and_rejects_nan() {
        let mut h = ValidationHarness::new("test");
        h.check_upper("below", 8e-6, 1.0);
        h.check_upper("at", 1.0, 1.0);
        h.check_upper("nan", f64::NAN, 1.0);
        assert!(h.checks[0].passed);
        assert!(!h.checks[1].passed);
        assert!(!h.checks[2].passed);
    }

    #[test]
    fn range_check_is_half_open() {
        let mut h = ValidationHarness::new("test");
        h.check_range("ratio", 3.99, 3.0, 5.0);
        h.check_range("linear", 2.0, 3.0, 5.0);
        h.check_range("upper edge", 5.0, 3.0, 5.0);
        assert!(h.checks[0].passed);
        assert!(!h.checks[1].passed);
        assert!(!h.checks[2].passed);
        assert_eq!(h.checks[0].expected, 4.0);
        assert_eq!(h.checks[0].tolerance, 1.0);
    }

    #[test]
    fn bool_checks_and_empty_harness() {
        let empty = ValidationHarness::new("empty");
        assert!(empty.all_passed());
        assert_eq!(empty.total_count(), 0);

        let mut h = ValidationHarness::new("test");
        h.check_bool("phi refreshed", false);
        assert!(!h.checks[0].passed);
        assert_eq!(h.checks[0].mode, ToleranceMode::Flag);
    }

    #[test]
    fn summary_lists_every_check() {
        let mut h = ValidationHarness::new("pseudofermion_force");
        h.check_abs("abs", 1.0, 1.0, 1e-10);
        h.check_upper("upper", 0.5, 1.0);
        h.check_range("range", 4.0, 3.0, 5.0);
        h.check_bool("bool", false);
        let s = h.format_summary();
        assert!(s.contains("pseudofermion_force validation: 3/4"));
        for label in ["abs", "upper", "range", "bool"] {
            assert!(s.contains(label), "{label} missing from summary");
        }
        assert!(s.contains('✗'));
    }

    #[test]
    fn serializes_to_json() {
        let mut h = ValidationHarness::new("json");
        h.check_upper("force residual", 8.2e-6, 1.0);
        let json = serde_json::to_string(&h).expect("serialize");
        assert!(json.contains("\"mode\":\"upper_bound\""), "{json}");
        assert!(json.contains("\"label\":\"force residual\""), "{json}");
    }
}
