// SPDX-License-Identifier: AGPL-3.0-only

//! Finite-step consistency check between an action and its force.
//!
//! For a refreshed action on U:
//!
//! 1. S0 = S(U), F = dS/dU
//! 2. random algebra field ω (one traceless anti-Hermitian matrix per link)
//! 3. U' = exp(dt·ω) U via a truncated series, S1 = S(U')
//! 4. ΔS_pred = dt · Σ Tr(ω · 2·Ta(F))
//!
//! The residual |S1 − S0 − ΔS_pred| is O(dt²) for a correct force. A single
//! step against a loose absolute bound is the reference smoke test;
//! [`ForceConsistency::sweep`] exposes the dt² scaling.

use serde::Serialize;
use tracing::info;

use super::force::ForceField;
use super::gauge::GaugeField;
use super::pseudofermion::PseudofermionAction;
use super::su3::Su3Matrix;
use crate::error::ActionError;

/// Default truncation order of the link update series.
pub const EXP_SERIES_ORDER: usize = 6;

/// Lowest order accepted: the series error O(dt^{order+1}) must stay far
/// below the O(dt²) residual being measured.
pub const MIN_EXP_SERIES_ORDER: usize = 5;

/// U' = Σ_{n=0}^{order} (dt·ω)^n / n! · U
///
/// Truncated Taylor series of exp(dt·ω) applied to `u`; the result is
/// unitary up to O(dt^{order+1}).
#[must_use]
pub fn exp_series_update(mom: &Su3Matrix, u: &Su3Matrix, dt: f64, order: usize) -> Su3Matrix {
    let mut result = *u;
    let mut term = *u;
    for n in 1..=order {
        term = (*mom * term).scale(dt / n as f64);
        result += term;
    }
    result
}

/// One algebra element per link from the LCG stream.
#[must_use]
pub fn random_momentum(link_count: usize, seed: &mut u64) -> Vec<Su3Matrix> {
    (0..link_count)
        .map(|_| Su3Matrix::random_algebra(seed))
        .collect()
}

/// exp(dt·ω) U for every link.
#[must_use]
pub fn evolve(gauge: &GaugeField, mom: &[Su3Matrix], dt: f64, order: usize) -> GaugeField {
    debug_assert_eq!(gauge.link_count(), mom.len());
    gauge.map_links(|i, u| exp_series_update(&mom[i], u, dt, order))
}

/// Outcome of one finite step.
#[derive(Clone, Debug, Serialize)]
pub struct ForceCheckReport {
    pub action: &'static str,
    pub dt: f64,
    /// S(U)
    pub action_before: f64,
    /// S(U')
    pub action_after: f64,
    /// S(U') − S(U)
    pub delta: f64,
    /// dt · Σ Tr(ω · 2·Ta(F))
    pub predicted: f64,
    /// |delta − predicted|
    pub residual: f64,
    pub tolerance: f64,
    /// Largest |U'U'† − 1| over the stepped links.
    pub unitarity_deviation: f64,
}

impl ForceCheckReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.residual < self.tolerance
    }

    /// Turn a failed check into an error.
    pub fn ensure(&self) -> Result<(), ActionError> {
        if self.passed() {
            Ok(())
        } else {
            Err(ActionError::NumericalInstability {
                what: "force-check residual",
                value: self.residual,
                tolerance: self.tolerance,
            })
        }
    }
}

/// Residual ratios of successive sweep steps; ≈ 4 per halving of dt for an
/// exact force.
#[must_use]
pub fn residual_ratios(reports: &[ForceCheckReport]) -> Vec<f64> {
    reports
        .windows(2)
        .map(|w| w[0].residual / w[1].residual)
        .collect()
}

/// S(U) and dS/dU of a refreshed action, evaluated once and probed along
/// any number of directions and step sizes.
pub struct ForceConsistency<'a> {
    action: &'a dyn PseudofermionAction,
    gauge: &'a GaugeField,
    action_before: f64,
    force: ForceField,
    order: usize,
}

impl<'a> ForceConsistency<'a> {
    /// Evaluate S and F on `gauge`. Fails if the action was never refreshed.
    pub fn prepare(
        action: &'a dyn PseudofermionAction,
        gauge: &'a GaugeField,
    ) -> Result<Self, ActionError> {
        let action_before = action.action(gauge)?;
        let force = action.deriv(gauge)?;
        Ok(Self {
            action,
            gauge,
            action_before,
            force,
            order: EXP_SERIES_ORDER,
        })
    }

    /// Series order for the link update; raised to `MIN_EXP_SERIES_ORDER`
    /// if lower.
    #[must_use]
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order.max(MIN_EXP_SERIES_ORDER);
        self
    }

    #[must_use]
    pub fn force(&self) -> &ForceField {
        &self.force
    }

    #[must_use]
    pub const fn action_before(&self) -> f64 {
        self.action_before
    }

    /// One finite step of size `dt` along `mom`.
    pub fn check(
        &self,
        mom: &[Su3Matrix],
        dt: f64,
        tolerance: f64,
    ) -> Result<ForceCheckReport, ActionError> {
        if mom.len() != self.gauge.link_count() {
            return Err(ActionError::VolumeMismatch {
                expected: self.gauge.link_count(),
                found: mom.len(),
            });
        }
        let ctx = self.action.context();
        let evolved = ctx.install(|| evolve(self.gauge, mom, dt, self.order));
        let action_after = self.action.action(&evolved)?;
        let predicted = dt * ctx.install(|| self.force.contract(mom));

        let delta = action_after - self.action_before;
        let report = ForceCheckReport {
            action: self.action.name(),
            dt,
            action_before: self.action_before,
            action_after,
            delta,
            predicted,
            residual: (delta - predicted).abs(),
            tolerance,
            unitarity_deviation: evolved.max_unitarity_deviation(),
        };
        info!(
            action = report.action,
            dt,
            s = format_args!("{:.15e}", report.action_before),
            s_prime = format_args!("{:.15e}", report.action_after),
            ds = format_args!("{:.15e}", report.delta),
            ds_pred = format_args!("{:.15e}", report.predicted),
            residual = report.residual,
            unitarity = report.unitarity_deviation,
            "force check"
        );
        Ok(report)
    }

    /// [`check`](Self::check) at each step size, in the order given.
    pub fn sweep(
        &self,
        mom: &[Su3Matrix],
        dts: &[f64],
        tolerance: f64,
    ) -> Result<Vec<ForceCheckReport>, ActionError> {
        dts.iter().map(|&dt| self.check(mom, dt, tolerance)).collect()
    }
}
