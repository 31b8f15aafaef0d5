// SPDX-License-Identifier: AGPL-3.0-only

//! Pseudofermion actions for ratios of fermion determinants.
//!
//! A pseudofermion field φ stands in for a determinant ratio through a
//! Gaussian integral
//!
//!   det(K)^{-1} ∝ ∫ Dφ†Dφ exp(−φ† K φ)
//!
//! and is refreshed once per trajectory by a heat bath φ = W η with
//! W† K W = 1. Two kernels are provided:
//!
//! - [`TwoFlavourRatioAction`]: K = V (D†D)^{-1} V† with V a heavy
//!   (Pauli-Villars-like) partner of the light operator D. Represents
//!   det(D†D) / det(V†V).
//! - [`ExactOneFlavourRatioAction`]: K = M = 1 + k A^{-1} with A = D_l†D_l,
//!   k = m_r² − m_l². Represents det(A) / det(A + k), a single flavour
//!   against a heavier partner, refreshed through a rational approximation
//!   of M^{-1/2}.
//!
//! Both expose the same lifecycle: `refresh` draws φ, then `action` (S) and
//! `deriv` (dS/dU) read φ against any gauge field. `action` and `deriv`
//! before the first refresh are precondition violations.
//!
//! # Force normalization
//!
//! `deriv` returns F with
//!
//!   S(exp(dt·ω) U) − S(U) = dt · Σ_links Tr(ω · 2·Ta(F)) + O(dt²)
//!
//! for any traceless anti-Hermitian ω, Ta(W) = (W − W†)/2 − Tr(W − W†)/6.
//!
//! # References
//!
//! - Hasenbusch, PLB 519, 177 (2001) — determinant ratios
//! - Clark & Kennedy, PRL 98, 051601 (2007) — rational heat bath
//! - Chen & Chiu, PLB 738, 55 (2014) — exact one-flavour algorithm

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cg::SolverParams;
use super::complex_f64::Complex64;
use super::fermion::FermionField;
use super::force::ForceField;
use super::gauge::GaugeField;
use super::noise::NoiseSource;
use super::operator::FermionOperator;
use super::rational::{Exponent, RationalApproximation};
use crate::config::ActionConfig;
use crate::error::ActionError;
use crate::parallel::ParallelContext;

/// Stochastic estimate of a determinant ratio, refreshed once per trajectory.
pub trait PseudofermionAction: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Pool the action's field arithmetic runs in.
    fn context(&self) -> &ParallelContext;

    /// Factor applied to unit gaussian noise before the heat bath.
    fn noise_scale(&self) -> f64;

    /// Draw η from `noise`, scale it by [`noise_scale`](Self::noise_scale)
    /// and run the heat bath.
    fn refresh(
        &mut self,
        gauge: &GaugeField,
        noise: &mut dyn NoiseSource,
    ) -> Result<(), ActionError> {
        let mut eta = noise.gaussian(gauge.volume());
        let scale = self.noise_scale();
        self.context().install(|| eta.scale_inplace(scale));
        self.refresh_with_noise(gauge, &eta)
    }

    /// Heat bath from caller-provided η, used as is.
    fn refresh_with_noise(
        &mut self,
        gauge: &GaugeField,
        eta: &FermionField,
    ) -> Result<(), ActionError>;

    /// S = φ† K φ on `gauge`.
    fn action(&self, gauge: &GaugeField) -> Result<f64, ActionError>;

    /// dS/dU on `gauge`, normalized as in the module docs.
    fn deriv(&self, gauge: &GaugeField) -> Result<ForceField, ActionError>;

    /// K ψ, the kernel whose expectation in φ is S.
    fn apply_operator(
        &self,
        gauge: &GaugeField,
        psi: &FermionField,
    ) -> Result<FermionField, ActionError>;

    /// Current pseudofermion field, `None` before the first refresh.
    fn phi(&self) -> Option<&FermionField>;
}

fn check_volume(gauge: &GaugeField, field: &FermionField) -> Result<(), ActionError> {
    if gauge.volume() == field.volume {
        Ok(())
    } else {
        Err(ActionError::VolumeMismatch {
            expected: gauge.volume(),
            found: field.volume,
        })
    }
}

fn refreshed<'a>(
    phi: Option<&'a FermionField>,
    gauge: &GaugeField,
    operation: &'static str,
) -> Result<&'a FermionField, ActionError> {
    let phi = phi.ok_or(ActionError::PreconditionViolation { operation })?;
    check_volume(gauge, phi)?;
    Ok(phi)
}

/// Real part of a Hermitian form, refusing a non-negligible imaginary residue.
fn real_action(value: Complex64, tolerance: f64) -> Result<f64, ActionError> {
    let bound = tolerance * value.re.abs().max(1.0);
    if value.im.abs() > bound {
        return Err(ActionError::NumericalInstability {
            what: "imaginary part of action",
            value: value.im,
            tolerance: bound,
        });
    }
    Ok(value.re)
}

fn check_pair(
    light: &dyn FermionOperator,
    heavy: &dyn FermionOperator,
) -> Result<(), ActionError> {
    if light.kernel() != heavy.kernel() {
        return Err(ActionError::IncompatibleOperators(format!(
            "cannot pair a {} operator with a {} operator",
            light.kernel(),
            heavy.kernel()
        )));
    }
    for op in [light, heavy] {
        if !(op.mass_sq() > 0.0) {
            return Err(ActionError::IncompatibleOperators(format!(
                "normal operator needs a positive spectral floor, got m² = {}",
                op.mass_sq()
            )));
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════
//  Two-flavour ratio
// ═══════════════════════════════════════════════════════════════════

/// det(D†D) / det(V†V) with V the heavy numerator, D the light denominator.
///
///   S = φ† V (D†D)^{-1} V† φ,   heat bath φ = V (V†V)^{-1} D† η
#[derive(Debug)]
pub struct TwoFlavourRatioAction {
    numerator: Arc<dyn FermionOperator>,
    denominator: Arc<dyn FermionOperator>,
    solver: SolverParams,
    noise_scale: f64,
    imaginary_tolerance: f64,
    phi: Option<FermionField>,
}

impl TwoFlavourRatioAction {
    /// `numerator` is the heavy Pauli-Villars-like operator V, `denominator`
    /// the light operator D.
    pub fn new(
        numerator: Arc<dyn FermionOperator>,
        denominator: Arc<dyn FermionOperator>,
        config: &ActionConfig,
    ) -> Result<Self, ActionError> {
        check_pair(denominator.as_ref(), numerator.as_ref())?;
        debug!(
            light_mass_sq = denominator.mass_sq(),
            heavy_mass_sq = numerator.mass_sq(),
            "two-flavour ratio action"
        );
        Ok(Self {
            numerator,
            denominator,
            solver: config.solver,
            noise_scale: config.noise_scale,
            imaginary_tolerance: config.imaginary_tolerance,
            phi: None,
        })
    }

    /// X = (D†D)^{-1} V† φ together with V† φ.
    fn solve_denominator(
        &self,
        gauge: &GaugeField,
        phi: &FermionField,
    ) -> Result<(FermionField, FermionField), ActionError> {
        let y = self.numerator.apply_dirac_dagger(gauge, phi);
        let x = self.denominator.solve(gauge, &y, &self.solver)?;
        Ok((x, y))
    }
}

impl PseudofermionAction for TwoFlavourRatioAction {
    fn name(&self) -> &'static str {
        "two_flavour_ratio"
    }

    fn context(&self) -> &ParallelContext {
        self.denominator.context()
    }

    fn noise_scale(&self) -> f64 {
        self.noise_scale
    }

    fn refresh_with_noise(
        &mut self,
        gauge: &GaugeField,
        eta: &FermionField,
    ) -> Result<(), ActionError> {
        check_volume(gauge, eta)?;
        let rhs = self.denominator.apply_dirac_dagger(gauge, eta);
        let y = self.numerator.solve(gauge, &rhs, &self.solver)?;
        let phi = self.numerator.apply_dirac(gauge, &y);
        info!(
            action = self.name(),
            eta_norm_sq = self.context().install(|| eta.norm_sq()),
            "pseudofermion refreshed"
        );
        self.phi = Some(phi);
        Ok(())
    }

    fn action(&self, gauge: &GaugeField) -> Result<f64, ActionError> {
        let phi = refreshed(self.phi.as_ref(), gauge, "action")?;
        let (x, y) = self.solve_denominator(gauge, phi)?;
        let s = real_action(self.context().install(|| y.dot(&x)), self.imaginary_tolerance)?;
        debug!(action = self.name(), s, "action evaluated");
        Ok(s)
    }

    fn deriv(&self, gauge: &GaugeField) -> Result<ForceField, ActionError> {
        let phi = refreshed(self.phi.as_ref(), gauge, "deriv")?;
        let (x, _) = self.solve_denominator(gauge, phi)?;

        // dS = 2 Re X† δ(V†) φ − X† δ(D†D) X
        let mut force = self
            .numerator
            .dirac_dagger_derivative(gauge, &x, phi)
            .scaled(2.0);
        let light = self.denominator.link_derivative(gauge, &x, &x);
        self.context().install(|| force.axpy(-1.0, &light));
        Ok(force)
    }

    fn apply_operator(
        &self,
        gauge: &GaugeField,
        psi: &FermionField,
    ) -> Result<FermionField, ActionError> {
        check_volume(gauge, psi)?;
        let (x, _) = self.solve_denominator(gauge, psi)?;
        Ok(self.numerator.apply_dirac(gauge, &x))
    }

    fn phi(&self) -> Option<&FermionField> {
        self.phi.as_ref()
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Exact one flavour
// ═══════════════════════════════════════════════════════════════════

/// det(A) / det(A + k) for A = D_l†D_l and k = m_r² − m_l² > 0.
///
///   S = φ† (1 + k A^{-1}) φ,   heat bath φ = R(M) η ≈ M^{-1/2} η
///
/// With R(x) = a0 + Σ r_i / (x + p_i), each pole term of R(M) becomes one
/// shifted solve against A:
///
///   (M + p)^{-1} = (1/(1+p)) · (A + k/(1+p))^{-1} A
///
/// so the whole heat bath is a single multi-shift solve.
#[derive(Debug)]
pub struct ExactOneFlavourRatioAction {
    left: Arc<dyn FermionOperator>,
    right: Arc<dyn FermionOperator>,
    approximation: RationalApproximation,
    mass_gap: f64,
    solver: SolverParams,
    noise_scale: f64,
    imaginary_tolerance: f64,
    phi: Option<FermionField>,
}

impl ExactOneFlavourRatioAction {
    /// `left` is the light operator, `right` the heavier partner.
    ///
    /// Builds the rational approximation from `config.rational`; a fit that
    /// misses its precision aborts construction.
    pub fn new(
        left: Arc<dyn FermionOperator>,
        right: Arc<dyn FermionOperator>,
        config: &ActionConfig,
    ) -> Result<Self, ActionError> {
        check_pair(left.as_ref(), right.as_ref())?;
        let mass_gap = right.mass_sq() - left.mass_sq();
        if !(mass_gap > 0.0) {
            return Err(ActionError::IncompatibleOperators(format!(
                "right operator must be heavier: m_r² − m_l² = {mass_gap}"
            )));
        }

        let approximation = RationalApproximation::build(&config.rational, Exponent::INVERSE_SQRT)?;
        info!(
            degree = approximation.degree(),
            error = approximation.error(),
            iterations = approximation.iterations(),
            "rational approximation of x^(-1/2) ready"
        );

        // σ(M) = 1 + k / σ(A)
        let m_lo = 1.0 + mass_gap / left.spectral_radius_sq();
        let m_hi = 1.0 + mass_gap / left.mass_sq();
        if !approximation.bounds().covers(m_lo, m_hi) {
            warn!(
                m_lo,
                m_hi,
                lo = approximation.bounds().lo(),
                hi = approximation.bounds().hi(),
                "operator spectrum not covered by the rational approximation"
            );
        }

        Ok(Self {
            left,
            right,
            approximation,
            mass_gap,
            solver: config.solver,
            noise_scale: config.noise_scale,
            imaginary_tolerance: config.imaginary_tolerance,
            phi: None,
        })
    }

    #[must_use]
    pub fn approximation(&self) -> &RationalApproximation {
        &self.approximation
    }

    /// k = m_r² − m_l²
    #[must_use]
    pub const fn mass_gap(&self) -> f64 {
        self.mass_gap
    }

    #[must_use]
    pub fn right(&self) -> &dyn FermionOperator {
        self.right.as_ref()
    }
}

impl PseudofermionAction for ExactOneFlavourRatioAction {
    fn name(&self) -> &'static str {
        "exact_one_flavour_ratio"
    }

    fn context(&self) -> &ParallelContext {
        self.left.context()
    }

    fn noise_scale(&self) -> f64 {
        self.noise_scale
    }

    fn refresh_with_noise(
        &mut self,
        gauge: &GaugeField,
        eta: &FermionField,
    ) -> Result<(), ActionError> {
        check_volume(gauge, eta)?;
        let k = self.mass_gap;
        let shifts: Vec<f64> = self.approximation.poles().map(|p| k / (1.0 + p)).collect();

        let a_eta = self.left.apply(gauge, eta);
        let solutions = self.left.shifted_solve(gauge, &shifts, &a_eta, &self.solver)?;

        let mut terms = Vec::with_capacity(solutions.len() + 1);
        terms.push((self.approximation.norm(), eta));
        for (term, x) in self.approximation.terms().iter().zip(&solutions) {
            terms.push((term.residue / (1.0 + term.pole), x));
        }
        let phi = self
            .context()
            .install(|| FermionField::linear_combination(&terms));

        info!(
            action = self.name(),
            shifts = shifts.len(),
            eta_norm_sq = self.context().install(|| eta.norm_sq()),
            "pseudofermion refreshed"
        );
        self.phi = Some(phi);
        Ok(())
    }

    fn action(&self, gauge: &GaugeField) -> Result<f64, ActionError> {
        let phi = refreshed(self.phi.as_ref(), gauge, "action")?;
        let x = self.left.solve(gauge, phi, &self.solver)?;
        let value = self.context().install(|| {
            Complex64::real(phi.norm_sq()) + phi.dot(&x).scale(self.mass_gap)
        });
        let s = real_action(value, self.imaginary_tolerance)?;
        debug!(action = self.name(), s, "action evaluated");
        Ok(s)
    }

    fn deriv(&self, gauge: &GaugeField) -> Result<ForceField, ActionError> {
        let phi = refreshed(self.phi.as_ref(), gauge, "deriv")?;
        let x = self.left.solve(gauge, phi, &self.solver)?;

        // dS = k δ(φ† A^{-1} φ) = −k X† δA X
        let force = self.left.link_derivative(gauge, &x, &x);
        Ok(self.context().install(|| force.scaled(-self.mass_gap)))
    }

    fn apply_operator(
        &self,
        gauge: &GaugeField,
        psi: &FermionField,
    ) -> Result<FermionField, ActionError> {
        check_volume(gauge, psi)?;
        let x = self.left.solve(gauge, psi, &self.solver)?;
        Ok(self.context().install(|| {
            let mut out = psi.clone();
            out.axpy_real(self.mass_gap, &x);
            out
        }))
    }

    fn phi(&self) -> Option<&FermionField> {
        self.phi.as_ref()
    }
}
