// SPDX-License-Identifier: AGPL-3.0-only

//! Fermion operator capability consumed by pseudofermion actions.
//!
//! An action only needs D, D†, D†D, solves against D†D (plain and shifted)
//! and the link derivatives of the bilinears a†D b and a†D†D b. The trait
//! keeps those behind one object-safe interface so that the two action
//! styles are written once and the kernel is selected at construction.
//!
//! Every method runs its field kernels inside the operator's
//! [`ParallelContext`].

use std::fmt;
use std::sync::Arc;

use super::cg::{cg_solve, multishift_cg, SolverParams};
use super::dirac::{
    apply_dirac, apply_dirac_dagger, apply_dirac_sq, dirac_link_derivative,
    HOPPING_SPECTRAL_RADIUS_SQ,
};
use super::fermion::FermionField;
use super::force::ForceField;
use super::gauge::GaugeField;
use crate::error::SolverDivergence;
use crate::parallel::ParallelContext;

/// Discretization family of an operator. Ratio actions pair equal kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelKind {
    Staggered,
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staggered => write!(f, "staggered"),
        }
    }
}

/// Dirac-type operator D with Hermitian positive-definite normal form D†D.
pub trait FermionOperator: Send + Sync + fmt::Debug {
    /// Pool every kernel of this operator runs in.
    fn context(&self) -> &ParallelContext;

    fn kernel(&self) -> KernelKind;

    /// Lower spectral bound of D†D (the bare mass squared).
    fn mass_sq(&self) -> f64;

    /// Upper spectral bound of D†D.
    fn spectral_radius_sq(&self) -> f64;

    /// D†D ψ
    fn apply(&self, gauge: &GaugeField, psi: &FermionField) -> FermionField;

    /// D ψ
    fn apply_dirac(&self, gauge: &GaugeField, psi: &FermionField) -> FermionField;

    /// D† ψ
    fn apply_dirac_dagger(&self, gauge: &GaugeField, psi: &FermionField) -> FermionField;

    /// (D†D)^{-1} rhs
    fn solve(
        &self,
        gauge: &GaugeField,
        rhs: &FermionField,
        params: &SolverParams,
    ) -> Result<FermionField, SolverDivergence>;

    /// (D†D + σ_k)^{-1} rhs for every shift, in the order given.
    fn shifted_solve(
        &self,
        gauge: &GaugeField,
        shifts: &[f64],
        rhs: &FermionField,
        params: &SolverParams,
    ) -> Result<Vec<FermionField>, SolverDivergence>;

    /// Force G of Re a†D b: Re δ(a†D b) = Σ Tr(ω · 2·Ta(G)) under δU = ωU.
    fn dirac_derivative(
        &self,
        gauge: &GaugeField,
        a: &FermionField,
        b: &FermionField,
    ) -> ForceField;

    /// Force of Re a†D† b = Re b†D a.
    fn dirac_dagger_derivative(
        &self,
        gauge: &GaugeField,
        a: &FermionField,
        b: &FermionField,
    ) -> ForceField {
        self.dirac_derivative(gauge, b, a)
    }

    /// Force of Re a†D†D b = Re (Da)†(Db).
    fn link_derivative(
        &self,
        gauge: &GaugeField,
        a: &FermionField,
        b: &FermionField,
    ) -> ForceField {
        let da = self.apply_dirac(gauge, a);
        let db = self.apply_dirac(gauge, b);
        let mut force = self.dirac_derivative(gauge, &db, a);
        let other = self.dirac_derivative(gauge, &da, b);
        self.context().install(|| force.axpy(1.0, &other));
        force
    }
}

/// Staggered operator D = m + D_hop bound to a worker pool.
#[derive(Clone, Debug)]
pub struct StaggeredOperator {
    mass: f64,
    ctx: Arc<ParallelContext>,
}

impl StaggeredOperator {
    #[must_use]
    pub fn new(mass: f64, ctx: Arc<ParallelContext>) -> Self {
        Self { mass, ctx }
    }

    #[must_use]
    pub const fn mass(&self) -> f64 {
        self.mass
    }
}

impl FermionOperator for StaggeredOperator {
    fn context(&self) -> &ParallelContext {
        &self.ctx
    }

    fn kernel(&self) -> KernelKind {
        KernelKind::Staggered
    }

    fn mass_sq(&self) -> f64 {
        self.mass * self.mass
    }

    fn spectral_radius_sq(&self) -> f64 {
        self.mass_sq() + HOPPING_SPECTRAL_RADIUS_SQ
    }

    fn apply(&self, gauge: &GaugeField, psi: &FermionField) -> FermionField {
        self.ctx.install(|| apply_dirac_sq(gauge, psi, self.mass))
    }

    fn apply_dirac(&self, gauge: &GaugeField, psi: &FermionField) -> FermionField {
        self.ctx.install(|| apply_dirac(gauge, psi, self.mass))
    }

    fn apply_dirac_dagger(&self, gauge: &GaugeField, psi: &FermionField) -> FermionField {
        self.ctx.install(|| apply_dirac_dagger(gauge, psi, self.mass))
    }

    fn solve(
        &self,
        gauge: &GaugeField,
        rhs: &FermionField,
        params: &SolverParams,
    ) -> Result<FermionField, SolverDivergence> {
        self.ctx.install(|| {
            let mut x = FermionField::zeros(rhs.volume);
            cg_solve(|p| apply_dirac_sq(gauge, p, self.mass), &mut x, rhs, params)?;
            Ok(x)
        })
    }

    fn shifted_solve(
        &self,
        gauge: &GaugeField,
        shifts: &[f64],
        rhs: &FermionField,
        params: &SolverParams,
    ) -> Result<Vec<FermionField>, SolverDivergence> {
        self.ctx.install(|| {
            multishift_cg(|p| apply_dirac_sq(gauge, p, self.mass), rhs, shifts, params)
                .map(|result| result.solutions)
        })
    }

    fn dirac_derivative(
        &self,
        gauge: &GaugeField,
        a: &FermionField,
        b: &FermionField,
    ) -> ForceField {
        ForceField::from_links(self.ctx.install(|| dirac_link_derivative(gauge, a, b)))
    }
}
