// SPDX-License-Identifier: AGPL-3.0-only

//! Per-link force values dS/dU.
//!
//! A `ForceField` holds one 3×3 matrix F per link, normalized so that under
//! U → exp(dt·ω)·U
//!
//!   δS = dt · Σ_links Tr(ω · 2·Ta(F)) + O(dt²)
//!
//! Forces are built as new values from operator derivatives and combined with
//! `axpy`/`scaled`; nothing accumulates into a caller-owned buffer.

use rayon::prelude::*;

use super::constants::REDUCTION_CHUNK;
use super::su3::Su3Matrix;

/// One matrix per link, indexed like `GaugeField::links`.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceField {
    links: Vec<Su3Matrix>,
}

impl ForceField {
    #[must_use]
    pub fn zeros(link_count: usize) -> Self {
        Self {
            links: vec![Su3Matrix::ZERO; link_count],
        }
    }

    #[must_use]
    pub fn from_links(links: Vec<Su3Matrix>) -> Self {
        Self { links }
    }

    #[must_use]
    pub fn links(&self) -> &[Su3Matrix] {
        &self.links
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// a × self
    #[must_use]
    pub fn scaled(mut self, a: f64) -> Self {
        self.links.par_iter_mut().for_each(|f| *f = f.scale(a));
        self
    }

    /// self += a × other
    pub fn axpy(&mut self, a: f64, other: &Self) {
        debug_assert_eq!(self.len(), other.len());
        self.links
            .par_iter_mut()
            .zip(other.links.par_iter())
            .for_each(|(f, g)| *f += g.scale(a));
    }

    /// Algebra-valued force 2·Ta(F) per link.
    #[must_use]
    pub fn projected(&self) -> Vec<Su3Matrix> {
        self.links
            .par_iter()
            .map(|f| f.traceless_antihermitian().scale(2.0))
            .collect()
    }

    /// Σ_links Tr(ω · 2·Ta(F)), the first-order change of S along ω.
    ///
    /// Chunked reduction, bit-identical across thread counts.
    #[must_use]
    pub fn contract(&self, momentum: &[Su3Matrix]) -> f64 {
        debug_assert_eq!(self.len(), momentum.len());
        let partials: Vec<f64> = self
            .links
            .par_chunks(REDUCTION_CHUNK)
            .zip(momentum.par_chunks(REDUCTION_CHUNK))
            .map(|(fs, ws)| {
                fs.iter()
                    .zip(ws)
                    .map(|(f, w)| (*w * f.traceless_antihermitian().scale(2.0)).re_trace())
                    .sum::<f64>()
            })
            .collect();
        partials.into_iter().sum()
    }

    /// Σ_links |2·Ta(F)|², a size measure for logging.
    #[must_use]
    pub fn norm_sq(&self) -> f64 {
        let partials: Vec<f64> = self
            .links
            .par_chunks(REDUCTION_CHUNK)
            .map(|fs| {
                fs.iter()
                    .map(|f| f.traceless_antihermitian().scale(2.0).norm_sq())
                    .sum::<f64>()
            })
            .collect();
        partials.into_iter().sum()
    }
}
