// SPDX-License-Identifier: AGPL-3.0-only

//! SU(3) gauge connection on a periodic 4D lattice.
//!
//! The connection is the background field every pseudofermion operation
//! reads. It is passed by reference into refresh, action and force calls
//! and never mutated by them; the force check builds perturbed copies with
//! [`GaugeField::map_links`].

use super::constants::{HOT_START_EPSILON, N_DIM};
use super::su3::Su3Matrix;
use crate::error::ActionError;

/// 4D lattice of SU(3) link variables.
///
/// Links are stored as `links[site * 4 + mu]`, mu ∈ {0,1,2,3}.
#[derive(Clone, Debug, PartialEq)]
pub struct GaugeField {
    /// Extents `[Nx, Ny, Nz, Nt]`.
    pub dims: [usize; 4],
    /// Link variables: links[site * 4 + mu]
    pub links: Vec<Su3Matrix>,
}

impl GaugeField {
    /// Total number of lattice sites.
    #[must_use]
    pub const fn volume(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2] * self.dims[3]
    }

    /// Number of links (volume × 4).
    #[must_use]
    pub const fn link_count(&self) -> usize {
        self.volume() * N_DIM
    }

    /// Convert 4D coordinates to linear site index.
    ///
    /// Convention: `dims = [Nx, Ny, Nz, Nt]`, `x = [x, y, z, t]`.
    /// z fastest, then y, then x, then t (slowest):
    /// `idx = t*NxNyNz + x*NyNz + y*Nz + z`
    #[must_use]
    pub const fn site_index(&self, x: [usize; 4]) -> usize {
        x[3] * (self.dims[0] * self.dims[1] * self.dims[2])
            + x[0] * (self.dims[1] * self.dims[2])
            + x[1] * self.dims[2]
            + x[2]
    }

    /// Convert linear site index to 4D coordinates `[x, y, z, t]`.
    #[must_use]
    pub const fn site_coords(&self, idx: usize) -> [usize; 4] {
        let nxyz = self.dims[0] * self.dims[1] * self.dims[2];
        let t = idx / nxyz;
        let rem = idx % nxyz;
        let x0 = rem / (self.dims[1] * self.dims[2]);
        let rem2 = rem % (self.dims[1] * self.dims[2]);
        let x1 = rem2 / self.dims[2];
        let x2 = rem2 % self.dims[2];
        [x0, x1, x2, t]
    }

    /// Neighbor in direction mu with periodic boundary conditions.
    #[must_use]
    pub const fn neighbor(&self, x: [usize; 4], mu: usize, forward: bool) -> [usize; 4] {
        let mut y = x;
        if forward {
            y[mu] = (x[mu] + 1) % self.dims[mu];
        } else {
            y[mu] = (x[mu] + self.dims[mu] - 1) % self.dims[mu];
        }
        y
    }

    /// Cold start: all links = identity.
    #[must_use]
    pub fn cold_start(dims: [usize; 4]) -> Self {
        let vol = dims.iter().product::<usize>();
        Self {
            dims,
            links: vec![Su3Matrix::IDENTITY; vol * N_DIM],
        }
    }

    /// Hot start: random SU(3) links drawn from the LCG stream at `seed`.
    #[must_use]
    pub fn hot_start(dims: [usize; 4], seed: u64) -> Self {
        let vol = dims.iter().product::<usize>();
        let mut rng_seed = seed;
        let links = (0..vol * N_DIM)
            .map(|_| Su3Matrix::random_near_identity(&mut rng_seed, HOT_START_EPSILON))
            .collect();
        Self { dims, links }
    }

    /// Wrap an existing link array; fails unless `links.len() == volume * 4`.
    pub fn from_links(dims: [usize; 4], links: Vec<Su3Matrix>) -> Result<Self, ActionError> {
        let expected = dims.iter().product::<usize>() * N_DIM;
        if links.len() != expected {
            return Err(ActionError::VolumeMismatch {
                expected,
                found: links.len(),
            });
        }
        Ok(Self { dims, links })
    }

    /// New connection with every link replaced by `f(link_index, link)`.
    #[must_use]
    pub fn map_links<F>(&self, f: F) -> Self
    where
        F: Fn(usize, &Su3Matrix) -> Su3Matrix,
    {
        Self {
            dims: self.dims,
            links: self.links.iter().enumerate().map(|(i, u)| f(i, u)).collect(),
        }
    }

    /// Largest Frobenius deviation of U U† from identity over all links.
    #[must_use]
    pub fn max_unitarity_deviation(&self) -> f64 {
        self.links
            .iter()
            .map(|u| u.unitarity_deviation())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_index_roundtrip() {
        let lat = GaugeField::cold_start([2, 3, 4, 5]);
        for idx in 0..lat.volume() {
            assert_eq!(lat.site_index(lat.site_coords(idx)), idx);
        }
    }

    #[test]
    fn neighbor_wraps_periodically() {
        let lat = GaugeField::cold_start([4, 4, 4, 4]);
        assert_eq!(lat.neighbor([3, 0, 0, 0], 0, true), [0, 0, 0, 0]);
        assert_eq!(lat.neighbor([0, 0, 0, 0], 3, false), [0, 0, 0, 3]);
        let x = [1, 2, 3, 0];
        for mu in 0..4 {
            let there = lat.neighbor(x, mu, true);
            assert_eq!(lat.neighbor(there, mu, false), x);
        }
    }

    #[test]
    fn hot_start_is_deterministic_and_unitary() {
        let a = GaugeField::hot_start([2, 2, 2, 2], 42);
        let b = GaugeField::hot_start([2, 2, 2, 2], 42);
        assert_eq!(a, b);
        assert!(a.max_unitarity_deviation() < 1e-12);
        let c = GaugeField::hot_start([2, 2, 2, 2], 43);
        assert_ne!(a, c);
    }

    #[test]
    fn from_links_rejects_wrong_length() {
        let err = GaugeField::from_links([2, 2, 2, 2], vec![Su3Matrix::IDENTITY; 10]);
        assert!(matches!(
            err,
            Err(ActionError::VolumeMismatch {
                expected: 64,
                found: 10
            })
        ));
    }
}
