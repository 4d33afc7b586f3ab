// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Periodic simple-cubic topology.
//!
//! Neighbor lists are built once at construction: every integer offset within
//! the cutoff (self included), sorted with [`kmc_core::canonical_order`], and
//! resolved through periodic boundaries. Every site shares the same offset
//! order, so lock-step matching lines up.

use kmc_core::{
    canonical_order, Coordinate, MatchError, Neighbor, PatternEntry, Positioned, SiteIndex,
    Topology, DEFAULT_GEOMETRIC_TOLERANCE,
};

/// Periodic `nx × ny × nz` simple-cubic lattice with unit spacing.
///
/// Site index is `x + nx * (y + ny * z)`.
#[derive(Debug, Clone)]
pub struct CubicLattice {
    dims: [usize; 3],
    cutoff: f64,
    offsets: Vec<Coordinate>,
    neighbors: Vec<Vec<Neighbor>>,
    checkerboard: bool,
}

impl CubicLattice {
    /// Builds a lattice whose neighbor lists reach `cutoff` lattice units.
    ///
    /// # Errors
    /// Returns [`MatchError::InvalidConfig`] when the cutoff is negative or not
    /// finite, or when a dimension is too small for periodic images within the
    /// cutoff to stay distinct (each dimension must exceed `2 * ceil(cutoff)`).
    pub fn new(dims: [usize; 3], cutoff: f64) -> Result<Self, MatchError> {
        if !cutoff.is_finite() || cutoff < 0.0 {
            return Err(MatchError::InvalidConfig(format!(
                "cutoff must be finite and non-negative, got {cutoff}"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // finite, non-negative
        let reach = cutoff.ceil() as usize;
        if dims.iter().any(|&n| n <= 2 * reach) {
            return Err(MatchError::InvalidConfig(format!(
                "lattice {dims:?} too small for cutoff {cutoff}"
            )));
        }

        let tol = DEFAULT_GEOMETRIC_TOLERANCE;
        let span = 2 * reach + 1;
        let mut shifts: Vec<([usize; 3], PatternEntry)> = Vec::new();
        for iz in 0..span {
            for iy in 0..span {
                for ix in 0..span {
                    let off = Coordinate::new(
                        signed(ix, reach),
                        signed(iy, reach),
                        signed(iz, reach),
                    );
                    if off.norm() <= cutoff + tol {
                        shifts.push(([ix, iy, iz], PatternEntry::wildcard(off)));
                    }
                }
            }
        }
        shifts.sort_by(|a, b| canonical_order(&a.1, &b.1, tol));

        let [nx, ny, nz] = dims;
        let count = nx * ny * nz;
        let mut neighbors = Vec::with_capacity(count);
        for site in 0..count {
            let (x, y, z) = (site % nx, (site / nx) % ny, site / (nx * ny));
            let list = shifts
                .iter()
                .map(|([ix, iy, iz], entry)| {
                    // n > 2 * reach, so `n - reach` never underflows.
                    let px = (x + nx - reach + ix) % nx;
                    let py = (y + ny - reach + iy) % ny;
                    let pz = (z + nz - reach + iz) % nz;
                    Neighbor {
                        offset: *entry.offset(),
                        site: SiteIndex::from_raw(px + nx * (py + ny * pz)),
                    }
                })
                .collect();
            neighbors.push(list);
        }

        Ok(Self {
            dims,
            cutoff,
            offsets: shifts.iter().map(|(_, e)| *e.offset()).collect(),
            neighbors,
            checkerboard: false,
        })
    }

    /// Splits sites into two basis classes by the parity of `x + y + z`.
    pub fn with_checkerboard(mut self) -> Self {
        self.checkerboard = true;
        self
    }

    /// Lattice dimensions.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Neighbor cutoff in lattice units.
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Canonically ordered offsets shared by every site.
    pub fn offsets(&self) -> &[Coordinate] {
        &self.offsets
    }

    /// Index of the site at integer position `(x, y, z)`, wrapped periodically.
    pub fn site_at(&self, x: usize, y: usize, z: usize) -> SiteIndex {
        let [nx, ny, nz] = self.dims;
        SiteIndex::from_raw(x % nx + nx * (y % ny + ny * (z % nz)))
    }

    /// Integer position of `site`.
    pub fn position_of(&self, site: SiteIndex) -> [usize; 3] {
        let [nx, ny, _] = self.dims;
        let i = site.value();
        [i % nx, (i / nx) % ny, i / (nx * ny)]
    }

    /// Every site index in ascending order.
    pub fn sites(&self) -> impl Iterator<Item = SiteIndex> {
        (0..self.neighbors.len()).map(SiteIndex::from_raw)
    }
}

impl Topology for CubicLattice {
    fn site_count(&self) -> usize {
        self.neighbors.len()
    }

    fn neighbors(&self, site: SiteIndex) -> Result<&[Neighbor], MatchError> {
        self.neighbors
            .get(site.value())
            .map(Vec::as_slice)
            .ok_or(MatchError::UnknownSite(site))
    }

    fn basis_of(&self, site: SiteIndex) -> usize {
        if self.checkerboard {
            let [x, y, z] = self.position_of(site);
            (x + y + z) % 2
        } else {
            0
        }
    }
}

#[allow(clippy::cast_precision_loss)] // lattice extents are tiny
fn signed(i: usize, reach: usize) -> f64 {
    i as f64 - reach as f64
}
