// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Collaborator contracts the matcher reads neighborhoods through.
//!
//! Topology and occupancy live outside this crate. The matcher only needs
//! the ordered neighbor list of a site and the species sitting on each
//! neighbor; [`LatticeView`] stitches the two into a [`Neighborhood`].
use crate::config::DEFAULT_GEOMETRIC_TOLERANCE;
use crate::coord::Coordinate;
use crate::entry::SiteEntry;
use crate::error::MatchError;
use crate::ident::{SiteIndex, SpeciesId};
use crate::match_list::{MatchList, Neighborhood};

/// One neighbor of a reference site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Offset from the reference site (periodic images already resolved).
    pub offset: Coordinate,
    /// Index of the neighboring site.
    pub site: SiteIndex,
}

/// Fixed neighbor topology of the lattice.
///
/// # Contract
/// - `neighbors(site)` lists every site within the largest process cutoff,
///   the reference site itself first (offset zero), in canonical order
///   ([`crate::canonical_order`]).
/// - Every site shares the same ordering convention; otherwise lock-step
///   matching is meaningless.
pub trait Topology {
    /// Number of sites in the lattice.
    fn site_count(&self) -> usize;

    /// Canonically ordered neighbor list of `site`.
    ///
    /// # Errors
    /// Returns [`MatchError::UnknownSite`] for an index outside the lattice.
    fn neighbors(&self, site: SiteIndex) -> Result<&[Neighbor], MatchError>;

    /// Basis-site index of `site` within its unit cell.
    fn basis_of(&self, site: SiteIndex) -> usize {
        let _ = site;
        0
    }
}

/// Current species per site; must reflect the post-event state when the
/// matcher runs.
pub trait Occupancy {
    /// Species occupying `site`.
    ///
    /// # Errors
    /// Returns [`MatchError::UnknownSite`] for an index outside the lattice.
    fn species_at(&self, site: SiteIndex) -> Result<SpeciesId, MatchError>;
}

/// Anything that can produce the current neighborhood of a site.
pub trait NeighborhoodSource {
    /// Builds the canonical neighborhood snapshot of `site`.
    ///
    /// # Errors
    /// Propagates collaborator failures; an unsorted neighbor list fails with
    /// [`MatchError::UnsortedMatchList`].
    fn neighborhood(&self, site: SiteIndex) -> Result<Neighborhood, MatchError>;

    /// Basis-site index of `site`, used to filter processes by basis.
    fn basis_of(&self, site: SiteIndex) -> usize;
}

/// Read-only pairing of a topology and an occupancy.
#[derive(Debug, Clone, Copy)]
pub struct LatticeView<'a, T: ?Sized, O: ?Sized> {
    topology: &'a T,
    occupancy: &'a O,
    tol: f64,
}

impl<'a, T, O> LatticeView<'a, T, O>
where
    T: Topology + ?Sized,
    O: Occupancy + ?Sized,
{
    /// Creates a view using the default geometric tolerance.
    pub fn new(topology: &'a T, occupancy: &'a O) -> Self {
        Self {
            topology,
            occupancy,
            tol: DEFAULT_GEOMETRIC_TOLERANCE,
        }
    }

    /// Overrides the tolerance used to validate neighbor ordering.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// The underlying topology.
    pub fn topology(&self) -> &'a T {
        self.topology
    }
}

impl<T, O> NeighborhoodSource for LatticeView<'_, T, O>
where
    T: Topology + ?Sized,
    O: Occupancy + ?Sized,
{
    fn neighborhood(&self, site: SiteIndex) -> Result<Neighborhood, MatchError> {
        let neighbors = self.topology.neighbors(site)?;
        let mut entries = Vec::with_capacity(neighbors.len());
        for n in neighbors {
            entries.push(SiteEntry::new(n.offset, self.occupancy.species_at(n.site)?));
        }
        MatchList::from_sorted(entries, self.tol)
    }

    fn basis_of(&self, site: SiteIndex) -> usize {
        self.topology.basis_of(site)
    }
}

impl Occupancy for [SpeciesId] {
    fn species_at(&self, site: SiteIndex) -> Result<SpeciesId, MatchError> {
        self.get(site.value())
            .copied()
            .ok_or(MatchError::UnknownSite(site))
    }
}

impl Occupancy for Vec<SpeciesId> {
    fn species_at(&self, site: SiteIndex) -> Result<SpeciesId, MatchError> {
        self.as_slice().species_at(site)
    }
}
