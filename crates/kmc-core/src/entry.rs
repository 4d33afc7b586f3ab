// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Match-list entries: one relative offset plus what sits (or must sit) there.
use core::cmp::Ordering;

use crate::coord::{cmp_quantized, Coordinate};
use crate::ident::SpeciesId;

/// Geometry shared by pattern and site entries.
pub trait Positioned {
    /// Offset of the entry relative to the reference site.
    fn offset(&self) -> &Coordinate;
    /// Distance of the entry from the reference site (primary sort key).
    fn distance(&self) -> f64;
}

/// What a process pattern demands at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Requirement {
    /// The site at this offset must hold exactly this species.
    Species(SpeciesId),
    /// Any species satisfies this position.
    Wildcard,
    /// Never rejects a match; marks a position the rate depends on.
    RateDependency,
}

impl Requirement {
    /// Returns `true` when `species` satisfies this requirement.
    #[inline]
    pub fn is_satisfied_by(self, species: SpeciesId) -> bool {
        match self {
            Self::Species(required) => required == species,
            Self::Wildcard | Self::RateDependency => true,
        }
    }
}

/// One position of a process pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternEntry {
    offset: Coordinate,
    distance: f64,
    requirement: Requirement,
}

impl PatternEntry {
    /// Builds an entry; the distance is derived from the offset.
    pub fn new(offset: Coordinate, requirement: Requirement) -> Self {
        Self {
            distance: offset.norm(),
            offset,
            requirement,
        }
    }

    /// Shorthand for a [`Requirement::Species`] entry.
    pub fn species(offset: impl Into<Coordinate>, species: SpeciesId) -> Self {
        Self::new(offset.into(), Requirement::Species(species))
    }

    /// Shorthand for a [`Requirement::Wildcard`] entry.
    pub fn wildcard(offset: impl Into<Coordinate>) -> Self {
        Self::new(offset.into(), Requirement::Wildcard)
    }

    /// Shorthand for a [`Requirement::RateDependency`] entry.
    pub fn rate_dependency(offset: impl Into<Coordinate>) -> Self {
        Self::new(offset.into(), Requirement::RateDependency)
    }

    /// The requirement at this position.
    pub fn requirement(&self) -> Requirement {
        self.requirement
    }
}

impl Positioned for PatternEntry {
    fn offset(&self) -> &Coordinate {
        &self.offset
    }
    fn distance(&self) -> f64 {
        self.distance
    }
}

/// One position of an actual site neighborhood.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiteEntry {
    offset: Coordinate,
    distance: f64,
    species: SpeciesId,
}

impl SiteEntry {
    /// Builds an entry; the distance is derived from the offset.
    pub fn new(offset: impl Into<Coordinate>, species: SpeciesId) -> Self {
        let offset = offset.into();
        Self {
            distance: offset.norm(),
            offset,
            species,
        }
    }

    /// Species currently occupying this position.
    pub fn species(&self) -> SpeciesId {
        self.species
    }
}

impl Positioned for SiteEntry {
    fn offset(&self) -> &Coordinate {
        &self.offset
    }
    fn distance(&self) -> f64 {
        self.distance
    }
}

/// Canonical match-list order: distance ascending, then x, y and z
/// descending, each compared on a grid of spacing `tol`.
///
/// At equal distance `+x` precedes `+y`, which precedes `+z`, `-z`, `-y`
/// and `-x`.
///
/// Pattern and neighborhood lists built over the same topology and sorted
/// with this order put geometrically corresponding entries at the same
/// position, which is what lets [`crate::Matcher::is_match`] walk them in
/// lock-step.
pub fn canonical_order<A, B>(a: &A, b: &B, tol: f64) -> Ordering
where
    A: Positioned + ?Sized,
    B: Positioned + ?Sized,
{
    cmp_quantized(a.distance(), b.distance(), tol)
        .then_with(|| b.offset().cmp_with_tolerance(a.offset(), tol))
}
