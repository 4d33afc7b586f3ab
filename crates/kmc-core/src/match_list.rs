// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical match lists.
//!
//! Ordering invariant
//! - Entries are sorted by [`canonical_order`]: distance first, then the
//!   offset's x, y, z components, all on the geometric tolerance grid.
//! - The invariant is established at construction ([`MatchList::from_sorted`]
//!   validates, [`MatchList::from_unsorted`] sorts) and never re-checked:
//!   a `MatchList` cannot be mutated after it is built.
use core::cmp::Ordering;
use core::ops::Deref;

use crate::entry::{canonical_order, PatternEntry, Positioned, Requirement, SiteEntry};
use crate::error::MatchError;

/// Ordered sequence of entries in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchList<E> {
    entries: Vec<E>,
}

/// The required local arrangement of a process.
pub type ProcessPattern = MatchList<PatternEntry>;

/// The actual local arrangement around a site.
pub type Neighborhood = MatchList<SiteEntry>;

impl<E: Positioned> MatchList<E> {
    /// Wraps entries that the caller already sorted canonically.
    ///
    /// # Errors
    /// Returns [`MatchError::UnsortedMatchList`] naming the first entry that
    /// sorts before its predecessor.
    pub fn from_sorted(entries: Vec<E>, tol: f64) -> Result<Self, MatchError> {
        if let Some(position) = first_out_of_order(&entries, tol) {
            return Err(MatchError::UnsortedMatchList { position });
        }
        Ok(Self { entries })
    }

    /// Sorts entries canonically. The sort is stable, so entries that compare
    /// equal keep their input order.
    pub fn from_unsorted(mut entries: Vec<E>, tol: f64) -> Self {
        entries.sort_by(|a, b| canonical_order(a, b, tol));
        Self { entries }
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    /// Largest distance in the list; zero for an empty list.
    pub fn cutoff(&self) -> f64 {
        self.entries.last().map_or(0.0, Positioned::distance)
    }
}

impl<E> Deref for MatchList<E> {
    type Target = [E];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl<E> Default for MatchList<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl MatchList<PatternEntry> {
    /// Returns `true` when any entry only feeds the rate function.
    pub fn has_rate_dependencies(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.requirement() == Requirement::RateDependency)
    }
}

fn first_out_of_order<E: Positioned>(entries: &[E], tol: f64) -> Option<usize> {
    entries
        .windows(2)
        .position(|w| canonical_order(&w[0], &w[1], tol) == Ordering::Greater)
        .map(|i| i + 1)
}
