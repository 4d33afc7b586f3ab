// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reconciliation tasks: the diff between recorded and recomputed matches.
//!
//! Tasks live for one reconciliation cycle. [`crate::Matcher::match_indices_with_processes`]
//! produces a [`Reconciliation`]; [`crate::Matcher::update_processes`] consumes
//! it. A `(site, process)` pair appears in at most one of the three lists.
use crate::ident::{ProcessId, SiteIndex};

/// A pair that newly matches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddTask {
    /// Site of the pair.
    pub site: SiteIndex,
    /// Process of the pair.
    pub process: ProcessId,
    /// Rate to register.
    pub rate: f64,
}

/// A pair that still matches but whose rate moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateTask {
    /// Site of the pair.
    pub site: SiteIndex,
    /// Process of the pair.
    pub process: ProcessId,
    /// Rate to store in place of the recorded one.
    pub rate: f64,
}

/// A pair that no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveTask {
    /// Site of the pair.
    pub site: SiteIndex,
    /// Process of the pair.
    pub process: ProcessId,
}

/// The three task lists of one reconciliation, each in candidate order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Pairs to purge.
    pub removes: Vec<RemoveTask>,
    /// Pairs whose rate must be refreshed.
    pub updates: Vec<UpdateTask>,
    /// Pairs to register.
    pub adds: Vec<AddTask>,
}

impl Reconciliation {
    /// Returns `true` when nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.removes.is_empty() && self.updates.is_empty() && self.adds.is_empty()
    }

    /// Total number of tasks.
    pub fn len(&self) -> usize {
        self.removes.len() + self.updates.len() + self.adds.len()
    }

    /// Every `(site, process)` pair touched, removes then updates then adds.
    pub fn pairs(&self) -> impl Iterator<Item = (SiteIndex, ProcessId)> + '_ {
        self.removes
            .iter()
            .map(|t| (t.site, t.process))
            .chain(self.updates.iter().map(|t| (t.site, t.process)))
            .chain(self.adds.iter().map(|t| (t.site, t.process)))
    }
}

/// Counts and net rate change of an applied reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApplySummary {
    /// Pairs registered.
    pub added: usize,
    /// Pairs whose rate was overwritten.
    pub updated: usize,
    /// Pairs purged.
    pub removed: usize,
    /// Sum of the signed rate deltas reported.
    pub rate_delta: f64,
}

/// Effect of a single-pair recompute ([`crate::Matcher::calculate_matching_for`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairOutcome {
    /// The pair newly matches at this rate.
    Added(f64),
    /// The pair still matches; its rate moved.
    Updated {
        /// Rate recorded before the recompute.
        old: f64,
        /// Rate recorded after the recompute.
        new: f64,
    },
    /// The pair stopped matching; it had this rate.
    Removed(f64),
    /// Nothing changed.
    Unchanged,
}
