// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error type shared by the matcher, catalog, and collaborator views.
//!
//! Every variant is a broken invariant between trusted in-process
//! collaborators. Callers are expected to abort the simulation rather than
//! retry: nothing here is transient.
use thiserror::Error;

use crate::ident::{ProcessId, SiteIndex};

/// Errors emitted by the matching engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// A process pattern reaches past the site's neighborhood; the topology
    /// cutoff is shorter than the process cutoff.
    #[error(
        "pattern of process {process:?} has {pattern_len} entries but site {site:?} \
         neighborhood only has {neighborhood_len}; topology cutoff too small"
    )]
    PatternTooLong {
        /// Offending process.
        process: Option<ProcessId>,
        /// Site whose neighborhood was too short.
        site: Option<SiteIndex>,
        /// Number of entries in the pattern.
        pattern_len: usize,
        /// Number of entries in the neighborhood.
        neighborhood_len: usize,
    },
    /// A match list was handed in out of canonical order.
    #[error("match list not in canonical order at position {position}")]
    UnsortedMatchList {
        /// First position whose entry sorts before its predecessor.
        position: usize,
    },
    /// Pattern and neighborhood disagree on the offset at a position; the two
    /// lists were not built over the same neighbor topology.
    #[error("pattern and neighborhood offsets disagree at position {position}")]
    GeometryMismatch {
        /// Position of the first disagreement.
        position: usize,
    },
    /// An add task targeted a pair that is already enabled.
    #[error("process {process} is already enabled at site {site}")]
    AlreadyEnabled {
        /// Site of the pair.
        site: SiteIndex,
        /// Process of the pair.
        process: ProcessId,
    },
    /// A remove or update task targeted a pair that is not enabled.
    #[error("process {process} is not enabled at site {site}")]
    NotEnabled {
        /// Site of the pair.
        site: SiteIndex,
        /// Process of the pair.
        process: ProcessId,
    },
    /// A process id that the catalog never issued.
    #[error("unknown process: {0}")]
    UnknownProcess(ProcessId),
    /// A site index outside the topology.
    #[error("unknown site: {0}")]
    UnknownSite(SiteIndex),
    /// A process pattern lists the same offset twice.
    #[error("pattern of process {process} repeats an offset at position {position}")]
    DuplicateOffset {
        /// Name of the process being registered.
        process: String,
        /// Position of the second entry in canonical order.
        position: usize,
    },
    /// Two processes registered under the same name.
    #[error("duplicate process name: {0}")]
    DuplicateProcessName(String),
    /// A base rate or computed rate was negative or not finite.
    #[error("invalid rate {rate} for process {process:?} at site {site:?}")]
    InvalidRate {
        /// Process whose rate was rejected (absent for an unregistered builder).
        process: Option<ProcessId>,
        /// Site the rate was computed for (absent for base rates).
        site: Option<SiteIndex>,
        /// The rejected value.
        rate: f64,
    },
    /// A configuration value failed validation.
    #[error("invalid matcher configuration: {0}")]
    InvalidConfig(String),
}

impl MatchError {
    /// Attaches process and site context to a [`MatchError::PatternTooLong`]
    /// raised by the context-free [`crate::Matcher::is_match`].
    pub(crate) fn with_pair(self, site: SiteIndex, process: ProcessId) -> Self {
        match self {
            Self::PatternTooLong {
                pattern_len,
                neighborhood_len,
                ..
            } => Self::PatternTooLong {
                process: Some(process),
                site: Some(site),
                pattern_len,
                neighborhood_len,
            },
            other => other,
        }
    }
}
