// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! kmc-core: local-geometry matching engine for lattice kinetic Monte Carlo.
//!
//! Given the canonical pattern of every process and a way to read the current
//! neighborhood of any site, the engine keeps a [`Catalog`] of enabled
//! `(site, process)` pairs and their rates consistent with the lattice,
//! touching only the candidate pairs a driver hands it after each event.
//! Event selection, event execution, and lattice construction live outside.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::float_cmp
)]

mod catalog;
mod config;
mod coord;
mod entry;
mod error;
mod ident;
mod match_list;
mod matcher;
mod neighborhood;
mod process;
mod task;

// Re-exports for stable public API
/// Process catalog and the rate-delta hook for external samplers.
pub use catalog::{Catalog, RateListener};
/// Matcher configuration.
pub use config::{MatcherConfig, DEFAULT_GEOMETRIC_TOLERANCE};
/// Relative offsets.
pub use coord::Coordinate;
/// Pattern and site entries plus the canonical ordering.
pub use entry::{canonical_order, PatternEntry, Positioned, Requirement, SiteEntry};
/// Engine error type.
pub use error::MatchError;
/// Identifier types.
pub use ident::{Hash, ProcessId, SiteIndex, SpeciesId, SpeciesRegistry};
/// Canonical match lists.
pub use match_list::{MatchList, Neighborhood, ProcessPattern};
/// The matching engine.
pub use matcher::Matcher;
/// Collaborator contracts for topology and occupancy.
pub use neighborhood::{LatticeView, Neighbor, NeighborhoodSource, Occupancy, Topology};
/// Processes, rate functions, and enabled-site bookkeeping.
pub use process::{EnabledSites, Process, ProcessBuilder, RateCalculator, RateContext};
/// Reconciliation tasks and outcomes.
pub use task::{AddTask, ApplySummary, PairOutcome, Reconciliation, RemoveTask, UpdateTask};
