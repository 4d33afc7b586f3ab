// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for kmc crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`lattice`] - Periodic simple-cubic topology with canonical neighbor lists
//! - [`occupancy`] - Mutable species grid and a seeded fill generator
//! - [`processes`] - Hop/exchange process fixtures and rate functions
//! - [`rebuild`] - From-scratch matching used as a test oracle
//! - [`settings`] - In-memory settings store fake for testing without filesystem

pub mod lattice;
pub mod occupancy;
pub mod processes;
pub mod rebuild;
pub mod settings;

// Re-export commonly used items at crate root for convenience
pub use lattice::CubicLattice;
pub use occupancy::{FillRng, SpeciesGrid};
pub use processes::{
    hop_catalog, hop_process, neighbor_count_rate, AXIAL_DIRECTIONS, ATOM, VACANCY,
};
pub use rebuild::{all_sites, rebuild_from_scratch};
pub use settings::InMemorySettingsStore;
