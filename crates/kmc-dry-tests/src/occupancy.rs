// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mutable occupancy grid and the seeded stream used for random fills.

use kmc_core::{MatchError, Occupancy, SiteIndex, SpeciesId};

/// Weyl increment of the SplitMix64 stream.
const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// SplitMix64 stream for reproducible lattice fills.
///
/// Equal seeds give equal sequences on every platform. Only used to pick
/// sites, so statistical quality beyond SplitMix64 is not needed.
#[derive(Debug, Clone, Copy)]
pub struct FillRng {
    counter: u64,
}

impl FillRng {
    /// Starts the stream at `seed`.
    pub const fn from_seed_u64(seed: u64) -> Self {
        Self { counter: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.counter = self.counter.wrapping_add(GOLDEN_GAMMA);
        let mixed = (self.counter ^ (self.counter >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        let mixed = (mixed ^ (mixed >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        mixed ^ (mixed >> 31)
    }

    /// Uniform index in `[0, n)`; 0 when `n` is 0 or 1.
    pub fn next_below(&mut self, n: usize) -> usize {
        let span = n as u64;
        if span <= 1 {
            return 0;
        }
        // Reject the top partial block so `% span` is unbiased.
        let limit = u64::MAX - u64::MAX % span;
        let draw = loop {
            let x = self.next_u64();
            if x < limit {
                break x;
            }
        };
        // The remainder is below `n`, so it always fits.
        usize::try_from(draw % span).unwrap_or(0)
    }
}

/// Species per site, indexed by [`SiteIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesGrid {
    species: Vec<SpeciesId>,
}

impl SpeciesGrid {
    /// A grid of `len` sites all holding `fill`.
    pub fn new(len: usize, fill: SpeciesId) -> Self {
        Self {
            species: vec![fill; len],
        }
    }

    /// A grid of `len` sites holding `background`, with exactly `count` sites
    /// (chosen by `rng`, clamped to `len`) holding `minority`.
    pub fn random(
        len: usize,
        background: SpeciesId,
        minority: SpeciesId,
        count: usize,
        rng: &mut FillRng,
    ) -> Self {
        let mut order: Vec<usize> = (0..len).collect();
        // Partial Fisher-Yates: the first `count` slots end up a uniform sample.
        for i in 0..count.min(len) {
            let j = i + rng.next_below(len - i);
            order.swap(i, j);
        }
        let mut grid = Self::new(len, background);
        for &i in order.iter().take(count) {
            grid.species[i] = minority;
        }
        grid
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Returns `true` when the grid has no sites.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Places `species` on `site`, returning what was there.
    ///
    /// # Errors
    /// Returns [`MatchError::UnknownSite`] for an index outside the grid.
    pub fn set(&mut self, site: SiteIndex, species: SpeciesId) -> Result<SpeciesId, MatchError> {
        let slot = self
            .species
            .get_mut(site.value())
            .ok_or(MatchError::UnknownSite(site))?;
        Ok(core::mem::replace(slot, species))
    }

    /// Exchanges the species on two sites (a hop).
    ///
    /// # Errors
    /// Returns [`MatchError::UnknownSite`] when either index is outside the grid.
    pub fn swap(&mut self, a: SiteIndex, b: SiteIndex) -> Result<(), MatchError> {
        for s in [a, b] {
            if s.value() >= self.species.len() {
                return Err(MatchError::UnknownSite(s));
            }
        }
        self.species.swap(a.value(), b.value());
        Ok(())
    }

    /// Sites currently holding `species`, ascending.
    pub fn sites_with(&self, species: SpeciesId) -> Vec<SiteIndex> {
        self.species
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == species)
            .map(|(i, _)| SiteIndex::from_raw(i))
            .collect()
    }

    /// Raw species slice.
    pub fn as_slice(&self) -> &[SpeciesId] {
        &self.species
    }
}

impl Occupancy for SpeciesGrid {
    fn species_at(&self, site: SiteIndex) -> Result<SpeciesId, MatchError> {
        self.species.as_slice().species_at(site)
    }
}
