// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier types for sites, processes, and species.
use rustc_hash::FxHashMap;

/// Canonical 256-bit digest used for catalog fingerprints.
pub type Hash = [u8; 32];

/// Index of a lattice site in the configuration.
///
/// Site indices are assigned by the topology provider and are dense in
/// `0..site_count`. The `#[repr(transparent)]` layout lets drivers keep raw
/// `usize` buffers and convert without cost.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiteIndex(usize);

impl SiteIndex {
    /// Constructs a `SiteIndex` from a raw value.
    #[must_use]
    pub const fn from_raw(value: usize) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for SiteIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a process registered in a [`crate::Catalog`].
///
/// # Invariants
/// - Ids are handed out densely in registration order, starting at zero.
/// - An id is only meaningful for the catalog that issued it.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessId(u32);

impl ProcessId {
    /// Constructs a `ProcessId` from a raw value.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Species (occupation type) tag of a lattice site.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeciesId(u16);

impl SpeciesId {
    /// Constructs a `SpeciesId` from a raw value.
    #[must_use]
    pub const fn from_raw(value: u16) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

/// Interns species labels to compact [`SpeciesId`] values.
///
/// Ids are assigned in first-seen order, so two registries fed the same
/// labels in the same order agree on every id.
#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    labels: Vec<String>,
    by_label: FxHashMap<String, SpeciesId>,
}

impl SpeciesRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `label`, interning it if unseen.
    ///
    /// Returns `None` once the `u16` id space is exhausted.
    pub fn intern(&mut self, label: &str) -> Option<SpeciesId> {
        if let Some(id) = self.by_label.get(label) {
            return Some(*id);
        }
        let raw = u16::try_from(self.labels.len()).ok()?;
        let id = SpeciesId(raw);
        self.labels.push(label.to_owned());
        self.by_label.insert(label.to_owned(), id);
        Some(id)
    }

    /// Looks up an already interned label.
    pub fn get(&self, label: &str) -> Option<SpeciesId> {
        self.by_label.get(label).copied()
    }

    /// Returns the label for `id`, if it was issued by this registry.
    pub fn label(&self, id: SpeciesId) -> Option<&str> {
        self.labels.get(usize::from(id.0)).map(String::as_str)
    }

    /// Number of interned species.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` when no species has been interned.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
