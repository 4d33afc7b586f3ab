// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Process catalog: registered processes, their enabled sites, and the
//! aggregate rate an event sampler draws from.
//!
//! The catalog is an explicit value owned by the simulation driver and lent
//! to the [`crate::Matcher`] for one reconciliation at a time. The matcher is
//! its only writer; enabled-site mutation is crate-private.
//!
//! Digest contract
//! - [`Catalog::enabled_digest`] is a BLAKE3 digest over the enabled-pair set
//!   only. Storage order inside [`EnabledSites`] does not leak into it.
//! - Encoding: version tag (`u16` LE), process count (`u64` LE), then per
//!   process in id order its id (`u32` LE), site count (`u64` LE), and the
//!   ascending site indices (`u64` LE). Changing this layout changes every
//!   digest and must be treated as breaking.
use core::cmp::Ordering;

use blake3::Hasher;
use rustc_hash::FxHashMap;

use crate::config::DEFAULT_GEOMETRIC_TOLERANCE;
use crate::entry::canonical_order;
use crate::error::MatchError;
use crate::ident::{Hash, ProcessId, SiteIndex};
use crate::match_list::ProcessPattern;
use crate::process::{EnabledSites, Process, ProcessBuilder};

/// Receives one signed rate delta per applied task.
///
/// Implemented by external rate tables (e.g. a cumulative-sum sampler) that
/// must stay in step with the catalog without a full recompute.
pub trait RateListener {
    /// Rate of `process` changed by `delta` (positive on add, negative on
    /// remove, `new - old` on update).
    fn rate_delta(&mut self, process: ProcessId, delta: f64);
}

impl RateListener for () {
    fn rate_delta(&mut self, _process: ProcessId, _delta: f64) {}
}

/// Registered processes plus the aggregate enabled rate.
#[derive(Debug)]
pub struct Catalog {
    processes: Vec<Process>,
    by_name: FxHashMap<String, ProcessId>,
    total_rate: f64,
    max_cutoff: f64,
    tol: f64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_GEOMETRIC_TOLERANCE)
    }
}

impl Catalog {
    /// Creates an empty catalog whose patterns are sorted on a grid of
    /// spacing `tol`. Use the same tolerance as the matcher and topology.
    pub fn new(tol: f64) -> Self {
        Self {
            processes: Vec::new(),
            by_name: FxHashMap::default(),
            total_rate: 0.0,
            max_cutoff: 0.0,
            tol,
        }
    }

    /// Registers a process and returns its id.
    ///
    /// The pattern entries are sorted into canonical order here.
    ///
    /// # Errors
    /// Returns [`MatchError::DuplicateProcessName`] when the name is taken and
    /// [`MatchError::InvalidRate`] for a negative or non-finite base rate,
    /// and [`MatchError::DuplicateOffset`] when two entries share an offset.
    pub fn register(&mut self, builder: ProcessBuilder) -> Result<ProcessId, MatchError> {
        if self.by_name.contains_key(&builder.name) {
            return Err(MatchError::DuplicateProcessName(builder.name));
        }
        if !builder.base_rate.is_finite() || builder.base_rate < 0.0 {
            return Err(MatchError::InvalidRate {
                process: None,
                site: None,
                rate: builder.base_rate,
            });
        }
        let raw = u32::try_from(self.processes.len())
            .map_err(|_| MatchError::InvalidConfig("process id space exhausted".into()))?;
        let id = ProcessId::from_raw(raw);
        let pattern = ProcessPattern::from_unsorted(builder.entries, self.tol);
        if let Some(i) = pattern
            .windows(2)
            .position(|w| canonical_order(&w[0], &w[1], self.tol) == Ordering::Equal)
        {
            return Err(MatchError::DuplicateOffset {
                process: builder.name,
                position: i + 1,
            });
        }
        self.max_cutoff = self.max_cutoff.max(pattern.cutoff());
        self.by_name.insert(builder.name.clone(), id);
        self.processes.push(Process {
            id,
            name: builder.name,
            pattern,
            base_rate: builder.base_rate,
            rate_calculator: builder.rate_calculator,
            basis_sites: builder.basis_sites,
            enabled: EnabledSites::default(),
        });
        Ok(id)
    }

    /// Looks up a process.
    ///
    /// # Errors
    /// Returns [`MatchError::UnknownProcess`] for ids this catalog never issued.
    pub fn process(&self, id: ProcessId) -> Result<&Process, MatchError> {
        self.processes
            .get(id.slot())
            .ok_or(MatchError::UnknownProcess(id))
    }

    /// Looks up a process id by name.
    pub fn process_id(&self, name: &str) -> Option<ProcessId> {
        self.by_name.get(name).copied()
    }

    /// All processes in id order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Number of registered processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Returns `true` when no process is registered.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Largest pattern cutoff over all processes; the topology must list
    /// neighbors at least this far out.
    pub fn max_cutoff(&self) -> f64 {
        self.max_cutoff
    }

    /// Tolerance patterns were sorted with.
    pub fn tolerance(&self) -> f64 {
        self.tol
    }

    /// Returns `true` when `process` is enabled at `site`.
    pub fn is_enabled(&self, site: SiteIndex, process: ProcessId) -> bool {
        self.processes
            .get(process.slot())
            .is_some_and(|p| p.enabled.contains(site))
    }

    /// Recorded rate of `process` at `site`, if enabled.
    pub fn rate_of(&self, site: SiteIndex, process: ProcessId) -> Option<f64> {
        self.processes.get(process.slot())?.enabled.rate(site)
    }

    /// Aggregate rate over every enabled pair, maintained by signed deltas.
    pub fn total_rate(&self) -> f64 {
        self.total_rate
    }

    /// Re-sums every per-process and aggregate total from the stored per-pair
    /// rates, discarding accumulated floating-point drift.
    pub fn recompute_totals(&mut self) -> f64 {
        self.total_rate = self
            .processes
            .iter_mut()
            .map(|p| p.enabled.recompute_total())
            .sum();
        self.total_rate
    }

    /// Number of enabled `(site, process)` pairs.
    pub fn enabled_count(&self) -> usize {
        self.processes.iter().map(|p| p.enabled.len()).sum()
    }

    /// Every enabled pair, sorted by process then site.
    pub fn enabled_pairs(&self) -> Vec<(SiteIndex, ProcessId)> {
        let mut pairs = Vec::with_capacity(self.enabled_count());
        for p in &self.processes {
            let mut sites = p.enabled.sites().to_vec();
            sites.sort_unstable();
            pairs.extend(sites.into_iter().map(|s| (s, p.id)));
        }
        pairs
    }

    /// Canonical digest of the enabled-pair set; see the module docs.
    pub fn enabled_digest(&self) -> Hash {
        let mut hasher = Hasher::new();
        hasher.update(&1u16.to_le_bytes());
        hasher.update(&(self.processes.len() as u64).to_le_bytes());
        for p in &self.processes {
            let mut sites = p.enabled.sites().to_vec();
            sites.sort_unstable();
            hasher.update(&p.id.value().to_le_bytes());
            hasher.update(&(sites.len() as u64).to_le_bytes());
            for site in sites {
                hasher.update(&(site.value() as u64).to_le_bytes());
            }
        }
        hasher.finalize().into()
    }

    /// Forgets every enabled pair; used before a full rebuild.
    pub fn clear_enabled(&mut self) {
        for p in &mut self.processes {
            p.enabled.clear();
        }
        self.total_rate = 0.0;
    }

    pub(crate) fn insert_enabled(
        &mut self,
        site: SiteIndex,
        process: ProcessId,
        rate: f64,
    ) -> Result<f64, MatchError> {
        let p = self.process_mut(process)?;
        if !p.enabled.insert(site, rate) {
            return Err(MatchError::AlreadyEnabled { site, process });
        }
        self.total_rate += rate;
        Ok(rate)
    }

    pub(crate) fn update_enabled(
        &mut self,
        site: SiteIndex,
        process: ProcessId,
        rate: f64,
    ) -> Result<f64, MatchError> {
        let p = self.process_mut(process)?;
        let old = p
            .enabled
            .update(site, rate)
            .ok_or(MatchError::NotEnabled { site, process })?;
        let delta = rate - old;
        self.total_rate += delta;
        Ok(delta)
    }

    pub(crate) fn remove_enabled(
        &mut self,
        site: SiteIndex,
        process: ProcessId,
    ) -> Result<f64, MatchError> {
        let p = self.process_mut(process)?;
        let old = p
            .enabled
            .remove(site)
            .ok_or(MatchError::NotEnabled { site, process })?;
        self.total_rate -= old;
        Ok(-old)
    }

    fn process_mut(&mut self, id: ProcessId) -> Result<&mut Process, MatchError> {
        self.processes
            .get_mut(id.slot())
            .ok_or(MatchError::UnknownProcess(id))
    }
}
