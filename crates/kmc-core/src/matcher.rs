// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Local-geometry matcher and incremental reconciliation.
//!
//! Cycle
//! 1. The driver executes an event and picks the candidate `(site, process)`
//!    pairs whose environment may have changed ([`Matcher::candidates_around`]
//!    is the usual choice).
//! 2. [`Matcher::match_indices_with_processes`] recomputes those pairs and
//!    diffs them against the catalog, yielding a [`Reconciliation`].
//! 3. [`Matcher::update_processes`] commits it: removes, then updates, then
//!    adds, one signed rate delta per task.
//!
//! Pairs outside the candidate set are never looked at. The engine is
//! synchronous and single-threaded; it is the catalog's only writer while a
//! cycle runs.
use std::collections::hash_map::Entry;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, debug_span, trace, warn};

use crate::catalog::{Catalog, RateListener};
use crate::config::MatcherConfig;
use crate::entry::Positioned;
use crate::error::MatchError;
use crate::ident::{ProcessId, SiteIndex};
use crate::match_list::{Neighborhood, ProcessPattern};
use crate::neighborhood::{NeighborhoodSource, Topology};
use crate::process::Process;
use crate::task::{AddTask, ApplySummary, PairOutcome, Reconciliation, RemoveTask, UpdateTask};

/// Matching engine. Holds only configuration; all state lives in the
/// [`Catalog`] passed to each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    /// Creates a matcher after validating `config`.
    ///
    /// # Errors
    /// Returns [`MatchError::InvalidConfig`] when a tolerance is negative or
    /// not finite.
    pub fn new(config: MatcherConfig) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Checks whether `neighborhood` satisfies `pattern`.
    ///
    /// Walks both lists in lock-step over the first `pattern.len()`
    /// positions and stops at the first unsatisfied requirement. Entries of
    /// `neighborhood` past the pattern's end are ignored.
    ///
    /// # Errors
    /// - [`MatchError::PatternTooLong`] when the pattern has more entries than
    ///   the neighborhood.
    /// - [`MatchError::GeometryMismatch`] when geometry validation is on and
    ///   the two lists place different offsets at the same position.
    pub fn is_match(
        &self,
        pattern: &ProcessPattern,
        neighborhood: &Neighborhood,
    ) -> Result<bool, MatchError> {
        if pattern.len() > neighborhood.len() {
            return Err(MatchError::PatternTooLong {
                process: None,
                site: None,
                pattern_len: pattern.len(),
                neighborhood_len: neighborhood.len(),
            });
        }
        let tol = self.config.geometric_tolerance;
        for (position, (want, have)) in pattern.iter().zip(neighborhood.iter()).enumerate() {
            if self.config.validate_geometry && !want.offset().approx_eq(have.offset(), tol) {
                return Err(MatchError::GeometryMismatch { position });
            }
            if !want.requirement().is_satisfied_by(have.species()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Recomputes one `(site, process)` pair and writes the result straight
    /// into the catalog.
    ///
    /// # Errors
    /// Propagates neighborhood, matching, and rate errors; fails with
    /// [`MatchError::UnknownProcess`] for a foreign process id.
    pub fn calculate_matching_for<S>(
        &self,
        process: ProcessId,
        catalog: &mut Catalog,
        source: &S,
        site: SiteIndex,
    ) -> Result<PairOutcome, MatchError>
    where
        S: NeighborhoodSource + ?Sized,
    {
        let hood = source.neighborhood(site)?;
        let proc_ref = catalog.process(process)?;
        let now = self.evaluate(proc_ref, site, source.basis_of(site), &hood)?;
        let previous = proc_ref.enabled().rate(site);
        let outcome = match (previous, now) {
            (None, Some(rate)) => {
                catalog.insert_enabled(site, process, rate)?;
                PairOutcome::Added(rate)
            }
            (Some(old), Some(new)) if self.rate_changed(old, new) => {
                catalog.update_enabled(site, process, new)?;
                PairOutcome::Updated { old, new }
            }
            (Some(old), None) => {
                catalog.remove_enabled(site, process)?;
                PairOutcome::Removed(old)
            }
            _ => PairOutcome::Unchanged,
        };
        trace!(%site, %process, ?outcome, "pair recomputed");
        Ok(outcome)
    }

    /// Recomputes every candidate pair and diffs it against the catalog.
    ///
    /// Classification per pair, with `previous` read from the catalog:
    /// - not enabled, matches now: [`AddTask`];
    /// - enabled, matches now, rate moved beyond `rate_tolerance`: [`UpdateTask`];
    /// - enabled, no longer matches: [`RemoveTask`];
    /// - anything else: no task.
    ///
    /// A pair whose process does not apply to the site's basis counts as not
    /// matching. Repeated candidates are evaluated once. Each list keeps
    /// candidate order, and each site's neighborhood is built once per call.
    ///
    /// # Errors
    /// Propagates neighborhood, matching, and rate errors; fails with
    /// [`MatchError::UnknownProcess`] for a foreign process id.
    pub fn match_indices_with_processes<S>(
        &self,
        candidates: &[(SiteIndex, ProcessId)],
        catalog: &Catalog,
        source: &S,
    ) -> Result<Reconciliation, MatchError>
    where
        S: NeighborhoodSource + ?Sized,
    {
        let span = debug_span!("match_indices_with_processes", candidates = candidates.len());
        let _guard = span.enter();

        let mut hoods: FxHashMap<SiteIndex, (Neighborhood, usize)> = FxHashMap::default();
        let mut seen: FxHashSet<(SiteIndex, ProcessId)> = FxHashSet::default();
        let mut out = Reconciliation::default();

        for &(site, process) in candidates {
            if !seen.insert((site, process)) {
                continue;
            }
            let proc_ref = catalog.process(process)?;
            let (hood, basis) = match hoods.entry(site) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(v) => v.insert((source.neighborhood(site)?, source.basis_of(site))),
            };
            let now = self.evaluate(proc_ref, site, *basis, hood)?;
            match (proc_ref.enabled().rate(site), now) {
                (None, Some(rate)) => out.adds.push(AddTask { site, process, rate }),
                (Some(old), Some(rate)) if self.rate_changed(old, rate) => {
                    out.updates.push(UpdateTask { site, process, rate });
                }
                (Some(_), None) => out.removes.push(RemoveTask { site, process }),
                _ => {}
            }
        }

        debug!(
            sites = hoods.len(),
            removes = out.removes.len(),
            updates = out.updates.len(),
            adds = out.adds.len(),
            "reconciliation computed"
        );
        Ok(out)
    }

    /// Commits a reconciliation to the catalog.
    ///
    /// # Errors
    /// See [`Matcher::update_processes_with`].
    pub fn update_processes(
        &self,
        tasks: Reconciliation,
        catalog: &mut Catalog,
    ) -> Result<ApplySummary, MatchError> {
        self.update_processes_with(tasks, catalog, &mut ())
    }

    /// Commits a reconciliation to the catalog and reports every signed rate
    /// delta to `listener`, exactly once per task.
    ///
    /// Removes run first, then updates, then adds.
    ///
    /// # Errors
    /// Returns [`MatchError::NotEnabled`] for a remove or update of a pair that
    /// is not enabled and [`MatchError::AlreadyEnabled`] for an add of one that
    /// is. Both mean the tasks were not produced against this catalog state.
    /// Every task is checked before the first one is applied, so on error
    /// the catalog and `listener` are left untouched.
    pub fn update_processes_with<L>(
        &self,
        tasks: Reconciliation,
        catalog: &mut Catalog,
        listener: &mut L,
    ) -> Result<ApplySummary, MatchError>
    where
        L: RateListener + ?Sized,
    {
        let span = debug_span!("update_processes", tasks = tasks.len());
        let _guard = span.enter();

        check_applicable(&tasks, catalog)
            .inspect_err(|e| warn!(error = %e, "inconsistent reconciliation rejected"))?;

        let mut summary = ApplySummary::default();
        for t in &tasks.removes {
            let delta = catalog.remove_enabled(t.site, t.process)?;
            listener.rate_delta(t.process, delta);
            summary.removed += 1;
            summary.rate_delta += delta;
        }
        for t in &tasks.updates {
            let delta = catalog.update_enabled(t.site, t.process, t.rate)?;
            listener.rate_delta(t.process, delta);
            summary.updated += 1;
            summary.rate_delta += delta;
        }
        for t in &tasks.adds {
            let delta = catalog.insert_enabled(t.site, t.process, t.rate)?;
            listener.rate_delta(t.process, delta);
            summary.added += 1;
            summary.rate_delta += delta;
        }

        debug!(
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            rate_delta = summary.rate_delta,
            total_rate = catalog.total_rate(),
            "reconciliation applied"
        );
        Ok(summary)
    }

    /// Matches every index against every registered process and commits the
    /// result. Meant for initialization and lattice-wide changes, not the
    /// per-event path.
    ///
    /// # Errors
    /// Same as [`Matcher::match_indices_with_processes`] and
    /// [`Matcher::update_processes`].
    pub fn calculate_matching<S>(
        &self,
        catalog: &mut Catalog,
        source: &S,
        indices: &[SiteIndex],
    ) -> Result<ApplySummary, MatchError>
    where
        S: NeighborhoodSource + ?Sized,
    {
        let mut candidates = Vec::with_capacity(indices.len() * catalog.len());
        for &site in indices {
            candidates.extend(catalog.processes().iter().map(|p| (site, p.id())));
        }
        let tasks = self.match_indices_with_processes(&candidates, catalog, source)?;
        self.update_processes(tasks, catalog)
    }

    /// Candidate pairs to re-examine after an event touched `touched`.
    ///
    /// Collects every neighbor within the catalog's largest cutoff of each
    /// touched site, the touched site included, in first-seen order without
    /// repeats, and pairs each with every process admitted by its basis.
    /// Assumes the neighbor relation is symmetric.
    ///
    /// # Errors
    /// Propagates [`Topology::neighbors`] failures.
    pub fn candidates_around<T>(
        &self,
        topology: &T,
        catalog: &Catalog,
        touched: &[SiteIndex],
    ) -> Result<Vec<(SiteIndex, ProcessId)>, MatchError>
    where
        T: Topology + ?Sized,
    {
        let reach = catalog.max_cutoff() + self.config.geometric_tolerance;
        let mut seen: FxHashSet<SiteIndex> = FxHashSet::default();
        let mut sites = Vec::new();
        for &center in touched {
            if seen.insert(center) {
                sites.push(center);
            }
            for n in topology.neighbors(center)? {
                if n.offset.norm() <= reach && seen.insert(n.site) {
                    sites.push(n.site);
                }
            }
        }

        let mut pairs = Vec::with_capacity(sites.len() * catalog.len());
        for site in sites {
            let basis = topology.basis_of(site);
            pairs.extend(
                catalog
                    .processes()
                    .iter()
                    .filter(|p| p.applies_to_basis(basis))
                    .map(|p| (site, p.id())),
            );
        }
        Ok(pairs)
    }
}

impl Matcher {
    /// Rate of `process` at `site` when it matches, `None` otherwise.
    fn evaluate(
        &self,
        process: &Process,
        site: SiteIndex,
        basis: usize,
        hood: &Neighborhood,
    ) -> Result<Option<f64>, MatchError> {
        if !process.applies_to_basis(basis) {
            return Ok(None);
        }
        let matched = self
            .is_match(process.pattern(), hood)
            .map_err(|e| e.with_pair(site, process.id()))?;
        if !matched {
            return Ok(None);
        }
        let rate = process.rate_at(site, hood);
        if !rate.is_finite() || rate < 0.0 {
            return Err(MatchError::InvalidRate {
                process: Some(process.id()),
                site: Some(site),
                rate,
            });
        }
        Ok(Some(rate))
    }

    fn rate_changed(&self, old: f64, new: f64) -> bool {
        (new - old).abs() > self.config.rate_tolerance
    }
}

/// Replays `tasks` against the catalog's enabled sets without mutating it.
/// Removes run before updates and adds, as in the apply loop.
fn check_applicable(tasks: &Reconciliation, catalog: &Catalog) -> Result<(), MatchError> {
    let mut removed: FxHashSet<(SiteIndex, ProcessId)> = FxHashSet::default();
    for t in &tasks.removes {
        catalog.process(t.process)?;
        if !catalog.is_enabled(t.site, t.process) || !removed.insert((t.site, t.process)) {
            return Err(MatchError::NotEnabled {
                site: t.site,
                process: t.process,
            });
        }
    }
    for t in &tasks.updates {
        catalog.process(t.process)?;
        if !catalog.is_enabled(t.site, t.process) || removed.contains(&(t.site, t.process)) {
            return Err(MatchError::NotEnabled {
                site: t.site,
                process: t.process,
            });
        }
    }
    let mut added: FxHashSet<(SiteIndex, ProcessId)> = FxHashSet::default();
    for t in &tasks.adds {
        catalog.process(t.process)?;
        let present =
            catalog.is_enabled(t.site, t.process) && !removed.contains(&(t.site, t.process));
        if present || !added.insert((t.site, t.process)) {
            return Err(MatchError::AlreadyEnabled {
                site: t.site,
                process: t.process,
            });
        }
    }
    Ok(())
}
