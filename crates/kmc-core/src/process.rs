// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Process definitions and per-process enabled-site bookkeeping.
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::entry::{PatternEntry, SiteEntry};
use crate::ident::{ProcessId, SiteIndex};
use crate::match_list::{Neighborhood, ProcessPattern};

/// Inputs handed to a [`RateCalculator`].
#[derive(Debug, Clone, Copy)]
pub struct RateContext<'a> {
    /// Process whose rate is requested.
    pub process: ProcessId,
    /// The process's base rate constant.
    pub base_rate: f64,
    /// Site the process is enabled at.
    pub site: SiteIndex,
    /// Canonical pattern of the process.
    pub pattern: &'a ProcessPattern,
    /// Current neighborhood of `site`, cut to the pattern's positions:
    /// `neighborhood[i]` is the site matched against `pattern[i]`.
    pub neighborhood: &'a [SiteEntry],
}

/// Neighborhood-dependent rate function.
///
/// The calculator owns the rule for combining the base rate with the
/// neighborhood; the engine applies no formula of its own. Results must be
/// finite and non-negative.
///
/// Only the pattern's positions are visible. A rate that depends on a site
/// the pattern does not otherwise constrain needs a
/// [`crate::Requirement::RateDependency`] entry there, so the pattern's
/// cutoff, and with it the candidate set after an event, reaches that site.
pub trait RateCalculator: Send + Sync {
    /// Rate of the process described by `ctx`.
    fn rate(&self, ctx: &RateContext<'_>) -> f64;
}

impl<F> RateCalculator for F
where
    F: Fn(&RateContext<'_>) -> f64 + Send + Sync,
{
    fn rate(&self, ctx: &RateContext<'_>) -> f64 {
        self(ctx)
    }
}

/// Sites at which one process is currently enabled, with their rates.
///
/// Storage is a dense site list plus a parallel rate list, with a slot index
/// for O(1) lookup. Removal swaps the last entry into the hole, so iteration
/// order depends only on the sequence of operations applied.
#[derive(Debug, Clone, Default)]
pub struct EnabledSites {
    sites: Vec<SiteIndex>,
    rates: Vec<f64>,
    slots: FxHashMap<SiteIndex, usize>,
    total: f64,
}

impl EnabledSites {
    /// Number of enabled sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns `true` when the process is enabled nowhere.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Returns `true` when `site` is enabled.
    pub fn contains(&self, site: SiteIndex) -> bool {
        self.slots.contains_key(&site)
    }

    /// Recorded rate at `site`.
    pub fn rate(&self, site: SiteIndex) -> Option<f64> {
        self.slots.get(&site).map(|&slot| self.rates[slot])
    }

    /// Enabled sites in storage order.
    pub fn sites(&self) -> &[SiteIndex] {
        &self.sites
    }

    /// Rates parallel to [`EnabledSites::sites`].
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// `(site, rate)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (SiteIndex, f64)> + '_ {
        self.sites.iter().copied().zip(self.rates.iter().copied())
    }

    /// Running sum of the per-site rates.
    pub fn total_rate(&self) -> f64 {
        self.total
    }

    pub(crate) fn insert(&mut self, site: SiteIndex, rate: f64) -> bool {
        if self.slots.contains_key(&site) {
            return false;
        }
        self.slots.insert(site, self.sites.len());
        self.sites.push(site);
        self.rates.push(rate);
        self.total += rate;
        true
    }

    pub(crate) fn update(&mut self, site: SiteIndex, rate: f64) -> Option<f64> {
        let slot = *self.slots.get(&site)?;
        let old = core::mem::replace(&mut self.rates[slot], rate);
        self.total += rate - old;
        Some(old)
    }

    pub(crate) fn remove(&mut self, site: SiteIndex) -> Option<f64> {
        let slot = self.slots.remove(&site)?;
        self.sites.swap_remove(slot);
        let rate = self.rates.swap_remove(slot);
        if let Some(moved) = self.sites.get(slot) {
            self.slots.insert(*moved, slot);
        }
        self.total -= rate;
        Some(rate)
    }

    pub(crate) fn clear(&mut self) {
        self.sites.clear();
        self.rates.clear();
        self.slots.clear();
        self.total = 0.0;
    }

    pub(crate) fn recompute_total(&mut self) -> f64 {
        self.total = self.rates.iter().sum();
        self.total
    }
}

/// An elementary event type registered in a [`crate::Catalog`].
pub struct Process {
    pub(crate) id: ProcessId,
    pub(crate) name: String,
    pub(crate) pattern: ProcessPattern,
    pub(crate) base_rate: f64,
    pub(crate) rate_calculator: Option<Arc<dyn RateCalculator>>,
    pub(crate) basis_sites: Option<Vec<usize>>,
    pub(crate) enabled: EnabledSites,
}

impl Process {
    /// Catalog-issued identifier.
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Human-readable name for logs and diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical required pattern.
    pub fn pattern(&self) -> &ProcessPattern {
        &self.pattern
    }

    /// Base rate constant.
    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    /// Returns `true` when a neighborhood-dependent rate function is attached.
    pub fn has_rate_calculator(&self) -> bool {
        self.rate_calculator.is_some()
    }

    /// Sites the process is currently enabled at.
    pub fn enabled(&self) -> &EnabledSites {
        &self.enabled
    }

    /// Returns `true` when the process may fire on sites of basis `basis`.
    pub fn applies_to_basis(&self, basis: usize) -> bool {
        self.basis_sites
            .as_ref()
            .is_none_or(|allowed| allowed.contains(&basis))
    }

    /// Rate of the process at `site` given its current neighborhood.
    ///
    /// The calculator sees the first `pattern().len()` entries only.
    pub fn rate_at(&self, site: SiteIndex, neighborhood: &Neighborhood) -> f64 {
        match &self.rate_calculator {
            None => self.base_rate,
            Some(calc) => {
                let visible = self.pattern.len().min(neighborhood.len());
                calc.rate(&RateContext {
                    process: self.id,
                    base_rate: self.base_rate,
                    site,
                    pattern: &self.pattern,
                    neighborhood: &neighborhood[..visible],
                })
            }
        }
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pattern_len", &self.pattern.len())
            .field("base_rate", &self.base_rate)
            .field("rate_calculator", &self.rate_calculator.is_some())
            .field("basis_sites", &self.basis_sites)
            .field("enabled", &self.enabled.len())
            .finish()
    }
}

/// Collects the pieces of a process before it is registered.
///
/// # Example
///
/// ```
/// use kmc_core::{Catalog, PatternEntry, ProcessBuilder, SpeciesId};
///
/// let a = SpeciesId::from_raw(0);
/// let v = SpeciesId::from_raw(1);
/// let mut catalog = Catalog::default();
/// let hop = catalog
///     .register(
///         ProcessBuilder::new("hop/+x")
///             .entry(PatternEntry::species([0.0, 0.0, 0.0], a))
///             .entry(PatternEntry::species([1.0, 0.0, 0.0], v))
///             .base_rate(2.5),
///     )
///     .unwrap();
/// assert_eq!(catalog.process(hop).unwrap().pattern().len(), 2);
/// ```
pub struct ProcessBuilder {
    pub(crate) name: String,
    pub(crate) entries: Vec<PatternEntry>,
    pub(crate) base_rate: f64,
    pub(crate) rate_calculator: Option<Arc<dyn RateCalculator>>,
    pub(crate) basis_sites: Option<Vec<usize>>,
}

impl ProcessBuilder {
    /// Starts a process with the given name, an empty pattern, and rate 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            base_rate: 1.0,
            rate_calculator: None,
            basis_sites: None,
        }
    }

    /// Adds one pattern entry; order does not matter.
    pub fn entry(mut self, entry: PatternEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Adds several pattern entries.
    pub fn entries(mut self, entries: impl IntoIterator<Item = PatternEntry>) -> Self {
        self.entries.extend(entries);
        self
    }

    /// Sets the base rate constant.
    pub fn base_rate(mut self, rate: f64) -> Self {
        self.base_rate = rate;
        self
    }

    /// Attaches a neighborhood-dependent rate function.
    pub fn rate_calculator(mut self, calc: impl RateCalculator + 'static) -> Self {
        self.rate_calculator = Some(Arc::new(calc));
        self
    }

    /// Restricts the process to sites of the listed basis indices.
    pub fn basis_sites(mut self, basis: impl IntoIterator<Item = usize>) -> Self {
        self.basis_sites = Some(basis.into_iter().collect());
        self
    }
}
