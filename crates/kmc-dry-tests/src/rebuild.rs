// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! From-scratch matching, the oracle incremental updates are checked against.

use kmc_core::{
    ApplySummary, Catalog, MatchError, Matcher, NeighborhoodSource, SiteIndex, Topology,
};

/// Every site of `topology`, ascending.
pub fn all_sites<T: Topology + ?Sized>(topology: &T) -> Vec<SiteIndex> {
    (0..topology.site_count()).map(SiteIndex::from_raw).collect()
}

/// Forgets every enabled pair in `catalog` and re-matches all of `sites`
/// against every process.
///
/// # Errors
/// Propagates matching failures.
pub fn rebuild_from_scratch<S>(
    matcher: &Matcher,
    catalog: &mut Catalog,
    source: &S,
    sites: &[SiteIndex],
) -> Result<ApplySummary, MatchError>
where
    S: NeighborhoodSource + ?Sized,
{
    catalog.clear_enabled();
    matcher.calculate_matching(catalog, source, sites)
}
