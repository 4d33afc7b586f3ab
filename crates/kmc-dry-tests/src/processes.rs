// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Process fixtures: atom/vacancy hops along the six axial directions.

use kmc_core::{
    Catalog, MatchError, PatternEntry, ProcessBuilder, ProcessId, RateCalculator, RateContext,
    Requirement, SpeciesId,
};

/// Species id used for atoms in the fixtures.
pub const ATOM: SpeciesId = SpeciesId::from_raw(0);

/// Species id used for vacancies in the fixtures.
pub const VACANCY: SpeciesId = SpeciesId::from_raw(1);

/// The six nearest-neighbor directions with their labels.
pub const AXIAL_DIRECTIONS: [(&str, [f64; 3]); 6] = [
    ("+x", [1.0, 0.0, 0.0]),
    ("-x", [-1.0, 0.0, 0.0]),
    ("+y", [0.0, 1.0, 0.0]),
    ("-y", [0.0, -1.0, 0.0]),
    ("+z", [0.0, 0.0, 1.0]),
    ("-z", [0.0, 0.0, -1.0]),
];

/// An atom on the reference site hops into a vacancy at `dir`.
///
/// The pattern covers the whole nearest-neighbor shell so it lines up with
/// neighborhoods position by position. The remaining axial neighbors are
/// wildcards, or with `environment` set, rate dependencies feeding
/// [`neighbor_count_rate`].
pub fn hop_process(label: &str, dir: [f64; 3], environment: bool) -> ProcessBuilder {
    let others = AXIAL_DIRECTIONS
        .iter()
        .filter(|(_, d)| *d != dir)
        .map(move |(_, d)| {
            if environment {
                PatternEntry::rate_dependency(*d)
            } else {
                PatternEntry::wildcard(*d)
            }
        });
    let builder = ProcessBuilder::new(format!("hop/{label}"))
        .entry(PatternEntry::species([0.0, 0.0, 0.0], ATOM))
        .entry(PatternEntry::species(dir, VACANCY))
        .entries(others);
    if environment {
        builder.rate_calculator(neighbor_count_rate(ATOM))
    } else {
        builder
    }
}

/// Rate function dividing the base rate by `1 + n`, where `n` counts
/// rate-dependency positions currently holding `species`.
pub fn neighbor_count_rate(species: SpeciesId) -> impl RateCalculator {
    move |ctx: &RateContext<'_>| {
        let bound = ctx
            .pattern
            .iter()
            .zip(ctx.neighborhood.iter())
            .filter(|(want, have)| {
                want.requirement() == Requirement::RateDependency && have.species() == species
            })
            .count();
        #[allow(clippy::cast_precision_loss)] // at most a handful of neighbors
        let n = bound as f64;
        ctx.base_rate / (1.0 + n)
    }
}

/// Catalog holding the six axial hops, in [`AXIAL_DIRECTIONS`] order.
///
/// # Errors
/// Propagates registration failures.
pub fn hop_catalog(environment: bool) -> Result<(Catalog, Vec<ProcessId>), MatchError> {
    let mut catalog = Catalog::default();
    let ids = AXIAL_DIRECTIONS
        .iter()
        .map(|(label, dir)| catalog.register(hop_process(label, *dir, environment)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((catalog, ids))
}
