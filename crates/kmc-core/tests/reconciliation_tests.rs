// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use kmc_core::{
    AddTask, Catalog, LatticeView, MatchError, Matcher, MatcherConfig, PairOutcome, PatternEntry,
    ProcessBuilder, ProcessId, RateContext, RateListener, Reconciliation, SiteIndex, Topology,
};
use kmc_dry_tests::{
    all_sites, hop_catalog, rebuild_from_scratch, CubicLattice, FillRng, SpeciesGrid,
    AXIAL_DIRECTIONS, ATOM, VACANCY,
};
use rustc_hash::FxHashMap;

fn dilute_grid(lattice: &CubicLattice, vacancies: usize, seed: u64) -> SpeciesGrid {
    let mut rng = FillRng::from_seed_u64(seed);
    SpeciesGrid::random(lattice.site_count(), ATOM, VACANCY, vacancies, &mut rng)
}

fn step(p: usize, d: f64, n: usize) -> usize {
    if d > 0.0 {
        p + 1
    } else if d < 0.0 {
        p + n - 1
    } else {
        p
    }
}

/// Hop `dir` is enabled at `site` iff the site holds an atom and its
/// neighbor along `dir` is vacant.
fn expected_hops(lattice: &CubicLattice, grid: &SpeciesGrid) -> Vec<(SiteIndex, ProcessId)> {
    let [nx, ny, nz] = lattice.dims();
    let occ = grid.as_slice();
    let mut out = Vec::new();
    for (k, (_, dir)) in AXIAL_DIRECTIONS.iter().enumerate() {
        let process = ProcessId::from_raw(k as u32);
        for site in lattice.sites() {
            let [x, y, z] = lattice.position_of(site);
            let target = lattice.site_at(
                step(x, dir[0], nx),
                step(y, dir[1], ny),
                step(z, dir[2], nz),
            );
            if occ[site.value()] == ATOM && occ[target.value()] == VACANCY {
                out.push((site, process));
            }
        }
    }
    out.sort_by_key(|&(s, p)| (p, s));
    out
}

#[derive(Default)]
struct RateTable {
    per_process: FxHashMap<ProcessId, f64>,
    calls: usize,
}

impl RateListener for RateTable {
    fn rate_delta(&mut self, process: ProcessId, delta: f64) {
        *self.per_process.entry(process).or_insert(0.0) += delta;
        self.calls += 1;
    }
}

#[test]
fn bulk_matching_enables_exactly_the_possible_hops() {
    let lattice = CubicLattice::new([5, 5, 5], 1.0).unwrap();
    let grid = dilute_grid(&lattice, 12, 0xC0FFEE);
    let (mut catalog, _) = hop_catalog(false).unwrap();
    let summary = Matcher::default()
        .calculate_matching(
            &mut catalog,
            &LatticeView::new(&lattice, &grid),
            &all_sites(&lattice),
        )
        .unwrap();

    let expected = expected_hops(&lattice, &grid);
    assert_eq!(catalog.enabled_pairs(), expected);
    assert_eq!(summary.added, expected.len());
    assert_eq!(summary.removed + summary.updated, 0);
    assert!((catalog.total_rate() - expected.len() as f64).abs() < 1e-9);
}

#[test]
fn incremental_cycle_after_hop_matches_full_rebuild() {
    let lattice = CubicLattice::new([5, 5, 5], 1.0).unwrap();
    let matcher = Matcher::default();
    let mut grid = dilute_grid(&lattice, 20, 7);
    let (mut catalog, _) = hop_catalog(true).unwrap();
    matcher
        .calculate_matching(
            &mut catalog,
            &LatticeView::new(&lattice, &grid),
            &all_sites(&lattice),
        )
        .unwrap();

    let mut rng = FillRng::from_seed_u64(11);
    for _ in 0..25 {
        let pairs = catalog.enabled_pairs();
        let (site, process) = pairs[rng.next_below(pairs.len())];
        let dir = AXIAL_DIRECTIONS[process.value() as usize].1;
        let target = lattice
            .neighbors(site)
            .unwrap()
            .iter()
            .find(|n| n.offset.to_array() == dir)
            .unwrap()
            .site;
        grid.swap(site, target).unwrap();

        let candidates = matcher
            .candidates_around(&lattice, &catalog, &[site, target])
            .unwrap();
        let tasks = matcher
            .match_indices_with_processes(&candidates, &catalog, &LatticeView::new(&lattice, &grid))
            .unwrap();
        // The executed hop always disappears: its site is now vacant.
        assert!(tasks.removes.iter().any(|t| t.site == site && t.process == process));
        matcher.update_processes(tasks, &mut catalog).unwrap();
    }

    let (mut oracle, _) = hop_catalog(true).unwrap();
    rebuild_from_scratch(
        &matcher,
        &mut oracle,
        &LatticeView::new(&lattice, &grid),
        &all_sites(&lattice),
    )
    .unwrap();
    assert_eq!(catalog.enabled_pairs(), oracle.enabled_pairs());
    assert_eq!(catalog.enabled_digest(), oracle.enabled_digest());
    for p in oracle.processes() {
        for (site, rate) in p.enabled().iter() {
            assert_eq!(catalog.rate_of(site, p.id()), Some(rate));
        }
    }
    assert!((catalog.total_rate() - oracle.total_rate()).abs() < 1e-9);
    assert!((catalog.recompute_totals() - oracle.total_rate()).abs() < 1e-12);
}

#[test]
fn listener_sees_one_delta_per_task() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap();
    let grid = dilute_grid(&lattice, 6, 3);
    let (mut catalog, _) = hop_catalog(true).unwrap();
    let matcher = Matcher::default();
    let candidates: Vec<_> = all_sites(&lattice)
        .into_iter()
        .flat_map(|s| catalog.processes().iter().map(move |p| (s, p.id())).collect::<Vec<_>>())
        .collect();
    let tasks = matcher
        .match_indices_with_processes(&candidates, &catalog, &LatticeView::new(&lattice, &grid))
        .unwrap();
    let n = tasks.len();

    let mut table = RateTable::default();
    let summary = matcher
        .update_processes_with(tasks, &mut catalog, &mut table)
        .unwrap();
    assert_eq!(table.calls, n);
    assert_eq!(summary.added, n);
    for p in catalog.processes() {
        let seen = table.per_process.get(&p.id()).copied().unwrap_or(0.0);
        assert!((seen - p.enabled().total_rate()).abs() < 1e-12);
    }
    assert!((summary.rate_delta - catalog.total_rate()).abs() < 1e-9);
}

#[test]
fn reapplying_tasks_is_an_inconsistent_application() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap();
    let mut grid = SpeciesGrid::new(lattice.site_count(), ATOM);
    grid.set(lattice.site_at(1, 0, 0), VACANCY).unwrap();
    let (mut catalog, ids) = hop_catalog(false).unwrap();
    let matcher = Matcher::default();
    let candidates: Vec<_> = all_sites(&lattice).into_iter().map(|s| (s, ids[0])).collect();
    let tasks = matcher
        .match_indices_with_processes(&candidates, &catalog, &LatticeView::new(&lattice, &grid))
        .unwrap();
    let first_add = tasks.adds[0];
    matcher.update_processes(tasks.clone(), &mut catalog).unwrap();
    assert_eq!(
        matcher.update_processes(tasks, &mut catalog).unwrap_err(),
        MatchError::AlreadyEnabled {
            site: first_add.site,
            process: first_add.process
        }
    );

    let stray = Reconciliation {
        removes: vec![kmc_core::RemoveTask {
            site: SiteIndex::from_raw(0),
            process: ids[3],
        }],
        ..Reconciliation::default()
    };
    assert!(matches!(
        matcher.update_processes(stray, &mut catalog),
        Err(MatchError::NotEnabled { .. })
    ));
}

#[test]
fn rejected_reconciliation_leaves_catalog_untouched() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap();
    let mut grid = SpeciesGrid::new(lattice.site_count(), ATOM);
    grid.set(lattice.site_at(1, 0, 0), VACANCY).unwrap();
    let (mut catalog, ids) = hop_catalog(false).unwrap();
    let matcher = Matcher::default();
    matcher
        .calculate_matching(
            &mut catalog,
            &LatticeView::new(&lattice, &grid),
            &all_sites(&lattice),
        )
        .unwrap();
    let origin = lattice.site_at(0, 0, 0);
    assert!(catalog.is_enabled(origin, ids[0]));
    let digest = catalog.enabled_digest();
    let total = catalog.total_rate();

    // A valid remove followed by an add of a pair that stays enabled.
    let bad = Reconciliation {
        removes: vec![kmc_core::RemoveTask {
            site: origin,
            process: ids[0],
        }],
        adds: vec![AddTask {
            site: lattice.site_at(2, 0, 0),
            process: ids[1],
            rate: 1.0,
        }],
        ..Reconciliation::default()
    };
    let mut table = RateTable::default();
    assert_eq!(
        matcher
            .update_processes_with(bad, &mut catalog, &mut table)
            .unwrap_err(),
        MatchError::AlreadyEnabled {
            site: lattice.site_at(2, 0, 0),
            process: ids[1]
        }
    );
    assert_eq!(table.calls, 0);
    assert!(catalog.is_enabled(origin, ids[0]));
    assert_eq!(catalog.enabled_digest(), digest);
    assert_eq!(catalog.total_rate(), total);

    // Removing the same pair twice in one batch is caught up front too.
    let twice = Reconciliation {
        removes: vec![
            kmc_core::RemoveTask {
                site: origin,
                process: ids[0],
            };
            2
        ],
        ..Reconciliation::default()
    };
    assert!(matches!(
        matcher.update_processes(twice, &mut catalog),
        Err(MatchError::NotEnabled { .. })
    ));
    assert!(catalog.is_enabled(origin, ids[0]));
}

#[test]
fn second_pass_without_changes_is_empty() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap();
    let grid = dilute_grid(&lattice, 9, 21);
    let (mut catalog, _) = hop_catalog(true).unwrap();
    let matcher = Matcher::default();
    let view = LatticeView::new(&lattice, &grid);
    matcher
        .calculate_matching(&mut catalog, &view, &all_sites(&lattice))
        .unwrap();
    let again = matcher
        .calculate_matching(&mut catalog, &view, &all_sites(&lattice))
        .unwrap();
    assert_eq!(again.added + again.updated + again.removed, 0);
}

#[test]
fn single_pair_recompute_reports_each_outcome() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap();
    let mut grid = SpeciesGrid::new(lattice.site_count(), ATOM);
    let (mut catalog, ids) = hop_catalog(true).unwrap();
    let plus_x = ids[0];
    let matcher = Matcher::default();
    let site = lattice.site_at(1, 1, 1);
    let east = lattice.site_at(2, 1, 1);
    let north = lattice.site_at(1, 2, 1);

    let run = |catalog: &mut Catalog, grid: &SpeciesGrid| {
        matcher
            .calculate_matching_for(plus_x, catalog, &LatticeView::new(&lattice, grid), site)
            .unwrap()
    };

    assert_eq!(run(&mut catalog, &grid), PairOutcome::Unchanged);
    grid.set(east, VACANCY).unwrap();
    // Five atoms on the remaining rate-dependency positions.
    assert_eq!(run(&mut catalog, &grid), PairOutcome::Added(1.0 / 6.0));
    assert_eq!(run(&mut catalog, &grid), PairOutcome::Unchanged);
    grid.set(north, VACANCY).unwrap();
    assert_eq!(
        run(&mut catalog, &grid),
        PairOutcome::Updated {
            old: 1.0 / 6.0,
            new: 1.0 / 5.0
        }
    );
    grid.set(east, ATOM).unwrap();
    assert_eq!(run(&mut catalog, &grid), PairOutcome::Removed(1.0 / 5.0));
    assert_eq!(catalog.enabled_count(), 0);
    assert!(catalog.total_rate().abs() < 1e-12);
}

#[test]
fn rate_tolerance_suppresses_small_updates() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap();
    let mut grid = SpeciesGrid::new(lattice.site_count(), ATOM);
    let site = lattice.site_at(1, 1, 1);
    grid.set(lattice.site_at(2, 1, 1), VACANCY).unwrap();

    let (mut catalog, ids) = hop_catalog(true).unwrap();
    let lax = Matcher::new(MatcherConfig {
        rate_tolerance: 0.1,
        ..MatcherConfig::default()
    })
    .unwrap();
    lax.calculate_matching_for(ids[0], &mut catalog, &LatticeView::new(&lattice, &grid), site)
        .unwrap();
    // 1/6 -> 1/5 moves the rate by ~0.033, inside the tolerance.
    grid.set(lattice.site_at(1, 2, 1), VACANCY).unwrap();
    let rec = lax
        .match_indices_with_processes(&[(site, ids[0])], &catalog, &LatticeView::new(&lattice, &grid))
        .unwrap();
    assert!(rec.is_empty());
    let strict = Matcher::default()
        .match_indices_with_processes(&[(site, ids[0])], &catalog, &LatticeView::new(&lattice, &grid))
        .unwrap();
    assert_eq!(strict.updates.len(), 1);
}

#[test]
fn duplicate_candidates_are_evaluated_once() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap();
    let mut grid = SpeciesGrid::new(lattice.site_count(), ATOM);
    let site = lattice.site_at(0, 0, 0);
    grid.set(lattice.site_at(1, 0, 0), VACANCY).unwrap();
    let (catalog, ids) = hop_catalog(false).unwrap();
    let rec = Matcher::default()
        .match_indices_with_processes(
            &[(site, ids[0]), (site, ids[1]), (site, ids[0])],
            &catalog,
            &LatticeView::new(&lattice, &grid),
        )
        .unwrap();
    assert_eq!(
        rec.adds,
        vec![AddTask {
            site,
            process: ids[0],
            rate: 1.0
        }]
    );
}

#[test]
fn candidates_cover_the_cutoff_shell_of_touched_sites() {
    let lattice = CubicLattice::new([5, 5, 5], 1.0).unwrap();
    let (catalog, _) = hop_catalog(false).unwrap();
    let a = lattice.site_at(2, 2, 2);
    let b = lattice.site_at(3, 2, 2);
    let pairs = Matcher::default()
        .candidates_around(&lattice, &catalog, &[a, b])
        .unwrap();
    let mut sites: Vec<_> = pairs.iter().map(|&(s, _)| s).collect();
    sites.dedup();
    // Two overlapping 7-site shells share the two touched sites.
    assert_eq!(sites.len(), 12);
    assert_eq!(sites[0], a);
    assert_eq!(pairs.len(), 12 * catalog.len());
    assert!(sites.contains(&lattice.site_at(4, 2, 2)));
    assert!(!sites.contains(&lattice.site_at(4, 3, 2)));
}

#[test]
fn basis_restriction_filters_candidates_and_matches() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap().with_checkerboard();
    let grid = SpeciesGrid::new(lattice.site_count(), ATOM);
    let mut catalog = Catalog::default();
    let even = catalog
        .register(
            ProcessBuilder::new("even-only")
                .entry(PatternEntry::species([0.0, 0.0, 0.0], ATOM))
                .entries(AXIAL_DIRECTIONS.iter().map(|(_, d)| PatternEntry::wildcard(*d)))
                .basis_sites([0]),
        )
        .unwrap();
    let matcher = Matcher::default();
    matcher
        .calculate_matching(
            &mut catalog,
            &LatticeView::new(&lattice, &grid),
            &all_sites(&lattice),
        )
        .unwrap();
    assert_eq!(catalog.enabled_count(), 32);
    assert!(catalog
        .process(even)
        .unwrap()
        .enabled()
        .sites()
        .iter()
        .all(|&s| lattice.basis_of(s) == 0));

    // The odd center is dropped; its six axial neighbors are all even.
    let odd = lattice.site_at(1, 0, 0);
    let pairs = matcher.candidates_around(&lattice, &catalog, &[odd]).unwrap();
    assert_eq!(pairs.len(), 6);
    assert!(pairs.iter().all(|&(s, p)| p == even && lattice.basis_of(s) == 0));
    assert!(!pairs.iter().any(|&(s, _)| s == odd));
}

#[test]
fn rate_calculator_cannot_see_past_its_pattern() {
    // Topology reaches the second shell, the process only the first.
    let lattice = CubicLattice::new([5, 5, 5], 1.5).unwrap();
    let mut grid = SpeciesGrid::new(lattice.site_count(), ATOM);
    let build = || {
        let mut catalog = Catalog::default();
        catalog
            .register(
                ProcessBuilder::new("crowded")
                    .entry(PatternEntry::species([0.0, 0.0, 0.0], ATOM))
                    .entries(
                        AXIAL_DIRECTIONS
                            .iter()
                            .map(|(_, d)| PatternEntry::rate_dependency(*d)),
                    )
                    .rate_calculator(|ctx: &RateContext<'_>| {
                        let vacant = ctx
                            .neighborhood
                            .iter()
                            .filter(|e| e.species() == VACANCY)
                            .count();
                        ctx.base_rate + vacant as f64
                    }),
            )
            .unwrap();
        catalog
    };
    let matcher = Matcher::default();
    let mut incremental = build();
    matcher
        .calculate_matching(
            &mut incremental,
            &LatticeView::new(&lattice, &grid),
            &all_sites(&lattice),
        )
        .unwrap();

    let watched = lattice.site_at(2, 2, 2);
    let diagonal = lattice.site_at(3, 3, 2);
    grid.set(diagonal, VACANCY).unwrap();
    let view = LatticeView::new(&lattice, &grid);
    let candidates = matcher
        .candidates_around(&lattice, &incremental, &[diagonal])
        .unwrap();
    assert!(!candidates.iter().any(|&(s, _)| s == watched));
    let tasks = matcher
        .match_indices_with_processes(&candidates, &incremental, &view)
        .unwrap();
    matcher.update_processes(tasks, &mut incremental).unwrap();

    let mut oracle = build();
    rebuild_from_scratch(&matcher, &mut oracle, &view, &all_sites(&lattice)).unwrap();
    let p = ProcessId::from_raw(0);
    assert_eq!(incremental.rate_of(watched, p), Some(1.0));
    assert_eq!(oracle.rate_of(watched, p), Some(1.0));
    assert_eq!(incremental.enabled_digest(), oracle.enabled_digest());
    for site in lattice.sites() {
        assert_eq!(incremental.rate_of(site, p), oracle.rate_of(site, p));
    }
}

#[test]
fn collaborator_errors_propagate() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap();
    let grid = SpeciesGrid::new(lattice.site_count(), ATOM);
    let mut catalog = Catalog::default();
    let broken = catalog
        .register(
            ProcessBuilder::new("nan")
                .entry(PatternEntry::wildcard([0.0, 0.0, 0.0]))
                .rate_calculator(|_: &RateContext<'_>| f64::NAN),
        )
        .unwrap();
    let view = LatticeView::new(&lattice, &grid);
    let matcher = Matcher::default();
    let site = SiteIndex::from_raw(0);

    assert!(matches!(
        matcher.match_indices_with_processes(&[(site, broken)], &catalog, &view),
        Err(MatchError::InvalidRate { process: Some(p), site: Some(s), .. }) if p == broken && s == site
    ));
    assert_eq!(
        matcher
            .match_indices_with_processes(&[(site, ProcessId::from_raw(9))], &catalog, &view)
            .unwrap_err(),
        MatchError::UnknownProcess(ProcessId::from_raw(9))
    );
    assert_eq!(
        matcher
            .match_indices_with_processes(&[(SiteIndex::from_raw(64), broken)], &catalog, &view)
            .unwrap_err(),
        MatchError::UnknownSite(SiteIndex::from_raw(64))
    );
}

#[test]
fn digest_ignores_enabled_storage_order() {
    let lattice = CubicLattice::new([4, 4, 4], 1.0).unwrap();
    let mut grid = SpeciesGrid::new(lattice.site_count(), ATOM);
    grid.set(lattice.site_at(1, 0, 0), VACANCY).unwrap();
    grid.set(lattice.site_at(1, 2, 2), VACANCY).unwrap();
    let view = LatticeView::new(&lattice, &grid);
    let matcher = Matcher::default();
    let forward = all_sites(&lattice);
    let backward: Vec<_> = forward.iter().rev().copied().collect();

    let (mut a, _) = hop_catalog(false).unwrap();
    let (mut b, _) = hop_catalog(false).unwrap();
    matcher.calculate_matching(&mut a, &view, &forward).unwrap();
    matcher.calculate_matching(&mut b, &view, &backward).unwrap();
    assert_ne!(
        a.processes()[0].enabled().sites(),
        b.processes()[0].enabled().sites()
    );
    assert_eq!(a.enabled_digest(), b.enabled_digest());
}
