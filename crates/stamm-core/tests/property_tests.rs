//! # Property-Based Tests
//!
//! Normalizer idempotence, place deduplication and path identities,
//! checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use stamm_core::normalize::format_core_date;
use stamm_core::{
    ChildLink, ChildRelation, DatePrecision, Individual, IndividualId, Kinship, MemoryStore, Place,
    Store, Union, load, normalize_date, normalize_place, parse_str, seed_event_types,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const PLACE_WORDS: &[&str] = &[
    "Springfield",
    "Graz",
    "Cork",
    "Lancaster",
    "TX",
    "Texas",
    "ny",
    "Bavaria",
    "Ohio",
    "England",
    "usa",
    "Germany",
    "Kent",
    "Styria",
    "Cook County",
];

fn place_string() -> impl Strategy<Value = String> {
    vec(prop::sample::select(PLACE_WORDS), 1..6).prop_map(|parts| parts.join(", "))
}

/// A chain of `len` individuals, each the child of the one before.
fn chain(len: usize) -> (MemoryStore, Vec<IndividualId>) {
    let mut store = MemoryStore::new();
    let mut ids = Vec::with_capacity(len);
    for n in 0..len {
        let id = store
            .create(Individual::new(format!("@I{}@", n)))
            .expect("create");
        if let Some(&parent) = ids.last() {
            let mut union = Union::new(format!("@F{}@", n));
            union.husband = Some(parent);
            let union = store.create(union).expect("union");
            store
                .create(ChildLink::new(union, id, ChildRelation::Biological))
                .expect("link");
        }
        ids.push(id);
    }
    (store, ids)
}

/// `size` individuals joined by (parent, child) edges, one single-parent
/// union per edge. Self edges and reversed duplicates are skipped.
fn family_graph(size: usize, edges: &[(usize, usize)]) -> (MemoryStore, Vec<IndividualId>) {
    let mut store = MemoryStore::new();
    let ids: Vec<IndividualId> = (0..size)
        .map(|n| {
            store
                .create(Individual::new(format!("@I{}@", n)))
                .expect("create")
        })
        .collect();
    let mut seen = BTreeSet::new();
    for &(parent, child) in edges {
        let (parent, child) = (parent % size, child % size);
        if parent == child || seen.contains(&(child, parent)) || !seen.insert((parent, child)) {
            continue;
        }
        let mut union = Union::new(format!("@F{}_{}@", parent, child));
        union.husband = Some(ids[parent]);
        let union = store.create(union).expect("union");
        store
            .create(ChildLink::new(union, ids[child], ChildRelation::Biological))
            .expect("link");
    }
    (store, ids)
}

/// Plain breadth-first distance over parent and child edges.
fn bfs_distance(kin: &Kinship<'_, MemoryStore>, from: IndividualId, to: IndividualId) -> Option<usize> {
    let mut depth = BTreeMap::from([(from, 0usize)]);
    let mut queue = VecDeque::from([from]);
    while let Some(current) = queue.pop_front() {
        let here = depth[&current];
        if current == to {
            return Some(here);
        }
        let mut neighbors = kin.parents_of(current).expect("parents");
        neighbors.extend(kin.children_of(current).expect("children"));
        for next in neighbors {
            depth.entry(next).or_insert_with(|| {
                queue.push_back(next);
                here + 1
            });
        }
    }
    None
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Normalize, format, normalize again: the sort date is unchanged.
    #[test]
    fn core_date_round_trip(
        day in 1u32..=31,
        month in 0usize..12,
        year in 1000i32..=2100,
    ) {
        let raw = format!("{} {} {}", day, MONTHS[month], year);
        let first = normalize_date(&raw);
        prop_assert_eq!(first.precision, DatePrecision::Exact);
        let sort = first.sort.expect("core dates always parse");

        let again = normalize_date(&format_core_date(sort, first.precision));
        prop_assert_eq!(again.sort, Some(sort));
        prop_assert_eq!(again.precision, DatePrecision::Exact);
    }

    /// Month-only and year-only dates keep their precision through a round trip.
    #[test]
    fn partial_date_round_trip(month in 0usize..12, year in 1000i32..=2100) {
        for raw in [format!("{} {}", MONTHS[month], year), year.to_string()] {
            let first = normalize_date(&raw);
            let sort = first.sort.expect("partial dates parse");
            let again = normalize_date(&format_core_date(sort, first.precision));
            prop_assert_eq!(again, first);
        }
    }

    /// Normalizing a normalized place reproduces the same structure.
    #[test]
    fn place_normalization_idempotent(raw in place_string()) {
        let first = normalize_place(&raw).expect("non-blank");
        let second = normalize_place(&first.normalized).expect("non-blank");
        prop_assert_eq!(&second.normalized, &first.normalized);
        prop_assert_eq!(second.city, first.city);
        prop_assert_eq!(second.county, first.county);
        prop_assert_eq!(second.state, first.state);
        prop_assert_eq!(second.country, first.country);
    }

    /// One load creates exactly one place per distinct place string.
    #[test]
    fn places_deduplicated_within_load(places in vec(place_string(), 1..20)) {
        let mut text = String::new();
        for (n, place) in places.iter().enumerate() {
            text.push_str(&format!("0 @I{}@ INDI\n1 RESI\n2 PLAC {}\n", n, place));
        }

        let mut store = MemoryStore::new();
        seed_event_types(&mut store).expect("seed");
        let report = load(&mut store, &parse_str(&text)).expect("load");

        let distinct: BTreeSet<&String> = places.iter().collect();
        prop_assert_eq!(report.places, distinct.len());
        prop_assert_eq!(store.count::<Place>().expect("count"), distinct.len());
    }

    /// The path from anyone to themselves is just that person.
    #[test]
    fn path_to_self_is_identity(len in 1usize..12, pick in 0usize..12) {
        let (store, ids) = chain(len);
        let me = ids[pick % len];
        let path = Kinship::new(&store).path(me, me).expect("path").expect("found");
        prop_assert_eq!(path.individuals, vec![me]);
        prop_assert!(path.steps.is_empty());
    }

    /// Along a chain, the path between two members visits everyone between them.
    #[test]
    fn chain_path_length(len in 2usize..12, a in 0usize..12, b in 0usize..12) {
        let (store, ids) = chain(len);
        let (a, b) = (a % len, b % len);
        let path = Kinship::new(&store)
            .path(ids[a], ids[b])
            .expect("path")
            .expect("chain is connected");
        prop_assert_eq!(path.degrees(), a.abs_diff(b));
        prop_assert_eq!(path.individuals.first(), Some(&ids[a]));
        prop_assert_eq!(path.individuals.last(), Some(&ids[b]));
    }

    /// On arbitrary family graphs the path is as short as a plain BFS finds,
    /// and every step joins a parent and child.
    #[test]
    fn path_is_shortest(
        size in 2usize..13,
        edges in vec((0usize..13, 0usize..13), 0..24),
        a in 0usize..13,
        b in 0usize..13,
    ) {
        let (store, ids) = family_graph(size, &edges);
        let (a, b) = (ids[a % size], ids[b % size]);
        let kin = Kinship::new(&store);

        let path = kin.path(a, b).expect("path");
        let expected = bfs_distance(&kin, a, b);
        prop_assert_eq!(path.as_ref().map(|p| p.degrees()), expected);

        if let Some(path) = path {
            prop_assert_eq!(path.individuals.first(), Some(&a));
            prop_assert_eq!(path.individuals.last(), Some(&b));
            for pair in path.individuals.windows(2) {
                let mut neighbors = kin.parents_of(pair[0]).expect("parents");
                neighbors.extend(kin.children_of(pair[0]).expect("children"));
                prop_assert!(neighbors.contains(&pair[1]));
            }
        }
    }
}
