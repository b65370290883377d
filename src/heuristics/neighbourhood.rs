//! Neighbourhood moves shared by simulated annealing and GA mutation.
//!
//! A move swaps the destinations of two journeys. When their quantities
//! differ the larger journey is split first, so each source still ships
//! exactly what it shipped before and each destination still receives what
//! it received before. [`compress`] then canonicalises the path.

use crate::solution::{Journey, Path};
use rand::Rng;
use std::collections::BTreeMap;

/// Random draws attempted before enumerating the valid pairs
const PAIR_SAMPLING_ATTEMPTS: usize = 64;

/// Pick two distinct indices of `path` whose journeys satisfy `valid`.
/// Returns `None` when no such pair exists.
pub fn pick_pair<R, F>(path: &[Journey], rng: &mut R, valid: F) -> Option<(usize, usize)>
where
    R: Rng + ?Sized,
    F: Fn(&Journey, &Journey) -> bool,
{
    if path.len() < 2 {
        return None;
    }

    for _ in 0..PAIR_SAMPLING_ATTEMPTS {
        let a = rng.gen_range(0..path.len());
        let b = rng.gen_range(0..path.len());
        if a != b && valid(&path[a], &path[b]) {
            return Some((a, b));
        }
    }

    let candidates: Vec<(usize, usize)> = (0..path.len())
        .flat_map(|a| ((a + 1)..path.len()).map(move |b| (a, b)))
        .filter(|&(a, b)| valid(&path[a], &path[b]))
        .collect();

    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.gen_range(0..candidates.len())])
    }
}

/// Swap the destinations of journeys `a` and `b`.
///
/// If the quantities differ the larger journey is reduced to the smaller
/// quantity and the remainder is appended as a new journey on the larger
/// journey's original edge.
pub fn swap_destinations(path: &mut Path, a: usize, b: usize) {
    let (qa, qb) = (path[a].quantity, path[b].quantity);

    if qa != qb {
        let (large, small_q) = if qa > qb { (a, qb) } else { (b, qa) };
        let rest = Journey::new(path[large].from, path[large].to, path[large].quantity - small_q);
        path[large].quantity = small_q;
        path.push(rest);
    }

    let to_a = path[a].to;
    path[a].to = path[b].to;
    path[b].to = to_a;
}

/// Generate a neighbour of `path`: two journeys with different sources and
/// different destinations exchange destinations.
///
/// Returns `None` if no such pair exists, which happens when the path uses
/// fewer than two distinct sources or destinations.
pub fn generate_neighbour<R: Rng + ?Sized>(path: &[Journey], rng: &mut R) -> Option<Path> {
    let (a, b) = pick_pair(path, rng, |x, y| x.from != y.from && x.to != y.to)?;
    let mut neighbour = path.to_vec();
    swap_destinations(&mut neighbour, a, b);
    Some(neighbour)
}

/// Canonical form of a path.
///
/// Journeys on the same edge are merged and re-split into runs of
/// `max_journey_size`, followed by the remainder. Output is sorted by
/// `(from, to, descending quantity)` and contains no zero quantities.
pub fn compress(path: &[Journey], max_journey_size: i32) -> Path {
    let mut totals: BTreeMap<(usize, usize), i64> = BTreeMap::new();
    for journey in path {
        *totals.entry((journey.from, journey.to)).or_insert(0) += journey.quantity as i64;
    }

    let cap = max_journey_size as i64;
    let mut compressed = Vec::with_capacity(path.len());
    for ((from, to), total) in totals {
        if total <= 0 {
            continue;
        }
        for _ in 0..(total / cap) {
            compressed.push(Journey::new(from, to, max_journey_size));
        }
        let remainder = total % cap;
        if remainder > 0 {
            compressed.push(Journey::new(from, to, remainder as i32));
        }
    }

    compressed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::construction::{ConstructionHeuristic, RandomConstruction};
    use crate::network::{generate, GeneratorConfig};
    use crate::solution::{fitness, is_complete};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_swap_destinations_splits_larger() {
        let mut path = vec![Journey::new(0, 2, 10), Journey::new(1, 3, 4)];
        swap_destinations(&mut path, 0, 1);
        assert_eq!(path, vec![Journey::new(0, 3, 4), Journey::new(1, 2, 4), Journey::new(0, 2, 6)]);

        let mut path = vec![Journey::new(0, 2, 3), Journey::new(1, 3, 3)];
        swap_destinations(&mut path, 1, 0);
        assert_eq!(path, vec![Journey::new(0, 3, 3), Journey::new(1, 2, 3)]);
    }

    #[test]
    fn test_neighbour_requires_distinct_endpoints() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let same_source = vec![Journey::new(0, 2, 5), Journey::new(0, 3, 5)];
        assert!(generate_neighbour(&same_source, &mut rng).is_none());

        let same_target = vec![Journey::new(0, 2, 5), Journey::new(1, 2, 5)];
        assert!(generate_neighbour(&same_target, &mut rng).is_none());

        let path = vec![Journey::new(0, 2, 5), Journey::new(0, 3, 5), Journey::new(1, 3, 2)];
        let neighbour = generate_neighbour(&path, &mut rng).unwrap();
        assert_ne!(compress(&neighbour, 20), compress(&path, 20));
    }

    #[test]
    fn test_pick_pair_falls_back_to_enumeration() {
        // Only one valid pair among many journeys
        let mut path = vec![Journey::new(0, 5, 1); 40];
        path.push(Journey::new(1, 6, 1));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let (a, b) = pick_pair(&path, &mut rng, |x, y| x.from != y.from && x.to != y.to).unwrap();
        assert!(a == 40 || b == 40);
    }

    #[test]
    fn test_compress_merges_and_splits() {
        let path = vec![
            Journey::new(1, 2, 7),
            Journey::new(0, 3, 15),
            Journey::new(0, 3, 10),
            Journey::new(1, 2, 3),
        ];
        assert_eq!(
            compress(&path, 20),
            vec![Journey::new(0, 3, 20), Journey::new(0, 3, 5), Journey::new(1, 2, 10)]
        );
        assert_eq!(compress(&[Journey::new(0, 1, 45)], 20).len(), 3);
        assert!(compress(&[], 20).is_empty());
    }

    proptest! {
        #[test]
        fn compress_is_canonical(
            journeys in prop::collection::vec((0usize..5, 0usize..5, 1i32..60), 0..40),
            cap in 1i32..30,
        ) {
            let path: Path = journeys.into_iter().map(Journey::from).collect();
            let once = compress(&path, cap);

            prop_assert_eq!(&compress(&once, cap), &once);
            prop_assert!(once.iter().all(|j| j.quantity > 0 && j.quantity <= cap));

            let mut before: BTreeMap<(usize, usize), i64> = BTreeMap::new();
            let mut after: BTreeMap<(usize, usize), i64> = BTreeMap::new();
            for j in &path {
                *before.entry((j.from, j.to)).or_insert(0) += j.quantity as i64;
            }
            for j in &once {
                *after.entry((j.from, j.to)).or_insert(0) += j.quantity as i64;
            }
            prop_assert_eq!(before, after);
        }

        #[test]
        fn neighbours_of_complete_paths_stay_complete(seed in any::<u64>(), depots in 4usize..20) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let network = generate(&GeneratorConfig { depots, ..Default::default() }, &mut rng).unwrap();
            let path = compress(&RandomConstruction::new(20).construct(&network, &mut rng), 20);

            if let Some(neighbour) = generate_neighbour(&path, &mut rng) {
                let neighbour = compress(&neighbour, 20);
                prop_assert!(is_complete(&neighbour, &network));
                prop_assert!(fitness(&neighbour, &network) > 0.0);
            }
        }
    }
}
