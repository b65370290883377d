//! Solution representation and evaluation for the TNRP.
//!
//! A solution (path) is an ordered list of journeys, each moving a positive
//! quantity from a surplus depot to a deficit depot. The cost of a path is
//! the sum of the distances of its journeys; the quantity moved does not
//! weight the distance.

use crate::network::{DepotId, Network};
use serde::{Deserialize, Serialize};

/// A single transfer of `quantity` units between two depots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Journey {
    pub from: DepotId,
    pub to: DepotId,
    #[serde(rename = "s")]
    pub quantity: i32,
}

impl Journey {
    pub fn new(from: DepotId, to: DepotId, quantity: i32) -> Self {
        Journey { from, to, quantity }
    }

    /// Compact `(from, to, s)` form
    pub fn as_triple(&self) -> (DepotId, DepotId, i32) {
        (self.from, self.to, self.quantity)
    }

    /// True if both journeys travel along the same directed edge
    pub fn same_edge(&self, other: &Journey) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl From<(DepotId, DepotId, i32)> for Journey {
    fn from((from, to, quantity): (DepotId, DepotId, i32)) -> Self {
        Journey { from, to, quantity }
    }
}

impl From<Journey> for (DepotId, DepotId, i32) {
    fn from(journey: Journey) -> Self {
        journey.as_triple()
    }
}

/// An ordered collection of journeys
pub type Path = Vec<Journey>;

/// Total distance travelled by a path, using the network's distance table.
///
/// Panics if a journey references a depot outside the network.
pub fn fitness(path: &[Journey], network: &Network) -> f64 {
    path.iter().map(|j| network.distance(j.from, j.to)).sum()
}

/// Apply every journey of `path` to `network`, in order, in place.
///
/// No validation is performed: a journey may push a depot past zero. Callers
/// that only want to probe the outcome must pass a clone of their network.
pub fn apply(path: &[Journey], network: &mut Network) {
    for journey in path {
        network.move_supply(journey.from, journey.to, journey.quantity);
    }
}

/// True iff every depot of `network` is balanced
pub fn is_resolved(network: &Network) -> bool {
    network.is_resolved()
}

/// True iff applying `path` to a copy of `original` balances every depot.
/// Neither argument is modified.
pub fn is_complete(path: &[Journey], original: &Network) -> bool {
    let mut probe = original.clone();
    apply(path, &mut probe);
    probe.is_resolved()
}

/// Convert a path to its compact triple form
pub fn encode(path: &[Journey]) -> Vec<(DepotId, DepotId, i32)> {
    path.iter().map(Journey::as_triple).collect()
}

/// Convert triples back into a path
pub fn decode(triples: &[(DepotId, DepotId, i32)]) -> Path {
    triples.iter().map(|&t| Journey::from(t)).collect()
}

/// Result of one search driver run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Algorithm that produced this outcome
    pub algorithm: String,
    /// Cost recorded at every evaluation (or iteration for SA)
    pub costs: Vec<f64>,
    /// Best path found
    pub best_path: Path,
    /// Cost of the best path
    pub best_cost: f64,
    /// Number of fitness evaluations performed
    pub evaluations: usize,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Whether the best path balances the network
    pub complete: bool,
}

impl SearchOutcome {
    /// Create an empty outcome for `algorithm`
    pub fn new(algorithm: &str) -> Self {
        SearchOutcome {
            algorithm: algorithm.to_string(),
            costs: Vec::new(),
            best_path: Vec::new(),
            best_cost: f64::INFINITY,
            evaluations: 0,
            computation_time: 0.0,
            complete: false,
        }
    }

    /// Record one evaluated cost and keep `path` if it improves the best.
    /// Returns true on improvement.
    pub fn record(&mut self, path: &[Journey], cost: f64) -> bool {
        self.costs.push(cost);
        self.evaluations += 1;
        if cost < self.best_cost {
            self.best_cost = cost;
            self.best_path = path.to_vec();
            true
        } else {
            false
        }
    }

    /// Running best cost after each evaluation
    pub fn best_so_far(&self) -> Vec<f64> {
        self.costs
            .iter()
            .scan(f64::INFINITY, |best, &c| {
                *best = best.min(c);
                Some(*best)
            })
            .collect()
    }
}

impl std::fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.best_cost)?;
        writeln!(f, "  Complete: {}", self.complete)?;
        writeln!(f, "  Evaluations: {}", self.evaluations)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        writeln!(f, "  Journeys: {}", self.best_path.len())?;
        for journey in &self.best_path {
            writeln!(f, "    {} -> {} : {}", journey.from, journey.to, journey.quantity)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Location, Metric};
    use proptest::prelude::*;

    fn triangle() -> Network {
        Network::new(
            vec![
                (Location::new(0.0, 0.0), 10),
                (Location::new(1.0, 2.0), -4),
                (Location::new(2.0, 0.0), -6),
            ],
            Metric::Euclidean,
        )
        .unwrap()
    }

    #[test]
    fn test_fitness_ignores_quantity() {
        let network = triangle();
        let root5 = 5.0f64.sqrt();

        assert!((fitness(&[Journey::new(0, 1, 10)], &network) - root5).abs() < 1e-10);
        assert!((fitness(&[Journey::new(0, 1, 1)], &network) - root5).abs() < 1e-10);
        assert_eq!(fitness(&[], &network), 0.0);
    }

    #[test]
    fn test_apply_moves_supply() {
        let mut network = triangle();
        apply(&[Journey::new(0, 1, 4), Journey::new(0, 2, 6)], &mut network);
        assert!(is_resolved(&network));
    }

    #[test]
    fn test_is_complete_leaves_network_untouched() {
        let network = triangle();
        let complete = vec![Journey::new(0, 2, 6), Journey::new(0, 1, 4)];
        let partial = vec![Journey::new(0, 2, 6)];

        assert!(is_complete(&complete, &network));
        assert!(!is_complete(&partial, &network));
        assert_eq!(network.supply(0), 10);

        // Applying twice to independent copies gives the same zero state
        let mut first = network.clone();
        let mut second = network.clone();
        apply(&complete, &mut first);
        apply(&complete, &mut second);
        assert_eq!(first.depots(), second.depots());
    }

    #[test]
    fn test_triple_conversion_preserves_order() {
        let path = vec![Journey::new(3, 1, 5), Journey::new(0, 2, 7)];
        let triples = encode(&path);
        assert_eq!(triples, vec![(3, 1, 5), (0, 2, 7)]);
        assert_eq!(decode(&triples), path);
    }

    #[test]
    fn test_journey_serializes_with_short_field() {
        let json = serde_json::to_string(&Journey::new(0, 1, 10)).unwrap();
        assert_eq!(json, r#"{"from":0,"to":1,"s":10}"#);
    }

    #[test]
    fn test_outcome_tracks_best() {
        let mut outcome = SearchOutcome::new("test");
        assert!(outcome.record(&[Journey::new(0, 1, 1)], 5.0));
        assert!(!outcome.record(&[Journey::new(0, 2, 1)], 7.0));
        assert!(outcome.record(&[Journey::new(0, 2, 2)], 3.0));

        assert_eq!(outcome.evaluations, 3);
        assert_eq!(outcome.best_cost, 3.0);
        assert_eq!(outcome.best_path, vec![Journey::new(0, 2, 2)]);
        assert_eq!(outcome.best_so_far(), vec![5.0, 5.0, 3.0]);
    }

    proptest! {
        #[test]
        fn fitness_is_permutation_invariant(
            journeys in prop::collection::vec((0usize..3, 0usize..3, 1i32..20), 0..30),
            seed in any::<u64>(),
        ) {
            use rand::seq::SliceRandom;
            use rand::SeedableRng;

            let network = triangle();
            let path: Path = journeys.into_iter().map(Journey::from).collect();
            let mut shuffled = path.clone();
            shuffled.shuffle(&mut rand_chacha::ChaCha8Rng::seed_from_u64(seed));

            prop_assert!((fitness(&path, &network) - fitness(&shuffled, &network)).abs() < 1e-9);
        }
    }
}
