//! Ant System optimisation for the TNRP.
//!
//! Each ant builds a complete path by repeatedly picking a random open
//! surplus depot and sampling its deficit target with probability
//! proportional to `pheromone^alpha * heuristic^beta`. After each population
//! the pheromone matrix is evaporated and every ant deposits `Q / cost` on
//! the edges it used.

use crate::error::SearchError;
use crate::heuristics::construction::{perform_journey, ConstructionHeuristic};
use crate::network::{DistanceMatrix, Network};
use crate::solution::{fitness, is_complete, Path, SearchOutcome};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Heuristic value used for an edge of zero length between distinct depots
const ZERO_DISTANCE_HEURISTIC: f64 = 1e6;

/// ACO configuration parameters
#[derive(Debug, Clone)]
pub struct ACOConfig {
    /// Number of ants per population (m)
    pub num_ants: usize,
    /// Fitness evaluation budget (n)
    pub max_evaluations: usize,
    /// Pheromone importance (alpha)
    pub alpha: f64,
    /// Heuristic importance (beta)
    pub beta: f64,
    /// Evaporation rate (e)
    pub evaporation_rate: f64,
    /// Pheromone deposit constant (Q)
    pub q: f64,
    /// Lower bound (exclusive) of the initial pheromone
    pub p_min: f64,
    /// Upper bound (inclusive) of the initial pheromone
    pub p_max: f64,
    /// Maximum quantity moved by one journey
    pub max_journey_size: i32,
    /// Random seed
    pub seed: u64,
}

impl Default for ACOConfig {
    fn default() -> Self {
        ACOConfig {
            num_ants: 1,
            max_evaluations: 5000,
            alpha: 1.0,
            beta: 3.0,
            evaporation_rate: 0.2,
            q: 100.0,
            p_min: 1.0,
            p_max: 1.0,
            max_journey_size: 20,
            seed: 42,
        }
    }
}

impl ACOConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.num_ants == 0 {
            return Err(SearchError::InvalidConfig("num_ants must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.evaporation_rate) {
            return Err(SearchError::InvalidConfig("evaporation_rate must lie in [0, 1]".to_string()));
        }
        if self.p_min < 0.0 || self.p_max <= 0.0 || self.p_min > self.p_max {
            return Err(SearchError::InvalidConfig("pheromone bounds need 0 <= p_min <= p_max, p_max > 0".to_string()));
        }
        if self.max_evaluations == 0 {
            return Err(SearchError::InvalidConfig("max_evaluations must be at least 1".to_string()));
        }
        if self.max_journey_size < 1 {
            return Err(SearchError::InvalidConfig("max_journey_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Distance matrix of a network (a copy of its distance table)
pub fn create_distance_matrix(network: &Network) -> DistanceMatrix {
    network.distance_matrix().clone()
}

/// Inverse-distance heuristic, zero on the diagonal
pub fn create_heuristic_matrix(distances: &DistanceMatrix) -> Vec<Vec<f64>> {
    let n = distances.len();
    let mut heuristic = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let dist = distances[i][j];
                heuristic[i][j] = if dist > 0.0 { 1.0 / dist } else { ZERO_DISTANCE_HEURISTIC };
            }
        }
    }
    heuristic
}

/// Initial pheromone matrix.
///
/// Rows of deficit depots are entirely zero (they never start a journey),
/// the diagonal is zero, every other entry is drawn from `(p_min, p_max]`.
pub fn create_pheromone_matrix<R: Rng + ?Sized>(network: &Network, p_min: f64, p_max: f64, rng: &mut R) -> Vec<Vec<f64>> {
    let n = network.len();
    let mut pheromone = vec![vec![0.0; n]; n];
    for (i, row) in pheromone.iter_mut().enumerate() {
        if network.depot(i).is_deficit() {
            continue;
        }
        for (j, value) in row.iter_mut().enumerate() {
            if i != j {
                *value = if p_max > p_min { p_max - rng.gen_range(0.0..(p_max - p_min)) } else { p_max };
            }
        }
    }
    pheromone
}

/// Evaporate every entry by `(1 - e)` then deposit `Q / cost` on each edge
/// of each path. Journeys sharing an edge deposit once each.
pub fn update_pheromone(pheromone: &mut [Vec<f64>], paths: &[Path], costs: &[f64], evaporation_rate: f64, q: f64) {
    for row in pheromone.iter_mut() {
        for value in row.iter_mut() {
            *value *= 1.0 - evaporation_rate;
        }
    }

    for (path, &cost) in paths.iter().zip(costs) {
        let delta = q / cost;
        for journey in path {
            pheromone[journey.from][journey.to] += delta;
        }
    }
}

/// Pheromone and heuristic guided construction
pub struct PheromoneConstruction<'a> {
    pub pheromone: &'a [Vec<f64>],
    pub heuristic: &'a [Vec<f64>],
    pub alpha: f64,
    pub beta: f64,
    pub max_journey_size: i32,
}

impl PheromoneConstruction<'_> {
    /// Sample an index with probability proportional to `weights`. The
    /// first index whose running total is strictly above the draw wins.
    fn roulette(weights: &[f64], total: f64, rng: &mut dyn RngCore) -> usize {
        let pick = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for (idx, &w) in weights.iter().enumerate() {
            cumulative += w;
            if cumulative > pick {
                return idx;
            }
        }
        // Floating point shortfall: fall back to the last positive weight
        weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1)
    }
}

impl ConstructionHeuristic for PheromoneConstruction<'_> {
    fn construct(&self, network: &Network, rng: &mut dyn RngCore) -> Path {
        let mut probe = network.clone();
        let mut surplus = probe.surplus_ids();
        let mut deficit = probe.deficit_ids();
        let mut path: Path = Vec::new();
        let mut weights = Vec::with_capacity(deficit.len());

        while !surplus.is_empty() && !deficit.is_empty() {
            let current = surplus[rng.gen_range(0..surplus.len())];

            weights.clear();
            weights.extend(deficit.iter().map(|&j| {
                self.pheromone[current][j].powf(self.alpha) * self.heuristic[current][j].powf(self.beta)
            }));
            let total: f64 = weights.iter().sum();

            let target = if total > 0.0 {
                deficit[Self::roulette(&weights, total, rng)]
            } else {
                // Over-evaporated pheromone: pick any open deficit depot
                deficit[rng.gen_range(0..deficit.len())]
            };

            let (journey, balanced) = perform_journey(&mut probe, current, target, self.max_journey_size);
            path.push(journey);

            if !balanced.is_empty() {
                surplus.retain(|id| !balanced.contains(id));
                deficit.retain(|id| !balanced.contains(id));
            }
        }

        path
    }

    fn name(&self) -> &str {
        "Pheromone"
    }
}

/// Ant System solver
pub struct AntSystem {
    config: ACOConfig,
    network: Network,
    distance: DistanceMatrix,
    heuristic: Vec<Vec<f64>>,
    pheromone: Vec<Vec<f64>>,
    rng: ChaCha8Rng,
}

impl AntSystem {
    pub fn new(network: Network, config: ACOConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let distance = create_distance_matrix(&network);
        let heuristic = create_heuristic_matrix(&distance);
        let pheromone = create_pheromone_matrix(&network, config.p_min, config.p_max, &mut rng);

        AntSystem {
            config,
            network,
            distance,
            heuristic,
            pheromone,
            rng,
        }
    }

    pub fn distance_matrix(&self) -> &DistanceMatrix {
        &self.distance
    }

    pub fn pheromone(&self) -> &[Vec<f64>] {
        &self.pheromone
    }

    /// Run AS until the evaluation budget is spent
    pub fn run(&mut self) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;
        self.network.check_searchable()?;

        let start = std::time::Instant::now();
        let mut outcome = SearchOutcome::new("ACO");
        let mut generation = 0usize;

        log::info!(
            "[ACO] {} depots, {} ants, budget {} evaluations",
            self.network.len(),
            self.config.num_ants,
            self.config.max_evaluations
        );

        while outcome.evaluations < self.config.max_evaluations {
            let mut paths: Vec<Path> = Vec::with_capacity(self.config.num_ants);
            let mut costs: Vec<f64> = Vec::with_capacity(self.config.num_ants);

            for _ in 0..self.config.num_ants {
                if outcome.evaluations == self.config.max_evaluations {
                    break;
                }

                let constructor = PheromoneConstruction {
                    pheromone: &self.pheromone,
                    heuristic: &self.heuristic,
                    alpha: self.config.alpha,
                    beta: self.config.beta,
                    max_journey_size: self.config.max_journey_size,
                };
                let path = constructor.construct(&self.network, &mut self.rng);
                let cost = fitness(&path, &self.network);

                if outcome.record(&path, cost) {
                    log::debug!("[ACO] evaluation {}: new best {:.2}", outcome.evaluations, cost);
                }

                paths.push(path);
                costs.push(cost);
            }

            update_pheromone(&mut self.pheromone, &paths, &costs, self.config.evaporation_rate, self.config.q);
            generation += 1;
        }

        outcome.complete = is_complete(&outcome.best_path, &self.network);
        outcome.computation_time = start.elapsed().as_secs_f64();
        log::info!("[ACO] finished after {} populations, best {:.2}", generation, outcome.best_cost);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{generate, GeneratorConfig, Location, Metric};
    use crate::solution::Journey;

    fn create_test_network() -> Network {
        Network::new(
            vec![
                (Location::new(0.0, 0.0), 10),
                (Location::new(3.0, 4.0), -4),
                (Location::new(12.0, 5.0), -6),
            ],
            Metric::Euclidean,
        )
        .unwrap()
    }

    #[test]
    fn test_distance_matrix_creation() {
        let network = create_test_network();
        let d = create_distance_matrix(&network);
        let expected = [[0.0, 5.0, 13.0], [5.0, 0.0, 9.055], [13.0, 9.055, 0.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert!((d[i][j] - expected[i][j]).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_heuristic_matrix_creation() {
        let d = vec![vec![0.0, 4.0, 2.0], vec![4.0, 0.0, 4.0], vec![2.0, 4.0, 0.0]];
        let h = create_heuristic_matrix(&d);
        assert_eq!(h, vec![vec![0.0, 0.25, 0.5], vec![0.25, 0.0, 0.25], vec![0.5, 0.25, 0.0]]);
    }

    #[test]
    fn test_heuristic_matrix_zero_distance() {
        let d = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let h = create_heuristic_matrix(&d);
        assert_eq!(h[0][0], 0.0);
        assert_eq!(h[0][1], ZERO_DISTANCE_HEURISTIC);
    }

    #[test]
    fn test_pheromone_matrix_creation() {
        let network = create_test_network();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let p = create_pheromone_matrix(&network, 0.0, 1.0, &mut rng);

        assert_eq!(p.len(), 3);
        for i in 0..3 {
            assert_eq!(p[i].len(), 3);
            if network.depot(i).is_deficit() {
                assert!(p[i].iter().all(|&v| v == 0.0));
                continue;
            }
            for j in 0..3 {
                if i == j {
                    assert_eq!(p[i][j], 0.0);
                } else {
                    assert!(p[i][j] > 0.0 && p[i][j] <= 1.0);
                }
            }
        }

        let fixed = create_pheromone_matrix(&network, 1.0, 1.0, &mut rng);
        assert_eq!(fixed[0], vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_update_pheromone() {
        let mut p = vec![vec![0.0, 1.0, 1.0], vec![0.0; 3], vec![0.0; 3]];
        let paths = vec![vec![Journey::new(0, 1, 4), Journey::new(0, 2, 6), Journey::new(0, 2, 1)]];

        update_pheromone(&mut p, &paths, &[10.0], 0.5, 100.0);

        assert!((p[0][1] - 10.5).abs() < 1e-10);
        assert!((p[0][2] - 20.5).abs() < 1e-10);
        assert_eq!(p[1], vec![0.0; 3]);
    }

    #[test]
    fn test_roulette_boundary_belongs_to_next_bucket() {
        struct Fixed(u64);
        impl RngCore for Fixed {
            fn next_u32(&mut self) -> u32 {
                self.0 as u32
            }
            fn next_u64(&mut self) -> u64 {
                self.0
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.fill(0)
            }
            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
                dest.fill(0);
                Ok(())
            }
        }

        // A zero draw lands exactly on the cumulative boundary of an empty bucket
        let mut rng = Fixed(0);
        assert_eq!(PheromoneConstruction::roulette(&[0.0, 2.0, 1.0], 3.0, &mut rng), 1);
    }

    #[test]
    fn test_pheromone_construction_follows_pheromone() {
        let network = create_test_network();
        let d = create_distance_matrix(&network);
        let h = create_heuristic_matrix(&d);
        let p = vec![vec![0.0, 1.0, 0.0], vec![0.0; 3], vec![0.0; 3]];
        let constructor = PheromoneConstruction {
            pheromone: &p,
            heuristic: &h,
            alpha: 1.0,
            beta: 6.0,
            max_journey_size: 1,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let path = constructor.construct(&network, &mut rng);
        assert!(is_complete(&path, &network));
        // Depot 2 carries no pheromone, so it is only served once depot 1 is full
        assert_eq!(path.len(), 10);
        assert!(path.iter().take(4).all(|j| j.to == 1));
        assert!(path.iter().skip(4).all(|j| j.to == 2));
    }

    #[test]
    fn test_pheromone_construction_falls_back_when_evaporated() {
        let network = create_test_network();
        let h = create_heuristic_matrix(&create_distance_matrix(&network));
        let p = vec![vec![0.0; 3]; 3];
        let constructor = PheromoneConstruction {
            pheromone: &p,
            heuristic: &h,
            alpha: 1.0,
            beta: 1.0,
            max_journey_size: 3,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let path = constructor.construct(&network, &mut rng);
        assert!(is_complete(&path, &network));
    }

    #[test]
    fn test_aco() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let network = generate(&GeneratorConfig { depots: 10, ..Default::default() }, &mut rng).unwrap();
        let config = ACOConfig {
            num_ants: 5,
            max_evaluations: 103,
            ..Default::default()
        };

        let mut aco = AntSystem::new(network, config);
        let outcome = aco.run().unwrap();

        assert_eq!(outcome.costs.len(), 103);
        assert_eq!(outcome.evaluations, 103);
        assert!(outcome.complete);
        let min = outcome.costs.iter().cloned().fold(f64::INFINITY, f64::min);
        assert_eq!(outcome.best_cost, min);
        // Deficit rows never receive pheromone
        for depot in aco.network.depots().iter().filter(|d| d.is_deficit()) {
            assert!(aco.pheromone()[depot.id].iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_aco_rejects_resolved_network() {
        let network = Network::new(
            vec![(Location::new(0.0, 0.0), 0), (Location::new(1.0, 0.0), 0)],
            Metric::Euclidean,
        )
        .unwrap();
        let mut aco = AntSystem::new(network, ACOConfig::default());
        assert_eq!(aco.run().unwrap_err(), SearchError::NothingToResolve);
    }
}
