//! Pure random search baseline: independent random constructions, keeping
//! the best one.

use crate::error::SearchError;
use crate::heuristics::construction::{ConstructionHeuristic, RandomConstruction};
use crate::network::Network;
use crate::solution::{fitness, is_complete, SearchOutcome};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct RandomSearchConfig {
    /// Number of random paths built and scored (n)
    pub max_evaluations: usize,
    pub max_journey_size: i32,
    /// Random seed
    pub seed: u64,
}

impl Default for RandomSearchConfig {
    fn default() -> Self {
        RandomSearchConfig {
            max_evaluations: 5000,
            max_journey_size: 20,
            seed: 42,
        }
    }
}

impl RandomSearchConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_evaluations == 0 {
            return Err(SearchError::InvalidConfig("max_evaluations must be at least 1".to_string()));
        }
        if self.max_journey_size < 1 {
            return Err(SearchError::InvalidConfig("max_journey_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

pub struct RandomSearch {
    config: RandomSearchConfig,
    network: Network,
    rng: ChaCha8Rng,
}

impl RandomSearch {
    pub fn new(network: Network, config: RandomSearchConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        RandomSearch { config, network, rng }
    }

    pub fn run(&mut self) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;
        self.network.check_searchable()?;

        let start = std::time::Instant::now();
        let construction = RandomConstruction::new(self.config.max_journey_size);
        let mut outcome = SearchOutcome::new("Random");

        for _ in 0..self.config.max_evaluations {
            let path = construction.construct(&self.network, &mut self.rng);
            let cost = fitness(&path, &self.network);
            outcome.record(&path, cost);
        }

        outcome.complete = is_complete(&outcome.best_path, &self.network);
        outcome.computation_time = start.elapsed().as_secs_f64();
        log::info!("[Random] best {:.2} after {} evaluations", outcome.best_cost, outcome.evaluations);

        Ok(outcome)
    }
}
