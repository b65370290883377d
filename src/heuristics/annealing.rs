//! Simulated annealing over the destination-swap neighbourhood.

use crate::error::SearchError;
use crate::heuristics::construction::{ConstructionHeuristic, RandomConstruction};
use crate::heuristics::neighbourhood::{compress, generate_neighbour};
use crate::network::Network;
use crate::solution::{fitness, is_complete, SearchOutcome};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Temperature reached after the last iteration by default
pub const DEFAULT_END_TEMPERATURE: f64 = 0.001;

/// SA configuration parameters
#[derive(Debug, Clone)]
pub struct SaConfig {
    /// Initial temperature
    pub start_temperature: f64,
    /// Multiplicative cooling applied after every iteration
    pub cooling_rate: f64,
    /// Number of iterations, the initial solution included (n)
    pub max_evaluations: usize,
    pub max_journey_size: i32,
    /// Random seed
    pub seed: u64,
}

impl Default for SaConfig {
    fn default() -> Self {
        let start_temperature = 100.0;
        let max_evaluations = 5000;
        SaConfig {
            start_temperature,
            cooling_rate: cooling_rate(start_temperature, DEFAULT_END_TEMPERATURE, max_evaluations),
            max_evaluations,
            max_journey_size: 20,
            seed: 42,
        }
    }
}

impl SaConfig {
    /// Schedule scaled to a network generated with `spread`: the start
    /// temperature is `spread * n / 3` and the temperature reaches
    /// [`DEFAULT_END_TEMPERATURE`] on the last iteration.
    pub fn for_network(network: &Network, spread: f64, max_evaluations: usize) -> Self {
        let start_temperature = spread * network.len() as f64 / 3.0;
        SaConfig {
            start_temperature,
            cooling_rate: cooling_rate(start_temperature, DEFAULT_END_TEMPERATURE, max_evaluations),
            max_evaluations,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.start_temperature <= 0.0 {
            return Err(SearchError::InvalidConfig("start_temperature must be positive".to_string()));
        }
        if self.cooling_rate <= 0.0 || self.cooling_rate > 1.0 {
            return Err(SearchError::InvalidConfig("cooling_rate must lie in (0, 1]".to_string()));
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

/// Geometric cooling rate taking `start` to `end` over `evaluations`
/// iterations: `(end / start)^(1 / (evaluations - 1))`.
pub fn cooling_rate(start: f64, end: f64, evaluations: usize) -> f64 {
    if evaluations < 2 || start <= 0.0 {
        return 1.0;
    }
    (end / start).powf(1.0 / (evaluations - 1) as f64)
}

/// Metropolis acceptance: always accept a move that is not worse,
/// otherwise accept with probability `exp(-delta / temperature)`.
pub fn accept<R: Rng + ?Sized>(delta: f64, temperature: f64, rng: &mut R) -> bool {
    if delta <= 0.0 {
        return true;
    }
    if temperature <= 0.0 {
        return false;
    }
    rng.gen::<f64>() < (-delta / temperature).exp()
}

/// Simulated annealing solver
pub struct SimulatedAnnealing {
    config: SaConfig,
    network: Network,
    rng: ChaCha8Rng,
}

impl SimulatedAnnealing {
    pub fn new(network: Network, config: SaConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        SimulatedAnnealing { config, network, rng }
    }

    /// Run SA. The cost series holds the cost of the current solution after
    /// every iteration.
    pub fn run(&mut self) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;
        self.network.check_searchable()?;

        let surplus = self.network.surplus_ids().len();
        let deficit = self.network.deficit_ids().len();
        if surplus < 2 || deficit < 2 {
            return Err(SearchError::InsufficientDepots { surplus, deficit });
        }

        let start = std::time::Instant::now();
        let mut outcome = SearchOutcome::new("SA");
        let max_journey_size = self.config.max_journey_size;

        let mut current = RandomConstruction::new(max_journey_size).construct(&self.network, &mut self.rng);
        let mut current_cost = fitness(&current, &self.network);
        outcome.record(&current, current_cost);

        let mut temperature = self.config.start_temperature;
        let mut accepted = 0usize;

        log::info!(
            "[SA] {} depots, T0 = {:.3}, cooling {:.6}, initial cost {:.2}",
            self.network.len(),
            temperature,
            self.config.cooling_rate,
            current_cost
        );

        for iteration in 1..self.config.max_evaluations {
            if let Some(neighbour) = generate_neighbour(&current, &mut self.rng) {
                let neighbour = compress(&neighbour, max_journey_size);
                let cost = fitness(&neighbour, &self.network);

                if accept(cost - current_cost, temperature, &mut self.rng) {
                    current = neighbour;
                    current_cost = cost;
                    accepted += 1;
                }
            }

            if outcome.record(&current, current_cost) {
                log::debug!("[SA] iteration {}: new best {:.2} (T = {:.4})", iteration, current_cost, temperature);
            }

            temperature *= self.config.cooling_rate;
        }

        outcome.complete = is_complete(&outcome.best_path, &self.network);
        outcome.computation_time = start.elapsed().as_secs_f64();
        log::info!(
            "[SA] finished: best {:.2}, {} of {} moves accepted",
            outcome.best_cost,
            accepted,
            self.config.max_evaluations.saturating_sub(1)
        );

        Ok(outcome)
    }
}
