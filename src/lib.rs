//! TNRP Solver Library
//!
//! Solvers for the Transportation Network Redistribution Problem (TNRP):
//! a network of depots holds signed supplies summing to zero, and the goal
//! is a set of capacity-bounded journeys from surplus to deficit depots that
//! balances every depot at minimum total distance.
//!
//! # Features
//!
//! - Random and pheromone-guided path construction
//! - Ant System, Genetic Algorithm (with feasibility repair), Simulated
//!   Annealing and a random-search baseline
//! - Random network generation and a line-based model format
//! - Benchmarking with statistics and CSV export
//!
//! # Example
//!
//! ```no_run
//! use tnrp_solver::network::{Metric, Network};
//! use tnrp_solver::heuristics::genetic::{GAConfig, GeneticAlgorithm};
//!
//! // Load network
//! let network = Network::from_file("model.txt", Metric::Euclidean).unwrap();
//!
//! // Run the GA with default parameters
//! let mut ga = GeneticAlgorithm::new(network, GAConfig::default());
//! let outcome = ga.run().unwrap();
//!
//! println!("Best cost: {:.2}", outcome.best_cost);
//! ```

pub mod error;
pub mod network;
pub mod solution;
pub mod heuristics;
pub mod benchmark;

pub use error::{NetworkError, SearchError};
pub use network::{Depot, DepotId, Location, Metric, Network};
pub use solution::{Journey, Path, SearchOutcome};
