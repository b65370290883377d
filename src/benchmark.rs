//! Benchmarking and experimentation module for the TNRP.
//!
//! Runs every selected algorithm several times on a network, collecting
//! per-run results and convergence series, and summarises them per
//! algorithm.

use crate::error::SearchError;
use crate::heuristics::aco::{ACOConfig, AntSystem};
use crate::heuristics::annealing::{SaConfig, SimulatedAnnealing};
use crate::heuristics::genetic::{GAConfig, GeneticAlgorithm};
use crate::heuristics::random_search::{RandomSearch, RandomSearchConfig};
use crate::network::{Metric, Network};
use crate::solution::SearchOutcome;

use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution, Max, Median, Min};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;

/// Search drivers available to an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlgorithmKind {
    Aco,
    Ga,
    Sa,
    Random,
}

impl AlgorithmKind {
    pub fn all() -> Vec<AlgorithmKind> {
        vec![AlgorithmKind::Aco, AlgorithmKind::Ga, AlgorithmKind::Sa, AlgorithmKind::Random]
    }

    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmKind::Aco => "ACO",
            AlgorithmKind::Ga => "GA",
            AlgorithmKind::Sa => "SA",
            AlgorithmKind::Random => "Random",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of running a single algorithm once on a network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Network name
    pub network: String,
    /// Number of depots
    pub depots: usize,
    /// Run index
    pub run: usize,
    /// Seed used for the run
    pub seed: u64,
    /// Best cost found
    pub cost: f64,
    /// Whether the best path balances the network
    pub complete: bool,
    /// Number of journeys in the best path
    pub journeys: usize,
    /// Fitness evaluations performed
    pub evaluations: usize,
    /// Computation time in seconds
    pub time: f64,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    /// Algorithm name
    pub algorithm: String,
    /// Number of runs
    pub num_runs: usize,
    /// Number of runs whose best path is complete
    pub num_complete: usize,
    /// Average cost
    pub avg_cost: f64,
    /// Standard deviation of cost
    pub std_cost: f64,
    /// Median cost
    pub median_cost: f64,
    /// Best cost
    pub best_cost: f64,
    /// Worst cost
    pub worst_cost: f64,
    /// Average time
    pub avg_time: f64,
}

/// One point of a convergence series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceRecord {
    pub network: String,
    pub algorithm: String,
    pub run: usize,
    pub evaluation: usize,
    pub cost: f64,
    pub best_so_far: f64,
}

/// A run that was not performed
#[derive(Debug, Clone)]
pub struct SkippedRun {
    pub network: String,
    pub algorithm: AlgorithmKind,
    pub reason: SearchError,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of runs per algorithm, with seeds `base_seed..base_seed + num_runs`
    pub num_runs: usize,
    /// Evaluation budget shared by every algorithm
    pub max_evaluations: usize,
    pub max_journey_size: i32,
    /// Grid spread the networks were generated with, scales the SA schedule
    pub spread: f64,
    pub base_seed: u64,
    /// Algorithms to run
    pub algorithms: Vec<AlgorithmKind>,
    /// ACO template, budget and seed are overridden per run
    pub aco: ACOConfig,
    /// GA template, budget and seed are overridden per run
    pub ga: GAConfig,
    /// Keep the per-evaluation cost series
    pub record_convergence: bool,
    /// Show a progress bar
    pub show_progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            max_evaluations: 5000,
            max_journey_size: 20,
            spread: 2.0,
            base_seed: 0,
            algorithms: AlgorithmKind::all(),
            aco: ACOConfig::default(),
            ga: GAConfig::default(),
            record_convergence: true,
            show_progress: true,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
    convergence: Vec<ConvergenceRecord>,
    skipped: Vec<SkippedRun>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            convergence: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Run one algorithm once on its own copy of `network`
    pub fn run_algorithm(&self, kind: AlgorithmKind, network: &Network, seed: u64) -> Result<SearchOutcome, SearchError> {
        let max_evaluations = self.config.max_evaluations;
        let max_journey_size = self.config.max_journey_size;

        match kind {
            AlgorithmKind::Aco => {
                let config = ACOConfig {
                    seed,
                    max_evaluations,
                    max_journey_size,
                    ..self.config.aco.clone()
                };
                AntSystem::new(network.clone(), config).run()
            }
            AlgorithmKind::Ga => {
                let config = GAConfig {
                    seed,
                    max_evaluations,
                    max_journey_size,
                    ..self.config.ga.clone()
                };
                GeneticAlgorithm::new(network.clone(), config).run()
            }
            AlgorithmKind::Sa => {
                let config = SaConfig {
                    seed,
                    max_journey_size,
                    ..SaConfig::for_network(network, self.config.spread, max_evaluations)
                };
                SimulatedAnnealing::new(network.clone(), config).run()
            }
            AlgorithmKind::Random => {
                let config = RandomSearchConfig {
                    seed,
                    max_evaluations,
                    max_journey_size,
                };
                RandomSearch::new(network.clone(), config).run()
            }
        }
    }

    /// Run every configured algorithm `num_runs` times on a network.
    /// Runs whose preconditions fail are logged and skipped.
    pub fn run_network(&mut self, name: &str, network: &Network) {
        log::info!("Running benchmark on network: {} ({} depots)", name, network.len());

        let total = (self.config.algorithms.len() * self.config.num_runs) as u64;
        let progress = if self.config.show_progress {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template("{prefix} [{bar:40}] {pos}/{len} {msg}") {
                bar.set_style(style.progress_chars("=> "));
            }
            bar.set_prefix(name.to_string());
            bar
        } else {
            ProgressBar::hidden()
        };

        let algorithms = self.config.algorithms.clone();
        for kind in algorithms {
            for run in 0..self.config.num_runs {
                let seed = self.config.base_seed + run as u64;
                progress.set_message(format!("{} run {}", kind, run));

                match self.run_algorithm(kind, network, seed) {
                    Ok(outcome) => self.record(name, network, run, seed, &outcome),
                    Err(reason) => {
                        log::warn!("Skipping {} on {}: {}", kind, name, reason);
                        self.skipped.push(SkippedRun {
                            network: name.to_string(),
                            algorithm: kind,
                            reason,
                        });
                        progress.inc((self.config.num_runs - run) as u64);
                        break;
                    }
                }
                progress.inc(1);
            }
        }

        progress.finish_with_message("done");
    }

    /// Record a result
    fn record(&mut self, name: &str, network: &Network, run: usize, seed: u64, outcome: &SearchOutcome) {
        self.results.push(AlgorithmResult {
            algorithm: outcome.algorithm.clone(),
            network: name.to_string(),
            depots: network.len(),
            run,
            seed,
            cost: outcome.best_cost,
            complete: outcome.complete,
            journeys: outcome.best_path.len(),
            evaluations: outcome.evaluations,
            time: outcome.computation_time,
        });

        if self.config.record_convergence {
            let best = outcome.best_so_far();
            self.convergence.extend(outcome.costs.iter().zip(best).enumerate().map(|(evaluation, (&cost, best_so_far))| {
                ConvergenceRecord {
                    network: name.to_string(),
                    algorithm: outcome.algorithm.clone(),
                    run,
                    evaluation,
                    cost,
                    best_so_far,
                }
            }));
        }
    }

    /// Compute statistics for each algorithm over all recorded runs
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut by_algorithm: BTreeMap<&str, Vec<&AlgorithmResult>> = BTreeMap::new();
        for result in &self.results {
            by_algorithm.entry(result.algorithm.as_str()).or_default().push(result);
        }

        let mut statistics: Vec<AlgorithmStatistics> = by_algorithm
            .into_iter()
            .map(|(algorithm, results)| {
                let costs = Data::new(results.iter().map(|r| r.cost).collect::<Vec<f64>>());
                let times = Data::new(results.iter().map(|r| r.time).collect::<Vec<f64>>());

                let std_cost = if results.len() < 2 {
                    0.0
                } else {
                    costs.std_dev().filter(|s| s.is_finite()).unwrap_or(0.0)
                };

                AlgorithmStatistics {
                    algorithm: algorithm.to_string(),
                    num_runs: results.len(),
                    num_complete: results.iter().filter(|r| r.complete).count(),
                    avg_cost: costs.mean().unwrap_or(f64::NAN),
                    std_cost,
                    median_cost: costs.median(),
                    best_cost: costs.min(),
                    worst_cost: costs.max(),
                    avg_time: times.mean().unwrap_or(0.0),
                }
            })
            .collect();

        statistics.sort_by_key(|s| OrderedFloat(s.avg_cost));
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export the convergence series to CSV, one row per evaluation
    pub fn export_convergence_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for record in &self.convergence {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        TNRP Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!("Generated: {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
        report.push_str(&format!(
            "Runs per algorithm: {}, evaluations per run: {}, max journey size: {}\n\n",
            self.config.num_runs, self.config.max_evaluations, self.config.max_journey_size
        ));

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(90).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<10} {:>10} {:>12} {:>10} {:>12} {:>12} {:>12} {:>10}\n",
            "Algorithm", "Complete", "Avg Cost", "Std", "Median", "Best", "Worst", "Avg Time"
        ));
        report.push_str("-".repeat(90).as_str());
        report.push('\n');

        for stat in self.compute_statistics() {
            report.push_str(&format!(
                "{:<10} {:>10} {:>12.2} {:>10.2} {:>12.2} {:>12.2} {:>12.2} {:>10.4}\n",
                stat.algorithm,
                format!("{}/{}", stat.num_complete, stat.num_runs),
                stat.avg_cost,
                stat.std_cost,
                stat.median_cost,
                stat.best_cost,
                stat.worst_cost,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(90).as_str());
        report.push('\n');

        report.push_str("\nBest Solutions per Network:\n");
        let mut network_best: BTreeMap<&str, &AlgorithmResult> = BTreeMap::new();
        for result in self.results.iter().filter(|r| r.complete) {
            let entry = network_best.entry(result.network.as_str()).or_insert(result);
            if result.cost < entry.cost {
                *entry = result;
            }
        }
        for (network, best) in &network_best {
            report.push_str(&format!("  {}: {:.2} ({}, seed {})\n", network, best.cost, best.algorithm, best.seed));
        }

        if !self.skipped.is_empty() {
            report.push_str("\nSkipped:\n");
            for skipped in &self.skipped {
                report.push_str(&format!("  {} on {}: {}\n", skipped.algorithm, skipped.network, skipped.reason));
            }
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    pub fn convergence(&self) -> &[ConvergenceRecord] {
        &self.convergence
    }

    pub fn skipped(&self) -> &[SkippedRun] {
        &self.skipped
    }
}

/// Load every `.txt` model file of a directory, sorted by depot count.
/// Files that fail to parse are logged and ignored.
pub fn load_networks_from_dir<P: AsRef<Path>>(dir: P, metric: Metric) -> Vec<(String, Network)> {
    let mut networks = Vec::new();

    match std::fs::read_dir(dir.as_ref()) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "txt").unwrap_or(false) {
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string());
                    match Network::from_file(&path, metric) {
                        Ok(network) => networks.push((name, network)),
                        Err(e) => log::error!("Failed to load {:?}: {}", path, e),
                    }
                }
            }
        }
        Err(e) => log::error!("Cannot read directory {:?}: {}", dir.as_ref(), e),
    }

    networks.sort_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| a.0.cmp(&b.0)));
    networks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{generate, GeneratorConfig, Location};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn quick_config() -> BenchmarkConfig {
        BenchmarkConfig {
            num_runs: 3,
            max_evaluations: 60,
            ga: GAConfig {
                population_size: 10,
                ..Default::default()
            },
            show_progress: false,
            ..Default::default()
        }
    }

    fn test_network() -> Network {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        loop {
            let network = generate(&GeneratorConfig { depots: 8, ..Default::default() }, &mut rng).unwrap();
            if network.surplus_ids().len() >= 2 && network.deficit_ids().len() >= 2 {
                return network;
            }
        }
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 5);
        assert_eq!(config.algorithms.len(), 4);
    }

    #[test]
    fn test_run_network_collects_results() {
        let mut benchmark = Benchmark::new(quick_config());
        benchmark.run_network("net-8", &test_network());

        assert_eq!(benchmark.results().len(), 12);
        assert!(benchmark.skipped().is_empty());
        assert!(benchmark.results().iter().all(|r| r.complete && r.evaluations == 60));
        assert_eq!(benchmark.convergence().len(), 12 * 60);

        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 4);
        for stat in &stats {
            assert_eq!(stat.num_runs, 3);
            assert!(stat.best_cost <= stat.median_cost && stat.median_cost <= stat.worst_cost);
            assert!(stat.std_cost >= 0.0);
        }
        assert!(stats.windows(2).all(|w| w[0].avg_cost <= w[1].avg_cost));
    }

    #[test]
    fn test_sa_is_skipped_on_single_source() {
        let network = Network::new(
            vec![
                (Location::new(0.0, 0.0), 10),
                (Location::new(1.0, 0.0), -4),
                (Location::new(2.0, 0.0), -6),
            ],
            Metric::Euclidean,
        )
        .unwrap();
        let mut benchmark = Benchmark::new(quick_config());
        benchmark.run_network("tiny", &network);

        assert_eq!(benchmark.skipped().len(), 1);
        assert_eq!(benchmark.skipped()[0].algorithm, AlgorithmKind::Sa);
        assert_eq!(benchmark.results().len(), 9);
        assert!(benchmark.generate_report().contains("Skipped:"));
    }

    #[test]
    fn test_csv_export_and_report() {
        let mut benchmark = Benchmark::new(BenchmarkConfig {
            algorithms: vec![AlgorithmKind::Random],
            ..quick_config()
        });
        benchmark.run_network("net-8", &test_network());

        let dir = std::env::temp_dir().join(format!("tnrp-bench-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        benchmark.export_to_csv(dir.join("results.csv")).unwrap();
        benchmark.export_statistics_csv(dir.join("statistics.csv")).unwrap();
        benchmark.export_convergence_csv(dir.join("convergence.csv")).unwrap();

        let results = std::fs::read_to_string(dir.join("results.csv")).unwrap();
        assert!(results.starts_with("algorithm,network,depots,run,seed,cost"));
        assert_eq!(results.lines().count(), 4);

        let convergence = std::fs::read_to_string(dir.join("convergence.csv")).unwrap();
        assert_eq!(convergence.lines().count(), 1 + 3 * 60);

        let report = benchmark.generate_report();
        assert!(report.contains("TNRP Benchmark Report"));
        assert!(report.contains("net-8"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_networks_from_dir() {
        let dir = std::env::temp_dir().join(format!("tnrp-load-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let network = test_network();
        network.to_file(dir.join("model_a.txt")).unwrap();
        std::fs::write(dir.join("broken.txt"), "not a model").unwrap();
        std::fs::write(dir.join("ignored.csv"), "x").unwrap();

        let loaded = load_networks_from_dir(&dir, Metric::Euclidean);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "model_a");
        assert_eq!(loaded[0].1.depots(), network.depots());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
