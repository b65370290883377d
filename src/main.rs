//! TNRP Solver - Command Line Interface
//!
//! Generate, inspect and solve Transportation Network Redistribution
//! Problem instances.

use clap::{Parser, Subcommand, ValueEnum};
use tnrp_solver::benchmark::{load_networks_from_dir, AlgorithmKind, Benchmark, BenchmarkConfig};
use tnrp_solver::heuristics::aco::ACOConfig;
use tnrp_solver::heuristics::annealing::{cooling_rate, SaConfig, DEFAULT_END_TEMPERATURE};
use tnrp_solver::heuristics::genetic::{CrossoverType, GAConfig};
use tnrp_solver::heuristics::random_search::RandomSearchConfig;
use tnrp_solver::heuristics::{AntSystem, GeneticAlgorithm, RandomSearch, SimulatedAnnealing};
use tnrp_solver::network::{generate, GeneratorConfig, Metric, Network};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tnrp")]
#[command(version = "1.0")]
#[command(about = "Metaheuristic solvers for the Transportation Network Redistribution Problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a random network and write it in the model format
    Generate {
        /// Number of depots
        #[arg(short, long, default_value = "10")]
        depots: usize,

        /// Grid scale: depots are placed on a (spread * depots)^2 grid
        #[arg(long, default_value = "2")]
        spread: usize,

        /// Lowest supply a depot may hold
        #[arg(long, default_value = "-100", allow_hyphen_values = true)]
        max_deficit: i32,

        /// Highest supply a depot may hold
        #[arg(long, default_value = "100")]
        max_surplus: i32,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output model file (printed to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Solve a network with one algorithm
    Solve {
        /// Path to the model file
        #[arg(short, long)]
        model: PathBuf,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "ga")]
        algorithm: Algorithm,

        /// Distance metric
        #[arg(long, value_enum, default_value = "euclidean")]
        metric: MetricArg,

        /// Fitness evaluation budget
        #[arg(short = 'n', long, default_value = "5000")]
        evaluations: usize,

        /// Maximum quantity moved by one journey
        #[arg(long, default_value = "20")]
        max_journey_size: i32,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Number of ants per population (ACO)
        #[arg(long, default_value = "1")]
        ants: usize,

        /// Pheromone importance (ACO)
        #[arg(long, default_value = "1.0")]
        alpha: f64,

        /// Heuristic importance (ACO)
        #[arg(long, default_value = "3.0")]
        beta: f64,

        /// Evaporation rate (ACO)
        #[arg(long, default_value = "0.2")]
        evaporation: f64,

        /// Pheromone deposit constant (ACO)
        #[arg(long, default_value = "100.0")]
        q: f64,

        /// Lower bound of the initial pheromone (ACO)
        #[arg(long, default_value = "1.0")]
        p_min: f64,

        /// Upper bound of the initial pheromone (ACO)
        #[arg(long, default_value = "1.0")]
        p_max: f64,

        /// Population size (GA)
        #[arg(long, default_value = "50")]
        population: usize,

        /// Tournament size (GA)
        #[arg(long, default_value = "10")]
        tournament: usize,

        /// Mutation rate (GA)
        #[arg(long, default_value = "0.5")]
        mutation_rate: f64,

        /// Crossover rate (GA)
        #[arg(long, default_value = "0.6")]
        crossover_rate: f64,

        /// Crossover operator (GA)
        #[arg(long, value_enum, default_value = "context-aware")]
        crossover: CrossoverArg,

        /// Disable repair of children (GA)
        #[arg(long)]
        no_repair: bool,

        /// Start temperature (SA), derived from the network if omitted
        #[arg(long)]
        start_temperature: Option<f64>,

        /// Final temperature (SA)
        #[arg(long, default_value_t = DEFAULT_END_TEMPERATURE)]
        end_temperature: f64,

        /// Grid spread of the network, scales the default SA start temperature
        #[arg(long, default_value = "2.0")]
        spread: f64,

        /// Write the outcome as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze a network
    Analyze {
        /// Path to the model file
        #[arg(short, long)]
        model: PathBuf,

        /// Distance metric
        #[arg(long, value_enum, default_value = "euclidean")]
        metric: MetricArg,
    },

    /// Compare algorithms over several seeded runs
    Compare {
        /// Path to a model file
        #[arg(short, long, conflicts_with = "dir")]
        model: Option<PathBuf>,

        /// Directory of model files (*.txt)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Distance metric
        #[arg(long, value_enum, default_value = "euclidean")]
        metric: MetricArg,

        /// Number of runs per algorithm
        #[arg(short, long, default_value = "10")]
        runs: usize,

        /// Fitness evaluation budget per run
        #[arg(short = 'n', long, default_value = "5000")]
        evaluations: usize,

        /// Maximum quantity moved by one journey
        #[arg(long, default_value = "20")]
        max_journey_size: i32,

        /// Grid spread of the networks, scales the SA schedule
        #[arg(long, default_value = "2.0")]
        spread: f64,

        /// Output directory for CSV files and the report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Ant System
    Aco,
    /// Genetic Algorithm
    Ga,
    /// Simulated Annealing
    Sa,
    /// Random search baseline
    Random,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum MetricArg {
    Euclidean,
    Manhattan,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Euclidean => Metric::Euclidean,
            MetricArg::Manhattan => Metric::Manhattan,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum CrossoverArg {
    /// Gene-by-gene crossover truncated against the network state
    ContextAware,
    /// Per-destination uniform crossover followed by repair
    Uniform,
}

impl From<CrossoverArg> for CrossoverType {
    fn from(arg: CrossoverArg) -> Self {
        match arg {
            CrossoverArg::ContextAware => CrossoverType::ContextAware,
            CrossoverArg::Uniform => CrossoverType::Uniform,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { depots, spread, max_deficit, max_surplus, seed, output } => {
            let config = GeneratorConfig {
                depots,
                spread,
                max_deficit,
                max_surplus,
                metric: Metric::Euclidean,
            };
            generate_network(&config, seed, output);
        }

        Commands::Solve {
            model,
            algorithm,
            metric,
            evaluations,
            max_journey_size,
            seed,
            ants,
            alpha,
            beta,
            evaporation,
            q,
            p_min,
            p_max,
            population,
            tournament,
            mutation_rate,
            crossover_rate,
            crossover,
            no_repair,
            start_temperature,
            end_temperature,
            spread,
            output,
            verbose,
        } => {
            let network = load_network(&model, metric.into());

            let outcome = match algorithm {
                Algorithm::Aco => {
                    let config = ACOConfig {
                        num_ants: ants,
                        max_evaluations: evaluations,
                        alpha,
                        beta,
                        evaporation_rate: evaporation,
                        q,
                        p_min,
                        p_max,
                        max_journey_size,
                        seed,
                    };
                    AntSystem::new(network, config).run()
                }

                Algorithm::Ga => {
                    let config = GAConfig {
                        population_size: population,
                        max_evaluations: evaluations,
                        tournament_size: tournament,
                        crossover_rate,
                        mutation_rate,
                        crossover_type: crossover.into(),
                        repair: !no_repair,
                        max_journey_size,
                        seed,
                    };
                    GeneticAlgorithm::new(network, config).run()
                }

                Algorithm::Sa => {
                    let defaults = SaConfig::for_network(&network, spread, evaluations);
                    let start = start_temperature.unwrap_or(defaults.start_temperature);
                    let config = SaConfig {
                        start_temperature: start,
                        cooling_rate: cooling_rate(start, end_temperature, evaluations),
                        max_evaluations: evaluations,
                        max_journey_size,
                        seed,
                    };
                    SimulatedAnnealing::new(network, config).run()
                }

                Algorithm::Random => {
                    let config = RandomSearchConfig {
                        max_evaluations: evaluations,
                        max_journey_size,
                        seed,
                    };
                    RandomSearch::new(network, config).run()
                }
            };

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("Cannot run {:?} on {:?}: {}", algorithm, model, e);
                    std::process::exit(1);
                }
            };

            println!("\n========== Results ==========");
            if verbose {
                print!("{}", outcome);
            } else {
                println!("Algorithm: {}", outcome.algorithm);
                println!("Cost: {:.2}", outcome.best_cost);
                println!("Complete: {}", outcome.complete);
                println!("Journeys: {}", outcome.best_path.len());
                println!("Evaluations: {}", outcome.evaluations);
                println!("Time: {:.4}s", outcome.computation_time);
            }

            if let Some(out_path) = output {
                let written = serde_json::to_string_pretty(&outcome)
                    .map_err(|e| e.to_string())
                    .and_then(|json| std::fs::write(&out_path, json).map_err(|e| e.to_string()));
                match written {
                    Ok(()) => println!("\nOutcome saved to {:?}", out_path),
                    Err(e) => {
                        eprintln!("Failed to write {:?}: {}", out_path, e);
                        std::process::exit(1);
                    }
                }
            }
        }

        Commands::Analyze { model, metric } => {
            analyze_network(&model, metric.into());
        }

        Commands::Compare { model, dir, metric, runs, evaluations, max_journey_size, spread, output } => {
            let networks = match (model, dir) {
                (Some(path), _) => {
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_else(|| "network".to_string());
                    vec![(name, load_network(&path, metric.into()))]
                }
                (None, Some(dir)) => load_networks_from_dir(&dir, metric.into()),
                (None, None) => {
                    eprintln!("Either --model or --dir is required");
                    std::process::exit(1);
                }
            };

            let config = BenchmarkConfig {
                num_runs: runs,
                max_evaluations: evaluations,
                max_journey_size,
                spread,
                algorithms: AlgorithmKind::all(),
                ..Default::default()
            };
            compare_algorithms(&networks, config, output);
        }
    }
}

fn load_network(path: &PathBuf, metric: Metric) -> Network {
    match Network::from_file(path, metric) {
        Ok(network) => network,
        Err(e) => {
            eprintln!("Error loading model {:?}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn generate_network(config: &GeneratorConfig, seed: u64, output: Option<PathBuf>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let network = match generate(config, &mut rng) {
        Ok(network) => network,
        Err(e) => {
            eprintln!("Cannot generate network: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = network.to_file(&path) {
                eprintln!("Failed to write {:?}: {}", path, e);
                std::process::exit(1);
            }
            log::info!("Generated {} depots (seed {})", network.len(), seed);
            println!("Model saved to {:?}", path);
        }
        None => print!("{}", network),
    }
}

fn analyze_network(path: &PathBuf, metric: Metric) {
    let network = load_network(path, metric);

    println!("========== Network Analysis ==========\n");
    println!("{}", network.statistics());

    let surplus: Vec<i32> = network.depots().iter().filter(|d| d.is_surplus()).map(|d| d.supply).collect();
    let deficit: Vec<i32> = network.depots().iter().filter(|d| d.is_deficit()).map(|d| -d.supply).collect();

    println!("Supply Distribution:");
    if let (Some(min), Some(max)) = (surplus.iter().min(), surplus.iter().max()) {
        println!("  Surplus: min {}, max {}", min, max);
    }
    if let (Some(min), Some(max)) = (deficit.iter().min(), deficit.iter().max()) {
        println!("  Deficit: min {}, max {}", min, max);
    }

    let sa_ready = surplus.len() >= 2 && deficit.len() >= 2;
    println!("\nSA neighbourhood available: {}", sa_ready);

    let estimate = RandomSearch::new(
        network.clone(),
        RandomSearchConfig {
            max_evaluations: 100,
            seed: 0,
            ..Default::default()
        },
    )
    .run();
    if let Ok(outcome) = estimate {
        println!("\nQuick Solution Estimate:");
        println!("  Best of 100 random paths: {:.2} ({} journeys)", outcome.best_cost, outcome.best_path.len());
    }
}

fn compare_algorithms(networks: &[(String, Network)], config: BenchmarkConfig, output: Option<PathBuf>) {
    if networks.is_empty() {
        eprintln!("No networks found!");
        std::process::exit(1);
    }

    let mut benchmark = Benchmark::new(config);
    for (i, (name, network)) in networks.iter().enumerate() {
        println!("\n[{}/{}] Processing {} (n={})...", i + 1, networks.len(), name, network.len());
        benchmark.run_network(name, network);
    }

    let report = benchmark.generate_report();
    println!("\n{}", report);

    if let Some(dir) = output {
        if let Err(e) = export_benchmark(&benchmark, &dir, &report) {
            eprintln!("Failed to export results to {:?}: {}", dir, e);
            std::process::exit(1);
        }
        println!("Results exported to {:?}", dir);
    }
}

fn export_benchmark(benchmark: &Benchmark, dir: &PathBuf, report: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    benchmark.export_to_csv(dir.join("results.csv"))?;
    benchmark.export_statistics_csv(dir.join("statistics.csv"))?;
    benchmark.export_convergence_csv(dir.join("convergence.csv"))?;
    std::fs::write(dir.join("report.txt"), report)?;
    Ok(())
}
