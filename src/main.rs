//! TSP Solver - Command Line Interface
//!
//! A heuristic solver for the symmetric Traveling Salesman Problem.

use clap::{Parser, Subcommand, ValueEnum};
use tsp_solver::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use tsp_solver::heuristics::construction::{ConstructionHeuristic, NearestNeighbor};
use tsp_solver::instance::TspInstance;
use tsp_solver::solver::{Construction, Improvement, SolverConfig, SolverDriver};
use tsp_solver::visualization::Visualizer;

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tsp-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "A heuristic solver for the symmetric TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single instance
    Solve {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Treat the file as a plain distance-matrix file
        #[arg(long)]
        matrix: bool,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "two-opt")]
        algorithm: Algorithm,

        /// City index the construction starts from
        #[arg(long, default_value = "0")]
        start_index: usize,

        /// Improvement iteration budget (default: until convergence)
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Time limit in seconds (default: until convergence)
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Random seed for the stochastic algorithms
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output solution to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generate SVG/PNG visualizations next to the instance
        #[arg(long)]
        visualize: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Treat the file as a plain distance-matrix file
        #[arg(long)]
        matrix: bool,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing instance files (.tsp and .txt)
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of runs per stochastic algorithm
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Time limit per run in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Run the roster sequentially instead of in parallel
        #[arg(long)]
        sequential: bool,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Nearest Neighbor construction only
    Nn,
    /// Randomized Nearest Neighbor construction only
    RandomizedNn,
    /// Nearest Neighbor + 2-opt local search
    TwoOpt,
    /// Randomized Nearest Neighbor + 2-opt local search
    RandomizedTwoOpt,
    /// Nearest Neighbor + Genetic Algorithm
    Ga,
}

impl Algorithm {
    fn strategies(self) -> (Construction, Improvement) {
        match self {
            Algorithm::Nn => (Construction::NearestNeighbor, Improvement::None),
            Algorithm::RandomizedNn => {
                (Construction::RandomizedNearestNeighbor, Improvement::None)
            }
            Algorithm::TwoOpt => (Construction::NearestNeighbor, Improvement::TwoOpt),
            Algorithm::RandomizedTwoOpt => {
                (Construction::RandomizedNearestNeighbor, Improvement::TwoOpt)
            }
            Algorithm::Ga => (Construction::NearestNeighbor, Improvement::Genetic),
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            matrix,
            algorithm,
            start_index,
            max_iterations,
            time_limit,
            seed,
            output,
            visualize,
            verbose,
        } => {
            solve_instance(
                &instance,
                matrix,
                algorithm,
                start_index,
                max_iterations,
                time_limit,
                seed,
                output,
                visualize,
                verbose,
            );
        }

        Commands::Analyze { instance, matrix } => {
            analyze_instance(&instance, matrix);
        }

        Commands::Benchmark {
            dir,
            output,
            runs,
            time_limit,
            sequential,
            max_size,
        } => {
            run_benchmark(&dir, &output, runs, time_limit, sequential, max_size);
        }
    }
}

fn load_instance(path: &PathBuf, matrix: bool) -> TspInstance {
    let loaded = if matrix {
        TspInstance::from_matrix_file(path)
    } else {
        TspInstance::from_tsplib_file(path)
    };

    match loaded {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    path: &PathBuf,
    matrix: bool,
    algorithm: Algorithm,
    start_index: usize,
    max_iterations: Option<usize>,
    time_limit: Option<f64>,
    seed: Option<u64>,
    output: Option<PathBuf>,
    visualize: bool,
    verbose: bool,
) {
    println!("Loading instance from {:?}...", path);
    let instance = load_instance(path, matrix);

    if verbose {
        println!("{}", instance.statistics());
    }

    let (construction, improvement) = algorithm.strategies();
    let config = SolverConfig {
        start_index,
        construction,
        improvement,
        max_iterations,
        max_seconds: time_limit,
        seed,
    };

    println!("Solving with {:?} algorithm...", algorithm);
    let result = match SolverDriver::solve_instance(&instance, &config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Solver error: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n========== Results ==========");
    println!("Algorithm: {:?}", algorithm);
    println!("Length: {:.2}", result.length);
    println!("Iterations: {}", result.iterations);
    println!("Evaluations: {}", result.evaluations);
    println!("Time: {:.4}s", result.computation_time);

    if verbose {
        println!("\nTour: {:?}", result.tour);
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&result).expect("Failed to serialize result");
        std::fs::write(&out_path, json).expect("Failed to write output");
        println!("\nSolution saved to {:?}", out_path);
    }

    if visualize {
        let viz = Visualizer::new();

        match viz.generate_tour_svg(&instance, &result.tour, result.length) {
            Ok(svg) => {
                let png_path = path.with_extension("png");
                match viz.save_png(&svg, &png_path) {
                    Ok(()) => println!("Visualization saved to {:?}", png_path),
                    Err(e) => {
                        // fallback: write SVG if PNG conversion failed
                        let svg_path = path.with_extension("svg");
                        viz.save_svg(&svg, &svg_path).expect("Failed to save SVG");
                        println!("PNG conversion failed ({}). Saved SVG to {:?}", e, svg_path);
                    }
                }
            }
            Err(e) => println!("Skipping tour plot: {}", e),
        }

        let convergence_svg = viz.generate_convergence_svg(&result.history);
        let convergence_path = path.with_extension("convergence.svg");
        viz.save_svg(&convergence_svg, &convergence_path)
            .expect("Failed to save convergence SVG");
        println!("Convergence plot saved to {:?}", convergence_path);
    }
}

fn analyze_instance(path: &PathBuf, matrix: bool) {
    let instance = load_instance(path, matrix);

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let nn = NearestNeighbor::new();
    let nn_tour = nn
        .construct(&instance)
        .expect("construction failed on a loaded instance");
    let nn_length = nn_tour.length(instance.matrix());

    let improved = SolverDriver::solve_instance(&instance, &SolverConfig::default())
        .expect("solve failed on a loaded instance");

    println!("\nQuick Solution Estimates:");
    println!("  Nearest Neighbor: {:.2}", nn_length);
    println!(
        "  NN + 2-Opt: {:.2} ({} improving moves)",
        improved.length, improved.iterations
    );
}

fn run_benchmark(
    dir: &PathBuf,
    output: &PathBuf,
    runs: usize,
    time_limit: Option<f64>,
    sequential: bool,
    max_size: Option<usize>,
) {
    println!("Loading instances from {:?}...", dir);

    let mut instances = load_instances_from_dir(dir);

    if let Some(max) = max_size {
        instances.retain(|i| i.dimension() <= max);
    }

    println!("Found {} instances", instances.len());

    if instances.is_empty() {
        eprintln!("No instances found!");
        return;
    }

    std::fs::create_dir_all(output).expect("Failed to create output directory");

    let config = BenchmarkConfig {
        num_runs: runs,
        time_limit,
        parallel: !sequential,
    };

    let mut benchmark = Benchmark::new(config);

    for (i, instance) in instances.iter().enumerate() {
        println!(
            "\n[{}/{}] Processing {} (n={})...",
            i + 1,
            instances.len(),
            instance.name,
            instance.dimension()
        );

        benchmark.run_instance(instance);
    }

    let results_path = output.join("results.csv");
    benchmark
        .export_to_csv(&results_path)
        .expect("Failed to export results");
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark
        .export_statistics_csv(&stats_path)
        .expect("Failed to export statistics");
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report).expect("Failed to save report");
    println!("Report saved to {:?}", report_path);
}
