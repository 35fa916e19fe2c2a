//! Benchmarking and experimentation module.
//!
//! Runs the algorithm roster over instances, collects per-run results,
//! aggregates statistics and exports CSV tables. Runs are independent solves
//! on owned instance copies, so they can execute in parallel.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::instance::TspInstance;
use crate::solver::{Construction, Improvement, SolverConfig, SolverDriver};

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Instance dimension
    pub dimension: usize,
    /// Final tour length
    pub length: f64,
    /// Computation time in seconds
    pub time: f64,
    /// Improvement iterations performed
    pub iterations: usize,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    /// Algorithm name
    pub algorithm: String,
    /// Number of recorded runs
    pub num_runs: usize,
    /// Average tour length
    pub avg_length: f64,
    /// Best tour length
    pub best_length: f64,
    /// Worst tour length
    pub worst_length: f64,
    /// Sample standard deviation of tour length
    pub std_length: f64,
    /// Average time per run
    pub avg_time: f64,
    /// Total time
    pub total_time: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of runs per stochastic algorithm
    pub num_runs: usize,
    /// Time limit per run in seconds
    pub time_limit: Option<f64>,
    /// Run the roster in parallel
    pub parallel: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            time_limit: None,
            parallel: true,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    /// The algorithm roster: deterministic strategies once, stochastic ones
    /// once per seed.
    fn jobs(&self) -> Vec<(String, SolverConfig)> {
        let base = SolverConfig {
            max_seconds: self.config.time_limit,
            ..Default::default()
        };

        let mut jobs = vec![
            (
                "NearestNeighbor".to_string(),
                SolverConfig {
                    improvement: Improvement::None,
                    ..base.clone()
                },
            ),
            ("NN+2Opt".to_string(), base.clone()),
        ];

        for seed in 0..self.config.num_runs as u64 {
            jobs.push((
                format!("RandomizedNN+2Opt-run{}", seed),
                SolverConfig {
                    construction: Construction::RandomizedNearestNeighbor,
                    seed: Some(seed),
                    ..base.clone()
                },
            ));
            jobs.push((
                format!("GA-run{}", seed),
                SolverConfig {
                    improvement: Improvement::Genetic,
                    seed: Some(seed),
                    ..base.clone()
                },
            ));
        }

        jobs
    }

    /// Run the full roster on one instance.
    pub fn run_instance(&mut self, instance: &TspInstance) {
        let jobs = self.jobs();
        let bar = ProgressBar::new(jobs.len() as u64);

        let run_one = |(name, config): &(String, SolverConfig)| {
            let owned = instance.clone();
            let started = Instant::now();
            let outcome = SolverDriver::solve_instance(&owned, config);
            let elapsed = started.elapsed().as_secs_f64();
            bar.inc(1);
            (name.clone(), outcome, elapsed)
        };

        let outcomes: Vec<_> = if self.config.parallel {
            jobs.par_iter().map(run_one).collect()
        } else {
            jobs.iter().map(run_one).collect()
        };
        bar.finish_and_clear();

        for (algorithm, outcome, elapsed) in outcomes {
            match outcome {
                Ok(result) => self.results.push(AlgorithmResult {
                    algorithm,
                    instance: instance.name.clone(),
                    dimension: instance.dimension(),
                    length: result.length,
                    time: elapsed,
                    iterations: result.iterations,
                }),
                Err(e) => log::error!("{} failed on {}: {}", algorithm, instance.name, e),
            }
        }
    }

    /// Run the roster on a list of instances.
    pub fn run_on_instances(&mut self, instances: &[TspInstance]) {
        for instance in instances {
            log::info!(
                "benchmarking {} (n={})",
                instance.name,
                instance.dimension()
            );
            self.run_instance(instance);
        }
    }

    /// All recorded per-run results.
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    /// Compute statistics for each algorithm
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut by_algorithm: HashMap<String, Vec<&AlgorithmResult>> = HashMap::new();
        for result in &self.results {
            by_algorithm
                .entry(result.algorithm.clone())
                .or_default()
                .push(result);
        }

        let mut statistics = Vec::new();
        for (algorithm, results) in by_algorithm {
            let lengths: Vec<f64> = results.iter().map(|r| r.length).collect();
            let times: Vec<f64> = results.iter().map(|r| r.time).collect();

            let avg_length = lengths.iter().mean();
            let std_length = if lengths.len() > 1 {
                lengths.iter().std_dev()
            } else {
                0.0
            };
            let best_length = lengths.iter().cloned().fold(f64::INFINITY, f64::min);
            let worst_length = lengths.iter().cloned().fold(0.0, f64::max);
            let total_time: f64 = times.iter().sum();

            statistics.push(AlgorithmStatistics {
                algorithm,
                num_runs: results.len(),
                avg_length,
                best_length,
                worst_length,
                std_length,
                avg_time: total_time / times.len() as f64,
                total_time,
            });
        }

        statistics.sort_by(|a, b| a.avg_length.partial_cmp(&b.avg_length).unwrap());
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

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        TSP Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str(&"-".repeat(80));
        report.push('\n');
        report.push_str(&format!(
            "{:<25} {:>6} {:>12} {:>12} {:>10} {:>10}\n",
            "Algorithm", "Runs", "Avg Length", "Best Length", "Std", "Avg Time"
        ));
        report.push_str(&"-".repeat(80));
        report.push('\n');

        for stat in self.compute_statistics() {
            report.push_str(&format!(
                "{:<25} {:>6} {:>12.2} {:>12.2} {:>10.2} {:>10.4}\n",
                stat.algorithm,
                stat.num_runs,
                stat.avg_length,
                stat.best_length,
                stat.std_length,
                stat.avg_time
            ));
        }

        report
    }
}

/// Load every parseable instance from a directory.
///
/// `.tsp` files go through the TSPLIB parser, `.txt` files through the
/// matrix parser; anything else is skipped.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<TspInstance> {
    let mut instances = Vec::new();

    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("cannot read directory: {}", e);
            return instances;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("tsp") => TspInstance::from_tsplib_file(&path),
            Some("txt") => TspInstance::from_matrix_file(&path),
            _ => continue,
        };

        match parsed {
            Ok(instance) => instances.push(instance),
            Err(e) => log::warn!("skipping {}: {}", path.display(), e),
        }
    }

    instances.sort_by(|a, b| a.name.cmp(&b.name));
    instances
}
