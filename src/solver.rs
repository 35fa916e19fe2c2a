//! Solver driver: wires construction and improvement into one call.
//!
//! A solve is a pure function of (city set, configuration): build the
//! instance, construct an initial tour, improve it, assemble the result.
//! Errors from any stage propagate unchanged; there are no retries.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::heuristics::construction::{
    ConstructionHeuristic, NearestNeighbor, RandomizedNearestNeighbor,
};
use crate::heuristics::genetic::{GaConfig, GeneticSearch};
use crate::heuristics::local_search::{LocalSearch, SearchStats, TwoOptSearch};
use crate::instance::{City, TspInstance};
use crate::tour::Tour;

/// Seed used by stochastic strategies when the configuration leaves it unset.
pub const DEFAULT_SEED: u64 = 42;

/// Construction strategy choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construction {
    /// Deterministic nearest neighbor
    NearestNeighbor,
    /// Nearest neighbor with a seeded restricted candidate list
    RandomizedNearestNeighbor,
}

/// Improvement strategy choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Improvement {
    /// First-improvement 2-opt until convergence or budget
    TwoOpt,
    /// Genetic algorithm seeded with the constructed tour
    Genetic,
    /// Return the constructed tour unchanged
    None,
}

/// Options recognized by [`SolverDriver::solve`].
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// City the construction starts from
    pub start_index: usize,
    /// Construction strategy
    pub construction: Construction,
    /// Improvement strategy
    pub improvement: Improvement,
    /// Improvement iteration budget; `None` means until convergence
    pub max_iterations: Option<usize>,
    /// Improvement time budget in seconds; `None` means until convergence
    pub max_seconds: Option<f64>,
    /// Seed for the stochastic strategies
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            start_index: 0,
            construction: Construction::NearestNeighbor,
            improvement: Improvement::TwoOpt,
            max_iterations: None,
            max_seconds: None,
            seed: None,
        }
    }
}

impl SolverConfig {
    fn validate(&self, dimension: usize) -> Result<()> {
        if self.start_index >= dimension {
            return Err(SolverError::InvalidInput(format!(
                "start index {} out of range for {} cities",
                self.start_index, dimension
            )));
        }
        if let Some(seconds) = self.max_seconds {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(SolverError::InvalidInput(format!(
                    "time budget must be a non-negative number of seconds, got {}",
                    seconds
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of a solve: the final tour and its metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverResult {
    /// The tour as a sequence of city indices
    pub tour: Vec<usize>,
    /// Total cyclic tour length
    pub length: f64,
    /// Improvement iterations performed
    pub iterations: usize,
    /// Length-delta evaluations performed
    pub evaluations: u64,
    /// Wall-clock seconds for the whole solve
    pub computation_time: f64,
    /// Tour length at the start and after each improvement
    pub history: Vec<f64>,
}

impl std::fmt::Display for SolverResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Length: {:.2}", self.length)?;
        writeln!(f, "Iterations: {}", self.iterations)?;
        writeln!(f, "Evaluations: {}", self.evaluations)?;
        writeln!(f, "Time: {:.4}s", self.computation_time)?;
        writeln!(f, "Tour: {:?}", self.tour)
    }
}

/// Runs a full solve. Stateless: all inputs arrive per call.
pub struct SolverDriver;

impl SolverDriver {
    /// Solve from raw city records (the library's input boundary).
    ///
    /// An empty city set is rejected; a single city short-circuits to the
    /// trivial zero-length tour without touching a distance matrix.
    pub fn solve(cities: &[City], config: &SolverConfig) -> Result<SolverResult> {
        match cities.len() {
            0 => Err(SolverError::InvalidInput("empty city set".into())),
            1 => {
                config.validate(1)?;
                Ok(SolverResult {
                    tour: vec![0],
                    length: 0.0,
                    iterations: 0,
                    evaluations: 0,
                    computation_time: 0.0,
                    history: vec![0.0],
                })
            }
            _ => {
                let instance = TspInstance::from_cities("cities", cities.to_vec())?;
                Self::solve_instance(&instance, config)
            }
        }
    }

    /// Solve a prepared instance.
    pub fn solve_instance(instance: &TspInstance, config: &SolverConfig) -> Result<SolverResult> {
        config.validate(instance.dimension())?;

        let started = Instant::now();

        let construction: Box<dyn ConstructionHeuristic> = match config.construction {
            Construction::NearestNeighbor => {
                Box::new(NearestNeighbor::from_start(config.start_index))
            }
            Construction::RandomizedNearestNeighbor => Box::new(RandomizedNearestNeighbor::from_start(
                config.start_index,
                config.seed.unwrap_or(DEFAULT_SEED),
            )),
        };

        let mut tour = construction.construct(instance)?;
        debug_assert!(tour.is_permutation());
        let constructed = tour.length(instance.matrix());
        log::info!(
            "{} built a tour of length {:.2}",
            construction.name(),
            constructed
        );

        let stats = match config.improvement {
            Improvement::TwoOpt => {
                let search = TwoOptSearch::with_budget(config.max_iterations, config.max_seconds);
                search.improve(instance, &mut tour)?
            }
            Improvement::Genetic => {
                let defaults = GaConfig::default();
                let search = GeneticSearch::with_config(GaConfig {
                    seed: config.seed.unwrap_or(DEFAULT_SEED),
                    time_limit: config.max_seconds,
                    max_generations: config.max_iterations.unwrap_or(defaults.max_generations),
                    ..defaults
                });
                search.improve(instance, &mut tour)?
            }
            Improvement::None => SearchStats::start_at(constructed),
        };
        debug_assert!(tour.is_permutation());

        let length = tour.length(instance.matrix());
        log::info!(
            "improvement finished after {} iterations, length {:.2}",
            stats.iterations,
            length
        );

        Ok(SolverResult {
            tour: tour.into_order(),
            length,
            iterations: stats.iterations,
            evaluations: stats.evaluations,
            computation_time: started.elapsed().as_secs_f64(),
            history: stats.history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_cities() -> Vec<City> {
        vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 0.0, 1.0),
            City::new(2, 1.0, 1.0),
            City::new(3, 1.0, 0.0),
        ]
    }

    fn cross_cities() -> Vec<City> {
        vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 1.0),
            City::new(2, 0.0, 1.0),
            City::new(3, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_empty_city_set_rejected() {
        assert!(SolverDriver::solve(&[], &SolverConfig::default()).is_err());
    }

    #[test]
    fn test_single_city_is_trivial() {
        let cities = vec![City::new(0, 3.0, 4.0)];
        let result = SolverDriver::solve(&cities, &SolverConfig::default()).unwrap();

        assert_eq!(result.tour, vec![0]);
        assert_eq!(result.length, 0.0);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_square_is_solved_without_improvement_moves() {
        // nearest neighbor already walks the perimeter here
        let result = SolverDriver::solve(&square_cities(), &SolverConfig::default()).unwrap();

        assert_eq!(result.tour, vec![0, 1, 2, 3]);
        assert!((result.length - 4.0).abs() < 1e-9);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_two_opt_never_worse_than_construction() {
        let cities = cross_cities();

        let constructed = SolverDriver::solve(
            &cities,
            &SolverConfig {
                improvement: Improvement::None,
                ..Default::default()
            },
        )
        .unwrap();
        let improved = SolverDriver::solve(&cities, &SolverConfig::default()).unwrap();

        assert!(improved.length <= constructed.length);
        assert!((improved.length - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_solves_are_deterministic() {
        let cities = cross_cities();
        let config = SolverConfig::default();

        let a = SolverDriver::solve(&cities, &config).unwrap();
        let b = SolverDriver::solve(&cities, &config).unwrap();

        assert_eq!(a.tour, b.tour);
        assert_eq!(a.length, b.length);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn test_zero_iteration_budget_keeps_construction() {
        let cities = cross_cities();

        let constructed = SolverDriver::solve(
            &cities,
            &SolverConfig {
                improvement: Improvement::None,
                ..Default::default()
            },
        )
        .unwrap();
        let budgeted = SolverDriver::solve(
            &cities,
            &SolverConfig {
                max_iterations: Some(0),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(budgeted.iterations, 0);
        assert_eq!(budgeted.length, constructed.length);
    }

    #[test]
    fn test_bad_config_rejected() {
        let cities = square_cities();

        let out_of_range = SolverConfig {
            start_index: 4,
            ..Default::default()
        };
        assert!(SolverDriver::solve(&cities, &out_of_range).is_err());

        let negative_budget = SolverConfig {
            max_seconds: Some(-1.0),
            ..Default::default()
        };
        assert!(SolverDriver::solve(&cities, &negative_budget).is_err());
    }

    #[test]
    fn test_genetic_improvement_path() {
        let cities = cross_cities();
        let config = SolverConfig {
            improvement: Improvement::Genetic,
            seed: Some(11),
            ..Default::default()
        };

        let result = SolverDriver::solve(&cities, &config).unwrap();

        let mut sorted = result.tour.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
        assert!((result.length - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_randomized_construction_is_reproducible() {
        let cities = cross_cities();
        let config = SolverConfig {
            construction: Construction::RandomizedNearestNeighbor,
            seed: Some(3),
            ..Default::default()
        };

        let a = SolverDriver::solve(&cities, &config).unwrap();
        let b = SolverDriver::solve(&cities, &config).unwrap();
        assert_eq!(a.tour, b.tour);
    }
}
