//! TSP Solver Library
//!
//! A heuristic solver for the symmetric Traveling Salesman Problem.
//!
//! # Features
//!
//! - Precomputed, validated distance matrices (Euclidean or explicit)
//! - Nearest-neighbor construction, deterministic or seeded-randomized
//! - First-improvement 2-opt local search with iteration/time budgets
//! - Genetic algorithm extension (OX1/CX/PMX crossover)
//! - Benchmarking and SVG visualization tools
//!
//! # Example
//!
//! ```no_run
//! use tsp_solver::instance::TspInstance;
//! use tsp_solver::solver::{SolverConfig, SolverDriver};
//!
//! // Load instance
//! let instance = TspInstance::from_tsplib_file("instance.tsp").unwrap();
//!
//! // Construct and improve a tour with the default configuration
//! let result = SolverDriver::solve_instance(&instance, &SolverConfig::default()).unwrap();
//!
//! println!("Tour length: {:.2}", result.length);
//! ```

pub mod benchmark;
pub mod error;
pub mod heuristics;
pub mod instance;
pub mod solver;
pub mod tour;
pub mod visualization;

pub use error::{Result, SolverError};
pub use instance::{City, DistanceMatrix, TspInstance};
pub use solver::{SolverConfig, SolverDriver, SolverResult};
pub use tour::Tour;
