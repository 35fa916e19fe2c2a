//! Local search improvement for tours.
//!
//! The workhorse is first-improvement 2-opt: scan edge pairs in a fixed
//! order, apply the first reversal that shortens the tour, restart the scan,
//! stop when a full scan finds nothing or the configured budget runs out.

use std::time::Instant;

use crate::error::Result;
use crate::instance::TspInstance;
use crate::tour::{Tour, TwoOptMove, IMPROVEMENT_EPSILON};

/// What an improvement run did: accepted moves, delta evaluations, and the
/// tour length after the start and after each accepted move (for convergence
/// plots).
#[derive(Debug, Clone)]
pub struct SearchStats {
    pub iterations: usize,
    pub evaluations: u64,
    pub history: Vec<f64>,
}

impl SearchStats {
    pub fn start_at(initial_length: f64) -> Self {
        SearchStats {
            iterations: 0,
            evaluations: 0,
            history: vec![initial_length],
        }
    }
}

/// Trait for tour improvement methods.
pub trait LocalSearch {
    fn improve(&self, instance: &TspInstance, tour: &mut Tour) -> Result<SearchStats>;
    fn name(&self) -> &str;
}

/// 2-Opt Local Search
///
/// First-improvement strategy: cheaper per iteration than best-improvement,
/// at the cost of more iterations on large instances. Tour length never
/// increases; termination is guaranteed because every accepted move shortens
/// the tour by more than the epsilon.
pub struct TwoOptSearch {
    /// Stop after this many accepted moves
    pub max_iterations: Option<usize>,
    /// Stop after this many seconds, checked at scan starts
    pub max_seconds: Option<f64>,
}

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch {
            max_iterations: None,
            max_seconds: None,
        }
    }

    pub fn with_budget(max_iterations: Option<usize>, max_seconds: Option<f64>) -> Self {
        TwoOptSearch {
            max_iterations,
            max_seconds,
        }
    }

    fn budget_exhausted(&self, iterations: usize, started: &Instant) -> bool {
        if let Some(max) = self.max_iterations {
            if iterations >= max {
                return true;
            }
        }
        if let Some(max) = self.max_seconds {
            if started.elapsed().as_secs_f64() >= max {
                return true;
            }
        }
        false
    }
}

impl Default for TwoOptSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for TwoOptSearch {
    fn improve(&self, instance: &TspInstance, tour: &mut Tour) -> Result<SearchStats> {
        let n = tour.len();
        let matrix = instance.matrix();
        let mut current = tour.length(matrix);
        let mut stats = SearchStats::start_at(current);

        // with 3 or fewer cities every cyclic order has the same length
        if n < 4 {
            return Ok(stats);
        }

        let started = Instant::now();

        'scan: loop {
            if self.budget_exhausted(stats.iterations, &started) {
                log::debug!(
                    "2-opt budget exhausted after {} accepted moves",
                    stats.iterations
                );
                break;
            }

            for i in 0..n - 1 {
                for j in (i + 1)..n {
                    // reversing the whole cycle is a no-op, not a move
                    if i == 0 && j == n - 1 {
                        continue;
                    }

                    let mv = TwoOptMove::new(i, j);
                    let delta = tour.move_delta(matrix, mv);
                    stats.evaluations += 1;

                    if delta < -IMPROVEMENT_EPSILON {
                        tour.apply_move(mv)?;
                        current += delta;
                        stats.iterations += 1;
                        stats.history.push(current);
                        continue 'scan;
                    }
                }
            }

            // full scan without improvement: converged
            break;
        }

        log::debug!(
            "2-opt finished: {} moves, {} evaluations, length {:.2}",
            stats.iterations,
            stats.evaluations,
            current
        );
        Ok(stats)
    }

    fn name(&self) -> &str {
        "2-Opt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    fn cross_instance() -> TspInstance {
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 1.0),
            City::new(2, 0.0, 1.0),
            City::new(3, 1.0, 0.0),
        ];
        TspInstance::from_cities("cross", cities).unwrap()
    }

    fn ring_instance(n: usize) -> TspInstance {
        // cities on a circle; optimum is the angular order
        let cities: Vec<City> = (0..n)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
                City::new(i, angle.cos() * 10.0, angle.sin() * 10.0)
            })
            .collect();
        TspInstance::from_cities("ring", cities).unwrap()
    }

    #[test]
    fn test_two_opt_untangles_crossing_square() {
        let instance = cross_instance();
        // visiting in index order crosses both diagonals: length 2 + 2*sqrt(2)
        let mut tour = Tour::new(vec![0, 1, 2, 3]);
        let crossing = tour.length(instance.matrix());
        assert!(crossing > 4.0);

        let stats = TwoOptSearch::new().improve(&instance, &mut tour).unwrap();

        assert!(stats.iterations > 0);
        assert!((tour.length(instance.matrix()) - 4.0).abs() < 1e-9);
        assert!(tour.is_permutation());
    }

    #[test]
    fn test_two_opt_leaves_optimal_tour_alone() {
        let instance = cross_instance();
        // the perimeter order is already optimal
        let mut tour = Tour::new(vec![0, 2, 1, 3]);

        let stats = TwoOptSearch::new().improve(&instance, &mut tour).unwrap();

        assert_eq!(stats.iterations, 0);
        assert_eq!(tour.order(), &[0, 2, 1, 3]);
    }

    #[test]
    fn test_two_opt_monotone_history() {
        let instance = ring_instance(12);
        // deliberately scrambled visiting order
        let mut tour = Tour::new(vec![0, 6, 3, 9, 1, 7, 4, 10, 2, 8, 5, 11]);

        let stats = TwoOptSearch::new().improve(&instance, &mut tour).unwrap();

        for pair in stats.history.windows(2) {
            assert!(pair[1] < pair[0] + IMPROVEMENT_EPSILON);
        }
        assert!(tour.is_permutation());
    }

    #[test]
    fn test_two_opt_idempotent_after_convergence() {
        let instance = ring_instance(10);
        let mut tour = Tour::new(vec![0, 5, 2, 8, 4, 1, 6, 9, 3, 7]);

        let search = TwoOptSearch::new();
        search.improve(&instance, &mut tour).unwrap();
        let converged = tour.length(instance.matrix());

        let rerun = search.improve(&instance, &mut tour).unwrap();
        assert_eq!(rerun.iterations, 0);
        assert_eq!(tour.length(instance.matrix()), converged);
    }

    #[test]
    fn test_two_opt_is_deterministic() {
        let instance = ring_instance(9);
        let start = vec![0, 4, 8, 3, 7, 2, 6, 1, 5];

        let mut a = Tour::new(start.clone());
        let mut b = Tour::new(start);
        let search = TwoOptSearch::new();
        let stats_a = search.improve(&instance, &mut a).unwrap();
        let stats_b = search.improve(&instance, &mut b).unwrap();

        assert_eq!(a.order(), b.order());
        assert_eq!(stats_a.iterations, stats_b.iterations);
        assert_eq!(stats_a.evaluations, stats_b.evaluations);
    }

    #[test]
    fn test_two_opt_iteration_budget() {
        let instance = ring_instance(12);
        let mut tour = Tour::new(vec![0, 6, 3, 9, 1, 7, 4, 10, 2, 8, 5, 11]);

        let search = TwoOptSearch::with_budget(Some(1), None);
        let stats = search.improve(&instance, &mut tour).unwrap();

        assert!(stats.iterations <= 1);
        assert!(tour.is_permutation());
    }
}
