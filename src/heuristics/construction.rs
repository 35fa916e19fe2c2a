//! Construction heuristics: build an initial feasible tour from an instance.

use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::error::{Result, SolverError};
use crate::instance::TspInstance;
use crate::tour::Tour;

/// Trait for tour construction methods.
pub trait ConstructionHeuristic {
    fn construct(&self, instance: &TspInstance) -> Result<Tour>;
    fn name(&self) -> &str;
}

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly visiting the closest unvisited city,
/// starting from a configurable city. Distance ties go to the lowest city
/// index, so the result is fully deterministic.
pub struct NearestNeighbor {
    pub start_index: usize,
}

impl NearestNeighbor {
    pub fn new() -> Self {
        NearestNeighbor { start_index: 0 }
    }

    pub fn from_start(start_index: usize) -> Self {
        NearestNeighbor { start_index }
    }
}

impl Default for NearestNeighbor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighbor {
    fn construct(&self, instance: &TspInstance) -> Result<Tour> {
        let n = instance.dimension();
        if n == 0 {
            return Err(SolverError::InvalidInput(
                "no cities to construct a tour from".into(),
            ));
        }
        if self.start_index >= n {
            return Err(SolverError::InvalidInput(format!(
                "start index {} out of range for {} cities",
                self.start_index, n
            )));
        }

        let mut order = Vec::with_capacity(n);
        let mut visited = vec![false; n];

        let mut current = self.start_index;
        order.push(current);
        visited[current] = true;

        while order.len() < n {
            let mut nearest = None;
            let mut nearest_dist = f64::INFINITY;
            for candidate in 0..n {
                if visited[candidate] {
                    continue;
                }
                let d = instance.distance(current, candidate);
                // strict comparison keeps the lowest index on ties
                if d < nearest_dist {
                    nearest_dist = d;
                    nearest = Some(candidate);
                }
            }

            // every unvisited city is a candidate, so this always holds
            let next = nearest.expect("unvisited city must exist");
            order.push(next);
            visited[next] = true;
            current = next;
        }

        Ok(Tour::new(order))
    }

    fn name(&self) -> &str {
        "NearestNeighbor"
    }
}

/// Randomized Nearest Neighbor Heuristic
///
/// Same greedy scheme, but each step samples uniformly among the `rcl_size`
/// closest unvisited cities. Seeded, so identical seeds give identical tours.
pub struct RandomizedNearestNeighbor {
    pub start_index: usize,
    pub seed: u64,
    pub rcl_size: usize,
}

impl RandomizedNearestNeighbor {
    pub fn new(seed: u64) -> Self {
        RandomizedNearestNeighbor {
            start_index: 0,
            seed,
            rcl_size: 3,
        }
    }

    pub fn from_start(start_index: usize, seed: u64) -> Self {
        RandomizedNearestNeighbor {
            start_index,
            seed,
            rcl_size: 3,
        }
    }
}

impl ConstructionHeuristic for RandomizedNearestNeighbor {
    fn construct(&self, instance: &TspInstance) -> Result<Tour> {
        let n = instance.dimension();
        if n == 0 {
            return Err(SolverError::InvalidInput(
                "no cities to construct a tour from".into(),
            ));
        }
        if self.start_index >= n {
            return Err(SolverError::InvalidInput(format!(
                "start index {} out of range for {} cities",
                self.start_index, n
            )));
        }
        if self.rcl_size == 0 {
            return Err(SolverError::InvalidInput(
                "candidate list size must be at least 1".into(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut order = Vec::with_capacity(n);
        let mut visited = vec![false; n];

        let mut current = self.start_index;
        order.push(current);
        visited[current] = true;

        while order.len() < n {
            let mut candidates: Vec<(usize, f64)> = (0..n)
                .filter(|&c| !visited[c])
                .map(|c| (c, instance.distance(current, c)))
                .collect();
            candidates.sort_by_key(|&(_, d)| OrderedFloat(d));

            let top_k = candidates.len().min(self.rcl_size);
            let next = candidates[rng.gen_range(0..top_k)].0;

            order.push(next);
            visited[next] = true;
            current = next;
        }

        Ok(Tour::new(order))
    }

    fn name(&self) -> &str {
        "RandomizedNearestNeighbor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    fn square_instance() -> TspInstance {
        // perimeter order: 0, 1, 2, 3
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 0.0, 1.0),
            City::new(2, 1.0, 1.0),
            City::new(3, 1.0, 0.0),
        ];
        TspInstance::from_cities("square", cities).unwrap()
    }

    fn cross_instance() -> TspInstance {
        // same square, corners listed so index order crosses the diagonals
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 1.0),
            City::new(2, 0.0, 1.0),
            City::new(3, 1.0, 0.0),
        ];
        TspInstance::from_cities("cross", cities).unwrap()
    }

    #[test]
    fn test_nearest_neighbor_on_square() {
        let instance = square_instance();
        let tour = NearestNeighbor::new().construct(&instance).unwrap();

        assert_eq!(tour.order(), &[0, 1, 2, 3]);
        assert!((tour.length(instance.matrix()) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_neighbor_tie_break_lowest_index() {
        let instance = cross_instance();
        let tour = NearestNeighbor::new().construct(&instance).unwrap();

        // from city 0 both 2 and 3 are at distance 1; the lower index wins
        assert_eq!(tour.order(), &[0, 2, 1, 3]);
        assert!(tour.is_permutation());
    }

    #[test]
    fn test_nearest_neighbor_start_index() {
        let instance = square_instance();
        let tour = NearestNeighbor::from_start(2).construct(&instance).unwrap();

        assert_eq!(tour.order()[0], 2);
        assert!(tour.is_permutation());
    }

    #[test]
    fn test_start_index_out_of_range() {
        let instance = square_instance();
        assert!(NearestNeighbor::from_start(4).construct(&instance).is_err());
        assert!(RandomizedNearestNeighbor::from_start(9, 1)
            .construct(&instance)
            .is_err());
    }

    #[test]
    fn test_randomized_is_deterministic_per_seed() {
        let instance = cross_instance();
        let heuristic = RandomizedNearestNeighbor::new(7);

        let a = heuristic.construct(&instance).unwrap();
        let b = heuristic.construct(&instance).unwrap();

        assert_eq!(a.order(), b.order());
        assert!(a.is_permutation());
    }
}
