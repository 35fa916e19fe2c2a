//! Genetic algorithm over tour permutations.
//!
//! Offers order (OX1), cycle (CX) and partially mapped (PMX) crossover,
//! inversion and swap mutation, tournament selection and elitism. Fully
//! seeded: identical configuration gives identical runs. Available as an
//! improvement strategy next to 2-opt; the incoming tour joins the initial
//! population and elitism keeps the best, so the result never loses to it.

use std::time::Instant;

use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::error::{Result, SolverError};
use crate::heuristics::local_search::{LocalSearch, SearchStats};
use crate::instance::{DistanceMatrix, TspInstance};
use crate::tour::{Tour, IMPROVEMENT_EPSILON};

/// Crossover operator choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverKind {
    /// Order Crossover (OX1)
    Order,
    /// Cycle Crossover (CX)
    Cycle,
    /// Partially Mapped Crossover (PMX)
    PartiallyMapped,
}

/// Mutation operator choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Reverse a random segment
    Inversion,
    /// Swap two random positions
    Swap,
}

/// Genetic algorithm configuration
#[derive(Debug, Clone)]
pub struct GaConfig {
    /// Population size
    pub population_size: usize,
    /// Number of generations
    pub max_generations: usize,
    /// Maximum generations without improvement
    pub max_no_improve: usize,
    /// Crossover probability
    pub crossover_prob: f64,
    /// Mutation probability
    pub mutation_prob: f64,
    /// Best individuals copied into the next generation unchanged
    pub elite_count: usize,
    /// Tournament size for selection
    pub tournament_size: usize,
    /// Crossover operator
    pub crossover: CrossoverKind,
    /// Mutation operator
    pub mutation: MutationKind,
    /// Random seed
    pub seed: u64,
    /// Time limit in seconds, checked at generation boundaries
    pub time_limit: Option<f64>,
}

impl Default for GaConfig {
    fn default() -> Self {
        GaConfig {
            population_size: 50,
            max_generations: 200,
            max_no_improve: 50,
            crossover_prob: 0.9,
            mutation_prob: 0.2,
            elite_count: 5,
            tournament_size: 5,
            crossover: CrossoverKind::Order,
            mutation: MutationKind::Inversion,
            seed: 42,
            time_limit: None,
        }
    }
}

/// Member of the population: a visiting order and its cached length.
#[derive(Debug, Clone)]
struct Individual {
    order: Vec<usize>,
    length: f64,
}

impl Individual {
    fn new(order: Vec<usize>, matrix: &DistanceMatrix, evaluations: &mut u64) -> Self {
        let length = Tour::new(order.clone()).length(matrix);
        *evaluations += 1;
        Individual { order, length }
    }
}

/// Order Crossover (OX1): copy a slice of the first parent, fill the rest in
/// the second parent's order.
fn order_crossover(rng: &mut ChaCha8Rng, p1: &[usize], p2: &[usize]) -> Vec<usize> {
    let n = p1.len();
    let mut a = rng.gen_range(0..n);
    let mut b = rng.gen_range(0..n);
    if a == b {
        return p1.to_vec();
    }
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }

    let mut child = vec![usize::MAX; n];
    let mut used = vec![false; n];
    for k in a..=b {
        child[k] = p1[k];
        used[p1[k]] = true;
    }

    let mut fill = (b + 1) % n;
    for &gene in p2 {
        if !used[gene] {
            child[fill] = gene;
            used[gene] = true;
            fill = (fill + 1) % n;
        }
    }

    child
}

/// Cycle Crossover (CX): positions are partitioned into cycles, which
/// alternate between the parents.
fn cycle_crossover(p1: &[usize], p2: &[usize]) -> Vec<usize> {
    let n = p1.len();
    let mut child = vec![usize::MAX; n];

    let mut pos_in_p2 = vec![0usize; n];
    for (idx, &gene) in p2.iter().enumerate() {
        pos_in_p2[gene] = idx;
    }

    let mut cycle_num = 0;
    for start in 0..n {
        if child[start] != usize::MAX {
            continue;
        }

        let mut pos = start;
        loop {
            child[pos] = if cycle_num % 2 == 0 { p1[pos] } else { p2[pos] };
            pos = pos_in_p2[p1[pos]];
            if pos == start {
                break;
            }
        }
        cycle_num += 1;
    }

    child
}

/// Partially Mapped Crossover (PMX): copy a slice of the first parent,
/// resolve conflicts outside it through the slice's gene mapping.
fn pmx_crossover(rng: &mut ChaCha8Rng, p1: &[usize], p2: &[usize]) -> Vec<usize> {
    let n = p1.len();
    let mut a = rng.gen_range(0..n);
    let mut b = rng.gen_range(0..n);
    if a == b {
        return p1.to_vec();
    }
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }

    let mut child = vec![usize::MAX; n];
    let mut in_segment = vec![false; n];
    for k in a..=b {
        child[k] = p1[k];
        in_segment[p1[k]] = true;
    }

    let mut pos_in_p1 = vec![0usize; n];
    for (idx, &gene) in p1.iter().enumerate() {
        pos_in_p1[gene] = idx;
    }

    for k in (0..a).chain(b + 1..n) {
        let mut gene = p2[k];
        while in_segment[gene] {
            gene = p2[pos_in_p1[gene]];
        }
        child[k] = gene;
    }

    child
}

fn mutate_inversion(rng: &mut ChaCha8Rng, order: &mut [usize]) {
    let n = order.len();
    if n < 2 {
        return;
    }
    let mut a = rng.gen_range(0..n);
    let mut b = rng.gen_range(0..n);
    if a == b {
        return;
    }
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    order[a..=b].reverse();
}

fn mutate_swap(rng: &mut ChaCha8Rng, order: &mut [usize]) {
    let n = order.len();
    if n < 2 {
        return;
    }
    let i = rng.gen_range(0..n);
    let j = rng.gen_range(0..n);
    if i != j {
        order.swap(i, j);
    }
}

fn tournament_select<'a>(
    rng: &mut ChaCha8Rng,
    population: &'a [Individual],
    size: usize,
) -> &'a Individual {
    let mut best = &population[rng.gen_range(0..population.len())];
    for _ in 1..size {
        let candidate = &population[rng.gen_range(0..population.len())];
        if candidate.length < best.length {
            best = candidate;
        }
    }
    best
}

/// Genetic improvement strategy.
pub struct GeneticSearch {
    pub config: GaConfig,
}

impl GeneticSearch {
    pub fn new() -> Self {
        GeneticSearch {
            config: GaConfig::default(),
        }
    }

    pub fn with_config(config: GaConfig) -> Self {
        GeneticSearch { config }
    }

    fn validate_config(&self) -> Result<()> {
        let cfg = &self.config;
        if cfg.population_size < 2 {
            return Err(SolverError::InvalidInput(format!(
                "population size must be at least 2, got {}",
                cfg.population_size
            )));
        }
        if cfg.elite_count >= cfg.population_size {
            return Err(SolverError::InvalidInput(format!(
                "elite count {} must be below the population size {}",
                cfg.elite_count, cfg.population_size
            )));
        }
        if cfg.tournament_size == 0 {
            return Err(SolverError::InvalidInput(
                "tournament size must be at least 1".into(),
            ));
        }
        for (label, p) in [
            ("crossover", cfg.crossover_prob),
            ("mutation", cfg.mutation_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SolverError::InvalidInput(format!(
                    "{} probability {} outside [0, 1]",
                    label, p
                )));
            }
        }
        Ok(())
    }
}

impl Default for GeneticSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for GeneticSearch {
    fn improve(&self, instance: &TspInstance, tour: &mut Tour) -> Result<SearchStats> {
        self.validate_config()?;

        let cfg = &self.config;
        let matrix = instance.matrix();
        let n = tour.len();
        let initial = tour.length(matrix);
        let mut stats = SearchStats::start_at(initial);

        if n < 3 {
            return Ok(stats);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let mut evaluations = 0u64;

        // seed the population with the incoming tour plus shuffles of it
        let mut population = Vec::with_capacity(cfg.population_size);
        population.push(Individual::new(
            tour.order().to_vec(),
            matrix,
            &mut evaluations,
        ));
        while population.len() < cfg.population_size {
            let mut order = tour.order().to_vec();
            order.shuffle(&mut rng);
            population.push(Individual::new(order, matrix, &mut evaluations));
        }
        population.sort_by_key(|ind| OrderedFloat(ind.length));

        let mut best = population[0].clone();
        let started = Instant::now();
        let mut generation = 0;
        let mut no_improve = 0;

        while generation < cfg.max_generations && no_improve < cfg.max_no_improve {
            if let Some(limit) = cfg.time_limit {
                if started.elapsed().as_secs_f64() >= limit {
                    log::debug!("GA time limit reached at generation {}", generation);
                    break;
                }
            }

            let mut next: Vec<Individual> =
                population.iter().take(cfg.elite_count).cloned().collect();

            while next.len() < cfg.population_size {
                let p1 = tournament_select(&mut rng, &population, cfg.tournament_size).clone();
                let p2 = tournament_select(&mut rng, &population, cfg.tournament_size).clone();

                let mut child = if rng.gen::<f64>() < cfg.crossover_prob {
                    match cfg.crossover {
                        CrossoverKind::Order => order_crossover(&mut rng, &p1.order, &p2.order),
                        CrossoverKind::Cycle => cycle_crossover(&p1.order, &p2.order),
                        CrossoverKind::PartiallyMapped => {
                            pmx_crossover(&mut rng, &p1.order, &p2.order)
                        }
                    }
                } else {
                    p1.order.clone()
                };

                if rng.gen::<f64>() < cfg.mutation_prob {
                    match cfg.mutation {
                        MutationKind::Inversion => mutate_inversion(&mut rng, &mut child),
                        MutationKind::Swap => mutate_swap(&mut rng, &mut child),
                    }
                }

                next.push(Individual::new(child, matrix, &mut evaluations));
            }

            next.sort_by_key(|ind| OrderedFloat(ind.length));

            if next[0].length < best.length - IMPROVEMENT_EPSILON {
                best = next[0].clone();
                no_improve = 0;
            } else {
                no_improve += 1;
            }

            population = next;
            generation += 1;
            stats.history.push(best.length);
        }

        stats.iterations = generation;
        stats.evaluations = evaluations;

        log::debug!(
            "GA finished: {} generations, best length {:.2}",
            generation,
            best.length
        );

        if best.length < initial - IMPROVEMENT_EPSILON {
            *tour = Tour::new(best.order);
        }
        Ok(stats)
    }

    fn name(&self) -> &str {
        "GeneticAlgorithm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    fn is_permutation(order: &[usize]) -> bool {
        Tour::new(order.to_vec()).is_permutation()
    }

    fn shuffled_parents(rng: &mut ChaCha8Rng, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut p1: Vec<usize> = (0..n).collect();
        let mut p2: Vec<usize> = (0..n).collect();
        p1.shuffle(rng);
        p2.shuffle(rng);
        (p1, p2)
    }

    #[test]
    fn test_crossovers_produce_permutations() {
        let mut rng = ChaCha8Rng::seed_from_u64(123);
        for n in [3usize, 5, 8, 17] {
            for _ in 0..25 {
                let (p1, p2) = shuffled_parents(&mut rng, n);

                assert!(is_permutation(&order_crossover(&mut rng, &p1, &p2)));
                assert!(is_permutation(&cycle_crossover(&p1, &p2)));
                assert!(is_permutation(&pmx_crossover(&mut rng, &p1, &p2)));
            }
        }
    }

    #[test]
    fn test_cycle_crossover_inherits_positionwise() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let (p1, p2) = shuffled_parents(&mut rng, 10);

        let child = cycle_crossover(&p1, &p2);
        for k in 0..10 {
            assert!(child[k] == p1[k] || child[k] == p2[k]);
        }
    }

    #[test]
    fn test_mutations_preserve_permutations() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut order: Vec<usize> = (0..12).collect();
        order.shuffle(&mut rng);

        for _ in 0..50 {
            mutate_inversion(&mut rng, &mut order);
            assert!(is_permutation(&order));
            mutate_swap(&mut rng, &mut order);
            assert!(is_permutation(&order));
        }
    }

    fn cross_instance() -> TspInstance {
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 1.0),
            City::new(2, 0.0, 1.0),
            City::new(3, 1.0, 0.0),
        ];
        TspInstance::from_cities("cross", cities).unwrap()
    }

    #[test]
    fn test_ga_finds_square_optimum() {
        let instance = cross_instance();
        let mut tour = Tour::new(vec![0, 1, 2, 3]);

        let ga = GeneticSearch::with_config(GaConfig {
            population_size: 20,
            max_generations: 60,
            ..Default::default()
        });
        let stats = ga.improve(&instance, &mut tour).unwrap();

        assert!(stats.iterations > 0);
        assert!((tour.length(instance.matrix()) - 4.0).abs() < 1e-9);
        assert!(tour.is_permutation());
    }

    #[test]
    fn test_ga_never_worsens_the_incoming_tour() {
        let instance = cross_instance();
        // already optimal
        let mut tour = Tour::new(vec![0, 2, 1, 3]);
        let before = tour.length(instance.matrix());

        GeneticSearch::new().improve(&instance, &mut tour).unwrap();

        assert!(tour.length(instance.matrix()) <= before + IMPROVEMENT_EPSILON);
    }

    #[test]
    fn test_ga_is_deterministic_per_seed() {
        let instance = cross_instance();
        let ga = GeneticSearch::with_config(GaConfig {
            population_size: 10,
            max_generations: 30,
            seed: 77,
            ..Default::default()
        });

        let mut a = Tour::new(vec![0, 1, 2, 3]);
        let mut b = Tour::new(vec![0, 1, 2, 3]);
        let stats_a = ga.improve(&instance, &mut a).unwrap();
        let stats_b = ga.improve(&instance, &mut b).unwrap();

        assert_eq!(a.order(), b.order());
        assert_eq!(stats_a.history, stats_b.history);
    }

    #[test]
    fn test_ga_rejects_bad_config() {
        let instance = cross_instance();
        let mut tour = Tour::new(vec![0, 1, 2, 3]);

        let ga = GeneticSearch::with_config(GaConfig {
            population_size: 1,
            ..Default::default()
        });
        assert!(ga.improve(&instance, &mut tour).is_err());

        let ga = GeneticSearch::with_config(GaConfig {
            mutation_prob: 1.5,
            ..Default::default()
        });
        assert!(ga.improve(&instance, &mut tour).is_err());
    }
}
