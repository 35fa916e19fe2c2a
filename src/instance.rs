//! Module for parsing and representing symmetric TSP instances.
//!
//! Instances come from two file formats: TSPLIB-style coordinate files
//! (`NODE_COORD_SECTION`, Euclidean 2D) and plain distance-matrix files
//! (first line holds the city count, followed by a full square matrix).
//! Either way the result is a [`TspInstance`] owning a validated
//! [`DistanceMatrix`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// A city: stable integer identifier plus a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// City identifier (1-indexed in files, 0-indexed internally)
    pub id: usize,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl City {
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        City { id, x, y }
    }
}

/// Precomputed pairwise distances, row-major.
///
/// Symmetric with a zero diagonal; lookups are O(1) after the O(n²) build.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    dimension: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Build the Euclidean matrix from a city list.
    ///
    /// Rejects fewer than 2 cities and any non-finite coordinate.
    pub fn from_cities(cities: &[City]) -> Result<Self> {
        if cities.len() < 2 {
            return Err(SolverError::InvalidInput(format!(
                "need at least 2 cities to build a distance matrix, got {}",
                cities.len()
            )));
        }
        for city in cities {
            if !city.x.is_finite() || !city.y.is_finite() {
                return Err(SolverError::InvalidInput(format!(
                    "city {} has a non-finite coordinate ({}, {})",
                    city.id, city.x, city.y
                )));
            }
        }

        let n = cities.len();
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = cities[i].x - cities[j].x;
                let dy = cities[i].y - cities[j].y;
                let d = (dx * dx + dy * dy).sqrt();
                values[i * n + j] = d;
                values[j * n + i] = d;
            }
        }

        Ok(DistanceMatrix {
            dimension: n,
            values,
        })
    }

    /// Build from explicit rows, as read from a matrix file.
    ///
    /// Rows must form a square, symmetric, non-negative, finite matrix with a
    /// zero diagonal.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        if n < 2 {
            return Err(SolverError::InvalidInput(format!(
                "need at least 2 cities to build a distance matrix, got {}",
                n
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(SolverError::InvalidInput(format!(
                    "row {} has {} columns, expected {}",
                    i + 1,
                    row.len(),
                    n
                )));
            }
        }

        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let d = rows[i][j];
                if !d.is_finite() {
                    return Err(SolverError::InvalidInput(format!(
                        "non-finite distance between cities {} and {}",
                        i + 1,
                        j + 1
                    )));
                }
                if d < 0.0 {
                    return Err(SolverError::InvalidInput(format!(
                        "negative distance between cities {} and {}: {}",
                        i + 1,
                        j + 1,
                        d
                    )));
                }
                if i == j && d != 0.0 {
                    return Err(SolverError::InvalidInput(format!(
                        "non-zero diagonal entry for city {}: {}",
                        i + 1,
                        d
                    )));
                }
                if (d - rows[j][i]).abs() > 1e-9 {
                    return Err(SolverError::InvalidInput(format!(
                        "distance matrix is not symmetric at ({}, {}): {} vs {}",
                        i + 1,
                        j + 1,
                        d,
                        rows[j][i]
                    )));
                }
                values[i * n + j] = d;
            }
        }

        Ok(DistanceMatrix {
            dimension: n,
            values,
        })
    }

    /// Number of cities covered by this matrix.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Distance between cities `i` and `j`.
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.dimension + j]
    }
}

/// A complete solvable instance: city data plus its distance matrix.
#[derive(Debug, Clone)]
pub struct TspInstance {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// City list with coordinates. Empty for matrix-file instances, which
    /// carry no geometry.
    pub cities: Vec<City>,
    /// Precomputed distance matrix
    matrix: DistanceMatrix,
}

impl TspInstance {
    /// Build an instance from in-memory city records.
    ///
    /// City identifiers must match their position in the list.
    pub fn from_cities<S: Into<String>>(name: S, cities: Vec<City>) -> Result<Self> {
        for (pos, city) in cities.iter().enumerate() {
            if city.id != pos {
                return Err(SolverError::InvalidInput(format!(
                    "city id {} at position {} (ids must be dense and ordered)",
                    city.id, pos
                )));
            }
        }
        let matrix = DistanceMatrix::from_cities(&cities)?;
        Ok(TspInstance {
            name: name.into(),
            comment: String::new(),
            cities,
            matrix,
        })
    }

    /// Build a coordinate-less instance directly from a distance matrix.
    pub fn from_matrix<S: Into<String>>(name: S, matrix: DistanceMatrix) -> Self {
        TspInstance {
            name: name.into(),
            comment: String::new(),
            cities: Vec::new(),
            matrix,
        }
    }

    /// Parse a TSPLIB-style coordinate file (`NODE_COORD_SECTION`).
    pub fn from_tsplib_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| SolverError::InvalidInput(format!("cannot open file: {}", e)))?;
        let reader = BufReader::new(file);

        let mut name = String::new();
        let mut comment = String::new();
        let mut dimension = 0usize;
        let mut coords: Vec<(usize, f64, f64)> = Vec::new();
        let mut in_coords = false;

        for line in reader.lines() {
            let line = line.map_err(|e| SolverError::InvalidInput(format!("read error: {}", e)))?;
            let line = line.trim();

            if line.is_empty() || line == "EOF" {
                continue;
            }

            if line.starts_with("NAME:") {
                name = line.replace("NAME:", "").trim().to_string();
                continue;
            }
            if line.starts_with("COMMENT:") {
                comment = line.replace("COMMENT:", "").trim().to_string();
                continue;
            }
            if line.starts_with("DIMENSION:") {
                dimension = line
                    .replace("DIMENSION:", "")
                    .trim()
                    .parse()
                    .map_err(|_| SolverError::InvalidInput("invalid dimension".into()))?;
                continue;
            }
            if line.starts_with("EDGE_WEIGHT_TYPE:") || line.starts_with("TYPE:") {
                continue;
            }
            if line.starts_with("NODE_COORD_SECTION") {
                in_coords = true;
                continue;
            }

            if in_coords {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 3 {
                    let id: usize = parts[0]
                        .parse()
                        .map_err(|_| SolverError::InvalidInput("invalid city id".into()))?;
                    let x: f64 = parts[1]
                        .parse()
                        .map_err(|_| SolverError::InvalidInput("invalid x coordinate".into()))?;
                    let y: f64 = parts[2]
                        .parse()
                        .map_err(|_| SolverError::InvalidInput("invalid y coordinate".into()))?;
                    coords.push((id, x, y));
                }
            }
        }

        if dimension != 0 && coords.len() != dimension {
            return Err(SolverError::InvalidInput(format!(
                "file declares {} cities but contains {} coordinate rows",
                dimension,
                coords.len()
            )));
        }

        let cities: Vec<City> = coords
            .iter()
            .map(|&(id, x, y)| City::new(id.saturating_sub(1), x, y))
            .collect();

        log::info!("loaded {} cities from coordinate file", cities.len());
        let mut instance = TspInstance::from_cities(name, cities)?;
        instance.comment = comment;
        Ok(instance)
    }

    /// Parse a plain distance-matrix file.
    ///
    /// First line: city count. Then one matrix row per line, whitespace
    /// separated. The matrix must be full, symmetric and non-negative.
    pub fn from_matrix_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| SolverError::InvalidInput(format!("cannot open file: {}", e)))?;
        let reader = BufReader::new(file);

        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| SolverError::InvalidInput(format!("read error: {}", e)))?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }

        let Some(first) = lines.first() else {
            return Err(SolverError::InvalidInput("empty matrix file".into()));
        };
        let n: usize = first
            .trim()
            .parse()
            .map_err(|_| SolverError::InvalidInput("invalid city count".into()))?;

        if lines.len() < n + 1 {
            return Err(SolverError::InvalidInput(format!(
                "file contains {} matrix rows, expected {}",
                lines.len().saturating_sub(1),
                n
            )));
        }

        let mut rows = Vec::with_capacity(n);
        for (i, line) in lines[1..=n].iter().enumerate() {
            let row: Vec<f64> = line
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<f64>().map_err(|_| {
                        SolverError::InvalidInput(format!("invalid distance in row {}", i + 1))
                    })
                })
                .collect::<Result<_>>()?;
            rows.push(row);
        }

        let matrix = DistanceMatrix::from_rows(rows)?;

        let name = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        log::info!("loaded {}x{} distance matrix from file", n, n);
        Ok(TspInstance::from_matrix(name, matrix))
    }

    /// Number of cities.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.matrix.dimension()
    }

    /// Distance between two cities.
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.matrix.distance(i, j)
    }

    /// The owned distance matrix.
    #[inline]
    pub fn matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }

    /// Whether the instance carries coordinates (and can be plotted).
    pub fn has_coordinates(&self) -> bool {
        !self.cities.is_empty()
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.dimension();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max: f64 = 0.0;
        let mut count = 0usize;
        for i in 0..n {
            for j in (i + 1)..n {
                let d = self.distance(i, j);
                sum += d;
                min = min.min(d);
                max = max.max(d);
                count += 1;
            }
        }

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            has_coordinates: self.has_coordinates(),
            avg_distance: sum / count as f64,
            min_distance: min,
            max_distance: max,
        }
    }
}

/// Statistics about a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub has_coordinates: bool,
    pub avg_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.dimension)?;
        writeln!(f, "  Coordinates: {}", self.has_coordinates)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Min distance: {:.2}", self.min_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_calculation() {
        let cities = vec![City::new(0, 0.0, 0.0), City::new(1, 3.0, 4.0)];
        let matrix = DistanceMatrix::from_cities(&cities).unwrap();

        assert!((matrix.distance(0, 1) - 5.0).abs() < 1e-10);
        assert!((matrix.distance(1, 0) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_matrix_symmetry_and_diagonal() {
        let cities = vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 0.0),
            City::new(2, 0.5, 2.0),
            City::new(3, -1.0, 1.0),
        ];
        let matrix = DistanceMatrix::from_cities(&cities).unwrap();

        for i in 0..4 {
            assert_eq!(matrix.distance(i, i), 0.0);
            for j in 0..4 {
                assert_eq!(matrix.distance(i, j), matrix.distance(j, i));
            }
        }
    }

    #[test]
    fn test_too_few_cities_rejected() {
        assert!(DistanceMatrix::from_cities(&[]).is_err());
        assert!(DistanceMatrix::from_cities(&[City::new(0, 0.0, 0.0)]).is_err());
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let cities = vec![City::new(0, 0.0, 0.0), City::new(1, f64::NAN, 1.0)];
        assert!(DistanceMatrix::from_cities(&cities).is_err());
    }

    #[test]
    fn test_from_rows_validation() {
        // not square
        assert!(DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0]]).is_err());
        // asymmetric
        assert!(DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![2.0, 0.0]]).is_err());
        // negative
        assert!(DistanceMatrix::from_rows(vec![vec![0.0, -1.0], vec![-1.0, 0.0]]).is_err());
        // valid
        let m = DistanceMatrix::from_rows(vec![vec![0.0, 7.0], vec![7.0, 0.0]]).unwrap();
        assert_eq!(m.distance(0, 1), 7.0);
    }

    #[test]
    fn test_instance_rejects_misnumbered_cities() {
        let cities = vec![City::new(0, 0.0, 0.0), City::new(2, 1.0, 1.0)];
        assert!(TspInstance::from_cities("bad", cities).is_err());
    }
}
