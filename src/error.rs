//! Error types shared across the solver.

use thiserror::Error;

/// Errors surfaced by instance loading, configuration and solving.
#[derive(Debug, Error)]
pub enum SolverError {
    /// City data or configuration rejected before solving starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A tour move referenced out-of-range positions. Indicates a defect in
    /// the move generator, not a recoverable condition.
    #[error("invalid move: positions ({i}, {j}) on a tour of {len} cities")]
    InvalidMove { i: usize, j: usize, len: usize },
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SolverError>;
