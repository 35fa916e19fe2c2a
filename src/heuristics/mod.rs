//! Heuristics module.
//!
//! Exports the construction and improvement heuristics.

pub mod construction;
pub mod genetic;
pub mod local_search;

pub use construction::*;
pub use genetic::*;
pub use local_search::*;
