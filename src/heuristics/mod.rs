//! Heuristics module for the TNRP.
//!
//! This module exports the construction heuristics, the shared neighbourhood
//! and repair operators, and the search drivers built on them.

pub mod construction;
pub mod neighbourhood;
pub mod repair;
pub mod aco;
pub mod genetic;
pub mod annealing;
pub mod random_search;

pub use construction::*;
pub use neighbourhood::*;
pub use repair::*;
pub use aco::*;
pub use genetic::*;
pub use annealing::*;
pub use random_search::*;
