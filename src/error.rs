//! Error types for network loading and search drivers.

use std::fmt::{self, Display};

/// Errors raised while building, generating or loading a network.
#[derive(Debug)]
pub enum NetworkError {
    /// An I/O error occurred while reading or writing a model file.
    Io(std::io::Error),
    /// A line of the text model could not be parsed.
    Parse {
        /// 1-based line number in the model file.
        line: usize,
        /// Human readable reason.
        reason: String,
    },
    /// The supplies do not sum to zero.
    UnbalancedSupply(i64),
    /// A network needs at least one depot.
    Empty,
    /// Depot identities in a model file are not exactly `0..n`.
    NonContiguousIds,
    /// Generator parameters cannot produce a valid network.
    InvalidParameters(String),
}

impl Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse { line, reason } => write!(f, "Parse error on line {line}: {reason}"),
            Self::UnbalancedSupply(sum) => {
                write!(f, "Depot supplies must sum to zero (sum is {sum})")
            }
            Self::Empty => write!(f, "A network must contain at least one depot"),
            Self::NonContiguousIds => {
                write!(f, "Depot identities must be the contiguous range 0..n")
            }
            Self::InvalidParameters(msg) => write!(f, "Invalid generator parameters: {msg}"),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Precondition and configuration failures reported by the search drivers.
///
/// These are returned instead of panicking so that batch experiments can
/// log the case and move on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The network has fewer than two depots.
    DegenerateNetwork(usize),
    /// Every depot is already balanced, there is nothing to search for.
    NothingToResolve,
    /// The neighbour move needs two distinct surplus and two distinct
    /// deficit depots.
    InsufficientDepots {
        /// Number of surplus depots in the network.
        surplus: usize,
        /// Number of deficit depots in the network.
        deficit: usize,
    },
    /// A hyper-parameter is out of range.
    InvalidConfig(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateNetwork(n) => {
                write!(f, "Network has {n} depot(s), at least 2 are required")
            }
            Self::NothingToResolve => write!(f, "Every depot is already balanced"),
            Self::InsufficientDepots { surplus, deficit } => write!(
                f,
                "Neighbour generation needs at least 2 surplus and 2 deficit depots \
                 (found {surplus} surplus, {deficit} deficit)"
            ),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for SearchError {}
