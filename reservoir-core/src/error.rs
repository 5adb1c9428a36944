//! Error types of the reservoir core

use thiserror::Error;

/// Reservoir core error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReservoirError {
    /// A configuration value is outside its valid domain
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Spectral scaling was requested but the recurrent matrix has no
    /// nonzero eigenvalue
    #[error("degenerate reservoir: maximum eigenvalue magnitude is zero")]
    DegenerateReservoir,

    /// A vector passed at a call site does not match the configured length
    #[error("{what} length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Which vector was mis-sized
        what: &'static str,
        /// The length the configuration dictates
        expected: usize,
        /// The length that was passed in
        actual: usize,
    },

    /// The topology builder ran out of free (source, target) pairs
    #[error("unable to place {requested} connections, only {available} free candidates left")]
    PlacementExhausted {
        /// How many connections still had to be placed
        requested: usize,
        /// How many free candidate pairs remained
        available: usize,
    },
}

/// Result alias of the reservoir core
pub type Result<T> = std::result::Result<T, ReservoirError>;
