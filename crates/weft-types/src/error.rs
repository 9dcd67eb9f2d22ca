//! Error types for the weft solver.
//!
//! Setup-time operations return `WeftResult<T>`. Per-substep solve
//! outcomes are reported as status flags, not errors.

use thiserror::Error;

/// Unified error type for the weft workspace.
#[derive(Debug, Error)]
pub enum WeftError {
    /// Spring or face topology references vertices that do not exist,
    /// or is otherwise inconsistent.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input data (masses, positions, vertex counts) is malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The direct sparse factorization failed.
    #[error("Factorization failed: {0}")]
    Factorization(String),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for `Result<T, WeftError>`.
pub type WeftResult<T> = Result<T, WeftError>;
