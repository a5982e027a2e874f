#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the sprig concretizer
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone for easier handling across the
//! solver's backtracking machinery.

use thiserror::Error;

pub mod recipe;
pub mod solve;
pub mod version;

// Re-export all error types at the root
pub use recipe::RecipeError;
pub use solve::SolveError;
pub use version::VersionError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("recipe error: {0}")]
    Recipe(#[from] RecipeError),

    #[error("solve error: {0}")]
    Solve(#[from] SolveError),

    #[error("version error: {0}")]
    Version(#[from] VersionError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error reports an unsatisfiable request, as opposed to
    /// bad input or cancellation
    #[must_use]
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, Self::Solve(SolveError::Unsatisfiable { .. }))
    }
}

/// Result type alias for sprig operations
pub type Result<T> = std::result::Result<T, Error>;
