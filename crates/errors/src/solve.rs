//! Solver error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveError {
    /// No assignment satisfies all constraints. `conflicts` holds the
    /// rendered constraints that could not be jointly satisfied.
    #[error("unsatisfiable request: {}", .conflicts.join("; "))]
    Unsatisfiable { conflicts: Vec<String> },

    /// Dependency expansion cannot terminate. `cycle` holds the node
    /// sequence, first node repeated at the end.
    #[error("dependency cycle: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },
}

impl SolveError {
    /// Build an `Unsatisfiable` error from an iterator of rendered
    /// constraints, sorted for deterministic output
    pub fn unsatisfiable(conflicts: impl IntoIterator<Item = String>) -> Self {
        let mut conflicts: Vec<String> = conflicts.into_iter().collect();
        conflicts.sort();
        conflicts.dedup();
        Self::Unsatisfiable { conflicts }
    }
}
