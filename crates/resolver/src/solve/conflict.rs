//! Conflict tracking for unsatisfiability reporting
//!
//! Every constraint the solver applies carries a rendered origin string
//! (`"gaudi depends on python@:3.7.99"`). When a domain is wiped out the
//! origins that pruned it form the conflict set; sets from sibling
//! branches merge on the way up, so the set reported at root exhaustion is
//! the collection of constraints that could not be jointly satisfied.

use sprig_errors::{Error, SolveError};
use std::collections::BTreeSet;

/// A set of rendered constraints involved in a failure, deduplicated and
/// sorted for deterministic reports
#[derive(Debug, Clone, Default)]
pub(crate) struct ConflictSet {
    origins: BTreeSet<String>,
}

impl ConflictSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_origins(origins: impl IntoIterator<Item = String>) -> Self {
        Self {
            origins: origins.into_iter().collect(),
        }
    }

    pub fn merge(&mut self, other: Self) {
        self.origins.extend(other.origins);
    }

    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }

    pub fn into_error(self) -> Error {
        Error::Solve(SolveError::unsatisfiable(self.origins))
    }
}

/// Why a search branch (or the whole search) stopped
#[derive(Debug)]
pub(crate) enum SearchFailure {
    /// Input error or cancellation: abort the whole solve immediately
    Fatal(Error),
    /// Constraints conflicted on this branch: backtrack and try elsewhere
    Conflict(ConflictSet),
}

impl From<Error> for SearchFailure {
    fn from(error: Error) -> Self {
        Self::Fatal(error)
    }
}
