//! Finite-domain constraint solver
//!
//! This module implements the backtracking search that assigns a concrete
//! version and a total variant set to every node of the constraint graph.
//! It supports:
//! - domain pruning after every assignment (arc-consistency style)
//! - most-constrained-variable ordering with deterministic tie-breaks
//! - newest-version and declared-default preference
//! - conflict-set tracking for unsatisfiability reports
//! - cooperative cancellation at every choice point

pub(crate) mod conflict;
pub(crate) mod domain;
mod solver;

pub(crate) use solver::Searcher;
