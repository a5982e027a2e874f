//! Constraint graph expansion
//!
//! Expands a root request into the full node set the solver works on.
//! Every declared dependency edge is evaluated against its consumer's
//! *current* (possibly partial) assignment: edges that are true or
//! indeterminate are followed, creating provider nodes on first visit;
//! edges that are false are not. Because conditions only reference the
//! consumer's own state, an indeterminate edge becomes definite as soon as
//! the solver finishes assigning the consumer, so expansion and solving
//! iterate: the solver re-runs expansion after every assignment change.

use crate::solve::domain::State;
use sprig_errors::{Error, SolveError};
use sprig_repo::Repository;
use sprig_types::CompilerSpec;
use std::collections::VecDeque;

/// Reachability of the current expansion, indexed by node
pub(crate) struct Expansion {
    /// Reachable from the root via edges whose condition is true; these
    /// nodes carry constraints and must be fully assigned. Nodes reached
    /// only through indeterminate edges exist in the state but stay
    /// unconstrained until a condition resolves.
    pub active: Vec<bool>,
    /// Names of nodes created during this expansion pass
    pub added: Vec<String>,
}

/// Expand from the root (node 0), creating provider nodes reached through
/// true or indeterminate edges, and recompute the active reachability set.
///
/// # Errors
///
/// Returns `UnknownPackage` if an edge names a package with no recipe.
pub(crate) fn expand(
    repository: &Repository,
    state: &mut State,
    compiler: Option<&CompilerSpec>,
) -> Result<Expansion, Error> {
    let mut added = Vec::new();

    // Tentative pass: follow true and indeterminate edges, adding nodes
    let mut tentative = vec![false; state.nodes.len()];
    tentative[0] = true;
    let mut queue = VecDeque::from([0]);
    while let Some(idx) = queue.pop_front() {
        let recipe = repository.recipe(&state.nodes[idx].name)?;
        let followed: Vec<String> = {
            let ctx = state.condition_context(idx, compiler);
            recipe
                .dependencies()
                .iter()
                .filter(|d| !d.when.eval(&ctx).is_false())
                .map(|d| d.provider.clone())
                .collect()
        };
        for provider in followed {
            let provider_idx = match state.get(&provider) {
                Some(provider_idx) => provider_idx,
                None => {
                    let provider_idx = state.add_node(repository, &provider)?;
                    added.push(provider);
                    provider_idx
                }
            };
            if provider_idx >= tentative.len() {
                tentative.resize(state.nodes.len(), false);
            }
            if !tentative[provider_idx] {
                tentative[provider_idx] = true;
                queue.push_back(provider_idx);
            }
        }
    }

    // Active pass: true edges only, over the now-stable node set
    let mut active = vec![false; state.nodes.len()];
    active[0] = true;
    let mut queue = VecDeque::from([0]);
    while let Some(idx) = queue.pop_front() {
        let recipe = repository.recipe(&state.nodes[idx].name)?;
        let ctx = state.condition_context(idx, compiler);
        let followed: Vec<usize> = recipe
            .dependencies()
            .iter()
            .filter(|d| d.when.eval(&ctx).is_true())
            .filter_map(|d| state.get(&d.provider))
            .collect();
        for provider_idx in followed {
            if !active[provider_idx] {
                active[provider_idx] = true;
                queue.push_back(provider_idx);
            }
        }
    }

    Ok(Expansion { active, added })
}

/// Reject cycles on the unconditional edge skeleton
///
/// A cycle among edges whose condition always holds can never terminate,
/// whatever the solver assigns, so it is rejected up front with the node
/// sequence. Cycles that only close under specific assignments are caught
/// at graph construction instead.
pub(crate) fn check_static_cycles(repository: &Repository, state: &State) -> Result<(), Error> {
    let mut visited = vec![false; state.nodes.len()];
    let mut on_path = vec![false; state.nodes.len()];
    let mut path = Vec::new();

    if let Some(cycle) = visit(repository, state, 0, &mut visited, &mut on_path, &mut path)? {
        return Err(Error::Solve(SolveError::CyclicDependency { cycle }));
    }
    Ok(())
}

fn visit(
    repository: &Repository,
    state: &State,
    idx: usize,
    visited: &mut [bool],
    on_path: &mut [bool],
    path: &mut Vec<usize>,
) -> Result<Option<Vec<String>>, Error> {
    visited[idx] = true;
    on_path[idx] = true;
    path.push(idx);

    let recipe = repository.recipe(&state.nodes[idx].name)?;
    for dependency in recipe.dependencies() {
        if !dependency.when.is_always() {
            continue;
        }
        let Some(provider_idx) = state.get(&dependency.provider) else {
            continue;
        };
        if on_path[provider_idx] {
            // Render the cycle from its first occurrence on the path,
            // repeating the entry node at the end
            let start = path.iter().position(|&i| i == provider_idx).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..]
                .iter()
                .map(|&i| state.nodes[i].name.clone())
                .collect();
            cycle.push(state.nodes[provider_idx].name.clone());
            return Ok(Some(cycle));
        }
        if !visited[provider_idx] {
            if let Some(cycle) = visit(repository, state, provider_idx, visited, on_path, path)? {
                return Ok(Some(cycle));
            }
        }
    }

    on_path[idx] = false;
    path.pop();
    Ok(None)
}
