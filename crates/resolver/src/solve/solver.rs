//! Backtracking search with constraint propagation

use super::conflict::{ConflictSet, SearchFailure};
use super::domain::State;
use crate::builder;
use crate::graph::{self, ConcretizedGraph};
use sprig_errors::{Error, Result};
use sprig_events::{Event, EventEmitter, EventSender};
use sprig_repo::Repository;
use sprig_types::{CompilerSpec, Spec, VariantRequirement, VersionRange};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A decision variable: one node's version choice or one of its variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    Version(usize),
    Variant(usize, usize),
}

/// One search over one root request
pub(crate) struct Searcher<'a> {
    pub repository: &'a Repository,
    pub compiler: Option<CompilerSpec>,
    pub cancel: Option<Arc<AtomicBool>>,
    pub events: Option<EventSender>,
}

impl Searcher<'_> {
    /// Run the full concretization for a root request
    pub fn solve(&self, root: &Spec) -> Result<ConcretizedGraph> {
        // Surface bad input before any search work
        self.repository.recipe(&root.name)?;
        for (variant, value) in root.variants.iter() {
            self.repository.check_variant(&root.name, variant, value)?;
        }

        let mut state = State::new();
        state.add_node(self.repository, &root.name)?;
        if let Err(failure) = state.apply_request(0, root) {
            return Err(self.failure_to_error(failure));
        }

        let expansion = builder::expand(self.repository, &mut state, self.compiler.as_ref())?;
        self.emit_expanded(&expansion.added);
        builder::check_static_cycles(self.repository, &state)?;

        match self.search(state, 0) {
            Ok((state, active)) => {
                let graph =
                    graph::build(self.repository, &state, &active, self.compiler.as_ref())?;
                for node in graph.nodes_in_order() {
                    for edge in &node.edges {
                        self.events.emit(Event::EdgeActivated {
                            consumer: node.name.clone(),
                            provider: edge.provider.clone(),
                        });
                    }
                }
                Ok(graph)
            }
            Err(failure) => Err(self.failure_to_error(failure)),
        }
    }

    /// One level of the backtracking search: propagate to a fixpoint, pick
    /// the most constrained variable, and try its values in preference
    /// order against a cloned state
    fn search(&self, mut state: State, depth: usize) -> SearchResult {
        self.check_cancelled()?;
        let active = self.propagate(&mut state)?;

        let Some(variable) = pick_variable(&state, &active) else {
            // Every active node is concrete and, since conditions only
            // reference their own consumer, every edge is now definite
            return Ok((state, active));
        };

        match variable {
            Variable::Version(idx) => self.try_versions(&state, idx, depth),
            Variable::Variant(idx, slot) => self.try_variant_values(&state, idx, slot, depth),
        }
    }

    fn try_versions(&self, state: &State, idx: usize, depth: usize) -> SearchResult {
        let candidates = state.nodes[idx].versions.clone();
        let package = state.nodes[idx].name.clone();
        let mut conflicts = ConflictSet::new();

        for version in candidates {
            self.check_cancelled()?;
            self.events.emit(Event::VersionSelected {
                package: package.clone(),
                version: version.clone(),
            });

            let mut child = state.clone();
            child.nodes[idx].versions = vec![version];
            match self.search(child, depth + 1) {
                Ok(done) => return Ok(done),
                Err(SearchFailure::Fatal(error)) => return Err(SearchFailure::Fatal(error)),
                Err(SearchFailure::Conflict(set)) => {
                    self.events.emit(Event::Backtracked {
                        package: package.clone(),
                        depth,
                    });
                    conflicts.merge(set);
                }
            }
        }

        conflicts.merge(ConflictSet::from_origins(
            state.nodes[idx].version_origins.clone(),
        ));
        Err(SearchFailure::Conflict(conflicts))
    }

    fn try_variant_values(
        &self,
        state: &State,
        idx: usize,
        slot: usize,
        depth: usize,
    ) -> SearchResult {
        let candidates = state.nodes[idx].variants[slot].candidates.clone();
        let package = state.nodes[idx].name.clone();
        let mut conflicts = ConflictSet::new();

        for value in candidates {
            self.check_cancelled()?;

            let mut child = state.clone();
            child.nodes[idx].variants[slot].candidates = vec![value];
            match self.search(child, depth + 1) {
                Ok(done) => return Ok(done),
                Err(SearchFailure::Fatal(error)) => return Err(SearchFailure::Fatal(error)),
                Err(SearchFailure::Conflict(set)) => {
                    self.events.emit(Event::Backtracked {
                        package: package.clone(),
                        depth,
                    });
                    conflicts.merge(set);
                }
            }
        }

        conflicts.merge(ConflictSet::from_origins(
            state.nodes[idx].variants[slot].origins.clone(),
        ));
        Err(SearchFailure::Conflict(conflicts))
    }

    /// Re-expand and prune domains until nothing changes
    ///
    /// Each round re-evaluates every edge condition against the current
    /// partial assignments, so edges activate and deactivate as the search
    /// proceeds; constraints are applied only from edges that are
    /// currently true with an active consumer. Returns the active flags of
    /// the final round.
    fn propagate(&self, state: &mut State) -> std::result::Result<Vec<bool>, SearchFailure> {
        loop {
            let expansion = builder::expand(self.repository, state, self.compiler.as_ref())?;
            self.emit_expanded(&expansion.added);
            let mut changed = !expansion.added.is_empty();

            for idx in 0..state.nodes.len() {
                if !expansion.active[idx] {
                    continue;
                }
                changed |= self.apply_edge_constraints(state, idx)?;
                changed |= self.apply_conflict_rules(state, idx)?;
                changed |= state.nodes[idx].commit_singletons();
            }

            if !changed {
                return Ok(expansion.active);
            }
        }
    }

    /// Apply the provider constraints of node `idx`'s currently-true edges
    fn apply_edge_constraints(
        &self,
        state: &mut State,
        idx: usize,
    ) -> std::result::Result<bool, SearchFailure> {
        let recipe = self.repository.recipe(&state.nodes[idx].name)?;
        let consumer = state.nodes[idx].name.clone();

        let mut version_apps: Vec<(String, VersionRange, String)> = Vec::new();
        let mut variant_apps: Vec<(String, VariantRequirement, String)> = Vec::new();
        {
            let ctx = state.condition_context(idx, self.compiler.as_ref());
            for dependency in recipe.dependencies() {
                if !dependency.when.eval(&ctx).is_true() {
                    continue;
                }
                if !dependency.versions.is_any() {
                    let origin = format!(
                        "{consumer} depends on {}@{}",
                        dependency.provider, dependency.versions
                    );
                    version_apps.push((
                        dependency.provider.clone(),
                        dependency.versions.clone(),
                        origin,
                    ));
                }
                for requirement in &dependency.requirements {
                    let origin =
                        format!("{consumer} requires {requirement} on {}", dependency.provider);
                    variant_apps.push((dependency.provider.clone(), requirement.clone(), origin));
                }
            }
        }

        let mut changed = false;
        for (provider, range, origin) in version_apps {
            let provider_idx = self.provider_index(state, &provider)?;
            changed |= state.nodes[provider_idx].restrict_versions(&range, &origin)?;
        }
        for (provider, requirement, origin) in variant_apps {
            let provider_idx = self.provider_index(state, &provider)?;
            changed |= state.nodes[provider_idx].restrict_variant(
                &requirement.name,
                &requirement.value,
                &origin,
            )?;
        }
        Ok(changed)
    }

    /// Apply node `idx`'s own variant mutual-exclusion rules
    fn apply_conflict_rules(
        &self,
        state: &mut State,
        idx: usize,
    ) -> std::result::Result<bool, SearchFailure> {
        let recipe = self.repository.recipe(&state.nodes[idx].name)?;
        let name = state.nodes[idx].name.clone();

        let mut forbidden: Vec<(VariantRequirement, String)> = Vec::new();
        {
            let ctx = state.condition_context(idx, self.compiler.as_ref());
            for conflict in recipe.conflicts() {
                if !conflict.when.eval(&ctx).is_true() {
                    continue;
                }
                let origin = if conflict.when.is_always() {
                    format!("{name} conflicts with {}", conflict.forbidden)
                } else {
                    format!("{name} conflicts with {} when {}", conflict.forbidden, conflict.when)
                };
                forbidden.push((conflict.forbidden.clone(), origin));
            }
        }

        let mut changed = false;
        for (requirement, origin) in forbidden {
            changed |= state.nodes[idx].forbid_variant(
                &requirement.name,
                &requirement.value,
                &origin,
            )?;
        }
        Ok(changed)
    }

    fn provider_index(
        &self,
        state: &State,
        provider: &str,
    ) -> std::result::Result<usize, SearchFailure> {
        state.get(provider).ok_or_else(|| {
            SearchFailure::Fatal(Error::internal(format!(
                "active edge to unexpanded node {provider}"
            )))
        })
    }

    fn check_cancelled(&self) -> std::result::Result<(), SearchFailure> {
        let cancelled = self
            .cancel
            .as_ref()
            .is_some_and(|token| token.load(Ordering::Relaxed));
        if cancelled {
            return Err(SearchFailure::Fatal(Error::Cancelled));
        }
        Ok(())
    }

    fn emit_expanded(&self, added: &[String]) {
        for package in added {
            self.events.emit(Event::NodeExpanded {
                package: package.clone(),
            });
        }
    }

    fn failure_to_error(&self, failure: SearchFailure) -> Error {
        match failure {
            SearchFailure::Fatal(error) => error,
            SearchFailure::Conflict(set) => {
                self.events.emit(Event::ConflictDetected {
                    constraints: set.origins().map(String::from).collect(),
                });
                set.into_error()
            }
        }
    }
}

type SearchResult = std::result::Result<(State, Vec<bool>), SearchFailure>;

/// Most-constrained-variable ordering: the open variable with the smallest
/// live domain, ties broken by node insertion order, then version before
/// variants, then variant declaration order
fn pick_variable(state: &State, active: &[bool]) -> Option<Variable> {
    let mut best: Option<(usize, Variable)> = None;
    for (idx, node) in state.nodes.iter().enumerate() {
        if !active[idx] {
            continue;
        }
        consider(&mut best, node.versions.len(), Variable::Version(idx));
        for (slot, variant) in node.variants.iter().enumerate() {
            consider(&mut best, variant.candidates.len(), Variable::Variant(idx, slot));
        }
    }
    best.map(|(_, variable)| variable)
}

fn consider(best: &mut Option<(usize, Variable)>, size: usize, variable: Variable) {
    if size > 1 && best.as_ref().is_none_or(|&(b, _)| size < b) {
        *best = Some((size, variable));
    }
}
