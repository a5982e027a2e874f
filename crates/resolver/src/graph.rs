//! Concretized graph types and construction
//!
//! The solver's successful output: an immutable DAG of fully resolved
//! specs in topological order (dependencies before dependents), with O(1)
//! lookup by package name. Two graphs compare equal exactly when they hold
//! the same nodes with identical assignments and edges, which is what the
//! reproducibility tests check.

use crate::solve::domain::State;
use serde::Serialize;
use sprig_errors::{Error, Result, SolveError};
use sprig_repo::Repository;
use sprig_types::{
    BuildSystem, CompilerSpec, EdgeKinds, VariantAssignment, Version,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// A resolved dependency edge of a concretized spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEdge {
    /// Provider package name
    pub provider: String,
    /// Union of the kinds of every recipe edge that resolved to this one
    pub kinds: EdgeKinds,
}

/// A fully resolved package spec
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcretizedSpec {
    pub name: String,
    pub version: Version,
    /// Total assignment: one value per declared variant
    pub variants: VariantAssignment,
    pub compiler: Option<CompilerSpec>,
    pub build_system: BuildSystem,
    /// Edges whose condition held under the final assignment, in recipe
    /// declaration order with duplicate providers merged
    pub edges: Vec<ResolvedEdge>,
    /// Patch files applicable under the final assignment; informational
    /// only, the solver never reasons about them
    pub patches: Vec<String>,
}

impl fmt::Display for ConcretizedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)?;
        if !self.variants.is_empty() {
            write!(f, " {}", self.variants)?;
        }
        if let Some(compiler) = &self.compiler {
            write!(f, " {compiler}")?;
        }
        Ok(())
    }
}

/// The solver's output: concretized specs in topological order
#[derive(Debug, Clone, Serialize)]
pub struct ConcretizedGraph {
    nodes: Vec<ConcretizedSpec>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ConcretizedGraph {
    fn new(nodes: Vec<ConcretizedSpec>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name.clone(), i))
            .collect();
        Self { nodes, index }
    }

    /// Look up a node by package name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ConcretizedSpec> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Nodes in topological order, dependencies before dependents
    pub fn nodes_in_order(&self) -> impl Iterator<Item = &ConcretizedSpec> {
        self.nodes.iter()
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl PartialEq for ConcretizedGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

/// Assemble the final graph from a fully assigned search state
///
/// Only nodes reachable from the root through edges whose condition holds
/// under the final assignment are included; nodes that were expanded
/// tentatively but whose incoming conditions resolved false are dropped.
pub(crate) fn build(
    repository: &Repository,
    state: &State,
    active: &[bool],
    compiler: Option<&CompilerSpec>,
) -> Result<ConcretizedGraph> {
    let mut specs: BTreeMap<String, ConcretizedSpec> = BTreeMap::new();

    for (idx, node) in state.nodes.iter().enumerate() {
        if !active[idx] {
            continue;
        }
        if !node.is_concrete() {
            return Err(Error::internal(format!(
                "graph construction reached non-concrete node {}",
                node.name
            )));
        }

        let recipe = repository.recipe(&node.name)?;
        let ctx = state.condition_context(idx, compiler);

        let mut edges: Vec<ResolvedEdge> = Vec::new();
        for dependency in recipe.dependencies() {
            if !dependency.when.eval(&ctx).is_true() {
                continue;
            }
            match edges.iter_mut().find(|e| e.provider == dependency.provider) {
                Some(edge) => {
                    edge.kinds.build |= dependency.kinds.build;
                    edge.kinds.link |= dependency.kinds.link;
                    edge.kinds.run |= dependency.kinds.run;
                }
                None => edges.push(ResolvedEdge {
                    provider: dependency.provider.clone(),
                    kinds: dependency.kinds,
                }),
            }
        }

        let patches: Vec<String> = recipe
            .patches()
            .iter()
            .filter(|p| p.when.eval(&ctx).is_true())
            .map(|p| p.file.clone())
            .collect();

        specs.insert(
            node.name.clone(),
            ConcretizedSpec {
                name: node.name.clone(),
                version: node.versions[0].clone(),
                variants: node.assignment.clone(),
                compiler: compiler.cloned(),
                build_system: recipe.build_system,
                edges,
                patches,
            },
        );
    }

    topological(specs)
}

/// Kahn's algorithm with a sorted ready set, so the order is deterministic
/// for identical input
fn topological(specs: BTreeMap<String, ConcretizedSpec>) -> Result<ConcretizedGraph> {
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut consumers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, spec) in &specs {
        in_degree.entry(name.as_str()).or_insert(0);
        for edge in &spec.edges {
            if let Some((provider, _)) = specs.get_key_value(edge.provider.as_str()) {
                *in_degree.entry(name.as_str()).or_insert(0) += 1;
                consumers
                    .entry(provider.as_str())
                    .or_default()
                    .push(name.as_str());
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter_map(|(&name, &degree)| (degree == 0).then_some(name))
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(specs.len());

    while let Some(&name) = ready.iter().next() {
        ready.remove(name);
        order.push(name.to_string());
        for &consumer in consumers.get(name).into_iter().flatten() {
            let degree = in_degree
                .get_mut(consumer)
                .ok_or_else(|| Error::internal("topological sort lost a node"))?;
            *degree -= 1;
            if *degree == 0 {
                ready.insert(consumer);
            }
        }
    }

    if order.len() != specs.len() {
        // A cycle survived into the final assignment; report its node
        // sequence just as expansion does for unconditional cycles
        return Err(Error::Solve(SolveError::CyclicDependency {
            cycle: find_cycle(&specs),
        }));
    }

    let mut specs = specs;
    let nodes = order
        .iter()
        .filter_map(|name| specs.remove(name))
        .collect();
    Ok(ConcretizedGraph::new(nodes))
}

/// DFS with a recursion stack to render one cycle's node sequence
fn find_cycle(specs: &BTreeMap<String, ConcretizedSpec>) -> Vec<String> {
    fn visit<'a>(
        specs: &'a BTreeMap<String, ConcretizedSpec>,
        name: &'a str,
        visited: &mut BTreeSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        if let Some(start) = path.iter().position(|&n| n == name) {
            let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
            cycle.push(name.to_string());
            return Some(cycle);
        }
        if !visited.insert(name) {
            return None;
        }
        path.push(name);
        if let Some(spec) = specs.get(name) {
            for edge in &spec.edges {
                if let Some(cycle) = visit(specs, &edge.provider, visited, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        None
    }

    let mut visited = BTreeSet::new();
    for name in specs.keys() {
        let mut path = Vec::new();
        if let Some(cycle) = visit(specs, name, &mut visited, &mut path) {
            return cycle;
        }
    }
    Vec::new()
}
