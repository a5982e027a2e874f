//! Search-state domains and assignment bookkeeping
//!
//! Each node in the constraint graph carries a version domain (the live
//! candidate list, preference-ordered) and one value domain per declared
//! variant. Domains only shrink along a search branch; the solver clones
//! the whole state at every choice point and backtracking is a return to
//! the parent clone.

use sprig_errors::{Error, RecipeError};
use sprig_repo::Repository;
use sprig_types::{
    CompilerSpec, ConditionContext, Spec, VariantAssignment, VariantDecl, VariantValue, Version,
};
use std::collections::HashMap;

use super::conflict::{ConflictSet, SearchFailure};

/// One variant of one node: its declaration and the live value domain,
/// preference-ordered (declared default first)
#[derive(Debug, Clone)]
pub(crate) struct VariantSlot {
    pub decl: VariantDecl,
    pub candidates: Vec<VariantValue>,
    /// Rendered constraints that pruned this domain, for conflict reports
    pub origins: Vec<String>,
}

impl VariantSlot {
    fn new(decl: VariantDecl) -> Self {
        let candidates = decl.candidate_values();
        Self {
            decl,
            candidates,
            origins: Vec::new(),
        }
    }
}

/// One package node under concretization
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub name: String,
    /// Live version candidates, newest first, branches last
    pub versions: Vec<Version>,
    pub variants: Vec<VariantSlot>,
    /// Values committed so far; a variant appears here exactly when its
    /// domain has narrowed to a single value
    pub assignment: VariantAssignment,
    /// Rendered version constraints applied to this node
    pub version_origins: Vec<String>,
}

impl Node {
    /// Narrow the version domain to candidates inside `range`; returns
    /// whether anything was pruned
    pub fn restrict_versions(
        &mut self,
        range: &sprig_types::VersionRange,
        origin: &str,
    ) -> Result<bool, SearchFailure> {
        if !self.version_origins.iter().any(|o| o == origin) {
            self.version_origins.push(origin.to_string());
        }
        let before = self.versions.len();
        self.versions.retain(|v| range.contains(v));
        if self.versions.is_empty() {
            return Err(SearchFailure::Conflict(ConflictSet::from_origins(
                self.version_origins.clone(),
            )));
        }
        Ok(self.versions.len() != before)
    }

    /// Force one variant to `value`; returns whether anything was pruned
    pub fn restrict_variant(
        &mut self,
        variant: &str,
        value: &VariantValue,
        origin: &str,
    ) -> Result<bool, SearchFailure> {
        let Some(slot) = self.variants.iter_mut().find(|s| s.decl.name == variant) else {
            return Err(SearchFailure::Fatal(Error::Recipe(
                RecipeError::UnknownVariant {
                    package: self.name.clone(),
                    variant: variant.to_string(),
                },
            )));
        };
        if !slot.origins.iter().any(|o| o == origin) {
            slot.origins.push(origin.to_string());
        }
        let before = slot.candidates.len();
        slot.candidates.retain(|v| v == value);
        if slot.candidates.is_empty() {
            return Err(SearchFailure::Conflict(ConflictSet::from_origins(
                slot.origins.clone(),
            )));
        }
        Ok(slot.candidates.len() != before)
    }

    /// Remove one value from a variant domain; returns whether anything
    /// was pruned
    pub fn forbid_variant(
        &mut self,
        variant: &str,
        value: &VariantValue,
        origin: &str,
    ) -> Result<bool, SearchFailure> {
        let Some(slot) = self.variants.iter_mut().find(|s| s.decl.name == variant) else {
            return Err(SearchFailure::Fatal(Error::Recipe(
                RecipeError::UnknownVariant {
                    package: self.name.clone(),
                    variant: variant.to_string(),
                },
            )));
        };
        if !slot.origins.iter().any(|o| o == origin) {
            slot.origins.push(origin.to_string());
        }
        let before = slot.candidates.len();
        slot.candidates.retain(|v| v != value);
        if slot.candidates.is_empty() {
            return Err(SearchFailure::Conflict(ConflictSet::from_origins(
                slot.origins.clone(),
            )));
        }
        Ok(slot.candidates.len() != before)
    }

    /// Commit every singleton variant domain into the assignment; returns
    /// whether any new value was committed
    pub fn commit_singletons(&mut self) -> bool {
        let mut changed = false;
        for slot in &self.variants {
            if slot.candidates.len() == 1 && self.assignment.get(&slot.decl.name).is_none() {
                self.assignment
                    .set(slot.decl.name.clone(), slot.candidates[0].clone());
                changed = true;
            }
        }
        changed
    }

    /// Check whether version and every variant are down to one candidate
    pub fn is_concrete(&self) -> bool {
        self.versions.len() == 1 && self.variants.iter().all(|s| s.candidates.len() == 1)
    }
}

/// The mutable search state: all nodes expanded so far
#[derive(Debug, Clone)]
pub(crate) struct State {
    pub nodes: Vec<Node>,
    pub index: HashMap<String, usize>,
}

impl State {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Add a node for `name` from its recipe, or return the existing one
    pub fn add_node(&mut self, repository: &Repository, name: &str) -> Result<usize, Error> {
        if let Some(idx) = self.get(name) {
            return Ok(idx);
        }
        let recipe = repository.recipe(name)?;
        let node = Node {
            name: name.to_string(),
            versions: recipe.versions().to_vec(),
            variants: recipe
                .variants()
                .iter()
                .cloned()
                .map(VariantSlot::new)
                .collect(),
            assignment: VariantAssignment::new(),
            version_origins: Vec::new(),
        };
        let idx = self.nodes.len();
        self.nodes.push(node);
        self.index.insert(name.to_string(), idx);
        Ok(idx)
    }

    /// The condition context of one node: its own live candidates and
    /// committed variants, plus the solve's toolchain
    pub fn condition_context<'a>(
        &'a self,
        idx: usize,
        compiler: Option<&'a CompilerSpec>,
    ) -> ConditionContext<'a> {
        let node = &self.nodes[idx];
        ConditionContext {
            versions: &node.versions,
            variants: &node.assignment,
            compiler,
        }
    }

    /// Apply the pins of a root request to its node
    pub fn apply_request(&mut self, idx: usize, root: &Spec) -> Result<(), SearchFailure> {
        if !root.versions.is_any() {
            let origin = format!("request {}@{}", root.name, root.versions);
            self.nodes[idx].restrict_versions(&root.versions, &origin)?;
        }
        for (variant, value) in root.variants.iter() {
            let origin = format!("request {} on {}", value.render(variant), root.name);
            self.nodes[idx].restrict_variant(variant, value, &origin)?;
        }
        self.nodes[idx].commit_singletons();
        Ok(())
    }
}
