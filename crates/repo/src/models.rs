//! Recipe data models
//!
//! A recipe is the declarative description of one package: its buildable
//! versions, its variants, its conditional dependency edges, and its patch
//! annotations. Recipes are produced by an external loader (or the
//! [`crate::RecipeBuilder`]) and consumed read-only by the solver.

use serde::{Deserialize, Serialize};
use sprig_types::{
    BuildSystem, Condition, EdgeKinds, VariantDecl, VariantRequirement, Version, VersionRange,
};

/// A dependency edge template as declared by a recipe
///
/// `when` is evaluated against the *consumer's* own assignment; `versions`
/// and `requirements` constrain the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyTemplate {
    /// Package name of the provider
    pub provider: String,
    /// Edge kinds, default build+link
    #[serde(default)]
    pub kinds: EdgeKinds,
    /// Condition gating the edge, default always
    #[serde(default)]
    pub when: Condition,
    /// Version range required of the provider
    #[serde(default = "VersionRange::any")]
    pub versions: VersionRange,
    /// Variant values required of the provider, e.g. `+python`
    #[serde(default)]
    pub requirements: Vec<VariantRequirement>,
}

/// A patch declaration: an informational annotation, never a constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchDecl {
    /// Patch file name as shipped with the recipe
    pub file: String,
    /// Condition under which the patch applies
    #[serde(default)]
    pub when: Condition,
}

/// A declared mutual-exclusion rule on this package's own variants:
/// `forbidden` must not hold whenever `when` holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConflict {
    pub forbidden: VariantRequirement,
    #[serde(default)]
    pub when: Condition,
}

/// A package recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    /// Declared versions, newest first
    pub(crate) versions: Vec<Version>,
    /// Declared variants in declaration order
    pub(crate) variants: Vec<VariantDecl>,
    pub(crate) dependencies: Vec<DependencyTemplate>,
    pub(crate) conflicts: Vec<VariantConflict>,
    pub(crate) patches: Vec<PatchDecl>,
    pub build_system: BuildSystem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl Recipe {
    /// Declared versions, newest first
    #[must_use]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Declared variants in declaration order
    #[must_use]
    pub fn variants(&self) -> &[VariantDecl] {
        &self.variants
    }

    /// Look up one variant declaration by name
    #[must_use]
    pub fn variant(&self, name: &str) -> Option<&VariantDecl> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Declared dependency edge templates in declaration order
    #[must_use]
    pub fn dependencies(&self) -> &[DependencyTemplate] {
        &self.dependencies
    }

    /// Declared variant mutual-exclusion rules
    #[must_use]
    pub fn conflicts(&self) -> &[VariantConflict] {
        &self.conflicts
    }

    /// Declared patches
    #[must_use]
    pub fn patches(&self) -> &[PatchDecl] {
        &self.patches
    }
}
