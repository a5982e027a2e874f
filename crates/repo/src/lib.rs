#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Recipe repository for the sprig concretizer
//!
//! This crate holds the read-only lookup of package recipes consumed by
//! the solver: declared versions, variants, and conditional dependency
//! edges per package name. Recipes are loaded from recipe files by an
//! external loader (or constructed with [`RecipeBuilder`]); the repository
//! is immutable after load and safely shared behind `Arc` without locking.

mod builder;
mod models;

pub use builder::{Dependency, RecipeBuilder};
pub use models::{DependencyTemplate, PatchDecl, Recipe, VariantConflict};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sprig_errors::{Error, RecipeError, Result};
use sprig_types::{VariantDecl, VariantValue, Version};
use std::collections::BTreeMap;

/// Supported snapshot format version
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// Snapshot metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub format_version: u32,
    pub generated_at: DateTime<Utc>,
}

/// A read-only collection of recipes keyed by package name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    #[serde(flatten)]
    metadata: RepositoryMetadata,
    recipes: BTreeMap<String, Recipe>,
}

impl Repository {
    /// Create an empty repository stamped with the current time
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: RepositoryMetadata {
                format_version: SUPPORTED_FORMAT_VERSION,
                generated_at: Utc::now(),
            },
            recipes: BTreeMap::new(),
        }
    }

    /// Register a recipe
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRecipe` if a recipe with the same name is already
    /// registered.
    pub fn insert(&mut self, recipe: Recipe) -> Result<()> {
        if self.recipes.contains_key(&recipe.name) {
            return Err(Error::Recipe(RecipeError::DuplicateRecipe {
                name: recipe.name,
            }));
        }
        self.recipes.insert(recipe.name.clone(), recipe);
        Ok(())
    }

    /// Look up a recipe by package name
    ///
    /// # Errors
    ///
    /// Returns `UnknownPackage` if no recipe is registered under `name`.
    pub fn recipe(&self, name: &str) -> Result<&Recipe> {
        self.recipes.get(name).ok_or_else(|| {
            Error::Recipe(RecipeError::UnknownPackage {
                name: name.to_string(),
            })
        })
    }

    /// Declared versions of a package, newest first
    ///
    /// # Errors
    ///
    /// Returns `UnknownPackage` if no recipe is registered under `name`.
    pub fn declared_versions(&self, name: &str) -> Result<&[Version]> {
        Ok(self.recipe(name)?.versions())
    }

    /// Declared variants of a package
    ///
    /// # Errors
    ///
    /// Returns `UnknownPackage` if no recipe is registered under `name`.
    pub fn declared_variants(&self, name: &str) -> Result<&[VariantDecl]> {
        Ok(self.recipe(name)?.variants())
    }

    /// Declared dependency edge templates of a package
    ///
    /// # Errors
    ///
    /// Returns `UnknownPackage` if no recipe is registered under `name`.
    pub fn declared_edges(&self, name: &str) -> Result<&[DependencyTemplate]> {
        Ok(self.recipe(name)?.dependencies())
    }

    /// Validate that a value names a declared variant of a package and is
    /// allowed for it
    ///
    /// # Errors
    ///
    /// Returns `UnknownPackage`, `UnknownVariant`, or `InvalidVariantValue`.
    pub fn check_variant(&self, package: &str, variant: &str, value: &VariantValue) -> Result<()> {
        let Some(decl) = self.recipe(package)?.variant(variant) else {
            return Err(Error::Recipe(RecipeError::UnknownVariant {
                package: package.to_string(),
                variant: variant.to_string(),
            }));
        };
        if !decl.allows(value) {
            return Err(Error::Recipe(RecipeError::InvalidVariantValue {
                package: package.to_string(),
                variant: variant.to_string(),
                value: value.to_string(),
            }));
        }
        Ok(())
    }

    /// Check whether a recipe is registered under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    /// All registered package names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    /// Number of registered recipes
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Check whether the repository is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Parse a repository snapshot from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the snapshot format
    /// version is unsupported.
    pub fn from_json(json: &str) -> Result<Self> {
        let repository: Self = serde_json::from_str(json)
            .map_err(|e| Error::internal(format!("bad repository snapshot: {e}")))?;
        repository.validate()?;
        Ok(repository)
    }

    /// Serialize this repository to a JSON snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("snapshot serialization failed: {e}")))
    }

    fn validate(&self) -> Result<()> {
        if self.metadata.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(Error::internal(format!(
                "unsupported snapshot format version {}",
                self.metadata.format_version
            )));
        }
        Ok(())
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}
