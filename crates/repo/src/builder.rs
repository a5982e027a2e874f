//! Fluent recipe construction
//!
//! The builder mirrors the shape of the recipe DSL (`version(..)`,
//! `variant(..)`, `depends_on(.., when=..)`, `patch(.., when=..)`) at the
//! data level. String arguments are collected as-is and parsed in
//! `finish()`, so chains stay infallible until the single validation point.

use crate::models::{DependencyTemplate, PatchDecl, Recipe, VariantConflict};
use sprig_errors::{Error, RecipeError, Result};
use sprig_types::{BuildSystem, EdgeKinds, VariantDecl, Version};

/// A dependency declaration under construction
#[derive(Debug, Clone)]
pub struct Dependency {
    provider: String,
    kinds: EdgeKinds,
    when: Option<String>,
    versions: Option<String>,
    requirements: Vec<String>,
}

impl Dependency {
    /// Start a dependency on `provider`
    #[must_use]
    pub fn on(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kinds: EdgeKinds::default(),
            when: None,
            versions: None,
            requirements: Vec::new(),
        }
    }

    /// Set the edge kinds, e.g. `EdgeKinds::build_only()` for a tool
    #[must_use]
    pub fn kinds(mut self, kinds: EdgeKinds) -> Self {
        self.kinds = kinds;
        self
    }

    /// Gate the edge on a condition over the consumer, e.g. `"+optional"`
    #[must_use]
    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.when = Some(condition.into());
        self
    }

    /// Require a provider version range, e.g. `"1.67.0:"`
    #[must_use]
    pub fn range(mut self, versions: impl Into<String>) -> Self {
        self.versions = Some(versions.into());
        self
    }

    /// Require a provider variant value, e.g. `"+python"`
    #[must_use]
    pub fn require(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    fn parse(self, package: &str) -> Result<DependencyTemplate> {
        let invalid = |message: String| {
            Error::Recipe(RecipeError::InvalidRecipe {
                name: package.to_string(),
                message,
            })
        };

        if self.provider.is_empty() {
            return Err(invalid("dependency provider name is empty".to_string()));
        }
        if self.kinds.is_empty() {
            return Err(invalid(format!(
                "dependency on {} has no edge kinds",
                self.provider
            )));
        }

        let when = match self.when {
            Some(raw) => raw
                .parse()
                .map_err(|e| invalid(format!("bad condition on {}: {e}", self.provider)))?,
            None => sprig_types::Condition::always(),
        };
        let versions = match self.versions {
            Some(raw) => raw
                .parse()
                .map_err(|e| invalid(format!("bad version range on {}: {e}", self.provider)))?,
            None => sprig_types::VersionRange::Any,
        };
        let requirements = self
            .requirements
            .into_iter()
            .map(|raw| {
                raw.parse()
                    .map_err(|e| invalid(format!("bad requirement on {}: {e}", self.provider)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DependencyTemplate {
            provider: self.provider,
            kinds: self.kinds,
            when,
            versions,
            requirements,
        })
    }
}

/// Builder for a [`Recipe`]
#[derive(Debug, Clone)]
pub struct RecipeBuilder {
    name: String,
    build_system: BuildSystem,
    description: Option<String>,
    homepage: Option<String>,
    versions: Vec<String>,
    variants: Vec<VariantDecl>,
    dependencies: Vec<Dependency>,
    conflicts: Vec<(String, String)>,
    patches: Vec<(String, String)>,
}

impl RecipeBuilder {
    /// Start a recipe for `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            build_system: BuildSystem::CMake,
            description: None,
            homepage: None,
            versions: Vec::new(),
            variants: Vec::new(),
            dependencies: Vec::new(),
            conflicts: Vec::new(),
            patches: Vec::new(),
        }
    }

    /// Set the build-system protocol tag
    #[must_use]
    pub fn build_system(mut self, build_system: BuildSystem) -> Self {
        self.build_system = build_system;
        self
    }

    /// Set the one-line description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the homepage URL
    #[must_use]
    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = Some(homepage.into());
        self
    }

    /// Declare a buildable version, e.g. `"35.0"` or `"master"`
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.versions.push(version.into());
        self
    }

    /// Declare a boolean variant
    #[must_use]
    pub fn variant(
        mut self,
        name: impl Into<String>,
        default: bool,
        description: impl Into<String>,
    ) -> Self {
        self.variants
            .push(VariantDecl::boolean(name, default, description));
        self
    }

    /// Declare an enumerated variant
    #[must_use]
    pub fn enum_variant(
        mut self,
        name: impl Into<String>,
        default: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
        description: impl Into<String>,
    ) -> Self {
        self.variants
            .push(VariantDecl::one_of(name, default, values, description));
        self
    }

    /// Declare a dependency edge
    #[must_use]
    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Declare that `forbidden` must not hold whenever `when` holds, both
    /// over this package's own variants
    #[must_use]
    pub fn conflicts_with(
        mut self,
        forbidden: impl Into<String>,
        when: impl Into<String>,
    ) -> Self {
        self.conflicts.push((forbidden.into(), when.into()));
        self
    }

    /// Declare a patch gated on a condition (empty string for always)
    #[must_use]
    pub fn patch(mut self, file: impl Into<String>, when: impl Into<String>) -> Self {
        self.patches.push((file.into(), when.into()));
        self
    }

    /// Validate and build the recipe
    ///
    /// # Errors
    ///
    /// Returns `RecipeError` if the recipe declares no versions, declares
    /// the same version or variant twice, or contains an unparsable
    /// condition, range, or requirement.
    pub fn finish(self) -> Result<Recipe> {
        let name = self.name;
        let invalid = |message: String| {
            Error::Recipe(RecipeError::InvalidRecipe {
                name: name.clone(),
                message,
            })
        };

        if name.is_empty() {
            return Err(Error::Recipe(RecipeError::InvalidRecipe {
                name: String::new(),
                message: "package name is empty".to_string(),
            }));
        }

        let mut versions = Vec::with_capacity(self.versions.len());
        for raw in &self.versions {
            let version: Version = raw
                .parse()
                .map_err(|e| invalid(format!("bad version {raw}: {e}")))?;
            if versions.contains(&version) {
                return Err(invalid(format!("version {version} declared twice")));
            }
            versions.push(version);
        }
        if versions.is_empty() {
            return Err(Error::Recipe(RecipeError::NoVersions { name: name.clone() }));
        }
        versions.sort_by(|a, b| b.cmp(a));

        for (i, decl) in self.variants.iter().enumerate() {
            if self.variants[..i].iter().any(|d| d.name == decl.name) {
                return Err(invalid(format!("variant {} declared twice", decl.name)));
            }
            if !decl.allows(&decl.default) {
                return Err(invalid(format!(
                    "variant {} default {} is not an allowed value",
                    decl.name, decl.default
                )));
            }
        }

        let dependencies = self
            .dependencies
            .into_iter()
            .map(|d| d.parse(&name))
            .collect::<Result<Vec<_>>>()?;

        let mut conflicts = Vec::with_capacity(self.conflicts.len());
        for (forbidden, when) in self.conflicts {
            let forbidden = forbidden
                .parse()
                .map_err(|e| invalid(format!("bad conflict requirement: {e}")))?;
            let when = when
                .parse()
                .map_err(|e| invalid(format!("bad conflict condition: {e}")))?;
            conflicts.push(VariantConflict { forbidden, when });
        }
        for conflict in &conflicts {
            let req = &conflict.forbidden;
            let Some(decl) = self.variants.iter().find(|d| d.name == req.name) else {
                return Err(Error::Recipe(RecipeError::UnknownVariant {
                    package: name.clone(),
                    variant: req.name.clone(),
                }));
            };
            if !decl.allows(&req.value) {
                return Err(Error::Recipe(RecipeError::InvalidVariantValue {
                    package: name.clone(),
                    variant: req.name.clone(),
                    value: req.value.to_string(),
                }));
            }
        }

        let patches = self
            .patches
            .into_iter()
            .map(|(file, when)| {
                let when = when
                    .parse()
                    .map_err(|e| invalid(format!("bad patch condition on {file}: {e}")))?;
                Ok(PatchDecl { file, when })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Recipe {
            name,
            versions,
            variants: self.variants,
            dependencies,
            conflicts,
            patches,
            build_system: self.build_system,
            description: self.description,
            homepage: self.homepage,
        })
    }
}
