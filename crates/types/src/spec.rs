//! Abstract package specs and related tags
//!
//! A `Spec` is a package request: a name plus whatever the requester chose
//! to constrain - a version range, variant pins, a toolchain. The solver
//! narrows it to a single version and a total variant assignment.

use crate::variant::{VariantAssignment, VariantRequirement, VariantValue};
use crate::version::{Version, VersionRange};
use serde::{Deserialize, Serialize};
use sprig_errors::VersionError;
use std::fmt;
use std::str::FromStr;

/// The kinds of a dependency edge, a subset of {build, link, run}
///
/// The default matches the recipe DSL's `depends_on` default: needed at
/// build time and linked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKinds {
    pub build: bool,
    pub link: bool,
    pub run: bool,
}

impl EdgeKinds {
    /// Build-time only, e.g. `cmake`
    #[must_use]
    pub const fn build_only() -> Self {
        Self {
            build: true,
            link: false,
            run: false,
        }
    }

    /// Build and link, the `depends_on` default
    #[must_use]
    pub const fn build_link() -> Self {
        Self {
            build: true,
            link: true,
            run: false,
        }
    }

    /// Build and run, e.g. an interpreter needed by generated scripts
    #[must_use]
    pub const fn build_run() -> Self {
        Self {
            build: true,
            link: false,
            run: true,
        }
    }

    /// Needed at run time only
    #[must_use]
    pub const fn run_only() -> Self {
        Self {
            build: false,
            link: false,
            run: true,
        }
    }

    /// Check whether no kind is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.build && !self.link && !self.run
    }
}

impl Default for EdgeKinds {
    fn default() -> Self {
        Self::build_link()
    }
}

impl fmt::Display for EdgeKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds = Vec::new();
        if self.build {
            kinds.push("build");
        }
        if self.link {
            kinds.push("link");
        }
        if self.run {
            kinds.push("run");
        }
        write!(f, "{}", kinds.join(","))
    }
}

/// Build-system protocol a recipe uses, dispatched by the external build
/// executor rather than by subtyping inside the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    CMake,
    Autotools,
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CMake => write!(f, "cmake"),
            Self::Autotools => write!(f, "autotools"),
        }
    }
}

/// The toolchain a request is solved against, e.g. `%gcc@11.2.0`
///
/// One toolchain per solve; it participates in condition evaluation and is
/// stamped on every concretized node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilerSpec {
    pub name: String,
    pub version: Version,
}

impl CompilerSpec {
    /// Create a compiler spec
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl FromStr for CompilerSpec {
    type Err = VersionError;

    /// Parse `gcc@11.2.0`, with or without a leading `%`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('%').unwrap_or(s);
        let Some((name, version)) = s.split_once('@') else {
            return Err(VersionError::InvalidSpec {
                input: s.to_string(),
                message: "compiler version required, e.g. gcc@11.2.0".to_string(),
            });
        };
        if name.is_empty() {
            return Err(VersionError::InvalidSpec {
                input: s.to_string(),
                message: "compiler name missing".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            version: version.parse()?,
        })
    }
}

impl fmt::Display for CompilerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}@{}", self.name, self.version)
    }
}

/// An abstract package spec: a request before solving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spec {
    pub name: String,
    pub versions: VersionRange,
    pub variants: VariantAssignment,
    pub compiler: Option<CompilerSpec>,
}

impl Spec {
    /// An unconstrained spec for a package
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: VersionRange::Any,
            variants: VariantAssignment::new(),
            compiler: None,
        }
    }

    /// Constrain the version range
    #[must_use]
    pub fn with_versions(mut self, versions: VersionRange) -> Self {
        self.versions = versions;
        self
    }

    /// Pin a variant value
    #[must_use]
    pub fn with_variant(mut self, name: impl Into<String>, value: VariantValue) -> Self {
        self.variants.set(name, value);
        self
    }

    /// Set the toolchain
    #[must_use]
    pub fn with_compiler(mut self, compiler: CompilerSpec) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Parse a spec string, e.g. `gaudi@:34.99 +optional ~docs %gcc@11.2.0`
    ///
    /// # Errors
    ///
    /// Returns `VersionError` if the spec string is malformed.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let mut tokens = s.split_whitespace();
        let Some(head) = tokens.next() else {
            return Err(VersionError::InvalidSpec {
                input: s.to_string(),
                message: "empty spec".to_string(),
            });
        };

        let (name, versions) = match head.split_once('@') {
            Some((name, range)) => (name, range.parse()?),
            None => (head, VersionRange::Any),
        };
        if name.is_empty() || name.starts_with(['+', '~', '-', '%']) {
            return Err(VersionError::InvalidSpec {
                input: s.to_string(),
                message: "spec must start with a package name".to_string(),
            });
        }

        let mut spec = Self::new(name).with_versions(versions);

        for token in tokens {
            if let Some(range) = token.strip_prefix('@') {
                spec.versions = range.parse()?;
            } else if token.starts_with('%') {
                spec.compiler = Some(token.parse()?);
            } else {
                let req: VariantRequirement = token.parse()?;
                spec.variants.set(req.name, req.value);
            }
        }

        Ok(spec)
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.versions.is_any() {
            write!(f, "@{}", self.versions)?;
        }
        if !self.variants.is_empty() {
            write!(f, " {}", self.variants)?;
        }
        if let Some(compiler) = &self.compiler {
            write!(f, " {compiler}")?;
        }
        Ok(())
    }
}
