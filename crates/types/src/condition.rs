//! `when=` condition predicates with three-valued evaluation
//!
//! A condition gates a dependency edge or a patch. It is a conjunction of
//! atoms over the consumer's *own* assignment only - its version, its
//! variants, and the toolchain - never over downstream nodes. Against a
//! partial assignment an atom may be indeterminate, so evaluation is
//! three-valued and the solver re-evaluates on every assignment change.

use crate::spec::CompilerSpec;
use crate::variant::{VariantAssignment, VariantRequirement};
use crate::version::{Version, VersionRange};
use serde::{Deserialize, Serialize};
use sprig_errors::VersionError;
use std::fmt;
use std::str::FromStr;

/// Three-valued truth for condition evaluation over partial assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ternary {
    True,
    False,
    Indeterminate,
}

impl Ternary {
    /// Lift a boolean
    #[must_use]
    pub const fn from_bool(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }

    /// Three-valued conjunction: false dominates, then indeterminate
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::Indeterminate, _) | (_, Self::Indeterminate) => Self::Indeterminate,
            (Self::True, Self::True) => Self::True,
        }
    }

    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }
}

/// The consumer-side state a condition is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    /// Live version candidates of the consumer; a single element once the
    /// version is assigned
    pub versions: &'a [Version],
    /// The consumer's (possibly partial) variant assignment
    pub variants: &'a VariantAssignment,
    /// The toolchain of the current solve, if any
    pub compiler: Option<&'a CompilerSpec>,
}

/// One conjunct of a condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionAtom {
    /// `@:34.99` - the consumer's version lies in the range
    Version(VersionRange),
    /// `+optional` / `~docs` / `cxxstd=17` - a consumer variant holds a value
    Variant(VariantRequirement),
    /// `%gcc@11:` - the solve's toolchain matches name and range
    Compiler { name: String, range: VersionRange },
}

impl ConditionAtom {
    fn eval(&self, ctx: &ConditionContext<'_>) -> Ternary {
        match self {
            Self::Version(range) => {
                let hits = ctx.versions.iter().filter(|v| range.contains(v)).count();
                if hits == ctx.versions.len() {
                    Ternary::True
                } else if hits == 0 {
                    Ternary::False
                } else {
                    Ternary::Indeterminate
                }
            }
            Self::Variant(req) => match ctx.variants.get(&req.name) {
                Some(value) => Ternary::from_bool(*value == req.value),
                None => Ternary::Indeterminate,
            },
            Self::Compiler { name, range } => match ctx.compiler {
                Some(compiler) => Ternary::from_bool(
                    compiler.name == *name && range.contains(&compiler.version),
                ),
                None => Ternary::False,
            },
        }
    }
}

impl fmt::Display for ConditionAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version(range) => write!(f, "@{range}"),
            Self::Variant(req) => write!(f, "{req}"),
            Self::Compiler { name, range } => {
                if range.is_any() {
                    write!(f, "%{name}")
                } else {
                    write!(f, "%{name}@{range}")
                }
            }
        }
    }
}

/// A `when=` predicate: a conjunction of atoms, empty meaning always true
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    atoms: Vec<ConditionAtom>,
}

impl Condition {
    /// The condition that always holds
    #[must_use]
    pub fn always() -> Self {
        Self::default()
    }

    /// Check whether this condition holds unconditionally
    #[must_use]
    pub fn is_always(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The conjuncts of this condition
    #[must_use]
    pub fn atoms(&self) -> &[ConditionAtom] {
        &self.atoms
    }

    /// Evaluate against a (possibly partial) consumer assignment
    #[must_use]
    pub fn eval(&self, ctx: &ConditionContext<'_>) -> Ternary {
        self.atoms
            .iter()
            .fold(Ternary::True, |acc, atom| acc.and(atom.eval(ctx)))
    }
}

impl FromStr for Condition {
    type Err = VersionError;

    /// Parse a whitespace-separated conjunction, e.g. `@:34.99 +optional`
    /// or `%gcc@11:`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut atoms = Vec::new();
        for token in s.split_whitespace() {
            if let Some(range) = token.strip_prefix('@') {
                atoms.push(ConditionAtom::Version(range.parse()?));
            } else if let Some(compiler) = token.strip_prefix('%') {
                let (name, range) = match compiler.split_once('@') {
                    Some((name, range)) => (name, range.parse()?),
                    None => (compiler, VersionRange::Any),
                };
                if name.is_empty() {
                    return Err(VersionError::InvalidSpec {
                        input: s.to_string(),
                        message: "compiler name missing after %".to_string(),
                    });
                }
                atoms.push(ConditionAtom::Compiler {
                    name: name.to_string(),
                    range,
                });
            } else {
                atoms.push(ConditionAtom::Variant(token.parse()?));
            }
        }
        Ok(Self { atoms })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.atoms.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(" "))
    }
}
