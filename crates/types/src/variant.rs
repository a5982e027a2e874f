//! Variant declarations, values, and assignments
//!
//! A variant is a named build-time option. A package declares its variant
//! set once (name, allowed values, default); a spec instance carries a
//! concrete value for every declared variant once concretized.

use serde::{Deserialize, Serialize};
use sprig_errors::VersionError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A concrete variant value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantValue {
    Bool(bool),
    Choice(String),
}

impl VariantValue {
    /// Render this value together with its variant name in spec syntax:
    /// `+name`, `~name`, or `name=value`
    #[must_use]
    pub fn render(&self, name: &str) -> String {
        match self {
            Self::Bool(true) => format!("+{name}"),
            Self::Bool(false) => format!("~{name}"),
            Self::Choice(value) => format!("{name}={value}"),
        }
    }
}

impl fmt::Display for VariantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Choice(value) => write!(f, "{value}"),
        }
    }
}

/// Allowed values for a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantDomain {
    /// `true` or `false`
    Bool,
    /// One of a fixed list of strings
    OneOf(Vec<String>),
}

/// A variant as declared by a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDecl {
    pub name: String,
    pub default: VariantValue,
    pub domain: VariantDomain,
    pub description: String,
}

impl VariantDecl {
    /// Declare a boolean variant
    #[must_use]
    pub fn boolean(name: impl Into<String>, default: bool, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: VariantValue::Bool(default),
            domain: VariantDomain::Bool,
            description: description.into(),
        }
    }

    /// Declare an enumerated variant
    #[must_use]
    pub fn one_of(
        name: impl Into<String>,
        default: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            default: VariantValue::Choice(default.into()),
            domain: VariantDomain::OneOf(values.into_iter().map(Into::into).collect()),
            description: description.into(),
        }
    }

    /// Check whether a value is allowed for this variant
    #[must_use]
    pub fn allows(&self, value: &VariantValue) -> bool {
        match (&self.domain, value) {
            (VariantDomain::Bool, VariantValue::Bool(_)) => true,
            (VariantDomain::OneOf(allowed), VariantValue::Choice(v)) => allowed.contains(v),
            _ => false,
        }
    }

    /// All allowed values in solver preference order: the declared default
    /// first, then the rest in declaration order
    #[must_use]
    pub fn candidate_values(&self) -> Vec<VariantValue> {
        match &self.domain {
            VariantDomain::Bool => {
                let VariantValue::Bool(default) = self.default else {
                    return vec![VariantValue::Bool(false), VariantValue::Bool(true)];
                };
                vec![VariantValue::Bool(default), VariantValue::Bool(!default)]
            }
            VariantDomain::OneOf(allowed) => {
                let mut values = vec![self.default.clone()];
                for v in allowed {
                    let value = VariantValue::Choice(v.clone());
                    if value != self.default {
                        values.push(value);
                    }
                }
                values
            }
        }
    }
}

/// A concrete (possibly partial) assignment of variant values
///
/// Backed by a sorted map so iteration and rendering are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAssignment {
    values: BTreeMap<String, VariantValue>,
}

impl VariantAssignment {
    /// Create an empty assignment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value assigned to a variant, if any
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VariantValue> {
        self.values.get(name)
    }

    /// Set the value of a variant
    pub fn set(&mut self, name: impl Into<String>, value: VariantValue) {
        self.values.insert(name.into(), value);
    }

    /// Iterate over assigned (name, value) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariantValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of assigned variants
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether no variant is assigned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check whether every declared variant has a value
    #[must_use]
    pub fn is_total_for(&self, decls: &[VariantDecl]) -> bool {
        decls.iter().all(|d| self.values.contains_key(&d.name))
    }
}

impl fmt::Display for VariantAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .values
            .iter()
            .map(|(name, value)| value.render(name))
            .collect();
        write!(f, "{}", rendered.join(" "))
    }
}

/// A required variant value, e.g. `+python` on a dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantRequirement {
    pub name: String,
    pub value: VariantValue,
}

impl VariantRequirement {
    /// Create a requirement for a specific value
    #[must_use]
    pub fn new(name: impl Into<String>, value: VariantValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl FromStr for VariantRequirement {
    type Err = VersionError;

    /// Parse `+name`, `~name`, `-name`, or `name=value`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::InvalidSpec {
            input: s.to_string(),
            message: "expected +name, ~name, -name, or name=value".to_string(),
        };

        if let Some(name) = s.strip_prefix('+') {
            if name.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::new(name, VariantValue::Bool(true)));
        }
        if let Some(name) = s.strip_prefix('~').or_else(|| s.strip_prefix('-')) {
            if name.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::new(name, VariantValue::Bool(false)));
        }
        if let Some((name, value)) = s.split_once('=') {
            if name.is_empty() || value.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::new(name, VariantValue::Choice(value.to_string())));
        }

        Err(invalid())
    }
}

impl fmt::Display for VariantRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value.render(&self.name))
    }
}
