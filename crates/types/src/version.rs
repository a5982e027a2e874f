//! Version values and range constraints
//!
//! Implements recipe-style versions and ranges:
//! - `33.2`, `1.67.0` - dotted numeric releases, compared componentwise
//! - `master` - branch tag, equal only to itself
//! - `@X` - exact version
//! - `@X:` - inclusive lower bound
//! - `@:X` - inclusive upper bound
//! - `@X:Y` - inclusive on both ends

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sprig_errors::VersionError;
use std::fmt;
use std::str::FromStr;

/// A package version
///
/// Branch tags order before every numeric release, so sorting descending
/// (newest first) never prefers a branch over a concrete release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Version {
    /// Branch tag such as `master`; satisfies only ranges naming it exactly
    Branch(String),
    /// Dotted numeric release, e.g. `33.2` is `[33, 2]`
    Release(Vec<u64>),
}

impl Version {
    /// Create a numeric release version
    #[must_use]
    pub fn release(parts: impl Into<Vec<u64>>) -> Self {
        Self::Release(parts.into())
    }

    /// Create a branch version
    #[must_use]
    pub fn branch(name: impl Into<String>) -> Self {
        Self::Branch(name.into())
    }

    /// Check whether this is a branch version
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::InvalidVersion {
                input: s.to_string(),
            });
        }

        // All-numeric dotted tokens are releases, anything else is a branch
        let parts: Result<Vec<u64>, _> = s.split('.').map(str::parse::<u64>).collect();
        if let Ok(parts) = parts {
            return Ok(Self::Release(parts));
        }

        if s.contains(|c: char| c.is_whitespace() || c == ':' || c == '@') {
            return Err(VersionError::InvalidVersion {
                input: s.to_string(),
            });
        }

        Ok(Self::Branch(s.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(name) => write!(f, "{name}"),
            Self::Release(parts) => {
                let rendered: Vec<String> = parts.iter().map(ToString::to_string).collect();
                write!(f, "{}", rendered.join("."))
            }
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A version range constraint
///
/// Bounds are inclusive on both ends (`@:34.99` admits `34.99`). Branch
/// versions satisfy only `Any` and an `Exact` range naming them; bounded
/// ranges never admit a branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionRange {
    /// No constraint
    Any,
    /// Exactly this version
    Exact(Version),
    /// `@X:` - this version or newer
    AtLeast(Version),
    /// `@:X` - this version or older
    AtMost(Version),
    /// `@X:Y` - between the two, inclusive
    Between(Version, Version),
}

impl VersionRange {
    /// The range admitting every version
    #[must_use]
    pub const fn any() -> Self {
        Self::Any
    }

    /// Check whether a version lies in this range
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(v) => version == v,
            Self::AtLeast(lo) => !version.is_branch() && version >= lo,
            Self::AtMost(hi) => !version.is_branch() && version <= hi,
            Self::Between(lo, hi) => !version.is_branch() && version >= lo && version <= hi,
        }
    }

    /// Check whether this range admits every version
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    fn parse_bound(s: &str) -> Result<Version, VersionError> {
        let version: Version = s.parse()?;
        if version.is_branch() {
            // Branches are unordered; they cannot bound a range
            return Err(VersionError::InvalidRange {
                input: s.to_string(),
            });
        }
        Ok(version)
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == ":" {
            return Ok(Self::Any);
        }

        match s.split_once(':') {
            None => Ok(Self::Exact(s.parse()?)),
            Some((lo, "")) => Ok(Self::AtLeast(Self::parse_bound(lo)?)),
            Some(("", hi)) => Ok(Self::AtMost(Self::parse_bound(hi)?)),
            Some((lo, hi)) => {
                let lo = Self::parse_bound(lo)?;
                let hi = Self::parse_bound(hi)?;
                if lo > hi {
                    return Err(VersionError::InvalidRange {
                        input: s.to_string(),
                    });
                }
                Ok(Self::Between(lo, hi))
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, ":"),
            Self::Exact(v) => write!(f, "{v}"),
            Self::AtLeast(lo) => write!(f, "{lo}:"),
            Self::AtMost(hi) => write!(f, ":{hi}"),
            Self::Between(lo, hi) => write!(f, "{lo}:{hi}"),
        }
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
