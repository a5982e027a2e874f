#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the sprig concretizer
//!
//! This crate provides the spec model used throughout the system:
//! versions and version ranges, build variants, `when=` conditions with
//! three-valued evaluation, and abstract package specs.

pub mod condition;
pub mod spec;
pub mod variant;
pub mod version;

// Re-export commonly used types
pub use condition::{Condition, ConditionAtom, ConditionContext, Ternary};
pub use spec::{BuildSystem, CompilerSpec, EdgeKinds, Spec};
pub use variant::{
    VariantAssignment, VariantDecl, VariantDomain, VariantRequirement, VariantValue,
};
pub use version::{Version, VersionRange};
