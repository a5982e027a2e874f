//! Recipe repository error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecipeError {
    #[error("unknown package: {name}")]
    UnknownPackage { name: String },

    #[error("package {package} declares no variant named {variant}")]
    UnknownVariant { package: String, variant: String },

    #[error("invalid value {value} for variant {variant} of {package}")]
    InvalidVariantValue {
        package: String,
        variant: String,
        value: String,
    },

    #[error("recipe already registered: {name}")]
    DuplicateRecipe { name: String },

    #[error("recipe {name} declares no versions")]
    NoVersions { name: String },

    #[error("invalid recipe {name}: {message}")]
    InvalidRecipe { name: String, message: String },
}
