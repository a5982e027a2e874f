//! Version parsing error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VersionError {
    #[error("invalid version: {input}")]
    InvalidVersion { input: String },

    #[error("invalid version range: {input}")]
    InvalidRange { input: String },

    #[error("invalid spec: {input}: {message}")]
    InvalidSpec { input: String, message: String },
}
