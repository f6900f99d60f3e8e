//! Document models and acceleration profile types for Darkroom.
//!
//! This crate defines the schema layer: the closed sets of acceleration
//! categories and profiles (`AccelerationCategory`, `Profile`), a line-preserving
//! model of the compose file (`ManifestDocument`, `ServiceBlock`, `ExtensionRef`),
//! the flat `.env` store (`EnvironmentStore`), and content digests used to tell
//! whether a rewrite actually changed anything.

pub mod compose;
pub mod digest;
pub mod envfile;
pub mod types;

pub use compose::{ExtensionRef, ManifestDocument, ServiceBlock};
pub use digest::{content_digest, file_digest};
pub use envfile::{EnvKey, EnvironmentStore};
pub use types::{AccelerationCategory, Profile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
    #[error("compose file has no top-level 'services' section")]
    MissingServices,
    #[error("top-level section '{0}' appears more than once")]
    DuplicateSection(String),
    #[error("duplicate service '{0}' in compose file")]
    DuplicateService(String),
    #[error("duplicate volume '{0}' in compose file")]
    DuplicateVolume(String),
    #[error("service '{0}' not found in compose file")]
    ServiceNotFound(String),
    #[error("service '{0}' has no image line")]
    MissingImage(String),
    #[error("duplicate key '{key}' on line {line} of environment file")]
    DuplicateEnvKey { key: String, line: usize },
    #[error("unknown {category} profile '{input}' (expected one of: {expected})")]
    UnknownProfile {
        category: AccelerationCategory,
        input: String,
        expected: String,
    },
    #[error("unknown acceleration category '{0}' (expected: transcoding, inference)")]
    UnknownCategory(String),
}
