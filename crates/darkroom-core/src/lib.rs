//! Core engine for Darkroom.
//!
//! This crate turns probe evidence into eligible acceleration profiles
//! (`resolve`), lets the operator choose between them (`select`), applies or
//! removes the choice on the compose file and its fragment (`Mutator`), and
//! drives the initial install of the compose and environment files. The
//! `Engine` ties these together once per acceleration category.

pub mod advice;
pub mod config;
pub mod engine;
pub mod install;
pub mod layout;
pub mod mutate;
pub mod prompt;
pub mod report;
pub mod resolve;
pub mod select;

pub use config::{InstallSection, InstallerConfig};
pub use engine::{CategoryOutcome, CategoryResult, Engine};
pub use install::{generate_password, InstallOptions, InstallReport};
pub use layout::{write_atomic, InstallLayout};
pub use mutate::{strip_backend_suffix, with_backend_suffix, ApplyOutcome, DisableOutcome, Mutator};
pub use prompt::{Answer, AssumeYes, Prompter, ScriptedPrompter};
pub use report::{Level, MemoryReporter, Reporter};
pub use resolve::{resolve, Resolution};
pub use select::{select, Directive, Selection};

use darkroom_remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("document error: {0}")]
    Document(#[from] darkroom_schema::DocumentError),
    #[error("runtime error: {0}")]
    Runtime(#[from] darkroom_runtime::RuntimeError),
    #[error("failed to fetch '{name}' from {location}: {error}")]
    Fetch {
        name: String,
        location: String,
        error: RemoteError,
    },
    #[error("fragment '{file}' does not define profile '{profile}' (defines: {defined})")]
    FragmentMissingProfile {
        file: String,
        profile: String,
        defined: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("prompt failed: {0}")]
    Prompt(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("refusing to overwrite {0} (pass --force)")]
    Refused(String),
}
