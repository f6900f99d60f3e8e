//! Host inspection and container runtime integration for Darkroom.
//!
//! This crate implements the read-only side of the installer: a `HostInspector`
//! trait with a real `SystemHost` (commands, device nodes, sysfs/procfs files)
//! and an in-memory `MockHost`, the capability probe that turns host evidence
//! into per-family `HostEvidence`, prerequisite checks for the container
//! runtime, and the `docker compose` launcher.

pub mod host;
pub mod launcher;
pub mod mock;
pub mod prereq;
pub mod probe;

pub use host::{detect_timezone, HostInspector, SystemHost};
pub use launcher::ComposeLauncher;
pub use mock::MockHost;
pub use prereq::{check_compose_prereqs, format_missing, MissingPrereq};
pub use probe::{
    probe_host, AmdEvidence, ComputeTier, HostEvidence, IntelEvidence, MaliEvidence,
    NvidiaEvidence, RockchipEvidence, VaapiEvidence, TONEMAP_LIBRARY,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),
    #[error("command '{command}' failed: {detail}")]
    CommandFailed { command: String, detail: String },
}
