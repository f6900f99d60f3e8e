use crate::host::HostInspector;
use crate::prereq::compose_command;
use crate::RuntimeError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Starts the stack from the install directory.
#[derive(Debug, Clone)]
pub struct ComposeLauncher {
    dir: PathBuf,
    command: Vec<&'static str>,
}

impl ComposeLauncher {
    pub fn detect(host: &dyn HostInspector, dir: &Path) -> Result<Self, RuntimeError> {
        let command = compose_command(host).ok_or_else(|| {
            RuntimeError::Unavailable("neither 'docker compose' nor 'docker-compose' works".into())
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            command,
        })
    }

    /// The full argument vector for `up`, for display and tests.
    pub fn up_args(&self) -> Vec<&'static str> {
        let mut args = self.command.clone();
        args.extend(["up", "-d"]);
        args
    }

    pub fn up(&self) -> Result<(), RuntimeError> {
        let args = self.up_args();
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| RuntimeError::Unavailable("empty compose command".into()))?;
        tracing::debug!("running {} in {}", args.join(" "), self.dir.display());
        let status = Command::new(program)
            .args(rest)
            .current_dir(&self.dir)
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::CommandFailed {
                command: args.join(" "),
                detail: status.to_string(),
            })
        }
    }
}
