use crate::CoreError;
use darkroom_schema::{content_digest, file_digest, AccelerationCategory};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const ENV_FILE: &str = ".env";
pub const EXAMPLE_ENV: &str = "example.env";

/// Paths of the artifacts inside one install directory.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn compose_file(&self) -> PathBuf {
        self.root.join(COMPOSE_FILE)
    }

    #[inline]
    pub fn env_file(&self) -> PathBuf {
        self.root.join(ENV_FILE)
    }

    #[inline]
    pub fn fragment_file(&self, category: AccelerationCategory) -> PathBuf {
        self.root.join(category.fragment_file())
    }

    pub fn initialize(&self) -> Result<(), CoreError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

/// Replace `path` with `content` through a synced temp file in the same
/// directory, so readers never observe a half-written file.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), CoreError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;
    if let Ok(f) = fs::File::open(dir) {
        let _ = f.sync_all();
    }
    tracing::debug!("wrote {}", path.display());
    Ok(())
}

/// Write only when the digest differs from what is on disk. Returns whether
/// the file was written.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool, CoreError> {
    if file_digest(path)?.as_deref() == Some(content_digest(content).as_str()) {
        tracing::debug!("{} unchanged, not rewriting", path.display());
        return Ok(false);
    }
    write_atomic(path, content)?;
    Ok(true)
}
