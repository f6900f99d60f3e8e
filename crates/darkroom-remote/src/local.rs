use crate::{RemoteError, ResourceSource};
use std::path::{Path, PathBuf};

/// Reads release resources from a local mirror directory.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, name: &str) -> Result<PathBuf, RemoteError> {
        let candidate = Path::new(name);
        if candidate.components().count() != 1 || candidate.is_absolute() {
            return Err(RemoteError::NotFound(name.to_owned()));
        }
        Ok(self.root.join(candidate))
    }
}

impl ResourceSource for DirSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>, RemoteError> {
        let path = self.path(name)?;
        tracing::debug!("reading {}", path.display());
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RemoteError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
