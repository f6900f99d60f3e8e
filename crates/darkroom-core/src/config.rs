use crate::CoreError;
use darkroom_remote::SourceConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from `~/.config/darkroom/config.toml`. Every field is
/// optional; command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallerConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub install: InstallSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallSection {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub upload_location: Option<String>,
    #[serde(default)]
    pub db_data_location: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl InstallerConfig {
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        toml::from_str(input).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                tracing::debug!("loaded config from {}", path.display());
                Self::parse(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load_default() -> Result<Self, CoreError> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config/darkroom/config.toml"))
}
