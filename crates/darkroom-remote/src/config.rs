use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where release resources are published for the latest release.
pub const DEFAULT_RELEASE_URL: &str = "https://github.com/immich-app/immich/releases/latest/download";

/// Location of release resources: an http(s) base URL or a local directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RELEASE_URL)
    }
}

impl SourceConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim().trim_end_matches('/').to_owned(),
        }
    }

    /// Resources of a specific tagged release instead of the latest one.
    pub fn for_release(tag: &str) -> Self {
        Self::new(&format!(
            "https://github.com/immich-app/immich/releases/download/{tag}"
        ))
    }

    pub fn is_remote(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }

    /// Local directory for non-remote sources (`file://` prefix allowed).
    pub fn location(&self) -> PathBuf {
        PathBuf::from(self.url.strip_prefix("file://").unwrap_or(&self.url))
    }

    pub fn resource_url(&self, name: &str) -> String {
        format!("{}/{name}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_strips_trailing_slash() {
        let config = SourceConfig::new("https://example.com/download/");
        assert_eq!(config.url, "https://example.com/download");
        assert_eq!(
            config.resource_url("hwaccel.ml.yml"),
            "https://example.com/download/hwaccel.ml.yml"
        );
    }

    #[test]
    fn file_urls_are_local() {
        let config = SourceConfig::new("file:///srv/mirror");
        assert!(!config.is_remote());
        assert_eq!(config.location(), PathBuf::from("/srv/mirror"));
        assert!(SourceConfig::default().is_remote());
    }

    #[test]
    fn release_tag_url() {
        assert!(SourceConfig::for_release("v1.120.0")
            .url
            .ends_with("/releases/download/v1.120.0"));
    }
}
