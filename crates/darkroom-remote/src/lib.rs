//! Retrieval of release resources for Darkroom.
//!
//! The installer only ever needs "fetch a named resource or fail": the compose
//! file, the example environment file, and one fragment per acceleration
//! category. `HttpSource` fetches them from a release URL, `DirSource` reads
//! them from a local directory (air-gapped installs and tests).

pub mod config;
pub mod http;
pub mod local;

pub use config::{SourceConfig, DEFAULT_RELEASE_URL};
pub use http::HttpSource;
pub use local::DirSource;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("resource '{0}' is not valid UTF-8")]
    Encoding(String),
}

/// Anything that can hand out release resources by file name.
pub trait ResourceSource {
    /// Human-readable location, used in messages.
    fn describe(&self) -> String;

    fn fetch(&self, name: &str) -> Result<Vec<u8>, RemoteError>;

    fn fetch_text(&self, name: &str) -> Result<String, RemoteError> {
        let bytes = self.fetch(name)?;
        String::from_utf8(bytes).map_err(|_| RemoteError::Encoding(name.to_owned()))
    }
}

/// Build the source a config points at: a directory path or an http(s) URL.
pub fn source_from_config(config: &SourceConfig) -> Box<dyn ResourceSource> {
    if config.is_remote() {
        Box::new(HttpSource::new(config.clone()))
    } else {
        Box::new(DirSource::new(config.location()))
    }
}
