use crate::{RemoteError, ResourceSource, SourceConfig};
use std::io::Read;

/// Fetches release resources over HTTP(S).
///
/// Resources are plain files below the configured base URL:
/// - `GET <url>/docker-compose.yml`
/// - `GET <url>/example.env`
/// - `GET <url>/hwaccel.transcoding.yml`, `GET <url>/hwaccel.ml.yml`
///
/// Redirects are followed, so GitHub `releases/latest/download` URLs work.
pub struct HttpSource {
    config: SourceConfig,
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(config: SourceConfig) -> Self {
        let agent = ureq::Agent::new_with_defaults();
        Self { config, agent }
    }

    fn do_get(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let req = self
            .agent
            .get(url)
            .header("User-Agent", concat!("darkroom/", env!("CARGO_PKG_VERSION")));
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(e.to_string()));
            }
        };

        let code = resp.status().as_u16();
        if code == 404 {
            return Err(RemoteError::NotFound(url.to_owned()));
        }
        if code >= 400 {
            return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
        }

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(body)
    }
}

impl ResourceSource for HttpSource {
    fn describe(&self) -> String {
        self.config.url.clone()
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.config.resource_url(name);
        tracing::debug!("GET {url}");
        let body = self.do_get(&url)?;
        tracing::debug!("GET {url}: {} bytes", body.len());
        Ok(body)
    }
}
