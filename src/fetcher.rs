use std::io::Read;
use std::path::PathBuf;

use flate2::read::GzDecoder;
use reqwest::Client;
use scraper::Selector;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::fetch_error::FetchError;

pub const NO_QUERY: &[(&str, &str)] = &[];

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Thin HTTP layer shared by the NHC, USGS and CO-OPS adapters.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    cache_dir: Option<PathBuf>,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            cache_dir: config.cache_dir.clone(),
        })
    }

    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get_text<Q>(&self, url: &str, query: &Q) -> Result<String, FetchError>
    where
        Q: Serialize + ?Sized,
    {
        let bytes = self.get_bytes(url, query).await?;
        debug!("Retrieved text content, size: {} bytes", bytes.len());
        String::from_utf8(bytes).map_err(|e| FetchError::ParseError(e.to_string()))
    }

    pub async fn get_bytes<Q>(&self, url: &str, query: &Q) -> Result<Vec<u8>, FetchError>
    where
        Q: Serialize + ?Sized,
    {
        debug!("Sending HTTP request to {}", url);
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if status.is_success() {
            let bytes = response.bytes().await?;
            Ok(bytes.to_vec())
        } else if status.as_u16() == 404 {
            Err(FetchError::NotFound(url.to_string()))
        } else if status.is_server_error() {
            Err(FetchError::ServerError(format!(
                "Server error {status} while requesting {url}"
            )))
        } else {
            Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }

    /// Fetch a file that never changes once published. When a cache directory is
    /// configured the file is read from, and written to, disk.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_archived(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let cache_path = self.cache_path(url);

        if let Some(path) = &cache_path {
            if let Ok(bytes) = tokio::fs::read(path).await {
                debug!("Read {} bytes from cache {}", bytes.len(), path.display());
                return Ok(bytes);
            }
        }

        let bytes = self.get_bytes(url, NO_QUERY).await?;

        if let Some(path) = &cache_path {
            let written = match path.parent() {
                Some(parent) => match tokio::fs::create_dir_all(parent).await {
                    Ok(()) => tokio::fs::write(path, &bytes).await,
                    Err(e) => Err(e),
                },
                None => tokio::fs::write(path, &bytes).await,
            };
            if let Err(e) = written {
                warn!("Failed to cache {} at {}: {}", url, path.display(), e);
            }
        }

        Ok(bytes)
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let name: String = url
            .split("://")
            .last()
            .unwrap_or(url)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
            .collect();
        Some(dir.join(name))
    }
}

pub(crate) fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::ParseError(format!("invalid selector {css}: {e:?}")))
}

/// Inflate gzip payloads; anything else is returned untouched.
pub fn decompress(bytes: Vec<u8>) -> Result<Vec<u8>, FetchError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(bytes.as_slice());
        let mut inflated = Vec::new();
        decoder.read_to_end(&mut inflated)?;
        debug!("Inflated {} -> {} bytes", bytes.len(), inflated.len());
        Ok(inflated)
    } else {
        Ok(bytes)
    }
}
