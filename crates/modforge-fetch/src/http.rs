use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::cache::DownloadCache;
use crate::request::{FetchError, FetchRequest, Fetcher};

const USER_AGENT: &str = "modforge";
const TIMEOUT: Duration = Duration::from_secs(5);

/// Downloads over HTTP(S) into a [`DownloadCache`], reusing cached files.
pub struct HttpFetcher {
    client: Client,
    cache: DownloadCache,
}

impl HttpFetcher {
    pub fn new(cache: DownloadCache) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, cache })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<PathBuf, FetchError> {
        if let Some(path) = self.cache.lookup(&request.filename)? {
            tracing::debug!(path = %path.display(), "using cached download");
            return Ok(path);
        }

        tracing::info!(url = %request.url, "downloading");
        let mut response = self
            .client
            .get(&request.url)
            .send()
            .map_err(|source| FetchError::Request {
                url: request.url.clone(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: request.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let mut staged = self.cache.staging_file()?;
        let bytes = response
            .copy_to(staged.as_file_mut())
            .map_err(|source| FetchError::Request {
                url: request.url.clone(),
                source,
            })?;
        let path = self.cache.commit(staged, &request.filename)?;
        tracing::info!(path = %path.display(), bytes, "downloaded");
        Ok(path)
    }
}
