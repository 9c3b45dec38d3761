use std::io;
use std::path::PathBuf;

use modforge_core::config::{ConfigError, DependencyConfig};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Name of the file in the download cache.
    pub filename: String,
}

impl FetchRequest {
    pub fn from_dependency(dependency: &DependencyConfig) -> Result<Self, FetchError> {
        Ok(Self {
            url: dependency.url.clone(),
            filename: dependency.download_file_name()?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid download file name '{filename}'")]
    InvalidFileName { filename: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to '{url}' returned {status}")]
    Status { url: String, status: u16 },
    #[error("'{filename}' is not cached and downloads are disabled")]
    NotCached { filename: String },
}

impl FetchError {
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> FetchError {
        let context = context.into();
        move |source| FetchError::Io { context, source }
    }
}

/// Source of dependency archives. Implementations return the path of a
/// complete local copy.
pub trait Fetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<PathBuf, FetchError>;
}

pub fn fetch_dependency<F: Fetcher + ?Sized>(
    fetcher: &F,
    dependency: &DependencyConfig,
) -> Result<PathBuf, FetchError> {
    let request = FetchRequest::from_dependency(dependency)?;
    tracing::debug!(name = %dependency.name, url = %request.url, "fetching dependency");
    fetcher.fetch(&request)
}
