use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::request::{FetchError, FetchRequest, Fetcher};

/// Downloads live in `{output_dir}/download`.
pub const DOWNLOAD_DIR_NAME: &str = "download";

/// Flat directory of downloaded dependency archives keyed by file name.
#[derive(Clone, Debug)]
pub struct DownloadCache {
    dir: PathBuf,
}

impl DownloadCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn in_output_dir(output_dir: &Path) -> Self {
        Self::new(output_dir.join(DOWNLOAD_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, filename: &str) -> Result<PathBuf, FetchError> {
        let plain = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\']);
        if !plain {
            return Err(FetchError::InvalidFileName {
                filename: filename.to_string(),
            });
        }
        Ok(self.dir.join(filename))
    }

    /// The cached copy of `filename`, if one exists.
    pub fn lookup(&self, filename: &str) -> Result<Option<PathBuf>, FetchError> {
        let path = self.path_for(filename)?;
        Ok(path.is_file().then_some(path))
    }

    /// Temporary file in the cache dir; [`DownloadCache::commit`] moves it
    /// into place. Dropping it instead removes it.
    pub fn staging_file(&self) -> Result<NamedTempFile, FetchError> {
        fs::create_dir_all(&self.dir).map_err(FetchError::io(format!(
            "failed to create download dir '{}'",
            self.dir.display()
        )))?;
        tempfile::Builder::new()
            .prefix(".modforge-")
            .suffix(".partial")
            .tempfile_in(&self.dir)
            .map_err(FetchError::io(format!(
                "failed to create temporary file in '{}'",
                self.dir.display()
            )))
    }

    pub fn commit(&self, staged: NamedTempFile, filename: &str) -> Result<PathBuf, FetchError> {
        let path = self.path_for(filename)?;
        staged
            .as_file()
            .sync_all()
            .map_err(FetchError::io(format!("failed to flush '{}'", filename)))?;
        staged.persist(&path).map_err(|err| FetchError::Io {
            context: format!("failed to store download at '{}'", path.display()),
            source: err.error,
        })?;
        Ok(path)
    }
}

/// Serves only what is already in the download cache.
#[derive(Clone, Debug)]
pub struct OfflineFetcher {
    cache: DownloadCache,
}

impl OfflineFetcher {
    pub fn new(cache: DownloadCache) -> Self {
        Self { cache }
    }
}

impl Fetcher for OfflineFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<PathBuf, FetchError> {
        match self.cache.lookup(&request.filename)? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using cached download");
                Ok(path)
            }
            None => Err(FetchError::NotCached {
                filename: request.filename.clone(),
            }),
        }
    }
}
