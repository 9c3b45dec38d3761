use std::io;

mod common;
pub mod entry;
pub mod merge;
pub mod tar;
pub mod writer;
pub mod zip;

pub use entry::{ArchiveEntry, EntryKind, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, SYMLINK_MODE};
pub use merge::{merge_dependency, merge_tar_gz, MergeSummary};
pub use writer::{stage_archive, write_archive, ArchiveWriter, StagedArchive, WriterSettings};
pub use self::zip::{zip_timestamp, ZipTimestamp};

pub use modforge_core::artifact::ArchiveKind;

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid archive entry '{path}': {reason}")]
    InvalidEntry { path: String, reason: String },
    #[error("dependency member '{path}' declares {expected} bytes but {actual} were read")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },
    #[error("timestamp {mtime} is outside the zip date range 1980-01-01..=2107-12-31")]
    TimestampOutOfRange { mtime: u64 },
    #[error("zip encoding failed: {0}")]
    Zip(#[from] ::zip::result::ZipError),
}

impl PackError {
    /// Adapter for `map_err` that attaches what was being attempted.
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> PackError {
        let context = context.into();
        move |source| PackError::Io { context, source }
    }

    pub(crate) fn invalid_entry(path: &str, reason: impl Into<String>) -> PackError {
        PackError::InvalidEntry {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
