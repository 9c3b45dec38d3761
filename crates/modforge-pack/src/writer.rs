use std::fs;
use std::path::{Path, PathBuf};

use modforge_core::artifact::join_archive_path;
use modforge_core::config::{ArchiveSettings, DEFAULT_COMPRESSION_LEVEL};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::common::{filesystem_entry, path_to_archive_path};
use crate::entry::ArchiveEntry;
use crate::tar::TarGzWriter;
use crate::zip::ZipArchiveWriter;
use crate::{ArchiveKind, PackError};

/// Encoder settings consulted by every entry-adding path of both backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterSettings {
    /// 0-9, used for the gzip stream and for DEFLATE in zip.
    pub compression_level: u32,
    /// Fail instead of clamping when a zip date is out of range.
    pub strict_timestamps: bool,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            strict_timestamps: false,
        }
    }
}

impl From<&ArchiveSettings> for WriterSettings {
    fn from(settings: &ArchiveSettings) -> Self {
        Self {
            compression_level: settings.compression_level,
            strict_timestamps: settings.strict_timestamps,
        }
    }
}

enum Backend {
    TarGz(TarGzWriter),
    Zip(ZipArchiveWriter),
}

/// Sequential writer for one output archive.
///
/// Entries go to a temporary file beside the destination, which is renamed
/// into place by [`ArchiveWriter::finish`]. Dropping the writer without
/// finishing deletes the temporary file, so the destination only ever holds
/// a complete archive.
pub struct ArchiveWriter {
    backend: Backend,
    destination: PathBuf,
    entries: usize,
}

impl ArchiveWriter {
    pub fn create(
        kind: ArchiveKind,
        destination: &Path,
        settings: WriterSettings,
    ) -> Result<Self, PackError> {
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(PackError::io(format!(
            "failed to create output dir '{}'",
            parent.display()
        )))?;
        let file = tempfile::Builder::new()
            .prefix(".modforge-")
            .suffix(".partial")
            .tempfile_in(parent)
            .map_err(PackError::io(format!(
                "failed to create temporary archive in '{}'",
                parent.display()
            )))?;
        let backend = match kind {
            ArchiveKind::TarGz => Backend::TarGz(TarGzWriter::new(file, &settings)),
            ArchiveKind::Zip => Backend::Zip(ZipArchiveWriter::new(file, &settings)),
        };
        tracing::debug!(path = %destination.display(), %kind, "opened archive");
        Ok(Self {
            backend,
            destination: destination.to_path_buf(),
            entries: 0,
        })
    }

    pub fn kind(&self) -> ArchiveKind {
        match self.backend {
            Backend::TarGz(_) => ArchiveKind::TarGz,
            Backend::Zip(_) => ArchiveKind::Zip,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn add_entry(&mut self, entry: &ArchiveEntry) -> Result<(), PackError> {
        entry.validate()?;
        match &mut self.backend {
            Backend::TarGz(writer) => writer.append(entry)?,
            Backend::Zip(writer) => writer.append(entry)?,
        }
        self.entries += 1;
        tracing::trace!(path = %entry.path, kind = entry.kind_name(), mtime = entry.mtime, "added entry");
        Ok(())
    }

    pub fn add_file(&mut self, name: &str, data: &[u8], mtime: u64) -> Result<(), PackError> {
        self.add_entry(&ArchiveEntry::file(name, data, mtime))
    }

    pub fn add_symlink(&mut self, name: &str, target: &str, mtime: u64) -> Result<(), PackError> {
        self.add_entry(&ArchiveEntry::symlink(name, target, mtime))
    }

    pub fn add_directory(&mut self, name: &str, mtime: u64) -> Result<(), PackError> {
        self.add_entry(&ArchiveEntry::directory(name, mtime))
    }

    /// Adds `source` from the filesystem as `archived_name`.
    ///
    /// Directories are descended when `recursive` is set, children in file
    /// name order. `predicate` sees each archived path; rejecting a directory
    /// skips everything below it. Symlinks are stored as links. Returns the
    /// number of entries added; any read failure aborts the call.
    pub fn add_from_filesystem(
        &mut self,
        source: &Path,
        archived_name: &str,
        recursive: bool,
        predicate: Option<&dyn Fn(&str) -> bool>,
        mtime: u64,
    ) -> Result<usize, PackError> {
        let mut walker = WalkDir::new(source)
            .follow_links(false)
            .follow_root_links(false)
            .sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(0);
        }

        let mut added = 0;
        let mut members = walker.into_iter();
        while let Some(member) = members.next() {
            let member = member.map_err(|err| PackError::Io {
                context: format!("failed to walk '{}'", source.display()),
                source: err.into(),
            })?;
            let relative = member.path().strip_prefix(source).unwrap_or(Path::new(""));
            let archived_path = join_archive_path(archived_name, &path_to_archive_path(relative)?);
            let file_type = member.file_type();
            if let Some(predicate) = predicate {
                if !predicate(&archived_path) {
                    if file_type.is_dir() {
                        members.skip_current_dir();
                    }
                    continue;
                }
            }
            let entry = filesystem_entry(member.path(), &archived_path, file_type, mtime)?;
            self.add_entry(&entry)?;
            added += 1;
        }
        Ok(added)
    }

    /// Writes the container trailer and atomically moves the archive to its
    /// destination.
    pub fn finish(self) -> Result<PathBuf, PackError> {
        self.stage()?.persist()
    }

    /// Writes the container trailer but leaves the archive under its
    /// temporary name, so several archives can be published together.
    pub fn stage(self) -> Result<StagedArchive, PackError> {
        let file = match self.backend {
            Backend::TarGz(writer) => writer.finish()?,
            Backend::Zip(writer) => writer.finish()?,
        };
        file.as_file()
            .sync_all()
            .map_err(PackError::io("failed to flush archive"))?;
        Ok(StagedArchive {
            file,
            destination: self.destination,
            entries: self.entries,
        })
    }
}

/// A complete archive that has not been moved to its destination yet.
/// Dropping it deletes the temporary file.
pub struct StagedArchive {
    file: NamedTempFile,
    destination: PathBuf,
    entries: usize,
}

impl StagedArchive {
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn persist(self) -> Result<PathBuf, PackError> {
        set_published_mode(self.file.path())?;
        self.file.persist(&self.destination).map_err(|err| PackError::Io {
            context: format!("failed to move archive to '{}'", self.destination.display()),
            source: err.error,
        })?;
        tracing::info!(path = %self.destination.display(), entries = self.entries, "wrote archive");
        Ok(self.destination)
    }
}

/// Creates an archive, lets `build` fill it and finishes it. When `build`
/// fails the partial archive is discarded and the error is returned.
pub fn write_archive<F, E>(
    kind: ArchiveKind,
    destination: &Path,
    settings: WriterSettings,
    build: F,
) -> Result<PathBuf, E>
where
    F: FnOnce(&mut ArchiveWriter) -> Result<(), E>,
    E: From<PackError>,
{
    let staged = stage_archive(kind, destination, settings, build)?;
    Ok(staged.persist()?)
}

/// Like [`write_archive`] but stops before publishing.
pub fn stage_archive<F, E>(
    kind: ArchiveKind,
    destination: &Path,
    settings: WriterSettings,
    build: F,
) -> Result<StagedArchive, E>
where
    F: FnOnce(&mut ArchiveWriter) -> Result<(), E>,
    E: From<PackError>,
{
    let mut writer = ArchiveWriter::create(kind, destination, settings)?;
    build(&mut writer)?;
    Ok(writer.stage()?)
}

#[cfg(unix)]
fn set_published_mode(path: &Path) -> Result<(), PackError> {
    use std::os::unix::fs::PermissionsExt;

    const PUBLISHED_FILE_MODE: u32 = 0o644;

    fs::set_permissions(path, fs::Permissions::from_mode(PUBLISHED_FILE_MODE))
        .map_err(PackError::io(format!("failed to set permissions on '{}'", path.display())))
}

#[cfg(not(unix))]
fn set_published_mode(_path: &Path) -> Result<(), PackError> {
    Ok(())
}
