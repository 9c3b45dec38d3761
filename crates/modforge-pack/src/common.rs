use std::fs;
use std::path::{Component, Path};

use crate::entry::{ArchiveEntry, DEFAULT_FILE_MODE, EXECUTABLE_FILE_MODE};
use crate::PackError;

/// Converts a relative host path into `/`-separated archive form.
pub(crate) fn path_to_archive_path(path: &Path) -> Result<String, PackError> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(|| {
                    PackError::invalid_entry(&path.display().to_string(), "path is not valid UTF-8")
                })?;
                components.push(segment);
            }
            Component::CurDir => {}
            _ => {
                return Err(PackError::invalid_entry(
                    &path.display().to_string(),
                    "expected a relative path without '..'",
                ))
            }
        }
    }
    Ok(components.join("/"))
}

/// Builds the entry for one filesystem member, read without following
/// symlinks. Permission bits are normalized so the output does not depend on
/// the builder's umask: directories get 0755, files 0755 when any execute bit
/// is set and 0644 otherwise.
pub(crate) fn filesystem_entry(
    source: &Path,
    archived_path: &str,
    file_type: fs::FileType,
    mtime: u64,
) -> Result<ArchiveEntry, PackError> {
    if file_type.is_dir() {
        return Ok(ArchiveEntry::directory(archived_path, mtime));
    }
    if file_type.is_symlink() {
        let target = fs::read_link(source).map_err(PackError::io(format!(
            "failed to read symlink '{}'",
            source.display()
        )))?;
        let target = target.to_str().ok_or_else(|| {
            PackError::invalid_entry(archived_path, "symlink target is not valid UTF-8")
        })?;
        return Ok(ArchiveEntry::symlink(
            archived_path,
            target.replace('\\', "/"),
            mtime,
        ));
    }
    let metadata = fs::metadata(source).map_err(PackError::io(format!(
        "failed to read metadata of '{}'",
        source.display()
    )))?;
    let data = fs::read(source).map_err(PackError::io(format!(
        "failed to read '{}'",
        source.display()
    )))?;
    Ok(ArchiveEntry::file(archived_path, data, mtime).with_mode(normalized_file_mode(&metadata)))
}

#[cfg(unix)]
fn normalized_file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    if metadata.permissions().mode() & 0o111 != 0 {
        EXECUTABLE_FILE_MODE
    } else {
        DEFAULT_FILE_MODE
    }
}

#[cfg(not(unix))]
fn normalized_file_mode(_metadata: &fs::Metadata) -> u32 {
    DEFAULT_FILE_MODE
}
