use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use modforge_core::artifact::join_archive_path;
use tar::{Archive, EntryType};

use crate::writer::ArchiveWriter;
use crate::PackError;

/// What a merge copied and what it dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub files: usize,
    pub symlinks: usize,
    pub skipped_directories: usize,
    pub skipped_unsupported: usize,
    pub skipped_stripped: usize,
}

/// Replays the members of a downloaded `.tar.gz` into `writer` under
/// `archived_prefix`, after removing `strip_components` leading segments
/// from each member path.
pub fn merge_dependency(
    dependency: &Path,
    writer: &mut ArchiveWriter,
    archived_prefix: &str,
    strip_components: usize,
) -> Result<MergeSummary, PackError> {
    let file = File::open(dependency).map_err(PackError::io(format!(
        "failed to open dependency archive '{}'",
        dependency.display()
    )))?;
    tracing::info!(
        dependency = %dependency.display(),
        prefix = archived_prefix,
        strip_components,
        "merging dependency"
    );
    merge_tar_gz(BufReader::new(file), writer, archived_prefix, strip_components)
}

/// Regular files and symlinks are copied with their own mtime. Directories
/// are dropped, since every consumer creates them implicitly. Devices, pipes
/// and other member kinds cannot be represented in zip and are dropped with
/// a warning.
pub fn merge_tar_gz<R: Read>(
    reader: R,
    writer: &mut ArchiveWriter,
    archived_prefix: &str,
    strip_components: usize,
) -> Result<MergeSummary, PackError> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut summary = MergeSummary::default();
    let members = archive
        .entries()
        .map_err(PackError::io("failed to read dependency archive"))?;
    for member in members {
        let mut member = member.map_err(PackError::io("failed to read dependency member"))?;
        let member_path = member
            .path()
            .map_err(PackError::io("failed to decode dependency member path"))?
            .into_owned();
        let display_path = member_path.display().to_string();
        let entry_type = member.header().entry_type();

        match entry_type {
            EntryType::Directory => {
                tracing::debug!(member = %display_path, "skipping directory member");
                summary.skipped_directories += 1;
                continue;
            }
            // GitHub tarballs open with a pax global header holding the
            // commit id; it is archive metadata, not a member.
            EntryType::XGlobalHeader | EntryType::XHeader => {
                tracing::debug!(member = %display_path, "skipping pax header");
                continue;
            }
            kind if is_supported(kind) => {}
            kind => {
                tracing::warn!(
                    member = %display_path,
                    kind = ?kind,
                    "dropping unsupported dependency member"
                );
                summary.skipped_unsupported += 1;
                continue;
            }
        }

        let relative = match strip_member_path(&member_path, strip_components)? {
            Some(relative) => relative,
            None => {
                tracing::warn!(
                    member = %display_path,
                    strip_components,
                    "dropping member with no path left after stripping"
                );
                summary.skipped_stripped += 1;
                continue;
            }
        };
        let archived_path = join_archive_path(archived_prefix, &relative);
        let mtime = member
            .header()
            .mtime()
            .map_err(PackError::io(format!("invalid mtime on '{}'", display_path)))?;

        if entry_type.is_symlink() {
            let target = member
                .link_name_bytes()
                .ok_or_else(|| PackError::invalid_entry(&display_path, "symlink without target"))?;
            let target = String::from_utf8(target.into_owned()).map_err(|_| {
                PackError::invalid_entry(&display_path, "symlink target is not valid UTF-8")
            })?;
            writer.add_symlink(&archived_path, &target, mtime)?;
            summary.symlinks += 1;
        } else {
            // The declared size is untrusted, so the buffer grows with the data.
            let expected = member.size();
            let mut content = Vec::new();
            member
                .read_to_end(&mut content)
                .map_err(PackError::io(format!("failed to read '{}'", display_path)))?;
            if content.len() as u64 != expected {
                return Err(PackError::SizeMismatch {
                    path: display_path,
                    expected,
                    actual: content.len() as u64,
                });
            }
            writer.add_file(&archived_path, &content, mtime)?;
            summary.files += 1;
        }
    }
    tracing::debug!(?summary, "merged dependency");
    Ok(summary)
}

/// GNU sparse members are files; the reader fills in their holes.
fn is_supported(kind: EntryType) -> bool {
    kind.is_file() || kind.is_contiguous() || kind.is_gnu_sparse() || kind.is_symlink()
}

/// Removes the first `strip_components` segments; `None` when nothing is
/// left. `.` segments are ignored and `..` or absolute paths are rejected.
fn strip_member_path(path: &Path, strip_components: usize) -> Result<Option<String>, PackError> {
    let display = path.display().to_string();
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment
                    .to_str()
                    .ok_or_else(|| PackError::invalid_entry(&display, "path is not valid UTF-8"))?;
                segments.push(segment);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(PackError::invalid_entry(&display, "path must not contain '..'"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PackError::invalid_entry(&display, "path must be relative"));
            }
        }
    }
    if segments.len() <= strip_components {
        return Ok(None);
    }
    Ok(Some(segments[strip_components..].join("/")))
}
