use std::path::{Component, Path};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;

#[derive(Debug, thiserror::Error)]
pub enum FileSetError {
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },
    #[error("failed to walk project files: {0}")]
    Walk(#[source] ignore::Error),
    #[error("path '{path}' is not valid UTF-8")]
    NonUtf8Path { path: String },
    #[error("no files in '{dir}' matched the configured patterns")]
    Empty { dir: String },
}

/// The mod's own files as project-relative, `/`-separated paths.
///
/// Paths are kept sorted by their raw string value, so `a.b/1.js` sorts
/// before `a/1.js` ('.' is 0x2E, '/' is 0x2F). Archive byte identity relies
/// on this order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModFileSet {
    paths: Vec<String>,
}

impl ModFileSet {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        paths.sort();
        paths.dedup();
        Self { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Collects files under `project_dir` matching any of `patterns`.
///
/// Patterns use gitignore glob syntax and are anchored at the project root,
/// so `icon*.png` only matches top-level icons while `src/**/*.js` matches
/// at any depth below `src`. Directories listed in `excluded_dirs` (relative
/// to the project) are never entered. Hidden files and directories are
/// skipped unless a pattern names them literally, as shell globbing does.
/// Only regular files and symlinks are returned.
pub fn collect_mod_files(
    project_dir: &Path,
    patterns: &[String],
    excluded_dirs: &[&str],
) -> Result<ModFileSet, FileSetError> {
    let mut overrides = OverrideBuilder::new(project_dir);
    for pattern in patterns {
        overrides
            .add(&anchor(pattern))
            .map_err(|source| FileSetError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
    }
    for dir in [".git"].iter().chain(excluded_dirs) {
        let glob = format!("!{}/", anchor(dir.trim_end_matches('/')));
        overrides
            .add(&glob)
            .map_err(|source| FileSetError::Pattern {
                pattern: glob.clone(),
                source,
            })?;
    }
    let overrides = overrides.build().map_err(FileSetError::Walk)?;

    let literal_hidden = literal_hidden_names(patterns);
    let walker = WalkBuilder::new(project_dir)
        .standard_filters(false)
        .follow_links(false)
        .overrides(overrides)
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0
                || !name.starts_with('.')
                || literal_hidden.iter().any(|literal| *literal == name)
        })
        .build();

    let mut paths = Vec::new();
    for entry in walker {
        let entry = entry.map_err(FileSetError::Walk)?;
        let is_member = entry
            .file_type()
            .map(|kind| kind.is_file() || kind.is_symlink())
            .unwrap_or(false);
        if !is_member {
            continue;
        }
        let relative = entry.path().strip_prefix(project_dir).unwrap_or(entry.path());
        paths.push(relative_archive_path(relative)?);
    }

    let files = ModFileSet::from_paths(paths);
    if files.is_empty() {
        return Err(FileSetError::Empty {
            dir: project_dir.display().to_string(),
        });
    }
    tracing::debug!(count = files.len(), "collected mod files");
    Ok(files)
}

fn anchor(pattern: &str) -> String {
    let pattern = pattern.trim_start_matches("./");
    if pattern.starts_with('/') {
        pattern.to_string()
    } else {
        format!("/{}", pattern)
    }
}

/// Dot-prefixed pattern segments without wildcards, such as `.modrc`.
fn literal_hidden_names(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|pattern| pattern.split('/'))
        .filter(|segment| {
            segment.starts_with('.')
                && *segment != "."
                && *segment != ".."
                && !segment.contains(['*', '?', '['])
        })
        .map(str::to_string)
        .collect()
}

fn relative_archive_path(path: &Path) -> Result<String, FileSetError> {
    let mut segments = Vec::new();
    for component in path.components() {
        if let Component::Normal(segment) = component {
            let segment = segment.to_str().ok_or_else(|| FileSetError::NonUtf8Path {
                path: path.display().to_string(),
            })?;
            segments.push(segment);
        }
    }
    Ok(segments.join("/"))
}
