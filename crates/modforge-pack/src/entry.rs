use crate::PackError;

pub const DEFAULT_FILE_MODE: u32 = 0o644;
pub const SYMLINK_MODE: u32 = 0o777;
pub const DEFAULT_DIR_MODE: u32 = 0o755;
pub(crate) const EXECUTABLE_FILE_MODE: u32 = 0o755;

const PERMISSION_BITS: u32 = 0o7777;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File(Vec<u8>),
    /// Link target, stored verbatim and never resolved.
    Symlink(String),
    Directory,
}

/// One member of an archive, independent of the container format.
///
/// `mtime` is always supplied by the caller; nothing here reads the clock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub kind: EntryKind,
    pub mode: u32,
    pub mtime: u64,
}

impl ArchiveEntry {
    pub fn file(path: impl Into<String>, data: impl Into<Vec<u8>>, mtime: u64) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File(data.into()),
            mode: DEFAULT_FILE_MODE,
            mtime,
        }
    }

    pub fn symlink(path: impl Into<String>, target: impl Into<String>, mtime: u64) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Symlink(target.into()),
            mode: SYMLINK_MODE,
            mtime,
        }
    }

    /// Directory names always end with `/`.
    pub fn directory(path: impl Into<String>, mtime: u64) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            kind: EntryKind::Directory,
            mode: DEFAULT_DIR_MODE,
            mtime,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode & PERMISSION_BITS;
        self
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EntryKind::File(_) => "file",
            EntryKind::Symlink(_) => "symlink",
            EntryKind::Directory => "directory",
        }
    }

    pub fn validate(&self) -> Result<(), PackError> {
        let path = self.path.as_str();
        let trimmed = if self.is_dir() {
            path.trim_end_matches('/')
        } else {
            path
        };
        if trimmed.is_empty() {
            return Err(PackError::invalid_entry(path, "path must not be empty"));
        }
        if path.contains('\\') {
            return Err(PackError::invalid_entry(path, "path must use '/' separators"));
        }
        if path.starts_with('/') {
            return Err(PackError::invalid_entry(path, "path must be relative"));
        }
        if trimmed.split('/').any(|segment| segment == "..") {
            return Err(PackError::invalid_entry(path, "path must not contain '..'"));
        }
        if trimmed.split('/').any(str::is_empty) || trimmed.ends_with('/') {
            return Err(PackError::invalid_entry(path, "path has an empty segment"));
        }
        if let EntryKind::Symlink(target) = &self.kind {
            if target.is_empty() {
                return Err(PackError::invalid_entry(path, "symlink target must not be empty"));
            }
        }
        Ok(())
    }
}
