pub mod layout;
pub mod naming;

pub use layout::{
    archive_layout, expand_root, join_archive_path, ArchiveLayout, DEFAULT_QUICK_INSTALL_ROOT,
};
pub use naming::{archive_name, ArchiveKind, ArchiveNameError, ArchiveVariant};
