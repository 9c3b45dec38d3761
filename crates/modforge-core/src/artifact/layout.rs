use super::naming::ArchiveVariant;

pub const DEFAULT_QUICK_INSTALL_ROOT: &str = "assets/mods/{id}";
const ID_PLACEHOLDER: &str = "{id}";

/// Where the mod's own files live inside an archive variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveLayout {
    pub variant: ArchiveVariant,
    pub mod_root: String,
}

impl ArchiveLayout {
    pub fn mod_file_path(&self, relative: &str) -> String {
        join_archive_path(&self.mod_root, relative)
    }
}

pub fn archive_layout(
    mod_id: &str,
    variant: ArchiveVariant,
    quick_install_root: &str,
) -> ArchiveLayout {
    let mod_root = match variant {
        ArchiveVariant::Standalone => mod_id.to_string(),
        ArchiveVariant::QuickInstall => expand_root(quick_install_root, mod_id),
    };
    ArchiveLayout { variant, mod_root }
}

/// Substitutes `{id}` and normalizes the template into a slash-separated
/// prefix without leading or trailing separators.
pub fn expand_root(template: &str, mod_id: &str) -> String {
    let expanded = template.replace(ID_PLACEHOLDER, mod_id).replace('\\', "/");
    expanded
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Joins two archive paths; an empty prefix yields the suffix unchanged.
pub fn join_archive_path(prefix: &str, suffix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let suffix = suffix.trim_start_matches('/');
    if prefix.is_empty() {
        return suffix.to_string();
    }
    if suffix.is_empty() {
        return prefix.to_string();
    }
    format!("{}/{}", prefix, suffix)
}
