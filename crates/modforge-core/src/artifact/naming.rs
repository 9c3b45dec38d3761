#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    pub const ALL: [ArchiveKind; 2] = [ArchiveKind::TarGz, ArchiveKind::Zip];

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveKind::TarGz => ".tgz",
            ArchiveKind::Zip => ".zip",
        }
    }
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveKind::TarGz => f.write_str("tar.gz"),
            ArchiveKind::Zip => f.write_str("zip"),
        }
    }
}

/// Which tree an archive carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveVariant {
    /// Only the mod's own files, under a directory named after the mod id.
    Standalone,
    /// The mod's files plus every bundled dependency, laid out as a game
    /// directory that can be extracted in place.
    QuickInstall,
}

impl ArchiveVariant {
    pub const ALL: [ArchiveVariant; 2] = [ArchiveVariant::Standalone, ArchiveVariant::QuickInstall];

    fn infix(self) -> &'static str {
        match self {
            ArchiveVariant::Standalone => "",
            ArchiveVariant::QuickInstall => "_quick-install",
        }
    }
}

pub fn archive_name(
    mod_id: &str,
    version: &str,
    variant: ArchiveVariant,
    kind: ArchiveKind,
) -> Result<String, ArchiveNameError> {
    validate_component("id", mod_id)?;
    validate_component("version", version)?;
    Ok(format!(
        "{}{}_v{}{}",
        mod_id,
        variant.infix(),
        version,
        kind.extension()
    ))
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveNameError {
    #[error("invalid {field} value '{value}' for an archive name")]
    InvalidComponent { field: &'static str, value: String },
}

fn validate_component(field: &'static str, value: &str) -> Result<(), ArchiveNameError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value
            .chars()
            .any(|ch| ch == '/' || ch == '\\' || ch.is_control());
    if invalid {
        return Err(ArchiveNameError::InvalidComponent {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
