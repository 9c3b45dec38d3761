use super::ModManifest;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Json(#[source] serde_json::Error),
    #[error("manifest field '{field}' must not be empty")]
    EmptyField { field: &'static str },
    #[error("manifest field '{field}' has value '{value}' which cannot be used in a file name")]
    InvalidField { field: &'static str, value: String },
}

/// Checks that `id` and `version` can be spliced into archive names and
/// archive paths.
pub fn validate(manifest: &ModManifest) -> Result<(), ManifestError> {
    validate_field("id", &manifest.id)?;
    validate_field("version", &manifest.version)?;
    Ok(())
}

fn validate_field(field: &'static str, value: &str) -> Result<(), ManifestError> {
    if value.trim().is_empty() {
        return Err(ManifestError::EmptyField { field });
    }
    let unsafe_char = value
        .chars()
        .any(|ch| ch == '/' || ch == '\\' || ch.is_control());
    if unsafe_char || value == "." || value == ".." {
        return Err(ManifestError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
