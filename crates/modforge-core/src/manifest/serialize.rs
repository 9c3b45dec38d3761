use std::fs;
use std::path::Path;

use super::{validate, ManifestError, ModManifest};

pub fn deserialize_manifest(input: &str) -> Result<ModManifest, ManifestError> {
    let manifest: ModManifest = serde_json::from_str(input).map_err(ManifestError::Json)?;
    validate(&manifest)?;
    Ok(manifest)
}

pub fn read_manifest(path: &Path) -> Result<ModManifest, ManifestError> {
    let contents = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let manifest = deserialize_manifest(&contents)?;
    tracing::debug!(
        path = %path.display(),
        id = %manifest.id,
        version = %manifest.version,
        "read mod manifest"
    );
    Ok(manifest)
}
