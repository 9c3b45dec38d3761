use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE_NAME: &str = "ccmod.json";

/// The subset of a `ccmod.json` manifest that packaging depends on.
///
/// Only `id` and `version` are read. Every other key of the manifest
/// (dependencies, titles, icons, ...) is ignored so that manifests carrying
/// loader-specific metadata still deserialize.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ModManifest {
    pub id: String,
    pub version: String,
}
