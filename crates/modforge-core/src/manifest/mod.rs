pub mod schema;
pub mod serialize;
pub mod validate;

pub use schema::{ModManifest, MANIFEST_FILE_NAME};
pub use serialize::{deserialize_manifest, read_manifest};
pub use validate::{validate, ManifestError};
