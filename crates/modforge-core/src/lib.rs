pub mod artifact;
pub mod config;
pub mod fileset;
pub mod manifest;
pub mod timestamp;

pub use fileset::ModFileSet;
pub use manifest::ModManifest;
