use std::path::Path;

use serde::Deserialize;

use crate::artifact::DEFAULT_QUICK_INSTALL_ROOT;
use crate::manifest::MANIFEST_FILE_NAME;

pub const CONFIG_FILE_NAME: &str = "modforge.yaml";
pub const DEFAULT_OUTPUT_DIR: &str = "dist";
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

pub const DEFAULT_FILE_PATTERNS: &[&str] = &[
    "ccmod.json",
    "icon*.png",
    "LICENSE*",
    "README*",
    "packs-mapping.json",
    "src/**/*.js",
    "packs/**/*.json",
    "assets/**/*.png",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[source] std::io::Error),
    #[error("failed to parse config: {0}")]
    Yaml(#[source] serde_yaml::Error),
    #[error("config '{path}' must declare at least one file pattern")]
    MissingFiles { path: String },
    #[error("compression level {level} is outside 0..=9")]
    InvalidCompressionLevel { level: u32 },
    #[error("invalid dependency '{name}': {reason}")]
    InvalidDependency { name: String, reason: String },
}

/// Packaging settings read from `modforge.yaml`.
///
/// Every key is optional. A project without the file packages the default
/// file patterns with no bundled dependencies.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModforgeConfig {
    #[serde(default = "default_files")]
    pub files: Vec<String>,
    #[serde(default = "default_manifest")]
    pub manifest: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_quick_install_root")]
    pub quick_install_root: String,
    #[serde(default)]
    pub archive: ArchiveSettings,
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
}

impl Default for ModforgeConfig {
    fn default() -> Self {
        Self {
            files: default_files(),
            manifest: default_manifest(),
            output_dir: default_output_dir(),
            quick_install_root: default_quick_install_root(),
            archive: ArchiveSettings::default(),
            dependencies: Vec::new(),
        }
    }
}

/// Encoder settings shared by both archive formats.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSettings {
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    #[serde(default)]
    pub strict_timestamps: bool,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            strict_timestamps: false,
        }
    }
}

/// A gzip-compressed tarball bundled into the quick-install archive.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub strip_components: usize,
}

impl DependencyConfig {
    /// Name of the cached download: `filename` if set, otherwise the last
    /// segment of the URL path.
    pub fn download_file_name(&self) -> Result<String, ConfigError> {
        if let Some(filename) = &self.filename {
            return Ok(filename.clone());
        }
        url_basename(&self.url)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::InvalidDependency {
                name: self.name.clone(),
                reason: format!("cannot derive a file name from url '{}'", self.url),
            })
    }
}

pub fn load_config(project_dir: &Path) -> Result<ModforgeConfig, ConfigError> {
    let (path, contents) = match read_optional_config(project_dir)? {
        Some(value) => value,
        None => {
            tracing::debug!(dir = %project_dir.display(), "no {} found, using defaults", CONFIG_FILE_NAME);
            return Ok(ModforgeConfig::default());
        }
    };

    let config: ModforgeConfig = serde_yaml::from_str(&contents).map_err(ConfigError::Yaml)?;
    if config.files.is_empty() {
        return Err(ConfigError::MissingFiles { path });
    }
    if config.archive.compression_level > 9 {
        return Err(ConfigError::InvalidCompressionLevel {
            level: config.archive.compression_level,
        });
    }
    for dependency in &config.dependencies {
        validate_dependency(dependency)?;
    }
    Ok(config)
}

fn validate_dependency(dependency: &DependencyConfig) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDependency {
        name: dependency.name.clone(),
        reason: reason.to_string(),
    };
    if dependency.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if dependency.url.trim().is_empty() {
        return Err(invalid("url must not be empty"));
    }
    if dependency.prefix.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(invalid("prefix must not contain '..'"));
    }
    let file_name = dependency.download_file_name()?;
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name == ".." {
        return Err(invalid("filename must be a plain file name"));
    }
    Ok(())
}

fn url_basename(url: &str) -> Option<&str> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let path = without_fragment.split('?').next().unwrap_or(without_fragment);
    let path = match path.find("://") {
        Some(idx) => {
            let rest = &path[idx + 3..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or("")
        }
        None => path,
    };
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

fn read_optional_config(project_dir: &Path) -> Result<Option<(String, String)>, ConfigError> {
    let yaml_path = project_dir.join(CONFIG_FILE_NAME);
    if !yaml_path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&yaml_path).map_err(ConfigError::Io)?;
    Ok(Some((
        yaml_path.to_str().unwrap_or(CONFIG_FILE_NAME).to_string(),
        contents,
    )))
}

fn default_files() -> Vec<String> {
    DEFAULT_FILE_PATTERNS
        .iter()
        .map(|pattern| pattern.to_string())
        .collect()
}

fn default_manifest() -> String {
    MANIFEST_FILE_NAME.to_string()
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

fn default_quick_install_root() -> String {
    DEFAULT_QUICK_INSTALL_ROOT.to_string()
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}
