use std::path::{Path, PathBuf};

use modforge_core::artifact::{archive_layout, archive_name, expand_root, ArchiveVariant};
use modforge_core::config::{self, DependencyConfig, ModforgeConfig};
use modforge_core::fileset::collect_mod_files;
use modforge_core::manifest::read_manifest;
use modforge_core::timestamp::resolve_timestamp;
use modforge_core::{ModFileSet, ModManifest};
use modforge_fetch::{fetch_dependency, DownloadCache, Fetcher, HttpFetcher, OfflineFetcher};
use modforge_pack::{
    merge_dependency, stage_archive, ArchiveKind, PackError, StagedArchive, WriterSettings,
};

pub struct DistArgs {
    pub project_dir: PathBuf,
    /// Overrides `outputDir` from `modforge.yaml`.
    pub output_dir: Option<PathBuf>,
    /// Pins every mod file to this time instead of resolving one.
    pub timestamp: Option<u64>,
    /// Use only dependencies already in the download cache.
    pub offline: bool,
}

pub struct DistOutcome {
    pub timestamp: u64,
    pub archive_paths: Vec<PathBuf>,
}

/// A dependency archive available on disk, ready to merge.
#[derive(Clone, Debug)]
pub struct ResolvedDependency {
    pub name: String,
    pub archive: PathBuf,
    pub prefix: String,
    pub strip_components: usize,
}

/// Everything needed to write the four archives, with no network or git
/// access left to do.
pub struct PackagePlan {
    pub project_dir: PathBuf,
    pub output_dir: PathBuf,
    pub manifest: ModManifest,
    pub files: ModFileSet,
    pub timestamp: u64,
    pub quick_install_root: String,
    pub settings: WriterSettings,
    pub dependencies: Vec<ResolvedDependency>,
}

pub fn run(args: DistArgs) -> Result<DistOutcome, String> {
    let project_dir = args.project_dir;
    let config = config::load_config(&project_dir).map_err(|err| err.to_string())?;
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| project_dir.join(&config.output_dir));

    let manifest_path = project_dir.join(&config.manifest);
    let manifest = read_manifest(&manifest_path).map_err(|err| err.to_string())?;
    tracing::info!(id = %manifest.id, version = %manifest.version, "packaging mod");

    let excluded = excluded_dirs(&project_dir, &output_dir);
    let excluded: Vec<&str> = excluded.iter().map(String::as_str).collect();
    let files = collect_mod_files(&project_dir, &config.files, &excluded)
        .map_err(|err| err.to_string())?;

    let (timestamp, source) =
        resolve_timestamp(&project_dir, args.timestamp).map_err(|err| err.to_string())?;
    tracing::info!(timestamp, ?source, "pinned file timestamp");

    let cache = DownloadCache::in_output_dir(&output_dir);
    let dependencies = if args.offline {
        resolve_dependencies(&OfflineFetcher::new(cache), &config.dependencies)?
    } else {
        let fetcher = HttpFetcher::new(cache).map_err(|err| err.to_string())?;
        resolve_dependencies(&fetcher, &config.dependencies)?
    };

    let plan = PackagePlan::new(
        project_dir,
        output_dir,
        &config,
        manifest,
        files,
        timestamp,
        dependencies,
    );
    let archive_paths = package(&plan)?;
    Ok(DistOutcome {
        timestamp,
        archive_paths,
    })
}

impl PackagePlan {
    pub fn new(
        project_dir: PathBuf,
        output_dir: PathBuf,
        config: &ModforgeConfig,
        manifest: ModManifest,
        files: ModFileSet,
        timestamp: u64,
        dependencies: Vec<ResolvedDependency>,
    ) -> Self {
        Self {
            project_dir,
            output_dir,
            manifest,
            files,
            timestamp,
            quick_install_root: config.quick_install_root.clone(),
            settings: WriterSettings::from(&config.archive),
            dependencies,
        }
    }
}

/// Downloads (or finds cached) every dependency, in configuration order.
pub fn resolve_dependencies<F: Fetcher + ?Sized>(
    fetcher: &F,
    dependencies: &[DependencyConfig],
) -> Result<Vec<ResolvedDependency>, String> {
    dependencies
        .iter()
        .map(|dependency| {
            let archive = fetch_dependency(fetcher, dependency).map_err(|err| {
                format!("failed to fetch dependency '{}': {}", dependency.name, err)
            })?;
            Ok(ResolvedDependency {
                name: dependency.name.clone(),
                archive,
                prefix: dependency.prefix.clone(),
                strip_components: dependency.strip_components,
            })
        })
        .collect()
}

/// Writes the standalone and quick-install archives for every container
/// format. Nothing is published until all of them are complete, so a failure
/// leaves no archive of this run in the output directory. Returns the archive
/// paths in the order they were written.
pub fn package(plan: &PackagePlan) -> Result<Vec<PathBuf>, String> {
    let id = plan.manifest.id.as_str();
    let version = plan.manifest.version.as_str();
    let mut staged: Vec<StagedArchive> = Vec::new();
    for kind in ArchiveKind::ALL {
        for variant in ArchiveVariant::ALL {
            let name = archive_name(id, version, variant, kind).map_err(|err| err.to_string())?;
            let destination = plan.output_dir.join(&name);
            tracing::info!(archive = %name, "making archive");
            let archive = stage_archive(kind, &destination, plan.settings, |writer| {
                let layout = archive_layout(id, variant, &plan.quick_install_root);
                for file in plan.files.iter() {
                    writer.add_from_filesystem(
                        &plan.project_dir.join(file),
                        &layout.mod_file_path(file),
                        false,
                        None,
                        plan.timestamp,
                    )?;
                }
                if variant == ArchiveVariant::QuickInstall {
                    for dependency in &plan.dependencies {
                        let prefix = expand_root(&dependency.prefix, id);
                        merge_dependency(
                            &dependency.archive,
                            writer,
                            &prefix,
                            dependency.strip_components,
                        )?;
                    }
                }
                Ok::<(), PackError>(())
            })
            .map_err(|err| format!("failed to write '{}': {}", destination.display(), err))?;
            staged.push(archive);
        }
    }

    staged
        .into_iter()
        .map(|archive| {
            let destination = archive.destination().to_path_buf();
            archive
                .persist()
                .map_err(|err| format!("failed to write '{}': {}", destination.display(), err))
        })
        .collect()
}

/// The output directory, relative to the project, when it lies inside it.
fn excluded_dirs(project_dir: &Path, output_dir: &Path) -> Vec<String> {
    output_dir
        .strip_prefix(project_dir)
        .ok()
        .and_then(|relative| relative.to_str())
        .map(|relative| relative.replace('\\', "/"))
        .filter(|relative| !relative.is_empty())
        .into_iter()
        .collect()
}
