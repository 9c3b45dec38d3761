use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use modforge_core::{
    artifact::{archive_layout, archive_name, ArchiveKind, ArchiveVariant},
    config::{self, DEFAULT_FILE_PATTERNS},
    fileset::collect_mod_files,
    manifest::{read_manifest, MANIFEST_FILE_NAME},
};

fn temp_dir(name: &str) -> PathBuf {
    let mut path = env::temp_dir();
    let stamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    path.push(format!("modforge-core-integration-{}-{}", name, stamp));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, contents).expect("write file");
}

#[test]
fn integration_flow_from_config_to_archive_paths() {
    let project = temp_dir("flow");
    write_file(
        &project,
        MANIFEST_FILE_NAME,
        r#"{"id":"french","version":"1.4.0","dependencies":{"Localize-me":">=0.5.0"}}"#,
    );
    write_file(&project, "LICENSE", "MIT");
    write_file(&project, "icon24.png", "png");
    write_file(&project, "src/main.js", "main");
    write_file(&project, "src/a.b/x.js", "x");
    write_file(&project, "src/a/x.js", "x");
    write_file(&project, "packs/ui.json", "{}");
    write_file(&project, "build/out.js", "generated");
    write_file(&project, "build/download/dep.tgz", "tgz");
    write_file(
        &project,
        "modforge.yaml",
        "outputDir: build\nquickInstallRoot: assets/mods/{id}-dev\narchive:\n  compressionLevel: 9\n",
    );

    let settings = config::load_config(&project).expect("config");
    assert_eq!(settings.output_dir, "build");
    assert_eq!(settings.archive.compression_level, 9);
    assert_eq!(settings.files.len(), DEFAULT_FILE_PATTERNS.len());

    let manifest = read_manifest(&project.join(&settings.manifest)).expect("manifest");
    assert_eq!(manifest.id, "french");
    assert_eq!(manifest.version, "1.4.0");

    let files = collect_mod_files(&project, &settings.files, &[settings.output_dir.as_str()])
        .expect("files");
    assert_eq!(
        files.paths(),
        [
            "LICENSE",
            "ccmod.json",
            "icon24.png",
            "packs/ui.json",
            "src/a.b/x.js",
            "src/a/x.js",
            "src/main.js",
        ]
    );

    let names: Vec<String> = ArchiveKind::ALL
        .iter()
        .flat_map(|kind| {
            ArchiveVariant::ALL
                .iter()
                .map(|variant| archive_name(&manifest.id, &manifest.version, *variant, *kind))
                .collect::<Vec<_>>()
        })
        .collect::<Result<_, _>>()
        .expect("names");
    assert_eq!(
        names,
        [
            "french_v1.4.0.tgz",
            "french_quick-install_v1.4.0.tgz",
            "french_v1.4.0.zip",
            "french_quick-install_v1.4.0.zip",
        ]
    );

    let root = settings.quick_install_root.as_str();
    let standalone = archive_layout(&manifest.id, ArchiveVariant::Standalone, root);
    let quick = archive_layout(&manifest.id, ArchiveVariant::QuickInstall, root);
    assert_eq!(standalone.mod_file_path("src/main.js"), "french/src/main.js");
    assert_eq!(
        quick.mod_file_path("src/main.js"),
        "assets/mods/french-dev/src/main.js"
    );

    fs::remove_dir_all(&project).expect("cleanup");
}
