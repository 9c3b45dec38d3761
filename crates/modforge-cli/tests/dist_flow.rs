use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use modforge_cli::commands::dist::{self, DistArgs};
use tar::{Archive, Builder, EntryType, Header};
use zip::ZipArchive;

const STAMP: u64 = 1_700_000_000;
const MANIFEST: &str = r#"{"id":"mymod","version":"1.0.0","title":"My Mod"}"#;

fn write_project(dir: &Path) {
    fs::write(dir.join("ccmod.json"), MANIFEST).expect("write ccmod.json");
    fs::write(dir.join("notes.txt"), "not packaged").expect("write notes");
}

fn dist_args(project_dir: &Path) -> DistArgs {
    DistArgs {
        project_dir: project_dir.to_path_buf(),
        output_dir: None,
        timestamp: Some(STAMP),
        offline: true,
    }
}

fn tar_members(path: &Path) -> Vec<(String, EntryType, u64, u64, u64)> {
    let mut archive = Archive::new(GzDecoder::new(File::open(path).expect("open tgz")));
    archive
        .entries()
        .expect("entries")
        .map(|member| {
            let member = member.expect("member");
            let header = member.header();
            (
                member.path().expect("path").display().to_string(),
                header.entry_type(),
                header.mtime().expect("mtime"),
                header.uid().expect("uid"),
                header.gid().expect("gid"),
            )
        })
        .collect()
}

fn zip_names(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).expect("open zip")).expect("zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// A dependency tarball wrapped in one top-level directory, GitHub style.
fn write_dependency(path: &Path) {
    fs::create_dir_all(path.parent().expect("parent")).expect("download dir");
    let mut builder = Builder::new(GzEncoder::new(
        File::create(path).expect("create dependency"),
        Compression::default(),
    ));
    let mut dir = Header::new_gnu();
    dir.set_path("L-Sherry-Localize-me-cd84932/").expect("path");
    dir.set_entry_type(EntryType::Directory);
    dir.set_mode(0o755);
    dir.set_size(0);
    dir.set_mtime(1_600_000_000);
    dir.set_cksum();
    builder.append(&dir, std::io::empty()).expect("dir");

    let body = b"{\"id\":\"Localize-me\"}";
    let mut file = Header::new_gnu();
    file.set_path("L-Sherry-Localize-me-cd84932/ccmod.json")
        .expect("path");
    file.set_entry_type(EntryType::Regular);
    file.set_mode(0o644);
    file.set_size(body.len() as u64);
    file.set_mtime(1_600_000_000);
    file.set_cksum();
    builder.append(&file, &body[..]).expect("file");
    builder
        .into_inner()
        .expect("tar")
        .finish()
        .expect("gzip");
}

#[test]
fn standalone_archives_hold_only_the_manifest() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_project(dir.path());

    let outcome = dist::run(dist_args(dir.path())).expect("dist");
    assert_eq!(outcome.timestamp, STAMP);
    let names: Vec<String> = outcome
        .archive_paths
        .iter()
        .map(|path| {
            path.file_name()
                .expect("file name")
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(
        names,
        [
            "mymod_v1.0.0.tgz",
            "mymod_quick-install_v1.0.0.tgz",
            "mymod_v1.0.0.zip",
            "mymod_quick-install_v1.0.0.zip",
        ]
    );
    let dist_dir = dir.path().join("dist");
    assert!(outcome.archive_paths.iter().all(|path| path.starts_with(&dist_dir)));

    let members = tar_members(&dist_dir.join("mymod_v1.0.0.tgz"));
    assert_eq!(
        members,
        [(
            "mymod/ccmod.json".to_string(),
            EntryType::Regular,
            STAMP,
            0,
            0
        )]
    );

    let mut archive =
        ZipArchive::new(File::open(dist_dir.join("mymod_v1.0.0.zip")).expect("open zip"))
            .expect("zip");
    assert_eq!(archive.len(), 1);
    let mut manifest = archive.by_name("mymod/ccmod.json").expect("manifest");
    let modified = manifest.last_modified().expect("date");
    assert_eq!(
        (
            modified.year(),
            modified.month(),
            modified.day(),
            modified.hour(),
            modified.minute(),
            modified.second()
        ),
        (2023, 11, 14, 22, 13, 20)
    );
    let mut content = String::new();
    manifest.read_to_string(&mut content).expect("read");
    assert_eq!(content, MANIFEST);

    // No dependencies: the quick-install tree is just the relocated mod.
    assert_eq!(
        zip_names(&dist_dir.join("mymod_quick-install_v1.0.0.zip")),
        ["assets/mods/mymod/ccmod.json"]
    );
}

#[test]
fn quick_install_merges_cached_dependencies() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_project(dir.path());
    fs::write(
        dir.path().join("modforge.yaml"),
        "dependencies:\n  - name: Localize-me\n    url: https://github.com/L-Sherry/Localize-me/tarball/cd84932\n    filename: Localize-me-cd84932.tgz\n    prefix: assets/mods/Localize-me\n    stripComponents: 1\n",
    )
    .expect("write config");
    write_dependency(
        &dir.path()
            .join("dist")
            .join("download")
            .join("Localize-me-cd84932.tgz"),
    );

    let outcome = dist::run(dist_args(dir.path())).expect("dist");
    assert_eq!(outcome.archive_paths.len(), 4);
    let dist_dir = dir.path().join("dist");

    let members = tar_members(&dist_dir.join("mymod_quick-install_v1.0.0.tgz"));
    let summary: Vec<(&str, u64)> = members
        .iter()
        .map(|(path, _, mtime, _, _)| (path.as_str(), *mtime))
        .collect();
    assert_eq!(
        summary,
        [
            ("assets/mods/mymod/ccmod.json", STAMP),
            ("assets/mods/Localize-me/ccmod.json", 1_600_000_000),
        ]
    );
    assert_eq!(
        zip_names(&dist_dir.join("mymod_quick-install_v1.0.0.zip")),
        [
            "assets/mods/Localize-me/ccmod.json",
            "assets/mods/mymod/ccmod.json"
        ]
    );
    // The standalone variant never carries dependencies.
    assert_eq!(
        zip_names(&dist_dir.join("mymod_v1.0.0.zip")),
        ["mymod/ccmod.json"]
    );
}

#[test]
fn repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_project(dir.path());
    fs::create_dir_all(dir.path().join("src")).expect("src");
    fs::write(dir.path().join("src").join("main.js"), "ig.module('mymod');").expect("main.js");

    let first_out = dir.path().join("first");
    let second_out = dir.path().join("second");
    let run_into = |output_dir: &PathBuf| {
        dist::run(DistArgs {
            output_dir: Some(output_dir.clone()),
            ..dist_args(dir.path())
        })
        .expect("dist")
    };
    let first = run_into(&first_out);
    let second = run_into(&second_out);

    assert_eq!(first.archive_paths.len(), second.archive_paths.len());
    for (a, b) in first.archive_paths.iter().zip(&second.archive_paths) {
        assert_eq!(
            fs::read(a).expect("first archive"),
            fs::read(b).expect("second archive"),
            "{} differs",
            a.display()
        );
    }
}

#[test]
fn missing_cached_dependency_fails_offline_without_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_project(dir.path());
    fs::write(
        dir.path().join("modforge.yaml"),
        "dependencies:\n  - name: ccloader\n    url: https://example.invalid/ccloader.tar.gz\n",
    )
    .expect("write config");

    let error = dist::run(dist_args(dir.path())).err().expect("offline error");
    assert!(error.contains("ccloader"), "{}", error);
    assert!(!dir.path().join("dist").join("mymod_v1.0.0.tgz").exists());
}

#[test]
fn missing_manifest_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = dist::run(dist_args(dir.path())).err().expect("error");
    assert!(error.contains("ccmod.json"), "{}", error);
}

#[test]
fn failed_zip_pass_publishes_no_archives() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_project(dir.path());
    fs::write(
        dir.path().join("modforge.yaml"),
        "archive:\n  strictTimestamps: true\n",
    )
    .expect("write config");

    let error = dist::run(DistArgs {
        timestamp: Some(0),
        ..dist_args(dir.path())
    })
    .err()
    .expect("strict timestamp error");
    assert!(error.contains(".zip"), "{}", error);

    let dist_dir = dir.path().join("dist");
    let leftovers: Vec<String> = match fs::read_dir(&dist_dir) {
        Ok(entries) => entries
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .filter(|name| name != "download")
            .collect(),
        Err(_) => Vec::new(),
    };
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

#[test]
fn archives_list_members_in_raw_path_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_project(dir.path());
    for relative in ["src/a/1.js", "src/a.b/1.js"] {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("src dirs");
        fs::write(path, relative).expect("script");
    }
    fs::write(
        dir.path().join("modforge.yaml"),
        "files:\n  - ccmod.json\n  - src/**/*.js\n",
    )
    .expect("write config");

    dist::run(dist_args(dir.path())).expect("dist");
    let dist_dir = dir.path().join("dist");
    let expected = ["mymod/ccmod.json", "mymod/src/a.b/1.js", "mymod/src/a/1.js"];

    let tar_order: Vec<String> = tar_members(&dist_dir.join("mymod_v1.0.0.tgz"))
        .into_iter()
        .map(|(path, _, _, _, _)| path)
        .collect();
    assert_eq!(tar_order, expected);

    let mut archive =
        ZipArchive::new(File::open(dist_dir.join("mymod_v1.0.0.zip")).expect("open zip"))
            .expect("zip");
    let zip_order: Vec<String> = (0..archive.len())
        .map(|index| archive.by_index(index).expect("member").name().to_string())
        .collect();
    assert_eq!(zip_order, expected);
}
