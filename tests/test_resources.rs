mod fixtures;

use fixtures::*;
use pretty_assertions::assert_eq;
use rpgdata::external::ExternalOutcome;
use rpgdata::resource::{PrepareMethod, PrepareStatus, obscure, parse_key};
use rpgdata::{ExternalDecrypter, ResourceSettings, prepare_resources};
use std::fs;
use std::path::Path;

const KEY: &str = "d41d8cd98f00b204e9800998ecf8427e";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR and the rest of the image";

fn write_game(root: &Path, key: Option<&str>) {
    let data = root.join("www").join("data");
    fs::create_dir_all(&data).unwrap();
    let system = match key {
        Some(key) => format!(r#"{{"gameTitle": "Fixture", "encryptionKey": "{key}"}}"#),
        None => r#"{"gameTitle": "Fixture"}"#.to_owned(),
    };
    fs::write(data.join("System.json"), system).unwrap();

    let pictures = root.join("www").join("img").join("pictures");
    fs::create_dir_all(&pictures).unwrap();
    let key_bytes = parse_key(KEY).unwrap();
    fs::write(pictures.join("Title.rpgmvp"), obscure(PNG, &key_bytes)).unwrap();
    fs::write(pictures.join("Ending.png_"), obscure(PNG, &key_bytes)).unwrap();
}

#[test]
fn test_prepare_decrypts_whole_tree() {
    ensure_env_logger_initialized();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_game(root, Some(KEY));
    let cache = root.join("data_cache");

    let report = prepare_resources(
        root,
        &root.join("www").join("data"),
        &cache,
        &ResourceSettings::new().num_threads(2),
        None,
    );

    assert_eq!(report.status, PrepareStatus::Decrypted);
    assert_eq!(report.method, PrepareMethod::Builtin);
    assert_eq!((report.processed_files, report.failed_files), (2, 0));

    let out = cache.join("decrypted").join("www").join("img").join("pictures");
    assert_eq!(fs::read(out.join("Title.png")).unwrap(), PNG);
    assert_eq!(fs::read(out.join("Ending.png")).unwrap(), PNG);

    // Decrypted output inside the cache is not picked up again.
    let again = prepare_resources(
        root,
        &root.join("www").join("data"),
        &cache,
        &ResourceSettings::new(),
        None,
    );
    assert_eq!(again.processed_files, 2);
}

#[test]
fn test_missing_key_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_game(root, None);

    let report = prepare_resources(
        root,
        &root.join("www").join("data"),
        &root.join("data_cache"),
        &ResourceSettings::new(),
        None,
    );
    assert_eq!(report.status, PrepareStatus::KeyUnavailable);
    assert_eq!(report.failed_files, 2);
}

#[test]
fn test_external_decrypter_takes_over_without_key() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_game(root, None);

    let external = |source: &Path, output: &Path| {
        assert!(source.join("www").is_dir());
        assert!(output.ends_with("decrypted"));
        ExternalOutcome::ok("handled by helper")
    };
    let report = prepare_resources(
        root,
        &root.join("www").join("data"),
        &root.join("data_cache"),
        &ResourceSettings::new(),
        Some(&external as &dyn ExternalDecrypter),
    );

    assert_eq!(report.status, PrepareStatus::ExternalDecrypted);
    assert_eq!(report.method, PrepareMethod::External);
    assert_eq!(report.message, "handled by helper");
    assert_eq!((report.processed_files, report.failed_files), (0, 2));
}

#[test]
fn test_plain_projects_need_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_mv_project(dir.path());

    let report = prepare_resources(
        dir.path(),
        &data,
        &dir.path().join("data_cache"),
        &ResourceSettings::new(),
        None,
    );
    assert_eq!(report.status, PrepareStatus::NotNeeded);
    assert_eq!(report.method, PrepareMethod::None);
}

#[test]
fn test_wrong_header_fails_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_game(root, Some(KEY));
    fs::write(
        root.join("www").join("img").join("pictures").join("Broken.rpgmvp"),
        b"not an obscured file at all",
    )
    .unwrap();

    let report = prepare_resources(
        root,
        &root.join("www").join("data"),
        &root.join("data_cache"),
        &ResourceSettings::new().num_threads(1),
        None,
    );
    assert_eq!(report.status, PrepareStatus::PartiallyFailed);
    assert_eq!((report.processed_files, report.failed_files), (2, 1));
}

fn add_broken_asset(root: &Path) {
    fs::write(
        root.join("www").join("img").join("pictures").join("Broken.rpgmvp"),
        b"no header here",
    )
    .unwrap();
}

fn prepare_with(root: &Path, external: Option<&dyn ExternalDecrypter>) -> rpgdata::PrepareReport {
    prepare_resources(
        root,
        &root.join("www").join("data"),
        &root.join("data_cache"),
        &ResourceSettings::new().num_threads(1),
        external,
    )
}

#[test]
fn test_partial_failure_keeps_good_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_game(root, Some(KEY));
    add_broken_asset(root);

    let report = prepare_with(root, None);
    assert_eq!(report.status, PrepareStatus::PartiallyFailed);
    assert_eq!(report.method, PrepareMethod::Builtin);
    assert_eq!((report.processed_files, report.failed_files), (2, 1));

    let out = root
        .join("data_cache")
        .join("decrypted")
        .join("www")
        .join("img")
        .join("pictures");
    assert_eq!(fs::read(out.join("Title.png")).unwrap(), PNG);
    assert!(!out.join("Broken.png").exists());
}

#[test]
fn test_handoff_after_partial_failure_keeps_builtin_counts() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_game(root, Some(KEY));
    add_broken_asset(root);

    let succeeding = |_: &Path, _: &Path| ExternalOutcome::ok("helper finished");
    let report = prepare_with(root, Some(&succeeding as &dyn ExternalDecrypter));
    assert_eq!(report.status, PrepareStatus::ExternalDecrypted);
    assert_eq!(report.method, PrepareMethod::External);
    assert_eq!((report.processed_files, report.failed_files), (2, 1));

    let failing = |_: &Path, _: &Path| ExternalOutcome::failed("java missing");
    let report = prepare_with(root, Some(&failing as &dyn ExternalDecrypter));
    assert_eq!(report.status, PrepareStatus::Failed);
    assert_eq!((report.processed_files, report.failed_files), (2, 1));
    assert!(report.message.starts_with("Decrypted 2 files, 1 failed."));
    assert!(report.message.ends_with("java missing"));
}
