//! Integration tests for the settings store: round-tripping, resilience
//! against corrupted files, and the always-full-key-set persistence contract.

use std::fs;

use qdev::settings::{DEFAULT_BUILD_TYPE, KNOWN_KEYS, SettingsStore, default_run_targets};

#[test]
fn set_then_reload_round_trips_and_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qdev").join("settings.json");

    let mut store = SettingsStore::load(path.clone());
    store
        .set(
            &[("build_type".to_string(), "Release".to_string())],
            &[],
        )
        .unwrap();

    let reloaded = SettingsStore::load(path);
    let settings = reloaded.settings();
    assert_eq!(settings.build_type, "Release");
    // Everything else is untouched.
    assert_eq!(settings.build_dir, "build");
    assert_eq!(settings.qt_prefix, None);
    assert_eq!(settings.generator, None);
    assert_eq!(settings.default_run_targets, default_run_targets());
}

#[test]
fn every_known_key_is_written_on_each_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let mut store = SettingsStore::load(path.clone());
    store
        .set(&[("generator".to_string(), "Ninja".to_string())], &[])
        .unwrap();

    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let object = on_disk.as_object().unwrap();
    for key in KNOWN_KEYS {
        assert!(object.contains_key(*key), "missing key {} on disk", key);
    }
    assert_eq!(object["generator"], "Ninja");
    assert!(object["qt_prefix"].is_null());
}

#[test]
fn unset_restores_the_built_in_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let mut store = SettingsStore::load(path.clone());
    store
        .set(
            &[("build_type".to_string(), "RelWithDebInfo".to_string())],
            &[],
        )
        .unwrap();
    store.set(&[], &["build_type".to_string()]).unwrap();

    let reloaded = SettingsStore::load(path);
    assert_eq!(reloaded.settings().build_type, DEFAULT_BUILD_TYPE);
}

#[test]
fn corrupted_file_degrades_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{not json at all").unwrap();

    let store = SettingsStore::load(path.clone());
    assert_eq!(store.settings().build_type, DEFAULT_BUILD_TYPE);

    // Same for syntactically valid but non-object content.
    fs::write(&path, "[1, 2, 3]").unwrap();
    let store = SettingsStore::load(path);
    assert_eq!(store.settings().build_dir, "build");
}

#[test]
fn manual_edits_with_unknown_keys_are_dropped_on_the_next_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{"build_type": "Release", "stray_key": true}"#,
    )
    .unwrap();

    let mut store = SettingsStore::load(path.clone());
    store
        .set(&[("generator".to_string(), "Ninja".to_string())], &[])
        .unwrap();

    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let object = on_disk.as_object().unwrap();
    assert_eq!(object["build_type"], "Release");
    assert!(!object.contains_key("stray_key"));
}

#[test]
fn run_target_strings_normalize_through_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let mut store = SettingsStore::load(path.clone());
    store
        .set(
            &[(
                "default_run_targets".to_string(),
                "viewer; sample_cli, ".to_string(),
            )],
            &[],
        )
        .unwrap();

    let reloaded = SettingsStore::load(path);
    assert_eq!(
        reloaded.settings().default_run_targets,
        vec!["viewer", "sample_cli"]
    );
}
