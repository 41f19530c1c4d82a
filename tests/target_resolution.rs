//! Integration tests for built-executable location across the generator
//! layouts CMake actually produces: flat Ninja/Makefile trees, per-config
//! Visual Studio trees, and per-target nesting.

use std::fs;
use std::path::{Path, PathBuf};

use qdev::project::{find_built_binary, is_multi_config, read_generator_from_cache};

fn exe(name: &str) -> String {
    format!("{}{}", name, std::env::consts::EXE_SUFFIX)
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

#[test]
fn flat_single_config_layout_resolves_directly() {
    let build = tempfile::tempdir().unwrap();
    let expected = build.path().join(exe("sample_cli"));
    touch(&expected);

    let found = find_built_binary(build.path(), "sample_cli", Some("Ninja"), "Debug", None);
    assert_eq!(found.unwrap(), expected);
}

#[test]
fn per_target_subdirectory_layout_resolves() {
    let build = tempfile::tempdir().unwrap();
    let expected = build.path().join("sample_app").join(exe("sample_app"));
    touch(&expected);

    let found = find_built_binary(build.path(), "sample_app", Some("Unix Makefiles"), "Debug", None);
    assert_eq!(found.unwrap(), expected);
}

#[test]
fn multi_config_layout_resolves_through_the_config_subdir() {
    let build = tempfile::tempdir().unwrap();
    let expected = build.path().join("Release").join(exe("sample_app"));
    touch(&expected);

    let found = find_built_binary(
        build.path(),
        "sample_app",
        Some("Visual Studio 17 2022"),
        "Debug",
        Some("Release"),
    );
    assert_eq!(found.unwrap(), expected);
}

#[test]
fn config_and_target_nesting_resolves() {
    let build = tempfile::tempdir().unwrap();
    let expected = build
        .path()
        .join("Debug")
        .join("sample_app")
        .join(exe("sample_app"));
    touch(&expected);

    let found = find_built_binary(
        build.path(),
        "sample_app",
        Some("Visual Studio 17 2022"),
        "Debug",
        None,
    );
    assert_eq!(found.unwrap(), expected);
}

#[test]
fn deeply_nested_output_is_reached_by_the_recursive_fallback() {
    let build = tempfile::tempdir().unwrap();
    let expected: PathBuf = build
        .path()
        .join("src")
        .join("tools")
        .join("bin")
        .join(exe("sample_cli"));
    touch(&expected);

    let found = find_built_binary(build.path(), "sample_cli", Some("Ninja"), "Debug", None);
    assert_eq!(found.unwrap(), expected);
}

#[test]
fn absent_everywhere_is_a_not_found_error_naming_the_search_root() {
    let build = tempfile::tempdir().unwrap();
    let err = find_built_binary(build.path(), "sample_cli", Some("Ninja"), "Debug", None)
        .unwrap_err()
        .to_string();
    assert!(err.contains("sample_cli"));
    assert!(err.contains(&build.path().display().to_string()));
}

#[test]
fn cache_contents_drive_multi_config_and_generator_reuse() {
    let build = tempfile::tempdir().unwrap();
    fs::write(
        build.path().join("CMakeCache.txt"),
        "CMAKE_GENERATOR:INTERNAL=Ninja Multi-Config\n\
         CMAKE_CONFIGURATION_TYPES:STRING=Debug;Release;RelWithDebInfo\n",
    )
    .unwrap();

    assert_eq!(
        read_generator_from_cache(build.path()).as_deref(),
        Some("Ninja Multi-Config")
    );
    // Even with an ambiguous generator name the cache marks this tree as
    // multi-config.
    assert!(is_multi_config(Some("Ninja"), build.path()));
}
