//! Qt installation discovery and toolchain matching.
//!
//! The Qt prefix is resolved from, in order: the CLI flag, `$QT_PREFIX_PATH`,
//! the first `$CMAKE_PREFIX_PATH` segment, and finally an autodetection scan
//! under the vendored `third_party/qt6` tree. Nothing here errors on absence;
//! a missing prefix just means CMake gets to try system Qt installs.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::process::{find_in_path, run_command};
use crate::settings::expand_user;
use crate::toolchain::{ToolchainFlavor, ToolchainProbe};
use crate::version::{VersionTuple, parse_version_from_path};

/// Classify a Qt install by its path segments ("mingw"/"msvc" substrings).
/// Only meaningful for the official Windows binary layouts; other installs
/// have no flavor.
pub fn detect_qt_flavor(path: &Path) -> Option<ToolchainFlavor> {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect();
    if parts.iter().any(|part| part.contains("mingw")) {
        return Some(ToolchainFlavor::Mingw);
    }
    if parts.iter().any(|part| part.contains("msvc")) {
        return Some(ToolchainFlavor::Msvc);
    }
    None
}

/// `(compiler, qt)` when both flavors are known and disagree.
pub(crate) fn flavor_conflict(
    compiler: Option<ToolchainFlavor>,
    qt: Option<ToolchainFlavor>,
) -> Option<(ToolchainFlavor, ToolchainFlavor)> {
    match (compiler, qt) {
        (Some(compiler), Some(qt)) if compiler != qt => Some((compiler, qt)),
        _ => None,
    }
}

fn qt_vendor_root(root: &Path) -> PathBuf {
    root.join("third_party").join("qt6")
}

/// Guess a Qt prefix by scanning `third_party/qt6/**/lib/cmake/Qt6` package
/// markers. Candidates whose flavor matches `preferred_flavor` win; among
/// those the highest path version is picked, falling back to the highest
/// version overall when no flavor matches.
pub fn autodetect_qt_prefix(
    root: &Path,
    preferred_flavor: Option<ToolchainFlavor>,
) -> Option<PathBuf> {
    let qt_root = qt_vendor_root(root);
    if !qt_root.is_dir() {
        return None;
    }

    let mut candidates: Vec<(VersionTuple, Option<ToolchainFlavor>, PathBuf)> = Vec::new();
    for entry in WalkDir::new(&qt_root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_dir() || entry.file_name() != OsStr::new("Qt6") {
            continue;
        }
        let marker = entry.path();
        let under_lib_cmake = marker
            .parent()
            .is_some_and(|p| p.file_name() == Some(OsStr::new("cmake")))
            && marker
                .parent()
                .and_then(Path::parent)
                .is_some_and(|p| p.file_name() == Some(OsStr::new("lib")));
        if !under_lib_cmake {
            continue;
        }
        let Some(prefix) = marker.ancestors().nth(3) else {
            continue;
        };
        candidates.push((
            parse_version_from_path(prefix),
            detect_qt_flavor(prefix),
            prefix.to_path_buf(),
        ));
    }
    if candidates.is_empty() {
        return None;
    }

    fn pick_best(
        mut items: Vec<(VersionTuple, Option<ToolchainFlavor>, PathBuf)>,
    ) -> Option<PathBuf> {
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items.pop().map(|(_, _, prefix)| prefix)
    }

    if let Some(flavor) = preferred_flavor {
        let matching: Vec<_> = candidates
            .iter()
            .filter(|candidate| candidate.1 == Some(flavor))
            .cloned()
            .collect();
        if let Some(chosen) = pick_best(matching) {
            return Some(chosen);
        }
    }
    pick_best(candidates)
}

/// Resolve the Qt prefix directory, honoring CLI, env, or auto-detection.
/// `None` when nothing is found so CMake can still try system Qt installs.
pub fn resolve_qt_prefix(
    root: &Path,
    cli_value: Option<&str>,
    generator: Option<&str>,
    probe: &mut ToolchainProbe,
) -> Option<PathBuf> {
    let mut candidates: Vec<String> = Vec::new();
    if let Some(value) = cli_value {
        candidates.push(value.to_string());
    }
    if let Ok(value) = env::var("QT_PREFIX_PATH") {
        candidates.push(value);
    }
    if let Ok(prefixes) = env::var("CMAKE_PREFIX_PATH") {
        if let Some(first) = env::split_paths(&prefixes).next() {
            candidates.push(first.to_string_lossy().into_owned());
        }
    }

    for value in candidates {
        if value.is_empty() {
            continue;
        }
        let path = PathBuf::from(expand_user(&value));
        if path.exists() {
            return Some(path);
        }
    }

    let preferred = probe.detect_compiler_flavor(generator);
    autodetect_qt_prefix(root, preferred)
}

/// Candidate Qt library directories under the given prefix.
pub fn qt_library_dirs(prefix: &Path) -> Vec<PathBuf> {
    ["lib", "lib64", "Lib"]
        .iter()
        .map(|name| prefix.join(name))
        .filter(|candidate| candidate.exists())
        .collect()
}

/// Fail fast when the detected compiler flavor and the Qt binaries obviously
/// conflict. Mixing MSVC Qt with MinGW (or vice versa) otherwise surfaces as
/// cryptic linker errors deep into the build, so this is the one probe whose
/// disagreement is fatal.
pub fn enforce_qt_toolchain_match(
    probe: &mut ToolchainProbe,
    qt_prefix: Option<&Path>,
    generator: Option<&str>,
) -> Result<()> {
    let Some(prefix) = qt_prefix else {
        return Ok(());
    };
    if !cfg!(windows) {
        return Ok(());
    }
    let compiler_flavor = probe.detect_compiler_flavor(generator);
    let qt_flavor = detect_qt_flavor(prefix);
    if let Some((compiler, qt)) = flavor_conflict(compiler_flavor, qt_flavor) {
        bail!(
            "Qt install {} looks like {}, but your compiler/generator looks like {}.\n\
             Use a matching Qt download (e.g. qdev download-qt --compiler win64_mingw) \
             or switch to the corresponding toolchain/generator.",
            prefix.display(),
            qt.label(),
            compiler.label()
        );
    }
    Ok(())
}

/// `(version, prefix)` for the local Qt install, for the updates report.
pub fn detect_local_qt_version(
    root: &Path,
    cli_value: Option<&str>,
    probe: &mut ToolchainProbe,
) -> (Option<String>, Option<PathBuf>) {
    let Some(prefix) = resolve_qt_prefix(root, cli_value, None, probe) else {
        return (None, None);
    };
    let tuple = parse_version_from_path(&prefix);
    let version = (!tuple.is_empty()).then(|| {
        tuple
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".")
    });
    (version, Some(prefix))
}

/// Flags forwarded to the bundled `download_qt6.py` helper.
pub struct QtDownloadRequest<'a> {
    pub version: Option<&'a str>,
    pub compiler: Option<&'a str>,
    pub output_dir: &'a Path,
    pub base_url: Option<&'a str>,
    pub with_tools: bool,
}

/// Delegate the actual download to the repo's `download_qt6.py`. The helper's
/// exit code is the only signal; the caller re-probes the prefix afterwards.
pub fn download_qt_with_helper(root: &Path, request: &QtDownloadRequest<'_>) -> Result<()> {
    let python = find_in_path("python3")
        .or_else(|| find_in_path("python"))
        .context("python interpreter not found on PATH (needed for download_qt6.py)")?;
    let script = root.join("download_qt6.py");

    let mut cmd: Vec<String> = vec![
        python.to_string_lossy().into_owned(),
        script.to_string_lossy().into_owned(),
    ];
    if let Some(version) = request.version {
        cmd.push("--qt-version".to_string());
        cmd.push(version.to_string());
    }
    if let Some(compiler) = request.compiler {
        cmd.push("--compiler".to_string());
        cmd.push(compiler.to_string());
    }
    cmd.push("--output-dir".to_string());
    cmd.push(request.output_dir.to_string_lossy().into_owned());
    if let Some(base_url) = request.base_url {
        cmd.push("--base-url".to_string());
        cmd.push(base_url.to_string());
    }
    if request.with_tools {
        cmd.push("--with-tools".to_string());
    }
    run_command(&cmd, None)
}

/// Auto-download policy for `ensure_qt_prefix`.
pub struct QtAutoDownload<'a> {
    pub enabled: bool,
    pub version: Option<&'a str>,
    pub compiler: Option<&'a str>,
    pub output_dir: &'a Path,
}

/// Resolve the Qt prefix, fetching it with the download helper when it is
/// missing and auto-download was requested.
pub fn ensure_qt_prefix(
    root: &Path,
    cli_value: Option<&str>,
    generator: Option<&str>,
    auto: &QtAutoDownload<'_>,
    probe: &mut ToolchainProbe,
) -> Result<Option<PathBuf>> {
    if let Some(prefix) = resolve_qt_prefix(root, cli_value, generator, probe) {
        return Ok(Some(prefix));
    }
    if !auto.enabled {
        return Ok(None);
    }

    let mut compiler = auto.compiler.map(str::to_string);
    if compiler.is_none()
        && cfg!(windows)
        && probe.detect_compiler_flavor(generator) == Some(ToolchainFlavor::Mingw)
    {
        compiler = Some("win64_mingw".to_string());
    }

    println!("Qt not found; downloading with download_qt6.py...");
    download_qt_with_helper(
        root,
        &QtDownloadRequest {
            version: auto.version,
            compiler: compiler.as_deref(),
            output_dir: auto.output_dir,
            base_url: None,
            with_tools: false,
        },
    )?;
    Ok(resolve_qt_prefix(root, cli_value, generator, probe))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn make_qt_install(root: &Path, version: &str, flavor_dir: &str) -> PathBuf {
        let prefix = root
            .join("third_party")
            .join("qt6")
            .join(version)
            .join(flavor_dir);
        fs::create_dir_all(prefix.join("lib").join("cmake").join("Qt6")).unwrap();
        prefix
    }

    #[test]
    fn qt_flavor_comes_from_path_segments() {
        assert_eq!(
            detect_qt_flavor(Path::new("third_party/qt6/6.10.1/mingw_64")),
            Some(ToolchainFlavor::Mingw)
        );
        assert_eq!(
            detect_qt_flavor(Path::new(r"C:\Qt\6.10.1\msvc2022_64")),
            Some(ToolchainFlavor::Msvc)
        );
        assert_eq!(
            detect_qt_flavor(Path::new("/usr/lib/qt6")),
            None
        );
    }

    #[cfg(windows)]
    #[test]
    #[serial]
    fn mismatched_flavors_abort_with_a_descriptive_error() {
        let mut probe = ToolchainProbe::new();
        let err = enforce_qt_toolchain_match(
            &mut probe,
            Some(Path::new(r"C:\Qt\6.10.1\msvc2022_64")),
            Some("MinGW Makefiles"),
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("MSVC"));
        assert!(err.contains("MinGW"));
    }

    #[cfg(windows)]
    #[test]
    #[serial]
    fn agreeing_flavors_pass_the_match_check() {
        let mut probe = ToolchainProbe::new();
        assert!(
            enforce_qt_toolchain_match(
                &mut probe,
                Some(Path::new(r"C:\Qt\6.10.1\mingw_64")),
                Some("MinGW Makefiles"),
            )
            .is_ok()
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn match_check_is_a_no_op_off_windows() {
        let mut probe = ToolchainProbe::new();
        assert!(
            enforce_qt_toolchain_match(
                &mut probe,
                Some(Path::new("third_party/qt6/6.10.1/msvc2022_64")),
                Some("MinGW Makefiles"),
            )
            .is_ok()
        );
    }

    #[test]
    fn missing_prefix_makes_the_match_check_a_no_op() {
        let mut probe = ToolchainProbe::new();
        assert!(enforce_qt_toolchain_match(&mut probe, None, Some("MinGW Makefiles")).is_ok());
    }

    #[test]
    fn conflict_requires_both_flavors_known_and_different() {
        use ToolchainFlavor::*;
        assert!(flavor_conflict(Some(Msvc), Some(Mingw)).is_some());
        assert!(flavor_conflict(Some(Mingw), Some(Msvc)).is_some());
        assert!(flavor_conflict(Some(Msvc), Some(Msvc)).is_none());
        assert!(flavor_conflict(None, Some(Mingw)).is_none());
        assert!(flavor_conflict(Some(Mingw), None).is_none());
    }

    #[test]
    fn autodetect_picks_the_highest_version() {
        let dir = tempfile::tempdir().unwrap();
        make_qt_install(dir.path(), "6.5.0", "gcc_64");
        let newest = make_qt_install(dir.path(), "6.10.1", "gcc_64");
        make_qt_install(dir.path(), "6.9.9", "gcc_64");

        let found = autodetect_qt_prefix(dir.path(), None);
        assert_eq!(found, Some(newest));
    }

    #[test]
    fn autodetect_prefers_a_matching_flavor_over_a_newer_version() {
        let dir = tempfile::tempdir().unwrap();
        let mingw = make_qt_install(dir.path(), "6.5.0", "mingw_64");
        make_qt_install(dir.path(), "6.10.1", "msvc2022_64");

        let found = autodetect_qt_prefix(dir.path(), Some(ToolchainFlavor::Mingw));
        assert_eq!(found, Some(mingw));
    }

    #[test]
    fn autodetect_falls_back_to_any_flavor_when_none_match() {
        let dir = tempfile::tempdir().unwrap();
        let msvc = make_qt_install(dir.path(), "6.10.1", "msvc2022_64");

        let found = autodetect_qt_prefix(dir.path(), Some(ToolchainFlavor::Mingw));
        assert_eq!(found, Some(msvc));
    }

    #[test]
    fn autodetect_is_absent_without_vendor_root_or_markers() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(autodetect_qt_prefix(dir.path(), None), None);

        // Vendor root exists but holds no cmake package markers.
        fs::create_dir_all(dir.path().join("third_party").join("qt6").join("junk")).unwrap();
        assert_eq!(autodetect_qt_prefix(dir.path(), None), None);
    }

    #[test]
    #[serial]
    fn cli_prefix_wins_when_it_exists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = ToolchainProbe::new();
        let found = resolve_qt_prefix(
            Path::new("/nonexistent-project-root"),
            Some(&dir.path().to_string_lossy()),
            None,
            &mut probe,
        );
        assert_eq!(found, Some(dir.path().to_path_buf()));
    }

    #[test]
    #[serial]
    fn env_prefix_is_used_when_cli_value_is_dangling() {
        let dir = tempfile::tempdir().unwrap();
        unsafe { env::set_var("QT_PREFIX_PATH", dir.path()) };
        let mut probe = ToolchainProbe::new();
        let found = resolve_qt_prefix(
            Path::new("/nonexistent-project-root"),
            Some("/definitely/not/there"),
            None,
            &mut probe,
        );
        unsafe { env::remove_var("QT_PREFIX_PATH") };
        assert_eq!(found, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn qt_library_dirs_lists_existing_lib_variants() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        let dirs = qt_library_dirs(dir.path());
        assert!(dirs.contains(&dir.path().join("lib")));
        assert!(!dirs.contains(&dir.path().join("lib64")));
    }
}
