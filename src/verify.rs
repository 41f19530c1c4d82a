//! The `qdev verify` environment report.

use std::path::{Path, PathBuf};

use colored::*;
use walkdir::WalkDir;

use crate::hints;
use crate::process::find_in_path;
use crate::qt;
use crate::toolchain::ToolchainProbe;

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check common requirements (compiler, cmake, generator, Qt prefix) and
/// print what was found with remediation hints for what was not. Advisory
/// only — the return value drives the exit status, nothing aborts here.
pub fn verify_environment(
    root: &Path,
    qt_prefix_cli: Option<&str>,
    generator_cli: Option<&str>,
    build_dir: &Path,
    probe: &mut ToolchainProbe,
) -> bool {
    println!("\n{}", "Environment verification:".bold());
    let mut ok = true;

    match find_in_path("cmake") {
        Some(path) => println!(" {} cmake: found at {}", "✓".green(), path.display()),
        None => {
            ok = false;
            println!(
                " {} cmake: MISSING. Try \"{}\" or download {}.",
                "x".red(),
                hints::package_install_hint("cmake"),
                hints::CMAKE_DOWNLOAD_URL
            );
        }
    }

    let generator = probe.detect_generator(generator_cli);
    match &generator {
        Some(generator) => println!(
            " {} generator: {} (set via CLI/env/auto)",
            "✓".green(),
            generator
        ),
        None => {
            ok = false;
            println!(
                " {} generator: none detected. Install Ninja ({}) e.g. \"{}\" \
                 or set CMAKE_GENERATOR/--generator.",
                "x".red(),
                hints::NINJA_DOWNLOAD_URL,
                hints::package_install_hint("ninja")
            );
        }
    }

    let compiler = probe.describe_compiler(generator.as_deref());
    match &compiler.description {
        Some(description) => {
            println!(" {} compiler: {}", "✓".green(), description);
            if let Some(hint) = &compiler.hint {
                println!("   note: {}", hint);
            }
            if !compiler.library_dirs.is_empty() {
                println!("   compiler libs: {}", join_paths(&compiler.library_dirs));
            }
        }
        None => {
            ok = false;
            let hint = compiler
                .hint
                .clone()
                .unwrap_or_else(hints::compiler_install_hint);
            println!(" {} compiler: MISSING. {}", "x".red(), hint);
        }
    }

    let resolved_qt = qt::resolve_qt_prefix(root, qt_prefix_cli, generator.as_deref(), probe);
    let compiler_flavor = probe.detect_compiler_flavor(generator.as_deref());
    match &resolved_qt {
        Some(prefix) => {
            println!(" {} Qt prefix: {}", "✓".green(), prefix.display());
            let libs = qt::qt_library_dirs(prefix);
            if libs.is_empty() {
                ok = false;
                println!(
                    " {} Qt libs: not found under prefix (expected lib/lib64).",
                    "x".red()
                );
            } else {
                println!("   Qt libs: {}", join_paths(&libs));
            }
            let qt_flavor = qt::detect_qt_flavor(prefix);
            if let (Some(compiler_flavor), Some(qt_flavor)) = (compiler_flavor, qt_flavor) {
                if compiler_flavor != qt_flavor {
                    ok = false;
                    println!(
                        " {} Qt/toolchain mismatch: Qt looks like {} but your \
                         compiler/generator looks like {}. Download a matching Qt build \
                         or switch toolchains.",
                        "x".red(),
                        qt_flavor.label(),
                        compiler_flavor.label()
                    );
                }
            }
        }
        None => {
            ok = false;
            println!(
                " {} Qt prefix: not found. Set --qt-prefix / QT_PREFIX_PATH / \
                 CMAKE_PREFIX_PATH or fetch Qt with \"{}\" (binaries: {}; \
                 package manager e.g. \"{}\").",
                "x".red(),
                hints::QT_DOWNLOAD_COMMAND,
                hints::QT_DOWNLOAD_URL,
                hints::package_install_hint("qt")
            );
        }
    }

    let pdcurses = find_pdcurses_paths(root, build_dir);
    if pdcurses.is_empty() {
        println!(
            " {} PDCursesMod: not found (expected under third_party/PDCursesMod \
             or build outputs).",
            "!".yellow()
        );
    } else {
        println!(" {} PDCursesMod: {}", "✓".green(), join_paths(&pdcurses));
    }

    ok
}

/// PDCursesMod locations: the vendored source tree plus any directory in the
/// build outputs holding a built pdcurses library.
fn find_pdcurses_paths(root: &Path, build_dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let vendored = root.join("third_party").join("PDCursesMod");
    if vendored.exists() {
        paths.push(vendored);
    }

    if build_dir.exists() {
        for entry in WalkDir::new(build_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_lowercase();
            let looks_like_lib = [".lib", ".a", ".so", ".dylib", ".dll"]
                .iter()
                .any(|ext| name.ends_with(ext));
            if looks_like_lib && name.contains("pdcurses") {
                if let Some(parent) = entry.path().parent() {
                    let parent = parent.to_path_buf();
                    if !paths.contains(&parent) {
                        paths.push(parent);
                    }
                }
            }
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn pdcurses_is_found_in_the_vendored_tree_and_build_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let vendored = dir.path().join("third_party").join("PDCursesMod");
        fs::create_dir_all(&vendored).unwrap();

        let build_dir = dir.path().join("build");
        let lib_dir = build_dir.join("lib");
        fs::create_dir_all(&lib_dir).unwrap();
        fs::write(lib_dir.join("libpdcurses.a"), b"").unwrap();
        fs::write(lib_dir.join("unrelated.a"), b"").unwrap();

        let found = find_pdcurses_paths(dir.path(), &build_dir);
        assert_eq!(found, vec![vendored, lib_dir]);
    }

    #[test]
    fn no_pdcurses_yields_an_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_pdcurses_paths(dir.path(), &dir.path().join("build")).is_empty());
    }
}
