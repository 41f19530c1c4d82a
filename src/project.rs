//! CMake orchestration and target discovery.
//!
//! Configure, build, and test are thin wrappers over `cmake`/`ctest`
//! invocations; the real logic here is reconciling generators with an
//! existing build directory and locating what a build actually produced.

use std::collections::HashSet;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::process::{find_in_path, run_command};

/// CMake housekeeping targets that are never offered as runnable programs.
pub const NON_RUN_TARGETS: &[&str] = &[
    "all",
    "ALL_BUILD",
    "RUN_TESTS",
    "test",
    "install",
    "help",
    "clean",
    "ZERO_CHECK",
];

/// Whether the generator keeps several configurations in one build tree.
/// Known multi-config generator names count, as does a build directory whose
/// cache recorded configuration types at configure time.
pub fn is_multi_config(generator: Option<&str>, build_dir: &Path) -> bool {
    if let Some(generator) = generator {
        if generator.contains("Visual Studio")
            || generator.contains("Xcode")
            || generator.contains("Multi-Config")
        {
            return true;
        }
    }
    match fs::read_to_string(build_dir.join("CMakeCache.txt")) {
        Ok(text) => text.contains("CMAKE_CONFIGURATION_TYPES"),
        Err(_) => false,
    }
}

/// The generator a build directory was configured with, from its cache file.
pub fn read_generator_from_cache(build_dir: &Path) -> Option<String> {
    let text = fs::read_to_string(build_dir.join("CMakeCache.txt")).ok()?;
    for line in text.lines() {
        if let Some(value) = line.strip_prefix("CMAKE_GENERATOR:INTERNAL=") {
            return Some(value.trim().to_string());
        }
    }
    None
}

/// The `--config` value in effect: an explicit override, else the build type
/// for multi-config generators, else nothing.
fn active_config(
    generator: Option<&str>,
    build_dir: &Path,
    build_type: &str,
    config_override: Option<&str>,
) -> Option<String> {
    config_override
        .map(str::to_string)
        .or_else(|| is_multi_config(generator, build_dir).then(|| build_type.to_string()))
}

fn clear_build_dir(build_dir: &Path) -> Result<()> {
    if !build_dir.exists() {
        return Ok(());
    }
    println!("Clearing existing build directory: {}", build_dir.display());
    fs::remove_dir_all(build_dir)
        .with_context(|| format!("failed to remove {}", build_dir.display()))
}

fn confirm(question: &str, default: bool) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Ok(default);
    }
    Ok(inquire::Confirm::new(question)
        .with_default(default)
        .prompt()?)
}

/// Reconcile a requested generator with any existing CMake cache.
///
/// An auto-detected generator defers to whatever the cache was configured
/// with; an explicitly requested one that conflicts needs the build
/// directory cleared (confirmed interactively) or a different build dir.
fn resolve_generator_for_build_dir(
    build_dir: &Path,
    requested: Option<String>,
    generator_is_strict: bool,
) -> Result<Option<String>> {
    let Some(cached) = read_generator_from_cache(build_dir) else {
        return Ok(requested);
    };
    match requested {
        None => {
            println!(
                "Reusing cached CMake generator '{}' from build directory {}",
                cached,
                build_dir.display()
            );
            Ok(Some(cached))
        }
        Some(requested) if requested == cached => Ok(Some(requested)),
        Some(requested) => {
            let message = format!(
                "Build directory {} was configured with generator '{}', but '{}' was requested.",
                build_dir.display(),
                cached,
                requested
            );
            if !generator_is_strict {
                println!("{} Reusing cached generator.", message);
                return Ok(Some(cached));
            }
            if confirm(
                "Clear the existing build directory to switch generators?",
                false,
            )? {
                clear_build_dir(build_dir)?;
                return Ok(Some(requested));
            }
            bail!(
                "{} Delete or choose a different --build-dir to switch generators, \
                 or rerun without --generator to reuse the cached generator.",
                message
            );
        }
    }
}

/// Run the CMake configure step. Returns the generator that ended up in
/// effect (the cached one may win over an auto-detected request).
pub fn configure_project(
    root: &Path,
    build_dir: &Path,
    generator: Option<String>,
    build_type: &str,
    qt_prefix: Option<&Path>,
    generator_is_strict: bool,
) -> Result<Option<String>> {
    if build_dir.exists() && !build_dir.is_dir() {
        bail!(
            "Build path exists and is not a directory: {}",
            build_dir.display()
        );
    }

    let generator = resolve_generator_for_build_dir(build_dir, generator, generator_is_strict)?;

    fs::create_dir_all(build_dir)
        .with_context(|| format!("failed to create {}", build_dir.display()))?;

    let mut cmd: Vec<String> = vec![
        "cmake".to_string(),
        "-S".to_string(),
        root.to_string_lossy().into_owned(),
        "-B".to_string(),
        build_dir.to_string_lossy().into_owned(),
    ];
    if let Some(generator) = &generator {
        cmd.push("-G".to_string());
        cmd.push(generator.clone());
    }
    if let Some(prefix) = qt_prefix {
        cmd.push(format!("-DCMAKE_PREFIX_PATH={}", prefix.display()));
    }
    if !build_type.is_empty() {
        cmd.push(format!("-DCMAKE_BUILD_TYPE={}", build_type));
    }

    run_command(&cmd, None)?;
    Ok(generator)
}

/// Run the CMake build step for the given targets (all when empty).
pub fn build_targets(
    build_dir: &Path,
    generator: Option<&str>,
    build_type: &str,
    targets: &[String],
    config_override: Option<&str>,
) -> Result<()> {
    let config = active_config(generator, build_dir, build_type, config_override);

    let mut cmd: Vec<String> = vec![
        "cmake".to_string(),
        "--build".to_string(),
        build_dir.to_string_lossy().into_owned(),
    ];
    if !targets.is_empty() {
        cmd.push("--target".to_string());
        cmd.extend(targets.iter().cloned());
    }
    if let Some(config) = config {
        cmd.push("--config".to_string());
        cmd.push(config);
    }
    run_command(&cmd, None)
}

/// Run ctest against the build directory with passthrough arguments.
pub fn run_ctest(
    build_dir: &Path,
    generator: Option<&str>,
    build_type: &str,
    config_override: Option<&str>,
    extra_args: &[String],
) -> Result<()> {
    let config = active_config(generator, build_dir, build_type, config_override);

    let mut cmd: Vec<String> = vec![
        "ctest".to_string(),
        "--test-dir".to_string(),
        build_dir.to_string_lossy().into_owned(),
    ];
    if let Some(config) = config {
        cmd.push("-C".to_string());
        cmd.push(config);
    }
    cmd.extend(extra_args.iter().cloned());
    run_command(&cmd, None)
}

/// Locate the executable a build produced for `target`.
///
/// Probes the fixed spots first (build root, per-target subdir, and the
/// per-config variants of both), then falls back to a recursive search so
/// generator-specific nesting still resolves.
pub fn find_built_binary(
    build_dir: &Path,
    target: &str,
    generator: Option<&str>,
    build_type: &str,
    config_override: Option<&str>,
) -> Result<PathBuf> {
    let exe_name = format!("{}{}", target, std::env::consts::EXE_SUFFIX);
    let config = active_config(generator, build_dir, build_type, config_override);

    let mut candidates = vec![
        build_dir.join(&exe_name),
        build_dir.join(target).join(&exe_name),
    ];
    if let Some(config) = &config {
        candidates.push(build_dir.join(config).join(&exe_name));
        candidates.push(build_dir.join(config).join(target).join(&exe_name));
    }
    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.clone());
        }
    }

    for entry in WalkDir::new(build_dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() && entry.file_name().to_string_lossy() == exe_name {
            return Ok(entry.into_path());
        }
    }

    bail!(
        "Executable for target '{}' not found in {}",
        target,
        build_dir.display()
    )
}

fn list_targets_with_ninja(build_dir: &Path) -> Vec<String> {
    if find_in_path("ninja").is_none() {
        return Vec::new();
    }
    let output = match Command::new("ninja")
        .arg("-C")
        .arg(build_dir)
        .args(["-t", "targets", "all"])
        .output()
    {
        Ok(output) if output.status.success() => output,
        _ => return Vec::new(),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut targets = Vec::new();
    for line in stdout.lines() {
        let name = line.split(':').next().unwrap_or("").trim();
        if !name.is_empty() && !NON_RUN_TARGETS.contains(&name) {
            targets.push(name.to_string());
        }
    }
    targets
}

fn list_targets_with_cmake(build_dir: &Path, config: Option<&str>) -> Vec<String> {
    let mut command = Command::new("cmake");
    command
        .arg("--build")
        .arg(build_dir)
        .args(["--target", "help"]);
    if let Some(config) = config {
        command.args(["--config", config]);
    }
    let output = match command.output() {
        Ok(output) if output.status.success() => output,
        _ => return Vec::new(),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut targets = Vec::new();
    for line in stdout.lines() {
        let candidate = if let Some(rest) = line.strip_prefix("...") {
            rest.trim().split(' ').next().unwrap_or("")
        } else if line.contains(':') {
            line.split(':').next().unwrap_or("").trim()
        } else {
            continue;
        };
        if !candidate.is_empty() && !NON_RUN_TARGETS.contains(&candidate) {
            targets.push(candidate.to_string());
        }
    }
    targets
}

/// Merge backend-reported targets with the configured defaults, dropping
/// housekeeping targets and duplicates while preserving first-seen order.
fn merge_run_targets(found: Vec<String>, defaults: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::new();
    for name in found.into_iter().chain(defaults.iter().cloned()) {
        if NON_RUN_TARGETS.contains(&name.as_str()) || !seen.insert(name.clone()) {
            continue;
        }
        cleaned.push(name);
    }
    cleaned
}

/// Ask the build backend for its target list (Ninja's target tool or CMake's
/// `help` pseudo-target, picked by generator name) and fold in the defaults.
pub fn list_runnable_targets(
    build_dir: &Path,
    generator: Option<&str>,
    build_type: &str,
    config_override: Option<&str>,
    default_targets: &[String],
) -> Vec<String> {
    let generator = generator
        .map(str::to_string)
        .or_else(|| read_generator_from_cache(build_dir))
        .unwrap_or_default();
    let config = active_config(Some(&generator), build_dir, build_type, config_override);

    let found = if generator.contains("Ninja") {
        list_targets_with_ninja(build_dir)
    } else {
        list_targets_with_cmake(build_dir, config.as_deref())
    };
    merge_run_targets(found, default_targets)
}
