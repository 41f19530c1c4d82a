//! Generator and compiler detection.
//!
//! Every probe here is a pure function of CLI flags, environment variables,
//! and the filesystem, re-evaluated on each call. "Not found" is an `Option`,
//! never an error; the caller decides what absence means.

pub mod types;

#[cfg(windows)]
pub mod windows;

pub use types::{CompilerDetection, ToolchainFlavor};

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::process::{find_in_path, find_in_path_within};

/// Stateless except for the one-shot "vswhere missing" hint, which is an
/// explicit per-instance latch so probes in tests do not leak output state
/// across cases.
pub struct ToolchainProbe {
    #[cfg_attr(not(windows), allow(dead_code))]
    vswhere_hint_emitted: bool,
}

impl Default for ToolchainProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolchainProbe {
    pub fn new() -> Self {
        Self {
            vswhere_hint_emitted: false,
        }
    }

    /// Pick a sensible default CMake generator:
    /// CLI value wins, then `$CMAKE_GENERATOR`, then (on Windows) a Visual
    /// Studio generator matching the newest installed toolset, then Ninja if
    /// it is on PATH, otherwise nothing — CMake picks its own default.
    pub fn detect_generator(&mut self, cli_value: Option<&str>) -> Option<String> {
        self.detect_generator_within(
            cli_value,
            env::var("CMAKE_GENERATOR").ok(),
            env::var_os("PATH"),
        )
    }

    fn detect_generator_within(
        &mut self,
        cli_value: Option<&str>,
        env_generator: Option<String>,
        path_value: Option<std::ffi::OsString>,
    ) -> Option<String> {
        if let Some(value) = cli_value {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
        if let Some(value) = env_generator {
            if !value.is_empty() {
                return Some(value);
            }
        }
        #[cfg(windows)]
        if let Some(generator) = self.visual_studio_generator() {
            return Some(generator);
        }
        if find_in_path_within("ninja", path_value.as_deref()).is_some() {
            return Some("Ninja".to_string());
        }
        None
    }

    /// Best-effort guess of the Windows toolchain flavor so Qt binaries can
    /// be matched against the active compiler. Always `None` off Windows —
    /// the flavor split only exists there.
    pub fn detect_compiler_flavor(&mut self, generator: Option<&str>) -> Option<ToolchainFlavor> {
        #[cfg(not(windows))]
        {
            let _ = generator;
            None
        }

        #[cfg(windows)]
        {
            let generator = generator
                .map(str::to_string)
                .or_else(|| env::var("CMAKE_GENERATOR").ok())
                .unwrap_or_default();
            if let Some(flavor) = flavor_from_generator(&generator) {
                return Some(flavor);
            }

            for var in ["CXX", "CC"] {
                let Ok(compiler) = env::var(var) else { continue };
                if compiler.is_empty() {
                    continue;
                }
                if let Some(flavor) = flavor_from_compiler(&compiler) {
                    return Some(flavor);
                }
            }

            // A Visual Studio install wins over incidental MinGW tools on
            // PATH (e.g. Strawberry Perl's g++).
            if self.has_visual_studio_install() {
                return Some(ToolchainFlavor::Msvc);
            }
            if find_in_path("cl").is_some() {
                return Some(ToolchainFlavor::Msvc);
            }
            if find_in_path("g++").is_some() {
                return Some(ToolchainFlavor::Mingw);
            }
            None
        }
    }

    /// Locate a usable C++ compiler for the `verify` report: a description,
    /// an optional remediation hint, and its likely library search dirs.
    pub fn describe_compiler(&mut self, generator: Option<&str>) -> CompilerDetection {
        // Explicit $CXX/$CC overrides win on every platform.
        for var in ["CXX", "CC"] {
            let Ok(compiler) = env::var(var) else { continue };
            if compiler.is_empty() {
                continue;
            }
            let resolved = find_in_path(&compiler).or_else(|| {
                let path = PathBuf::from(&compiler);
                path.exists().then_some(path)
            });
            return match resolved {
                Some(path) => CompilerDetection {
                    description: Some(format!("{} (from ${})", path.display(), var)),
                    hint: None,
                    library_dirs: compiler_library_dirs(&path),
                },
                None => CompilerDetection {
                    description: None,
                    hint: Some(format!(
                        "${} points to {}, but it is not executable.",
                        var, compiler
                    )),
                    library_dirs: Vec::new(),
                },
            };
        }

        #[cfg(windows)]
        {
            self.describe_windows_compiler(generator)
        }

        #[cfg(not(windows))]
        {
            let _ = generator;
            for candidate in ["c++", "g++", "clang++"] {
                if let Some(path) = find_in_path(candidate) {
                    return CompilerDetection {
                        description: Some(format!("{} at {}", candidate, path.display())),
                        hint: None,
                        library_dirs: compiler_library_dirs(&path),
                    };
                }
            }
            CompilerDetection {
                description: None,
                hint: Some(crate::hints::compiler_install_hint()),
                library_dirs: Vec::new(),
            }
        }
    }

    #[cfg(windows)]
    fn describe_windows_compiler(&mut self, generator: Option<&str>) -> CompilerDetection {
        let flavor = self.detect_compiler_flavor(generator);
        let cl_path = find_in_path("cl");
        let gxx_path = find_in_path("g++");
        let vswhere = windows::vswhere_path();

        let msvc_result = || -> Option<CompilerDetection> {
            if let Some(cl) = &cl_path {
                return Some(CompilerDetection {
                    description: Some("cl.exe".to_string()),
                    hint: None,
                    library_dirs: windows::msvc_library_dirs_from_root(cl),
                });
            }
            if let Some(vswhere) = &vswhere {
                return Some(CompilerDetection {
                    description: Some("Visual Studio toolchain (via vswhere)".to_string()),
                    hint: Some(
                        "cl.exe is not on PATH; use a Visual Studio developer prompt or the \
                         Visual Studio generator."
                            .to_string(),
                    ),
                    library_dirs: windows::msvc_library_dirs_from_root(vswhere),
                });
            }
            None
        };
        let mingw_result = || -> Option<CompilerDetection> {
            gxx_path.as_ref().map(|gxx| CompilerDetection {
                description: Some(format!("MinGW-w64 g++ at {}", gxx.display())),
                hint: None,
                library_dirs: compiler_library_dirs(gxx),
            })
        };

        let detected = if flavor == Some(ToolchainFlavor::Mingw) {
            mingw_result().or_else(msvc_result)
        } else {
            msvc_result().or_else(mingw_result)
        };
        detected.unwrap_or_else(|| CompilerDetection {
            description: None,
            hint: Some(
                "Install MSVC Build Tools or MinGW-w64 and ensure cl.exe/g++.exe is available."
                    .to_string(),
            ),
            library_dirs: Vec::new(),
        })
    }

    /// Detect a Visual Studio toolchain even when cl.exe is not on PATH.
    #[cfg(windows)]
    fn has_visual_studio_install(&mut self) -> bool {
        for var in ["VCToolsInstallDir", "VCINSTALLDIR", "VSINSTALLDIR"] {
            if env::var(var).map(|v| !v.is_empty()).unwrap_or(false) {
                return true;
            }
        }
        match windows::vswhere_path() {
            Some(vswhere) => windows::query_installation_version(&vswhere).is_some(),
            None => {
                self.warn_missing_vswhere();
                false
            }
        }
    }

    /// Map the newest installed Visual Studio major version to a generator
    /// name. Majors without a known generator yield no suggestion.
    #[cfg(windows)]
    fn visual_studio_generator(&mut self) -> Option<String> {
        let vswhere = match windows::vswhere_path() {
            Some(path) => path,
            None => {
                self.warn_missing_vswhere();
                return None;
            }
        };
        let version = windows::query_installation_version(&vswhere)?;
        let major: u32 = version.split('.').next()?.parse().ok()?;
        match major {
            17.. => Some("Visual Studio 17 2022".to_string()),
            16 => Some("Visual Studio 16 2019".to_string()),
            _ => None,
        }
    }

    #[cfg(windows)]
    fn warn_missing_vswhere(&mut self) {
        if self.vswhere_hint_emitted {
            return;
        }
        self.vswhere_hint_emitted = true;
        println!("{}", windows::VSWHERE_INSTALL_HELP);
    }
}

/// Classify a generator name (or `$CMAKE_GENERATOR` value) by substring.
pub fn flavor_from_generator(generator: &str) -> Option<ToolchainFlavor> {
    let generator = generator.to_lowercase();
    if generator.contains("visual studio") || generator.contains("msvc") {
        return Some(ToolchainFlavor::Msvc);
    }
    if generator.contains("mingw") {
        return Some(ToolchainFlavor::Mingw);
    }
    None
}

/// Classify a compiler override (`$CXX`/`$CC`) by its executable basename.
pub fn flavor_from_compiler(compiler: &str) -> Option<ToolchainFlavor> {
    let name = Path::new(compiler)
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name == "cl" || name == "cl.exe" || name.contains("msvc") {
        return Some(ToolchainFlavor::Msvc);
    }
    if name.contains("mingw") || name.starts_with("g++") || name.starts_with("gcc") {
        return Some(ToolchainFlavor::Mingw);
    }
    None
}

/// Library search directories for a gcc/clang style compiler: ask the
/// compiler itself first, fall back to its install layout.
pub fn compiler_library_dirs(compiler: &Path) -> Vec<PathBuf> {
    let queried = compiler_search_dirs(compiler);
    if !queried.is_empty() {
        return unique_existing(queried);
    }
    let mut candidates = Vec::new();
    if let Some(bin_dir) = compiler.parent() {
        candidates.push(bin_dir.join("lib"));
        if let Some(install_root) = bin_dir.parent() {
            candidates.push(install_root.join("lib"));
            candidates.push(install_root.join("lib64"));
        }
    }
    unique_existing(candidates)
}

fn compiler_search_dirs(compiler: &Path) -> Vec<PathBuf> {
    let output = match Command::new(compiler).arg("-print-search-dirs").output() {
        Ok(output) if output.status.success() => output,
        _ => return Vec::new(),
    };
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if line.to_lowercase().starts_with("libraries:") {
            let list = line.split_once('=').map(|(_, rest)| rest).unwrap_or("");
            return env::split_paths(list.trim())
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
    }
    Vec::new()
}

/// Resolve, deduplicate, and drop non-existent paths, preserving order.
pub(crate) fn unique_existing(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for path in paths {
        let resolved = path.canonicalize().unwrap_or(path);
        if !resolved.exists() || !seen.insert(resolved.clone()) {
            continue;
        }
        result.push(resolved);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn generator_strings_classify_by_substring() {
        assert_eq!(
            flavor_from_generator("Visual Studio 17 2022"),
            Some(ToolchainFlavor::Msvc)
        );
        assert_eq!(
            flavor_from_generator("MinGW Makefiles"),
            Some(ToolchainFlavor::Mingw)
        );
        assert_eq!(flavor_from_generator("Ninja"), None);
        assert_eq!(flavor_from_generator(""), None);
    }

    #[test]
    fn compiler_basenames_classify_by_family() {
        assert_eq!(flavor_from_compiler("cl"), Some(ToolchainFlavor::Msvc));
        assert_eq!(
            flavor_from_compiler(r"C:\tools\cl.exe"),
            Some(ToolchainFlavor::Msvc)
        );
        assert_eq!(
            flavor_from_compiler("/mingw64/bin/g++.exe"),
            Some(ToolchainFlavor::Mingw)
        );
        assert_eq!(flavor_from_compiler("gcc-13"), Some(ToolchainFlavor::Mingw));
        assert_eq!(flavor_from_compiler("clang++"), None);
    }

    #[test]
    fn cli_generator_always_wins() {
        let mut probe = ToolchainProbe::new();
        let found = probe.detect_generator_within(Some("Ninja Multi-Config"), None, None);
        assert_eq!(found.as_deref(), Some("Ninja Multi-Config"));
    }

    #[test]
    fn env_generator_beats_path_probing() {
        let mut probe = ToolchainProbe::new();
        let found =
            probe.detect_generator_within(None, Some("Unix Makefiles".to_string()), None);
        assert_eq!(found.as_deref(), Some("Unix Makefiles"));
    }

    // On Windows an installed Visual Studio would legitimately outrank the
    // PATH probe, so the fallback behavior is only deterministic elsewhere.
    #[cfg(not(windows))]
    #[test]
    fn ninja_on_the_search_path_is_the_fallback_generator() {
        let dir = tempfile::tempdir().unwrap();
        let ninja = dir
            .path()
            .join(if cfg!(windows) { "ninja.exe" } else { "ninja" });
        fs::write(&ninja, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&ninja).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&ninja, perms).unwrap();
        }

        let path_value = std::env::join_paths([dir.path()]).unwrap();
        let mut probe = ToolchainProbe::new();
        let found = probe.detect_generator_within(None, None, Some(path_value));
        assert_eq!(found.as_deref(), Some("Ninja"));
    }

    #[cfg(not(windows))]
    #[test]
    fn empty_search_path_defers_to_cmake() {
        let empty = tempfile::tempdir().unwrap();
        let path_value = std::env::join_paths([empty.path()]).unwrap();
        let mut probe = ToolchainProbe::new();
        assert_eq!(probe.detect_generator_within(None, None, Some(path_value)), None);
    }

    #[test]
    fn compiler_library_dirs_fall_back_to_install_layout() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        let lib = dir.path().join("lib");
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(&lib).unwrap();
        // A plain file is not a runnable compiler, so -print-search-dirs
        // fails and the layout fallback kicks in.
        let compiler = bin.join("g++");
        fs::write(&compiler, b"").unwrap();

        let dirs = compiler_library_dirs(&compiler);
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0], lib.canonicalize().unwrap());
    }
}
