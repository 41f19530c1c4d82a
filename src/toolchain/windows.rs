//! Windows-specific Visual Studio discovery via vswhere.
//!
//! Every query failure is treated as "not installed"; callers only ever see
//! absence. vswhere lives at a fixed location under the Visual Studio
//! installer directory and is present for any VS 2017+ install, including
//! the free Build Tools.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use super::unique_existing;

pub const VSWHERE_INSTALL_HELP: &str = "vswhere.exe not found. Install Visual Studio (or the \
    free Build Tools 2022) so vswhere.exe is placed under Program Files (x86)/Microsoft Visual \
    Studio/Installer, or add an existing vswhere.exe to PATH.";

/// Metadata for the newest Visual Studio reported by vswhere.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VsInstallation {
    pub installation_path: Option<String>,
    pub installation_version: Option<String>,
}

/// vswhere.exe from the standard Visual Studio installer directory.
pub fn vswhere_path() -> Option<PathBuf> {
    let program_files_x86 = env::var("ProgramFiles(x86)").ok()?;
    let path = Path::new(&program_files_x86)
        .join("Microsoft Visual Studio")
        .join("Installer")
        .join("vswhere.exe");
    path.exists().then_some(path)
}

/// Full record for the latest installation with the MSBuild component.
pub fn query_latest_installation(vswhere: &Path) -> Option<VsInstallation> {
    let output = Command::new(vswhere)
        .args([
            "-latest",
            "-products",
            "*",
            "-requires",
            "Microsoft.Component.MSBuild",
            "-format",
            "json",
        ])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let installations: Vec<VsInstallation> = serde_json::from_slice(&output.stdout).ok()?;
    installations.into_iter().next()
}

/// Just the `installationVersion` property, e.g. "17.9.34622.214".
pub fn query_installation_version(vswhere: &Path) -> Option<String> {
    let output = Command::new(vswhere)
        .args([
            "-latest",
            "-products",
            "*",
            "-requires",
            "Microsoft.Component.MSBuild",
            "-property",
            "installationVersion",
        ])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!version.is_empty()).then_some(version)
}

/// Likely MSVC library directories from a VS install root or a tool path
/// inside one: the newest toolset's lib dirs plus `lib` siblings up the
/// ancestor chain.
pub fn msvc_library_dirs_from_root(root: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    let vc_tools = root.join("VC").join("Tools").join("MSVC");
    if vc_tools.is_dir() {
        let mut versions: Vec<PathBuf> = fs::read_dir(&vc_tools)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect()
            })
            .unwrap_or_default();
        versions.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
        if let Some(newest) = versions.pop() {
            candidates.push(newest.join("lib"));
            candidates.push(newest.join("lib").join("x64"));
            candidates.push(newest.join("lib").join("x86"));
        }
    }

    for ancestor in root.ancestors().skip(1) {
        let lib = ancestor.join("lib");
        candidates.push(lib.clone());
        candidates.push(lib.join("x64"));
        candidates.push(lib.join("x86"));
    }

    unique_existing(candidates)
}
