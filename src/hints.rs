//! Remediation hints keyed to the host platform's package manager.

use crate::process::find_in_path;

pub const CMAKE_DOWNLOAD_URL: &str = "https://cmake.org/download/";
pub const NINJA_DOWNLOAD_URL: &str = "https://ninja-build.org/";
pub const QT_DOWNLOAD_URL: &str = "https://www.qt.io/download";
pub const QT_DOWNLOAD_COMMAND: &str = "qdev download-qt";

/// The package manager a hint should be phrased for. Fixed per OS on
/// Windows/macOS, probed from PATH elsewhere.
pub fn detect_package_manager() -> Option<&'static str> {
    if cfg!(windows) {
        return Some("choco");
    }
    if cfg!(target_os = "macos") {
        return Some("brew");
    }
    if find_in_path("apt-get").is_some() {
        return Some("apt");
    }
    if find_in_path("dnf").is_some() || find_in_path("yum").is_some() {
        return Some("dnf");
    }
    None
}

fn package_name(tool: &str, manager: &str) -> Option<&'static str> {
    Some(match (tool, manager) {
        ("cmake", _) => "cmake",
        ("ninja", "apt") | ("ninja", "dnf") => "ninja-build",
        ("ninja", _) => "ninja",
        ("qt", "apt") => "qt6-base-dev qt6-declarative-dev",
        ("qt", "dnf") => "qt6-qtbase-devel qt6-qtdeclarative-devel",
        ("qt", "brew") => "qt@6",
        ("qt", "choco") => "qt-lts-long-term-release",
        _ => return None,
    })
}

/// A copy-pasteable install command for the given tool on this host.
pub fn package_install_hint(tool: &str) -> String {
    if let Some(manager) = detect_package_manager() {
        if let Some(package) = package_name(tool, manager) {
            return match manager {
                "apt" => format!("sudo apt-get install {}", package),
                "dnf" => format!("sudo dnf install {}", package),
                "brew" => format!("brew install {}", package),
                _ => format!("choco install {} -y", package),
            };
        }
    }
    "Install via your package manager".to_string()
}

pub fn compiler_install_hint() -> String {
    if cfg!(target_os = "macos") {
        return "Install the Xcode Command Line Tools: xcode-select --install".to_string();
    }
    match detect_package_manager() {
        Some("apt") => "sudo apt-get install build-essential".to_string(),
        Some("dnf") => "sudo dnf install gcc-c++".to_string(),
        Some("brew") => "brew install llvm".to_string(),
        Some("choco") => {
            "Install Visual Studio Build Tools 2022 (Desktop C++ workload) or MinGW-w64."
                .to_string()
        }
        _ => "Install a C++ compiler (clang++/g++) and ensure it is on PATH.".to_string(),
    }
}
