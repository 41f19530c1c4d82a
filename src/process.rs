//! External command execution and PATH probing.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use colored::*;

/// Run an external command with inherited stdio, echoing the command line
/// first. A non-zero exit is a hard failure carrying the exit code; there is
/// no retry and no timeout.
pub fn run_command(argv: &[String], cwd: Option<&Path>) -> Result<()> {
    let display = argv.join(" ");
    match cwd {
        Some(dir) => println!("\n{} (cd {}) {}", ">>>".cyan(), dir.display(), display),
        None => println!("\n{} {}", ">>>".cyan(), display),
    }

    let (program, args) = argv
        .split_first()
        .context("cannot run an empty command line")?;
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let status = command
        .status()
        .with_context(|| format!("failed to launch '{}'", program))?;
    if !status.success() {
        match status.code() {
            Some(code) => bail!("command '{}' exited with status {}", program, code),
            None => bail!("command '{}' was terminated by a signal", program),
        }
    }
    Ok(())
}

/// Locate an executable on the current PATH.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    find_in_path_within(name, std::env::var_os("PATH").as_deref())
}

/// PATH lookup against an explicit search string. Split out so probes can be
/// exercised against a synthetic PATH in tests.
pub fn find_in_path_within(name: &str, path_value: Option<&OsStr>) -> Option<PathBuf> {
    let path_value = path_value?;
    for dir in std::env::split_paths(path_value) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        if cfg!(windows) && Path::new(name).extension().is_none() {
            let candidate = dir.join(format!("{}.exe", name));
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn finds_an_executable_on_a_synthetic_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join(if cfg!(windows) { "ninja.exe" } else { "ninja" });
        fs::write(&tool, b"").unwrap();
        #[cfg(unix)]
        make_executable(&tool);

        let path_value = std::env::join_paths([dir.path()]).unwrap();
        let found = find_in_path_within("ninja", Some(path_value.as_os_str()));
        assert_eq!(found, Some(tool));
    }

    #[test]
    fn missing_tool_is_absent_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path_value = std::env::join_paths([dir.path()]).unwrap();
        assert_eq!(
            find_in_path_within("no-such-tool", Some(path_value.as_os_str())),
            None
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ninja"), b"").unwrap();
        let path_value = std::env::join_paths([dir.path()]).unwrap();
        assert_eq!(
            find_in_path_within("ninja", Some(path_value.as_os_str())),
            None
        );
    }
}
