//! Upstream release checks for Qt and the vendored PDCursesMod.
//!
//! All network access goes through a short fixed timeout and degrades to an
//! "unavailable" line in the report — an offline machine must still be able
//! to run every other command.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use colored::*;
use regex::Regex;
use serde::Deserialize;

use crate::qt::detect_local_qt_version;
use crate::toolchain::ToolchainProbe;
use crate::version::{compare_versions, latest_version_string, parse_version_string};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "qdev-update-check";
const QT_RELEASES_URL: &str = "https://download.qt.io/official_releases/qt/";
const PDCURSES_LATEST_API: &str =
    "https://api.github.com/repos/Bill-Gray/PDCursesMod/releases/latest";

fn fetch_text(url: &str) -> Result<String, String> {
    let agent = ureq::AgentBuilder::new().timeout(FETCH_TIMEOUT).build();
    match agent.get(url).set("User-Agent", USER_AGENT).call() {
        Ok(response) => response.into_string().map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn fetch_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, String> {
    let agent = ureq::AgentBuilder::new().timeout(FETCH_TIMEOUT).build();
    match agent.get(url).set("User-Agent", USER_AGENT).call() {
        Ok(response) => response.into_json().map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Collect version strings like `6.7.2` from a plain directory listing,
/// optionally restricted to a fixed number of numeric segments.
fn extract_versions_from_listing(html: &str, segments: Option<usize>) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"href="((?:\d+\.)+\d+)/""#).unwrap());

    let mut versions = Vec::new();
    for caps in re.captures_iter(html) {
        let value = &caps[1];
        if let Some(expected) = segments {
            if parse_version_string(value).len() != expected {
                continue;
            }
        }
        versions.push(value.trim_end_matches('/').to_string());
    }
    versions
}

/// `(version, source URL, error)` for the newest Qt 6 release on
/// download.qt.io. Walks the major.minor index first, then the patch-level
/// subdirectory of the newest series.
pub fn fetch_latest_qt_version() -> (Option<String>, String, Option<String>) {
    let listing = match fetch_text(QT_RELEASES_URL) {
        Ok(body) => body,
        Err(error) => return (None, QT_RELEASES_URL.to_string(), Some(error)),
    };

    let major_minor: Vec<String> = extract_versions_from_listing(&listing, Some(2))
        .into_iter()
        .filter(|version| version.starts_with("6."))
        .collect();
    let Some(newest_series) = latest_version_string(major_minor.iter().map(String::as_str)) else {
        return (
            None,
            QT_RELEASES_URL.to_string(),
            Some("No Qt 6 versions found in the release index.".to_string()),
        );
    };

    let series_url = format!("{}{}/", QT_RELEASES_URL, newest_series);
    match fetch_text(&series_url) {
        Ok(patch_listing) => {
            let patches: Vec<String> = extract_versions_from_listing(&patch_listing, Some(3))
                .into_iter()
                .filter(|version| version.starts_with(&newest_series))
                .collect();
            match latest_version_string(patches.iter().map(String::as_str)) {
                Some(newest_patch) => (Some(newest_patch), series_url, None),
                None => (Some(newest_series), QT_RELEASES_URL.to_string(), None),
            }
        }
        Err(error) => (Some(newest_series), QT_RELEASES_URL.to_string(), Some(error)),
    }
}

#[derive(Deserialize)]
struct LatestRelease {
    tag_name: Option<String>,
    name: Option<String>,
    html_url: Option<String>,
}

/// `(version, source URL, error)` for the latest PDCursesMod release tag.
pub fn fetch_latest_pdcurses_version() -> (Option<String>, String, Option<String>) {
    let release: LatestRelease = match fetch_json(PDCURSES_LATEST_API) {
        Ok(release) => release,
        Err(error) => return (None, PDCURSES_LATEST_API.to_string(), Some(error)),
    };

    let source = release
        .html_url
        .unwrap_or_else(|| PDCURSES_LATEST_API.to_string());
    let version = release
        .tag_name
        .or(release.name)
        .map(|tag| tag.trim_start_matches(['v', 'V']).to_string());
    match version {
        Some(version) if !version.is_empty() => (Some(version), source, None),
        _ => (
            None,
            source,
            Some("Latest release tag not present in GitHub response.".to_string()),
        ),
    }
}

/// Read the version macros from the vendored PDCursesMod header.
pub fn detect_local_pdcurses_version(root: &Path) -> Option<String> {
    let header = root
        .join("third_party")
        .join("PDCursesMod")
        .join("curses.h");
    let text = fs::read_to_string(&header).ok()?;

    let macro_value = |name: &str| -> Option<String> {
        Regex::new(&format!(r"{}\s+(\d+)", name))
            .ok()?
            .captures(&text)
            .map(|caps| caps[1].to_string())
    };

    let major = macro_value("PDC_VER_MAJOR")?;
    let minor = macro_value("PDC_VER_MINOR")?;
    let patch = macro_value("PDC_VER_CHANGE")?;
    Some(format!("{}.{}.{}", major, minor, patch))
}

fn status_suffix(comparison: Option<Ordering>) -> &'static str {
    match comparison {
        Some(Ordering::Less) => " (update available)",
        Some(Ordering::Equal) => " (up to date)",
        _ => "",
    }
}

/// Compare local library versions against upstream releases and print the
/// report. Returns false when any upstream feed was unreachable.
pub fn check_library_updates(
    root: &Path,
    qt_prefix_cli: Option<&str>,
    probe: &mut ToolchainProbe,
) -> bool {
    println!(
        "\n{}",
        "Checking library updates (Qt 6, PDCursesMod):".bold()
    );
    let mut ok = true;

    let (local_qt, qt_prefix) = detect_local_qt_version(root, qt_prefix_cli, probe);
    let (latest_qt, qt_source, qt_error) = fetch_latest_qt_version();
    match &qt_prefix {
        Some(prefix) => println!(
            " - Qt local: {} at {}",
            local_qt.as_deref().unwrap_or("unknown version"),
            prefix.display()
        ),
        None => println!(
            " - Qt local: not detected (set --qt-prefix / QT_PREFIX_PATH / CMAKE_PREFIX_PATH)."
        ),
    }
    match &latest_qt {
        Some(latest) => {
            let comparison = compare_versions(local_qt.as_deref(), Some(latest));
            println!(
                " - Qt latest: {} [{}]{}",
                latest,
                qt_source,
                status_suffix(comparison)
            );
            if comparison == Some(Ordering::Less) {
                println!(
                    "   hint: run {} --qt-version {} to refresh third_party/qt6.",
                    crate::hints::QT_DOWNLOAD_COMMAND,
                    latest
                );
            }
        }
        None => {
            ok = false;
            println!(
                " - Qt latest: unavailable ({})",
                qt_error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let local_pdc = detect_local_pdcurses_version(root);
    let (latest_pdc, pdc_source, pdc_error) = fetch_latest_pdcurses_version();
    match &local_pdc {
        Some(version) => println!(" - PDCursesMod local: {} (third_party/PDCursesMod)", version),
        None => println!(" - PDCursesMod local: not found under third_party/PDCursesMod."),
    }
    match &latest_pdc {
        Some(latest) => {
            let comparison = compare_versions(local_pdc.as_deref(), Some(latest));
            println!(
                " - PDCursesMod latest: {} [{}]{}",
                latest,
                pdc_source,
                status_suffix(comparison)
            );
            if comparison == Some(Ordering::Less) {
                println!(
                    "   hint: update the vendored PDCursesMod tree from the upstream release/tag."
                );
            }
        }
        None => {
            ok = false;
            println!(
                " - PDCursesMod latest: unavailable ({})",
                pdc_error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    ok
}
