//! Version tuple extraction and comparison.
//!
//! Everything here works on plain digit runs so that strings like
//! `"6.10.1"`, `"Qt 6.7"`, or `"win64_msvc2022_64"` can be ordered without
//! committing to a strict semver grammar.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Ordered numeric components extracted from a version-like string.
/// Comparison is plain lexicographic tuple ordering.
pub type VersionTuple = Vec<u64>;

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

fn dotted_triple() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").unwrap())
}

/// Extract every maximal decimal digit run from `value`, in order.
/// Returns an empty tuple when the string contains no digits.
pub fn parse_version_string(value: &str) -> VersionTuple {
    digit_runs()
        .find_iter(value)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Extract a version tuple like `[6, 10, 1]` from a path component.
///
/// Components are scanned from the last to the first and only a strict
/// three-part dotted pattern counts. Unlike [`parse_version_string`] this
/// deliberately ignores loose digit runs, so directory names such as
/// `mingw_64` or `msvc2022_64` do not masquerade as versions.
pub fn parse_version_from_path(path: &Path) -> VersionTuple {
    for component in path.components().rev() {
        let part = component.as_os_str().to_string_lossy();
        if let Some(caps) = dotted_triple().captures(&part) {
            return (1..=3)
                .filter_map(|i| caps[i].parse().ok())
                .collect();
        }
    }
    Vec::new()
}

/// Order two version-like strings. `None` when either side is absent or
/// contains no digits at all.
pub fn compare_versions(lhs: Option<&str>, rhs: Option<&str>) -> Option<Ordering> {
    let (lhs, rhs) = (lhs?, rhs?);
    let left = parse_version_string(lhs);
    let right = parse_version_string(rhs);
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some(left.cmp(&right))
}

/// Pick the highest version from a sequence of strings, numerically.
/// Strings without any digit run are skipped; ties keep the first seen.
pub fn latest_version_string<'a, I>(versions: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(VersionTuple, String)> = None;
    for version in versions {
        let tuple = parse_version_string(version);
        if tuple.is_empty() {
            continue;
        }
        match &best {
            Some((best_tuple, _)) if *best_tuple >= tuple => {}
            _ => best = Some((tuple, version.trim_end_matches('/').to_string())),
        }
    }
    best.map(|(_, version)| version)
}
