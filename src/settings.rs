//! Persisted per-user defaults (`settings.json`).
//!
//! The store is a flat, closed key set with built-in defaults. Loading is
//! deliberately forgiving: a missing, corrupted, or wrongly-typed file
//! degrades to the defaults so the tool stays usable no matter what state
//! the config file is in. Every successful `set` rewrites the whole key set,
//! which can clobber a concurrent invocation's unrelated change — accepted
//! for the single-developer-at-a-terminal usage model.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;

pub const CONFIG_DIR_NAME: &str = "qdev";
pub const CONFIG_FILE_NAME: &str = "settings.json";

pub const DEFAULT_BUILD_DIR: &str = "build";
pub const DEFAULT_BUILD_TYPE: &str = "Debug";
pub const DEFAULT_QT_OUTPUT_DIR: &str = "third_party/qt6";

/// The closed set of persisted keys, in `--set`-help order.
pub const KNOWN_KEYS: &[&str] = &[
    "build_dir",
    "build_type",
    "qt_prefix",
    "generator",
    "download_qt_output_dir",
    "download_qt_version",
    "download_qt_compiler",
    "default_run_targets",
];

pub fn default_run_targets() -> Vec<String> {
    vec!["sample_app".to_string(), "sample_cli".to_string()]
}

/// Merged view of the persisted settings with defaults filled in.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub build_dir: String,
    pub build_type: String,
    pub qt_prefix: Option<String>,
    pub generator: Option<String>,
    pub download_qt_output_dir: String,
    pub download_qt_version: Option<String>,
    pub download_qt_compiler: Option<String>,
    pub default_run_targets: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            build_dir: DEFAULT_BUILD_DIR.to_string(),
            build_type: DEFAULT_BUILD_TYPE.to_string(),
            qt_prefix: None,
            generator: None,
            download_qt_output_dir: DEFAULT_QT_OUTPUT_DIR.to_string(),
            download_qt_version: None,
            download_qt_compiler: None,
            default_run_targets: default_run_targets(),
        }
    }
}

/// Expand a leading `~` to the user's home directory. Anything else is
/// returned untouched.
pub fn expand_user(value: &str) -> String {
    if value == "~" {
        if let Some(home) = dirs::home_dir() {
            return home.to_string_lossy().into_owned();
        }
    }
    for prefix in ["~/", "~\\"] {
        if let Some(rest) = value.strip_prefix(prefix) {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest).to_string_lossy().into_owned();
            }
        }
    }
    value.to_string()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn normalize_run_targets(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => {
            let parts: Vec<String> = s
                .replace(';', ",")
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            Some(parts)
        }
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(scalar_string)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            Some(parts)
        }
        _ => None,
    }
}

impl Settings {
    /// Apply one raw value from the settings file (or a `--set` update) to
    /// the merged view, with per-key normalization. `null` resets the key to
    /// its built-in default; unrecognized shapes are ignored.
    fn apply_value(&mut self, key: &str, value: &Value) {
        if value.is_null() {
            self.reset_to_default(key);
            return;
        }
        match key {
            "build_dir" => {
                if let Some(s) = scalar_string(value) {
                    self.build_dir = expand_user(&s);
                }
            }
            "build_type" => {
                if let Some(s) = scalar_string(value) {
                    self.build_type = s;
                }
            }
            "qt_prefix" => {
                if let Some(s) = scalar_string(value) {
                    self.qt_prefix = Some(expand_user(&s));
                }
            }
            "generator" => {
                if let Some(s) = scalar_string(value) {
                    self.generator = Some(s);
                }
            }
            "download_qt_output_dir" => {
                if let Some(s) = scalar_string(value) {
                    self.download_qt_output_dir = expand_user(&s);
                }
            }
            "download_qt_version" => {
                if let Some(s) = scalar_string(value) {
                    self.download_qt_version = Some(s);
                }
            }
            "download_qt_compiler" => {
                if let Some(s) = scalar_string(value) {
                    self.download_qt_compiler = Some(s);
                }
            }
            "default_run_targets" => {
                self.default_run_targets =
                    normalize_run_targets(value).unwrap_or_else(default_run_targets);
            }
            _ => {}
        }
    }

    fn reset_to_default(&mut self, key: &str) {
        match key {
            "build_dir" => self.build_dir = DEFAULT_BUILD_DIR.to_string(),
            "build_type" => self.build_type = DEFAULT_BUILD_TYPE.to_string(),
            "qt_prefix" => self.qt_prefix = None,
            "generator" => self.generator = None,
            "download_qt_output_dir" => {
                self.download_qt_output_dir = DEFAULT_QT_OUTPUT_DIR.to_string()
            }
            "download_qt_version" => self.download_qt_version = None,
            "download_qt_compiler" => self.download_qt_compiler = None,
            "default_run_targets" => self.default_run_targets = default_run_targets(),
            _ => {}
        }
    }

    /// Sorted key/value view for the `settings` report.
    pub fn sorted_entries(&self) -> BTreeMap<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// Loads, merges, and persists the per-user settings file.
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Load from the platform config location
    /// (e.g. `~/.config/qdev/settings.json`).
    pub fn load_default() -> Self {
        Self::load(default_config_path())
    }

    /// Load from an explicit path. Never fails: anything unreadable or
    /// malformed simply contributes no overrides.
    pub fn load(path: PathBuf) -> Self {
        let mut settings = Settings::default();
        for (key, value) in read_overrides(&path) {
            if KNOWN_KEYS.contains(&key.as_str()) {
                settings.apply_value(&key, &value);
            }
        }
        Self { path, settings }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Reset `unset` keys to their defaults, apply `updates`, and persist the
    /// full key set. Unknown keys are rejected so typos do not vanish
    /// silently.
    pub fn set(&mut self, updates: &[(String, String)], unset: &[String]) -> Result<&Settings> {
        for key in unset {
            ensure_known_key(key)?;
            self.settings.reset_to_default(key);
        }
        for (key, value) in updates {
            ensure_known_key(key)?;
            self.settings
                .apply_value(key, &Value::String(value.clone()));
        }
        self.persist()?;
        Ok(&self.settings)
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.path, body)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

fn ensure_known_key(key: &str) -> Result<()> {
    if !KNOWN_KEYS.contains(&key) {
        bail!(
            "unknown setting '{}' (valid keys: {})",
            key,
            KNOWN_KEYS.join(", ")
        );
    }
    Ok(())
}

fn read_overrides(path: &Path) -> Vec<(String, Value)> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => Vec::new(),
    }
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}
