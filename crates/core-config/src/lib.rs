//! Configuration loading and the key-binding rule source.
//!
//! `quill.toml` is looked up in the working directory first, then in the
//! platform config dir. A missing or malformed file yields defaults; the
//! editor must always start. Unknown fields are ignored so the file can grow
//! without breaking older builds.
//!
//! The key-binding file is stricter: it is either a fully valid list of rules
//! or unavailable as a whole (see [`keymap`]).

use anyhow::Result;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

pub mod keymap;

pub use keymap::{KeymapError, load_keymap, parse_keymap};

pub const CONFIG_FILE_NAME: &str = "quill.toml";
pub const DEFAULT_KEYMAP_FILE: &str = "keymap.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    #[serde(default = "EditorConfig::default_locale")]
    pub locale: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            locale: Self::default_locale(),
        }
    }
}

impl EditorConfig {
    fn default_locale() -> String {
        "en-US".to_string()
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct KeymapConfig {
    /// Rule source file. Relative paths resolve against the config file's directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct PluginsConfig {
    /// Built-in plugin ids to start; `None` starts all of them.
    #[serde(default)]
    pub enabled: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Upper bound on deferred plugin operations applied per host event.
    #[serde(default = "DispatchConfig::default_deferred_budget")]
    pub deferred_budget: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            deferred_budget: Self::default_deferred_budget(),
        }
    }
}

impl DispatchConfig {
    const fn default_deferred_budget() -> usize {
        1024
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub keymap: KeymapConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,     // original file string (optional)
    pub source: Option<PathBuf>, // where `raw` came from
    pub file: ConfigFile,        // parsed (or default) data
    /// Command-line keymap path, relative to the working directory.
    pub keymap_override: Option<PathBuf>,
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("quill").join(CONFIG_FILE_NAME);
    }
    local
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                source: Some(path),
                file,
                keymap_override: None,
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    pub fn locale(&self) -> &str {
        &self.file.editor.locale
    }

    /// Resolved key-binding file: the command-line override, else the
    /// configured path (relative to the config file's directory), else
    /// `keymap.toml` beside the config file.
    pub fn keymap_path(&self) -> PathBuf {
        if let Some(p) = &self.keymap_override {
            return p.clone();
        }
        let base = self
            .source
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        match &self.file.keymap.path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => base.join(p),
            None => base.join(DEFAULT_KEYMAP_FILE),
        }
    }

    pub fn enabled_plugins(&self) -> Option<&[String]> {
        self.file.plugins.enabled.as_deref()
    }

    pub fn deferred_budget(&self) -> usize {
        self.file.dispatch.deferred_budget
    }

    /// Command-line overrides win over file values.
    pub fn apply_overrides(&mut self, locale: Option<String>, keymap: Option<PathBuf>) {
        if let Some(locale) = locale {
            self.file.editor.locale = locale;
        }
        if keymap.is_some() {
            self.keymap_override = keymap;
        }
    }
}
