//! Preference store for wakepoint.
//!
//! Exactly two values persist across runs: the UI theme id and the alarm
//! sound profile. They live in a small TOML file
//! (`$XDG_CONFIG_HOME/wakepoint/wakepoint.toml`), are read once at startup,
//! written whenever the user changes one, and hot-reloaded while running via
//! the file watcher. A missing file or missing key falls back to defaults.

pub mod watcher;


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::alarm::SoundProfile;

pub use watcher::start_preference_watcher;

const CONFIG_FILE: &str = "wakepoint.toml";

/// Override for the configuration directory (tests, `--config`).
static CONFIG_DIR_OVERRIDE: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

/// Color theme identifier, consumed by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    Slate,
    Zinc,
    Neutral,
    Blue,
    Rose,
    Violet,
}

impl ThemeId {
    pub const ALL: [ThemeId; 6] = [
        ThemeId::Slate,
        ThemeId::Zinc,
        ThemeId::Neutral,
        ThemeId::Blue,
        ThemeId::Rose,
        ThemeId::Violet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeId::Slate => "slate",
            ThemeId::Zinc => "zinc",
            ThemeId::Neutral => "neutral",
            ThemeId::Blue => "blue",
            ThemeId::Rose => "rose",
            ThemeId::Violet => "violet",
        }
    }
}

impl Default for ThemeId {
    fn default() -> Self {
        ThemeId::Slate
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThemeId::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                format!(
                    "unknown theme '{s}' (expected one of: {})",
                    ThemeId::ALL.map(|t| t.as_str()).join(", ")
                )
            })
    }
}

/// The persisted preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Preferences {
    #[serde(default)]
    pub theme: ThemeId,
    #[serde(default)]
    pub sound: SoundProfile,
}

impl Preferences {
    /// Apply one `field = value` update from the `set` subcommand.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            "theme" => {
                self.theme = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            }
            "sound" => {
                self.sound = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            }
            other => anyhow::bail!("unknown preference '{other}' (expected theme or sound)"),
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        log_block_start!("Preferences");
        log_indented!("theme: {}", self.theme);
        log_indented!("sound: {}", self.sound);
    }
}

/// Redirect preference storage, primarily for tests.
pub fn set_config_dir(dir: Option<PathBuf>) {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.lock() {
        *guard = dir;
    }
}

/// Directory holding the preference file.
pub fn config_dir() -> PathBuf {
    if let Ok(guard) = CONFIG_DIR_OVERRIDE.lock()
        && let Some(dir) = guard.as_ref()
    {
        return dir.clone();
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wakepoint")
}

/// Full path of the preference file.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Load preferences, falling back to defaults when the file is absent.
///
/// A present-but-unreadable file is an error: silently replacing the user's
/// chosen alarm sound with the default is worse than failing loudly.
pub fn load() -> Result<Preferences> {
    let path = config_path();
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let preferences: Preferences =
        toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(preferences)
}

/// Persist preferences, creating the directory on first write.
pub fn store(preferences: &Preferences) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = config_path();
    let text =
        toml::to_string_pretty(preferences).context("failed to serialize preferences")?;
    std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
