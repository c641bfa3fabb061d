//! Application settings persistence for Scriptdesk.
//!
//! Stores user preferences (workspace location, auto-save delay, the title given
//! to unnamed drafts) in a JSON file at an OS-appropriate location.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Workspace database opened at startup.
    pub workspace_path: String,
    /// Pause after the last edit before a note draft is saved.
    pub auto_save_delay_ms: u64,
    /// Title used when a quick-editor draft is filed without one.
    pub untitled_script_title: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            workspace_path: default_workspace_path().to_string_lossy().to_string(),
            auto_save_delay_ms: 2000,
            untitled_script_title: "Untitled Script".to_string(),
        }
    }
}

impl AppSettings {
    pub fn auto_save_delay(&self) -> Duration {
        Duration::from_millis(self.auto_save_delay_ms)
    }
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/scriptdesk/settings.json`
/// - Windows: `%APPDATA%/Scriptdesk/settings.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Scriptdesk").join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("scriptdesk").join("settings.json")
    }
}

/// Returns the default workspace file: `~/Documents/Scriptdesk/workspace.scriptdesk`.
pub fn default_workspace_path() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Documents")
        })
        .join("Scriptdesk")
        .join("workspace.scriptdesk")
}

/// Loads settings from the default location.
pub fn load_settings() -> AppSettings {
    load_settings_from(settings_file_path())
}

/// Loads settings from `path`; returns defaults if the file is missing or corrupt.
pub fn load_settings_from<P: AsRef<Path>>(path: P) -> AppSettings {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Ignoring corrupt settings file {}: {e}", path.display());
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    }
}

/// Saves settings to the default location.
pub fn save_settings(settings: &AppSettings) -> Result<()> {
    save_settings_to(settings_file_path(), settings)
}

/// Saves settings to `path`, creating parent directories as needed.
pub fn save_settings_to<P: AsRef<Path>>(path: P, settings: &AppSettings) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings_from(dir.path().join("nope.json"));
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.auto_save_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AppSettings {
            workspace_path: "/tmp/w.scriptdesk".to_string(),
            auto_save_delay_ms: 500,
            untitled_script_title: "Draft".to_string(),
        };
        save_settings_to(&path, &settings).unwrap();
        assert_eq!(load_settings_from(&path), settings);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("autoSaveDelayMs"));
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ broken").unwrap();
        assert_eq!(load_settings_from(&path), AppSettings::default());
    }

    #[test]
    fn test_partial_file_fills_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"autoSaveDelayMs": 750}"#).unwrap();
        let settings = load_settings_from(&path);
        assert_eq!(settings.auto_save_delay_ms, 750);
        assert_eq!(settings.untitled_script_title, "Untitled Script");
    }
}
