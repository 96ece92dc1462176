//! Settings persistence: window placement, menu flags, the active
//! filter mask/preset, and the active theme, serialized with
//! `serde`/`toml` to a platform config file resolved via
//! `directories::ProjectDirs`.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "scopewatch";
const APPLICATION: &str = "scopewatch";
const SETTINGS_FILE_NAME: &str = "settings.toml";

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("no platform config directory is available")]
    NoConfigDirectory,
    #[error("failed to read settings file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write settings file: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WindowPlacement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub maximized: bool,
}

impl Default for WindowPlacement {
    fn default() -> Self {
        WindowPlacement { x: 100, y: 100, width: 1024, height: 768, maximized: false }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MenuFlags {
    pub show_ids: bool,
    pub always_on_top: bool,
    #[serde(default)]
    pub toolbar: bool,
    #[serde(default)]
    pub line_numbers: bool,
    #[serde(default)]
    pub auto_scroll: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub window: WindowPlacement,
    pub menu: MenuFlags,
    pub filter_mask: u32,
    pub theme_id: String,
    pub user_theme_paths: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            window: WindowPlacement::default(),
            menu: MenuFlags::default(),
            filter_mask: scopewatch_core::FilterMask::ALL.bits(),
            theme_id: "light".to_string(),
            user_theme_paths: Vec::new(),
        }
    }
}

impl Settings {
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn settings_path() -> Result<PathBuf, SettingsError> {
        Self::config_dir().map(|dir| dir.join(SETTINGS_FILE_NAME)).ok_or(SettingsError::NoConfigDirectory)
    }

    /// Loads settings from the platform config path. Returns defaults,
    /// without error, if no settings file exists yet.
    pub fn load() -> Result<Self, SettingsError> {
        let path = Self::settings_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let contents = fs::read_to_string(path).map_err(SettingsError::Read)?;
        let settings = toml::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SettingsError::Write)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(SettingsError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut settings = Settings::default();
        settings.theme_id = "dark".to_string();
        settings.window.width = 1280;
        settings.menu.show_ids = true;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn corrupt_file_is_reported_not_silently_defaulted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "not valid toml [[[").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Parse(_))));
    }
}
