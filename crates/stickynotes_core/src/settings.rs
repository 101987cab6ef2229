//! User settings stored outside the storage root.
//!
//! # Responsibility
//! - Provide defaults for every setting and merge user overrides on top.
//! - Persist only keys whose value differs from the defaults.
//! - Resolve the storage root from the `data_path` setting.
//!
//! # Invariants
//! - The settings file never lives under the storage root, so relocating
//!   notes never loses settings.
//! - An unreadable settings file yields defaults; it is not overwritten until
//!   the user saves.

use crate::storage::{write_atomic, StorageError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE_NAME: &str = "user_config.json";
/// Directory (under the app dir) where older builds kept the settings file.
const LEGACY_SETTINGS_DIR: &str = "data";
const DEFAULT_DATA_PATH: &str = "./data";

/// Every user-tunable setting with its default.
///
/// Unknown keys found in the file are kept in `extra` and written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub data_path: String,
    pub font_family: String,
    pub font_size: u32,
    pub theme: String,
    pub hotkey_show: String,
    pub hotkey_hide_all: String,
    pub hotkey_popout: String,
    pub hotkey_close_stickies: String,
    pub hotkey_delete: String,
    pub window_width: u32,
    pub window_height: u32,
    pub start_minimized: bool,
    pub auto_start: bool,
    pub minimize_to_tray: bool,
    pub editor_line_height: f64,
    /// Auto-save period in seconds.
    pub auto_save_interval: u64,
    pub show_save_reminder: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            data_path: DEFAULT_DATA_PATH.to_string(),
            font_family: "LXGW WenKai, Microsoft YaHei, Segoe UI, sans-serif".to_string(),
            font_size: 16,
            theme: "parchment".to_string(),
            hotkey_show: "Alt+Shift+S".to_string(),
            hotkey_hide_all: "Alt+Shift+H".to_string(),
            hotkey_popout: "Alt+Shift+P".to_string(),
            hotkey_close_stickies: "Alt+Shift+C".to_string(),
            hotkey_delete: "Delete".to_string(),
            window_width: 900,
            window_height: 650,
            start_minimized: false,
            auto_start: false,
            minimize_to_tray: true,
            editor_line_height: 1.6,
            auto_save_interval: 30,
            show_save_reminder: true,
            extra: Map::new(),
        }
    }
}

impl UserSettings {
    /// Absolute storage root: `data_path` as-is when absolute, else under `app_dir`.
    pub fn resolve_data_dir(&self, app_dir: &Path) -> PathBuf {
        let data_path = self.data_path.trim();
        let data_path = if data_path.is_empty() {
            DEFAULT_DATA_PATH
        } else {
            data_path
        };
        let path = Path::new(data_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            app_dir.join(path)
        }
    }

    /// Auto-save period; `0` means the default.
    pub fn auto_save_period(&self) -> Duration {
        if self.auto_save_interval == 0 {
            Duration::from_secs(Self::default().auto_save_interval)
        } else {
            Duration::from_secs(self.auto_save_interval)
        }
    }

    /// Keys whose values differ from the defaults.
    pub fn non_default_entries(&self) -> Result<Map<String, Value>, SettingsError> {
        let current = to_object(self)?;
        let defaults = to_object(&Self::default())?;
        Ok(current
            .into_iter()
            .filter(|(key, value)| defaults.get(key) != Some(value))
            .collect())
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Storage(StorageError),
    Invalid(serde_json::Error),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Invalid(err) => write!(f, "invalid settings: {err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Invalid(err) => Some(err),
        }
    }
}

impl From<StorageError> for SettingsError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Invalid(value)
    }
}

/// The settings file for one application directory.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    app_dir: PathBuf,
}

impl SettingsFile {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
        }
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    pub fn path(&self) -> PathBuf {
        self.app_dir.join(SETTINGS_FILE_NAME)
    }

    /// Loads defaults merged with the user's overrides.
    ///
    /// Copies a settings file from the legacy `data/` location first when the
    /// current location has none.
    pub fn load(&self) -> UserSettings {
        self.migrate_legacy();
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return UserSettings::default(),
            Err(err) => {
                warn!(
                    "event=settings_load module=settings status=error error_code=read_failed error={}",
                    err
                );
                return UserSettings::default();
            }
        };

        match serde_json::from_slice::<UserSettings>(&bytes) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(
                    "event=settings_load module=settings status=error error_code=parse_failed error={}",
                    err
                );
                UserSettings::default()
            }
        }
    }

    /// Writes the non-default subset of `settings`.
    pub fn save(&self, settings: &UserSettings) -> Result<(), SettingsError> {
        let entries = settings.non_default_entries()?;
        let bytes = serde_json::to_vec_pretty(&Value::Object(entries))?;
        fs::create_dir_all(&self.app_dir)
            .map_err(|err| StorageError::io(&self.app_dir, err))?;
        write_atomic(&self.path(), &bytes)?;
        info!(
            "event=settings_save module=settings status=ok bytes={}",
            bytes.len()
        );
        Ok(())
    }

    /// Merges `updates` over the current settings, saves, and returns the result.
    ///
    /// Type mismatches (e.g. a string for `font_size`) are rejected before
    /// anything is written.
    pub fn update(&self, updates: Map<String, Value>) -> Result<UserSettings, SettingsError> {
        let mut merged = to_object(&self.load())?;
        merged.extend(updates);
        let settings = serde_json::from_value::<UserSettings>(Value::Object(merged))?;
        self.save(&settings)?;
        Ok(settings)
    }

    /// Deletes the settings file and returns the defaults.
    pub fn reset(&self) -> Result<UserSettings, SettingsError> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(StorageError::io(path, err).into()),
        }
        Ok(UserSettings::default())
    }

    fn migrate_legacy(&self) {
        let path = self.path();
        let legacy = self
            .app_dir
            .join(LEGACY_SETTINGS_DIR)
            .join(SETTINGS_FILE_NAME);
        if path.exists() || !legacy.exists() {
            return;
        }
        match fs::copy(&legacy, &path) {
            Ok(_) => info!("event=settings_migrate module=settings status=ok"),
            Err(err) => warn!(
                "event=settings_migrate module=settings status=error error={}",
                err
            ),
        }
    }
}

fn to_object(settings: &UserSettings) -> Result<Map<String, Value>, SettingsError> {
    match serde_json::to_value(settings)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::{SettingsFile, UserSettings, SETTINGS_FILE_NAME};
    use serde_json::{json, Map, Value};
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn relative_data_path_resolves_under_app_dir() {
        let settings = UserSettings::default();
        assert_eq!(
            settings.resolve_data_dir(Path::new("/opt/app")),
            Path::new("/opt/app").join("./data")
        );

        let absolute = UserSettings {
            data_path: "/srv/notes".to_string(),
            ..UserSettings::default()
        };
        assert_eq!(
            absolute.resolve_data_dir(Path::new("/opt/app")),
            Path::new("/srv/notes")
        );
    }

    #[test]
    fn save_writes_only_non_default_keys() {
        let dir = TempDir::new().unwrap();
        let file = SettingsFile::new(dir.path());
        let settings = UserSettings {
            theme: "midnight".to_string(),
            ..UserSettings::default()
        };

        file.save(&settings).unwrap();

        let written: Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(SETTINGS_FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(written, json!({ "theme": "midnight" }));
        assert_eq!(file.load(), settings);
    }

    #[test]
    fn update_rejects_wrong_types_without_writing() {
        let dir = TempDir::new().unwrap();
        let file = SettingsFile::new(dir.path());
        let mut updates = Map::new();
        updates.insert("font_size".to_string(), json!("huge"));

        assert!(file.update(updates).is_err());
        assert!(!file.path().exists());
    }

    #[test]
    fn unknown_keys_survive_a_save() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE_NAME),
            br#"{ "custom_flag": true, "font_size": 18 }"#,
        )
        .unwrap();
        let file = SettingsFile::new(dir.path());

        let loaded = file.load();
        assert_eq!(loaded.font_size, 18);
        file.save(&loaded).unwrap();

        let written: Value =
            serde_json::from_slice(&std::fs::read(file.path()).unwrap()).unwrap();
        assert_eq!(written, json!({ "custom_flag": true, "font_size": 18 }));
    }

    #[test]
    fn corrupt_file_loads_defaults_and_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, b"{ broken").unwrap();

        assert_eq!(SettingsFile::new(dir.path()).load(), UserSettings::default());
        assert_eq!(std::fs::read(&path).unwrap(), b"{ broken");
    }

    #[test]
    fn legacy_location_is_migrated() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(
            dir.path().join("data").join(SETTINGS_FILE_NAME),
            br#"{ "theme": "ink" }"#,
        )
        .unwrap();

        let file = SettingsFile::new(dir.path());
        assert_eq!(file.load().theme, "ink");
        assert!(file.path().exists());
    }
}
