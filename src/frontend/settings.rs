//! Remembered directories
//!
//! A small JSON file in the platform configuration directory
//! (`$XDG_CONFIG_HOME/bambu2prusa/settings.json`, `%APPDATA%\bambu2prusa\settings.json`,
//! `~/Library/Application Support/bambu2prusa/settings.json`).

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory name below the platform configuration directory
pub const APP_NAME: &str = "bambu2prusa";

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Keys of the settings store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Directory the last input file was picked from
    LastInputDir,
    /// Directory the last output file was written to
    LastOutputDir,
}

impl SettingKey {
    /// All keys, in file order
    pub const ALL: [SettingKey; 2] = [SettingKey::LastInputDir, SettingKey::LastOutputDir];

    /// Key as written in the JSON file
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::LastInputDir => "last_input_dir",
            SettingKey::LastOutputDir => "last_output_dir",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
struct Settings {
    last_input_dir: String,
    last_output_dir: String,
}

impl Settings {
    fn slot(&mut self, key: SettingKey) -> &mut String {
        match key {
            SettingKey::LastInputDir => &mut self.last_input_dir,
            SettingKey::LastOutputDir => &mut self.last_output_dir,
        }
    }

    /// Take the known keys from a JSON object, ignoring everything else
    fn from_object(object: &serde_json::Map<String, Value>) -> Self {
        let mut settings = Self::default();
        for key in SettingKey::ALL {
            let value = match object.get(key.as_str()) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            *settings.slot(key) = value;
        }
        settings
    }
}

/// Settings persisted to one JSON file
///
/// Every value defaults to an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Platform default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(SETTINGS_FILE))
    }

    /// Load the store from [`Self::default_path`]
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| Error::Settings("no configuration directory on this platform".to_string()))?;
        Ok(Self::load(path))
    }

    /// Load the store from `path`
    ///
    /// A missing file gives the defaults. A file that is not a JSON object is
    /// replaced with the defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            settings: Settings::default(),
        };

        let content = match fs::read_to_string(&store.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return store,
            Err(err) => {
                warn!(path = %store.path.display(), "failed to read settings: {}", err);
                return store;
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(object)) => store.settings = Settings::from_object(&object),
            Ok(_) | Err(_) => {
                warn!(path = %store.path.display(), "settings file is corrupt, restoring defaults");
                if let Err(err) = store.save() {
                    warn!("{}", err);
                }
            }
        }

        store
    }

    /// Path of the settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of `key`
    pub fn get(&self, key: SettingKey) -> &str {
        match key {
            SettingKey::LastInputDir => &self.settings.last_input_dir,
            SettingKey::LastOutputDir => &self.settings.last_output_dir,
        }
    }

    /// Change `key` in memory; call [`Self::save`] to persist it
    pub fn set(&mut self, key: SettingKey, value: impl Into<String>) {
        *self.settings.slot(key) = value.into();
    }

    /// Write the settings file, creating its directory if needed
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        fs::write(&self.path, json).map_err(|e| self.write_error(e))
    }

    fn write_error(&self, err: io::Error) -> Error {
        Error::Settings(format!("cannot write {}: {}", self.path.display(), err))
    }
}
