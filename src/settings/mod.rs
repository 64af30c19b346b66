//! User settings and the key-value store behind them.
//!
//! Values are loaded once at startup and written back immediately whenever the
//! user changes them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::naming::{missing_placeholders, DEFAULT_TEMPLATE};
use crate::domain::AppError;

pub const FILENAME_TEMPLATE_KEY: &str = "FILENAME_TEMPLATE";
pub const RENAME_FILES_KEY: &str = "RENAME_FILES";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Template is missing placeholders: {}", .0.join(", "))]
    MissingPlaceholders(Vec<&'static str>),

    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<SettingsError> for AppError {
    fn from(e: SettingsError) -> Self {
        AppError::Settings(e.to_string())
    }
}

/// String-keyed persistence with defaults on read.
pub trait KeyValueStore: Send {
    fn get_string(&self, key: &str, default: &str) -> String;
    fn get_bool(&self, key: &str, default: bool) -> bool;
    fn set_string(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;
    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), SettingsError>;
}

/// In-memory store, nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        string_or(self.values.get(key), default)
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        bool_or(self.values.get(key), default)
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), Value::from(value));
        Ok(())
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), Value::from(value));
        Ok(())
    }
}

/// A flat JSON object on disk, rewritten in full on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: serde_json::Map<String, Value>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file yet, using defaults");
                serde_json::Map::new()
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value);

        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content).map_err(io_err)?;

        debug!(key, path = %self.path.display(), "Persisted setting");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        string_or(self.values.get(key), default)
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        bool_or(self.values.get(key), default)
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.write(key, Value::from(value))
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.write(key, Value::from(value))
    }
}

fn string_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

fn bool_or(value: Option<&Value>, default: bool) -> bool {
    value.and_then(Value::as_bool).unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub filename_template: String,
    pub rename_files: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filename_template: DEFAULT_TEMPLATE.to_string(),
            rename_files: true,
        }
    }
}

impl Settings {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            filename_template: store.get_string(FILENAME_TEMPLATE_KEY, DEFAULT_TEMPLATE),
            rename_files: store.get_bool(RENAME_FILES_KEY, true),
        }
    }

    /// Accept `candidate` only if it carries all placeholders, then persist it.
    /// On rejection the current template is left untouched.
    pub fn update_template(
        &mut self,
        store: &mut dyn KeyValueStore,
        candidate: &str,
    ) -> Result<(), SettingsError> {
        let missing = missing_placeholders(candidate);
        if !missing.is_empty() {
            return Err(SettingsError::MissingPlaceholders(missing));
        }

        store.set_string(FILENAME_TEMPLATE_KEY, candidate)?;
        self.filename_template = candidate.to_string();
        info!(template = candidate, "Filename template updated");
        Ok(())
    }

    /// Flip renaming, persist, and return the new value.
    pub fn toggle_rename(&mut self, store: &mut dyn KeyValueStore) -> Result<bool, SettingsError> {
        let next = !self.rename_files;
        store.set_bool(RENAME_FILES_KEY, next)?;
        self.rename_files = next;
        info!(rename_files = next, "Renaming toggled");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_store() {
        let store = MemoryStore::default();
        assert_eq!(Settings::load(&store), Settings::default());
        assert_eq!(Settings::default().filename_template, "YYYY.MM.DD_ART_BETREFF");
        assert!(Settings::default().rename_files);
    }

    #[test]
    fn test_rejects_incomplete_template() {
        let mut store = MemoryStore::default();
        let mut settings = Settings::load(&store);

        let err = settings.update_template(&mut store, "YYYY.MM.DD").unwrap_err();
        match err {
            SettingsError::MissingPlaceholders(missing) => {
                assert_eq!(missing, vec!["ART", "BETREFF"])
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(settings.filename_template, DEFAULT_TEMPLATE);
        assert_eq!(
            store.get_string(FILENAME_TEMPLATE_KEY, "unset"),
            "unset".to_string()
        );
    }

    #[test]
    fn test_settings_error_becomes_app_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppError::from(SettingsError::Io {
            path: dir.path().join("settings.json"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });

        match err {
            AppError::Settings(message) => assert!(message.contains("settings.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_accepts_and_persists_template() {
        let mut store = MemoryStore::default();
        let mut settings = Settings::load(&store);

        settings
            .update_template(&mut store, "ART - BETREFF (DD.MM.YYYY)")
            .unwrap();
        assert_eq!(settings.filename_template, "ART - BETREFF (DD.MM.YYYY)");
        assert_eq!(Settings::load(&store), settings);
    }

    #[test]
    fn test_toggle_rename_persists() {
        let mut store = MemoryStore::default();
        let mut settings = Settings::load(&store);

        assert!(!settings.toggle_rename(&mut store).unwrap());
        assert!(!store.get_bool(RENAME_FILES_KEY, true));
        assert!(settings.toggle_rename(&mut store).unwrap());
        assert!(store.get_bool(RENAME_FILES_KEY, false));
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        let mut settings = Settings::load(&store);
        settings
            .update_template(&mut store, "DD_MM_YYYY_ART_BETREFF")
            .unwrap();
        settings.toggle_rename(&mut store).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        let loaded = Settings::load(&reopened);
        assert_eq!(loaded.filename_template, "DD_MM_YYYY_ART_BETREFF");
        assert!(!loaded.rename_files);
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(SettingsError::Parse(_))
        ));
    }
}
