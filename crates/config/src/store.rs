//! Preference persistence
//!
//! The chosen quality tier survives across sessions. Storage is abstracted
//! behind [`PreferenceStore`] so the browser build can back it with
//! `localStorage` while native builds use a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::capabilities::Capabilities;
use crate::error::ConfigError;
use crate::quality::{QualityLevel, QualitySettings};

/// Key under which the quality tier is stored
pub const QUALITY_PREFERENCE_KEY: &str = "qualityLevel";

/// Durable string key/value storage
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
}

/// In-process store; nothing survives the process
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, one entry per key
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// Store backed by an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/holoavatar/preferences.json`
    pub fn in_config_dir() -> Result<Self, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(dir.join("holoavatar").join("preferences.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(ConfigError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());

        let io_err = |source: std::io::Error| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&values)?;
        fs::write(&self.path, json).map_err(io_err)
    }
}

/// Reads and writes the user's quality tier.
///
/// First run yields `medium`; the device recommendation is offered through
/// [`QualityStore::recommend`] but never applied on its own, so users are not
/// silently downgraded.
#[derive(Debug)]
pub struct QualityStore<S: PreferenceStore> {
    store: S,
}

impl<S: PreferenceStore> QualityStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persisted tier, or `medium` when nothing (valid) is stored
    pub fn current(&self) -> QualityLevel {
        match self.store.get(QUALITY_PREFERENCE_KEY) {
            Ok(Some(raw)) => match raw.parse() {
                Ok(level) => {
                    debug!("Using saved quality: {}", level);
                    level
                }
                Err(e) => {
                    warn!("Ignoring stored quality preference: {}", e);
                    QualityLevel::default()
                }
            },
            Ok(None) => {
                debug!("No saved quality, using {}", QualityLevel::default());
                QualityLevel::default()
            }
            Err(e) => {
                warn!("Failed to read quality preference: {}", e);
                QualityLevel::default()
            }
        }
    }

    /// Settings for the current tier
    pub fn current_settings(&self) -> QualitySettings {
        self.current().settings()
    }

    /// Persist a tier for future sessions
    pub fn save(&mut self, level: QualityLevel) -> Result<(), ConfigError> {
        self.store.set(QUALITY_PREFERENCE_KEY, level.as_str())?;
        info!("Quality saved: {}", level);
        Ok(())
    }

    /// Device-based suggestion; does not touch storage
    pub fn recommend(&self, caps: &Capabilities) -> QualityLevel {
        QualityLevel::recommend(caps)
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_run_defaults_to_medium() {
        let store = QualityStore::new(MemoryPreferenceStore::new());
        assert_eq!(store.current(), QualityLevel::Medium);
    }

    #[test]
    fn test_first_run_ignores_recommendation() {
        let store = QualityStore::new(MemoryPreferenceStore::new());
        let weak_device = Capabilities {
            is_mobile: true,
            is_low_end: true,
            pixel_ratio: 1.0,
            cores: 2,
            memory_hint_gb: 2.0,
        };
        assert_eq!(store.recommend(&weak_device), QualityLevel::UltraLow);
        assert_eq!(store.current(), QualityLevel::Medium);
    }

    #[test]
    fn test_save_then_read_back() {
        let mut store = QualityStore::new(MemoryPreferenceStore::new());
        store.save(QualityLevel::Ultra).unwrap();
        assert_eq!(store.current(), QualityLevel::Ultra);
        assert_eq!(
            store.into_inner().get(QUALITY_PREFERENCE_KEY).unwrap().as_deref(),
            Some("ultra")
        );
    }

    #[test]
    fn test_garbage_preference_falls_back() {
        let mut raw = MemoryPreferenceStore::new();
        raw.set(QUALITY_PREFERENCE_KEY, "potato").unwrap();
        let store = QualityStore::new(raw);
        assert_eq!(store.current(), QualityLevel::Medium);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let mut store = QualityStore::new(FilePreferenceStore::new(&path));
        assert_eq!(store.current(), QualityLevel::Medium);
        store.save(QualityLevel::Low).unwrap();

        let reopened = QualityStore::new(FilePreferenceStore::new(&path));
        assert_eq!(reopened.current(), QualityLevel::Low);
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FilePreferenceStore::new(dir.path().join("prefs.json"));
        store.set("theme", "dark").unwrap();
        store.set(QUALITY_PREFERENCE_KEY, "high").unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(store.get(QUALITY_PREFERENCE_KEY).unwrap().as_deref(), Some("high"));
    }

    #[test]
    fn test_corrupt_file_reads_as_error_but_current_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ not json").unwrap();

        let raw = FilePreferenceStore::new(&path);
        assert!(matches!(raw.get(QUALITY_PREFERENCE_KEY), Err(ConfigError::Json(_))));
        assert_eq!(QualityStore::new(raw).current(), QualityLevel::Medium);
    }
}
