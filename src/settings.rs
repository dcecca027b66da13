//! Persisted summarizer settings.
//!
//! One namespaced record in a sled tree, written whole on every save so
//! concurrent writers can race without leaving a partial record behind.
//! Last write wins. The API key can be overridden from the environment so
//! it never has to live on disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key of the single settings record
const SETTINGS_KEY: &str = "mailbrief/settings";

/// Environment override for the provider API key
const API_KEY_ENV: &str = "MAILBRIEF_API_KEY";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("database error: {0}")]
    DbError(#[from] sled::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("no data directory available")]
    NoDataDir,
}

/// How the model call leaves the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Straight to the provider endpoint with the stored API key
    Direct,
    /// Through a user-supplied intermediary that holds the credentials
    #[default]
    Proxy,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Direct => write!(f, "direct"),
            Mode::Proxy => write!(f, "proxy"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Mode::Direct),
            "proxy" => Ok(Mode::Proxy),
            other => Err(format!("unknown mode: {} (expected direct or proxy)", other)),
        }
    }
}

/// Operating settings for the summarize pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub proxy_url: Option<String>,
}

/// The settings record as stored, with its write timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSettings {
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    settings: Settings,
}

/// Sled-backed store holding the settings record.
pub struct SettingsStore {
    db: sled::Db,
}

impl SettingsStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open the store at the default location under the user data dir
    pub fn open_default() -> Result<Self, SettingsError> {
        Self::open(Self::default_path()?)
    }

    /// Default store location (`<data_dir>/mailbrief/settings`)
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let base = dirs::data_dir().ok_or(SettingsError::NoDataDir)?;
        Ok(base.join("mailbrief").join("settings"))
    }

    /// Load the settings record, defaults when none has been written yet.
    ///
    /// An API key in the environment overrides the stored one.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        let mut settings = self.load_stored()?;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            settings.api_key = Some(key);
        }
        Ok(settings)
    }

    /// Load the record as persisted, without environment overrides.
    ///
    /// Editing flows start from here so an environment key never gets
    /// written back to disk.
    pub fn load_stored(&self) -> Result<Settings, SettingsError> {
        match self.db.get(SETTINGS_KEY.as_bytes())? {
            Some(data) => Ok(serde_json::from_slice::<StoredSettings>(&data)?.settings),
            None => Ok(Settings::default()),
        }
    }

    /// Persist the whole record in one write
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let stored = StoredSettings {
            updated_at: Utc::now(),
            settings: settings.clone(),
        };
        let value = serde_json::to_vec(&stored)?;
        self.db.insert(SETTINGS_KEY.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings")).unwrap();
        (dir, store)
    }

    #[test]
    fn load_without_record_yields_defaults() {
        let (_dir, store) = open_temp();
        let settings = store.load().unwrap();
        assert_eq!(settings.mode, Mode::Proxy);
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.proxy_url, None);
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = open_temp();
        let settings = Settings {
            mode: Mode::Direct,
            api_key: Some("k".into()),
            api_endpoint: Some("https://llm.example.com/v1".into()),
            proxy_url: None,
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn last_write_wins() {
        let (_dir, store) = open_temp();
        let mut settings = Settings::default();
        settings.proxy_url = Some("https://first.example.com".into());
        store.save(&settings).unwrap();
        settings.proxy_url = Some("https://second.example.com".into());
        store.save(&settings).unwrap();
        assert_eq!(
            store.load().unwrap().proxy_url.as_deref(),
            Some("https://second.example.com")
        );
    }
}
