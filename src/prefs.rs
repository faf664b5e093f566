//! Local preference persistence.
//!
//! Holds the configured server base URL across restarts: read once at
//! startup, written on every user-initiated change. A missing or corrupt
//! file falls back to the default URL and is never fatal.

use crate::config::DEFAULT_SERVER_URL;
use crate::error::{LlmError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesData {
    server_url: String,
}

impl Default for PreferencesData {
    fn default() -> Self {
        PreferencesData {
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Preferences {
    path: PathBuf,
    data: PreferencesData,
}

impl Preferences {
    /// Load from the platform preferences directory.
    pub fn load_default() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "llmlink")
            .ok_or_else(|| LlmError::Config("no home directory available".into()))?;
        let path = dirs.preference_dir().join(PREFERENCES_FILE);
        Ok(Self::load_from(path))
    }

    /// Load from an explicit path (injected in tests).
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = Self::read_file(&path).unwrap_or_else(|| {
            log::debug!("No usable preferences at {}, using defaults", path.display());
            PreferencesData::default()
        });
        Preferences { path, data }
    }

    fn read_file(path: &Path) -> Option<PreferencesData> {
        let contents = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(data) => Some(data),
            Err(e) => {
                log::warn!("Ignoring corrupt preferences file: {}", e);
                None
            }
        }
    }

    pub fn server_url(&self) -> &str {
        &self.data.server_url
    }

    pub fn set_server_url(&mut self, url: impl Into<String>) -> Result<()> {
        self.data.server_url = url.into();
        self.write()
    }

    fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_default_url() {
        let dir = tempdir().unwrap();
        let prefs = Preferences::load_from(dir.path().join("preferences.json"));
        assert_eq!(prefs.server_url(), DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let mut prefs = Preferences::load_from(&path);
        prefs.set_server_url("http://10.0.0.7:5000").unwrap();

        let reloaded = Preferences::load_from(&path);
        assert_eq!(reloaded.server_url(), "http://10.0.0.7:5000");
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{not valid json").unwrap();

        let prefs = Preferences::load_from(&path);
        assert_eq!(prefs.server_url(), DEFAULT_SERVER_URL);
    }
}
