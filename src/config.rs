use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::client::{
    AnalysisClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::error::{FindexError, Result};

/// Default index filename, as written by the native indexer.
const DB_FILE: &str = "file_index.db";
/// Config filename.
const CONFIG_FILE: &str = "findex.toml";
/// Environment variable that overrides `analysis.api_key`.
pub const API_KEY_ENV: &str = "FINDEX_API_KEY";

/// Application configuration resolved from the application root.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the indexer runs in and relative paths resolve against.
    pub app_root: PathBuf,
    /// Path to the `SQLite` index.
    pub db_path: PathBuf,
    /// Path to the config file.
    pub config_path: PathBuf,
    /// User settings loaded from findex.toml.
    pub settings: UserSettings,
}

/// User-configurable settings from findex.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub index: IndexSettings,
    pub indexer: IndexerSettings,
    pub monitor: MonitorSettings,
    pub analysis: AnalysisSettings,
}

/// Where the index lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Index file, relative to the application root unless absolute.
    pub file: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            file: DB_FILE.into(),
        }
    }
}

/// The native indexer launched once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSettings {
    pub enabled: bool,
    /// Executable, relative to the application root unless absolute.
    pub program: String,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_program("bin/main"),
        }
    }
}

/// The native filesystem monitor started after the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub enabled: bool,
    /// Executable, relative to the application root unless absolute.
    pub program: String,
    /// Directory tree the monitor watches.
    pub root: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_program("bin/file_monitor"),
            root: default_watch_root(),
        }
    }
}

/// Remote analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            model: DEFAULT_MODEL.into(),
            api_key: String::new(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

fn default_program(stem: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", stem.replace('/', "\\"))
    } else {
        stem.to_string()
    }
}

fn default_watch_root() -> String {
    let root = if cfg!(windows) { "D:\\" } else { "/" };
    root.to_string()
}

impl Config {
    /// Create config for a given application root.
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        let app_root = app_root.into();
        let config_path = app_root.join(CONFIG_FILE);

        let settings = Self::load_settings(&config_path).unwrap_or_default();
        let db_path = app_root.join(&settings.index.file);

        Self {
            app_root,
            db_path,
            config_path,
            settings,
        }
    }

    /// Create config from the current working directory.
    pub fn from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| FindexError::Config(format!("cannot get cwd: {e}")))?;
        Ok(Self::new(cwd))
    }

    /// Load settings from findex.toml if it exists and parses.
    fn load_settings(config_path: &Path) -> Option<UserSettings> {
        if !config_path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(config_path).ok()?;
        match toml::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "ignoring invalid config");
                None
            }
        }
    }

    /// Save current settings to findex.toml.
    pub fn save_settings(&self) -> Result<()> {
        std::fs::create_dir_all(&self.app_root)?;
        let content = toml::to_string_pretty(&self.settings)
            .map_err(|e| FindexError::Config(format!("failed to serialize settings: {e}")))?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Check whether the index database exists.
    #[must_use]
    pub fn index_exists(&self) -> bool {
        self.db_path.exists()
    }

    #[must_use]
    pub fn indexer_program(&self) -> PathBuf {
        self.app_root.join(&self.settings.indexer.program)
    }

    #[must_use]
    pub fn monitor_program(&self) -> PathBuf {
        self.app_root.join(&self.settings.monitor.program)
    }

    /// Analysis client settings, with the API key taken from
    /// `FINDEX_API_KEY` when that is set.
    #[must_use]
    pub fn analysis_client_config(&self) -> AnalysisClientConfig {
        let analysis = &self.settings.analysis;
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| analysis.api_key.clone());
        AnalysisClientConfig {
            endpoint: analysis.endpoint.clone(),
            model: analysis.model.clone(),
            api_key,
            connect_timeout: Duration::from_secs(analysis.connect_timeout_secs),
            request_timeout: Duration::from_secs(analysis.request_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_new_sets_paths() {
        let cfg = Config::new("/tmp/app");
        assert_eq!(cfg.app_root, PathBuf::from("/tmp/app"));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/app/file_index.db"));
        assert_eq!(cfg.config_path, PathBuf::from("/tmp/app/findex.toml"));
    }

    #[test]
    fn index_exists_returns_false_when_missing() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::new(tmp.path());
        assert!(!cfg.index_exists());
    }

    #[test]
    fn default_settings() {
        let settings = UserSettings::default();
        assert_eq!(settings.index.file, "file_index.db");
        assert!(settings.indexer.enabled);
        assert!(settings.monitor.enabled);
        assert_eq!(settings.analysis.model, "deepseek-chat");
        assert_eq!(settings.analysis.connect_timeout_secs, 5);
        assert_eq!(settings.analysis.request_timeout_secs, 10);
        assert!(settings.analysis.api_key.is_empty());
    }

    #[test]
    fn save_and_load_settings() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = Config::new(tmp.path());

        cfg.settings.index.file = "data/idx.db".into();
        cfg.settings.monitor.root = "/srv".into();
        cfg.settings.analysis.request_timeout_secs = 30;
        cfg.save_settings().unwrap();
        assert!(cfg.config_path.exists());

        let cfg2 = Config::new(tmp.path());
        assert_eq!(cfg2.settings, cfg.settings);
        assert_eq!(cfg2.db_path, tmp.path().join("data/idx.db"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("findex.toml"),
            "[analysis]\nmodel = \"other-model\"\n",
        )
        .unwrap();
        let cfg = Config::new(tmp.path());
        assert_eq!(cfg.settings.analysis.model, "other-model");
        assert_eq!(cfg.settings.analysis.connect_timeout_secs, 5);
        assert!(cfg.settings.indexer.enabled);
    }

    #[test]
    fn load_invalid_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("findex.toml"), "invalid toml {{{{").unwrap();
        let cfg = Config::new(tmp.path());
        assert_eq!(cfg.settings, UserSettings::default());
    }

    #[test]
    fn client_config_uses_named_timeouts() {
        let mut cfg = Config::new("/tmp/app");
        cfg.settings.analysis.connect_timeout_secs = 2;
        cfg.settings.analysis.request_timeout_secs = 7;
        let client = cfg.analysis_client_config();
        assert_eq!(client.connect_timeout, Duration::from_secs(2));
        assert_eq!(client.request_timeout, Duration::from_secs(7));
        assert_eq!(client.endpoint, DEFAULT_ENDPOINT);
    }
}
