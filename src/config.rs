//! Configuration management for macroreel

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::replay::RepeatCount;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Replay defaults
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Where timeline files live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Passes per `play` when none is given; 0 repeats until stopped
    #[serde(default = "default_repeat_count")]
    pub default_repeat_count: u32,

    /// Polling interval for target application detection (ms)
    #[serde(default = "default_gate_poll_interval")]
    pub gate_poll_interval_ms: u64,

    /// Only inject while this application (name or window title) is in front
    #[serde(default)]
    pub target_app: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory bare timeline names resolve into
    #[serde(default = "default_timelines_dir")]
    pub timelines_dir: PathBuf,
}

// Default value functions
fn default_repeat_count() -> u32 {
    1
}

fn default_gate_poll_interval() -> u64 {
    100
}

fn default_timelines_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("timelines"))
        .unwrap_or_else(|| std::env::temp_dir().join("macroreel-timelines"))
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "macroreel", "macroreel")
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            default_repeat_count: default_repeat_count(),
            gate_poll_interval_ms: default_gate_poll_interval(),
            target_app: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timelines_dir: default_timelines_dir(),
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = path.into();

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let mut config = Self::parse(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            config.config_path = Some(config_path);
            Ok(config)
        } else {
            let config = Config {
                config_path: Some(config_path),
                ..Config::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = project_dirs().context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    pub fn default_repeat(&self) -> RepeatCount {
        RepeatCount::from(self.replay.default_repeat_count)
    }

    pub fn gate_poll_interval(&self) -> Duration {
        Duration::from_millis(self.replay.gate_poll_interval_ms.max(1))
    }

    /// Resolve a timeline argument.
    ///
    /// Anything that looks like a path (has a directory or an extension) is
    /// used as-is; a bare name becomes `<timelines_dir>/<name>.json`.
    pub fn timeline_path(&self, name: &str) -> PathBuf {
        let candidate = Path::new(name);
        let has_dir = candidate
            .parent()
            .is_some_and(|parent| !parent.as_os_str().is_empty());

        if has_dir || candidate.extension().is_some() {
            candidate.to_path_buf()
        } else {
            self.storage.timelines_dir.join(format!("{}.json", name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.replay.default_repeat_count, 1);
        assert_eq!(config.default_repeat(), RepeatCount::ONCE);
        assert_eq!(config.gate_poll_interval(), Duration::from_millis(100));
        assert!(config.replay.target_app.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
            [replay]
            default_repeat_count = 0
            target_app = "notepad"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_repeat(), RepeatCount::Forever);
        assert_eq!(config.replay.target_app.as_deref(), Some("notepad"));
        assert_eq!(config.replay.gate_poll_interval_ms, 100);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_parse_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_timeline_path_resolution() {
        let mut config = Config::default();
        config.storage.timelines_dir = PathBuf::from("/data/timelines");

        assert_eq!(
            config.timeline_path("login"),
            PathBuf::from("/data/timelines/login.json")
        );
        assert_eq!(
            config.timeline_path("./login.json"),
            PathBuf::from("./login.json")
        );
        assert_eq!(
            config.timeline_path("login.msgpack"),
            PathBuf::from("login.msgpack")
        );
    }

    #[test]
    fn test_load_creates_default_file() {
        let path = std::env::temp_dir()
            .join("macroreel-tests")
            .join(uuid::Uuid::new_v4().to_string())
            .join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.replay, ReplayConfig::default());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
