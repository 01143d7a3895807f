//! Configuration management for playlist-player
//!
//! Bootstrap settings come from a small TOML file; everything has a
//! built-in default, so a missing file is not an error.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--port, --database, --data-folder)
//! 2. Environment variables (PLAYLIST_DATA_FOLDER, PLAYLIST_PORT, ...)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::error::{Error, Result};
use crate::playback::PlaybackTiming;
use playlist_common::config::{database_path_in, locate_config_file, resolve_data_folder, DATA_FOLDER_ENV};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file; defaults to `<data folder>/playlist.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Folder holding the database when `database_path` is not set
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            data_folder: None,
            port: default_port(),
            logging: LoggingConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Playback clock configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Length of one playback second in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Ticks to wait for a worker to take a control signal
    #[serde(default = "default_command_timeout_ticks")]
    pub command_timeout_ticks: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            command_timeout_ticks: default_command_timeout_ticks(),
        }
    }
}

impl PlaybackConfig {
    /// Validated clock parameters
    pub fn timing(&self) -> Result<PlaybackTiming> {
        if self.tick_ms == 0 {
            return Err(Error::Config("playback.tick_ms must be > 0".to_string()));
        }
        if self.command_timeout_ticks == 0 {
            return Err(Error::Config(
                "playback.command_timeout_ticks must be > 0".to_string(),
            ));
        }
        Ok(PlaybackTiming::new(
            Duration::from_millis(self.tick_ms),
            self.command_timeout_ticks,
        ))
    }
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_command_timeout_ticks() -> u32 {
    10
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Read a TOML file; a missing file yields the defaults
    pub async fn read(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(toml_str) => {
                info!("Loaded TOML configuration from {:?}", path);
                Self::parse(&toml_str)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {:?} not found, using built-in defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "Failed to read config file {:?}: {}",
                path, e
            ))),
        }
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub data_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file path
    pub database_path: PathBuf,

    /// HTTP server port
    pub port: u16,

    /// Default tracing filter level
    pub log_level: String,

    /// Playback clock
    pub timing: PlaybackTiming,
}

impl Config {
    /// Load configuration from TOML (explicit path, else the platform config
    /// file if present) and apply command-line overrides
    pub async fn load(toml_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match toml_path {
            Some(path) => TomlConfig::read(path).await?,
            None => match locate_config_file() {
                Ok(path) => TomlConfig::read(&path).await?,
                Err(_) => TomlConfig::default(),
            },
        };

        Self::from_parts(toml_config, overrides)
    }

    /// Merge a parsed TOML config with overrides
    pub fn from_parts(toml_config: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        let timing = toml_config.playback.timing()?;

        let database_path = match overrides.database_path.or(toml_config.database_path) {
            Some(path) => path,
            None => {
                let data_folder = resolve_data_folder(
                    overrides.data_folder.as_deref(),
                    DATA_FOLDER_ENV,
                    toml_config.data_folder.as_deref(),
                );
                database_path_in(&data_folder)
            }
        };

        Ok(Config {
            database_path,
            port: overrides.port.unwrap_or(toml_config.port),
            log_level: overrides.log_level.unwrap_or(toml_config.logging.level),
            timing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 5730);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.playback.tick_ms, 1000);
        assert_eq!(config.playback.command_timeout_ticks, 10);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = TomlConfig::parse(
            r#"
            database_path = "/var/lib/playlist/test.db"

            [playback]
            tick_ms = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/var/lib/playlist/test.db")));
        assert_eq!(config.port, 5730);
        assert_eq!(config.playback.tick_ms, 50);
        assert_eq!(config.playback.command_timeout_ticks, 10);
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(matches!(TomlConfig::parse("port = \"abc\""), Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides_win() {
        let toml_config = TomlConfig::parse("port = 6000\ndatabase_path = \"/a.db\"").unwrap();
        let overrides = ConfigOverrides {
            database_path: Some(PathBuf::from("/b.db")),
            port: Some(7000),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        let config = Config::from_parts(toml_config, overrides).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/b.db"));
        assert_eq!(config.port, 7000);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.timing, PlaybackTiming::default());
    }

    #[test]
    fn test_data_folder_override_sets_database_location() {
        let overrides = ConfigOverrides {
            data_folder: Some(PathBuf::from("/srv/playlist")),
            ..Default::default()
        };

        let config = Config::from_parts(TomlConfig::default(), overrides).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/srv/playlist/playlist.db"));
    }

    #[test]
    fn test_zero_tick_rejected() {
        let toml_config = TomlConfig::parse("[playback]\ntick_ms = 0").unwrap();
        assert!(matches!(
            Config::from_parts(toml_config, ConfigOverrides::default()),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TomlConfig::read(&dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config.port, 5730);
    }
}
