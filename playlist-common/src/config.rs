//! Configuration file discovery and data folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the data folder
pub const DATA_FOLDER_ENV: &str = "PLAYLIST_DATA_FOLDER";

/// File name of the SQLite database inside the data folder
pub const DATABASE_FILE_NAME: &str = "playlist.db";

/// Data folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Value from an already loaded TOML config, then the `data_folder` key
///    of the platform config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config_value: Option<&Path>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        debug!("Data folder from command line: {}", path.display());
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        debug!("Data folder from {}: {}", env_var_name, path);
        return PathBuf::from(path);
    }

    if let Some(path) = config_value {
        debug!("Data folder from config: {}", path.display());
        return path.to_path_buf();
    }

    if let Some(path) = data_folder_from_config_file() {
        debug!("Data folder from config file: {}", path.display());
        return path;
    }

    default_data_folder()
}

fn data_folder_from_config_file() -> Option<PathBuf> {
    let config_path = locate_config_file().ok()?;
    let toml_content = std::fs::read_to_string(config_path).ok()?;
    let config = toml::from_str::<toml::Value>(&toml_content).ok()?;
    config
        .get("data_folder")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

/// Find the platform configuration file
///
/// Linux checks `~/.config/playlist/config.toml` and then
/// `/etc/playlist/config.toml`; other platforms only the user config dir.
pub fn locate_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("playlist").join("config.toml"));

    if let Some(path) = user_config.as_ref().filter(|p| p.exists()) {
        return Ok(path.clone());
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/playlist/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    match user_config {
        Some(path) => Err(Error::Config(format!("Config file not found: {:?}", path))),
        None => Err(Error::Config("Could not determine config directory".to_string())),
    }
}

/// Get OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("playlist"))
        .unwrap_or_else(|| PathBuf::from("./playlist_data"))
}

/// Default database location inside a data folder
pub fn database_path_in(data_folder: &Path) -> PathBuf {
    data_folder.join(DATABASE_FILE_NAME)
}
