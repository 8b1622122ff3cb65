//! Configuration management for sandbox-console

mod console;
pub mod serde_utils;

pub use console::{
    ConsoleConfig, ConfigFile, DEFAULT_DEBUG_CONSOLE_PORT, DEFAULT_DIAL_TIMEOUT,
    DEFAULT_MONITOR_ADDRESS,
};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "sandbox-console";
const CONFIG_FILE: &str = "config.toml";

/// Directory holding `config.toml`.
///
/// Uses the platform config directory (`$XDG_CONFIG_HOME` or `~/.config` on
/// Linux), falling back to the working directory when neither is known.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Full path of the default config file
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE)
}

/// Read and deserialize a TOML config file.
///
/// # Arguments
/// * `path` - File to read
///
/// # Errors
/// [`ConfigError::NotFound`] if the file does not exist, [`ConfigError::Io`]
/// if it cannot be read, [`ConfigError::Parse`] if it is not valid TOML for `T`.
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    Ok(toml::from_str(&content)?)
}

/// Serialize `config` as TOML and write it to `path`.
///
/// Missing parent directories are created. The file is written next to its
/// destination and renamed into place, so a reader never sees half a file.
///
/// # Example
///
/// ```no_run
/// use sc_core::config::{default_config_path, save_config, ConfigFile};
///
/// save_config(&default_config_path(), &ConfigFile::default()).unwrap();
/// ```
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;
    let io_err = |p: &Path| {
        let p = p.to_path_buf();
        move |source| ConfigError::Io { path: p, source }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let staging = path.with_extension("toml.tmp");
    std::fs::write(&staging, content).map_err(io_err(&staging))?;
    std::fs::rename(&staging, path).map_err(io_err(path))?;

    tracing::debug!("Wrote config to {:?}", path);
    Ok(())
}

/// Load the config file at `path`, or the default location when `path` is `None`.
///
/// A missing default file yields the built-in defaults; a missing explicit
/// file is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                load_config(&default_path)
            } else {
                tracing::debug!("No config at {:?}, using defaults", default_path);
                Ok(ConfigFile::default())
            }
        }
    }
}
