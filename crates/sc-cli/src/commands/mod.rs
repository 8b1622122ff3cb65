//! CLI command implementations

mod config;
mod exec;
mod resolve;

pub use config::{config_init, config_path, config_show};
pub use exec::exec_command;
pub use resolve::resolve_command;

use std::path::Path;

use anyhow::{Context, Result};
use sc_core::config::{self as core_config, ConsoleConfig};

/// Build the effective console configuration.
///
/// Flags and their environment variables win over the config file, which
/// wins over built-in defaults.
pub fn console_config(
    config_path: Option<&Path>,
    monitor_addr: Option<&str>,
    debug_port: Option<u32>,
) -> Result<ConsoleConfig> {
    let file = core_config::load_or_default(config_path).with_context(|| match config_path {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load default config".to_string(),
    })?;

    Ok(file.console.with_overrides(monitor_addr, debug_port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_core::config::{ConfigFile, DEFAULT_DEBUG_CONSOLE_PORT};

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = ConfigFile::default();
        file.console.monitor_address = "http://10.0.0.1:8090".to_string();
        file.console.debug_port = 2000;
        core_config::save_config(&path, &file).unwrap();

        let from_file = console_config(Some(&path), None, None).unwrap();
        assert_eq!(from_file.monitor_address, "http://10.0.0.1:8090");
        assert_eq!(from_file.debug_port, 2000);

        let overridden =
            console_config(Some(&path), Some("http://127.0.0.1:9000"), Some(3000)).unwrap();
        assert_eq!(overridden.monitor_address, "http://127.0.0.1:9000");
        assert_eq!(overridden.debug_port, 3000);
    }

    #[test]
    fn test_zero_port_keeps_configured_port() {
        let config = console_config(
            Some(&tempfile::tempdir().unwrap().path().join("missing.toml")),
            None,
            Some(0),
        );
        // An explicit path must exist
        assert!(config.is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        core_config::save_config(&path, &ConfigFile::default()).unwrap();
        let config = console_config(Some(&path), None, Some(0)).unwrap();
        assert_eq!(config.debug_port, DEFAULT_DEBUG_CONSOLE_PORT);
    }
}
