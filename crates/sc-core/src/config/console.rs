//! Console configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_secs, option_duration_secs};
use crate::error::ConfigError;

/// Monitor address queried for the console socket when none is configured
pub const DEFAULT_MONITOR_ADDRESS: &str = "http://localhost:8090";

/// Port the guest debug console listens on by convention
pub const DEFAULT_DEBUG_CONSOLE_PORT: u32 = 1026;

/// Upper bound on connecting to the console socket
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(3);

/// On-disk layout: settings live under a `[console]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub console: ConsoleConfig,
}

/// Settings for attaching to a sandbox debug console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the monitor that answers `/agent-url` lookups
    pub monitor_address: String,

    /// Guest port of the debug console.
    ///
    /// Always replaces the port returned by discovery, which is the guest
    /// agent's default port rather than the console's.
    pub debug_port: u32,

    /// Timeout for dialing the console socket
    #[serde(with = "duration_secs")]
    pub dial_timeout: Duration,

    /// Optional overall timeout for the discovery request
    #[serde(with = "option_duration_secs", skip_serializing_if = "Option::is_none")]
    pub discovery_timeout: Option<Duration>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            monitor_address: DEFAULT_MONITOR_ADDRESS.to_string(),
            debug_port: DEFAULT_DEBUG_CONSOLE_PORT,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            discovery_timeout: None,
        }
    }
}

impl ConsoleConfig {
    /// Apply command-line overrides.
    ///
    /// An empty address or a zero port counts as "not given", matching how
    /// the flags behave when left unset.
    pub fn with_overrides(mut self, monitor_address: Option<&str>, debug_port: Option<u32>) -> Self {
        if let Some(addr) = monitor_address.filter(|a| !a.is_empty()) {
            self.monitor_address = addr.to_string();
        }
        if let Some(port) = debug_port.filter(|p| *p != 0) {
            self.debug_port = port;
        }
        self
    }

    /// Reject settings that can never produce a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor_address.trim().is_empty() {
            return Err(ConfigError::Invalid("monitor_address is empty".into()));
        }
        if self.debug_port == 0 {
            return Err(ConfigError::Invalid("debug_port must be non-zero".into()));
        }
        if self.dial_timeout.is_zero() {
            return Err(ConfigError::Invalid("dial_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.monitor_address, "http://localhost:8090");
        assert_eq!(config.debug_port, 1026);
        assert_eq!(config.dial_timeout, Duration::from_secs(3));
        assert!(config.discovery_timeout.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides_ignore_unset_values() {
        let config = ConsoleConfig::default().with_overrides(Some(""), Some(0));
        assert_eq!(config.monitor_address, DEFAULT_MONITOR_ADDRESS);
        assert_eq!(config.debug_port, DEFAULT_DEBUG_CONSOLE_PORT);

        let config =
            ConsoleConfig::default().with_overrides(Some("http://10.0.0.2:9000"), Some(2000));
        assert_eq!(config.monitor_address, "http://10.0.0.2:9000");
        assert_eq!(config.debug_port, 2000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file: ConfigFile = toml::from_str("[console]\ndebug_port = 4000\n").unwrap();
        assert_eq!(file.console.debug_port, 4000);
        assert_eq!(file.console.monitor_address, DEFAULT_MONITOR_ADDRESS);
        assert_eq!(file.console.dial_timeout, DEFAULT_DIAL_TIMEOUT);
    }

    #[test]
    fn test_discovery_timeout_from_toml() {
        let file: ConfigFile = toml::from_str("[console]\ndiscovery_timeout = 10\n").unwrap();
        assert_eq!(file.console.discovery_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ConsoleConfig {
            dial_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_blank_address() {
        let config = ConsoleConfig {
            monitor_address: "  ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
