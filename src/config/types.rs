//! Configuration types for wg-peers
//!
//! This module defines the daemon configuration structures. Configuration
//! is loaded from a JSON file and validated at startup.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Path of the WireGuard state file (tunnels and peers)
    pub state_path: PathBuf,

    /// IPC configuration
    #[serde(default)]
    pub ipc: IpcConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Interface assignments known at startup
    #[serde(default)]
    pub interfaces: Vec<InterfaceAssignment>,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "state_path cannot be empty".into(),
            ));
        }

        let mut names: HashSet<&str> = HashSet::new();
        for assignment in &self.interfaces {
            assignment.validate()?;
            if !names.insert(&assignment.name) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate interface assignment: {}",
                    assignment.name
                )));
            }
        }

        self.ipc.validate()?;
        self.log.validate()?;

        Ok(())
    }

    /// Create a minimal default configuration
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            state_path: PathBuf::from("/var/db/wg-peers/wireguard.json"),
            ipc: IpcConfig::default(),
            log: LogConfig::default(),
            interfaces: Vec::new(),
        }
    }
}

/// An interface bound to a tunnel device
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InterfaceAssignment {
    /// Interface name (e.g., "opt1")
    pub name: String,
    /// Device the interface is bound to; a tunnel name when assigned to a tunnel
    pub device: String,
}

impl InterfaceAssignment {
    /// Validate an interface assignment
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() || self.device.is_empty() {
            return Err(ConfigError::ValidationError(
                "Interface assignment requires both name and device".into(),
            ));
        }
        Ok(())
    }
}

/// IPC server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IpcConfig {
    /// Path to Unix socket
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Socket file mode (octal, e.g., 0o660)
    #[serde(default = "default_socket_mode")]
    pub socket_mode: u32,

    /// Enable IPC server
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl IpcConfig {
    /// Validate IPC configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "IPC socket path cannot be empty when IPC is enabled".into(),
            ));
        }

        if self.max_message_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_message_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            socket_mode: default_socket_mode(),
            enabled: true,
            max_message_size: default_max_message_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include target (module path)
    #[serde(default = "default_true")]
    pub target: bool,
}

impl LogConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown log format '{other}', expected 'json' or 'text'"
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/var/run/wg-peers.sock")
}

const fn default_socket_mode() -> u32 {
    0o660
}

const fn default_max_message_size() -> usize {
    1024 * 1024
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}
