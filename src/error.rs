//! Error types for wg-peers
//!
//! This module defines the error hierarchy shared by the daemon, the IPC
//! layer and the state file loader. Domain errors for the store, guard and
//! dispatcher live next to their modules and are folded in here.

use std::io;

use thiserror::Error;

pub use crate::dispatch::DispatchError;
pub use crate::guard::GuardError;
pub use crate::store::StoreError;

/// Top-level error type for wg-peers
#[derive(Debug, Error)]
pub enum WgPeersError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tunnel/peer store lookups
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// State file loading and committing
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// IPC communication errors
    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl WgPeersError {
    /// Check if this error is recoverable (can retry operation)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Store(_) => false,
            Self::State(e) => e.is_recoverable(),
            Self::Ipc(e) => e.is_recoverable(),
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are not recoverable without user intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }
}

/// State file errors (tunnel and peer records on disk)
#[derive(Debug, Error)]
pub enum StateError {
    /// State file missing
    #[error("State file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse state file: {0}")]
    ParseError(String),

    /// A record failed validation while loading
    #[error("Invalid {record}: {reason}")]
    InvalidRecord { record: String, reason: String },

    /// Serialization failed while committing
    #[error("Failed to serialize state: {0}")]
    SerializeError(String),

    /// I/O error while reading or writing the state file
    #[error("State file I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl StateError {
    /// Check if this error is recoverable
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::FileNotFound { .. }
            | Self::ParseError(_)
            | Self::InvalidRecord { .. }
            | Self::SerializeError(_) => false,
            Self::IoError(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
        }
    }

    /// Create an invalid record error
    pub fn invalid(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

/// IPC communication errors
#[derive(Debug, Error)]
pub enum IpcError {
    /// Failed to create Unix socket
    #[error("Failed to create IPC socket at {path}: {reason}")]
    SocketCreation { path: String, reason: String },

    /// Failed to bind Unix socket
    #[error("Failed to bind IPC socket to {path}: {reason}")]
    BindError { path: String, reason: String },

    /// Connection error
    #[error("IPC connection error: {0}")]
    ConnectionError(String),

    /// Frame length exceeds the configured limit
    #[error("IPC frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    /// Protocol error (invalid message format)
    #[error("IPC protocol error: {0}")]
    ProtocolError(String),

    /// Serialization error
    #[error("IPC serialization error: {0}")]
    SerializationError(String),

    /// I/O error
    #[error("IPC I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl IpcError {
    /// Check if this error is recoverable
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::SocketCreation { .. }
            | Self::BindError { .. }
            | Self::FrameTooLarge { .. }
            | Self::SerializationError(_) => false,
            Self::ConnectionError(_) | Self::ProtocolError(_) => true,
            Self::IoError(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::BrokenPipe
            ),
        }
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}

/// Type alias for Result with `WgPeersError`
pub type Result<T> = std::result::Result<T, WgPeersError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_recovery_classification() {
        let config_err = ConfigError::ValidationError("test".into());
        assert!(!config_err.is_recoverable());

        let state_err = StateError::invalid("peer 3", "bad port");
        assert!(!state_err.is_recoverable());

        let ipc_err = IpcError::protocol("truncated frame");
        assert!(ipc_err.is_recoverable());

        let bind_err = IpcError::BindError {
            path: "/tmp/x.sock".into(),
            reason: "in use".into(),
        };
        assert!(!bind_err.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = StateError::invalid("tunnel 0", "name cannot be empty");
        let msg = err.to_string();
        assert!(msg.contains("tunnel 0"));
        assert!(msg.contains("name cannot be empty"));

        let err = StoreError::PeerNotFound { index: 7.into() };
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::TimedOut, "timeout");
        let err: WgPeersError = io_err.into();
        assert!(err.is_recoverable());

        let err: WgPeersError = StoreError::TunnelNotFound { name: "tun_wg9".into() }.into();
        assert!(!err.is_recoverable());
    }
}
