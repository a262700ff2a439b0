//! IPC Protocol definitions
//!
//! This module defines the command and response types used for
//! inter-process communication via Unix socket.

use serde::{Deserialize, Serialize};

use crate::config::InterfaceAssignment;
use crate::dispatch::DispatchError;
use crate::listing::PeerListing;
use crate::store::{Peer, PeerIndex, Tunnel, TunnelIndex};

/// IPC command types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcCommand {
    /// Ping to check if the server is alive
    Ping,

    /// Get server status
    Status,

    /// Get the peer listing
    ListPeers,

    /// Get a single peer record
    GetPeer {
        /// Peer index
        peer: PeerIndex,
    },

    /// List tunnels with their assignment state
    ListTunnels,

    /// Get a single tunnel
    GetTunnel {
        /// Tunnel index
        tunnel: TunnelIndex,
    },

    /// Toggle a peer's enabled flag
    TogglePeer {
        /// Peer index
        peer: PeerIndex,
    },

    /// Delete a peer
    DeletePeer {
        /// Peer index
        peer: PeerIndex,
    },

    /// Raw action form: an action token plus an optional peer index
    ///
    /// Unknown or missing tokens return the listing without changes.
    PeerAction {
        /// Action token ("toggle" or "delete")
        #[serde(default)]
        act: Option<String>,
        /// Peer index
        #[serde(default)]
        peer: Option<u32>,
    },

    /// Bind an interface to a device
    AssignInterface {
        /// Interface name
        name: String,
        /// Device name
        device: String,
    },

    /// Release an interface
    ReleaseInterface {
        /// Interface name
        name: String,
    },

    /// Reload tunnels and peers from the state file
    ReloadState,

    /// Stop the daemon
    Shutdown,
}

/// IPC response types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcResponse {
    /// Ping response
    Pong,

    /// Status response
    Status(ServerStatus),

    /// Peer listing
    PeerListing {
        /// Listing rows or the empty signal
        listing: PeerListing,
    },

    /// Single peer record
    Peer(Peer),

    /// Tunnel list
    TunnelList {
        /// Tunnels in index order
        tunnels: Vec<TunnelInfo>,
    },

    /// Single tunnel
    Tunnel(TunnelInfo),

    /// The action was applied; the client should show the given view
    Redirect {
        /// View to show
        location: String,
    },

    /// The action was refused; nothing changed
    Rejected {
        /// Error code
        code: ErrorCode,
        /// User-facing message
        message: String,
        /// Unmodified listing
        listing: PeerListing,
    },

    /// Success response (for commands that don't return data)
    Success {
        /// Optional message
        message: Option<String>,
    },

    /// Error response
    Error(ResponseError),
}

impl IpcResponse {
    /// Create a success response with no message
    pub fn success() -> Self {
        Self::Success { message: None }
    }

    /// Create a success response with a message
    pub fn success_with_message(msg: impl Into<String>) -> Self {
        Self::Success {
            message: Some(msg.into()),
        }
    }

    /// Create an error response
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ResponseError {
            code,
            message: message.into(),
        })
    }

    /// Create a rejection carrying the unmodified listing
    pub fn rejected(err: &DispatchError, listing: PeerListing) -> Self {
        Self::Rejected {
            code: ErrorCode::from(err),
            message: err.to_string(),
            listing,
        }
    }

    /// Check if this is an error or rejection response
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Rejected { .. })
    }
}

/// Server status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Server version
    pub version: String,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Number of tunnels
    pub tunnel_count: usize,
    /// Number of peers
    pub peer_count: usize,
    /// Current interface assignments
    pub interfaces: Vec<InterfaceAssignment>,
    /// State file path, if persisted
    pub state_path: Option<String>,
}

/// Tunnel with its assignment state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelInfo {
    pub index: TunnelIndex,
    pub name: String,
    pub enabled: bool,
    /// Whether the tunnel is bound to an interface
    pub assigned: bool,
}

impl TunnelInfo {
    /// Combine a tunnel record with its assignment state
    pub fn new(tunnel: &Tunnel, assigned: bool) -> Self {
        Self {
            index: tunnel.index,
            name: tunnel.name.clone(),
            enabled: tunnel.enabled,
            assigned,
        }
    }
}

/// IPC error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    /// Error code
    pub code: ErrorCode,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ResponseError {}

/// Error codes for IPC responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,
    /// Owning tunnel is assigned to an interface
    TunnelInUse,
    /// Peer references a missing tunnel
    IntegrityError,
    /// Invalid command
    InvalidCommand,
    /// Invalid parameters
    InvalidParameters,
    /// Operation failed
    OperationFailed,
    /// Internal error
    InternalError,
}

impl From<&DispatchError> for ErrorCode {
    fn from(err: &DispatchError) -> Self {
        match err {
            DispatchError::NotFound { .. } => Self::NotFound,
            DispatchError::TunnelInUse { .. } => Self::TunnelInUse,
            DispatchError::Integrity { .. } => Self::IntegrityError,
            DispatchError::Commit { .. } => Self::OperationFailed,
        }
    }
}

/// Message framing for IPC
///
/// Messages are length-prefixed:
/// - 4 bytes: message length (big-endian u32)
/// - N bytes: JSON message
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024; // 1 MB
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Encode a message with length prefix
///
/// # Errors
///
/// Returns `serde_json::Error` if the message cannot be serialized.
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    let json = serde_json::to_vec(msg)?;
    let len = u32::try_from(json.len())
        .map_err(<serde_json::Error as serde::ser::Error>::custom)?;

    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&json);

    Ok(buf)
}

/// Decode a message body (without its length prefix)
///
/// # Errors
///
/// Returns `serde_json::Error` if the body is not a valid message.
pub fn decode_message<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(data)
}
