//! IPC (Inter-Process Communication) module
//!
//! This module provides a Unix socket-based IPC server for listing and
//! mutating peers at runtime.
//!
//! # Protocol
//!
//! Messages are length-prefixed JSON:
//! - 4 bytes: message length (big-endian u32)
//! - N bytes: JSON-encoded command or response
//!
//! # Example
//!
//! ```no_run
//! use wg_peers::ipc::{IpcClient, IpcCommand, IpcResponse};
//! use wg_peers::store::PeerIndex;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IpcClient::new("/var/run/wg-peers.sock");
//!
//! match client.send(IpcCommand::TogglePeer { peer: PeerIndex(3) }).await? {
//!     IpcResponse::Redirect { location } => println!("done, show {location}"),
//!     IpcResponse::Rejected { message, .. } => eprintln!("{message}"),
//!     other => eprintln!("unexpected: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

mod framing;
mod handler;
mod protocol;
mod server;

pub use framing::{read_frame, read_message, write_message};
pub use handler::IpcHandler;
pub use protocol::{
    decode_message, encode_message, ErrorCode, IpcCommand, IpcResponse, ResponseError,
    ServerStatus, TunnelInfo, LENGTH_PREFIX_SIZE, MAX_MESSAGE_SIZE,
};
pub use server::{IpcClient, IpcServer};
