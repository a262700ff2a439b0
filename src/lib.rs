//! wg-peers: WireGuard peer lifecycle management
//!
//! This crate manages WireGuard peer records that belong to named tunnels:
//! listing, enabling/disabling and deleting peers, with a guard that refuses
//! to touch the peers of a tunnel currently assigned to a network interface.
//!
//! # Architecture
//!
//! ```text
//! IPC / caller → Dispatcher → GuardPolicy → TunnelRegistry (read)
//!                    ↓                          ↓
//!               PeerStore (mutate)      AssignmentChecker
//!                    ↓
//!               StoreCommit (state file)
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use wg_peers::assignment::InterfaceAssignments;
//! use wg_peers::dispatch::{Dispatcher, PeerRequest};
//! use wg_peers::store::{ConfigStore, NoCommit, Peer, Tunnel};
//!
//! let mut store = ConfigStore::new();
//! store.tunnels.insert(Tunnel::new(0, "tun_wg0")).unwrap();
//! let peer = store.peers.insert(Peer::new("tun_wg0", "hG5pX0Wq3lC3e1Xy0m2XQ9yS9u6bVb3kQYfM1m7nS2o=")).unwrap();
//!
//! let assignments = Arc::new(InterfaceAssignments::new());
//! let dispatcher = Dispatcher::new(store.into_shared(), assignments.clone(), Arc::new(NoCommit));
//!
//! assert!(dispatcher.dispatch(PeerRequest::toggle(peer)).is_redirect());
//!
//! assignments.assign("opt1", "tun_wg0");
//! assert!(!dispatcher.dispatch(PeerRequest::delete(peer)).is_redirect());
//! ```
//!
//! # Modules
//!
//! - [`assignment`]: Interface assignment collaborator
//! - [`config`]: Daemon configuration types and loading
//! - [`dispatch`]: Peer action dispatcher
//! - [`error`]: Error types
//! - [`guard`]: Guard policy for peer mutations
//! - [`ipc`]: IPC server and protocol
//! - [`listing`]: Peer listing projection
//! - [`store`]: Tunnel registry, peer store and state file

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod assignment;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod ipc;
pub mod listing;
pub mod store;

// Re-export commonly used types at the crate root
pub use assignment::{AssignmentChecker, InterfaceAssignments};
pub use config::Config;
pub use dispatch::{DispatchError, DispatchOutcome, Dispatcher, PeerAction, PeerRequest};
pub use error::{ConfigError, IpcError, StateError, WgPeersError};
pub use guard::{GuardError, GuardPolicy};
pub use ipc::{IpcClient, IpcCommand, IpcHandler, IpcResponse, IpcServer};
pub use listing::{PeerListing, PeerRow};
pub use store::{ConfigStore, Peer, PeerIndex, PeerStore, StoreError, Tunnel, TunnelIndex, TunnelRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
