//! Tunnel and peer records
//!
//! This module owns the in-memory configuration store: the tunnel registry,
//! the peer store, and the state file that backs them.
//!
//! # Submodules
//!
//! - [`tunnel`]: `TunnelRegistry`, lookup by index and by name
//! - [`peer`]: `PeerStore`, enumerate/get/toggle/delete with stable indices
//! - [`state`]: JSON state file loading and committing
//! - [`validation`]: record validation applied when loading state
//!
//! # Identity
//!
//! Peer indices are allocated from a monotonically increasing counter and are
//! never reused after deletion. Enumeration order is ascending index order,
//! which is also insertion order.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub mod peer;
pub mod state;
pub mod tunnel;
pub mod validation;

pub use peer::{Peer, PeerStore};
pub use state::{load_state, load_state_str, save_state, JsonStateFile, NoCommit, StoreCommit};
pub use tunnel::{Tunnel, TunnelRegistry};
pub use validation::ValidationError;

/// Stable identity of a tunnel record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TunnelIndex(pub u32);

/// Stable identity of a peer record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIndex(pub u32);

impl fmt::Display for TunnelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PeerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PeerIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<u32> for TunnelIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Lookup errors for tunnel and peer records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No peer at this index
    #[error("Peer not found: {index}")]
    PeerNotFound { index: PeerIndex },

    /// No tunnel with this name
    #[error("Tunnel not found: {name}")]
    TunnelNotFound { name: String },

    /// No tunnel at this index
    #[error("Tunnel index not found: {index}")]
    TunnelIndexNotFound { index: TunnelIndex },

    /// Tunnel name or index already taken
    #[error("Tunnel already exists: {name}")]
    DuplicateTunnel { name: String },

    /// Peer index already taken
    #[error("Peer index already in use: {index}")]
    DuplicatePeer { index: PeerIndex },

    /// No peer index is left to allocate
    #[error("Peer index space exhausted")]
    IndexExhausted,
}

impl StoreError {
    /// True for the plain "does not exist" lookups
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PeerNotFound { .. } | Self::TunnelNotFound { .. } | Self::TunnelIndexNotFound { .. }
        )
    }
}

/// Tunnel registry and peer store, mutated together under one lock
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    /// Tunnel records
    pub tunnels: TunnelRegistry,
    /// Peer records
    pub peers: PeerStore,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the store for sharing between the dispatcher and IPC handler
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }
}

/// Process-wide handle to the configuration store
///
/// Holders serialize the whole resolve → guard → mutate → commit chain on
/// this lock.
pub type SharedStore = Arc<Mutex<ConfigStore>>;
