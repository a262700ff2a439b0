//! Peer store
//!
//! The store applies no policy of its own. Callers that mutate peers on
//! behalf of a request go through the dispatcher, which runs the guard first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{PeerIndex, StoreError};

/// A WireGuard peer record nested under a tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Stable identity within the store
    pub index: PeerIndex,
    /// Name of the owning tunnel
    pub tunnel_name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Peer public key, opaque to this crate
    pub public_key: String,
    /// Addresses assigned to the peer inside the tunnel
    #[serde(default)]
    pub peer_addresses: Vec<String>,
    /// Networks routed to the peer
    #[serde(default)]
    pub allowed_ips: Vec<String>,
    /// Static endpoint host, empty if none
    #[serde(default)]
    pub endpoint: String,
    /// Static endpoint port
    #[serde(default)]
    pub port: Option<u16>,
    /// Whether the peer is enabled
    pub enabled: bool,
}

impl Peer {
    /// Create an enabled peer with no addresses or endpoint
    ///
    /// The index is a placeholder until the peer is inserted into a store.
    pub fn new(tunnel_name: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            index: PeerIndex(0),
            tunnel_name: tunnel_name.into(),
            description: String::new(),
            public_key: public_key.into(),
            peer_addresses: Vec::new(),
            allowed_ips: Vec::new(),
            endpoint: String::new(),
            port: None,
            enabled: true,
        }
    }

    /// Whether a static endpoint is configured
    pub fn has_endpoint(&self) -> bool {
        !self.endpoint.is_empty()
    }
}

/// Ordered collection of peer records keyed by stable index
#[derive(Debug, Clone, Default)]
pub struct PeerStore {
    peers: BTreeMap<PeerIndex, Peer>,
    next_index: u32,
}

impl PeerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose next allocated index is `next_index`
    pub fn with_next_index(next_index: u32) -> Self {
        Self {
            peers: BTreeMap::new(),
            next_index,
        }
    }

    /// Insert a new peer, allocating a fresh index
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IndexExhausted` once every index has been handed
    /// out. Indices are never reused, so the store cannot grow further.
    pub fn insert(&mut self, mut peer: Peer) -> Result<PeerIndex, StoreError> {
        let index = PeerIndex(self.next_index);
        let next = self
            .next_index
            .checked_add(1)
            .ok_or(StoreError::IndexExhausted)?;
        self.next_index = next;
        peer.index = index;
        self.peers.insert(index, peer);
        Ok(index)
    }

    /// Insert a peer at the index it already carries
    ///
    /// Used when loading persisted records and when rolling back a delete.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicatePeer` if the index is occupied, or
    /// `StoreError::IndexExhausted` if the index leaves no room for the
    /// allocation counter.
    pub fn insert_at(&mut self, peer: Peer) -> Result<(), StoreError> {
        let index = peer.index;
        if self.peers.contains_key(&index) {
            return Err(StoreError::DuplicatePeer { index });
        }
        let after = index.0.checked_add(1).ok_or(StoreError::IndexExhausted)?;
        self.next_index = self.next_index.max(after);
        self.peers.insert(index, peer);
        Ok(())
    }

    /// Enumerate peers in stable order
    pub fn list(&self) -> impl Iterator<Item = (PeerIndex, &Peer)> {
        self.peers.iter().map(|(index, peer)| (*index, peer))
    }

    /// Get a peer by index
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PeerNotFound` if the index is absent.
    pub fn get(&self, index: PeerIndex) -> Result<&Peer, StoreError> {
        self.peers.get(&index).ok_or(StoreError::PeerNotFound { index })
    }

    /// Set the enabled flag of a peer
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PeerNotFound` if the index is absent.
    pub fn set_enabled(&mut self, index: PeerIndex, value: bool) -> Result<(), StoreError> {
        let peer = self
            .peers
            .get_mut(&index)
            .ok_or(StoreError::PeerNotFound { index })?;
        peer.enabled = value;
        Ok(())
    }

    /// Remove a peer, returning the removed record
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PeerNotFound` if the index is absent.
    pub fn delete(&mut self, index: PeerIndex) -> Result<Peer, StoreError> {
        self.peers
            .remove(&index)
            .ok_or(StoreError::PeerNotFound { index })
    }

    /// Index the next inserted peer will receive
    pub const fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Number of peers
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
