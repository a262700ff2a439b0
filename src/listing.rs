//! Peer listing projection
//!
//! Read-only view of the peer store handed to whatever renders it. An empty
//! store is reported as [`PeerListing::Empty`] so the renderer can show
//! guidance instead of an empty table.

use serde::{Deserialize, Serialize};

use crate::store::{Peer, PeerIndex, PeerStore};

/// Number of public key characters shown in a listing row
pub const KEY_DISPLAY_CHARS: usize = 12;

/// Marker appended to the truncated public key
pub const KEY_ELLIPSIS: &str = "...";

/// Peer listing handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeerListing {
    /// No peers are configured
    Empty,
    /// One row per peer, in store order
    Rows {
        /// Listing rows
        rows: Vec<PeerRow>,
    },
}

impl PeerListing {
    /// Build the listing for a peer store
    pub fn from_store(peers: &PeerStore) -> Self {
        if peers.is_empty() {
            return Self::Empty;
        }
        Self::Rows {
            rows: peers.list().map(|(_, peer)| PeerRow::from_peer(peer)).collect(),
        }
    }

    /// Whether this is the empty signal
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Rows, empty for the empty signal
    pub fn rows(&self) -> &[PeerRow] {
        match self {
            Self::Empty => &[],
            Self::Rows { rows } => rows,
        }
    }
}

/// Enabled state as shown in a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerStatus {
    Enabled,
    Disabled,
}

impl From<bool> for PeerStatus {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

/// Action affordances for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowActions {
    /// Edit link target
    pub edit: PeerIndex,
    /// Toggle target
    pub toggle: PeerIndex,
    /// True when toggling would enable the peer
    pub toggle_enables: bool,
    /// Delete target
    pub delete: PeerIndex,
}

/// One peer as displayed in the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRow {
    pub index: PeerIndex,
    pub tunnel: String,
    pub description: String,
    /// Truncated public key, see [`truncate_key`]
    pub public_key: String,
    /// First peer address, if any
    pub peer_address: Option<String>,
    /// First allowed IP entry, if any
    pub allowed_ips: Option<String>,
    pub endpoint: String,
    pub port: Option<u16>,
    pub status: PeerStatus,
    pub actions: RowActions,
}

impl PeerRow {
    /// Project a peer record into a row
    pub fn from_peer(peer: &Peer) -> Self {
        Self {
            index: peer.index,
            tunnel: peer.tunnel_name.clone(),
            description: peer.description.clone(),
            public_key: truncate_key(&peer.public_key),
            peer_address: peer.peer_addresses.first().cloned(),
            allowed_ips: peer.allowed_ips.first().cloned(),
            endpoint: peer.endpoint.clone(),
            port: peer.port,
            status: peer.enabled.into(),
            actions: RowActions {
                edit: peer.index,
                toggle: peer.index,
                toggle_enables: !peer.enabled,
                delete: peer.index,
            },
        }
    }
}

/// Display form of a public key: the first 12 characters followed by `...`
///
/// The marker is appended even when the key is shorter than 12 characters.
///
/// # Examples
///
/// ```
/// use wg_peers::listing::truncate_key;
///
/// assert_eq!(
///     truncate_key("hG5pX0Wq3lC3e1Xy0m2XQ9yS9u6bVb3kQYfM1m7nS2o="),
///     "hG5pX0Wq3lC3..."
/// );
/// assert_eq!(truncate_key("short"), "short...");
/// ```
pub fn truncate_key(key: &str) -> String {
    let mut display: String = key.chars().take(KEY_DISPLAY_CHARS).collect();
    display.push_str(KEY_ELLIPSIS);
    display
}
