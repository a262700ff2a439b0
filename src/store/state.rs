//! State file loading and committing
//!
//! The state file is the durable form of the tunnel registry and peer store.
//! Its layout follows the WireGuard package configuration:
//!
//! ```json
//! {
//!   "tunnels": [{ "index": 0, "name": "tun_wg0", "enabled": "yes" }],
//!   "peers": [{
//!     "index": 3, "tun": "tun_wg0", "descr": "laptop",
//!     "publickey": "...",
//!     "peeraddresses": { "item": ["10.6.0.3/32"] },
//!     "allowedips": { "item": ["10.6.0.3/32"] },
//!     "endpoint": "", "port": "", "enabled": "no"
//!   }],
//!   "next_peer_index": 4
//! }
//! ```
//!
//! Flags are `"yes"`/anything-else strings on disk and booleans in memory;
//! the conversion happens only in this module. A peer naming a tunnel that
//! does not exist is loaded as-is and surfaces later as an integrity error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::peer::{Peer, PeerStore};
use super::tunnel::{Tunnel, TunnelRegistry};
use super::validation::{
    parse_port, validate_description, validate_endpoint_host, validate_tunnel_name,
    ValidationError,
};
use super::{ConfigStore, PeerIndex, TunnelIndex};
use crate::error::StateError;

const FLAG_YES: &str = "yes";
const FLAG_NO: &str = "no";

/// Persistence hook run by the dispatcher after every successful mutation
pub trait StoreCommit: Send + Sync {
    /// Persist the store
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the store could not be written. The caller
    /// rolls back the in-memory mutation in that case.
    fn commit(&self, store: &ConfigStore) -> Result<(), StateError>;
}

/// Commit hook that keeps state in memory only
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCommit;

impl StoreCommit for NoCommit {
    fn commit(&self, _store: &ConfigStore) -> Result<(), StateError> {
        Ok(())
    }
}

/// Commit hook backed by a JSON state file
#[derive(Debug, Clone)]
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    /// Create a hook for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store from the state file
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the file is missing, malformed or invalid.
    pub fn load(&self) -> Result<ConfigStore, StateError> {
        load_state(&self.path)
    }
}

impl StoreCommit for JsonStateFile {
    fn commit(&self, store: &ConfigStore) -> Result<(), StateError> {
        save_state(&self.path, store)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    tunnels: Vec<TunnelRecord>,
    #[serde(default)]
    peers: Vec<PeerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_peer_index: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TunnelRecord {
    index: u32,
    name: String,
    #[serde(default = "default_flag")]
    enabled: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PeerRecord {
    index: u32,
    tun: String,
    #[serde(default)]
    descr: String,
    #[serde(default)]
    publickey: String,
    #[serde(default)]
    peeraddresses: ItemList,
    #[serde(default)]
    allowedips: ItemList,
    #[serde(default)]
    endpoint: String,
    #[serde(default)]
    port: String,
    #[serde(default = "default_flag")]
    enabled: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ItemList {
    #[serde(default)]
    item: Vec<String>,
}

fn default_flag() -> String {
    FLAG_YES.into()
}

fn flag_to_bool(flag: &str) -> bool {
    flag == FLAG_YES
}

fn bool_to_flag(value: bool) -> String {
    let flag = if value { FLAG_YES } else { FLAG_NO };
    flag.into()
}

impl TunnelRecord {
    fn into_tunnel(self) -> Result<Tunnel, StateError> {
        validate_tunnel_name(&self.name)
            .map_err(|e| StateError::invalid(format!("tunnel {}", self.index), e.to_string()))?;

        Ok(Tunnel {
            index: TunnelIndex(self.index),
            name: self.name,
            enabled: flag_to_bool(&self.enabled),
        })
    }

    fn from_tunnel(tunnel: &Tunnel) -> Self {
        Self {
            index: tunnel.index.0,
            name: tunnel.name.clone(),
            enabled: bool_to_flag(tunnel.enabled),
        }
    }
}

impl PeerRecord {
    fn into_peer(self) -> Result<Peer, StateError> {
        let record = format!("peer {}", self.index);
        let invalid = |e: ValidationError| StateError::invalid(record.clone(), e.to_string());

        validate_description(&self.descr).map_err(invalid)?;
        validate_endpoint_host(&self.endpoint).map_err(invalid)?;
        let port = parse_port(&self.port).map_err(invalid)?;

        Ok(Peer {
            index: PeerIndex(self.index),
            tunnel_name: self.tun,
            description: self.descr,
            public_key: self.publickey,
            peer_addresses: self.peeraddresses.item,
            allowed_ips: self.allowedips.item,
            endpoint: self.endpoint,
            port,
            enabled: flag_to_bool(&self.enabled),
        })
    }

    fn from_peer(peer: &Peer) -> Self {
        Self {
            index: peer.index.0,
            tun: peer.tunnel_name.clone(),
            descr: peer.description.clone(),
            publickey: peer.public_key.clone(),
            peeraddresses: ItemList {
                item: peer.peer_addresses.clone(),
            },
            allowedips: ItemList {
                item: peer.allowed_ips.clone(),
            },
            endpoint: peer.endpoint.clone(),
            port: peer.port.map(|p| p.to_string()).unwrap_or_default(),
            enabled: bool_to_flag(peer.enabled),
        }
    }
}

impl StateFile {
    fn into_store(self) -> Result<ConfigStore, StateError> {
        let mut tunnels = TunnelRegistry::new();
        for record in self.tunnels {
            let tunnel = record.into_tunnel()?;
            tunnels
                .insert(tunnel)
                .map_err(|e| StateError::invalid("tunnel list", e.to_string()))?;
        }

        let mut peers = PeerStore::with_next_index(self.next_peer_index.unwrap_or(0));
        for record in self.peers {
            let peer = record.into_peer()?;
            peers
                .insert_at(peer)
                .map_err(|e| StateError::invalid("peer list", e.to_string()))?;
        }

        Ok(ConfigStore { tunnels, peers })
    }

    fn from_store(store: &ConfigStore) -> Self {
        Self {
            tunnels: store.tunnels.iter().map(TunnelRecord::from_tunnel).collect(),
            peers: store
                .peers
                .list()
                .map(|(_, peer)| PeerRecord::from_peer(peer))
                .collect(),
            next_peer_index: Some(store.peers.next_index()),
        }
    }
}

/// Load the store from a JSON state file
///
/// # Errors
///
/// Returns `StateError` if the file cannot be read, parsed or validated.
pub fn load_state(path: impl AsRef<Path>) -> Result<ConfigStore, StateError> {
    let path = path.as_ref();

    debug!("Loading state from {:?}", path);

    if !path.exists() {
        return Err(StateError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    let store = load_state_str(&contents)?;

    info!(
        tunnels = store.tunnels.len(),
        peers = store.peers.len(),
        "State loaded from {:?}",
        path
    );

    Ok(store)
}

/// Load the store from a JSON string
///
/// # Errors
///
/// Returns `StateError` if parsing or validation fails.
pub fn load_state_str(json: &str) -> Result<ConfigStore, StateError> {
    let file: StateFile =
        serde_json::from_str(json).map_err(|e| StateError::ParseError(e.to_string()))?;
    file.into_store()
}

/// Serialize the store to its state file JSON form
///
/// # Errors
///
/// Returns `StateError::SerializeError` if serialization fails.
pub fn to_state_json(store: &ConfigStore) -> Result<String, StateError> {
    serde_json::to_string_pretty(&StateFile::from_store(store))
        .map_err(|e| StateError::SerializeError(e.to_string()))
}

/// Write the store to a JSON state file
///
/// The file is written next to its destination and renamed into place.
///
/// # Errors
///
/// Returns `StateError` if serialization or any file operation fails.
pub fn save_state(path: impl AsRef<Path>, store: &ConfigStore) -> Result<(), StateError> {
    let path = path.as_ref();
    let json = to_state_json(store)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;

    debug!(peers = store.peers.len(), "State committed to {:?}", path);
    Ok(())
}
