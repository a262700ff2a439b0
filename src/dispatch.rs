//! Peer action dispatcher
//!
//! Turns an inbound `(action, peer)` request into at most one peer store
//! mutation. Every mutation runs the same chain under the store lock:
//!
//! ```text
//! get(peer) → guard.check_mutable → mutate → commit
//! ```
//!
//! A failed commit rolls the mutation back, so a request either changes
//! exactly one record or changes nothing.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::assignment::AssignmentChecker;
use crate::guard::{GuardError, GuardPolicy};
use crate::listing::PeerListing;
use crate::store::{ConfigStore, Peer, PeerIndex, SharedStore, StoreCommit};

/// Redirect target after a successful mutation
pub const TUNNELS_VIEW: &str = "/wg/tunnels";

/// Requested peer action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerAction {
    /// Flip the enabled flag
    Toggle,
    /// Remove the peer
    Delete,
    /// Plain listing
    None,
}

impl PeerAction {
    /// Parse a raw action token; unknown or missing tokens mean `None`
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            Some("toggle") => Self::Toggle,
            Some("delete") => Self::Delete,
            _ => Self::None,
        }
    }

    /// Token form of the action
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Delete => "delete",
            Self::None => "none",
        }
    }

    /// Whether the action mutates the store
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for PeerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound peer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRequest {
    pub action: PeerAction,
    pub peer: Option<PeerIndex>,
}

impl PeerRequest {
    /// Toggle request for a peer
    pub const fn toggle(peer: PeerIndex) -> Self {
        Self {
            action: PeerAction::Toggle,
            peer: Some(peer),
        }
    }

    /// Delete request for a peer
    pub const fn delete(peer: PeerIndex) -> Self {
        Self {
            action: PeerAction::Delete,
            peer: Some(peer),
        }
    }

    /// Plain listing request
    pub const fn listing() -> Self {
        Self {
            action: PeerAction::None,
            peer: None,
        }
    }

    /// Build a request from raw `act` and `peer` parameters
    pub fn from_params(act: Option<&str>, peer: Option<u32>) -> Self {
        Self {
            action: PeerAction::from_token(act),
            peer: peer.map(PeerIndex),
        }
    }
}

/// Why a peer action was not applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The peer does not exist
    #[error("Peer {peer} not found")]
    NotFound { peer: PeerIndex },

    /// The owning tunnel is assigned to an interface
    #[error("Cannot {action} a peer while its tunnel is assigned as an interface.")]
    TunnelInUse { action: PeerAction, tunnel: String },

    /// The peer references a tunnel that does not exist
    #[error("Peer {peer} references tunnel '{tunnel}' which does not exist")]
    Integrity { peer: PeerIndex, tunnel: String },

    /// Persisting the change failed; the change was rolled back
    #[error("Failed to save configuration: {reason}")]
    Commit { reason: String },
}

impl DispatchError {
    fn from_guard(action: PeerAction, err: GuardError) -> Self {
        match err {
            GuardError::Integrity { peer, tunnel } => Self::Integrity { peer, tunnel },
            GuardError::TunnelInUse { tunnel } => Self::TunnelInUse { action, tunnel },
        }
    }

    /// Expected user-facing denial rather than a system fault
    pub const fn is_denial(&self) -> bool {
        matches!(self, Self::TunnelInUse { .. })
    }
}

/// Result of dispatching a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The mutation was applied; show the tunnel listing
    Redirect { location: &'static str },
    /// Nothing was applied; show the current peer listing
    Render {
        listing: PeerListing,
        error: Option<DispatchError>,
    },
}

impl DispatchOutcome {
    /// Whether the request changed the store
    pub const fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// The error surfaced with a render, if any
    pub const fn error(&self) -> Option<&DispatchError> {
        match self {
            Self::Render { error, .. } => error.as_ref(),
            Self::Redirect { .. } => None,
        }
    }
}

/// Applies peer actions against the shared store
pub struct Dispatcher {
    store: SharedStore,
    guard: GuardPolicy,
    commit: Arc<dyn StoreCommit>,
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(
        store: SharedStore,
        assignments: Arc<dyn AssignmentChecker>,
        commit: Arc<dyn StoreCommit>,
    ) -> Self {
        Self {
            store,
            guard: GuardPolicy::new(assignments),
            commit,
        }
    }

    /// Shared store handle
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Dispatch a request
    ///
    /// Requests without a mutating action or without a peer identifier
    /// render the current listing and change nothing.
    pub fn dispatch(&self, request: PeerRequest) -> DispatchOutcome {
        let result = match (request.action, request.peer) {
            (PeerAction::Toggle, Some(peer)) => self.toggle(peer).map(|_| ()),
            (PeerAction::Delete, Some(peer)) => self.delete(peer).map(|_| ()),
            _ => {
                return DispatchOutcome::Render {
                    listing: self.listing(),
                    error: None,
                }
            }
        };

        match result {
            Ok(()) => DispatchOutcome::Redirect {
                location: TUNNELS_VIEW,
            },
            Err(err) => DispatchOutcome::Render {
                listing: self.listing(),
                error: Some(err),
            },
        }
    }

    /// Flip a peer's enabled flag, returning the new value
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if the peer is missing, the guard refuses, or
    /// the commit fails.
    pub fn toggle(&self, peer: PeerIndex) -> Result<bool, DispatchError> {
        let mut store = self.store.lock();
        let current = self.checked_peer(&store, PeerAction::Toggle, peer)?.enabled;
        let enabled = !current;

        store
            .peers
            .set_enabled(peer, enabled)
            .map_err(|_| DispatchError::NotFound { peer })?;

        if let Err(err) = self.commit.commit(&store) {
            // The index was just resolved under the same lock.
            let _ = store.peers.set_enabled(peer, current);
            error!(peer = %peer, error = %err, "Commit failed, toggle rolled back");
            return Err(DispatchError::Commit {
                reason: err.to_string(),
            });
        }

        info!(peer = %peer, enabled, "Peer toggled");
        Ok(enabled)
    }

    /// Delete a peer, returning the removed record
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if the peer is missing, the guard refuses, or
    /// the commit fails.
    pub fn delete(&self, peer: PeerIndex) -> Result<Peer, DispatchError> {
        let mut store = self.store.lock();
        self.checked_peer(&store, PeerAction::Delete, peer)?;

        let removed = store
            .peers
            .delete(peer)
            .map_err(|_| DispatchError::NotFound { peer })?;

        if let Err(err) = self.commit.commit(&store) {
            let _ = store.peers.insert_at(removed);
            error!(peer = %peer, error = %err, "Commit failed, delete rolled back");
            return Err(DispatchError::Commit {
                reason: err.to_string(),
            });
        }

        info!(peer = %peer, tunnel = %removed.tunnel_name, "Peer deleted");
        Ok(removed)
    }

    /// Current peer listing
    pub fn listing(&self) -> PeerListing {
        PeerListing::from_store(&self.store.lock().peers)
    }

    fn checked_peer<'a>(
        &self,
        store: &'a ConfigStore,
        action: PeerAction,
        peer: PeerIndex,
    ) -> Result<&'a Peer, DispatchError> {
        let record = store
            .peers
            .get(peer)
            .map_err(|_| DispatchError::NotFound { peer })?;

        self.guard
            .check_mutable(&store.tunnels, record)
            .map_err(|err| {
                let err = DispatchError::from_guard(action, err);
                if err.is_denial() {
                    warn!(peer = %peer, action = %action, "{}", err);
                }
                err
            })?;

        Ok(record)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
