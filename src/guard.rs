//! Guard policy for peer mutations
//!
//! A peer may only be toggled or deleted while its owning tunnel is not
//! assigned to an interface. The check runs fresh on every mutating request;
//! assignment state can change between requests, so nothing is cached.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use crate::assignment::AssignmentChecker;
use crate::store::{Peer, PeerIndex, TunnelRegistry};

/// Reasons a peer mutation is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// The peer names a tunnel that does not exist
    #[error("Peer {peer} references tunnel '{tunnel}' which does not exist")]
    Integrity { peer: PeerIndex, tunnel: String },

    /// The owning tunnel is assigned to an interface
    #[error("Tunnel '{tunnel}' is assigned as an interface")]
    TunnelInUse { tunnel: String },
}

/// Pre-mutation check shared by all peer mutation paths
#[derive(Clone)]
pub struct GuardPolicy {
    assignments: Arc<dyn AssignmentChecker>,
}

impl GuardPolicy {
    /// Create a guard backed by an assignment collaborator
    pub fn new(assignments: Arc<dyn AssignmentChecker>) -> Self {
        Self { assignments }
    }

    /// Check that `peer` may be mutated
    ///
    /// # Errors
    ///
    /// - `GuardError::Integrity` if the owning tunnel does not resolve
    /// - `GuardError::TunnelInUse` if the owning tunnel is assigned
    pub fn check_mutable(&self, tunnels: &TunnelRegistry, peer: &Peer) -> Result<(), GuardError> {
        let tunnel = tunnels.get_by_name(&peer.tunnel_name).map_err(|_| {
            error!(
                peer = %peer.index,
                tunnel = %peer.tunnel_name,
                "Peer references a tunnel that does not exist"
            );
            GuardError::Integrity {
                peer: peer.index,
                tunnel: peer.tunnel_name.clone(),
            }
        })?;

        if tunnels.is_assigned(&tunnel.name, self.assignments.as_ref()) {
            debug!(peer = %peer.index, tunnel = %tunnel.name, "Tunnel is assigned, mutation refused");
            return Err(GuardError::TunnelInUse {
                tunnel: tunnel.name.clone(),
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for GuardPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardPolicy").finish_non_exhaustive()
    }
}
