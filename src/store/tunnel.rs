//! Tunnel registry
//!
//! Tunnels are read-only from the peer management point of view. The
//! registry only answers lookups and forwards the "assigned" question to the
//! interface assignment collaborator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{StoreError, TunnelIndex};
use crate::assignment::AssignmentChecker;

/// A WireGuard tunnel record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
    /// Stable index assigned at creation
    pub index: TunnelIndex,
    /// Unique tunnel name, referenced by peers
    pub name: String,
    /// Whether the tunnel is enabled
    pub enabled: bool,
}

impl Tunnel {
    /// Create an enabled tunnel record
    pub fn new(index: impl Into<TunnelIndex>, name: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            name: name.into(),
            enabled: true,
        }
    }
}

/// Ordered collection of tunnel records keyed by index
#[derive(Debug, Clone, Default)]
pub struct TunnelRegistry {
    tunnels: BTreeMap<TunnelIndex, Tunnel>,
}

impl TunnelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tunnel record
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateTunnel` if the index or the name is
    /// already registered.
    pub fn insert(&mut self, tunnel: Tunnel) -> Result<(), StoreError> {
        if self.tunnels.contains_key(&tunnel.index)
            || self.tunnels.values().any(|t| t.name == tunnel.name)
        {
            return Err(StoreError::DuplicateTunnel { name: tunnel.name });
        }
        self.tunnels.insert(tunnel.index, tunnel);
        Ok(())
    }

    /// Resolve a tunnel name to its index
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TunnelNotFound` if no tunnel has that name.
    pub fn resolve_index_by_name(&self, name: &str) -> Result<TunnelIndex, StoreError> {
        self.tunnels
            .values()
            .find(|t| t.name == name)
            .map(|t| t.index)
            .ok_or_else(|| StoreError::TunnelNotFound { name: name.into() })
    }

    /// Get a tunnel by index
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TunnelIndexNotFound` if the index is unallocated.
    pub fn get(&self, index: TunnelIndex) -> Result<&Tunnel, StoreError> {
        self.tunnels
            .get(&index)
            .ok_or(StoreError::TunnelIndexNotFound { index })
    }

    /// Get a tunnel by name
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TunnelNotFound` if no tunnel has that name.
    pub fn get_by_name(&self, name: &str) -> Result<&Tunnel, StoreError> {
        let index = self.resolve_index_by_name(name)?;
        self.get(index)
    }

    /// Ask the assignment collaborator whether a tunnel is bound to an interface
    pub fn is_assigned(&self, name: &str, assignments: &dyn AssignmentChecker) -> bool {
        assignments.is_assigned(name)
    }

    /// Iterate tunnels in index order
    pub fn iter(&self) -> impl Iterator<Item = &Tunnel> {
        self.tunnels.values()
    }

    /// Number of tunnels
    pub fn len(&self) -> usize {
        self.tunnels.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tunnels.is_empty()
    }
}
