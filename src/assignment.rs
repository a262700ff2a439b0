//! Interface assignment collaborator
//!
//! Whether a tunnel is bound to a network interface is decided outside the
//! peer management core. The core only consumes a boolean answer through
//! [`AssignmentChecker`].
//!
//! A tunnel is assigned when some interface assignment's device equals the
//! tunnel name.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::InterfaceAssignment;

/// Answers whether a tunnel is currently assigned to an interface
///
/// Implementations must be side-effect-free; the guard calls this on every
/// mutating request.
pub trait AssignmentChecker: Send + Sync {
    /// Whether `tunnel_name` is bound to an interface
    fn is_assigned(&self, tunnel_name: &str) -> bool;
}

impl<F> AssignmentChecker for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_assigned(&self, tunnel_name: &str) -> bool {
        self(tunnel_name)
    }
}

/// Interface assignments keyed by interface name
#[derive(Debug, Default)]
pub struct InterfaceAssignments {
    /// Interface name to device (tunnel) name
    assignments: RwLock<BTreeMap<String, String>>,
}

impl InterfaceAssignments {
    /// Create an empty assignment table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from configured assignments
    pub fn from_config(assignments: &[InterfaceAssignment]) -> Self {
        let table = Self::new();
        table.replace(assignments);
        table
    }

    /// Bind an interface to a device, returning the previously bound device
    pub fn assign(&self, interface: impl Into<String>, device: impl Into<String>) -> Option<String> {
        let interface = interface.into();
        let device = device.into();
        info!(interface = %interface, device = %device, "Interface assigned");
        self.assignments.write().insert(interface, device)
    }

    /// Release an interface, returning the device it was bound to
    pub fn release(&self, interface: &str) -> Option<String> {
        let released = self.assignments.write().remove(interface);
        if let Some(device) = &released {
            info!(interface = %interface, device = %device, "Interface released");
        }
        released
    }

    /// Replace all assignments
    pub fn replace(&self, assignments: &[InterfaceAssignment]) {
        let table: BTreeMap<String, String> = assignments
            .iter()
            .map(|a| (a.name.clone(), a.device.clone()))
            .collect();
        debug!(count = table.len(), "Interface assignments replaced");
        *self.assignments.write() = table;
    }

    /// Current assignments in interface name order
    pub fn snapshot(&self) -> Vec<InterfaceAssignment> {
        self.assignments
            .read()
            .iter()
            .map(|(name, device)| InterfaceAssignment {
                name: name.clone(),
                device: device.clone(),
            })
            .collect()
    }

    /// Number of assigned interfaces
    pub fn len(&self) -> usize {
        self.assignments.read().len()
    }

    /// Whether no interface is assigned
    pub fn is_empty(&self) -> bool {
        self.assignments.read().is_empty()
    }
}

impl AssignmentChecker for InterfaceAssignments {
    fn is_assigned(&self, tunnel_name: &str) -> bool {
        self.assignments
            .read()
            .values()
            .any(|device| device == tunnel_name)
    }
}
