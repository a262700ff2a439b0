//! IPC command handler
//!
//! This module processes IPC commands and generates responses. Peer actions
//! go through the [`Dispatcher`]; everything else is a read of the shared
//! store or of the interface assignment table.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::protocol::{ErrorCode, IpcCommand, IpcResponse, ServerStatus, TunnelInfo};
use crate::assignment::{AssignmentChecker, InterfaceAssignments};
use crate::dispatch::{DispatchOutcome, Dispatcher, PeerRequest};
use crate::store::{load_state, PeerIndex, TunnelIndex};

/// IPC command handler
pub struct IpcHandler {
    /// Peer action dispatcher, owns the shared store handle
    dispatcher: Arc<Dispatcher>,

    /// Interface assignment table consulted by the guard
    assignments: Arc<InterfaceAssignments>,

    /// State file reloaded by `ReloadState`
    state_path: Option<PathBuf>,

    /// Server start time
    start_time: Instant,

    /// Server version
    version: String,

    /// Fired when a `Shutdown` command is handled
    shutdown_tx: broadcast::Sender<()>,
}

impl IpcHandler {
    /// Create a new IPC handler
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        assignments: Arc<InterfaceAssignments>,
        state_path: Option<PathBuf>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            dispatcher,
            assignments,
            state_path,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            shutdown_tx,
        }
    }

    /// Subscribe to shutdown requests received over IPC
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Handle an IPC command and return a response
    pub fn handle(&self, command: IpcCommand) -> IpcResponse {
        debug!("Handling IPC command: {:?}", command);

        match command {
            IpcCommand::Ping => IpcResponse::Pong,

            IpcCommand::Status => self.handle_status(),

            IpcCommand::ListPeers => IpcResponse::PeerListing {
                listing: self.dispatcher.listing(),
            },

            IpcCommand::GetPeer { peer } => self.handle_get_peer(peer),

            IpcCommand::ListTunnels => self.handle_list_tunnels(),

            IpcCommand::GetTunnel { tunnel } => self.handle_get_tunnel(tunnel),

            IpcCommand::TogglePeer { peer } => self.handle_peer_request(PeerRequest::toggle(peer)),

            IpcCommand::DeletePeer { peer } => self.handle_peer_request(PeerRequest::delete(peer)),

            IpcCommand::PeerAction { act, peer } => {
                self.handle_peer_request(PeerRequest::from_params(act.as_deref(), peer))
            }

            IpcCommand::AssignInterface { name, device } => {
                self.handle_assign_interface(name, device)
            }

            IpcCommand::ReleaseInterface { name } => self.handle_release_interface(&name),

            IpcCommand::ReloadState => self.handle_reload_state(),

            IpcCommand::Shutdown => {
                info!("Shutdown requested over IPC");
                let _ = self.shutdown_tx.send(());
                IpcResponse::success_with_message("Shutting down")
            }
        }
    }

    fn handle_status(&self) -> IpcResponse {
        let (tunnel_count, peer_count) = {
            let store = self.dispatcher.store().lock();
            (store.tunnels.len(), store.peers.len())
        };

        IpcResponse::Status(ServerStatus {
            version: self.version.clone(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            tunnel_count,
            peer_count,
            interfaces: self.assignments.snapshot(),
            state_path: self.state_path.as_ref().map(|p| p.display().to_string()),
        })
    }

    fn handle_get_peer(&self, peer: PeerIndex) -> IpcResponse {
        let store = self.dispatcher.store().lock();
        match store.peers.get(peer) {
            Ok(record) => IpcResponse::Peer(record.clone()),
            Err(e) => IpcResponse::error(ErrorCode::NotFound, e.to_string()),
        }
    }

    fn handle_list_tunnels(&self) -> IpcResponse {
        let store = self.dispatcher.store().lock();
        let tunnels = store
            .tunnels
            .iter()
            .map(|t| TunnelInfo::new(t, self.assignments.is_assigned(&t.name)))
            .collect();
        IpcResponse::TunnelList { tunnels }
    }

    fn handle_get_tunnel(&self, tunnel: TunnelIndex) -> IpcResponse {
        let store = self.dispatcher.store().lock();
        match store.tunnels.get(tunnel) {
            Ok(t) => IpcResponse::Tunnel(TunnelInfo::new(t, self.assignments.is_assigned(&t.name))),
            Err(e) => IpcResponse::error(ErrorCode::NotFound, e.to_string()),
        }
    }

    fn handle_peer_request(&self, request: PeerRequest) -> IpcResponse {
        match self.dispatcher.dispatch(request) {
            DispatchOutcome::Redirect { location } => IpcResponse::Redirect {
                location: location.into(),
            },
            DispatchOutcome::Render {
                listing,
                error: None,
            } => IpcResponse::PeerListing { listing },
            DispatchOutcome::Render {
                listing,
                error: Some(err),
            } => IpcResponse::rejected(&err, listing),
        }
    }

    fn handle_assign_interface(&self, name: String, device: String) -> IpcResponse {
        if name.is_empty() || device.is_empty() {
            return IpcResponse::error(
                ErrorCode::InvalidParameters,
                "Interface name and device are required",
            );
        }

        // Held across the change so it never lands between a guard check
        // and the commit of the mutation it allowed.
        let _store = self.dispatcher.store().lock();
        match self.assignments.assign(name.clone(), device.clone()) {
            Some(previous) => IpcResponse::success_with_message(format!(
                "Interface {name} moved from {previous} to {device}"
            )),
            None => IpcResponse::success_with_message(format!("Interface {name} assigned to {device}")),
        }
    }

    fn handle_release_interface(&self, name: &str) -> IpcResponse {
        let _store = self.dispatcher.store().lock();
        match self.assignments.release(name) {
            Some(device) => {
                IpcResponse::success_with_message(format!("Interface {name} released from {device}"))
            }
            None => IpcResponse::error(
                ErrorCode::NotFound,
                format!("Interface not assigned: {name}"),
            ),
        }
    }

    fn handle_reload_state(&self) -> IpcResponse {
        let Some(path) = &self.state_path else {
            return IpcResponse::error(
                ErrorCode::OperationFailed,
                "No state file configured",
            );
        };

        match load_state(path) {
            Ok(store) => {
                let (tunnels, peers) = (store.tunnels.len(), store.peers.len());
                *self.dispatcher.store().lock() = store;
                info!(tunnels, peers, "State reloaded from {:?}", path);
                IpcResponse::success_with_message(format!(
                    "Reloaded {tunnels} tunnels and {peers} peers"
                ))
            }
            Err(e) => {
                error!("State reload failed: {}", e);
                IpcResponse::error(ErrorCode::OperationFailed, e.to_string())
            }
        }
    }
}
