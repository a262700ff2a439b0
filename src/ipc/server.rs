//! Unix socket server and client
//!
//! Each connection carries any number of request/response frames. Commands
//! run on the blocking pool because peer mutations write the state file
//! while holding the store lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::framing::{read_frame, read_message, write_message};
use super::handler::IpcHandler;
use super::protocol::{
    decode_message, ErrorCode, IpcCommand, IpcResponse, ServerStatus, TunnelInfo, MAX_MESSAGE_SIZE,
};
use crate::config::IpcConfig;
use crate::dispatch::PeerRequest;
use crate::error::IpcError;
use crate::listing::PeerListing;
use crate::store::{Peer, PeerIndex};

/// Control socket server
pub struct IpcServer {
    config: IpcConfig,
    handler: Arc<IpcHandler>,
    shutdown_tx: broadcast::Sender<()>,
}

impl IpcServer {
    /// Create a server for the configured socket
    pub fn new(config: IpcConfig, handler: Arc<IpcHandler>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            handler,
            shutdown_tx,
        }
    }

    /// Serve connections until a shutdown signal arrives
    ///
    /// Returns immediately when the server is disabled in the configuration.
    ///
    /// # Errors
    ///
    /// Returns `IpcError` if the socket cannot be prepared or bound.
    pub async fn run(&self) -> Result<(), IpcError> {
        if !self.config.enabled {
            info!("IPC server disabled");
            return Ok(());
        }

        let listener = bind_socket(&self.config)?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!(socket = %self.config.socket_path.display(), "IPC server listening");

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown_rx.recv() => break,
            };

            let stream = match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!("IPC accept error: {}", e);
                    continue;
                }
            };

            let handler = Arc::clone(&self.handler);
            let max_len = self.config.max_message_size;
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, handler, max_len).await {
                    debug!("IPC connection ended with error: {}", e);
                }
            });
        }

        info!("IPC server shutting down");
        let _ = std::fs::remove_file(&self.config.socket_path);
        Ok(())
    }

    /// Sender that stops [`IpcServer::run`]
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Stop the server
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Replace any socket left by an earlier run and bind with the configured mode
fn bind_socket(config: &IpcConfig) -> Result<UnixListener, IpcError> {
    let path = &config.socket_path;
    let prepare_err = |what: &str, e: std::io::Error| IpcError::SocketCreation {
        path: path.display().to_string(),
        reason: format!("{what}: {e}"),
    };

    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            return Err(prepare_err("cannot remove stale socket", e));
        }
        _ => {}
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| prepare_err("cannot create directory", e))?;
    }

    let listener = UnixListener::bind(path).map_err(|e| IpcError::BindError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(config.socket_mode))
            .map_err(|e| prepare_err("cannot set mode", e))?;
    }

    Ok(listener)
}

/// Answer frames on one connection until the client hangs up
async fn serve_connection(
    mut stream: UnixStream,
    handler: Arc<IpcHandler>,
    max_len: usize,
) -> Result<(), IpcError> {
    loop {
        let body = match read_frame(&mut stream, max_len).await {
            Ok(Some(body)) => body,
            Ok(None) => return Ok(()),
            Err(IpcError::FrameTooLarge { len, max }) => {
                // The body was never read; the stream is out of sync.
                warn!(len, max, "Oversized IPC frame, closing connection");
                let reply = IpcResponse::error(
                    ErrorCode::InvalidParameters,
                    format!("Message too large: {len} bytes"),
                );
                return write_message(&mut stream, &reply).await;
            }
            Err(e) => return Err(e),
        };

        let command: IpcCommand = match decode_message(&body) {
            Ok(command) => command,
            Err(e) => {
                warn!("Undecodable IPC command: {}", e);
                let reply = IpcResponse::error(
                    ErrorCode::InvalidCommand,
                    format!("Invalid command format: {e}"),
                );
                write_message(&mut stream, &reply).await?;
                continue;
            }
        };

        let closes = matches!(command, IpcCommand::Shutdown);
        let reply = run_command(&handler, command).await;
        write_message(&mut stream, &reply).await?;

        if closes {
            return Ok(());
        }
    }
}

async fn run_command(handler: &Arc<IpcHandler>, command: IpcCommand) -> IpcResponse {
    let handler = Arc::clone(handler);
    match tokio::task::spawn_blocking(move || handler.handle(command)).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("IPC command task failed: {}", e);
            IpcResponse::error(ErrorCode::InternalError, "Command execution failed")
        }
    }
}

/// Client for the control socket
///
/// Every call opens a fresh connection.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    /// Create a client for the given socket path
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    /// Send one command and wait for its response
    ///
    /// # Errors
    ///
    /// Returns `IpcError` if the daemon cannot be reached or the exchange
    /// fails.
    pub async fn send(&self, command: IpcCommand) -> Result<IpcResponse, IpcError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| IpcError::ConnectionError(e.to_string()))?;

        write_message(&mut stream, &command).await?;
        read_message(&mut stream, MAX_MESSAGE_SIZE).await
    }

    /// Whether the daemon answers a ping
    ///
    /// # Errors
    ///
    /// Returns `IpcError` if the exchange fails.
    pub async fn ping(&self) -> Result<bool, IpcError> {
        Ok(matches!(self.send(IpcCommand::Ping).await?, IpcResponse::Pong))
    }

    /// Daemon status
    ///
    /// # Errors
    ///
    /// Returns `IpcError` if the exchange fails or the reply is not a status.
    pub async fn status(&self) -> Result<ServerStatus, IpcError> {
        match self.send(IpcCommand::Status).await? {
            IpcResponse::Status(status) => Ok(status),
            other => Err(unexpected(&other)),
        }
    }

    /// Current peer listing
    ///
    /// # Errors
    ///
    /// Returns `IpcError` if the exchange fails or the reply is not a listing.
    pub async fn list_peers(&self) -> Result<PeerListing, IpcError> {
        match self.send(IpcCommand::ListPeers).await? {
            IpcResponse::PeerListing { listing } => Ok(listing),
            other => Err(unexpected(&other)),
        }
    }

    /// Tunnels with their assignment state
    ///
    /// # Errors
    ///
    /// Returns `IpcError` if the exchange fails or the reply is not a tunnel
    /// list.
    pub async fn list_tunnels(&self) -> Result<Vec<TunnelInfo>, IpcError> {
        match self.send(IpcCommand::ListTunnels).await? {
            IpcResponse::TunnelList { tunnels } => Ok(tunnels),
            other => Err(unexpected(&other)),
        }
    }

    /// One peer record
    ///
    /// # Errors
    ///
    /// Returns `IpcError` if the exchange fails or the peer does not exist.
    pub async fn get_peer(&self, peer: PeerIndex) -> Result<Peer, IpcError> {
        match self.send(IpcCommand::GetPeer { peer }).await? {
            IpcResponse::Peer(record) => Ok(record),
            other => Err(unexpected(&other)),
        }
    }

    /// Submit a peer request
    ///
    /// Guard denials are returned as `IpcResponse::Rejected`, not as `Err`.
    ///
    /// # Errors
    ///
    /// Returns `IpcError` if the exchange fails.
    pub async fn peer_request(&self, request: PeerRequest) -> Result<IpcResponse, IpcError> {
        self.send(IpcCommand::PeerAction {
            act: Some(request.action.as_str().to_string()),
            peer: request.peer.map(|p| p.0),
        })
        .await
    }

    /// Ask the daemon to reload its state file, returning its summary
    ///
    /// # Errors
    ///
    /// Returns `IpcError` if the exchange fails or the reload is refused.
    pub async fn reload(&self) -> Result<String, IpcError> {
        match self.send(IpcCommand::ReloadState).await? {
            IpcResponse::Success { message } => Ok(message.unwrap_or_default()),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &IpcResponse) -> IpcError {
    match response {
        IpcResponse::Error(e) => IpcError::protocol(e.to_string()),
        other => IpcError::protocol(format!("Unexpected response: {other:?}")),
    }
}
