//! IPC end-to-end tests
//!
//! Runs the daemon's server on a temporary socket and drives it with the
//! client, including the interface assignment commands that feed the guard.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use wg_peers::assignment::InterfaceAssignments;
use wg_peers::config::IpcConfig;
use wg_peers::dispatch::{Dispatcher, PeerRequest};
use wg_peers::ipc::{
    read_message, write_message, ErrorCode, IpcClient, IpcCommand, IpcHandler, IpcResponse,
    IpcServer, MAX_MESSAGE_SIZE,
};
use wg_peers::store::{save_state, ConfigStore, JsonStateFile, Peer, PeerIndex, Tunnel};

fn sample_store() -> ConfigStore {
    let mut store = ConfigStore::new();
    store.tunnels.insert(Tunnel::new(0, "tun_wg0")).unwrap();
    store
        .peers
        .insert(Peer::new("tun_wg0", "hG5pX0Wq3lC3e1Xy0m2XQ9yS9u6bVb3kQYfM1m7nS2o="))
        .unwrap();
    store
        .peers
        .insert(Peer::new("tun_wg0", "Zr0gm1P8dGf3m2nX1iWf5yL6T3wq9aKcB4rVj7uE2hA="))
        .unwrap();
    store
}

async fn start_server(
    socket_path: &Path,
    state_path: &Path,
) -> (broadcast::Sender<()>, JoinHandle<()>) {
    let state = Arc::new(JsonStateFile::new(state_path));
    let store = state.load().unwrap();
    let assignments = Arc::new(InterfaceAssignments::new());
    let dispatcher = Arc::new(Dispatcher::new(
        store.into_shared(),
        assignments.clone(),
        state,
    ));
    let handler = Arc::new(IpcHandler::new(
        dispatcher,
        assignments,
        Some(state_path.to_path_buf()),
    ));

    let config = IpcConfig {
        socket_path: socket_path.to_path_buf(),
        socket_mode: 0o600,
        enabled: true,
        max_message_size: 64 * 1024,
    };
    let server = IpcServer::new(config, handler);
    let shutdown = server.shutdown_sender();
    let handle = tokio::spawn(async move {
        server.run().await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (shutdown, handle)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_guarded_actions_over_ipc() {
    let dir = tempdir().unwrap();
    let socket = dir.path().join("wg-peers.sock");
    let state = dir.path().join("wireguard.json");
    save_state(&state, &sample_store()).unwrap();

    let (shutdown, handle) = start_server(&socket, &state).await;
    let client = IpcClient::new(&socket);

    let response = client
        .send(IpcCommand::AssignInterface {
            name: "opt1".into(),
            device: "tun_wg0".into(),
        })
        .await
        .unwrap();
    assert!(matches!(response, IpcResponse::Success { .. }));

    match client.peer_request(PeerRequest::delete(PeerIndex(1))).await.unwrap() {
        IpcResponse::Rejected {
            code,
            message,
            listing,
        } => {
            assert_eq!(code, ErrorCode::TunnelInUse);
            assert!(message.starts_with("Cannot delete a peer"));
            assert_eq!(listing.rows().len(), 2);
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    client
        .send(IpcCommand::ReleaseInterface { name: "opt1".into() })
        .await
        .unwrap();

    let response = client.send(IpcCommand::DeletePeer { peer: PeerIndex(1) }).await.unwrap();
    assert!(matches!(response, IpcResponse::Redirect { .. }));
    assert_eq!(client.list_peers().await.unwrap().rows().len(), 1);

    let response = client.send(IpcCommand::GetPeer { peer: PeerIndex(1) }).await.unwrap();
    match response {
        IpcResponse::Error(e) => assert_eq!(e.code, ErrorCode::NotFound),
        other => panic!("expected not found, got {other:?}"),
    }

    let _ = shutdown.send(());
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reload_picks_up_external_edit() {
    let dir = tempdir().unwrap();
    let socket = dir.path().join("wg-peers.sock");
    let state = dir.path().join("wireguard.json");
    save_state(&state, &sample_store()).unwrap();

    let (shutdown, handle) = start_server(&socket, &state).await;
    let client = IpcClient::new(&socket);

    save_state(&state, &ConfigStore::new()).unwrap();
    let response = client.send(IpcCommand::ReloadState).await.unwrap();
    assert!(matches!(response, IpcResponse::Success { .. }));

    assert!(client.list_peers().await.unwrap().is_empty());

    let _ = shutdown.send(());
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_listing_action_and_invalid_payload() {
    let dir = tempdir().unwrap();
    let socket = dir.path().join("wg-peers.sock");
    let state = dir.path().join("wireguard.json");
    save_state(&state, &sample_store()).unwrap();

    let (shutdown, handle) = start_server(&socket, &state).await;
    let client = IpcClient::new(&socket);

    let response = client
        .send(IpcCommand::PeerAction {
            act: None,
            peer: Some(0),
        })
        .await
        .unwrap();
    assert!(matches!(response, IpcResponse::PeerListing { .. }));

    // A well-framed body that is not a command
    let mut stream = tokio::net::UnixStream::connect(&socket).await.unwrap();
    write_message(&mut stream, &serde_json::json!({ "type": "frobnicate" }))
        .await
        .unwrap();

    let response: IpcResponse = read_message(&mut stream, MAX_MESSAGE_SIZE).await.unwrap();
    match response {
        IpcResponse::Error(e) => assert_eq!(e.code, ErrorCode::InvalidCommand),
        other => panic!("expected invalid command, got {other:?}"),
    }

    // The connection stays usable after a bad command
    write_message(&mut stream, &IpcCommand::Ping).await.unwrap();
    let response: IpcResponse = read_message(&mut stream, MAX_MESSAGE_SIZE).await.unwrap();
    assert!(matches!(response, IpcResponse::Pong));

    let _ = shutdown.send(());
    let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
}
