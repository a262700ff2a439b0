//! State file persistence through the dispatcher
//!
//! Every applied mutation is committed to the JSON state file; a denied or
//! failed mutation leaves the file untouched.

use std::sync::Arc;

use tempfile::tempdir;

use wg_peers::assignment::InterfaceAssignments;
use wg_peers::dispatch::{DispatchError, Dispatcher, PeerRequest};
use wg_peers::store::{load_state, JsonStateFile, PeerIndex, StoreCommit};

const STATE: &str = r#"{
    "tunnels": [
        { "index": 0, "name": "tun_wg0", "enabled": "yes" },
        { "index": 1, "name": "tun_wg1", "enabled": "yes" }
    ],
    "peers": [
        {
            "index": 0, "tun": "tun_wg0", "descr": "office",
            "publickey": "hG5pX0Wq3lC3e1Xy0m2XQ9yS9u6bVb3kQYfM1m7nS2o=",
            "peeraddresses": { "item": ["10.6.0.2/32"] },
            "allowedips": { "item": ["10.6.0.2/32"] },
            "endpoint": "vpn.example.net", "port": "51820", "enabled": "yes"
        },
        {
            "index": 3, "tun": "tun_wg0", "descr": "laptop",
            "publickey": "Zr0gm1P8dGf3m2nX1iWf5yL6T3wq9aKcB4rVj7uE2hA=",
            "peeraddresses": { "item": ["10.6.0.3/32"] },
            "allowedips": { "item": ["10.6.0.3/32"] },
            "endpoint": "", "port": "", "enabled": "no"
        },
        {
            "index": 4, "tun": "tun_wg1", "descr": "phone",
            "publickey": "cV2nM8kQ1wE4rT6yU9iO0pA3sD5fG7hJ1kL2zX4cV6b=",
            "endpoint": "", "port": "", "enabled": "yes"
        }
    ],
    "next_peer_index": 5
}"#;

fn setup() -> (tempfile::TempDir, Arc<JsonStateFile>, Dispatcher, Arc<InterfaceAssignments>) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wireguard.json");
    std::fs::write(&path, STATE).unwrap();

    let state = Arc::new(JsonStateFile::new(&path));
    let store = state.load().unwrap();
    let assignments = Arc::new(InterfaceAssignments::new());
    let dispatcher = Dispatcher::new(store.into_shared(), assignments.clone(), state.clone());
    (dir, state, dispatcher, assignments)
}

#[test]
fn test_toggle_is_persisted() {
    let (_dir, state, dispatcher, _) = setup();

    assert!(dispatcher.dispatch(PeerRequest::toggle(PeerIndex(3))).is_redirect());

    let reloaded = load_state(state.path()).unwrap();
    assert!(reloaded.peers.get(PeerIndex(3)).unwrap().enabled);

    let raw = std::fs::read_to_string(state.path()).unwrap();
    assert!(raw.contains(r#""enabled": "yes""#));
    assert!(!raw.contains(r#""enabled": true"#));
}

#[test]
fn test_delete_is_persisted_and_index_not_reused() {
    let (_dir, state, dispatcher, _) = setup();

    assert!(dispatcher.dispatch(PeerRequest::delete(PeerIndex(4))).is_redirect());

    let mut reloaded = load_state(state.path()).unwrap();
    assert_eq!(reloaded.peers.len(), 2);
    assert!(reloaded.peers.get(PeerIndex(4)).unwrap_err().is_not_found());
    assert_eq!(reloaded.peers.next_index(), 5);

    let fresh = reloaded
        .peers
        .insert(wg_peers::store::Peer::new("tun_wg1", "new-key"))
        .unwrap();
    assert_eq!(fresh, PeerIndex(5));
}

#[test]
fn test_denied_mutation_leaves_file_untouched() {
    let (_dir, state, dispatcher, assignments) = setup();
    let before = std::fs::read_to_string(state.path()).unwrap();

    assignments.assign("opt1", "tun_wg0");
    let outcome = dispatcher.dispatch(PeerRequest::delete(PeerIndex(0)));
    assert!(matches!(
        outcome.error(),
        Some(DispatchError::TunnelInUse { .. })
    ));

    assert_eq!(std::fs::read_to_string(state.path()).unwrap(), before);
}

#[test]
fn test_fields_survive_commit() {
    let (_dir, state, dispatcher, _) = setup();
    dispatcher.toggle(PeerIndex(0)).unwrap();

    let reloaded = load_state(state.path()).unwrap();
    let peer = reloaded.peers.get(PeerIndex(0)).unwrap();
    assert!(!peer.enabled);
    assert_eq!(peer.description, "office");
    assert_eq!(peer.endpoint, "vpn.example.net");
    assert_eq!(peer.port, Some(51820));
    assert_eq!(peer.peer_addresses, vec!["10.6.0.2/32".to_string()]);
    assert_eq!(reloaded.tunnels.len(), 2);
}

#[test]
fn test_commit_failure_rolls_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wireguard.json");
    std::fs::write(&path, STATE).unwrap();
    let store = load_state(&path).unwrap();

    // The parent directory does not exist, so every commit fails.
    let broken = Arc::new(JsonStateFile::new(dir.path().join("missing").join("state.json")));
    assert!(broken.commit(&store).is_err());

    let dispatcher = Dispatcher::new(
        store.into_shared(),
        Arc::new(InterfaceAssignments::new()),
        broken,
    );
    let before = dispatcher.listing();

    assert!(matches!(
        dispatcher.toggle(PeerIndex(3)),
        Err(DispatchError::Commit { .. })
    ));
    assert!(matches!(
        dispatcher.delete(PeerIndex(0)),
        Err(DispatchError::Commit { .. })
    ));

    assert_eq!(dispatcher.listing(), before);
}
