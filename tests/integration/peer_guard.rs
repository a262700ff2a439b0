//! Guard and dispatch behavior through the public API
//!
//! Covers the enable/disable and delete flows against a store of several
//! peers, with the owning tunnel either free or bound to an interface.

use std::sync::Arc;

use wg_peers::assignment::InterfaceAssignments;
use wg_peers::dispatch::{DispatchError, DispatchOutcome, Dispatcher, PeerAction, PeerRequest};
use wg_peers::listing::PeerListing;
use wg_peers::store::{ConfigStore, NoCommit, Peer, PeerIndex, Tunnel};

// ============================================================================
// Helper Functions
// ============================================================================

/// Store with tunnels "WG0" and "WG1" and five peers (0..=4) on "WG0".
///
/// Peer 3 starts disabled.
fn five_peer_store() -> ConfigStore {
    let mut store = ConfigStore::new();
    store.tunnels.insert(Tunnel::new(0, "WG0")).unwrap();
    store.tunnels.insert(Tunnel::new(1, "WG1")).unwrap();
    for i in 0..5 {
        let mut peer = Peer::new("WG0", format!("peer-key-{i:02}-AAAAAAAAAAAAAAAAAAAAAAAA="));
        peer.enabled = i != 3;
        store.peers.insert(peer).unwrap();
    }
    store
}

fn dispatcher_with(store: ConfigStore) -> (Dispatcher, Arc<InterfaceAssignments>) {
    let assignments = Arc::new(InterfaceAssignments::new());
    let dispatcher = Dispatcher::new(store.into_shared(), assignments.clone(), Arc::new(NoCommit));
    (dispatcher, assignments)
}

fn peer_enabled(dispatcher: &Dispatcher, index: u32) -> bool {
    dispatcher.store().lock().peers.get(PeerIndex(index)).unwrap().enabled
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenarios {
    use super::*;

    #[test]
    fn test_toggle_on_free_tunnel_redirects() {
        let (dispatcher, _) = dispatcher_with(five_peer_store());

        let outcome = dispatcher.dispatch(PeerRequest::toggle(PeerIndex(3)));

        assert_eq!(outcome, DispatchOutcome::Redirect { location: "/wg/tunnels" });
        assert!(peer_enabled(&dispatcher, 3));
    }

    #[test]
    fn test_toggle_on_assigned_tunnel_is_denied() {
        let (dispatcher, assignments) = dispatcher_with(five_peer_store());
        assignments.assign("opt1", "WG0");

        let outcome = dispatcher.dispatch(PeerRequest::toggle(PeerIndex(3)));

        match outcome {
            DispatchOutcome::Render { listing, error } => {
                assert_eq!(listing.rows().len(), 5);
                assert_eq!(
                    error,
                    Some(DispatchError::TunnelInUse {
                        action: PeerAction::Toggle,
                        tunnel: "WG0".into(),
                    })
                );
            }
            DispatchOutcome::Redirect { .. } => panic!("toggle should have been denied"),
        }
        assert!(!peer_enabled(&dispatcher, 3));
    }

    #[test]
    fn test_denial_message() {
        let (dispatcher, assignments) = dispatcher_with(five_peer_store());
        assignments.assign("opt1", "WG0");

        let outcome = dispatcher.dispatch(PeerRequest::delete(PeerIndex(0)));
        assert_eq!(
            outcome.error().unwrap().to_string(),
            "Cannot delete a peer while its tunnel is assigned as an interface."
        );
    }

    #[test]
    fn test_delete_among_five() {
        let (dispatcher, _) = dispatcher_with(five_peer_store());

        assert!(dispatcher.dispatch(PeerRequest::delete(PeerIndex(3))).is_redirect());

        let store = dispatcher.store().lock();
        assert_eq!(store.peers.len(), 4);
        assert!(store.peers.get(PeerIndex(3)).unwrap_err().is_not_found());
        let remaining: Vec<u32> = store.peers.list().map(|(i, _)| i.0).collect();
        assert_eq!(remaining, vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_other_tunnel_unaffected_by_assignment() {
        let mut store = five_peer_store();
        let on_wg1 = store.peers.insert(Peer::new("WG1", "wg1-key")).unwrap();
        let (dispatcher, assignments) = dispatcher_with(store);
        assignments.assign("opt1", "WG0");

        assert!(dispatcher.dispatch(PeerRequest::toggle(on_wg1)).is_redirect());
        assert!(!dispatcher.dispatch(PeerRequest::toggle(PeerIndex(0))).is_redirect());
    }

    #[test]
    fn test_release_lifts_denial() {
        let (dispatcher, assignments) = dispatcher_with(five_peer_store());
        assignments.assign("opt1", "WG0");
        assert!(!dispatcher.dispatch(PeerRequest::delete(PeerIndex(1))).is_redirect());

        assignments.release("opt1");
        assert!(dispatcher.dispatch(PeerRequest::delete(PeerIndex(1))).is_redirect());
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;

    #[test]
    fn test_guard_blocks_every_mutation_on_assigned_tunnel() {
        let (dispatcher, assignments) = dispatcher_with(five_peer_store());
        assignments.assign("opt2", "WG0");
        let before = dispatcher.listing();

        for index in 0..5 {
            assert!(!dispatcher.dispatch(PeerRequest::toggle(PeerIndex(index))).is_redirect());
            assert!(!dispatcher.dispatch(PeerRequest::delete(PeerIndex(index))).is_redirect());
        }

        assert_eq!(dispatcher.listing(), before);
    }

    #[test]
    fn test_toggle_twice_restores() {
        let (dispatcher, _) = dispatcher_with(five_peer_store());
        let before = dispatcher.listing();

        for index in 0..5 {
            dispatcher.toggle(PeerIndex(index)).unwrap();
            dispatcher.toggle(PeerIndex(index)).unwrap();
        }

        assert_eq!(dispatcher.listing(), before);
    }

    #[test]
    fn test_deleted_index_is_not_reused() {
        let (dispatcher, _) = dispatcher_with(five_peer_store());
        dispatcher.delete(PeerIndex(4)).unwrap();

        let index = dispatcher
            .store()
            .lock()
            .peers
            .insert(Peer::new("WG0", "replacement"))
            .unwrap();

        assert_eq!(index, PeerIndex(5));
        assert_eq!(
            dispatcher.toggle(PeerIndex(4)),
            Err(DispatchError::NotFound { peer: PeerIndex(4) })
        );
    }

    #[test]
    fn test_dangling_tunnel_is_integrity_error() {
        let mut store = five_peer_store();
        let orphan = store.peers.insert(Peer::new("WG9", "orphan-key")).unwrap();
        let (dispatcher, _) = dispatcher_with(store);

        let outcome = dispatcher.dispatch(PeerRequest::toggle(orphan));
        assert_eq!(
            outcome.error(),
            Some(&DispatchError::Integrity {
                peer: orphan,
                tunnel: "WG9".into(),
            })
        );
        assert!(peer_enabled(&dispatcher, orphan.0));
    }

    #[test]
    fn test_dangling_tunnel_blocks_delete() {
        let mut store = five_peer_store();
        let orphan = store.peers.insert(Peer::new("WG9", "orphan-key")).unwrap();
        let (dispatcher, _) = dispatcher_with(store);

        let outcome = dispatcher.dispatch(PeerRequest::delete(orphan));
        assert_eq!(
            outcome.error(),
            Some(&DispatchError::Integrity {
                peer: orphan,
                tunnel: "WG9".into(),
            })
        );

        let store = dispatcher.store().lock();
        assert_eq!(store.peers.len(), 6);
        assert!(store.peers.get(orphan).is_ok());
    }

    #[test]
    fn test_empty_store_lists_empty_signal() {
        let (dispatcher, _) = dispatcher_with(ConfigStore::new());
        assert_eq!(dispatcher.listing(), PeerListing::Empty);

        let outcome = dispatcher.dispatch(PeerRequest::listing());
        assert_eq!(
            outcome,
            DispatchOutcome::Render {
                listing: PeerListing::Empty,
                error: None,
            }
        );
    }

    #[test]
    fn test_unknown_action_changes_nothing() {
        let (dispatcher, _) = dispatcher_with(five_peer_store());
        let before = dispatcher.listing();

        let outcome = dispatcher.dispatch(PeerRequest::from_params(Some("rename"), Some(0)));
        assert!(outcome.error().is_none());
        assert!(!outcome.is_redirect());

        let outcome = dispatcher.dispatch(PeerRequest::from_params(Some("toggle"), None));
        assert!(!outcome.is_redirect());

        assert_eq!(dispatcher.listing(), before);
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency {
    use super::*;

    /// Concurrent deletes of the same peer: exactly one wins
    #[test]
    fn test_concurrent_delete_single_winner() {
        let (dispatcher, _) = dispatcher_with(five_peer_store());
        let dispatcher = Arc::new(dispatcher);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                std::thread::spawn(move || dispatcher.delete(PeerIndex(2)).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(dispatcher.store().lock().peers.len(), 4);
    }

    /// An even number of concurrent toggles leaves the flag unchanged
    #[test]
    fn test_concurrent_toggles_are_serialized() {
        let (dispatcher, _) = dispatcher_with(five_peer_store());
        let dispatcher = Arc::new(dispatcher);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                std::thread::spawn(move || dispatcher.toggle(PeerIndex(0)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peer_enabled(&dispatcher, 0));
    }
}
