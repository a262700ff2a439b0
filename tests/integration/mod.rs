//! Integration tests for wg-peers
//!
//! # Test Organization
//!
//! - `peer_guard`: dispatcher and guard behavior through the public API
//! - `state_file`: mutations committed to and reloaded from the state file
//! - `ipc_e2e`: server and client over a temporary Unix socket
//!
//! # Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test --test integration_tests
//!
//! # Run specific test module
//! cargo test --test integration_tests peer_guard
//! ```

pub mod ipc_e2e;
pub mod peer_guard;
pub mod state_file;
