//! Configuration module for wg-peers
//!
//! This module provides configuration types and loading utilities.
//!
//! # Example
//!
//! ```no_run
//! use wg_peers::config::{load_config, Config};
//!
//! let config = load_config("/etc/wg-peers/config.json").unwrap();
//! println!("State file: {:?}", config.state_path);
//! ```

mod loader;
mod types;

pub use loader::{create_default_config, load_config, load_config_str, load_config_with_env};
pub use types::{Config, InterfaceAssignment, IpcConfig, LogConfig};
