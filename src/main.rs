//! wg-peers: WireGuard peer management daemon
//!
//! Loads the tunnel and peer state file and serves the IPC control socket.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! ./wg-peers
//!
//! # Run with custom configuration
//! ./wg-peers -c /path/to/config.json
//!
//! # Run with environment overrides
//! WG_PEERS_LOG_LEVEL=debug ./wg-peers
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use wg_peers::assignment::InterfaceAssignments;
use wg_peers::config::{load_config_with_env, Config};
use wg_peers::dispatch::Dispatcher;
use wg_peers::ipc::{IpcHandler, IpcServer};
use wg_peers::store::{ConfigStore, JsonStateFile, StoreCommit};
use wg_peers::StateError;

/// Command-line arguments
struct Args {
    /// Configuration file path
    config_path: PathBuf,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config_path = PathBuf::from("/etc/wg-peers/config.json");
        let mut generate_config = false;
        let mut check_config = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    if let Some(path) = args.next() {
                        config_path = PathBuf::from(path);
                    }
                }
                "-g" | "--generate-config" => {
                    generate_config = true;
                }
                "--check" => {
                    check_config = true;
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("wg-peers v{}", wg_peers::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {arg}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        Self {
            config_path,
            generate_config,
            check_config,
        }
    }
}

fn print_help() {
    println!(
        r"wg-peers v{}

WireGuard peer management daemon.

USAGE:
    wg-peers [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Configuration file path [default: /etc/wg-peers/config.json]
    -g, --generate-config   Generate default configuration and exit
    --check                 Check configuration and state file, then exit
    -h, --help              Print help information
    -v, --version           Print version information

ENVIRONMENT:
    WG_PEERS_STATE_PATH     Override state file path
    WG_PEERS_LOG_LEVEL      Override log level (trace, debug, info, warn, error)
    WG_PEERS_IPC_SOCKET     Override IPC socket path
",
        wg_peers::VERSION
    );
}

/// Initialize logging
fn init_logging(config: &Config) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log.target);

    if config.log.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Load the state file, starting empty if it does not exist yet
fn load_store(state: &JsonStateFile) -> Result<ConfigStore> {
    match state.load() {
        Ok(store) => Ok(store),
        Err(StateError::FileNotFound { path }) => {
            warn!("State file {} not found, starting with no tunnels or peers", path);
            let store = ConfigStore::new();
            state.commit(&store)?;
            Ok(store)
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to load state from {:?}: {}",
            state.path(),
            e
        )),
    }
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();

    let args = Args::parse();

    if args.generate_config {
        wg_peers::config::create_default_config(&args.config_path)?;
        println!("Generated default configuration at {:?}", args.config_path);
        return Ok(());
    }

    let config = load_config_with_env(&args.config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {:?}: {}",
            args.config_path,
            e
        )
    })?;

    let state = Arc::new(JsonStateFile::new(&config.state_path));

    if args.check_config {
        state.load()?;
        println!("Configuration is valid");
        return Ok(());
    }

    init_logging(&config);

    info!("wg-peers v{}", wg_peers::VERSION);
    info!("Configuration loaded from {:?}", args.config_path);

    let store = load_store(&state)?;
    info!(
        tunnels = store.tunnels.len(),
        peers = store.peers.len(),
        "State loaded from {:?}",
        state.path()
    );

    let assignments = Arc::new(InterfaceAssignments::from_config(&config.interfaces));
    let dispatcher = Arc::new(Dispatcher::new(
        store.into_shared(),
        assignments.clone(),
        state.clone(),
    ));

    let ipc_handler = Arc::new(IpcHandler::new(
        dispatcher,
        assignments,
        Some(config.state_path.clone()),
    ));
    let mut ipc_shutdown_rx = ipc_handler.subscribe_shutdown();

    let ipc_server = IpcServer::new(config.ipc.clone(), Arc::clone(&ipc_handler));
    let ipc_shutdown = ipc_server.shutdown_sender();

    let ipc_handle = tokio::spawn(async move {
        if let Err(e) = ipc_server.run().await {
            error!("IPC server error: {}", e);
        }
    });

    info!(
        "Startup complete in {:.2}ms",
        start_time.elapsed().as_secs_f64() * 1000.0
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, initiating shutdown...");
        }
        () = wait_for_sigterm() => {
            info!("Received SIGTERM, initiating shutdown...");
        }
        _ = ipc_shutdown_rx.recv() => {
            info!("Shutdown requested over IPC");
        }
    }

    info!("Shutting down...");

    let _ = ipc_shutdown.send(());
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), ipc_handle).await;

    info!("Shutdown complete");

    Ok(())
}

/// Wait for SIGTERM signal
#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await;
}
