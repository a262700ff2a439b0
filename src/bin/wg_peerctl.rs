//! wg-peerctl: command-line client for the wg-peers daemon
//!
//! # Usage
//!
//! ```bash
//! wg-peerctl list
//! wg-peerctl toggle 3
//! wg-peerctl -s /tmp/wg-peers.sock delete 3
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use wg_peers::dispatch::PeerRequest;
use wg_peers::ipc::{IpcClient, IpcResponse, TunnelInfo};
use wg_peers::listing::{PeerListing, PeerStatus};
use wg_peers::store::PeerIndex;

const DEFAULT_SOCKET: &str = "/var/run/wg-peers.sock";

fn print_help() {
    println!(
        r"wg-peerctl v{}

USAGE:
    wg-peerctl [-s <SOCKET>] <COMMAND>

COMMANDS:
    list              List peers
    tunnels           List tunnels and their interface assignment
    show <PEER>       Show a peer record
    toggle <PEER>     Enable or disable a peer
    delete <PEER>     Delete a peer
    reload            Reload the state file
    status            Show daemon status
    ping              Check that the daemon is alive

OPTIONS:
    -s, --socket <PATH>   IPC socket path [default: {DEFAULT_SOCKET}]
    -h, --help            Print help information
",
        wg_peers::VERSION
    );
}

fn parse_peer(arg: Option<String>) -> Result<PeerIndex> {
    let raw = arg.context("missing peer index")?;
    let index: u32 = raw
        .parse()
        .with_context(|| format!("invalid peer index: {raw}"))?;
    Ok(PeerIndex(index))
}

fn print_listing(listing: &PeerListing) {
    match listing {
        PeerListing::Empty => {
            println!("No WireGuard peers have been configured.");
        }
        PeerListing::Rows { rows } => {
            println!(
                "{:<5} {:<12} {:<20} {:<16} {:<20} {:<20} {:<20} {:<6} {}",
                "PEER", "TUNNEL", "DESCRIPTION", "PUBLIC KEY", "PEER ADDRESS", "ALLOWED IPS",
                "ENDPOINT", "PORT", "STATUS"
            );
            for row in rows {
                let status = match row.status {
                    PeerStatus::Enabled => "enabled",
                    PeerStatus::Disabled => "disabled",
                };
                println!(
                    "{:<5} {:<12} {:<20} {:<16} {:<20} {:<20} {:<20} {:<6} {}",
                    row.index.0,
                    row.tunnel,
                    row.description,
                    row.public_key,
                    row.peer_address.as_deref().unwrap_or("-"),
                    row.allowed_ips.as_deref().unwrap_or("-"),
                    if row.endpoint.is_empty() { "(dynamic)" } else { row.endpoint.as_str() },
                    row.port.map(|p| p.to_string()).unwrap_or_default(),
                    status
                );
            }
        }
    }
}

fn print_tunnels(tunnels: &[TunnelInfo]) {
    for tunnel in tunnels {
        println!(
            "{:<5} {:<16} {:<9} {}",
            tunnel.index.0,
            tunnel.name,
            if tunnel.enabled { "enabled" } else { "disabled" },
            if tunnel.assigned { "assigned" } else { "-" }
        );
    }
}

/// Parsed command line action
enum Command {
    List,
    Tunnels,
    Show(PeerIndex),
    Request(PeerRequest),
    Reload,
    Status,
    Ping,
}

async fn run(client: &IpcClient, command: Command) -> Result<()> {
    match command {
        Command::List => print_listing(&client.list_peers().await?),
        Command::Tunnels => print_tunnels(&client.list_tunnels().await?),
        Command::Show(peer) => {
            let record = client.get_peer(peer).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Request(request) => match client.peer_request(request).await? {
            IpcResponse::Redirect { .. } => println!("ok"),
            IpcResponse::Rejected { message, .. } => bail!("{message}"),
            IpcResponse::Error(e) => bail!("{e}"),
            other => bail!("unexpected response: {other:?}"),
        },
        Command::Reload => println!("{}", client.reload().await?),
        Command::Status => {
            let status = client.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Ping => {
            if !client.ping().await? {
                bail!("daemon did not answer the ping");
            }
            println!("pong");
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut socket = PathBuf::from(DEFAULT_SOCKET);
    let mut command = None;

    while let Some(arg) = args.next() {
        command = Some(match arg.as_str() {
            "-s" | "--socket" => {
                socket = PathBuf::from(args.next().context("missing socket path")?);
                continue;
            }
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "list" => Command::List,
            "tunnels" => Command::Tunnels,
            "status" => Command::Status,
            "ping" => Command::Ping,
            "reload" => Command::Reload,
            "show" => Command::Show(parse_peer(args.next())?),
            "toggle" => Command::Request(PeerRequest::toggle(parse_peer(args.next())?)),
            "delete" => Command::Request(PeerRequest::delete(parse_peer(args.next())?)),
            other => {
                print_help();
                bail!("unknown argument: {other}");
            }
        });
    }

    let Some(command) = command else {
        print_help();
        bail!("no command given");
    };

    let client = IpcClient::new(&socket);
    run(&client, command)
        .await
        .with_context(|| format!("wg-peers at {}", socket.display()))
}
