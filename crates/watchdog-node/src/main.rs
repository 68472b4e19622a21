//! Watchdog coordinator binary.
//!
//! Loads configuration (§6.5), builds the peer-connection listener and
//! the unix-domain IPC listener, and runs the single-threaded event loop
//! (C2/C3/C4/C9/C10) until a shutdown signal or a fatal startup error.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};

use watchdog_cluster::{Runtime, RuntimeConfig};
use watchdog_config::WatchdogConfig;
use watchdog_kernel::Timing;

/// Peer-to-peer high-availability coordinator for a database-proxy pair.
#[derive(Parser)]
#[command(name = "watchdogd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `watchdog.toml`. Defaults to the working directory.
    #[arg(long)]
    config_dir: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config_dir {
        Some(dir) => WatchdogConfig::load_from_dir(dir),
        None => WatchdogConfig::load(),
    }
    .context("failed to load configuration")?;

    if let Err(e) = config.validate() {
        error!(error = %e, "configuration is invalid");
        bail!(e);
    }

    let runtime_config = build_runtime_config(&config).context("failed to resolve runtime configuration")?;

    let mut runtime = Runtime::new(runtime_config).context("failed to initialize watchdog runtime")?;
    info!(node = %config.node.node_name, "watchdog coordinator starting");

    if let Err(e) = runtime.run() {
        error!(error = %e, "watchdog runtime exited with error");
        return Err(e.into());
    }

    Ok(())
}

fn build_runtime_config(config: &WatchdogConfig) -> Result<RuntimeConfig> {
    let start_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let self_identity = config.node.to_identity(start_time);
    let listen_addr = SocketAddr::new(
        IpAddr::from([0, 0, 0, 0]),
        config.node.watchdog_port,
    );

    let mut remotes = Vec::with_capacity(config.remotes.len());
    for remote in &config.remotes {
        let identity = remote.to_identity(0);
        let addr = resolve_one(&remote.hostname, remote.watchdog_port)
            .with_context(|| format!("failed to resolve peer {}", remote.node_name))?;
        remotes.push((identity, addr));
    }

    let timing = Timing {
        beacon_interval_secs: config.timing.beacon_interval_secs,
        node_lost_secs: config.timing.unreachable_lost_secs,
        state_deadline_secs: config.timing.loading_timeout_secs,
        add_node_timeout_secs: config.timing.join_coordinator_timeout_secs,
        request_info_timeout_secs: config.timing.request_info_timeout_secs,
        stand_for_coordinator_timeout_secs: config.timing.election_timeout_secs,
        declare_coordinator_timeout_secs: config.timing.declare_coordinator_timeout_secs,
        de_escalation_wait_secs: config.timing.escalation_child_wait_secs,
    };

    let ipc_shared_key = non_empty(&config.auth.ipc_shared_key);
    let ipc_auth_key = non_empty(&config.auth.ipc_auth_key);

    Ok(RuntimeConfig {
        listen_addr,
        self_identity,
        remotes,
        auth_key: config.auth.peer_auth_key.clone(),
        escalation_command: config.escalation.escalation_command.clone(),
        de_escalation_command: config.escalation.de_escalation_command.clone(),
        timing,
        reconnect_cooldown: Duration::from_secs(config.timing.reconnect_cooldown_secs),
        node_lost: Duration::from_secs(config.timing.unreachable_lost_secs),
        ipc_socket_path: config.ipc.socket_path.clone(),
        ipc_shared_key,
        ipc_auth_key,
    })
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn resolve_one(hostname: &str, port: u16) -> Result<SocketAddr> {
    (hostname, port)
        .to_socket_addrs()
        .with_context(|| format!("could not resolve {hostname}:{port}"))?
        .next()
        .with_context(|| format!("no addresses for {hostname}:{port}"))
}
