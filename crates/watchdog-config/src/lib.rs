//! Layered configuration loading for the watchdog coordinator.
//!
//! Precedence, lowest to highest (mirrors `kimberlite-config`'s loader):
//! 1. Built-in defaults
//! 2. `~/.config/watchdog/config.toml`
//! 3. `<project_dir>/watchdog.toml`
//! 4. `WD_*` environment variables
//!
//! This crate only covers what §1/§6.5 calls the core's job: loading its
//! own identity, peer list, and the handful of knobs the core reads
//! directly. Process supervision, life-check probing, and VIP shell-outs
//! are external collaborators (§1) — this crate only records *where* to
//! find the scripts/sockets they use.

mod error;
mod loader;
mod paths;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use paths::Paths;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use watchdog_types::NodeIdentity;

/// Top-level configuration for one watchdog node (§1, §6.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub node: SelfConfig,
    pub remotes: Vec<RemoteConfig>,
    pub auth: AuthConfig,
    pub ipc: IpcConfig,
    pub escalation: EscalationConfig,
    pub network: NetworkConfig,
    pub timing: TimingConfig,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            node: SelfConfig::default(),
            remotes: Vec::new(),
            auth: AuthConfig::default(),
            ipc: IpcConfig::default(),
            escalation: EscalationConfig::default(),
            network: NetworkConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// This node's own identity (§3 "Exactly one process-wide `self` record").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfConfig {
    pub node_name: String,
    pub hostname: String,
    pub watchdog_port: u16,
    pub application_port: u16,
    pub priority: u32,
    pub delegate_ip: String,
}

impl Default for SelfConfig {
    fn default() -> Self {
        Self {
            node_name: "node0".to_string(),
            hostname: "localhost".to_string(),
            watchdog_port: 9000,
            application_port: 5432,
            priority: 1,
            delegate_ip: String::new(),
        }
    }
}

impl SelfConfig {
    /// Builds the `NodeIdentity` for this node with `private_id = 0`
    /// (§3 invariant: `self.privateID = 0`).
    pub fn to_identity(&self, start_time: u64) -> NodeIdentity {
        NodeIdentity {
            node_name: self.node_name.clone(),
            hostname: self.hostname.clone(),
            watchdog_port: self.watchdog_port,
            application_port: self.application_port,
            start_time,
            priority: self.priority,
            delegate_ip: self.delegate_ip.clone(),
            private_id: watchdog_types::PrivateId::SELF,
        }
    }
}

/// One remote peer, as configured (§3, §6.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub private_id: u32,
    pub node_name: String,
    pub hostname: String,
    pub watchdog_port: u16,
    pub application_port: u16,
    pub priority: u32,
    #[serde(default)]
    pub delegate_ip: String,
}

impl RemoteConfig {
    pub fn to_identity(&self, start_time: u64) -> NodeIdentity {
        NodeIdentity {
            node_name: self.node_name.clone(),
            hostname: self.hostname.clone(),
            watchdog_port: self.watchdog_port,
            application_port: self.application_port,
            start_time,
            priority: self.priority,
            delegate_ip: self.delegate_ip.clone(),
            private_id: watchdog_types::PrivateId(self.private_id),
        }
    }
}

/// Shared-secret auth for the peer handshake (§6.2) and the IPC
/// external-only verbs (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Peer `ADD_NODE` auth key `K` (§6.2). Empty means auth disabled.
    pub peer_auth_key: String,
    /// IPC `IPCAuthKey` for user-facing verbs (§4.9). Empty means none
    /// required.
    pub ipc_auth_key: String,
    /// IPC `IPCSharedKey` for external-only verbs (§4.9).
    pub ipc_shared_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            peer_auth_key: String::new(),
            ipc_auth_key: String::new(),
            ipc_shared_key: String::new(),
        }
    }
}

/// IPC listener configuration (§4.9, §6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    pub socket_path: PathBuf,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            socket_path: Paths::default_ipc_socket(),
        }
    }
}

/// Escalation/de-escalation program invocations (§4.10). These are
/// external subprocesses (§1); the core only forks and observes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Program + args to run to acquire the delegate IP. Empty = no-op.
    pub escalation_command: Vec<String>,
    /// Program + args to run to release the delegate IP. Empty = no-op.
    pub de_escalation_command: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            escalation_command: Vec::new(),
            de_escalation_command: Vec::new(),
        }
    }
}

/// Local network interfaces to watch for link/IP events (§1, §4.5). The
/// enumeration and kernel notifications are external (§1); this is just
/// the list of interface names the core is told to care about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub interfaces: Vec<String>,
    /// If true, a node that loses all interfaces commits suicide (exits)
    /// rather than waiting for network-up (§4.5 `IN_NETWORK_TROUBLE`).
    pub suicide_on_network_loss: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            suicide_on_network_loss: false,
        }
    }
}

/// Tunable timing constants. Defaults match the values §4 pins down
/// exactly; they're configurable because real deployments tune them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub beacon_interval_secs: u64,
    pub reconnect_cooldown_secs: u64,
    pub unreachable_lost_secs: u64,
    pub declare_coordinator_timeout_secs: u64,
    pub iam_coordinator_timeout_secs: u64,
    pub join_coordinator_timeout_secs: u64,
    pub request_info_timeout_secs: u64,
    pub loading_timeout_secs: u64,
    pub joining_timeout_secs: u64,
    pub election_timeout_secs: u64,
    pub escalation_child_wait_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            beacon_interval_secs: 10,
            reconnect_cooldown_secs: 10,
            unreachable_lost_secs: 5,
            declare_coordinator_timeout_secs: 4,
            iam_coordinator_timeout_secs: 5,
            join_coordinator_timeout_secs: 5,
            request_info_timeout_secs: 4,
            loading_timeout_secs: 5,
            joining_timeout_secs: 5,
            election_timeout_secs: 5,
            escalation_child_wait_secs: 5,
        }
    }
}

impl WatchdogConfig {
    /// Loads configuration from the default locations (§6.5).
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    pub fn load_from_dir(project_dir: impl Into<PathBuf>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Startup validation (§7 "Configuration" errors are fatal at
    /// startup).
    pub fn validate(&self) -> Result<()> {
        if self.remotes.is_empty() {
            return Err(ConfigError::Validation(
                "no remote peers configured".to_string(),
            ));
        }
        if self.auth.peer_auth_key.len() > 128 {
            return Err(ConfigError::Validation("auth key too long".to_string()));
        }
        let mut ids: Vec<u32> = self.remotes.iter().map(|r| r.private_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.remotes.len() {
            return Err(ConfigError::Validation(
                "duplicate private_id among configured remotes".to_string(),
            ));
        }
        if ids.iter().any(|&id| id == 0) {
            return Err(ConfigError::Validation(
                "private_id 0 is reserved for self".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_invalid_without_remotes() {
        let config = WatchdogConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn valid_config_passes() {
        let mut config = WatchdogConfig::default();
        config.remotes.push(RemoteConfig {
            private_id: 1,
            node_name: "node1".into(),
            hostname: "host1".into(),
            watchdog_port: 9001,
            application_port: 5432,
            priority: 1,
            delegate_ip: String::new(),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_private_ids() {
        let mut config = WatchdogConfig::default();
        for _ in 0..2 {
            config.remotes.push(RemoteConfig {
                private_id: 1,
                node_name: "dup".into(),
                hostname: "host1".into(),
                watchdog_port: 9001,
                application_port: 5432,
                priority: 1,
                delegate_ip: String::new(),
            });
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn self_identity_has_private_id_zero() {
        let config = SelfConfig::default();
        let identity = config.to_identity(42);
        assert!(identity.private_id.is_self());
        assert_eq!(identity.start_time, 42);
    }
}
