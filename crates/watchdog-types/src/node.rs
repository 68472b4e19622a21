//! Node identity and per-peer state (§3).

use serde::{Deserialize, Serialize};

/// Index of a peer into the fixed-size peer array.
///
/// Stable indices replace owning references between records (§9 "Cyclic
/// refs"): the master pointer, lock holder, and failover requester are all
/// a `PrivateId` plus an identity check on deref, never a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrivateId(pub u32);

impl PrivateId {
    /// The identity reserved for the local node (§3 invariant).
    pub const SELF: PrivateId = PrivateId(0);

    pub fn is_self(self) -> bool {
        self == Self::SELF
    }
}

impl std::fmt::Display for PrivateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable facts about a peer, established at configuration time (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub node_name: String,
    pub hostname: String,
    pub watchdog_port: u16,
    pub application_port: u16,
    pub start_time: u64,
    pub priority: u32,
    /// Empty string means this node has no delegate (virtual) IP.
    pub delegate_ip: String,
    pub private_id: PrivateId,
}

impl NodeIdentity {
    pub fn has_delegate_ip(&self) -> bool {
        !self.delegate_ip.is_empty()
    }
}

/// The node's finite-state-automaton state (§3, §4.5).
///
/// Variant order and naming follow the source's `wd_state_names` table
/// 1:1 (`MASTER` → `Coordinator`, `STANDING FOR MASTER` →
/// `StandForCoordinator`, `PARTICIPATING IN ELECTION` →
/// `ParticipateInElection`) so that every state the original enumerates
/// has exactly one counterpart here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    Dead,
    Loading,
    Joining,
    Initializing,
    Coordinator,
    ParticipateInElection,
    StandForCoordinator,
    Standby,
    Lost,
    InNetworkTrouble,
    Shutdown,
    /// Transitional: we've sent `ADD_NODE` to this peer and are waiting on
    /// its handshake reply.
    AddMessageSent,
}

impl NodeState {
    /// A record is *active* iff its state is not one of these three (§3).
    pub fn is_active(self) -> bool {
        !matches!(self, NodeState::Dead | NodeState::Lost | NodeState::Shutdown)
    }
}

/// State of one of a peer's two independent TCP sockets (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnState {
    #[default]
    Disconnected,
    WaitingForConnect,
    Connected,
}

impl ConnState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnState::Connected)
    }
}

/// The mutable per-peer record (§3), including the record for `self`.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub identity: NodeIdentity,
    pub state: NodeState,
    /// Outbound socket: the connection we opened to this peer.
    pub client_conn: ConnState,
    /// Inbound socket: the connection this peer opened to us.
    pub server_conn: ConnState,
    /// Seconds since the UNIX epoch of the last packet we sent this peer
    /// that is awaiting a reply (used for reply timeouts).
    pub last_sent: u64,
    /// Seconds since the UNIX epoch of the last packet received from this
    /// peer (used for beacon/liveness timeouts).
    pub last_received: u64,
    /// Timestamp of the last outbound connect attempt, for the 10s
    /// reconnect cooldown (§4.2).
    pub last_connect_attempt: u64,
}

impl NodeRecord {
    pub fn new(identity: NodeIdentity, now: u64) -> Self {
        Self {
            identity,
            state: NodeState::Loading,
            client_conn: ConnState::Disconnected,
            server_conn: ConnState::Disconnected,
            last_sent: now,
            last_received: now,
            last_connect_attempt: 0,
        }
    }

    /// A record is *reachable* iff at least one of its two connections is
    /// connected (§3 invariant I1).
    pub fn is_reachable(&self) -> bool {
        self.client_conn.is_connected() || self.server_conn.is_connected()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: u32) -> NodeIdentity {
        NodeIdentity {
            node_name: format!("node{id}"),
            hostname: "localhost".into(),
            watchdog_port: 9000 + id as u16,
            application_port: 5432,
            start_time: 100,
            priority: 1,
            delegate_ip: String::new(),
            private_id: PrivateId(id),
        }
    }

    #[test]
    fn self_private_id_is_zero() {
        assert!(PrivateId::SELF.is_self());
        assert!(!PrivateId(1).is_self());
    }

    #[test]
    fn reachable_iff_either_socket_connected() {
        let mut rec = NodeRecord::new(identity(1), 0);
        assert!(!rec.is_reachable());
        rec.client_conn = ConnState::Connected;
        assert!(rec.is_reachable());
        rec.client_conn = ConnState::Disconnected;
        rec.server_conn = ConnState::Connected;
        assert!(rec.is_reachable());
    }

    #[test]
    fn active_excludes_dead_lost_shutdown() {
        let mut rec = NodeRecord::new(identity(1), 0);
        for s in [NodeState::Dead, NodeState::Lost, NodeState::Shutdown] {
            rec.state = s;
            assert!(!rec.is_active(), "{s:?} must not be active");
        }
        for s in [
            NodeState::Loading,
            NodeState::Joining,
            NodeState::Standby,
            NodeState::Coordinator,
        ] {
            rec.state = s;
            assert!(rec.is_active(), "{s:?} must be active");
        }
    }

    #[test]
    fn no_delegate_ip_when_empty() {
        let id = identity(1);
        assert!(!id.has_delegate_ip());
    }
}
