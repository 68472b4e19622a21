//! Side effects the kernel asks its runtime to perform (§4.10, §6.4).
//!
//! The kernel never forks a process or writes to an IPC socket itself;
//! it only describes *what* should happen, in the FCIS style used by
//! the rest of this workspace's cores.

use serde::Serialize;

use watchdog_types::{FailoverId, PrivateId};

/// A push notification the IPC server (C9) forwards to every socket
/// registered via `REGISTER_FOR_NOTIFICATION` (§6.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Notification {
    MembershipChanged,
    QuorumChanged,
    NewMaster(PrivateId),
}

/// An effect the kernel wants its runtime to carry out. None of these
/// are awaited by the kernel; outcomes (if any) come back as new
/// [`crate::event::WatchdogEvent`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fork the escalation (VIP-up) program (§4.10).
    EscalateVip,
    /// Fork the de-escalation (VIP-down) program (§4.10).
    DeEscalateVip,
    /// Invoke the host's `onFailback` callback (§6.4).
    CallbackFailback {
        node_ids: Vec<PrivateId>,
        failover_id: FailoverId,
    },
    /// Invoke the host's `onDegenerate` callback (§6.4).
    CallbackDegenerate {
        node_ids: Vec<PrivateId>,
        failover_id: FailoverId,
    },
    /// Invoke the host's `onPromote` callback (§6.4).
    CallbackPromote {
        node_id: PrivateId,
        failover_id: FailoverId,
    },
    /// Push a notification to every IPC subscriber.
    NotifyIpc(Notification),
    /// Exit the process after the current tick (§4.5 IN_NETWORK_TROUBLE
    /// suicide policy, §4.3 signal handling).
    Exit,
}
