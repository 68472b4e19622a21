//! The 15 event kinds the state machine reacts to (§2 C5, §4.5).
//!
//! Names follow the source's `wd_event_name` table: `STATE CHANGED`,
//! `TIMEOUT`, `PACKET RECEIVED`, `COMMAND FINISHED`,
//! `NEW OUTBOUND_CONNECTION`, `NETWORK IP IS REMOVED`,
//! `NETWORK IP IS ASSIGNED`, `NETWORK LINK IS INACTIVE`,
//! `NETWORK LINK IS ACTIVE`, `THIS NODE LOST`, `REMOTE NODE LOST`,
//! `REMOTE NODE FOUND`, `THIS NODE FOUND`, `NODE CONNECTION LOST`,
//! `NODE CONNECTION FOUND`.

use watchdog_types::{CommandStatus, PrivateId};

use crate::command::CommandId;
use crate::packet::IncomingPacket;

/// A timer that fired (§4.3 "process one-shot timeout").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// The bound on the current state's entry action (LOADING/JOINING/
    /// STAND_FOR_COORDINATOR/PARTICIPATE_IN_ELECTION all have one, §4.5).
    StateDeadline,
    /// STANDBY's beacon-silence timers (§4.5 "Beacon silence").
    BeaconRequestInfo,
    BeaconReElect,
}

#[derive(Debug, Clone)]
pub enum WatchdogEvent {
    /// A state transition just happened (re-entrant notification, used to
    /// drive the escalation supervisor and IPC notifications — §4.5,
    /// §4.10).
    StateChanged {
        node: PrivateId,
        from: watchdog_types::NodeState,
        to: watchdog_types::NodeState,
    },
    /// A virtual timer fired (§4.3, §5).
    Timeout(TimeoutKind),
    /// A framed packet arrived from a peer (§4.1, dispatched by C3).
    PacketReceived(IncomingPacket),
    /// A cluster command reached a terminal status (§4.4).
    CommandFinished {
        command_id: CommandId,
        status: CommandStatus,
    },
    /// An outbound TCP connect finished successfully (§4.2).
    NewOutboundConnection { peer: PrivateId },
    /// The local delegate IP disappeared from every interface (§4.5).
    NetworkIpRemoved,
    /// The local delegate IP is present again.
    NetworkIpAssigned,
    /// A monitored network link went down.
    NetworkLinkInactive,
    /// A monitored network link came back up.
    NetworkLinkActive,
    /// The life-check collaborator (§1) reports we ourselves are
    /// unreachable.
    ThisNodeLost,
    /// The life-check collaborator reports a peer is down (feeds
    /// `NODE_STATUS_CHANGE`, §4.9).
    RemoteNodeLost { peer: PrivateId },
    /// The life-check collaborator reports a peer is back up.
    RemoteNodeFound { peer: PrivateId },
    /// We ourselves are reachable again.
    ThisNodeFound,
    /// Both sockets to a peer are gone (§3 "reachable").
    NodeConnectionLost { peer: PrivateId },
    /// At least one socket to a peer is connected again.
    NodeConnectionFound { peer: PrivateId },
}
