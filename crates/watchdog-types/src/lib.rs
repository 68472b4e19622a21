//! Core data model for the watchdog coordinator.
//!
//! This crate holds the types every other `watchdog-*` crate shares: node
//! identity and state (§3), the wire packet header and message vocabulary
//! (§4.1/§6.1), the cluster command bookkeeping (§4.4), and the lock/
//! failover records the coordinator keeps (§4.7/§4.8). None of these types
//! perform I/O; they are plain data plus the small amount of arithmetic the
//! specification pins down exactly (e.g. quorum, §4.6).

mod command;
mod failover;
mod lock;
mod node;
mod packet;
mod quorum;

pub use command::{CommandSource, CommandStatus, NodeCommandState};
pub use failover::{FailoverId, FailoverKind, FailoverObject};
pub use lock::{LockStatus, SubLock, SUB_LOCK_COUNT};
pub use node::{ConnState, NodeIdentity, NodeRecord, NodeState, PrivateId};
pub use packet::{PacketType, MAX_PAYLOAD_LEN};
pub use quorum::{quorum_status, QuorumStatus};
