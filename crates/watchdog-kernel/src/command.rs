//! Cluster command issuance requests the kernel hands to its runtime
//! (§2 data flow, §4.4).
//!
//! The kernel decides *what* to send and to *whom*; the runtime (C2+C3+C4,
//! `watchdog-cluster`) is the only thing that actually owns sockets,
//! drives send/reply bookkeeping, and raises
//! [`crate::event::WatchdogEvent::CommandFinished`] back in.

use watchdog_types::{CommandSource, PrivateId};

/// Local, monotonically-allocated command identifier (§4.4
/// "CommandID allocation"). Unique only local-to-sender (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(pub u32);

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who a cluster command should be sent to (§4.4 "Issuing a command").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    One(PrivateId),
    All,
    AllExceptSource(PrivateId),
}

/// A request, produced by the kernel, to broadcast/unicast a packet and
/// track its replies.
#[derive(Debug, Clone)]
pub struct IssueCommand {
    pub command_id: CommandId,
    pub source: CommandSource,
    pub target: Target,
    pub packet_type: watchdog_types::PacketType,
    pub payload: Vec<u8>,
    pub timeout_secs: u64,
}

/// Monotonic command-ID allocator, starting at 1 (§4.4).
#[derive(Debug, Default)]
pub struct CommandIdAllocator {
    next: u32,
}

impl CommandIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> CommandId {
        let id = CommandId(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_starts_at_one_and_is_monotonic() {
        let mut alloc = CommandIdAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!(a.0, 1);
        assert_eq!(b.0, 2);
    }
}
