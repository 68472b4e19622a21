//! Cluster Command Tracker (C4, §4.4, invariant I2).
//!
//! Correlates outgoing broadcasts/unicasts with per-peer replies. The
//! kernel decides *what* to send; this tracker decides *who actually got
//! it* and *when the command is done*, then hands a
//! [`watchdog_kernel::WatchdogEvent::CommandFinished`] back to the
//! kernel.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use watchdog_types::{CommandSource, CommandStatus, NodeCommandState, PrivateId};

#[derive(Debug)]
pub struct TrackedCommand {
    pub command_id: watchdog_kernel::CommandId,
    pub source: CommandSource,
    pub per_peer: HashMap<PrivateId, NodeCommandState>,
    pub send_count: u32,
    pub reply_count: u32,
    pub error_count: u32,
    pub deadline: Instant,
    pub status: CommandStatus,
}

impl TrackedCommand {
    pub fn new(
        command_id: watchdog_kernel::CommandId,
        source: CommandSource,
        targets: &[PrivateId],
        timeout: Duration,
        now: Instant,
    ) -> Self {
        let mut per_peer = HashMap::new();
        for &peer in targets {
            per_peer.insert(peer, NodeCommandState::Init);
        }
        Self {
            command_id,
            source,
            per_peer,
            send_count: 0,
            reply_count: 0,
            error_count: 0,
            deadline: now + timeout,
            status: CommandStatus::InProgress,
        }
    }

    pub fn mark_sent(&mut self, peer: PrivateId) {
        if let Some(state) = self.per_peer.get_mut(&peer) {
            *state = NodeCommandState::Sent;
            self.send_count += 1;
        }
    }

    pub fn mark_send_error(&mut self, peer: PrivateId) {
        if let Some(state) = self.per_peer.get_mut(&peer) {
            *state = NodeCommandState::SendError;
            self.error_count += 1;
        }
    }

    pub fn mark_do_not_send(&mut self, peer: PrivateId) {
        if let Some(state) = self.per_peer.get_mut(&peer) {
            *state = NodeCommandState::DoNotSend;
        }
    }

    /// Records a reply and returns `true` if that reply was itself a
    /// reject/error (§4.4 "short-circuits").
    pub fn mark_replied(&mut self, peer: PrivateId, was_rejection: bool) {
        if let Some(state) = self.per_peer.get_mut(&peer) {
            if matches!(state, NodeCommandState::Sent) {
                self.reply_count += 1;
            }
            *state = NodeCommandState::Replied;
        }
        if was_rejection {
            self.status = CommandStatus::Rejected;
        }
    }

    /// A peer we were waiting on became LOST; drop its slot (§4.4).
    pub fn drop_peer(&mut self, peer: PrivateId) {
        if let Some(state) = self.per_peer.get_mut(&peer) {
            if matches!(state, NodeCommandState::Sent) {
                self.send_count = self.send_count.saturating_sub(1);
            }
            *state = NodeCommandState::DoNotSend;
        }
    }

    /// Re-evaluates `status`, per §4.4's finalization predicates and
    /// invariant I2. Call after every mutation.
    pub fn recompute_status(&mut self, now: Instant) {
        if self.status.is_finalized() {
            return;
        }
        if now >= self.deadline {
            self.status = CommandStatus::Timeout;
            return;
        }
        let all_settled = self
            .per_peer
            .values()
            .all(|s| matches!(s, NodeCommandState::Replied | NodeCommandState::DoNotSend));
        if all_settled && self.send_count <= self.reply_count {
            self.status = CommandStatus::AllReplied;
        }
    }
}

/// Owns every in-flight cluster command, keyed by command id.
#[derive(Default)]
pub struct CommandTracker {
    commands: HashMap<u32, TrackedCommand>,
}

impl CommandTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, command: TrackedCommand) {
        self.commands.insert(command.command_id.0, command);
    }

    pub fn get_mut(&mut self, command_id: watchdog_kernel::CommandId) -> Option<&mut TrackedCommand> {
        self.commands.get_mut(&command_id.0)
    }

    /// Removes and returns every command whose status just finalized,
    /// for the caller to raise `CommandFinished` events and dispose of
    /// (§4.4: "the tracker does not dispose the record until the state
    /// machine returns").
    pub fn drain_finalized(&mut self, now: Instant) -> Vec<TrackedCommand> {
        for cmd in self.commands.values_mut() {
            cmd.recompute_status(now);
        }
        let finalized: Vec<u32> = self
            .commands
            .iter()
            .filter(|(_, c)| c.status.is_finalized())
            .map(|(id, _)| *id)
            .collect();
        finalized
            .into_iter()
            .filter_map(|id| self.commands.remove(&id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchdog_kernel::CommandId;

    #[test]
    fn finalizes_once_every_sent_peer_replies() {
        let now = Instant::now();
        let mut cmd = TrackedCommand::new(
            CommandId(1),
            CommandSource::Internal,
            &[PrivateId(1), PrivateId(2)],
            Duration::from_secs(5),
            now,
        );
        cmd.mark_sent(PrivateId(1));
        cmd.mark_sent(PrivateId(2));
        cmd.mark_replied(PrivateId(1), false);
        cmd.recompute_status(now);
        assert_eq!(cmd.status, CommandStatus::InProgress);
        cmd.mark_replied(PrivateId(2), false);
        cmd.recompute_status(now);
        assert_eq!(cmd.status, CommandStatus::AllReplied);
    }

    #[test]
    fn reject_short_circuits() {
        let now = Instant::now();
        let mut cmd = TrackedCommand::new(
            CommandId(1),
            CommandSource::Internal,
            &[PrivateId(1), PrivateId(2)],
            Duration::from_secs(5),
            now,
        );
        cmd.mark_sent(PrivateId(1));
        cmd.mark_sent(PrivateId(2));
        cmd.mark_replied(PrivateId(1), true);
        cmd.recompute_status(now);
        assert_eq!(cmd.status, CommandStatus::Rejected);
    }

    #[test]
    fn dropping_last_outstanding_peer_completes_command() {
        let now = Instant::now();
        let mut cmd = TrackedCommand::new(
            CommandId(1),
            CommandSource::Internal,
            &[PrivateId(1), PrivateId(2)],
            Duration::from_secs(5),
            now,
        );
        cmd.mark_sent(PrivateId(1));
        cmd.mark_sent(PrivateId(2));
        cmd.mark_replied(PrivateId(1), false);
        cmd.drop_peer(PrivateId(2));
        cmd.recompute_status(now);
        assert_eq!(cmd.status, CommandStatus::AllReplied);
    }

    #[test]
    fn past_deadline_times_out() {
        let now = Instant::now();
        let mut cmd = TrackedCommand::new(
            CommandId(1),
            CommandSource::Internal,
            &[PrivateId(1)],
            Duration::from_secs(0),
            now,
        );
        cmd.mark_sent(PrivateId(1));
        cmd.recompute_status(now + Duration::from_millis(1));
        assert_eq!(cmd.status, CommandStatus::Timeout);
    }
}
