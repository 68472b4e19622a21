//! The state-machine core (C5), quorum tracking (C6), lock service (C7),
//! and failover registry (C8), all held in one aggregate (§9 "Global
//! mutable state": "confined to one `cluster` aggregate owned by the
//! loop; nothing else writes to it").
//!
//! `Cluster` is the pure kernel: it owns no sockets, starts no timers,
//! and forks no processes. Every transition is driven by a
//! [`WatchdogEvent`] fed in by the runtime and answered with a
//! [`KernelOutput`] describing what to send and what side effects to
//! run.

use std::cmp::Ordering;
use std::collections::HashMap;

use watchdog_types::{
    quorum_status, CommandSource, CommandStatus, FailoverId, FailoverKind, FailoverObject,
    LockStatus, NodeIdentity, NodeRecord, NodeState, PacketType, PrivateId, QuorumStatus,
    SubLock, SUB_LOCK_COUNT,
};
use watchdog_wire::{FailoverRequestPayload, MembershipPayload};

use crate::command::{CommandId, CommandIdAllocator, IssueCommand, Target};
use crate::effect::{Effect, Notification};
use crate::election;
use crate::event::{TimeoutKind, WatchdogEvent};
use crate::output::KernelOutput;
use crate::packet::IncomingPacket;

/// Wall-clock durations that drive state-level deadlines not already
/// carried by a tracked cluster command (§4.3, §4.5).
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub beacon_interval_secs: u64,
    pub node_lost_secs: u64,
    pub state_deadline_secs: u64,
    pub add_node_timeout_secs: u64,
    pub request_info_timeout_secs: u64,
    pub stand_for_coordinator_timeout_secs: u64,
    pub declare_coordinator_timeout_secs: u64,
    pub de_escalation_wait_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            beacon_interval_secs: 10,
            node_lost_secs: 5,
            state_deadline_secs: 5,
            add_node_timeout_secs: 5,
            request_info_timeout_secs: 4,
            stand_for_coordinator_timeout_secs: 4,
            declare_coordinator_timeout_secs: 4,
            de_escalation_wait_secs: 5,
        }
    }
}

/// What an outstanding cluster command was issued to accomplish, so its
/// `COMMAND_FINISHED` event can be routed back to the right state-entry
/// logic (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingPurpose {
    AddNode,
    RequestInfo,
    StandForCoordinator,
    DeclareCoordinator,
}

#[derive(Debug, Default)]
struct LockTable {
    holder: Option<PrivateId>,
    sub_locks: [bool; SUB_LOCK_COUNT],
}

impl LockTable {
    fn clear(&mut self) {
        self.holder = None;
        self.sub_locks = [false; SUB_LOCK_COUNT];
    }

    fn status(&self, failover_exists: bool) -> LockStatus {
        match self.holder {
            Some(_) => LockStatus::Locked,
            None if failover_exists => LockStatus::NoHolderButWait,
            None => LockStatus::NoHolder,
        }
    }
}

/// Outcome of admitting a failover request (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverAdmission {
    Proceed(FailoverId),
    AlreadyIssued(FailoverId),
    Rejected,
}

pub struct Cluster {
    self_identity: NodeIdentity,
    remotes: Vec<PrivateId>,
    nodes: HashMap<PrivateId, NodeRecord>,
    master: Option<PrivateId>,
    quorum: QuorumStatus,
    lock: LockTable,
    failovers: Vec<FailoverObject>,
    cmd_alloc: CommandIdAllocator,
    pending: Option<(CommandId, PendingPurpose)>,
    escalated: bool,
    timing: Timing,
    auth_key: String,
    /// First `STAND_FOR_COORDINATOR` seen from each candidate this
    /// election round (§4.5 exact-tie rule, I5).
    stand_for_seen: HashMap<PrivateId, ()>,
    switching_externally_signaled: bool,
}

impl Cluster {
    /// Builds a fresh kernel and immediately enters `LOADING` (§4.5).
    pub fn new(
        self_identity: NodeIdentity,
        remote_identities: Vec<NodeIdentity>,
        auth_key: String,
        timing: Timing,
        now: u64,
    ) -> (Self, KernelOutput) {
        let mut nodes = HashMap::new();
        let mut remotes = Vec::with_capacity(remote_identities.len());
        for identity in remote_identities {
            remotes.push(identity.private_id);
            nodes.insert(identity.private_id, NodeRecord::new(identity, now));
        }
        remotes.sort_unstable();
        nodes.insert(
            self_identity.private_id,
            NodeRecord::new(self_identity.clone(), now),
        );

        let mut cluster = Self {
            self_identity,
            remotes,
            nodes,
            master: None,
            quorum: QuorumStatus::Lost,
            lock: LockTable::default(),
            failovers: Vec::new(),
            cmd_alloc: CommandIdAllocator::new(),
            pending: None,
            escalated: false,
            timing,
            auth_key,
            stand_for_seen: HashMap::new(),
            switching_externally_signaled: false,
        };
        let out = cluster.enter_loading(now);
        (cluster, out)
    }

    pub fn self_state(&self) -> NodeState {
        self.nodes[&self.self_identity.private_id].state
    }

    pub fn master(&self) -> Option<PrivateId> {
        self.master
    }

    pub fn quorum(&self) -> QuorumStatus {
        self.quorum
    }

    pub fn is_escalated(&self) -> bool {
        self.escalated
    }

    pub fn node_record(&self, id: PrivateId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn node_records(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    // ---- top-level dispatch -------------------------------------------------

    pub fn handle_event(&mut self, event: WatchdogEvent, now: u64) -> KernelOutput {
        match event {
            WatchdogEvent::StateChanged { .. } => KernelOutput::new(),
            WatchdogEvent::Timeout(kind) => self.on_timeout(kind, now),
            WatchdogEvent::PacketReceived(packet) => self.on_packet(packet, now),
            WatchdogEvent::CommandFinished { command_id, status } => {
                self.on_command_finished(command_id, status, now)
            }
            WatchdogEvent::NewOutboundConnection { peer } | WatchdogEvent::NodeConnectionFound { peer } => {
                if let Some(rec) = self.nodes.get_mut(&peer) {
                    rec.client_conn = watchdog_types::ConnState::Connected;
                }
                KernelOutput::new()
            }
            WatchdogEvent::NodeConnectionLost { peer } => {
                if let Some(rec) = self.nodes.get_mut(&peer) {
                    rec.client_conn = watchdog_types::ConnState::Disconnected;
                    rec.server_conn = watchdog_types::ConnState::Disconnected;
                }
                KernelOutput::new()
            }
            WatchdogEvent::NetworkIpRemoved | WatchdogEvent::NetworkLinkInactive => {
                self.enter_in_network_trouble(now)
            }
            WatchdogEvent::NetworkIpAssigned | WatchdogEvent::NetworkLinkActive | WatchdogEvent::ThisNodeFound => {
                self.on_network_recovered(now)
            }
            WatchdogEvent::ThisNodeLost => self.enter_in_network_trouble(now),
            WatchdogEvent::RemoteNodeLost { peer } => self.mark_peer_lost(peer, now),
            WatchdogEvent::RemoteNodeFound { peer } => self.mark_peer_found(peer, now),
        }
    }

    // ---- state entry ---------------------------------------------------------

    fn transition_self(&mut self, to: NodeState) -> NodeState {
        let rec = self.nodes.get_mut(&self.self_identity.private_id).expect("self record always present");
        let from = rec.state;
        rec.state = to;
        from
    }

    fn enter_loading(&mut self, now: u64) -> KernelOutput {
        self.transition_self(NodeState::Loading);
        self.master = None;
        let payload = self.membership_payload(NodeState::Loading, now);
        self.issue(
            Target::All,
            PacketType::AddNode,
            payload,
            CommandSource::Internal,
            self.timing.add_node_timeout_secs,
            PendingPurpose::AddNode,
        )
    }

    fn enter_joining(&mut self, now: u64) -> KernelOutput {
        self.transition_self(NodeState::Joining);
        self.master = None;
        let payload = self.membership_payload(NodeState::Joining, now);
        self.issue(
            Target::All,
            PacketType::RequestInfo,
            payload,
            CommandSource::Internal,
            self.timing.request_info_timeout_secs,
            PendingPurpose::RequestInfo,
        )
    }

    fn enter_initializing(&mut self, now: u64) -> KernelOutput {
        self.transition_self(NodeState::Initializing);

        if let Some(coordinator) = self
            .remotes
            .iter()
            .copied()
            .find(|id| self.nodes[id].state == NodeState::Coordinator)
        {
            self.master = Some(coordinator);
            return self.enter_standby(now);
        }

        if self.remotes.is_empty() {
            return self.enter_coordinator(now);
        }

        if self
            .remotes
            .iter()
            .any(|id| self.nodes[id].state == NodeState::StandForCoordinator)
        {
            return self.enter_participate_in_election(now);
        }

        self.enter_stand_for_coordinator(now)
    }

    fn enter_stand_for_coordinator(&mut self, now: u64) -> KernelOutput {
        self.transition_self(NodeState::StandForCoordinator);
        self.stand_for_seen.clear();
        let payload = self.membership_payload(NodeState::StandForCoordinator, now);
        self.issue(
            Target::All,
            PacketType::StandForCoordinator,
            payload,
            CommandSource::Internal,
            self.timing.stand_for_coordinator_timeout_secs,
            PendingPurpose::StandForCoordinator,
        )
    }

    fn enter_participate_in_election(&mut self, now: u64) -> KernelOutput {
        self.transition_self(NodeState::ParticipateInElection);
        let _ = now;
        KernelOutput::new()
    }

    fn enter_coordinator(&mut self, now: u64) -> KernelOutput {
        self.transition_self(NodeState::Coordinator);
        let payload = self.membership_payload(NodeState::Coordinator, now);
        self.issue(
            Target::All,
            PacketType::DeclareCoordinator,
            payload,
            CommandSource::Internal,
            self.timing.declare_coordinator_timeout_secs,
            PendingPurpose::DeclareCoordinator,
        )
    }

    fn enter_standby(&mut self, now: u64) -> KernelOutput {
        self.transition_self(NodeState::Standby);
        if let Some(master) = self.master {
            let payload = self.membership_payload(NodeState::Standby, now);
            let mut out = KernelOutput::new();
            out.commands.push(IssueCommand {
                command_id: self.cmd_alloc.allocate(),
                source: CommandSource::Internal,
                target: Target::One(master),
                packet_type: PacketType::JoinCoordinator,
                payload,
                timeout_secs: self.timing.state_deadline_secs,
            });
            out
        } else {
            KernelOutput::new()
        }
    }

    fn enter_in_network_trouble(&mut self, now: u64) -> KernelOutput {
        if self.self_state() == NodeState::InNetworkTrouble {
            return KernelOutput::new();
        }
        let was_coordinator = self.self_state() == NodeState::Coordinator;
        self.transition_self(NodeState::InNetworkTrouble);
        let _ = now;
        let mut out = KernelOutput::new();
        if was_coordinator && self.escalated {
            self.escalated = false;
            out.effects.push(Effect::DeEscalateVip);
        }
        out.effects.push(Effect::Exit);
        out
    }

    fn on_network_recovered(&mut self, now: u64) -> KernelOutput {
        if self.self_state() == NodeState::InNetworkTrouble || self.self_state() == NodeState::Lost {
            self.enter_loading(now)
        } else {
            KernelOutput::new()
        }
    }

    // ---- command completion ---------------------------------------------------

    fn on_command_finished(&mut self, command_id: CommandId, status: CommandStatus, now: u64) -> KernelOutput {
        let Some((pending_id, purpose)) = self.pending else {
            return KernelOutput::new();
        };
        if pending_id != command_id {
            return KernelOutput::new();
        }
        self.pending = None;

        match purpose {
            PendingPurpose::AddNode => {
                if status == CommandStatus::Rejected {
                    let mut out = KernelOutput::new();
                    out.effects.push(Effect::Exit);
                    out
                } else {
                    self.enter_joining(now)
                }
            }
            PendingPurpose::RequestInfo => self.enter_initializing(now),
            PendingPurpose::StandForCoordinator => {
                if status == CommandStatus::Rejected {
                    self.enter_participate_in_election(now)
                } else {
                    self.enter_coordinator(now)
                }
            }
            PendingPurpose::DeclareCoordinator => {
                self.master = Some(self.self_identity.private_id);
                let mut out = KernelOutput::new();
                if self.quorum.holds_vip() {
                    self.escalated = true;
                    out.effects.push(Effect::EscalateVip);
                }
                out.effects.push(Effect::NotifyIpc(Notification::NewMaster(self.self_identity.private_id)));
                out
            }
        }
    }

    // ---- timeouts ---------------------------------------------------------------

    fn on_timeout(&mut self, kind: TimeoutKind, now: u64) -> KernelOutput {
        match (self.self_state(), kind) {
            (NodeState::ParticipateInElection, TimeoutKind::StateDeadline) => self.enter_joining(now),
            (NodeState::Coordinator, TimeoutKind::StateDeadline) => {
                let payload = self.membership_payload(NodeState::Coordinator, now);
                let mut out = KernelOutput::new();
                out.commands.push(IssueCommand {
                    command_id: self.cmd_alloc.allocate(),
                    source: CommandSource::Internal,
                    target: Target::All,
                    packet_type: PacketType::IamCoordinator,
                    payload,
                    timeout_secs: 0,
                });
                out
            }
            (NodeState::Standby, TimeoutKind::BeaconRequestInfo) => {
                let Some(master) = self.master else {
                    return KernelOutput::new();
                };
                let payload = self.membership_payload(NodeState::Standby, now);
                let mut out = KernelOutput::new();
                out.commands.push(IssueCommand {
                    command_id: self.cmd_alloc.allocate(),
                    source: CommandSource::Internal,
                    target: Target::One(master),
                    packet_type: PacketType::RequestInfo,
                    payload,
                    timeout_secs: self.timing.request_info_timeout_secs,
                });
                out
            }
            (NodeState::Standby, TimeoutKind::BeaconReElect) => self.enter_joining(now),
            _ => KernelOutput::new(),
        }
    }

    // ---- peer packets -------------------------------------------------------------

    fn on_packet(&mut self, packet: IncomingPacket, now: u64) -> KernelOutput {
        let IncomingPacket { from, frame } = packet;
        self.touch_received(from, now);

        match frame.ty {
            PacketType::DeclareCoordinator => self.on_declare_coordinator(from, now),
            PacketType::IamCoordinator => self.on_iam_coordinator(from, now),
            PacketType::StandForCoordinator => self.on_stand_for_coordinator(from, now),
            PacketType::QuorumIsLost => {
                let mut out = KernelOutput::new();
                out.effects.push(Effect::NotifyIpc(Notification::QuorumChanged));
                out
            }
            PacketType::InformIAmGoingDown => {
                if let Some(rec) = self.nodes.get_mut(&from) {
                    rec.state = NodeState::Shutdown;
                }
                let mut out = KernelOutput::new();
                out.effects.push(Effect::NotifyIpc(Notification::MembershipChanged));
                out
            }
            PacketType::RemoteFailoverRequest => self.on_remote_failover_request(&frame.payload, now),
            PacketType::FailoverCommand => self.on_failover_command_forwarded(from, &frame.payload, now),
            PacketType::Info | PacketType::Data => {
                if let Ok(payload) = MembershipPayload::from_json(&frame.payload) {
                    self.apply_membership(from, &payload);
                }
                KernelOutput::new()
            }
            _ => KernelOutput::new(),
        }
    }

    fn on_declare_coordinator(&mut self, from: PrivateId, now: u64) -> KernelOutput {
        match self.self_state() {
            NodeState::Coordinator => self.enter_joining(now),
            NodeState::Standby if self.master != Some(from) => self.enter_joining(now),
            NodeState::ParticipateInElection => {
                let their_priority = self.nodes.get(&from).map(|r| r.identity.priority).unwrap_or(0);
                if their_priority >= self.self_identity.priority {
                    self.master = Some(from);
                    self.enter_initializing(now)
                } else {
                    KernelOutput::new()
                }
            }
            _ => KernelOutput::new(),
        }
    }

    fn on_iam_coordinator(&mut self, from: PrivateId, now: u64) -> KernelOutput {
        match self.self_state() {
            NodeState::Coordinator if from != self.self_identity.private_id => self.enter_joining(now),
            _ => KernelOutput::new(),
        }
    }

    fn on_stand_for_coordinator(&mut self, from: PrivateId, now: u64) -> KernelOutput {
        // Re-delivery of the same peer's STAND_FOR_COORDINATOR within this
        // standing round must not re-run the tie-break a second time; the
        // first resolution already committed us to a state transition.
        let already_resolved = self.stand_for_seen.insert(from, ()).is_some();

        match self.self_state() {
            NodeState::StandForCoordinator => {
                if already_resolved {
                    return KernelOutput::new();
                }
                let Some(their_identity) = self.nodes.get(&from).map(|r| r.identity.clone()) else {
                    return KernelOutput::new();
                };
                match election::rank_candidates(&self.self_identity, &their_identity) {
                    Ordering::Less => KernelOutput::new(),
                    Ordering::Greater => self.enter_participate_in_election(now),
                    Ordering::Equal => {
                        let their_id_outranks_ours = from > self.self_identity.private_id;
                        if election::we_win_exact_tie(their_id_outranks_ours) {
                            KernelOutput::new()
                        } else {
                            self.enter_participate_in_election(now)
                        }
                    }
                }
            }
            NodeState::Joining | NodeState::Initializing => self.enter_participate_in_election(now),
            _ => KernelOutput::new(),
        }
    }

    fn on_remote_failover_request(&mut self, payload: &[u8], _now: u64) -> KernelOutput {
        let mut out = KernelOutput::new();
        if let Ok(req) = FailoverRequestPayload::from_json(payload) {
            let effect = match req.kind {
                FailoverKind::NodeUp => Effect::CallbackFailback {
                    node_ids: req.node_set,
                    failover_id: FailoverId(req.failover_id),
                },
                FailoverKind::NodeDown => Effect::CallbackDegenerate {
                    node_ids: req.node_set,
                    failover_id: FailoverId(req.failover_id),
                },
                FailoverKind::Promote => Effect::CallbackPromote {
                    node_id: req.requester,
                    failover_id: FailoverId(req.failover_id),
                },
            };
            out.effects.push(effect);
        }
        out
    }

    /// A standby forwarded a `FAILOVER_COMMAND` it received over IPC
    /// (§4.8: "a standby forwards to the master"). Only the coordinator
    /// admits; a forward that reaches a non-coordinator (stale `master`
    /// view on the sender's side) is dropped rather than mis-admitted.
    fn on_failover_command_forwarded(&mut self, from: PrivateId, payload: &[u8], now: u64) -> KernelOutput {
        if self.self_state() != NodeState::Coordinator {
            return KernelOutput::new();
        }
        let Ok(req) = FailoverRequestPayload::from_json(payload) else {
            return KernelOutput::new();
        };
        let (out, _admission) = self.admit_failover(req.kind, req.node_set, from, now);
        out
    }

    // ---- liveness -----------------------------------------------------------------

    fn mark_peer_lost(&mut self, peer: PrivateId, now: u64) -> KernelOutput {
        if let Some(rec) = self.nodes.get_mut(&peer) {
            rec.state = NodeState::Lost;
        }
        let mut out = self.recompute_quorum(now);
        if self.master == Some(peer) && self.self_state() == NodeState::Standby {
            out.merge(self.enter_joining(now));
        }
        out
    }

    fn mark_peer_found(&mut self, peer: PrivateId, now: u64) -> KernelOutput {
        if let Some(rec) = self.nodes.get_mut(&peer) {
            if rec.state == NodeState::Lost {
                rec.state = NodeState::Loading;
            }
        }
        self.recompute_quorum(now)
    }

    fn recompute_quorum(&mut self, _now: u64) -> KernelOutput {
        let n = self.remotes.len() as u32;
        let l = self
            .remotes
            .iter()
            .filter(|id| self.nodes[id].is_active())
            .count() as u32;
        let new_quorum = quorum_status(n, l);
        let mut out = KernelOutput::new();
        if new_quorum != self.quorum {
            self.quorum = new_quorum;
            out.effects.push(Effect::NotifyIpc(Notification::QuorumChanged));
            if self.self_state() == NodeState::Coordinator {
                if !self.quorum.holds_vip() && self.escalated {
                    self.escalated = false;
                    out.effects.push(Effect::DeEscalateVip);
                } else if self.quorum.holds_vip() && !self.escalated {
                    self.escalated = true;
                    out.effects.push(Effect::EscalateVip);
                }
            }
        }
        out
    }

    fn touch_received(&mut self, from: PrivateId, now: u64) {
        if let Some(rec) = self.nodes.get_mut(&from) {
            rec.last_received = now;
        }
    }

    fn apply_membership(&mut self, from: PrivateId, payload: &MembershipPayload) {
        if let Some(rec) = self.nodes.get_mut(&from) {
            rec.state = payload.state;
            rec.identity.priority = payload.priority;
            rec.identity.delegate_ip = payload.delegate_ip.clone();
            rec.identity.start_time = payload.start_time;
        }
    }

    fn membership_payload(&self, state: NodeState, now: u64) -> Vec<u8> {
        let hash = if self.auth_key.is_empty() {
            None
        } else {
            watchdog_wire::compute_auth_hash(
                state,
                self.self_identity.start_time,
                self.self_identity.watchdog_port,
                &self.auth_key,
            )
        };
        let _ = now;
        MembershipPayload {
            state,
            start_time: self.self_identity.start_time,
            priority: self.self_identity.priority,
            watchdog_port: self.self_identity.watchdog_port,
            application_port: self.self_identity.application_port,
            hostname: self.self_identity.hostname.clone(),
            delegate_ip: self.self_identity.delegate_ip.clone(),
            node_name: self.self_identity.node_name.clone(),
            auth_hash: hash,
        }
        .to_json()
        .expect("membership payload always serializes")
    }

    fn issue(
        &mut self,
        target: Target,
        packet_type: PacketType,
        payload: Vec<u8>,
        source: CommandSource,
        timeout_secs: u64,
        purpose: PendingPurpose,
    ) -> KernelOutput {
        let command_id = self.cmd_alloc.allocate();
        self.pending = Some((command_id, purpose));
        let mut out = KernelOutput::new();
        out.commands.push(IssueCommand {
            command_id,
            source,
            target,
            packet_type,
            payload,
            timeout_secs,
        });
        out
    }

    // ---- lock service (§4.7) -------------------------------------------------------

    /// `start`: only the coordinator itself may become lock holder (§9 open
    /// question — kept literal, see `DESIGN.md`).
    pub fn lock_start(&mut self, requester: PrivateId) -> bool {
        if requester != self.self_identity.private_id {
            return false;
        }
        if self.lock.holder.is_some() {
            return false;
        }
        self.lock.holder = Some(requester);
        self.lock.sub_locks = [true; SUB_LOCK_COUNT];
        true
    }

    /// `end`: accepted from the current holder, or when there is no holder.
    pub fn lock_end(&mut self, requester: PrivateId, failover_id: FailoverId) -> bool {
        if self.lock.holder.is_some() && self.lock.holder != Some(requester) {
            return false;
        }
        self.lock.clear();
        self.failovers.retain(|f| f.id != failover_id);
        true
    }

    pub fn lock_release_sublock(&mut self, requester: PrivateId, sub: SubLock) -> bool {
        if self.lock.holder != Some(requester) {
            return false;
        }
        self.lock.sub_locks[sub.index()] = false;
        true
    }

    pub fn lock_status(&self, failover_id: FailoverId) -> LockStatus {
        let exists = self.failovers.iter().any(|f| f.id == failover_id);
        self.lock.status(exists)
    }

    // ---- IPC-originated commands (§3 "IPC Command Record") -------------------------

    /// Issues an arbitrary cluster command on behalf of the IPC layer,
    /// tagged `CommandSource::Ipc` so the tracker (and the IPC layer's own
    /// deferred-reply bookkeeping) can tell it apart from the state
    /// machine's internal commands. Used for verbs that have no dedicated
    /// kernel operation of their own (`ONLINE_RECOVERY_COMMAND`,
    /// `FAILOVER_LOCKING_REQUEST` forwarded to a peer).
    pub fn issue_ipc_command(
        &mut self,
        packet_type: PacketType,
        target: Target,
        payload: Vec<u8>,
        timeout_secs: u64,
    ) -> (CommandId, KernelOutput) {
        let command_id = self.cmd_alloc.allocate();
        let mut out = KernelOutput::new();
        out.commands.push(IssueCommand {
            command_id,
            source: CommandSource::Ipc,
            target,
            packet_type,
            payload,
            timeout_secs,
        });
        (command_id, out)
    }

    // ---- failover registry (§4.8) --------------------------------------------------

    pub fn admit_failover(
        &mut self,
        kind: FailoverKind,
        node_set: Vec<PrivateId>,
        requester: PrivateId,
        now: u64,
    ) -> (KernelOutput, FailoverAdmission) {
        if self.switching_externally_signaled {
            return (KernelOutput::new(), FailoverAdmission::Rejected);
        }
        if let Some(existing) = self.failovers.iter().find(|f| f.matches(kind, &node_set)) {
            return (KernelOutput::new(), FailoverAdmission::AlreadyIssued(existing.id));
        }

        let command_id = self.cmd_alloc.allocate();
        let failover_id = FailoverId(command_id.0);
        let object = FailoverObject::new(failover_id, kind, node_set.clone(), requester, now);
        self.failovers.push(object);

        let payload = FailoverRequestPayload {
            failover_id: failover_id.0,
            kind,
            node_set,
            requester,
        }
        .to_json()
        .expect("failover payload always serializes");

        let mut out = KernelOutput::new();
        out.commands.push(IssueCommand {
            command_id,
            source: CommandSource::Local,
            target: Target::AllExceptSource(requester),
            packet_type: PacketType::RemoteFailoverRequest,
            payload,
            timeout_secs: self.timing.state_deadline_secs,
        });
        (out, FailoverAdmission::Proceed(failover_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(private_id: u32, priority: u32, start_time: u64) -> NodeIdentity {
        NodeIdentity {
            private_id: PrivateId(private_id),
            node_name: format!("node{private_id}"),
            hostname: "h".into(),
            watchdog_port: 9000,
            application_port: 5432,
            start_time,
            priority,
            delegate_ip: String::new(),
        }
    }

    fn lone_cluster() -> Cluster {
        let (cluster, _out) = Cluster::new(
            identity(0, 10, 1),
            Vec::new(),
            String::new(),
            Timing::default(),
            1,
        );
        cluster
    }

    #[test]
    fn starts_in_loading_and_issues_add_node() {
        let (cluster, out) = Cluster::new(identity(0, 10, 1), vec![identity(1, 10, 2)], String::new(), Timing::default(), 1);
        assert_eq!(cluster.self_state(), NodeState::Loading);
        assert_eq!(out.commands.len(), 1);
        assert_eq!(out.commands[0].packet_type, PacketType::AddNode);
    }

    #[test]
    fn solo_node_becomes_coordinator_with_no_remotes() {
        let mut cluster = lone_cluster();
        let add_node_cmd = cluster.pending.unwrap().0;
        cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: add_node_cmd, status: CommandStatus::AllReplied },
            2,
        );
        assert_eq!(cluster.self_state(), NodeState::Joining);
        let request_info_cmd = cluster.pending.unwrap().0;
        cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: request_info_cmd, status: CommandStatus::AllReplied },
            3,
        );
        assert_eq!(cluster.self_state(), NodeState::Coordinator);
    }

    #[test]
    fn coordinator_escalates_once_declare_coordinator_finishes_with_quorum() {
        let mut cluster = lone_cluster();
        cluster.quorum = QuorumStatus::Present;
        let add_node_cmd = cluster.pending.unwrap().0;
        cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: add_node_cmd, status: CommandStatus::AllReplied },
            2,
        );
        let request_info_cmd = cluster.pending.unwrap().0;
        cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: request_info_cmd, status: CommandStatus::AllReplied },
            3,
        );
        let declare_cmd = cluster.pending.unwrap().0;
        let out = cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: declare_cmd, status: CommandStatus::AllReplied },
            4,
        );
        assert!(cluster.is_escalated());
        assert_eq!(cluster.master(), Some(PrivateId::SELF));
        assert!(out.effects.contains(&Effect::EscalateVip));
    }

    #[test]
    fn reject_during_loading_is_fatal() {
        let mut cluster = lone_cluster();
        let add_node_cmd = cluster.pending.unwrap().0;
        let out = cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: add_node_cmd, status: CommandStatus::Rejected },
            2,
        );
        assert_eq!(cluster.self_state(), NodeState::Loading);
        assert!(out.effects.contains(&Effect::Exit));
    }

    #[test]
    fn lock_start_rejected_for_non_coordinator_requester() {
        let mut cluster = lone_cluster();
        assert!(!cluster.lock_start(PrivateId(1)));
        assert!(cluster.lock_start(PrivateId::SELF));
        assert!(!cluster.lock_start(PrivateId::SELF), "second start must fail while held");
    }

    #[test]
    fn failover_request_is_deduplicated() {
        let mut cluster = lone_cluster();
        let (_out, first) = cluster.admit_failover(
            FailoverKind::NodeDown,
            vec![PrivateId(2)],
            PrivateId::SELF,
            10,
        );
        let id = match first {
            FailoverAdmission::Proceed(id) => id,
            other => panic!("expected Proceed, got {other:?}"),
        };
        let (_out, second) = cluster.admit_failover(
            FailoverKind::NodeDown,
            vec![PrivateId(2)],
            PrivateId(3),
            11,
        );
        assert_eq!(second, FailoverAdmission::AlreadyIssued(id));
    }

    #[test]
    fn lock_end_removes_failover_object() {
        let mut cluster = lone_cluster();
        let (_out, admission) = cluster.admit_failover(
            FailoverKind::Promote,
            vec![PrivateId(2)],
            PrivateId::SELF,
            10,
        );
        let id = match admission {
            FailoverAdmission::Proceed(id) => id,
            other => panic!("expected Proceed, got {other:?}"),
        };
        assert_eq!(cluster.lock_status(id), LockStatus::NoHolderButWait);
        assert!(cluster.lock_start(PrivateId::SELF));
        assert_eq!(cluster.lock_status(id), LockStatus::Locked);
        assert!(cluster.lock_end(PrivateId::SELF, id));
        assert_eq!(cluster.lock_status(id), LockStatus::NoHolder);
    }

    #[test]
    fn exact_tie_in_stand_for_coordinator_has_exactly_one_winner() {
        // Both candidates share priority and start_time; only PrivateId differs.
        let (mut low, _out) = Cluster::new(
            identity(0, 10, 50),
            vec![identity(2, 10, 50)],
            String::new(),
            Timing::default(),
            1,
        );
        low.enter_stand_for_coordinator(1);
        assert_eq!(low.self_state(), NodeState::StandForCoordinator);
        low.on_stand_for_coordinator(PrivateId(2), 2);
        assert_eq!(
            low.self_state(),
            NodeState::StandForCoordinator,
            "the lower PrivateId must keep standing through an exact tie"
        );

        let (mut high, _out) = Cluster::new(
            identity(2, 10, 50),
            vec![identity(0, 10, 50)],
            String::new(),
            Timing::default(),
            1,
        );
        high.enter_stand_for_coordinator(1);
        assert_eq!(high.self_state(), NodeState::StandForCoordinator);
        high.on_stand_for_coordinator(PrivateId(0), 2);
        assert_eq!(
            high.self_state(),
            NodeState::ParticipateInElection,
            "the higher PrivateId must yield through an exact tie"
        );
    }

    #[test]
    fn repeated_stand_for_coordinator_from_same_peer_does_not_re_resolve() {
        let (mut low, _out) = Cluster::new(
            identity(0, 10, 50),
            vec![identity(2, 10, 50)],
            String::new(),
            Timing::default(),
            1,
        );
        low.enter_stand_for_coordinator(1);
        low.on_stand_for_coordinator(PrivateId(2), 2);
        assert_eq!(low.self_state(), NodeState::StandForCoordinator);
        // A retransmitted copy of the same peer's message must not flip us
        // into re-evaluating (and definitely not into yielding) a second time.
        low.on_stand_for_coordinator(PrivateId(2), 3);
        assert_eq!(low.self_state(), NodeState::StandForCoordinator);
    }
}
