//! IPC command routing (C9, §4.9): authenticates a decoded request and
//! either answers it immediately from local cluster state or hands back a
//! cluster command for the caller's event loop to dispatch, deferring the
//! reply until that command finalizes (§3 "IPC Command Record").

use watchdog_kernel::{Cluster, FailoverAdmission, KernelOutput, Target, WatchdogEvent};
use watchdog_types::{NodeState, PrivateId};
use watchdog_wire::{FailoverRequestPayload, IpcResponseFrame, ResultTag};

use crate::auth::IpcAuth;
use crate::error::{IpcError, IpcResult};
use crate::payload::{
    AuthFields, FailoverCommandPayload, FailoverCommandResponse, FailoverLockingPayload,
    FailoverLockingResponse, GetMasterDataPayload, GetMasterDataResponse, GetNodesListPayload,
    GetNodesListResponse, LockVerb, NodeStatusChangePayload, NodeSummary,
    OnlineRecoveryPayload, RegisterForNotificationPayload,
};
use crate::vocabulary::{Authority, IpcCommandType};

/// What the caller's event loop must do with a client socket after
/// [`IpcHandler::handle`] returns.
pub enum IpcOutcome {
    /// Write this frame back now; the request/response exchange is done.
    Respond(IpcResponseFrame),
    /// Keep the socket open; reply once the cluster command with this id
    /// finalizes in the peer command tracker (§3 "deferred").
    AwaitCommand(u32),
    /// `REGISTER_FOR_NOTIFICATION`: keep the socket open indefinitely and
    /// push further frames as membership/quorum changes (§6.3).
    Subscribe,
}

pub struct HandleResult {
    pub kernel_output: KernelOutput,
    pub outcome: IpcOutcome,
}

fn bad(message: &str) -> IpcResponseFrame {
    IpcResponseFrame::new(ResultTag::Bad, message.as_bytes().to_vec())
}

fn ok_json<T: serde::Serialize>(body: &T) -> IpcResult<IpcResponseFrame> {
    Ok(IpcResponseFrame::new(ResultTag::Ok, serde_json::to_vec(body)?))
}

#[derive(Default)]
pub struct IpcHandler {
    auth: IpcAuth,
}

impl IpcHandler {
    pub fn new(auth: IpcAuth) -> Self {
        Self { auth }
    }

    fn check_auth(&self, cmd: IpcCommandType, auth: &AuthFields) -> IpcResult<()> {
        self.auth
            .check(
                cmd.authority() == Authority::ExternalOnly,
                auth.shared_key.as_deref(),
                auth.auth_key.as_deref(),
            )
            .map_err(|_| IpcError::AuthFailed)
    }

    /// Routes one decoded request. `self_id` is the local node's
    /// `PrivateId`, used as the `requester` for IPC-originated failovers.
    pub fn handle(
        &self,
        cmd: IpcCommandType,
        payload: &[u8],
        cluster: &mut Cluster,
        self_id: PrivateId,
        now: u64,
    ) -> IpcResult<HandleResult> {
        match cmd {
            IpcCommandType::NodeStatusChange => self.handle_node_status_change(payload, cluster, now),
            IpcCommandType::RegisterForNotification => self.handle_register(payload),
            IpcCommandType::GetNodesList => self.handle_get_nodes_list(payload, cluster),
            IpcCommandType::FailoverCommand => self.handle_failover_command(payload, cluster, self_id, now),
            IpcCommandType::OnlineRecoveryCommand => self.handle_online_recovery(payload, cluster),
            IpcCommandType::FailoverLockingRequest => self.handle_failover_locking(payload, cluster, self_id),
            IpcCommandType::GetMasterDataRequest => self.handle_get_master_data(payload, cluster),
        }
    }

    fn handle_node_status_change(
        &self,
        payload: &[u8],
        cluster: &mut Cluster,
        now: u64,
    ) -> IpcResult<HandleResult> {
        let req = NodeStatusChangePayload::from_json(payload)?;
        self.check_auth(IpcCommandType::NodeStatusChange, &req.auth)?;

        let event = if req.up {
            WatchdogEvent::RemoteNodeFound { peer: req.node_id }
        } else {
            WatchdogEvent::RemoteNodeLost { peer: req.node_id }
        };
        let kernel_output = cluster.handle_event(event, now);
        Ok(HandleResult {
            kernel_output,
            outcome: IpcOutcome::Respond(IpcResponseFrame::new(ResultTag::Ok, Vec::new())),
        })
    }

    fn handle_register(&self, payload: &[u8]) -> IpcResult<HandleResult> {
        let req = RegisterForNotificationPayload::from_json(payload)?;
        self.check_auth(IpcCommandType::RegisterForNotification, &req.auth)?;
        Ok(HandleResult {
            kernel_output: KernelOutput::new(),
            outcome: IpcOutcome::Subscribe,
        })
    }

    fn handle_get_nodes_list(&self, payload: &[u8], cluster: &Cluster) -> IpcResult<HandleResult> {
        let req = GetNodesListPayload::from_json(payload)?;
        self.check_auth(IpcCommandType::GetNodesList, &req.auth)?;

        let master = cluster.master();
        let nodes = cluster
            .node_records()
            .map(|rec| NodeSummary {
                private_id: rec.identity.private_id,
                node_name: rec.identity.node_name.clone(),
                hostname: rec.identity.hostname.clone(),
                state: rec.state,
                priority: rec.identity.priority,
                is_master: master == Some(rec.identity.private_id),
            })
            .collect();
        let response = ok_json(&GetNodesListResponse { nodes })?;
        Ok(HandleResult {
            kernel_output: KernelOutput::new(),
            outcome: IpcOutcome::Respond(response),
        })
    }

    fn handle_failover_command(
        &self,
        payload: &[u8],
        cluster: &mut Cluster,
        self_id: PrivateId,
        now: u64,
    ) -> IpcResult<HandleResult> {
        let req = FailoverCommandPayload::from_json(payload)?;
        self.check_auth(IpcCommandType::FailoverCommand, &req.auth)?;

        // Only the coordinator admits (§4.8); a standby forwards the
        // request to the master over the peer wire and awaits its reply
        // instead of admitting against its own, necessarily empty,
        // failover registry.
        if cluster.self_state() != NodeState::Coordinator {
            let Some(master) = cluster.master() else {
                return Ok(HandleResult {
                    kernel_output: KernelOutput::new(),
                    outcome: IpcOutcome::Respond(bad("no master known")),
                });
            };
            let wire_payload = FailoverRequestPayload {
                failover_id: 0,
                kind: req.kind,
                node_set: req.node_set,
                requester: self_id,
            }
            .to_json()?;
            let (command_id, kernel_output) = cluster.issue_ipc_command(
                watchdog_types::PacketType::FailoverCommand,
                Target::One(master),
                wire_payload,
                5,
            );
            return Ok(HandleResult {
                kernel_output,
                outcome: IpcOutcome::AwaitCommand(command_id.0),
            });
        }

        let (kernel_output, admission) = cluster.admit_failover(req.kind, req.node_set, self_id, now);
        let outcome = match admission {
            FailoverAdmission::Proceed(id) => IpcOutcome::AwaitCommand(id.0),
            FailoverAdmission::AlreadyIssued(id) => {
                IpcOutcome::Respond(ok_json(&FailoverCommandResponse {
                    failover_id: id.0,
                    already_issued: true,
                })?)
            }
            FailoverAdmission::Rejected => {
                IpcOutcome::Respond(bad("switching externally signaled"))
            }
        };
        Ok(HandleResult { kernel_output, outcome })
    }

    fn handle_online_recovery(&self, payload: &[u8], cluster: &mut Cluster) -> IpcResult<HandleResult> {
        let req = OnlineRecoveryPayload::from_json(payload)?;
        self.check_auth(IpcCommandType::OnlineRecoveryCommand, &req.auth)?;

        let body = OnlineRecoveryPayload {
            auth: AuthFields::default(),
            starting: req.starting,
            node_set: req.node_set,
        };
        let wire_payload = body.to_json()?;
        let (command_id, kernel_output) = cluster.issue_ipc_command(
            watchdog_types::PacketType::OnlineRecoveryCommand,
            Target::All,
            wire_payload,
            5,
        );
        Ok(HandleResult {
            kernel_output,
            outcome: IpcOutcome::AwaitCommand(command_id.0),
        })
    }

    /// A standby forwards the lock verb to the coordinator and blocks the
    /// caller until the coordinator replies (§4.7); only the coordinator
    /// answers from its own `LockTable` directly.
    fn handle_failover_locking(
        &self,
        payload: &[u8],
        cluster: &mut Cluster,
        self_id: PrivateId,
    ) -> IpcResult<HandleResult> {
        let req = FailoverLockingPayload::from_json(payload)?;
        self.check_auth(IpcCommandType::FailoverLockingRequest, &req.auth)?;

        if cluster.self_state() != NodeState::Coordinator {
            let Some(master) = cluster.master() else {
                return Ok(HandleResult {
                    kernel_output: KernelOutput::new(),
                    outcome: IpcOutcome::Respond(bad("no master known")),
                });
            };
            let wire_payload = FailoverLockingPayload {
                auth: AuthFields::default(),
                verb: req.verb,
                failover_id: req.failover_id,
                sub_lock: req.sub_lock,
            }
            .to_json()?;
            let (command_id, kernel_output) = cluster.issue_ipc_command(
                IpcCommandType::FailoverLockingRequest.peer_packet_type().expect("has a peer packet type"),
                Target::One(master),
                wire_payload,
                5,
            );
            return Ok(HandleResult {
                kernel_output,
                outcome: IpcOutcome::AwaitCommand(command_id.0),
            });
        }

        let response = match req.verb {
            LockVerb::Start => {
                let ok = cluster.lock_start(self_id);
                if ok {
                    ResultTag::Ok
                } else {
                    ResultTag::Bad
                }
            }
            LockVerb::End => {
                let ok = cluster.lock_end(self_id, watchdog_types::FailoverId(req.failover_id));
                if ok {
                    ResultTag::Ok
                } else {
                    ResultTag::Bad
                }
            }
            LockVerb::ReleaseSubLock => {
                let Some(sub) = req.sub_lock else {
                    return Ok(HandleResult {
                        kernel_output: KernelOutput::new(),
                        outcome: IpcOutcome::Respond(bad("missing sub_lock")),
                    });
                };
                if cluster.lock_release_sublock(self_id, sub) {
                    ResultTag::Ok
                } else {
                    ResultTag::Bad
                }
            }
            LockVerb::Status => {
                let status = cluster.lock_status(watchdog_types::FailoverId(req.failover_id));
                let frame = ok_json(&FailoverLockingResponse { status })?;
                return Ok(HandleResult {
                    kernel_output: KernelOutput::new(),
                    outcome: IpcOutcome::Respond(frame),
                });
            }
        };
        Ok(HandleResult {
            kernel_output: KernelOutput::new(),
            outcome: IpcOutcome::Respond(IpcResponseFrame::new(response, Vec::new())),
        })
    }

    /// A standby forwards this to the coordinator and blocks the caller
    /// until it replies (§4.7, §4.9); only the coordinator answers from
    /// its own `master`/`quorum` view directly.
    fn handle_get_master_data(&self, payload: &[u8], cluster: &mut Cluster) -> IpcResult<HandleResult> {
        let req = GetMasterDataPayload::from_json(payload)?;
        self.check_auth(IpcCommandType::GetMasterDataRequest, &req.auth)?;

        if cluster.self_state() != NodeState::Coordinator {
            let Some(master) = cluster.master() else {
                return Ok(HandleResult {
                    kernel_output: KernelOutput::new(),
                    outcome: IpcOutcome::Respond(bad("no master known")),
                });
            };
            let wire_payload = GetMasterDataPayload::default().to_json()?;
            let (command_id, kernel_output) = cluster.issue_ipc_command(
                IpcCommandType::GetMasterDataRequest.peer_packet_type().expect("has a peer packet type"),
                Target::One(master),
                wire_payload,
                5,
            );
            return Ok(HandleResult {
                kernel_output,
                outcome: IpcOutcome::AwaitCommand(command_id.0),
            });
        }

        let response = ok_json(&GetMasterDataResponse {
            master: cluster.master(),
            quorum: cluster.quorum(),
        })?;
        Ok(HandleResult {
            kernel_output: KernelOutput::new(),
            outcome: IpcOutcome::Respond(response),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchdog_kernel::{IncomingPacket, Timing};
    use watchdog_types::{CommandStatus, FailoverKind, NodeIdentity, NodeState};
    use watchdog_wire::{MembershipPayload, PeerFrame};

    fn identity(id: u32) -> NodeIdentity {
        NodeIdentity {
            node_name: format!("node{id}"),
            hostname: "h".into(),
            watchdog_port: 9000,
            application_port: 5432,
            start_time: 1,
            priority: 1,
            delegate_ip: String::new(),
            private_id: PrivateId(id),
        }
    }

    fn lone_cluster() -> Cluster {
        let (cluster, _out) = Cluster::new(identity(0), Vec::new(), String::new(), Timing::default(), 1);
        cluster
    }

    /// A solo node always becomes coordinator once its startup commands
    /// finalize (no peers to contest the election with).
    fn coordinator_cluster() -> Cluster {
        let (mut cluster, out) = Cluster::new(identity(0), Vec::new(), String::new(), Timing::default(), 1);
        let add_node_cmd = out.commands[0].command_id;
        let out = cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: add_node_cmd, status: CommandStatus::AllReplied },
            2,
        );
        let request_info_cmd = out.commands[0].command_id;
        cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: request_info_cmd, status: CommandStatus::AllReplied },
            3,
        );
        assert_eq!(cluster.self_state(), NodeState::Coordinator);
        cluster
    }

    /// One remote, already recorded as coordinator before this node
    /// finishes its own startup handshake, so it settles as a standby
    /// with `master` pointed at that remote.
    fn standby_cluster() -> Cluster {
        let (mut cluster, out) =
            Cluster::new(identity(0), vec![identity(1)], String::new(), Timing::default(), 1);
        let add_node_cmd = out.commands[0].command_id;
        let out = cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: add_node_cmd, status: CommandStatus::AllReplied },
            2,
        );
        let request_info_cmd = out.commands[0].command_id;

        let membership = MembershipPayload {
            state: NodeState::Coordinator,
            start_time: 1,
            priority: 1,
            watchdog_port: 9000,
            application_port: 5432,
            hostname: "h".into(),
            delegate_ip: String::new(),
            node_name: "node1".into(),
            auth_hash: None,
        };
        cluster.handle_event(
            WatchdogEvent::PacketReceived(IncomingPacket {
                from: PrivateId(1),
                frame: PeerFrame::new(watchdog_types::PacketType::Info, 0, membership.to_json().unwrap()),
            }),
            3,
        );

        cluster.handle_event(
            WatchdogEvent::CommandFinished { command_id: request_info_cmd, status: CommandStatus::AllReplied },
            4,
        );
        assert_eq!(cluster.self_state(), NodeState::Standby);
        assert_eq!(cluster.master(), Some(PrivateId(1)));
        cluster
    }

    #[test]
    fn get_nodes_list_reports_self() {
        let handler = IpcHandler::default();
        let mut cluster = lone_cluster();
        let payload = GetNodesListPayload::default().to_json().unwrap();
        let result = handler
            .handle(IpcCommandType::GetNodesList, &payload, &mut cluster, PrivateId::SELF, 1)
            .unwrap();
        match result.outcome {
            IpcOutcome::Respond(frame) => {
                assert_eq!(frame.tag, ResultTag::Ok);
                let decoded: GetNodesListResponse = serde_json::from_slice(&frame.payload).unwrap();
                assert_eq!(decoded.nodes.len(), 1);
            }
            _ => panic!("expected immediate response"),
        }
    }

    #[test]
    fn failover_command_defers_on_proceed() {
        let handler = IpcHandler::default();
        let mut cluster = coordinator_cluster();
        let req = FailoverCommandPayload {
            auth: AuthFields::default(),
            kind: FailoverKind::NodeDown,
            node_set: vec![PrivateId(1)],
        };
        let payload = req.to_json().unwrap();
        let result = handler
            .handle(IpcCommandType::FailoverCommand, &payload, &mut cluster, PrivateId::SELF, 5)
            .unwrap();
        assert!(matches!(result.outcome, IpcOutcome::AwaitCommand(_)));
    }

    #[test]
    fn standby_forwards_failover_command_to_master() {
        let handler = IpcHandler::default();
        let mut cluster = standby_cluster();
        let req = FailoverCommandPayload {
            auth: AuthFields::default(),
            kind: FailoverKind::NodeDown,
            node_set: vec![PrivateId(2)],
        };
        let payload = req.to_json().unwrap();
        let result = handler
            .handle(IpcCommandType::FailoverCommand, &payload, &mut cluster, PrivateId::SELF, 5)
            .unwrap();
        assert!(matches!(result.outcome, IpcOutcome::AwaitCommand(_)));
    }

    #[test]
    fn standby_forwards_failover_locking_to_master() {
        let handler = IpcHandler::default();
        let mut cluster = standby_cluster();
        let req = FailoverLockingPayload {
            auth: AuthFields::default(),
            verb: LockVerb::Start,
            failover_id: 1,
            sub_lock: None,
        };
        let payload = req.to_json().unwrap();
        let result = handler
            .handle(IpcCommandType::FailoverLockingRequest, &payload, &mut cluster, PrivateId::SELF, 5)
            .unwrap();
        assert!(matches!(result.outcome, IpcOutcome::AwaitCommand(_)));
    }

    #[test]
    fn standby_forwards_get_master_data_to_master() {
        let handler = IpcHandler::default();
        let mut cluster = standby_cluster();
        let payload = GetMasterDataPayload::default().to_json().unwrap();
        let result = handler
            .handle(IpcCommandType::GetMasterDataRequest, &payload, &mut cluster, PrivateId::SELF, 5)
            .unwrap();
        assert!(matches!(result.outcome, IpcOutcome::AwaitCommand(_)));
    }

    #[test]
    fn external_only_verb_rejects_bad_shared_key() {
        let auth = IpcAuth::new(Some("secret".into()), None);
        let handler = IpcHandler::new(auth);
        let mut cluster = lone_cluster();
        let req = NodeStatusChangePayload {
            auth: AuthFields { shared_key: Some("wrong".into()), auth_key: None },
            node_id: PrivateId(1),
            up: false,
        };
        let payload = req.to_json().unwrap();
        let err = handler
            .handle(IpcCommandType::NodeStatusChange, &payload, &mut cluster, PrivateId::SELF, 1)
            .unwrap_err();
        assert!(matches!(err, IpcError::AuthFailed));
    }

    #[test]
    fn register_for_notification_subscribes() {
        let handler = IpcHandler::default();
        let mut cluster = lone_cluster();
        let payload = RegisterForNotificationPayload::default().to_json().unwrap();
        let result = handler
            .handle(IpcCommandType::RegisterForNotification, &payload, &mut cluster, PrivateId::SELF, 1)
            .unwrap();
        assert!(matches!(result.outcome, IpcOutcome::Subscribe));
    }
}
