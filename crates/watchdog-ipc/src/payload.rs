//! IPC request/response documents (§4.9, §6.3). Self-describing JSON, in
//! the same style as `watchdog_wire::MembershipPayload`.

use serde::{Deserialize, Serialize};

use watchdog_types::{FailoverKind, LockStatus, NodeState, PrivateId, QuorumStatus, SubLock};

/// Flattened into every request payload; absent fields decode as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusChangePayload {
    #[serde(flatten)]
    pub auth: AuthFields,
    pub node_id: PrivateId,
    pub up: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterForNotificationPayload {
    #[serde(flatten)]
    pub auth: AuthFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetNodesListPayload {
    #[serde(flatten)]
    pub auth: AuthFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSummary {
    pub private_id: PrivateId,
    pub node_name: String,
    pub hostname: String,
    pub state: NodeState,
    pub priority: u32,
    pub is_master: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetNodesListResponse {
    pub nodes: Vec<NodeSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverCommandPayload {
    #[serde(flatten)]
    pub auth: AuthFields,
    pub kind: FailoverKind,
    pub node_set: Vec<PrivateId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverCommandResponse {
    pub failover_id: u32,
    pub already_issued: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineRecoveryPayload {
    #[serde(flatten)]
    pub auth: AuthFields,
    pub starting: bool,
    pub node_set: Vec<PrivateId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockVerb {
    Start,
    End,
    ReleaseSubLock,
    Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverLockingPayload {
    #[serde(flatten)]
    pub auth: AuthFields,
    pub verb: LockVerb,
    #[serde(default)]
    pub failover_id: u32,
    #[serde(default)]
    pub sub_lock: Option<SubLock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverLockingResponse {
    pub status: LockStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetMasterDataPayload {
    #[serde(flatten)]
    pub auth: AuthFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMasterDataResponse {
    pub master: Option<PrivateId>,
    pub quorum: QuorumStatus,
}

macro_rules! json_codec {
    ($ty:ty) => {
        impl $ty {
            pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
                serde_json::to_vec(self)
            }

            pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
                serde_json::from_slice(bytes)
            }
        }
    };
}

json_codec!(NodeStatusChangePayload);
json_codec!(RegisterForNotificationPayload);
json_codec!(GetNodesListPayload);
json_codec!(GetNodesListResponse);
json_codec!(FailoverCommandPayload);
json_codec!(FailoverCommandResponse);
json_codec!(OnlineRecoveryPayload);
json_codec!(FailoverLockingPayload);
json_codec!(FailoverLockingResponse);
json_codec!(GetMasterDataPayload);
json_codec!(GetMasterDataResponse);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_fields_are_omitted_when_absent() {
        let payload = GetNodesListPayload::default();
        let bytes = payload.to_json().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "{}");
    }

    #[test]
    fn failover_command_round_trips() {
        let payload = FailoverCommandPayload {
            auth: AuthFields { shared_key: Some("s".into()), auth_key: None },
            kind: FailoverKind::Promote,
            node_set: vec![PrivateId(1), PrivateId(2)],
        };
        let bytes = payload.to_json().unwrap();
        let decoded = FailoverCommandPayload::from_json(&bytes).unwrap();
        assert_eq!(decoded.node_set, payload.node_set);
        assert_eq!(decoded.auth.shared_key.as_deref(), Some("s"));
    }

    #[test]
    fn locking_payload_defaults_sub_lock_to_none() {
        let bytes = br#"{"verb":"Status","failover_id":7}"#;
        let decoded = FailoverLockingPayload::from_json(bytes).unwrap();
        assert_eq!(decoded.verb, LockVerb::Status);
        assert_eq!(decoded.sub_lock, None);
    }
}
