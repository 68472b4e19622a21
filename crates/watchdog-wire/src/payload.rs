//! The self-describing membership payload document (§4.1, §6.1).
//!
//! Carried inside `ADD_NODE`, `INFO`, and the other membership messages.
//! The codec itself never parses this; it is serialized as JSON because
//! §6.1 calls for "numeric fields use platform-neutral decimal; binary
//! hashes are hex-encoded" — exactly what a JSON document with a
//! hex-string `auth_hash` field gives us for free.

use serde::{Deserialize, Serialize};

use watchdog_types::NodeState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipPayload {
    pub state: NodeState,
    pub start_time: u64,
    pub priority: u32,
    pub watchdog_port: u16,
    pub application_port: u16,
    pub hostname: String,
    #[serde(default)]
    pub delegate_ip: String,
    pub node_name: String,
    /// Hex-encoded HMAC, present only when an auth key is configured
    /// (§6.2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_hash: Option<String>,
}

impl MembershipPayload {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// The replicated body of `REMOTE_FAILOVER_REQUEST` (§4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverRequestPayload {
    pub failover_id: u32,
    pub kind: watchdog_types::FailoverKind,
    pub node_set: Vec<watchdog_types::PrivateId>,
    pub requester: watchdog_types::PrivateId,
}

impl FailoverRequestPayload {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let payload = MembershipPayload {
            state: NodeState::Standby,
            start_time: 1234,
            priority: 5,
            watchdog_port: 9000,
            application_port: 5432,
            hostname: "db1".into(),
            delegate_ip: "10.0.0.1".into(),
            node_name: "node1".into(),
            auth_hash: Some("abcd".into()),
        };
        let bytes = payload.to_json().unwrap();
        let decoded = MembershipPayload::from_json(&bytes).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn failover_request_round_trips_through_json() {
        use watchdog_types::{FailoverKind, PrivateId};

        let payload = FailoverRequestPayload {
            failover_id: 7,
            kind: FailoverKind::NodeDown,
            node_set: vec![PrivateId(2), PrivateId(3)],
            requester: PrivateId(1),
        };
        let bytes = payload.to_json().unwrap();
        let decoded = FailoverRequestPayload::from_json(&bytes).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn auth_hash_omitted_when_absent() {
        let payload = MembershipPayload {
            state: NodeState::Loading,
            start_time: 0,
            priority: 0,
            watchdog_port: 1,
            application_port: 2,
            hostname: "h".into(),
            delegate_ip: String::new(),
            node_name: "n".into(),
            auth_hash: None,
        };
        let bytes = payload.to_json().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("auth_hash"));
    }
}
