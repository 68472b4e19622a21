//! Peer wire message vocabulary (§6.1).
//!
//! Each variant carries the single-byte code the source assigns it
//! (`WD_ADD_NODE_MESSAGE = 'A'`, etc. in `watchdog.c`); the four verbs
//! §4.7/§4.8/§4.9 add on top of the original protocol (`FAILOVER_COMMAND`,
//! `ONLINE_RECOVERY_COMMAND`, `FAILOVER_LOCKING_REQUEST`,
//! `GET_MASTER_DATA_REQUEST`) are assigned unused ASCII letters in the same
//! style.

use serde::{Deserialize, Serialize};

/// Ceiling on a single packet's declared payload length (§4.1). A declared
/// length above this is a protocol error and closes the connection.
pub const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketType {
    AddNode,
    RequestInfo,
    DeclareCoordinator,
    Data,
    Error,
    Accept,
    Info,
    JoinCoordinator,
    FailoverLockingRequest,
    FailoverCommand,
    IamCoordinator,
    IamInNetworkTrouble,
    OnlineRecoveryCommand,
    QuorumIsLost,
    Reject,
    StandForCoordinator,
    RemoteFailoverRequest,
    InformIAmGoingDown,
    AskForPoolConfig,
    PoolConfigData,
    GetMasterDataRequest,
    CmdReplyInData,
}

impl PacketType {
    /// Decodes a wire byte into a message type.
    ///
    /// Returns `None` for any byte outside the closed enumeration (§6.1);
    /// callers treat that as a protocol error (§7).
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            b'A' => Self::AddNode,
            b'B' => Self::RequestInfo,
            b'C' => Self::DeclareCoordinator,
            b'D' => Self::Data,
            b'E' => Self::Error,
            b'G' => Self::Accept,
            b'I' => Self::Info,
            b'J' => Self::JoinCoordinator,
            b'K' => Self::FailoverLockingRequest,
            b'F' => Self::FailoverCommand,
            b'M' => Self::IamCoordinator,
            b'N' => Self::IamInNetworkTrouble,
            b'O' => Self::OnlineRecoveryCommand,
            b'Q' => Self::QuorumIsLost,
            b'R' => Self::Reject,
            b'S' => Self::StandForCoordinator,
            b'V' => Self::RemoteFailoverRequest,
            b'X' => Self::InformIAmGoingDown,
            b'Y' => Self::AskForPoolConfig,
            b'Z' => Self::PoolConfigData,
            b'k' => Self::GetMasterDataRequest,
            b'-' => Self::CmdReplyInData,
            _ => return None,
        })
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::AddNode => b'A',
            Self::RequestInfo => b'B',
            Self::DeclareCoordinator => b'C',
            Self::Data => b'D',
            Self::Error => b'E',
            Self::Accept => b'G',
            Self::Info => b'I',
            Self::JoinCoordinator => b'J',
            Self::FailoverLockingRequest => b'K',
            Self::FailoverCommand => b'F',
            Self::IamCoordinator => b'M',
            Self::IamInNetworkTrouble => b'N',
            Self::OnlineRecoveryCommand => b'O',
            Self::QuorumIsLost => b'Q',
            Self::Reject => b'R',
            Self::StandForCoordinator => b'S',
            Self::RemoteFailoverRequest => b'V',
            Self::InformIAmGoingDown => b'X',
            Self::AskForPoolConfig => b'Y',
            Self::PoolConfigData => b'Z',
            Self::GetMasterDataRequest => b'k',
            Self::CmdReplyInData => b'-',
        }
    }

    /// True for messages that expect a tracked reply via the cluster
    /// command tracker (§4.4), as opposed to one-shot notifications.
    pub fn expects_reply(self) -> bool {
        !matches!(
            self,
            Self::InformIAmGoingDown | Self::IamCoordinator | Self::QuorumIsLost
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(PacketType::AddNode, b'A')]
    #[test_case(PacketType::RequestInfo, b'B')]
    #[test_case(PacketType::DeclareCoordinator, b'C')]
    #[test_case(PacketType::Reject, b'R')]
    #[test_case(PacketType::RemoteFailoverRequest, b'V')]
    #[test_case(PacketType::CmdReplyInData, b'-')]
    #[test_case(PacketType::GetMasterDataRequest, b'k')]
    fn byte_round_trip(ty: PacketType, byte: u8) {
        assert_eq!(ty.to_byte(), byte);
        assert_eq!(PacketType::from_byte(byte), Some(ty));
    }

    #[test]
    fn unknown_byte_rejected() {
        assert_eq!(PacketType::from_byte(0u8), None);
        assert_eq!(PacketType::from_byte(b'?'), None);
    }

    #[test]
    fn going_down_is_fire_and_forget() {
        assert!(!PacketType::InformIAmGoingDown.expects_reply());
        assert!(PacketType::AddNode.expects_reply());
    }
}
