//! IPC command vocabulary (§4.9): a closed enumeration distinct from the
//! peer wire vocabulary, though four of its seven verbs (`FAILOVER_COMMAND`,
//! `ONLINE_RECOVERY_COMMAND`, `FAILOVER_LOCKING_REQUEST`,
//! `GET_MASTER_DATA_REQUEST`) also name a peer packet type because they go
//! on to become a peer broadcast once admitted.

use watchdog_types::PacketType;

/// Authority a verb requires before it is routed (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Any caller on the socket may invoke this verb.
    Any,
    /// Only a caller presenting the process-internal shared key.
    ExternalOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpcCommandType {
    NodeStatusChange,
    RegisterForNotification,
    GetNodesList,
    FailoverCommand,
    OnlineRecoveryCommand,
    FailoverLockingRequest,
    GetMasterDataRequest,
}

impl IpcCommandType {
    /// The three verbs below have no peer-wire counterpart, so they claim
    /// ASCII letters the peer vocabulary (§6.1) leaves unused. The other
    /// four reuse their peer packet type's byte, since they are the same
    /// verb crossing from the application into the cluster.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::NodeStatusChange => b'H',
            Self::RegisterForNotification => b'W',
            Self::GetNodesList => b'L',
            Self::FailoverCommand => PacketType::FailoverCommand.to_byte(),
            Self::OnlineRecoveryCommand => PacketType::OnlineRecoveryCommand.to_byte(),
            Self::FailoverLockingRequest => PacketType::FailoverLockingRequest.to_byte(),
            Self::GetMasterDataRequest => PacketType::GetMasterDataRequest.to_byte(),
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            b'H' => Self::NodeStatusChange,
            b'W' => Self::RegisterForNotification,
            b'L' => Self::GetNodesList,
            _ if byte == PacketType::FailoverCommand.to_byte() => Self::FailoverCommand,
            _ if byte == PacketType::OnlineRecoveryCommand.to_byte() => Self::OnlineRecoveryCommand,
            _ if byte == PacketType::FailoverLockingRequest.to_byte() => Self::FailoverLockingRequest,
            _ if byte == PacketType::GetMasterDataRequest.to_byte() => Self::GetMasterDataRequest,
            _ => return None,
        })
    }

    /// The matching peer packet type for verbs that go on to broadcast
    /// (§4.9), `None` for the three purely local verbs.
    pub fn peer_packet_type(self) -> Option<PacketType> {
        match self {
            Self::FailoverCommand => Some(PacketType::FailoverCommand),
            Self::OnlineRecoveryCommand => Some(PacketType::OnlineRecoveryCommand),
            Self::FailoverLockingRequest => Some(PacketType::FailoverLockingRequest),
            Self::GetMasterDataRequest => Some(PacketType::GetMasterDataRequest),
            Self::NodeStatusChange | Self::RegisterForNotification | Self::GetNodesList => None,
        }
    }

    /// Authority required per §4.9's table: `REGISTER_FOR_NOTIFICATION`
    /// and `GET_NODES_LIST` are open to any caller, the other five are
    /// external-only.
    pub fn authority(self) -> Authority {
        match self {
            Self::RegisterForNotification | Self::GetNodesList => Authority::Any,
            _ => Authority::ExternalOnly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_verb_round_trips_its_byte() {
        for verb in [
            IpcCommandType::NodeStatusChange,
            IpcCommandType::RegisterForNotification,
            IpcCommandType::GetNodesList,
            IpcCommandType::FailoverCommand,
            IpcCommandType::OnlineRecoveryCommand,
            IpcCommandType::FailoverLockingRequest,
            IpcCommandType::GetMasterDataRequest,
        ] {
            assert_eq!(IpcCommandType::from_byte(verb.to_byte()), Some(verb));
        }
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert_eq!(IpcCommandType::from_byte(b'?'), None);
    }

    #[test]
    fn local_only_verbs_address_no_peer() {
        assert_eq!(IpcCommandType::GetNodesList.peer_packet_type(), None);
        assert_eq!(
            IpcCommandType::FailoverCommand.peer_packet_type(),
            Some(PacketType::FailoverCommand)
        );
    }
}
