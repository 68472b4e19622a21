//! Cluster command bookkeeping (§3, §4.4).

use serde::{Deserialize, Serialize};

/// Where a cluster command originated (§3 "Cluster Command Record").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandSource {
    Ipc,
    Local,
    Remote,
    Internal,
}

/// Per-peer state within one cluster command's result table (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeCommandState {
    #[default]
    Init,
    Sent,
    Replied,
    SendError,
    DoNotSend,
}

/// Terminal status of a finalized cluster command (§3, §4.4, invariant I2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandStatus {
    InProgress,
    AllReplied,
    Timeout,
    Rejected,
    SendFailed,
}

impl CommandStatus {
    pub fn is_finalized(self) -> bool {
        !matches!(self, CommandStatus::InProgress)
    }
}
