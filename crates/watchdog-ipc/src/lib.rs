//! IPC Server vocabulary, authentication, and routing (C9, §4.9, §6.3).
//!
//! This crate is sans-I/O: it decodes and authenticates a request and
//! decides what should happen, but never touches a socket itself. The
//! unix-domain listener and its read/write buffers live in
//! `watchdog-cluster::Runtime`, which is the one event loop IPC sockets
//! and peer sockets both feed (§5 "Data flow: ... IPC sockets feed C9 →
//! same state machine via C3").

mod auth;
mod error;
mod handler;
mod payload;
mod vocabulary;

pub use auth::{AuthFailure, IpcAuth};
pub use error::{IpcError, IpcResult};
pub use handler::{HandleResult, IpcHandler, IpcOutcome};
pub use payload::{
    AuthFields, FailoverCommandPayload, FailoverCommandResponse, FailoverLockingPayload,
    FailoverLockingResponse, GetMasterDataPayload, GetMasterDataResponse, GetNodesListPayload,
    GetNodesListResponse, LockVerb, NodeStatusChangePayload, NodeSummary, OnlineRecoveryPayload,
    RegisterForNotificationPayload,
};
pub use vocabulary::{Authority, IpcCommandType};
