//! Imperative shell around [`watchdog_kernel`]: the connection manager,
//! event loop, cluster command tracker, and escalation supervisor (C2,
//! C3, C4, C10). Everything here touches sockets, the clock, or
//! subprocesses; the decisions themselves stay in the kernel.

mod connection;
mod error;
mod escalation;
mod ipc_conn;
mod runtime;
mod tracker;

pub use connection::{OutboundState, PeerConnection, Socket};
pub use error::{ClusterError, Result};
pub use escalation::EscalationSupervisor;
pub use ipc_conn::IpcClientConn;
pub use runtime::{PendingEffects, Runtime, RuntimeConfig};
pub use tracker::{CommandTracker, TrackedCommand};
