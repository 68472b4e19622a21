//! Pure watchdog kernel: state machine (C5), quorum and membership (C6),
//! lock service (C7), and failover registry (C8).
//!
//! Everything here is synchronous, deterministic, and free of sockets,
//! clocks, and randomness — the imperative shell (`watchdog-cluster`)
//! drives it with [`event::WatchdogEvent`]s stamped with its own view of
//! wall-clock time and carries out the [`output::KernelOutput`] it gets
//! back.

mod cluster;
mod command;
mod effect;
mod election;
mod event;
mod output;
mod packet;

pub use cluster::{Cluster, FailoverAdmission, Timing};
pub use command::{CommandId, CommandIdAllocator, IssueCommand, Target};
pub use effect::{Effect, Notification};
pub use election::{rank_candidates, we_win_exact_tie};
pub use event::{TimeoutKind, WatchdogEvent};
pub use output::KernelOutput;
pub use packet::IncomingPacket;
