//! Packet codec (C1): frame encode/decode for peer sockets and the IPC
//! socket (§4.1, §6.1, §6.3), plus the membership payload document and the
//! auth hash (§6.2).
//!
//! The codec never interprets the membership payload beyond what it needs
//! to validate framing — per §4.1 "The codec does not interpret this — it
//! passes bytes through" — except where it is itself the thing producing
//! or validating that payload (the `payload` and `auth` modules are a
//! convenience the whole workspace shares, not a codec responsibility).

mod auth;
mod error;
mod frame;
mod payload;

pub use auth::{compute_auth_hash, verify_auth_hash};
pub use error::{WireError, WireResult};
pub use frame::{IpcRequestFrame, IpcResponseFrame, PeerFrame, ResultTag, FRAME_HEADER_SIZE_IPC, FRAME_HEADER_SIZE_PEER};
pub use payload::{FailoverRequestPayload, MembershipPayload};
