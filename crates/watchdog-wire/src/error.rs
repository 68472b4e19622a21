//! Codec errors (§4.1, §7 "Protocol" errors).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("declared payload length {0} exceeds the configured ceiling")]
    PayloadTooLarge(u32),

    #[error("unknown packet type byte {0:#04x}")]
    UnknownPacketType(u8),

    #[error("unknown IPC result tag byte {0:#04x}")]
    UnknownResultTag(u8),

    #[error("malformed membership payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("short read: connection closed mid-frame")]
    ShortRead,
}

pub type WireResult<T> = std::result::Result<T, WireError>;
