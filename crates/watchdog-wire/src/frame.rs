//! Wire framing (§4.1, §6.1, §6.3).
//!
//! Peer frame: `[1 byte type][4 bytes commandID, big-endian][4 bytes
//! length, big-endian][length bytes payload]`.
//!
//! IPC request frame: identical but the 4-byte commandID is omitted — IPC
//! peers use the socket itself for correlation (§4.1).
//!
//! IPC response frame: `[1 byte result-tag][4-byte length big-endian]
//! [payload]` (§6.3).
//!
//! Decoding follows the same incremental-buffer shape as
//! `kimberlite-server::connection::Connection::try_decode_request`: callers
//! keep appending bytes to a `BytesMut` and call `decode` after every read;
//! a `None` return means "keep reading", never a half-frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use watchdog_types::{PacketType, MAX_PAYLOAD_LEN};

use crate::error::{WireError, WireResult};

pub const FRAME_HEADER_SIZE_PEER: usize = 1 + 4 + 4;
pub const FRAME_HEADER_SIZE_IPC: usize = 1 + 4;

/// A decoded peer-socket frame (§4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerFrame {
    pub ty: PacketType,
    pub command_id: u32,
    pub payload: Bytes,
}

impl PeerFrame {
    pub fn new(ty: PacketType, command_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            ty,
            command_id,
            payload: payload.into(),
        }
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.reserve(FRAME_HEADER_SIZE_PEER + self.payload.len());
        out.put_u8(self.ty.to_byte());
        out.put_u32(self.command_id);
        out.put_u32(self.payload.len() as u32);
        out.put_slice(&self.payload);
    }

    /// Attempts to decode one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` if `buf` does not yet hold a full frame. A
    /// declared length over [`MAX_PAYLOAD_LEN`] is a protocol error and the
    /// caller must close the connection (§4.1, §7); an unrecognized type
    /// byte is likewise a protocol error, but the header is still consumed
    /// so the stream can be reported and closed cleanly.
    pub fn decode(buf: &mut BytesMut) -> WireResult<Option<Self>> {
        if buf.len() < FRAME_HEADER_SIZE_PEER {
            return Ok(None);
        }

        let type_byte = buf[0];
        let command_id = u32::from_be_bytes(buf[1..5].try_into().unwrap());
        let length = u32::from_be_bytes(buf[5..9].try_into().unwrap());

        if length > MAX_PAYLOAD_LEN {
            buf.advance(FRAME_HEADER_SIZE_PEER);
            return Err(WireError::PayloadTooLarge(length));
        }

        if buf.len() < FRAME_HEADER_SIZE_PEER + length as usize {
            return Ok(None);
        }

        let ty = PacketType::from_byte(type_byte).ok_or(WireError::UnknownPacketType(type_byte))?;

        buf.advance(FRAME_HEADER_SIZE_PEER);
        let payload = buf.split_to(length as usize).freeze();

        Ok(Some(Self {
            ty,
            command_id,
            payload,
        }))
    }
}

/// A decoded IPC request frame (§6.3).
///
/// The IPC vocabulary (§4.9) is a separate closed enumeration from the
/// peer vocabulary (§6.1) — three of its verbs (`NODE_STATUS_CHANGE`,
/// `REGISTER_FOR_NOTIFICATION`, `GET_NODES_LIST`) have no peer-wire
/// counterpart — so the codec carries the raw type byte and leaves
/// interpreting it to `watchdog-ipc`, exactly as it already does for the
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcRequestFrame {
    pub type_byte: u8,
    pub payload: Bytes,
}

impl IpcRequestFrame {
    pub fn new(type_byte: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            type_byte,
            payload: payload.into(),
        }
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.reserve(FRAME_HEADER_SIZE_IPC + self.payload.len());
        out.put_u8(self.type_byte);
        out.put_u32(self.payload.len() as u32);
        out.put_slice(&self.payload);
    }

    pub fn decode(buf: &mut BytesMut) -> WireResult<Option<Self>> {
        if buf.len() < FRAME_HEADER_SIZE_IPC {
            return Ok(None);
        }

        let type_byte = buf[0];
        let length = u32::from_be_bytes(buf[1..5].try_into().unwrap());

        if length > MAX_PAYLOAD_LEN {
            buf.advance(FRAME_HEADER_SIZE_IPC);
            return Err(WireError::PayloadTooLarge(length));
        }

        if buf.len() < FRAME_HEADER_SIZE_IPC + length as usize {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE_IPC);
        let payload = buf.split_to(length as usize).freeze();

        Ok(Some(Self { type_byte, payload }))
    }
}

/// IPC response result tag (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTag {
    Ok,
    Bad,
    ClusterInTransaction,
    Timeout,
}

impl ResultTag {
    fn to_byte(self) -> u8 {
        match self {
            ResultTag::Ok => b'O',
            ResultTag::Bad => b'B',
            ResultTag::ClusterInTransaction => b'T',
            ResultTag::Timeout => b'W',
        }
    }

    fn from_byte(byte: u8) -> WireResult<Self> {
        Ok(match byte {
            b'O' => ResultTag::Ok,
            b'B' => ResultTag::Bad,
            b'T' => ResultTag::ClusterInTransaction,
            b'W' => ResultTag::Timeout,
            other => return Err(WireError::UnknownResultTag(other)),
        })
    }
}

/// A decoded IPC response frame (§4.9, §6.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcResponseFrame {
    pub tag: ResultTag,
    pub payload: Bytes,
}

impl IpcResponseFrame {
    pub fn new(tag: ResultTag, payload: impl Into<Bytes>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.reserve(FRAME_HEADER_SIZE_IPC + self.payload.len());
        out.put_u8(self.tag.to_byte());
        out.put_u32(self.payload.len() as u32);
        out.put_slice(&self.payload);
    }

    pub fn decode(buf: &mut BytesMut) -> WireResult<Option<Self>> {
        if buf.len() < FRAME_HEADER_SIZE_IPC {
            return Ok(None);
        }

        let tag_byte = buf[0];
        let length = u32::from_be_bytes(buf[1..5].try_into().unwrap());

        if length > MAX_PAYLOAD_LEN {
            buf.advance(FRAME_HEADER_SIZE_IPC);
            return Err(WireError::PayloadTooLarge(length));
        }

        if buf.len() < FRAME_HEADER_SIZE_IPC + length as usize {
            return Ok(None);
        }

        let tag = ResultTag::from_byte(tag_byte)?;

        buf.advance(FRAME_HEADER_SIZE_IPC);
        let payload = buf.split_to(length as usize).freeze();

        Ok(Some(Self { tag, payload }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn peer_frame_round_trips() {
        let frame = PeerFrame::new(PacketType::AddNode, 42, Bytes::from_static(b"hello"));
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);

        let decoded = PeerFrame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn peer_frame_needs_more_data() {
        let frame = PeerFrame::new(PacketType::Info, 1, Bytes::from_static(b"partial"));
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        let mut short = BytesMut::from(&buf[..buf.len() - 2]);
        assert_eq!(PeerFrame::decode(&mut short).unwrap(), None);
    }

    #[test]
    fn peer_frame_rejects_oversized_length() {
        let mut buf = BytesMut::new();
        buf.put_u8(PacketType::Data.to_byte());
        buf.put_u32(7);
        buf.put_u32(MAX_PAYLOAD_LEN + 1);
        assert!(matches!(
            PeerFrame::decode(&mut buf),
            Err(WireError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn peer_frame_rejects_unknown_type() {
        let mut buf = BytesMut::new();
        buf.put_u8(0xFF);
        buf.put_u32(0);
        buf.put_u32(0);
        assert!(matches!(
            PeerFrame::decode(&mut buf),
            Err(WireError::UnknownPacketType(0xFF))
        ));
    }

    #[test]
    fn ipc_request_frame_round_trips() {
        let frame = IpcRequestFrame::new(PacketType::FailoverCommand.to_byte(), Bytes::from_static(b"{}"));
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        let decoded = IpcRequestFrame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn ipc_response_frame_round_trips() {
        let frame = IpcResponseFrame::new(ResultTag::Ok, Bytes::from_static(b"ok"));
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        let decoded = IpcResponseFrame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.tag, ResultTag::Ok);
        assert_eq!(decoded.payload, frame.payload);
    }

    proptest! {
        #[test]
        fn peer_frame_round_trips_arbitrary_payload(command_id in any::<u32>(), payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let frame = PeerFrame::new(PacketType::Data, command_id, Bytes::from(payload));
            let mut buf = BytesMut::new();
            frame.encode(&mut buf);
            let decoded = PeerFrame::decode(&mut buf).unwrap().unwrap();
            prop_assert_eq!(decoded, frame);
        }
    }
}
