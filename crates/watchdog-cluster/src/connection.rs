//! Per-peer connection state (C2, §4.2).
//!
//! Each peer has two independent sockets: the *client* socket we opened
//! to them, and the *server* socket they opened to us. Reads are
//! accepted on either; writes prefer the client socket and fall back to
//! the server socket (§4.2).

use std::io::{self, Read, Write};
use std::time::Instant;

use bytes::BytesMut;
use mio::net::TcpStream;
use mio::Token;

use watchdog_wire::PeerFrame;

/// One TCP half of a peer link, plus its framed read/write buffers.
pub struct Socket {
    pub stream: TcpStream,
    pub token: Token,
    pub read_buf: BytesMut,
    pub write_buf: BytesMut,
}

impl Socket {
    pub fn new(stream: TcpStream, token: Token) -> Self {
        Self {
            stream,
            token,
            read_buf: BytesMut::with_capacity(4096),
            write_buf: BytesMut::with_capacity(4096),
        }
    }

    /// Drains the socket into `read_buf` until `WouldBlock`. Returns
    /// `Ok(false)` on an orderly close (§4.1 "a short read closes the
    /// connection").
    pub fn fill_read_buf(&mut self) -> io::Result<bool> {
        let mut tmp = [0u8; 4096];
        loop {
            match self.stream.read(&mut tmp) {
                Ok(0) => return Ok(false),
                Ok(n) => self.read_buf.extend_from_slice(&tmp[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Flushes as much of `write_buf` as the socket accepts right now.
    /// Partial writes are retried on the next readiness event; a hard
    /// error closes the connection (§4.1 "Partial writes are retried
    /// until completion or failure").
    pub fn flush_write_buf(&mut self) -> io::Result<()> {
        while !self.write_buf.is_empty() {
            match self.stream.write(&self.write_buf) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => {
                    let _ = self.write_buf.split_to(n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn enqueue(&mut self, frame: &PeerFrame) {
        frame.encode(&mut self.write_buf);
    }
}

/// Outbound connect lifecycle (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundState {
    Disconnected,
    WaitingForConnect,
    Connected,
}

/// Everything the runtime tracks for one peer beyond what the kernel's
/// `NodeRecord` already holds: the live sockets themselves and the
/// reconnect cooldown (§4.2).
pub struct PeerConnection {
    pub client: Option<Socket>,
    pub server: Option<Socket>,
    pub outbound_state: OutboundState,
    pub last_connect_attempt: Option<Instant>,
}

impl Default for PeerConnection {
    fn default() -> Self {
        Self {
            client: None,
            server: None,
            outbound_state: OutboundState::Disconnected,
            last_connect_attempt: None,
        }
    }
}

impl PeerConnection {
    pub fn is_reachable(&self) -> bool {
        self.client.is_some() || self.server.is_some()
    }

    /// Whether a reconnect attempt may be made now (§4.2: "no sooner than
    /// 10 seconds after the last attempt").
    pub fn may_reconnect(&self, now: Instant, cooldown: std::time::Duration) -> bool {
        match self.last_connect_attempt {
            None => true,
            Some(last) => now.duration_since(last) >= cooldown,
        }
    }

    /// Prefers the client socket for writes, falling back to the server
    /// socket (§4.2).
    pub fn preferred_write_socket_mut(&mut self) -> Option<&mut Socket> {
        if self.client.is_some() {
            self.client.as_mut()
        } else {
            self.server.as_mut()
        }
    }
}
