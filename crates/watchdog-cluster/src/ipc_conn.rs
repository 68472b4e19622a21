//! Per-client IPC socket buffering (§6.3), the unix-domain analogue of
//! [`crate::connection::Socket`].

use std::io::{self, Read, Write};

use bytes::BytesMut;
use mio::net::UnixStream;
use mio::Token;

use watchdog_wire::IpcResponseFrame;

pub struct IpcClientConn {
    pub stream: UnixStream,
    pub token: Token,
    pub read_buf: BytesMut,
    pub write_buf: BytesMut,
    /// Set once this client issues `REGISTER_FOR_NOTIFICATION`; such a
    /// socket is never closed after a response and instead receives
    /// further pushed frames (§6.3).
    pub subscribed: bool,
}

impl IpcClientConn {
    pub fn new(stream: UnixStream, token: Token) -> Self {
        Self {
            stream,
            token,
            read_buf: BytesMut::with_capacity(4096),
            write_buf: BytesMut::with_capacity(4096),
            subscribed: false,
        }
    }

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

    pub fn enqueue(&mut self, frame: &IpcResponseFrame) {
        frame.encode(&mut self.write_buf);
    }
}
