//! Per-client record and socket handlers.
//!
//! Handlers return [`Progress`]: a client failure is terminal for that
//! client only and never reaches the engine's error channel.

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::protocol_constants::HANDSHAKE_BYTE;

/// Readiness a client waits for between events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wait {
    Read,
    Write,
}

/// Outcome of a per-client handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Continue,
    Close,
}

pub(crate) struct Client {
    pub(crate) stream: TcpStream,
    pub(crate) peer: SocketAddr,
    /// Stable registry handle, written back right after insertion.
    pub(crate) handle: usize,
    /// True once the handshake byte has been received.
    pub(crate) initialized: bool,
    /// Selects the metadata frame as the next outbound buffer.
    pub(crate) needs_metadata: bool,
    /// Bytes of the current outbound frame already sent.
    pub(crate) wrote: usize,
    /// Frame complete; nothing to send until the next tick re-arms us.
    pub(crate) idle: bool,
}

impl Client {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            handle: 0,
            initialized: false,
            needs_metadata: true,
            wrote: 0,
            idle: false,
        }
    }

    /// Readiness this client is currently interested in: armed clients wait
    /// to write their frame; handshaking and idle clients wait on the read
    /// side, for the handshake byte or for hangup detection (an initialized
    /// client never legitimately sends).
    pub(crate) fn wait(&self) -> Wait {
        if self.initialized && !self.idle {
            Wait::Write
        } else {
            Wait::Read
        }
    }

    /// Handles read readiness during the handshake: a single receive of a
    /// single byte. Only [`HANDSHAKE_BYTE`] initializes; EOF, any other
    /// byte, or a hard error is terminal.
    pub(crate) fn handshake(&mut self) -> Progress {
        let mut byte = [0u8; 1];
        match self.stream.try_read(&mut byte) {
            Ok(1) if byte[0] == HANDSHAKE_BYTE => {
                self.initialized = true;
                log::info!("[Engine] initialized client {} ({})", self.handle, self.peer);
                Progress::Continue
            }
            Ok(_) => Progress::Close,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Progress::Continue,
            Err(_) => Progress::Close,
        }
    }

    /// Sends the current frame starting at the per-client offset, looping
    /// until completion or would-block; short writes resume from `wrote` on
    /// the next readiness event. An empty frame, a zero-length transfer, or
    /// a hard error is terminal.
    pub(crate) fn send_frame(&mut self, frame: &[u8]) -> Progress {
        if frame.is_empty() {
            return Progress::Close;
        }
        while self.wrote < frame.len() {
            match self.stream.try_write(&frame[self.wrote..]) {
                Ok(0) => return Progress::Close,
                Ok(n) => self.wrote += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Progress::Continue,
                Err(_) => return Progress::Close,
            }
        }
        self.needs_metadata = false;
        self.idle = true;
        Progress::Continue
    }
}
