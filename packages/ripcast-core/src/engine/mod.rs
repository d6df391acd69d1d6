//! The broadcast engine: one event loop multiplexing the listener, the
//! tick timer and every client socket.
//!
//! All clients share a single playback cursor. Each tick reads the next
//! chunk of the current track and re-arms every initialized client to send
//! it; a client still mid-frame from the previous tick has its progress
//! discarded and loses the undelivered tail. Real time beats completeness:
//! the producer cadence is strictly wall-clock driven and no per-client
//! queue exists.
//!
//! The loop is single-threaded and cooperative. It suspends only in the
//! `select!` below; every socket operation is a non-blocking `try_read` /
//! `try_write` against a readiness event, and a would-block result parks
//! the socket until its next edge.

mod client;

use std::fs::File;
use std::future::{poll_fn, Future};
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::path::Path;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::codec::{self, CodecError};
use crate::error::{RipcastError, RipcastResult};
use crate::playlist::Playlist;
use crate::protocol_constants::{CHUNK_FRAME_MAX, MAX_CLIENTS, TICK_INTERVAL};
use crate::registry::Registry;

use client::{Client, Progress, Wait};

/// Engine tuning. Defaults are the production protocol values; tests shrink
/// the tick to keep wall-clock time down.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Registry capacity: connections beyond it are dropped at accept.
    pub max_clients: usize,
    /// Broadcast cadence.
    pub tick: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_clients: MAX_CLIENTS,
            tick: TICK_INTERVAL,
        }
    }
}

/// Decoder state for the currently playing track.
struct Track {
    reader: BufReader<File>,
    /// Pre-encoded wire metadata frame, broadcast at track boundaries and
    /// to freshly initialized clients.
    metadata_frame: Bytes,
    /// Cumulative playback time, centiseconds since track start.
    time_cs: u32,
}

impl Track {
    /// Opens a container and prepares its wire metadata frame.
    fn load(path: &Path) -> Result<Self, CodecError> {
        let mut reader = BufReader::new(File::open(path)?);
        let metadata = codec::parse_metadata(&mut reader)?;
        log::info!("[Engine] current song: {metadata}");
        let metadata_frame = codec::encode_metadata(&metadata)?;
        Ok(Self {
            reader,
            metadata_frame,
            time_cs: 0,
        })
    }
}

/// Readiness flavor delivered to a client handler.
enum Readiness {
    Readable,
    Writable,
    /// The readiness poll itself failed for this socket.
    Failed,
}

/// One multiplexed occurrence, computed inside `select!` and handled with
/// the engine borrowed mutably.
enum Event {
    Shutdown,
    Tick,
    Inbound(io::Result<(TcpStream, SocketAddr)>),
    Client(usize, Readiness),
}

/// The broadcast engine. Owns the listener, the client registry, the
/// playlist cursor and the current track's decoder state.
pub struct Engine {
    listener: TcpListener,
    clients: Registry<Client>,
    playlist: Playlist,
    track: Track,
    /// Current broadcast frame buffer (header + payload), valid up to
    /// `chunk_len`.
    chunk: Box<[u8]>,
    chunk_len: usize,
    /// The boundary tick pre-reads the new track's first chunk; the next
    /// tick broadcasts it instead of reading past it.
    chunk_carried: bool,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine over an already-bound listener. The first track is
    /// loaded eagerly: an unreadable first track is a startup failure.
    pub fn new(
        listener: TcpListener,
        playlist: Playlist,
        config: EngineConfig,
    ) -> RipcastResult<Self> {
        let track = Track::load(playlist.current())?;
        Ok(Self {
            listener,
            clients: Registry::new(config.max_clients),
            playlist,
            track,
            chunk: vec![0u8; CHUNK_FRAME_MAX].into_boxed_slice(),
            chunk_len: 0,
            chunk_carried: false,
            config,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the event loop until `shutdown` resolves or the engine hits an
    /// infrastructure failure. Per-client and per-track failures are
    /// contained and never end the loop.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> RipcastResult<()> {
        tokio::pin!(shutdown);
        let mut ticker = time::interval_at(Instant::now() + self.config.tick, self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!("[Engine] listening on {}", self.listener.local_addr()?);

        loop {
            let event = tokio::select! {
                biased;

                _ = shutdown.as_mut() => Event::Shutdown,

                _ = ticker.tick() => Event::Tick,

                inbound = self.listener.accept() => Event::Inbound(inbound),

                (handle, readiness) = poll_fn(|cx| poll_client_readiness(&self.clients, cx)) => {
                    Event::Client(handle, readiness)
                }
            };

            match event {
                Event::Shutdown => {
                    log::info!("[Engine] interrupted, shutting down");
                    break;
                }
                Event::Tick => self.on_tick()?,
                Event::Inbound(inbound) => self.on_inbound(inbound),
                Event::Client(handle, readiness) => self.on_client_ready(handle, readiness),
            }
        }

        // Dropping the registry closes every client socket with a FIN.
        Ok(())
    }

    /// Tick handler: advance the broadcast frame, then re-arm every
    /// initialized client in ascending handle order.
    fn on_tick(&mut self) -> RipcastResult<()> {
        let boundary = self.advance_frame()?;

        let mut cursor = self.clients.first_handle();
        while let Some(handle) = cursor {
            cursor = self.clients.next_handle(handle);
            if let Some(client) = self.clients.get_mut(handle) {
                if client.initialized {
                    client.wrote = 0;
                    if boundary {
                        client.needs_metadata = true;
                    }
                    client.idle = false;
                }
            }
        }
        Ok(())
    }

    /// Produces this tick's broadcast frame. Returns true on a track
    /// boundary: clients must see the new metadata before the new audio.
    fn advance_frame(&mut self) -> RipcastResult<bool> {
        if self.chunk_carried {
            // first chunk of the track, read at the boundary tick
            self.chunk_carried = false;
            return Ok(false);
        }

        match codec::read_chunk(&mut self.track.reader, &mut self.chunk, &mut self.track.time_cs)
        {
            Ok(len) if len > 0 => {
                self.chunk_len = len;
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) => log::warn!(
                "[Engine] read failed on {}: {e}, skipping track",
                self.playlist.current().display()
            ),
        }

        self.next_track()?;
        self.chunk_len = match codec::read_chunk(
            &mut self.track.reader,
            &mut self.chunk,
            &mut self.track.time_cs,
        ) {
            Ok(len) => len,
            Err(e) => {
                log::warn!(
                    "[Engine] read failed on {}: {e}",
                    self.playlist.current().display()
                );
                0
            }
        };
        self.chunk_carried = self.chunk_len > 0;
        Ok(true)
    }

    /// Advances the playlist cursor, skipping unreadable tracks. A full
    /// cycle of failures means nothing is playable; that is fatal.
    fn next_track(&mut self) -> RipcastResult<()> {
        for _ in 0..self.playlist.len() {
            let path = self.playlist.advance().to_path_buf();
            match Track::load(&path) {
                Ok(track) => {
                    self.track = track;
                    return Ok(());
                }
                Err(e) => log::warn!("[Engine] skipping {}: {e}", path.display()),
            }
        }
        Err(RipcastError::PlaylistExhausted(self.playlist.len()))
    }

    /// Accept handler: admits the connection behind the readiness event,
    /// then drains the backlog until accept would block.
    fn on_inbound(&mut self, first: io::Result<(TcpStream, SocketAddr)>) {
        match first {
            Ok((stream, peer)) => self.admit(stream, peer),
            Err(e) => {
                log::warn!("[Engine] accept failed: {e}");
                return;
            }
        }
        while let Some(next) = self.listener.accept().now_or_never() {
            match next {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(e) => {
                    log::warn!("[Engine] accept failed: {e}");
                    break;
                }
            }
        }
    }

    fn admit(&mut self, stream: TcpStream, peer: SocketAddr) {
        match self.clients.insert(Client::new(stream, peer)) {
            Ok(handle) => {
                if let Some(client) = self.clients.get_mut(handle) {
                    client.handle = handle;
                }
                log::info!("[Engine] accepted {peer} as client {handle}");
            }
            Err(rejected) => {
                log::warn!(
                    "[Engine] registry full ({} clients), dropping {}",
                    self.clients.capacity(),
                    rejected.peer
                );
            }
        }
    }

    fn on_client_ready(&mut self, handle: usize, readiness: Readiness) {
        let Some(client) = self.clients.get_mut(handle) else {
            return;
        };
        let progress = match readiness {
            Readiness::Failed => Progress::Close,
            Readiness::Readable if !client.initialized => client.handshake(),
            // initialized clients never send; readability is hangup or noise
            Readiness::Readable => Progress::Close,
            Readiness::Writable => {
                let frame: &[u8] = if client.needs_metadata {
                    &self.track.metadata_frame
                } else {
                    &self.chunk[..self.chunk_len]
                };
                client.send_frame(frame)
            }
        };
        if let Progress::Close = progress {
            self.close_client(handle);
        }
    }

    /// Tears a client down. Removal drops the socket, which closes both
    /// directions and returns the registry slot.
    fn close_client(&mut self, handle: usize) {
        if let Some(client) = self.clients.remove(handle) {
            log::info!("[Engine] closed client {} ({})", client.handle, client.peer);
        }
    }
}

/// Polls every client for the readiness its state asks for, in ascending
/// handle order, and yields the first that is ready. Readiness stays set
/// until a `try_read`/`try_write` hits would-block, so clients behind the
/// yielded one are picked up on later loop iterations without losing
/// events.
fn poll_client_readiness(
    clients: &Registry<Client>,
    cx: &mut Context<'_>,
) -> Poll<(usize, Readiness)> {
    for (handle, client) in clients.iter() {
        let poll = match client.wait() {
            Wait::Read => client.stream.poll_read_ready(cx),
            Wait::Write => client.stream.poll_write_ready(cx),
        };
        match poll {
            Poll::Ready(Ok(())) => {
                let readiness = match client.wait() {
                    Wait::Read => Readiness::Readable,
                    Wait::Write => Readiness::Writable,
                };
                return Poll::Ready((handle, readiness));
            }
            Poll::Ready(Err(_)) => return Poll::Ready((handle, Readiness::Failed)),
            Poll::Pending => {}
        }
    }
    Poll::Pending
}
