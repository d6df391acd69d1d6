//! Fixed protocol constants that should NOT be changed.
//!
//! These values define the rip container geometry and the server wire
//! protocol; changing them breaks compatibility with already-encoded tracks
//! and with deployed clients.

use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Container Format
// ─────────────────────────────────────────────────────────────────────────────

/// ASCII signature opening every rip container.
pub const CONTAINER_SIGNATURE: &[u8; 3] = b"rip";

// ─────────────────────────────────────────────────────────────────────────────
// Sample Geometry
// ─────────────────────────────────────────────────────────────────────────────

/// Sample size in bits (1-bit PCM in the reference encoding).
pub const SAMPLE_SIZE_BITS: u32 = 1;

/// Sample rate (Hz) rip containers are encoded at.
///
/// Together with [`SAMPLE_SIZE_BITS`] this fixes the container geometry:
/// 48000 1-bit samples per second make a tick's chunk exactly 6000 bytes,
/// and track durations derive from raw byte counts through this rate.
pub const SAMPLE_RATE_HZ: u32 = 48_000;

/// Raw PCM bytes broadcast per tick: exactly one second of audio.
pub const SAMPLE_BYTES_PER_SECOND: usize = (SAMPLE_SIZE_BITS * SAMPLE_RATE_HZ / 8) as usize;

// ─────────────────────────────────────────────────────────────────────────────
// Wire Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Frame tag of a metadata frame.
pub const FRAME_TAG_METADATA: u8 = 0x01;

/// Frame tag of an audio chunk frame.
pub const FRAME_TAG_AUDIO: u8 = 0x02;

/// Audio frame header: tag (1) + payload length (4) + cumulative time (4).
pub const CHUNK_HEADER_LEN: usize = 9;

/// Metadata frame overhead: tag (1) + duration (4) + three u16 string lengths.
pub const METADATA_FRAME_OVERHEAD: usize = 11;

/// Largest possible audio chunk frame, and the exact chunk buffer size.
pub const CHUNK_FRAME_MAX: usize = CHUNK_HEADER_LEN + SAMPLE_BYTES_PER_SECOND;

/// The single byte a client must send before it receives any frame.
pub const HANDSHAKE_BYTE: u8 = b'a';

// ─────────────────────────────────────────────────────────────────────────────
// Server Limits
// ─────────────────────────────────────────────────────────────────────────────

/// Default registry capacity; connections beyond it are dropped at accept.
pub const MAX_CLIENTS: usize = 64;

/// Broadcast cadence: one chunk of audio per tick.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
