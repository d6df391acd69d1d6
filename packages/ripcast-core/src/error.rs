//! Centralized error types for the Ripcast core library.
//!
//! Domain errors live next to their domain ([`CodecError`] in `codec`,
//! [`PlaylistError`] in `playlist`); this module aggregates them into the
//! application-wide [`RipcastError`] that `Engine::run` and startup return.
//! Per-client I/O failures never appear here: they are contained to the
//! failing client inside the engine.

use std::io;

use thiserror::Error;

use crate::codec::CodecError;
use crate::playlist::PlaylistError;

/// Application-wide error type for the Ripcast server.
#[derive(Debug, Error)]
pub enum RipcastError {
    /// Container parsing or framing failed (fatal only for the first track).
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Playlist discovery failed or found nothing to play.
    #[error("playlist error: {0}")]
    Playlist(#[from] PlaylistError),

    /// A full playlist cycle of tracks failed to load; nothing is playable.
    #[error("no playable track in playlist ({0} candidates failed)")]
    PlaylistExhausted(usize),

    /// Listener or readiness infrastructure failure that cannot be
    /// contained to a single client.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenient Result alias for application-wide operations.
pub type RipcastResult<T> = Result<T, RipcastError>;
