//! Ripcast Core - lockstep broadcast streaming of rip audio playlists.
//!
//! This crate provides the broadcast engine behind the Ripcast server: a
//! single-threaded event loop that serves one shared audio stream to every
//! connected TCP client. Once per second the engine reads the next chunk of
//! the currently playing `.rip` track and fans it out; at end-of-track the
//! playlist cursor advances with wrap-around and the next frame every
//! client sees is the new track's metadata.
//!
//! # Architecture
//!
//! - [`codec`]: rip container parsing and the client wire framing
//! - [`registry`]: fixed-capacity client slab with stable handles
//! - [`playlist`]: `.rip` discovery and the shared playback cursor
//! - [`engine`]: the event loop (listener, tick timer, client lifecycle)
//! - [`net`]: listener setup over raw sockets
//! - [`protocol_constants`]: container and wire protocol invariants
//! - [`error`]: centralized error types

#![warn(clippy::all)]

pub mod codec;
pub mod engine;
pub mod error;
pub mod net;
pub mod playlist;
pub mod protocol_constants;
pub mod registry;

// Re-export commonly used types at the crate root
pub use codec::{ChunkHeader, CodecError, Metadata};
pub use engine::{Engine, EngineConfig};
pub use error::{RipcastError, RipcastResult};
pub use net::bind_listener;
pub use playlist::{Playlist, PlaylistError};
pub use registry::Registry;
