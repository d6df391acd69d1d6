//! Rip container parsing and the client wire framing.
//!
//! A rip container is big-endian throughout: a 3-byte ASCII signature,
//! three u16-length-prefixed UTF-8 strings (name, artist, album), a u32 raw
//! PCM byte count, then the PCM payload until EOF. The wire protocol keeps
//! the same byte order: a metadata frame (tag 0x01) carries the track header
//! with the duration in centiseconds, an audio frame (tag 0x02) carries one
//! tick's worth of PCM behind a 9-byte header.
//!
//! All multi-byte integers cross the serialize/parse boundary through
//! explicit big-endian conversions; nothing here depends on host byte order.

use std::fmt;
use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::protocol_constants::{
    CHUNK_HEADER_LEN, CONTAINER_SIGNATURE, FRAME_TAG_AUDIO, FRAME_TAG_METADATA,
    METADATA_FRAME_OVERHEAD, SAMPLE_BYTES_PER_SECOND, SAMPLE_RATE_HZ, SAMPLE_SIZE_BITS,
};

/// Errors from container parsing and wire framing.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stream does not open with the `rip` signature.
    #[error("bad container signature")]
    BadSignature,

    /// The stream ended inside a required header field.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A metadata string is not valid UTF-8.
    #[error("metadata field is not valid UTF-8")]
    InvalidUtf8,

    /// A field is too long for its on-wire length prefix.
    #[error("field exceeds its length prefix")]
    FieldTooLong,

    /// A frame opened with a tag this decoder does not know.
    #[error("bad frame tag {0:#04x}")]
    BadTag(u8),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Track metadata carried by a rip container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub artist: String,
    pub album: String,
    /// Track duration in hundredths of a second, derived from the raw PCM
    /// byte count.
    pub length_cs: u32,
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - {} [{} cs]",
            self.artist, self.album, self.name, self.length_cs
        )
    }
}

/// Header of an audio chunk frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Bytes of audio payload in this frame.
    pub payload_len: u32,
    /// Cumulative track time at the start of this frame, centiseconds.
    pub time_cs: u32,
}

/// Converts a raw PCM byte count into centiseconds of playback.
///
/// 64-bit intermediates: `bytes * 8` overflows u32 well below the u32 byte
/// counts a container header can carry.
fn duration_cs(pcm_bytes: u64) -> u32 {
    (pcm_bytes * 8 / SAMPLE_SIZE_BITS as u64 / SAMPLE_RATE_HZ as u64 * 100) as u32
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), CodecError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => CodecError::UnexpectedEof,
        _ => CodecError::Io(e),
    })
}

fn parse_string<R: Read>(reader: &mut R) -> Result<String, CodecError> {
    let mut len = [0u8; 2];
    read_exact_or_eof(reader, &mut len)?;
    let mut field = vec![0u8; u16::from_be_bytes(len) as usize];
    read_exact_or_eof(reader, &mut field)?;
    String::from_utf8(field).map_err(|_| CodecError::InvalidUtf8)
}

/// Reads a rip container header, leaving the reader positioned at the first
/// byte of the PCM payload.
pub fn parse_metadata<R: Read>(reader: &mut R) -> Result<Metadata, CodecError> {
    let mut signature = [0u8; 3];
    read_exact_or_eof(reader, &mut signature)?;
    if &signature != CONTAINER_SIGNATURE {
        return Err(CodecError::BadSignature);
    }

    let name = parse_string(reader)?;
    let artist = parse_string(reader)?;
    let album = parse_string(reader)?;

    let mut count = [0u8; 4];
    read_exact_or_eof(reader, &mut count)?;
    let pcm_bytes = u32::from_be_bytes(count);

    Ok(Metadata {
        name,
        artist,
        album,
        length_cs: duration_cs(pcm_bytes as u64),
    })
}

/// Reads the next broadcast chunk from `reader` into `out`.
///
/// Fills `out[9..]` with up to one second of PCM (short reads are retried,
/// so only EOF produces a partial chunk), writes the audio frame header into
/// `out[..9]` and advances `time_cs` by the chunk's duration. Returns the
/// total frame length, or 0 at a clean end of track, in which case `out` and
/// `time_cs` are untouched.
pub fn read_chunk<R: Read>(
    reader: &mut R,
    out: &mut [u8],
    time_cs: &mut u32,
) -> Result<usize, CodecError> {
    let payload = &mut out[CHUNK_HEADER_LEN..CHUNK_HEADER_LEN + SAMPLE_BYTES_PER_SECOND];
    let mut filled = 0;
    while filled < payload.len() {
        match reader.read(&mut payload[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CodecError::Io(e)),
        }
    }
    if filled == 0 {
        return Ok(0);
    }

    out[0] = FRAME_TAG_AUDIO;
    out[1..5].copy_from_slice(&(filled as u32).to_be_bytes());
    out[5..9].copy_from_slice(&time_cs.to_be_bytes());
    *time_cs = time_cs.wrapping_add(duration_cs(filled as u64));

    Ok(CHUNK_HEADER_LEN + filled)
}

/// Encodes the wire metadata frame for a track.
pub fn encode_metadata(metadata: &Metadata) -> Result<Bytes, CodecError> {
    let fields = [
        metadata.name.as_bytes(),
        metadata.artist.as_bytes(),
        metadata.album.as_bytes(),
    ];
    if fields.iter().any(|f| f.len() > u16::MAX as usize) {
        return Err(CodecError::FieldTooLong);
    }

    let payload: usize = fields.iter().map(|f| f.len()).sum();
    let mut frame = BytesMut::with_capacity(METADATA_FRAME_OVERHEAD + payload);
    frame.put_u8(FRAME_TAG_METADATA);
    frame.put_u32(metadata.length_cs);
    for field in fields {
        frame.put_u16(field.len() as u16);
        frame.put_slice(field);
    }
    Ok(frame.freeze())
}

fn decode_string(buf: &mut &[u8]) -> Result<String, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::UnexpectedEof);
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(CodecError::UnexpectedEof);
    }
    let field = std::str::from_utf8(&buf[..len])
        .map_err(|_| CodecError::InvalidUtf8)?
        .to_owned();
    buf.advance(len);
    Ok(field)
}

/// Decodes a wire metadata frame: the inverse of [`encode_metadata`].
pub fn decode_metadata(frame: &[u8]) -> Result<Metadata, CodecError> {
    let mut buf = frame;
    if buf.remaining() < 5 {
        return Err(CodecError::UnexpectedEof);
    }
    let tag = buf.get_u8();
    if tag != FRAME_TAG_METADATA {
        return Err(CodecError::BadTag(tag));
    }
    let length_cs = buf.get_u32();
    let name = decode_string(&mut buf)?;
    let artist = decode_string(&mut buf)?;
    let album = decode_string(&mut buf)?;
    Ok(Metadata {
        name,
        artist,
        album,
        length_cs,
    })
}

/// Decodes the 9-byte header of an audio chunk frame.
pub fn decode_chunk_header(frame: &[u8]) -> Result<ChunkHeader, CodecError> {
    let mut buf = frame;
    if buf.remaining() < CHUNK_HEADER_LEN {
        return Err(CodecError::UnexpectedEof);
    }
    let tag = buf.get_u8();
    if tag != FRAME_TAG_AUDIO {
        return Err(CodecError::BadTag(tag));
    }
    Ok(ChunkHeader {
        payload_len: buf.get_u32(),
        time_cs: buf.get_u32(),
    })
}

/// Writes a complete rip container: the inverse of [`parse_metadata`] plus
/// the PCM payload. Used by encoding tooling and test fixtures.
pub fn write_container<W: Write>(
    writer: &mut W,
    name: &str,
    artist: &str,
    album: &str,
    pcm: &[u8],
) -> Result<(), CodecError> {
    let mut header = BytesMut::new();
    header.put_slice(CONTAINER_SIGNATURE);
    for field in [name, artist, album] {
        let bytes = field.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(CodecError::FieldTooLong);
        }
        header.put_u16(bytes.len() as u16);
        header.put_slice(bytes);
    }
    let pcm_bytes = u32::try_from(pcm.len()).map_err(|_| CodecError::FieldTooLong)?;
    header.put_u32(pcm_bytes);

    writer.write_all(&header)?;
    writer.write_all(pcm)?;
    Ok(())
}
