//! Binary frame decoding.
//!
//! Wire layout of one frame, all integers big-endian:
//!
//! ```text
//! ┌────────────┬───────────────┬─────────────┬──────────┬───────────────┐
//! │ total u32  │ headers u32   │ prelude CRC │ headers  │ payload │ CRC │
//! │            │               │ u32         │ block    │         │ u32 │
//! └────────────┴───────────────┴─────────────┴──────────┴─────────┴─────┘
//!   └──── 8-byte prelude ────┘
//! ```
//!
//! `total` counts the whole frame including both checksums, so
//! `payload = total - 8 - 4 - headers - 4` and the decoder can bound every
//! read. Both CRC32 fields are read and discarded without validation,
//! matching the reference behavior; validating them would be an explicit
//! hardening change at the two skip sites below.

use bytes::Bytes;
use std::collections::HashMap;

use crate::transport::ByteCursor;
use crate::Result;

const PRELUDE_LEN: usize = 8;
const CHECKSUM_LEN: usize = 4;
/// Prelude + both checksums: the fixed per-frame overhead.
const FRAME_OVERHEAD: u32 = (PRELUDE_LEN + 2 * CHECKSUM_LEN) as u32;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The prelude promised more bytes than the stream delivered.
    #[error("truncated frame: stream ended inside {section} ({got} of {expected} bytes)")]
    Truncated {
        section: &'static str,
        expected: usize,
        got: usize,
    },

    /// `total_length` is too small to hold the declared header block plus
    /// the fixed overhead; the computed payload length would be negative.
    #[error("malformed frame: total length {total_length} cannot hold {headers_length} header bytes")]
    LengthUnderflow {
        total_length: u32,
        headers_length: u32,
    },

    #[error("malformed header block: {0}")]
    HeaderBlock(String),
}

/// One decoded frame. Frames do not outlive the decode iteration that
/// produced them; the interpreter consumes them immediately.
#[derive(Debug, Clone)]
pub struct Frame {
    pub total_length: u32,
    pub headers: HashMap<String, HeaderValue>,
    pub payload: Bytes,
}

impl Frame {
    /// The `:event-type` header, when present and valid UTF-8.
    pub fn event_type(&self) -> Option<&str> {
        self.headers.get(":event-type").and_then(|v| v.as_str())
    }

    /// The `:message-type` header (`event`, `error`, or `exception`).
    pub fn message_type(&self) -> Option<&str> {
        self.headers.get(":message-type").and_then(|v| v.as_str())
    }
}

/// A header value: the wire type tag plus the raw value bytes. Values are
/// treated as opaque byte strings of the declared length; the tag is kept
/// but not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderValue {
    pub value_type: u8,
    pub bytes: Bytes,
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Decode the next frame from the cursor.
///
/// Returns `Ok(None)` on clean end-of-stream: zero bytes (or a final
/// fragment shorter than a prelude) where a new frame would start. Once a
/// full prelude has been read the frame is committed, and any short read
/// after that point is a [`DecodeError::Truncated`].
pub async fn next_frame(cursor: &mut ByteCursor) -> Result<Option<Frame>> {
    let prelude = cursor.read(PRELUDE_LEN).await?;
    if prelude.len() < PRELUDE_LEN {
        return Ok(None);
    }
    let total_length = u32::from_be_bytes([prelude[0], prelude[1], prelude[2], prelude[3]]);
    let headers_length = u32::from_be_bytes([prelude[4], prelude[5], prelude[6], prelude[7]]);

    // Reject before attempting any read with a wrapped length.
    let Some(payload_length) = total_length
        .checked_sub(FRAME_OVERHEAD)
        .and_then(|n| n.checked_sub(headers_length))
    else {
        return Err(DecodeError::LengthUnderflow {
            total_length,
            headers_length,
        }
        .into());
    };

    read_section(cursor, CHECKSUM_LEN, "prelude checksum").await?;

    let headers = if headers_length > 0 {
        let block = read_section(cursor, headers_length as usize, "header block").await?;
        parse_headers(&block)?
    } else {
        HashMap::new()
    };

    let payload = if payload_length > 0 {
        read_section(cursor, payload_length as usize, "payload").await?
    } else {
        Bytes::new()
    };

    read_section(cursor, CHECKSUM_LEN, "trailing checksum").await?;

    Ok(Some(Frame {
        total_length,
        headers,
        payload,
    }))
}

/// Read exactly `n` bytes of a committed frame; a short read here means the
/// frame promised a length it did not deliver.
async fn read_section(cursor: &mut ByteCursor, n: usize, section: &'static str) -> Result<Bytes> {
    let bytes = cursor.read(n).await?;
    if bytes.len() < n {
        return Err(DecodeError::Truncated {
            section,
            expected: n,
            got: bytes.len(),
        }
        .into());
    }
    Ok(bytes)
}

/// Decode a header block into a header mapping.
///
/// Records are laid out back to back until the block is exhausted:
/// name length (u8), name, value type tag (u8), value length (u16), value.
/// A block that does not divide evenly into this structure is malformed.
/// Pure function of the block bytes; decoding the same block twice yields
/// the same mapping.
pub fn parse_headers(block: &Bytes) -> std::result::Result<HashMap<String, HeaderValue>, DecodeError> {
    let mut headers = HashMap::new();
    let mut pos = 0usize;

    while pos < block.len() {
        let name_len = block[pos] as usize;
        pos += 1;
        let name_end = pos + name_len;
        if name_end > block.len() {
            return Err(DecodeError::HeaderBlock(format!(
                "header name of {} bytes overruns block at offset {}",
                name_len, pos
            )));
        }
        let name = std::str::from_utf8(&block[pos..name_end])
            .map_err(|_| {
                DecodeError::HeaderBlock(format!("header name at offset {} is not UTF-8", pos))
            })?
            .to_string();
        pos = name_end;

        if pos + 3 > block.len() {
            return Err(DecodeError::HeaderBlock(format!(
                "block ends inside value descriptor for header '{}'",
                name
            )));
        }
        let value_type = block[pos];
        let value_len = u16::from_be_bytes([block[pos + 1], block[pos + 2]]) as usize;
        pos += 3;

        let value_end = pos + value_len;
        if value_end > block.len() {
            return Err(DecodeError::HeaderBlock(format!(
                "value of {} bytes for header '{}' overruns block",
                value_len, name
            )));
        }
        headers.insert(
            name,
            HeaderValue {
                value_type,
                bytes: block.slice(pos..value_end),
            },
        );
        pos = value_end;
    }

    Ok(headers)
}
