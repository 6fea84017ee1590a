//! Wire framing and payload serialization
//!
//! Every protocol frame is length-prefixed:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ JSON or Postcard binary  │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! JSON is the default payload encoding: human-readable and trivial to
//! speak from any client language. Postcard is the compact binary option
//! for high tick rates. Frames above 1MB are rejected before the payload
//! is read.

use crate::config::WireFormat;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Maximum accepted frame payload (1MB)
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Payload serializer for the configured wire format
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    format: WireFormat,
}

impl Serializer {
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    /// Serialize a message to payload bytes
    pub fn encode<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>> {
        match self.format {
            WireFormat::Json => {
                serde_json::to_vec(msg).map_err(|e| Error::Serialization(e.to_string()))
            }
            WireFormat::Postcard => {
                postcard::to_allocvec(msg).map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    }

    /// Deserialize payload bytes to a message
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self.format {
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
            }
            WireFormat::Postcard => {
                postcard::from_bytes(bytes).map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    }
}

/// Write one length-prefixed frame
pub fn write_message<W: Write, T: Serialize>(
    writer: &mut W,
    serializer: &Serializer,
    msg: &T,
) -> Result<()> {
    let payload = serializer.encode(msg)?;
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed frame.
///
/// Returns `Ok(None)` when the read timed out before a frame started; a
/// timeout mid-frame is an error. The buffer is reused across calls to
/// avoid per-frame allocation.
pub fn read_message<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    serializer: &Serializer,
    buffer: &mut Vec<u8>,
) -> Result<Option<T>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::Protocol(format!("frame too large: {} bytes", len)));
    }

    buffer.clear();
    buffer.resize(len, 0);
    reader.read_exact(buffer)?;

    serializer.decode(buffer).map(Some)
}
