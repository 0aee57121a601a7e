//! Protocol codec
//!
//! Framing and encoding for commands and responses.
//!
//! ## Wire Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ CRC (4)  │   bincode-encoded message   │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! Both header fields are big-endian. The CRC32 covers the payload only.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, ScullError};
use super::{Command, Response};

/// Header size: 4 bytes length + 4 bytes CRC32
pub const HEADER_SIZE: usize = 8;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

/// Encode any message into one frame
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Bytes> {
    let payload =
        bincode::serialize(message).map_err(|e| ScullError::Serialization(e.to_string()))?;

    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(ScullError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_u32(crc32fast::hash(&payload));
    frame.put_slice(&payload);

    Ok(frame.freeze())
}

/// Decode one frame from the front of `buf`
///
/// Returns `Ok(None)` while the frame is incomplete; on success the frame is
/// consumed from `buf`.
pub fn decode_frame<T: DeserializeOwned>(buf: &mut BytesMut) -> Result<Option<T>> {
    if buf.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut header = &buf[..HEADER_SIZE];
    let payload_len = header.get_u32();
    let checksum = header.get_u32();

    check_payload_len(payload_len)?;

    if buf.len() < HEADER_SIZE + payload_len as usize {
        return Ok(None);
    }

    buf.advance(HEADER_SIZE);
    let payload = buf.split_to(payload_len as usize);

    decode_payload(&payload, checksum).map(Some)
}

/// Read one frame from a stream
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let mut header = &header[..];
    let payload_len = header.get_u32();
    let checksum = header.get_u32();

    check_payload_len(payload_len)?;

    let mut payload = BytesMut::new();
    payload.resize(payload_len as usize, 0);
    reader.read_exact(&mut payload)?;

    decode_payload(&payload, checksum)
}

/// Write one frame to a stream and flush it
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    let frame = encode_frame(message)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

fn check_payload_len(payload_len: u32) -> Result<()> {
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(ScullError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

fn decode_payload<T: DeserializeOwned>(payload: &[u8], checksum: u32) -> Result<T> {
    let actual = crc32fast::hash(payload);
    if actual != checksum {
        return Err(ScullError::Protocol(format!(
            "Checksum mismatch: expected {:08x}, got {:08x}",
            checksum, actual
        )));
    }

    bincode::deserialize(payload).map_err(|e| ScullError::Serialization(e.to_string()))
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to a frame
pub fn encode_command(command: &Command) -> Result<Bytes> {
    encode_frame(command)
}

/// Decode a command from one complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let mut buf = BytesMut::from(bytes);
    decode_frame(&mut buf)?.ok_or_else(|| {
        ScullError::Protocol(format!("Incomplete frame: {} bytes", bytes.len()))
    })
}

/// Read a command from a stream
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    read_frame(reader)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    write_frame(writer, command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to a frame
pub fn encode_response(response: &Response) -> Result<Bytes> {
    encode_frame(response)
}

/// Decode a response from one complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let mut buf = BytesMut::from(bytes);
    decode_frame(&mut buf)?.ok_or_else(|| {
        ScullError::Protocol(format!("Incomplete frame: {} bytes", bytes.len()))
    })
}

/// Read a response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    read_frame(reader)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    write_frame(writer, response)
}
