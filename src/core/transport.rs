//! Compact wire form for token sequences.
//!
//! Ids travel as unsigned 16-bit little-endian integers packed back to back,
//! with no length prefix, and the buffer is embedded in JSON as standard
//! padded base64. `[1, 256]` packs to `01 00 00 01` and renders as `AQAAAQ==`.

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

/// Bytes used per id on the wire.
pub const BYTES_PER_TOKEN: usize = 2;

/// Errors raised while packing or unpacking token ids.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransportError {
    #[error("Token id {id} at index {index} does not fit in 16 bits")]
    OutOfRange { id: u32, index: usize },
    #[error("Packed buffer length {0} is not a multiple of 2")]
    OddLength(usize),
    #[error("Invalid base64 encoding: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Pack ids into little-endian u16 pairs.
pub fn pack(ids: &[u32]) -> Result<Vec<u8>, TransportError> {
    let mut bytes = Vec::with_capacity(ids.len() * BYTES_PER_TOKEN);
    for (index, &id) in ids.iter().enumerate() {
        let narrow = u16::try_from(id).map_err(|_| TransportError::OutOfRange { id, index })?;
        bytes.extend_from_slice(&narrow.to_le_bytes());
    }
    Ok(bytes)
}

/// Unpack a buffer produced by [`pack`].
pub fn unpack(bytes: &[u8]) -> Result<Vec<u32>, TransportError> {
    if bytes.len() % BYTES_PER_TOKEN != 0 {
        return Err(TransportError::OddLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(BYTES_PER_TOKEN)
        .map(|pair| u32::from(u16::from_le_bytes([pair[0], pair[1]])))
        .collect())
}

/// Pack ids and render them as base64 text.
pub fn to_base64(ids: &[u32]) -> Result<String, TransportError> {
    Ok(STANDARD.encode(pack(ids)?))
}

/// Parse base64 text back into ids.
pub fn from_base64(text: &str) -> Result<Vec<u32>, TransportError> {
    let bytes = STANDARD.decode(text.trim())?;
    unpack(&bytes)
}
