//! Versioned framing shared by wire payloads and on-disk records.
//!
//! Every encodable structure is written as a `(struct_version,
//! compat_version, length)` header followed by its fields: fixed-width
//! little-endian unsigned integers, and length-prefixed byte strings. The
//! length lets a reader skip trailing fields written by a newer writer; the
//! compat version tells it when it cannot even do that.

use bytes::{Buf, BufMut};

/// Size of the framing header: two version bytes and a u32 payload length.
pub const HEADER_LEN: usize = 6;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("framing is truncated")]
    Truncated,
    #[error("structure requires compat version {actual} but this build understands {supported}")]
    Unsupported { actual: u8, supported: u8 },
    #[error("contained value of {declared} bytes exceeds its frame")]
    ValueOverflow { declared: u32 },
}

/// A decoded view over one framed structure.
///
/// Reads are bounded by the declared payload length. Bytes left over after
/// the fields a reader knows are unknown trailing fields, and are ignored.
#[derive(Debug)]
pub struct Frame<'b> {
    buf: &'b [u8],
    /// The writer's structure version.
    pub struct_version: u8,
}

impl<'b> Frame<'b> {
    /// Open a frame over `input`, refusing structures this build cannot
    /// understand even in part.
    pub fn open(input: &'b [u8], supported: u8) -> Result<Frame<'b>, DecodeError> {
        if input.len() < HEADER_LEN {
            return Err(DecodeError::Truncated);
        }
        let mut header = input;
        let struct_version = header.get_u8();
        let compat_version = header.get_u8();
        let len = header.get_u32_le() as usize;

        if compat_version > supported {
            return Err(DecodeError::Unsupported {
                actual: compat_version,
                supported,
            });
        }
        if len > input.len() - HEADER_LEN {
            return Err(DecodeError::Truncated);
        }
        Ok(Frame {
            buf: &input[HEADER_LEN..HEADER_LEN + len],
            struct_version,
        })
    }

    pub fn get_u32(&mut self) -> Result<u32, DecodeError> {
        if self.buf.len() < 4 {
            return Err(DecodeError::Truncated);
        }
        Ok(self.buf.get_u32_le())
    }

    pub fn get_u64(&mut self) -> Result<u64, DecodeError> {
        if self.buf.len() < 8 {
            return Err(DecodeError::Truncated);
        }
        Ok(self.buf.get_u64_le())
    }

    /// A length-prefixed byte string, borrowed from the frame.
    pub fn get_bytes(&mut self) -> Result<&'b [u8], DecodeError> {
        let len = self.get_u32()? as usize;
        if len > self.buf.len() {
            return Err(DecodeError::ValueOverflow {
                declared: len as u32,
            });
        }
        let (value, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(value)
    }
}

/// Append a framed structure, back-filling the payload length once the body
/// closure has written its fields.
pub fn put_frame(
    out: &mut Vec<u8>,
    struct_version: u8,
    compat_version: u8,
    body: impl FnOnce(&mut Vec<u8>),
) {
    out.put_u8(struct_version);
    out.put_u8(compat_version);
    let at = out.len();
    out.put_u32_le(0);
    body(out);
    let len = (out.len() - at - 4) as u32;
    out[at..at + 4].copy_from_slice(&len.to_le_bytes());
}

/// Append a length-prefixed byte string.
pub fn put_bytes(out: &mut Vec<u8>, value: &[u8]) {
    out.put_u32_le(value.len() as u32);
    out.put_slice(value);
}

/// Encode a bare u64, as stored under the reserved scalar keys.
pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}

/// Decode a bare u64 stored under a reserved scalar key.
pub fn decode_u64(mut buf: &[u8]) -> Result<u64, DecodeError> {
    if buf.len() < 8 {
        return Err(DecodeError::Truncated);
    }
    Ok(buf.get_u64_le())
}
