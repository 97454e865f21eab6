//! The opaque instrument payload carried in every record.
//!
//! The blob is treated as a byte range with vendor-defined internal
//! structure: a framing marker, a framed length, and the unpacked payload.
//! This codec copies it verbatim and never interprets the framing beyond
//! building it for freshly captured payloads. On the wire the blob is a
//! u32 length prefix followed by exactly that many bytes.

use std::fmt;
use std::io::Read;

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// Fixed capacity of a payload blob.
pub const PAYLOAD_CAPACITY: usize = 128 * 1024;

/// Vendor framing marker embedded at the start of every blob.
pub const FRAME_MARKER: u32 = 0x104F_0010;

/// Bytes of vendor framing preceding the payload proper.
const FRAME_LEN: usize = 8;

/// One opaque, vendor-framed instrument payload.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PayloadBlob {
    data: Vec<u8>,
}

impl PayloadBlob {
    /// Wrap a raw payload in the vendor framing (marker + framed length).
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let framed = payload.len() + FRAME_LEN;
        if framed > PAYLOAD_CAPACITY {
            return Err(Error::PayloadTooLarge {
                len: framed,
                capacity: PAYLOAD_CAPACITY,
            });
        }
        let mut data = Vec::with_capacity(framed);
        data.extend_from_slice(&FRAME_MARKER.to_le_bytes());
        data.extend_from_slice(&(framed as u32).to_le_bytes());
        data.extend_from_slice(payload);
        Ok(Self { data })
    }

    /// Adopt an already-framed byte range verbatim.
    pub fn from_framed(data: Vec<u8>) -> Result<Self> {
        if data.len() > PAYLOAD_CAPACITY {
            return Err(Error::PayloadTooLarge {
                len: data.len(),
                capacity: PAYLOAD_CAPACITY,
            });
        }
        Ok(Self { data })
    }

    /// The full framed byte range as stored in the container.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The inner payload, past the vendor framing. Empty for blobs shorter
    /// than the framing itself.
    pub fn payload(&self) -> &[u8] {
        self.data.get(FRAME_LEN..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.data.len() as u32);
        buf.put_slice(&self.data);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < 4 {
            return Err(Error::TruncatedPayload);
        }
        let len = buf.get_u32_le() as usize;
        if len > PAYLOAD_CAPACITY {
            return Err(Error::PayloadTooLarge {
                len,
                capacity: PAYLOAD_CAPACITY,
            });
        }
        if buf.remaining() < len {
            return Err(Error::TruncatedPayload);
        }
        let mut data = vec![0u8; len];
        buf.copy_to_slice(&mut data);
        Ok(Self { data })
    }

    /// Read one blob from a byte stream, for the file reader path.
    pub fn read_from(r: &mut impl Read) -> Result<Self> {
        let mut prefix = [0u8; 4];
        r.read_exact(&mut prefix).map_err(truncated)?;
        let len = u32::from_le_bytes(prefix) as usize;
        if len > PAYLOAD_CAPACITY {
            return Err(Error::PayloadTooLarge {
                len,
                capacity: PAYLOAD_CAPACITY,
            });
        }
        let mut data = vec![0u8; len];
        r.read_exact(&mut data).map_err(truncated)?;
        Ok(Self { data })
    }
}

fn truncated(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::TruncatedPayload
    } else {
        Error::Io(e)
    }
}

impl fmt::Debug for PayloadBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadBlob")
            .field("len", &self.data.len())
            .finish()
    }
}
