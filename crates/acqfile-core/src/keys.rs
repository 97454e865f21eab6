//! Translated-key records.
//!
//! The keys record closes every event: `[tag u32][payload]`, no outer
//! length word. Payload shape follows the tag, so the stream decoder reads
//! field by field. Key values use `0xFFFFFFFF` as the "unset" sentinel.

use std::io::Read;

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};
use crate::wire;

const TAG_PHYSICS: u32 = 0;
const TAG_CALIBRATION: u32 = 1;
const TAG_NONE: u32 = 0xFFFF_FFFF;

/// Sentinel for a key that was never translated.
pub const KEY_UNSET: u32 = 0xFFFF_FFFF;

/// Physics-mode translated keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicsKeys {
    pub master: u32,
    pub ignore_mask: u32,
    pub db_key: u32,
    /// Ordered secondary translation keys, zero or more.
    pub aux: Vec<u32>,
}

impl Default for PhysicsKeys {
    fn default() -> Self {
        Self {
            master: KEY_UNSET,
            ignore_mask: KEY_UNSET,
            db_key: KEY_UNSET,
            aux: Vec::new(),
        }
    }
}

/// Calibration-mode translated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalKeys {
    pub master: u32,
    pub ignore_mask: u32,
    pub script: u32,
}

impl Default for CalKeys {
    fn default() -> Self {
        Self {
            master: KEY_UNSET,
            ignore_mask: KEY_UNSET,
            script: KEY_UNSET,
        }
    }
}

/// The closed keys tagged union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Keys {
    #[default]
    None,
    Physics(PhysicsKeys),
    Calibration(CalKeys),
}

impl Keys {
    pub fn tag(&self) -> u32 {
        match self {
            Keys::None => TAG_NONE,
            Keys::Physics(_) => TAG_PHYSICS,
            Keys::Calibration(_) => TAG_CALIBRATION,
        }
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.tag());
        match self {
            Keys::None => {}
            Keys::Physics(k) => {
                buf.put_u32_le(k.master);
                buf.put_u32_le(k.ignore_mask);
                buf.put_u32_le(k.db_key);
                buf.put_u32_le(k.aux.len() as u32);
                for key in &k.aux {
                    buf.put_u32_le(*key);
                }
            }
            Keys::Calibration(k) => {
                buf.put_u32_le(k.master);
                buf.put_u32_le(k.ignore_mask);
                buf.put_u32_le(k.script);
            }
        }
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        let tag = wire::get_u32(buf)?;
        match tag {
            TAG_NONE => Ok(Keys::None),
            TAG_PHYSICS => {
                let master = wire::get_u32(buf)?;
                let ignore_mask = wire::get_u32(buf)?;
                let db_key = wire::get_u32(buf)?;
                let count = wire::get_u32(buf)? as usize;
                let mut aux = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    aux.push(wire::get_u32(buf)?);
                }
                Ok(Keys::Physics(PhysicsKeys {
                    master,
                    ignore_mask,
                    db_key,
                    aux,
                }))
            }
            TAG_CALIBRATION => Ok(Keys::Calibration(CalKeys {
                master: wire::get_u32(buf)?,
                ignore_mask: wire::get_u32(buf)?,
                script: wire::get_u32(buf)?,
            })),
            other => Err(Error::UnknownKeysType(other)),
        }
    }

    /// Decode one keys record from a byte stream. Having no outer length
    /// word, the record is read field by field directly from the stream.
    pub fn read_from(r: &mut impl Read) -> Result<Self> {
        let tag = read_u32(r)?;
        match tag {
            TAG_NONE => Ok(Keys::None),
            TAG_PHYSICS => {
                let master = read_u32(r)?;
                let ignore_mask = read_u32(r)?;
                let db_key = read_u32(r)?;
                let count = read_u32(r)? as usize;
                let mut aux = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    aux.push(read_u32(r)?);
                }
                Ok(Keys::Physics(PhysicsKeys {
                    master,
                    ignore_mask,
                    db_key,
                    aux,
                }))
            }
            TAG_CALIBRATION => Ok(Keys::Calibration(CalKeys {
                master: read_u32(r)?,
                ignore_mask: read_u32(r)?,
                script: read_u32(r)?,
            })),
            other => Err(Error::UnknownKeysType(other)),
        }
    }

    pub fn physics(&self) -> Option<&PhysicsKeys> {
        match self {
            Keys::Physics(k) => Some(k),
            _ => None,
        }
    }

    pub fn calibration(&self) -> Option<&CalKeys> {
        match self {
            Keys::Calibration(k) => Some(k),
            _ => None,
        }
    }
}

fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut raw = [0u8; 4];
    r.read_exact(&mut raw).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TruncatedRecord
        } else {
            Error::Io(e)
        }
    })?;
    Ok(u32::from_le_bytes(raw))
}
