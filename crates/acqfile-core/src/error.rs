//! Error types for the acqfile codec.
//!
//! The format assumes a well-formed producer: any deviation found while
//! decoding is an integrity fault, not a transient condition. Decode errors
//! are fatal to the current stream — after one, the cursor is no longer
//! record-aligned and the caller must not continue reading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error opening {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid header marker 0x{0:08X}; not an acqfile container")]
    BadMagic(u32),

    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    #[error("truncated payload blob")]
    TruncatedPayload,

    #[error("truncated event record")]
    TruncatedRecord,

    #[error("payload of {len} bytes exceeds blob capacity of {capacity}")]
    PayloadTooLarge { len: usize, capacity: usize },

    #[error("unknown info type tag 0x{0:08X}")]
    UnknownInfoType(u32),

    #[error("unknown keys type tag 0x{0:08X}")]
    UnknownKeysType(u32),

    #[error("no RSD layout defined for handler {handler} version {version}")]
    UnknownRsd { handler: u32, version: u32 },

    #[error("invalid {field} value {value}")]
    InvalidEnum { field: &'static str, value: i64 },

    #[error("writer for {0} is already closed")]
    WriterClosed(PathBuf),

    #[error("index promised a record at offset {offset} of {path}, found end of stream")]
    MissingIndexedRecord { path: String, offset: u64 },

    #[error("malformed index line: {0}")]
    BadIndexLine(String),
}

pub type Result<T> = std::result::Result<T, Error>;
