//! Core types and wire codec for the acqfile event container format.
//!
//! An acqfile container is a statistics header followed by a sequence of
//! event records. Each record is the composition of four parts, written in
//! this order with no additional framing between them:
//!
//! ```text
//! [Context: fixed 290-byte image]
//! [payload length: u32][payload bytes]
//! [info tag: u32][info length: u32][info bytes]
//! [keys tag: u32][keys bytes]
//! ```
//!
//! All integers are little-endian. Every structure is encoded field by
//! field; no struct memory image ever touches the wire, so the format is
//! stable across platforms and compiler versions.
//!
//! This crate owns the value types and their codecs. File-level engines
//! (reader, writer, merge) live in `acqfile-storage`.

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod header;
pub mod info;
pub mod keys;
pub mod payload;
pub mod wire;

pub use config::RunConfig;
pub use context::{Context, GemTime};
pub use error::{Error, Result};
pub use handler::{
    GammaRsd, GammaVersion, HandlerId, HandlerKind, HandlerResult, Prescaler, Rsd, RsdState,
    StatusRsd,
};
pub use header::{
    ChannelError, ChannelErrorKind, FileHeader, FORMAT_VERSION, HEADER_LEN, HEADER_MAGIC,
    MAX_ERROR_CHANNELS,
};
pub use info::{CaloCalInfo, Info, InfoTime, PhysicsInfo, TrackerCalInfo, VetoCalInfo};
pub use keys::{CalKeys, Keys, PhysicsKeys, KEY_UNSET};
pub use payload::{PayloadBlob, PAYLOAD_CAPACITY};
