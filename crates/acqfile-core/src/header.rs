//! The file-level statistics header.
//!
//! Every container starts with a fixed 128-byte header image (magic
//! included). A writer emits a placeholder at open and rewrites the image
//! in place at close with the final statistics, so a reader of a file whose
//! writer crashed mid-stream sees the last completed close, or the
//! placeholder if none.

use bytes::{Buf, BufMut};

use crate::config::RunConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::keys::KEY_UNSET;
use crate::wire;

/// Marker identifying an acqfile container.
pub const HEADER_MAGIC: u32 = 0xFAF3_2000;

/// Container format version this codec reads and writes.
pub const FORMAT_VERSION: u32 = 2;

/// Total encoded header size, magic included.
pub const HEADER_LEN: usize = 128;

/// Slots in each per-channel error table.
pub const MAX_ERROR_CHANNELS: usize = 4;

/// Sentinel channel id marking an unused error-table slot.
const CHANNEL_UNSET: u32 = 0xFFFF_FFFF;

/// The two independently counted error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelErrorKind {
    /// Input sequencing errors.
    Sequence,
    /// Delivery errors.
    Delivery,
}

/// One (source channel, error count) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelError {
    pub channel: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub run_id: u32,
    pub secs_beg: u32,
    pub secs_end: u32,
    pub event_count: u64,
    pub gem_beg: u64,
    pub gem_end: u64,
    pub config_key: u32,
    pub alias: String,
    seq_errors: Vec<ChannelError>,
    dly_errors: Vec<ChannelError>,
}

impl FileHeader {
    /// Placeholder header for a freshly opened writer: zeroed statistics,
    /// the given run id, and the run configuration metadata.
    pub fn new(run_id: u32, config: &RunConfig) -> Self {
        Self {
            run_id,
            secs_beg: 0,
            secs_end: 0,
            event_count: 0,
            gem_beg: 0,
            gem_end: 0,
            config_key: config.config_key,
            alias: config.alias.clone(),
            seq_errors: Vec::new(),
            dly_errors: Vec::new(),
        }
    }

    /// Fold one appended record into the running statistics. The first
    /// call initializes the begin bounds; every call advances the end
    /// bounds and the count.
    pub fn record_event(&mut self, ctx: &Context) {
        let secs = ctx.current.time_secs;
        let seq = ctx.scalers.sequence;
        if self.event_count == 0 {
            self.secs_beg = secs;
            self.gem_beg = seq;
        }
        self.secs_end = secs;
        self.gem_end = seq;
        self.event_count += 1;
    }

    /// Upsert a channel's error count into the matching table. Updates
    /// for new channels once the table's fixed slots are full are
    /// silently dropped.
    pub fn record_channel_error(&mut self, channel: u32, kind: ChannelErrorKind, count: u32) {
        let table = match kind {
            ChannelErrorKind::Sequence => &mut self.seq_errors,
            ChannelErrorKind::Delivery => &mut self.dly_errors,
        };
        if let Some(slot) = table.iter_mut().find(|e| e.channel == channel) {
            slot.count = count;
        } else if table.len() < MAX_ERROR_CHANNELS {
            table.push(ChannelError { channel, count });
        }
    }

    pub fn seq_errors(&self) -> &[ChannelError] {
        &self.seq_errors
    }

    pub fn dly_errors(&self) -> &[ChannelError] {
        &self.dly_errors
    }

    /// Encode the full fixed-size image, magic first. Always emits
    /// exactly `HEADER_LEN` bytes so the close-time rewrite lands on the
    /// placeholder byte for byte.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(HEADER_MAGIC);
        buf.put_u32_le(FORMAT_VERSION);
        buf.put_u32_le(self.run_id);
        buf.put_u32_le(self.secs_beg);
        buf.put_u32_le(self.secs_end);
        buf.put_u64_le(self.event_count);
        buf.put_u64_le(self.gem_beg);
        buf.put_u64_le(self.gem_end);
        encode_error_table(buf, &self.seq_errors);
        encode_error_table(buf, &self.dly_errors);
        buf.put_u32_le(self.config_key);
        wire::put_text(buf, &self.alias);
    }

    /// Decode and validate a header image. The magic and version are
    /// checked before any other field is interpreted; a foreign version
    /// is fatal with no partial read.
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        let magic = wire::get_u32(buf)?;
        if magic != HEADER_MAGIC {
            return Err(Error::BadMagic(magic));
        }
        let version = wire::get_u32(buf)?;
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let run_id = wire::get_u32(buf)?;
        let secs_beg = wire::get_u32(buf)?;
        let secs_end = wire::get_u32(buf)?;
        let event_count = wire::get_u64(buf)?;
        let gem_beg = wire::get_u64(buf)?;
        let gem_end = wire::get_u64(buf)?;
        let seq_errors = decode_error_table(buf)?;
        let dly_errors = decode_error_table(buf)?;
        let config_key = wire::get_u32(buf)?;
        let alias = wire::get_text(buf)?;

        Ok(Self {
            run_id,
            secs_beg,
            secs_end,
            event_count,
            gem_beg,
            gem_end,
            config_key,
            alias,
            seq_errors,
            dly_errors,
        })
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            run_id: 0,
            secs_beg: 0,
            secs_end: 0,
            event_count: 0,
            gem_beg: 0,
            gem_end: 0,
            config_key: KEY_UNSET,
            alias: String::new(),
            seq_errors: Vec::new(),
            dly_errors: Vec::new(),
        }
    }
}

fn encode_error_table(buf: &mut impl BufMut, table: &[ChannelError]) {
    for entry in table {
        buf.put_u32_le(entry.channel);
        buf.put_u32_le(entry.count);
    }
    for _ in table.len()..MAX_ERROR_CHANNELS {
        buf.put_u32_le(CHANNEL_UNSET);
        buf.put_u32_le(0);
    }
}

fn decode_error_table(buf: &mut impl Buf) -> Result<Vec<ChannelError>> {
    let mut table = Vec::new();
    for _ in 0..MAX_ERROR_CHANNELS {
        let channel = wire::get_u32(buf)?;
        let count = wire::get_u32(buf)?;
        if channel != CHANNEL_UNSET {
            table.push(ChannelError { channel, count });
        }
    }
    Ok(table)
}
