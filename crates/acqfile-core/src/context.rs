//! Per-event acquisition context.
//!
//! Every record carries one `Context` regardless of acquisition mode:
//! CCSDS framing identifiers, the current and previous hardware timetone
//! snapshots, the monotonic scaler counters, and the run/datagram-open/
//! datagram-close descriptors. On the wire it is a fixed 290-byte image
//! encoded field by field.

use bytes::{Buf, BufMut};

use crate::error::Result;
use crate::wire;

/// Hardware timestamp pair: tick count and time-hack count.
///
/// Shared between the context timetone snapshots and the info records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GemTime {
    pub tics: u32,
    pub hacks: u32,
}

impl GemTime {
    pub fn new(tics: u32, hacks: u32) -> Self {
        Self { tics, hacks }
    }

    pub(crate) fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.tics);
        buf.put_u32_le(self.hacks);
    }

    pub(crate) fn decode(buf: &mut impl Buf) -> Result<Self> {
        Ok(Self {
            tics: wire::get_u32(buf)?,
            hacks: wire::get_u32(buf)?,
        })
    }
}

/// Identifiers from the enclosing CCSDS packet stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CcsdsInfo {
    pub scid: i32,
    pub apid: i32,
    pub utc: f64,
}

/// One hardware-timetone snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimetoneInfo {
    pub time_secs: u32,
    pub gem: GemTime,
    pub incomplete: u32,
    pub flywheeling: u32,
    pub missing_timetone: bool,
    pub missing_cpu_pps: bool,
    pub missing_lat_pps: bool,
    pub early_event: bool,
    pub missing_gps: bool,
}

/// Monotonic 64-bit scaler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalerInfo {
    pub elapsed: u64,
    pub livetime: u64,
    pub prescaled: u64,
    pub discarded: u64,
    pub sequence: u64,
    pub deadzone: u64,
}

/// Run descriptor: platform, origin, ground id, and run start time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInfo {
    pub platform: i32,
    pub origin: i32,
    pub ground_id: u32,
    pub started_at: u32,
    pub platform_txt: String,
    pub origin_txt: String,
}

/// Datagram-open descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenInfo {
    pub mode_changes: u32,
    pub datagrams: u32,
    pub action: i32,
    pub reason: i32,
    pub crate_id: i32,
    pub mode: i32,
    pub action_txt: String,
    pub reason_txt: String,
    pub crate_txt: String,
    pub mode_txt: String,
}

/// Datagram-close descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseInfo {
    pub action: i32,
    pub reason: i32,
    pub action_txt: String,
    pub reason_txt: String,
}

/// The full acquisition context attached to every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub ccsds: CcsdsInfo,
    pub current: TimetoneInfo,
    pub previous: TimetoneInfo,
    pub scalers: ScalerInfo,
    pub run: RunInfo,
    pub open: OpenInfo,
    pub close: CloseInfo,
}

impl Context {
    /// Wire size of the fixed context image.
    pub const ENCODED_LEN: usize = 290;

    pub fn encode(&self, buf: &mut impl BufMut) {
        // ccsds: 16 bytes
        buf.put_i32_le(self.ccsds.scid);
        buf.put_i32_le(self.ccsds.apid);
        buf.put_f64_le(self.ccsds.utc);

        // timetones: 25 bytes each
        encode_timetone(buf, &self.current);
        encode_timetone(buf, &self.previous);

        // scalers: 48 bytes
        buf.put_u64_le(self.scalers.elapsed);
        buf.put_u64_le(self.scalers.livetime);
        buf.put_u64_le(self.scalers.prescaled);
        buf.put_u64_le(self.scalers.discarded);
        buf.put_u64_le(self.scalers.sequence);
        buf.put_u64_le(self.scalers.deadzone);

        // run: 48 bytes
        buf.put_i32_le(self.run.platform);
        buf.put_i32_le(self.run.origin);
        buf.put_u32_le(self.run.ground_id);
        buf.put_u32_le(self.run.started_at);
        wire::put_text(buf, &self.run.platform_txt);
        wire::put_text(buf, &self.run.origin_txt);

        // open: 88 bytes
        buf.put_u32_le(self.open.mode_changes);
        buf.put_u32_le(self.open.datagrams);
        buf.put_i32_le(self.open.action);
        buf.put_i32_le(self.open.reason);
        buf.put_i32_le(self.open.crate_id);
        buf.put_i32_le(self.open.mode);
        wire::put_text(buf, &self.open.action_txt);
        wire::put_text(buf, &self.open.reason_txt);
        wire::put_text(buf, &self.open.crate_txt);
        wire::put_text(buf, &self.open.mode_txt);

        // close: 40 bytes
        buf.put_i32_le(self.close.action);
        buf.put_i32_le(self.close.reason);
        wire::put_text(buf, &self.close.action_txt);
        wire::put_text(buf, &self.close.reason_txt);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        let ccsds = CcsdsInfo {
            scid: wire::get_i32(buf)?,
            apid: wire::get_i32(buf)?,
            utc: wire::get_f64(buf)?,
        };

        let current = decode_timetone(buf)?;
        let previous = decode_timetone(buf)?;

        let scalers = ScalerInfo {
            elapsed: wire::get_u64(buf)?,
            livetime: wire::get_u64(buf)?,
            prescaled: wire::get_u64(buf)?,
            discarded: wire::get_u64(buf)?,
            sequence: wire::get_u64(buf)?,
            deadzone: wire::get_u64(buf)?,
        };

        let run = RunInfo {
            platform: wire::get_i32(buf)?,
            origin: wire::get_i32(buf)?,
            ground_id: wire::get_u32(buf)?,
            started_at: wire::get_u32(buf)?,
            platform_txt: wire::get_text(buf)?,
            origin_txt: wire::get_text(buf)?,
        };

        let open = OpenInfo {
            mode_changes: wire::get_u32(buf)?,
            datagrams: wire::get_u32(buf)?,
            action: wire::get_i32(buf)?,
            reason: wire::get_i32(buf)?,
            crate_id: wire::get_i32(buf)?,
            mode: wire::get_i32(buf)?,
            action_txt: wire::get_text(buf)?,
            reason_txt: wire::get_text(buf)?,
            crate_txt: wire::get_text(buf)?,
            mode_txt: wire::get_text(buf)?,
        };

        let close = CloseInfo {
            action: wire::get_i32(buf)?,
            reason: wire::get_i32(buf)?,
            action_txt: wire::get_text(buf)?,
            reason_txt: wire::get_text(buf)?,
        };

        Ok(Self {
            ccsds,
            current,
            previous,
            scalers,
            run,
            open,
            close,
        })
    }
}

fn encode_timetone(buf: &mut impl BufMut, tt: &TimetoneInfo) {
    buf.put_u32_le(tt.time_secs);
    tt.gem.encode(buf);
    buf.put_u32_le(tt.incomplete);
    buf.put_u32_le(tt.flywheeling);
    wire::put_bool(buf, tt.missing_timetone);
    wire::put_bool(buf, tt.missing_cpu_pps);
    wire::put_bool(buf, tt.missing_lat_pps);
    wire::put_bool(buf, tt.early_event);
    wire::put_bool(buf, tt.missing_gps);
}

fn decode_timetone(buf: &mut impl Buf) -> Result<TimetoneInfo> {
    Ok(TimetoneInfo {
        time_secs: wire::get_u32(buf)?,
        gem: GemTime::decode(buf)?,
        incomplete: wire::get_u32(buf)?,
        flywheeling: wire::get_u32(buf)?,
        missing_timetone: wire::get_bool(buf)?,
        missing_cpu_pps: wire::get_bool(buf)?,
        missing_lat_pps: wire::get_bool(buf)?,
        early_event: wire::get_bool(buf)?,
        missing_gps: wire::get_bool(buf)?,
    })
}
