//! Acquisition-mode-specific info records.
//!
//! On the wire every info record is `[tag u32][len u32][body]`. The declared
//! length covers the body only, so new variants (or trailing fields on known
//! ones) can be skipped by tag-dispatching readers without breaking framing.
//! The tag set is closed; an unrecognized tag is a decode error, never a
//! silent default.

use bytes::{Buf, BufMut, BytesMut};

use crate::context::GemTime;
use crate::error::{Error, Result};
use crate::handler::HandlerResult;
use crate::wire;

const TAG_PHYSICS: u32 = 0;
const TAG_VETO_CAL: u32 = 1;
const TAG_CALO_CAL: u32 = 2;
const TAG_TRACKER_CAL: u32 = 3;
const TAG_NONE: u32 = 0xFFFF_FFFF;

/// Fixed time header shared by every non-empty info variant.
///
/// The compression fields are carried verbatim; this codec never compresses
/// or decompresses anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoTime {
    pub time_tics: u32,
    pub gem: GemTime,
    pub compression_level: u32,
    pub compressed_size: u32,
}

impl InfoTime {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.time_tics);
        self.gem.encode(buf);
        buf.put_u32_le(self.compression_level);
        buf.put_u32_le(self.compressed_size);
    }

    fn decode(buf: &mut impl Buf) -> Result<Self> {
        Ok(Self {
            time_tics: wire::get_u32(buf)?,
            gem: GemTime::decode(buf)?,
            compression_level: wire::get_u32(buf)?,
            compressed_size: wire::get_u32(buf)?,
        })
    }
}

/// Physics-mode info: translation keys plus the per-stage handler outcomes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsInfo {
    pub time: InfoTime,
    pub software_key: u32,
    pub hardware_key: u32,
    pub db_key: u32,
    pub handlers: Vec<HandlerResult>,
}

impl PhysicsInfo {
    fn encode(&self, buf: &mut impl BufMut) {
        self.time.encode(buf);
        buf.put_u32_le(self.software_key);
        buf.put_u32_le(self.hardware_key);
        buf.put_u32_le(self.db_key);
        buf.put_u32_le(self.handlers.len() as u32);
        for h in &self.handlers {
            h.encode(buf);
        }
    }

    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let time = InfoTime::decode(buf)?;
        let software_key = wire::get_u32(buf)?;
        let hardware_key = wire::get_u32(buf)?;
        let db_key = wire::get_u32(buf)?;
        let count = wire::get_u32(buf)? as usize;
        let mut handlers = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            handlers.push(HandlerResult::decode(buf)?);
        }
        Ok(Self {
            time,
            software_key,
            hardware_key,
            db_key,
            handlers,
        })
    }
}

/// Configuration block shared by all calibration-mode variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalCommon {
    pub auto_range: bool,
    pub zero_suppression: bool,
    pub periodic_prescale: u32,
    pub software_key: u32,
    pub write_cfg: u32,
    pub read_cfg: u32,
}

impl CalCommon {
    fn encode(&self, buf: &mut impl BufMut) {
        wire::put_bool(buf, self.auto_range);
        wire::put_bool(buf, self.zero_suppression);
        buf.put_u32_le(self.periodic_prescale);
        buf.put_u32_le(self.software_key);
        buf.put_u32_le(self.write_cfg);
        buf.put_u32_le(self.read_cfg);
    }

    fn decode(buf: &mut impl Buf) -> Result<Self> {
        Ok(Self {
            auto_range: wire::get_bool(buf)?,
            zero_suppression: wire::get_bool(buf)?,
            periodic_prescale: wire::get_u32(buf)?,
            software_key: wire::get_u32(buf)?,
            write_cfg: wire::get_u32(buf)?,
            read_cfg: wire::get_u32(buf)?,
        })
    }
}

/// Channel-routing block closing every calibration variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalChannel {
    pub num_chan: u16,
    pub single: bool,
    pub all: bool,
    pub latc: bool,
    pub per_fe: bool,
}

impl CalChannel {
    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u16_le(self.num_chan);
        wire::put_bool(buf, self.single);
        wire::put_bool(buf, self.all);
        wire::put_bool(buf, self.latc);
        wire::put_bool(buf, self.per_fe);
    }

    fn decode(buf: &mut impl Buf) -> Result<Self> {
        Ok(Self {
            num_chan: wire::get_u16(buf)?,
            single: wire::get_bool(buf)?,
            all: wire::get_bool(buf)?,
            latc: wire::get_bool(buf)?,
            per_fe: wire::get_bool(buf)?,
        })
    }
}

/// Veto-subsystem trigger settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VetoTrigger {
    pub veto: u16,
    pub veto_vernier: u16,
    pub hld: u16,
}

/// Veto-channel calibration info.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VetoCalInfo {
    pub time: InfoTime,
    pub common: CalCommon,
    pub injected: u16,
    pub threshold: u16,
    pub bias_dac: u16,
    pub hold_delay: u16,
    pub hitmap_delay: u16,
    pub range: u16,
    pub trigger: VetoTrigger,
    pub channel: CalChannel,
}

impl VetoCalInfo {
    fn encode(&self, buf: &mut impl BufMut) {
        self.time.encode(buf);
        self.common.encode(buf);
        buf.put_u16_le(self.injected);
        buf.put_u16_le(self.threshold);
        buf.put_u16_le(self.bias_dac);
        buf.put_u16_le(self.hold_delay);
        buf.put_u16_le(self.hitmap_delay);
        buf.put_u16_le(self.range);
        buf.put_u16_le(self.trigger.veto);
        buf.put_u16_le(self.trigger.veto_vernier);
        buf.put_u16_le(self.trigger.hld);
        self.channel.encode(buf);
    }

    fn decode(buf: &mut impl Buf) -> Result<Self> {
        Ok(Self {
            time: InfoTime::decode(buf)?,
            common: CalCommon::decode(buf)?,
            injected: wire::get_u16(buf)?,
            threshold: wire::get_u16(buf)?,
            bias_dac: wire::get_u16(buf)?,
            hold_delay: wire::get_u16(buf)?,
            hitmap_delay: wire::get_u16(buf)?,
            range: wire::get_u16(buf)?,
            trigger: VetoTrigger {
                veto: wire::get_u16(buf)?,
                veto_vernier: wire::get_u16(buf)?,
                hld: wire::get_u16(buf)?,
            },
            channel: CalChannel::decode(buf)?,
        })
    }
}

/// Calorimeter trigger settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaloTrigger {
    pub le: u16,
    pub low_trg_ena: u16,
    pub he: u16,
    pub high_trg_ena: u16,
}

/// Calorimeter-channel calibration info.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaloCalInfo {
    pub time: InfoTime,
    pub common: CalCommon,
    pub uld: u16,
    pub injected: u16,
    pub delay: u16,
    pub threshold: u16,
    pub first_range: u16,
    pub calib_gain: u16,
    pub high_cal_ena: u16,
    pub high_rng_ena: u16,
    pub high_gain: u16,
    pub low_cal_ena: u16,
    pub low_rng_ena: u16,
    pub low_gain: u16,
    pub trigger: CaloTrigger,
    pub channel: CalChannel,
}

impl CaloCalInfo {
    fn encode(&self, buf: &mut impl BufMut) {
        self.time.encode(buf);
        self.common.encode(buf);
        buf.put_u16_le(self.uld);
        buf.put_u16_le(self.injected);
        buf.put_u16_le(self.delay);
        buf.put_u16_le(self.threshold);
        buf.put_u16_le(self.first_range);
        buf.put_u16_le(self.calib_gain);
        buf.put_u16_le(self.high_cal_ena);
        buf.put_u16_le(self.high_rng_ena);
        buf.put_u16_le(self.high_gain);
        buf.put_u16_le(self.low_cal_ena);
        buf.put_u16_le(self.low_rng_ena);
        buf.put_u16_le(self.low_gain);
        buf.put_u16_le(self.trigger.le);
        buf.put_u16_le(self.trigger.low_trg_ena);
        buf.put_u16_le(self.trigger.he);
        buf.put_u16_le(self.trigger.high_trg_ena);
        self.channel.encode(buf);
    }

    fn decode(buf: &mut impl Buf) -> Result<Self> {
        Ok(Self {
            time: InfoTime::decode(buf)?,
            common: CalCommon::decode(buf)?,
            uld: wire::get_u16(buf)?,
            injected: wire::get_u16(buf)?,
            delay: wire::get_u16(buf)?,
            threshold: wire::get_u16(buf)?,
            first_range: wire::get_u16(buf)?,
            calib_gain: wire::get_u16(buf)?,
            high_cal_ena: wire::get_u16(buf)?,
            high_rng_ena: wire::get_u16(buf)?,
            high_gain: wire::get_u16(buf)?,
            low_cal_ena: wire::get_u16(buf)?,
            low_rng_ena: wire::get_u16(buf)?,
            low_gain: wire::get_u16(buf)?,
            trigger: CaloTrigger {
                le: wire::get_u16(buf)?,
                low_trg_ena: wire::get_u16(buf)?,
                he: wire::get_u16(buf)?,
                high_trg_ena: wire::get_u16(buf)?,
            },
            channel: CalChannel::decode(buf)?,
        })
    }
}

/// Tracker-channel calibration info.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerCalInfo {
    pub time: InfoTime,
    pub common: CalCommon,
    pub dac_range: u16,
    pub injected: u16,
    pub threshold: u16,
    pub delay: u16,
    pub split_low: u16,
    pub split_high: u16,
    pub channel: CalChannel,
}

impl TrackerCalInfo {
    fn encode(&self, buf: &mut impl BufMut) {
        self.time.encode(buf);
        self.common.encode(buf);
        buf.put_u16_le(self.dac_range);
        buf.put_u16_le(self.injected);
        buf.put_u16_le(self.threshold);
        buf.put_u16_le(self.delay);
        buf.put_u16_le(self.split_low);
        buf.put_u16_le(self.split_high);
        self.channel.encode(buf);
    }

    fn decode(buf: &mut impl Buf) -> Result<Self> {
        Ok(Self {
            time: InfoTime::decode(buf)?,
            common: CalCommon::decode(buf)?,
            dac_range: wire::get_u16(buf)?,
            injected: wire::get_u16(buf)?,
            threshold: wire::get_u16(buf)?,
            delay: wire::get_u16(buf)?,
            split_low: wire::get_u16(buf)?,
            split_high: wire::get_u16(buf)?,
            channel: CalChannel::decode(buf)?,
        })
    }
}

/// The closed info tagged union.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Info {
    #[default]
    None,
    Physics(PhysicsInfo),
    VetoCal(VetoCalInfo),
    CaloCal(CaloCalInfo),
    TrackerCal(TrackerCalInfo),
}

impl Info {
    pub fn tag(&self) -> u32 {
        match self {
            Info::None => TAG_NONE,
            Info::Physics(_) => TAG_PHYSICS,
            Info::VetoCal(_) => TAG_VETO_CAL,
            Info::CaloCal(_) => TAG_CALO_CAL,
            Info::TrackerCal(_) => TAG_TRACKER_CAL,
        }
    }

    /// Encode as `[tag][len][body]`. The body length is computed by
    /// encoding into a scratch buffer first; the physics variant is
    /// variable-length so no static size exists.
    pub fn encode(&self, buf: &mut impl BufMut) {
        let mut body = BytesMut::new();
        match self {
            Info::None => {}
            Info::Physics(v) => v.encode(&mut body),
            Info::VetoCal(v) => v.encode(&mut body),
            Info::CaloCal(v) => v.encode(&mut body),
            Info::TrackerCal(v) => v.encode(&mut body),
        }
        buf.put_u32_le(self.tag());
        buf.put_u32_le(body.len() as u32);
        buf.put_slice(&body);
    }

    /// Decode one `[tag][len][body]` unit, consuming exactly the declared
    /// body length even when the variant decoder stops short of it.
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        let tag = wire::get_u32(buf)?;
        let len = wire::get_u32(buf)? as usize;
        if buf.remaining() < len {
            return Err(Error::TruncatedRecord);
        }
        let mut body = vec![0u8; len];
        buf.copy_to_slice(&mut body);
        Self::decode_body(tag, &mut body.as_slice())
    }

    /// Decode a body whose tag and length were already consumed by the
    /// caller (the file reader buffers the body via the length prefix).
    pub fn decode_body(tag: u32, buf: &mut impl Buf) -> Result<Self> {
        match tag {
            TAG_NONE => Ok(Info::None),
            TAG_PHYSICS => Ok(Info::Physics(PhysicsInfo::decode(buf)?)),
            TAG_VETO_CAL => Ok(Info::VetoCal(VetoCalInfo::decode(buf)?)),
            TAG_CALO_CAL => Ok(Info::CaloCal(CaloCalInfo::decode(buf)?)),
            TAG_TRACKER_CAL => Ok(Info::TrackerCal(TrackerCalInfo::decode(buf)?)),
            other => Err(Error::UnknownInfoType(other)),
        }
    }

    pub fn physics(&self) -> Option<&PhysicsInfo> {
        match self {
            Info::Physics(v) => Some(v),
            _ => None,
        }
    }

    pub fn veto_cal(&self) -> Option<&VetoCalInfo> {
        match self {
            Info::VetoCal(v) => Some(v),
            _ => None,
        }
    }

    pub fn calo_cal(&self) -> Option<&CaloCalInfo> {
        match self {
            Info::CaloCal(v) => Some(v),
            _ => None,
        }
    }

    pub fn tracker_cal(&self) -> Option<&TrackerCalInfo> {
        match self {
            Info::TrackerCal(v) => Some(v),
            _ => None,
        }
    }
}
