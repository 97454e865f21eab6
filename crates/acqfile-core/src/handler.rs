//! Per-filter-stage outcome records for physics events.
//!
//! Each physics event carries zero or more `HandlerResult` entries, one per
//! active filter/monitor stage. The stage's result-summary data (RSD) is a
//! payload whose shape depends on the (presence, version, identity) triple;
//! that triple is folded into the `Rsd` discriminant so a payload can never
//! be read under the wrong layout — a non-matching accessor yields `None`,
//! not a reinterpreted struct.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};
use crate::wire;

/// Whether a stage acts as an event filter or a passive monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Filter,
    Monitor,
}

impl HandlerKind {
    fn to_wire(self) -> i32 {
        match self {
            HandlerKind::Filter => 0,
            HandlerKind::Monitor => 1,
        }
    }

    fn from_wire(value: i32) -> Result<Self> {
        match value {
            0 => Ok(HandlerKind::Filter),
            1 => Ok(HandlerKind::Monitor),
            other => Err(Error::InvalidEnum {
                field: "handler kind",
                value: other.into(),
            }),
        }
    }
}

/// The closed set of known handler identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerId {
    PassThru,
    Gamma,
    SoftCounters,
    Mip,
    Hip,
    Diagnostic,
}

impl HandlerId {
    fn to_wire(self) -> u32 {
        match self {
            HandlerId::PassThru => 0,
            HandlerId::Gamma => 1,
            HandlerId::SoftCounters => 2,
            HandlerId::Mip => 3,
            HandlerId::Hip => 4,
            HandlerId::Diagnostic => 5,
        }
    }

    fn from_wire(value: u32) -> Result<Self> {
        match value {
            0 => Ok(HandlerId::PassThru),
            1 => Ok(HandlerId::Gamma),
            2 => Ok(HandlerId::SoftCounters),
            3 => Ok(HandlerId::Mip),
            4 => Ok(HandlerId::Hip),
            5 => Ok(HandlerId::Diagnostic),
            other => Err(Error::InvalidEnum {
                field: "handler id",
                value: other.into(),
            }),
        }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerId::PassThru => "pass-thru",
            HandlerId::Gamma => "gamma",
            HandlerId::SoftCounters => "soft-counters",
            HandlerId::Mip => "mip",
            HandlerId::Hip => "hip",
            HandlerId::Diagnostic => "diagnostic",
        };
        f.write_str(name)
    }
}

/// Overall result state of a stage for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsdState {
    Invalid,
    Passed,
    Suppressed,
    Vetoed,
    Leaked,
    Ignored,
}

impl RsdState {
    fn to_wire(self) -> i32 {
        match self {
            RsdState::Invalid => -1,
            RsdState::Passed => 0,
            RsdState::Suppressed => 1,
            RsdState::Vetoed => 2,
            RsdState::Leaked => 3,
            RsdState::Ignored => 4,
        }
    }

    fn from_wire(value: i32) -> Result<Self> {
        match value {
            -1 => Ok(RsdState::Invalid),
            0 => Ok(RsdState::Passed),
            1 => Ok(RsdState::Suppressed),
            2 => Ok(RsdState::Vetoed),
            3 => Ok(RsdState::Leaked),
            4 => Ok(RsdState::Ignored),
            other => Err(Error::InvalidEnum {
                field: "result state",
                value: other.into(),
            }),
        }
    }
}

impl fmt::Display for RsdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RsdState::Invalid => "invalid",
            RsdState::Passed => "passed",
            RsdState::Suppressed => "suppressed",
            RsdState::Vetoed => "vetoed",
            RsdState::Leaked => "leaked",
            RsdState::Ignored => "ignored",
        };
        f.write_str(name)
    }
}

/// How a leaked event escaped its prescaler, when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prescaler {
    /// Prescaler info not available (always, for version-0 RSDs).
    Unsupported,
    /// Event not analyzed due to the input prescaler.
    Input,
    /// Event leaked by the overall output prescaler.
    Output,
    /// Event leaked by a condition-specific prescaler (0..=31).
    Cond(u8),
}

impl Prescaler {
    fn to_wire(self) -> i32 {
        match self {
            Prescaler::Unsupported => -3,
            Prescaler::Input => -2,
            Prescaler::Output => -1,
            Prescaler::Cond(n) => n as i32,
        }
    }

    fn from_wire(value: i32) -> Result<Self> {
        match value {
            -3 => Ok(Prescaler::Unsupported),
            -2 => Ok(Prescaler::Input),
            -1 => Ok(Prescaler::Output),
            0..=31 => Ok(Prescaler::Cond(value as u8)),
            other => Err(Error::InvalidEnum {
                field: "leaked prescaler",
                value: other.into(),
            }),
        }
    }
}

/// Single-word status/stage payload shared by the pass-thru, MIP, HIP, and
/// diagnostic version-0 RSDs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusRsd {
    pub status: u32,
}

/// Gamma-handler payload. All encoding versions share this byte layout;
/// the interpretation of `stage` differs by version, which is why the
/// version stays part of the `Rsd` discriminant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GammaRsd {
    pub status: u32,
    pub stage: u32,
    pub energy_valid: u32,
    pub energy_in_leus: i32,
}

/// Gamma RSD encoding versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GammaVersion {
    V0,
    V1,
    V2,
    V3,
}

impl GammaVersion {
    fn to_wire(self) -> u32 {
        match self {
            GammaVersion::V0 => 0,
            GammaVersion::V1 => 1,
            GammaVersion::V2 => 2,
            GammaVersion::V3 => 3,
        }
    }
}

/// The versioned, identity-tagged result-summary payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rsd {
    /// Handler produced no summary data.
    #[default]
    None,
    PassThruV0(StatusRsd),
    GammaV(GammaVersion, GammaRsd),
    MipV0(StatusRsd),
    HipV0(StatusRsd),
    DiagnosticV0(StatusRsd),
}

impl Rsd {
    /// The handler identity this payload belongs to, if any.
    fn identity(&self) -> Option<HandlerId> {
        match self {
            Rsd::None => None,
            Rsd::PassThruV0(_) => Some(HandlerId::PassThru),
            Rsd::GammaV(..) => Some(HandlerId::Gamma),
            Rsd::MipV0(_) => Some(HandlerId::Mip),
            Rsd::HipV0(_) => Some(HandlerId::Hip),
            Rsd::DiagnosticV0(_) => Some(HandlerId::Diagnostic),
        }
    }

    /// The encoding version this payload was defined for.
    fn version(&self) -> Option<u32> {
        match self {
            Rsd::None => None,
            Rsd::GammaV(v, _) => Some(v.to_wire()),
            _ => Some(0),
        }
    }
}

/// One filter/monitor stage's outcome for a physics event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResult {
    pub kind: HandlerKind,
    pub id: HandlerId,
    /// Encoding version of the handler-specific RSD.
    pub version: u32,
    /// Key of the master configuration for the handler, fixed for a run.
    pub master_key: u32,
    /// Key of the current configuration, may vary by mode.
    pub cfg_key: u32,
    /// Unique identifier of the handler configuration.
    pub cfg_id: u32,
    pub state: RsdState,
    pub prescaler: Prescaler,
    pub rsd: Rsd,
}

impl HandlerResult {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i32_le(self.kind.to_wire());
        buf.put_u32_le(self.id.to_wire());
        buf.put_u32_le(self.version);
        buf.put_u32_le(self.master_key);
        buf.put_u32_le(self.cfg_key);
        buf.put_u32_le(self.cfg_id);
        buf.put_i32_le(self.state.to_wire());
        buf.put_i32_le(self.prescaler.to_wire());

        match &self.rsd {
            Rsd::None => buf.put_u8(0),
            Rsd::PassThruV0(r) | Rsd::MipV0(r) | Rsd::HipV0(r) | Rsd::DiagnosticV0(r) => {
                buf.put_u8(1);
                buf.put_u32_le(r.status);
            }
            Rsd::GammaV(_, r) => {
                buf.put_u8(1);
                buf.put_u32_le(r.status);
                buf.put_u32_le(r.stage);
                buf.put_u32_le(r.energy_valid);
                buf.put_i32_le(r.energy_in_leus);
            }
        }
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        let kind = HandlerKind::from_wire(wire::get_i32(buf)?)?;
        let id = HandlerId::from_wire(wire::get_u32(buf)?)?;
        let version = wire::get_u32(buf)?;
        let master_key = wire::get_u32(buf)?;
        let cfg_key = wire::get_u32(buf)?;
        let cfg_id = wire::get_u32(buf)?;
        let state = RsdState::from_wire(wire::get_i32(buf)?)?;
        let prescaler = Prescaler::from_wire(wire::get_i32(buf)?)?;

        let has = wire::get_bool(buf)?;
        let rsd = if !has {
            Rsd::None
        } else {
            decode_rsd(buf, id, version)?
        };

        Ok(Self {
            kind,
            id,
            version,
            master_key,
            cfg_key,
            cfg_id,
            state,
            prescaler,
            rsd,
        })
    }

    /// Diagnostic-handler RSD, present only for (diagnostic, version 0).
    pub fn diagnostic_v0(&self) -> Option<&StatusRsd> {
        match &self.rsd {
            Rsd::DiagnosticV0(r) => Some(r),
            _ => None,
        }
    }

    /// Gamma-handler RSD for a specific encoding version.
    pub fn gamma(&self, version: GammaVersion) -> Option<&GammaRsd> {
        match &self.rsd {
            Rsd::GammaV(v, r) if *v == version => Some(r),
            _ => None,
        }
    }

    pub fn pass_thru_v0(&self) -> Option<&StatusRsd> {
        match &self.rsd {
            Rsd::PassThruV0(r) => Some(r),
            _ => None,
        }
    }

    pub fn mip_v0(&self) -> Option<&StatusRsd> {
        match &self.rsd {
            Rsd::MipV0(r) => Some(r),
            _ => None,
        }
    }

    pub fn hip_v0(&self) -> Option<&StatusRsd> {
        match &self.rsd {
            Rsd::HipV0(r) => Some(r),
            _ => None,
        }
    }

    /// Whether the handler generated summary data.
    pub fn has_rsd(&self) -> bool {
        !matches!(self.rsd, Rsd::None)
    }

    /// Debug-check that the stored version and identity agree with the RSD
    /// discriminant. Encoders should uphold this; decode always does.
    pub fn is_consistent(&self) -> bool {
        match (self.rsd.identity(), self.rsd.version()) {
            (None, None) => true,
            (Some(id), Some(ver)) => id == self.id && ver == self.version,
            _ => false,
        }
    }
}

impl Default for HandlerResult {
    fn default() -> Self {
        Self {
            kind: HandlerKind::Filter,
            id: HandlerId::PassThru,
            version: 0,
            master_key: 0xFFFF_FFFF,
            cfg_key: 0xFFFF_FFFF,
            cfg_id: 0xFFFF_FFFF,
            state: RsdState::Invalid,
            prescaler: Prescaler::Unsupported,
            rsd: Rsd::None,
        }
    }
}

fn decode_rsd(buf: &mut impl Buf, id: HandlerId, version: u32) -> Result<Rsd> {
    fn status(buf: &mut impl Buf) -> Result<StatusRsd> {
        Ok(StatusRsd {
            status: wire::get_u32(buf)?,
        })
    }

    match (id, version) {
        (HandlerId::PassThru, 0) => Ok(Rsd::PassThruV0(status(buf)?)),
        (HandlerId::Mip, 0) => Ok(Rsd::MipV0(status(buf)?)),
        (HandlerId::Hip, 0) => Ok(Rsd::HipV0(status(buf)?)),
        (HandlerId::Diagnostic, 0) => Ok(Rsd::DiagnosticV0(status(buf)?)),
        (HandlerId::Gamma, v @ 0..=3) => {
            let data = GammaRsd {
                status: wire::get_u32(buf)?,
                stage: wire::get_u32(buf)?,
                energy_valid: wire::get_u32(buf)?,
                energy_in_leus: wire::get_i32(buf)?,
            };
            let version = match v {
                0 => GammaVersion::V0,
                1 => GammaVersion::V1,
                2 => GammaVersion::V2,
                _ => GammaVersion::V3,
            };
            Ok(Rsd::GammaV(version, data))
        }
        _ => Err(Error::UnknownRsd {
            handler: id.to_wire(),
            version,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn roundtrip(h: &HandlerResult) -> HandlerResult {
        let mut buf = BytesMut::new();
        h.encode(&mut buf);
        let mut cursor = buf.as_ref();
        let decoded = HandlerResult::decode(&mut cursor).unwrap();
        assert_eq!(cursor.len(), 0, "handler decode left trailing bytes");
        decoded
    }

    #[test]
    fn gamma_roundtrip_all_versions() {
        for (wire, version) in [
            (0, GammaVersion::V0),
            (1, GammaVersion::V1),
            (2, GammaVersion::V2),
            (3, GammaVersion::V3),
        ] {
            let h = HandlerResult {
                kind: HandlerKind::Filter,
                id: HandlerId::Gamma,
                version: wire,
                master_key: 0x1111_2222,
                cfg_key: 0x3333_4444,
                cfg_id: 9,
                state: RsdState::Passed,
                prescaler: Prescaler::Cond(17),
                rsd: Rsd::GammaV(
                    version,
                    GammaRsd {
                        status: 0xCAFE,
                        stage: 4,
                        energy_valid: 1,
                        energy_in_leus: -250,
                    },
                ),
            };
            assert!(h.is_consistent());
            let decoded = roundtrip(&h);
            assert_eq!(decoded, h);
            assert!(decoded.gamma(version).is_some());
        }
    }

    #[test]
    fn absent_rsd_roundtrip() {
        let h = HandlerResult {
            kind: HandlerKind::Monitor,
            id: HandlerId::SoftCounters,
            version: 0,
            state: RsdState::Ignored,
            prescaler: Prescaler::Input,
            ..Default::default()
        };
        let decoded = roundtrip(&h);
        assert_eq!(decoded, h);
        assert!(!decoded.has_rsd());
    }

    #[test]
    fn mismatched_accessor_yields_absent() {
        let h = HandlerResult {
            id: HandlerId::Diagnostic,
            version: 0,
            rsd: Rsd::DiagnosticV0(StatusRsd { status: 0xBEEF }),
            ..Default::default()
        };
        let decoded = roundtrip(&h);

        // Requesting the gamma payload from a diagnostic handler must not
        // type-pun: it is simply absent.
        assert!(decoded.gamma(GammaVersion::V0).is_none());
        assert!(decoded.gamma(GammaVersion::V2).is_none());
        assert_eq!(decoded.diagnostic_v0().unwrap().status, 0xBEEF);
    }

    #[test]
    fn gamma_version_mismatch_yields_absent() {
        let h = HandlerResult {
            id: HandlerId::Gamma,
            version: 1,
            rsd: Rsd::GammaV(GammaVersion::V1, GammaRsd::default()),
            ..Default::default()
        };
        assert!(h.gamma(GammaVersion::V0).is_none());
        assert!(h.gamma(GammaVersion::V1).is_some());
    }

    #[test]
    fn undefined_rsd_combination_fails_decode() {
        // SoftCounters has no RSD layout in any version; presence set
        // must be rejected, not guessed at.
        let mut buf = BytesMut::new();
        let h = HandlerResult {
            id: HandlerId::SoftCounters,
            ..Default::default()
        };
        h.encode(&mut buf);
        // Flip the presence byte (last byte of the fixed prefix).
        let n = buf.len();
        buf[n - 1] = 1;
        buf.put_u32_le(0xABAD);

        let mut cursor = buf.as_ref();
        assert!(matches!(
            HandlerResult::decode(&mut cursor),
            Err(Error::UnknownRsd { handler: 2, version: 0 })
        ));
    }

    #[test]
    fn bad_enumerant_fails_decode() {
        let mut buf = BytesMut::new();
        HandlerResult::default().encode(&mut buf);
        // Corrupt the state word (offset 24..28).
        buf[24..28].copy_from_slice(&99i32.to_le_bytes());

        let mut cursor = buf.as_ref();
        assert!(matches!(
            HandlerResult::decode(&mut cursor),
            Err(Error::InvalidEnum { field: "result state", .. })
        ));
    }

    #[test]
    fn prescaler_wire_values() {
        for p in [
            Prescaler::Unsupported,
            Prescaler::Input,
            Prescaler::Output,
            Prescaler::Cond(0),
            Prescaler::Cond(31),
        ] {
            let h = HandlerResult {
                prescaler: p,
                ..Default::default()
            };
            assert_eq!(roundtrip(&h).prescaler, p);
        }

        // 32 is past the last condition-specific slot.
        assert!(Prescaler::from_wire(32).is_err());
        assert!(Prescaler::from_wire(-4).is_err());
    }
}
