//! Shared fixtures for the storage integration tests.

#![allow(dead_code)]

use bytes::BytesMut;

use acqfile_core::{
    Context, GammaRsd, GammaVersion, HandlerId, HandlerKind, HandlerResult, Info, InfoTime, Keys,
    PayloadBlob, PhysicsInfo, PhysicsKeys, Prescaler, Rsd, RsdState,
};

/// Context with the given acquisition time and scaler sequence number,
/// plus enough fixed content to make byte-level comparisons meaningful.
pub fn make_context(secs: u32, seq: u64) -> Context {
    let mut ctx = Context::default();
    ctx.ccsds.scid = 77;
    ctx.ccsds.apid = 602;
    ctx.ccsds.utc = secs as f64 + 0.5;
    ctx.current.time_secs = secs;
    ctx.current.gem.tics = secs.wrapping_mul(50);
    ctx.previous.time_secs = secs.saturating_sub(1);
    ctx.scalers.sequence = seq;
    ctx.scalers.elapsed = seq * 1000;
    ctx.scalers.livetime = seq * 990;
    ctx.run.platform = 1;
    ctx.run.origin = 2;
    ctx.run.started_at = 239_557_000;
    ctx.run.platform_txt = "flight".into();
    ctx.run.origin_txt = "orbit".into();
    ctx.open.action_txt = "startRun".into();
    ctx.close.action_txt = "stopRun".into();
    ctx
}

/// A full physics record keyed off the sequence number.
pub fn make_record(secs: u32, seq: u64) -> (Context, PayloadBlob, Info, Keys) {
    let context = make_context(secs, seq);
    let payload = PayloadBlob::from_payload(&[seq as u8; 40]).unwrap();
    let info = Info::Physics(PhysicsInfo {
        time: InfoTime {
            time_tics: secs.wrapping_mul(50),
            ..Default::default()
        },
        software_key: 0x11,
        hardware_key: 0x22,
        db_key: 0x33,
        handlers: vec![HandlerResult {
            kind: HandlerKind::Filter,
            id: HandlerId::Gamma,
            version: 1,
            master_key: 0xA0,
            cfg_key: 0xB0,
            cfg_id: 5,
            state: RsdState::Passed,
            prescaler: Prescaler::Unsupported,
            rsd: Rsd::GammaV(
                GammaVersion::V1,
                GammaRsd {
                    status: seq as u32,
                    stage: 3,
                    energy_valid: 1,
                    energy_in_leus: 1200,
                },
            ),
        }],
    });
    let keys = Keys::Physics(PhysicsKeys {
        master: 0x500,
        ignore_mask: 0x501,
        db_key: 0x502,
        aux: vec![0x600, 0x601],
    });
    (context, payload, info, keys)
}

/// Encoded size of one record, for computing byte offsets in index files.
pub fn encoded_record_len(
    context: &Context,
    payload: &PayloadBlob,
    info: &Info,
    keys: &Keys,
) -> u64 {
    let mut buf = BytesMut::new();
    context.encode(&mut buf);
    payload.encode(&mut buf);
    info.encode(&mut buf);
    keys.encode(&mut buf);
    buf.len() as u64
}
