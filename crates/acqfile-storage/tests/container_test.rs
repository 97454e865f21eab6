//! End-to-end container tests: write, close, reopen, read back.

mod common;

use std::fs;

use tempfile::TempDir;

use acqfile_core::header::HEADER_LEN;
use acqfile_core::{ChannelErrorKind, Context, Error, Keys, RunConfig};
use acqfile_storage::{EventReader, EventWriter};

use common::{encoded_record_len, make_record};

// ---------------------------------------------------------------
// Write / read round-trips
// ---------------------------------------------------------------

#[test]
fn three_record_file_reports_bounds_and_replays_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    let mut writer = EventWriter::open(&path, 42, &RunConfig::default()).unwrap();
    let records: Vec<_> = [(1000u32, 10u64), (1001, 11), (1002, 12)]
        .iter()
        .map(|&(secs, seq)| make_record(secs, seq))
        .collect();
    for (ctx, payload, info, keys) in &records {
        writer.append(ctx, payload, info, keys).unwrap();
    }
    writer.close().unwrap();

    let mut reader = EventReader::open(&path).unwrap();
    assert_eq!(reader.run_id(), 42);
    assert_eq!(reader.event_count(), 3);
    assert_eq!(reader.gem_begin(), 10);
    assert_eq!(reader.gem_end(), 12);
    assert_eq!(reader.secs_begin(), 1000);
    assert_eq!(reader.secs_end(), 1002);

    for (ctx, payload, info, keys) in &records {
        let got = reader.next_record().unwrap().unwrap();
        assert_eq!(&got.context, ctx);
        assert_eq!(&got.payload, payload);
        assert_eq!(&got.info, info);
        assert_eq!(&got.keys, keys);
    }
    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn config_metadata_survives_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    let config = RunConfig::new(0x0012_0034, "flight-cfg");
    let mut writer = EventWriter::open(&path, 7, &config).unwrap();
    let (ctx, payload, info, keys) = make_record(500, 1);
    writer.append(&ctx, &payload, &info, &keys).unwrap();
    writer.close().unwrap();

    let reader = EventReader::open(&path).unwrap();
    assert_eq!(reader.config_key(), 0x0012_0034);
    assert_eq!(reader.alias(), "flight-cfg");
}

#[test]
fn channel_error_tables_survive_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    let mut writer = EventWriter::open(&path, 7, &RunConfig::default()).unwrap();
    let (ctx, payload, info, keys) = make_record(500, 1);
    writer.append(&ctx, &payload, &info, &keys).unwrap();
    writer.record_channel_error(2, ChannelErrorKind::Sequence, 14);
    writer.record_channel_error(3, ChannelErrorKind::Delivery, 1);
    writer.close().unwrap();

    let reader = EventReader::open(&path).unwrap();
    let header = reader.header();
    assert_eq!(header.seq_errors().len(), 1);
    assert_eq!(header.seq_errors()[0].channel, 2);
    assert_eq!(header.seq_errors()[0].count, 14);
    assert_eq!(header.dly_errors().len(), 1);
    assert_eq!(header.dly_errors()[0].channel, 3);
}

// ---------------------------------------------------------------
// Writer lifecycle
// ---------------------------------------------------------------

#[test]
fn empty_writer_leaves_zero_length_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.acq");

    let mut writer = EventWriter::open(&path, 1, &RunConfig::default()).unwrap();
    writer.close().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn close_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    let mut writer = EventWriter::open(&path, 1, &RunConfig::default()).unwrap();
    let (ctx, payload, info, keys) = make_record(100, 1);
    writer.append(&ctx, &payload, &info, &keys).unwrap();

    writer.close().unwrap();
    let first = fs::read(&path).unwrap();
    writer.close().unwrap();
    let second = fs::read(&path).unwrap();
    assert_eq!(first, second);

    // Appending after close is an error, not silent corruption.
    assert!(matches!(
        writer.append(&ctx, &payload, &info, &keys),
        Err(Error::WriterClosed(_))
    ));
}

#[test]
fn drop_finalizes_the_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    {
        let mut writer = EventWriter::open(&path, 9, &RunConfig::default()).unwrap();
        let (ctx, payload, info, keys) = make_record(100, 4);
        writer.append(&ctx, &payload, &info, &keys).unwrap();
    }

    let reader = EventReader::open(&path).unwrap();
    assert_eq!(reader.event_count(), 1);
    assert_eq!(reader.gem_begin(), 4);
}

// ---------------------------------------------------------------
// Seeking
// ---------------------------------------------------------------

#[test]
fn seek_replays_records_at_recorded_offsets() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    let mut writer = EventWriter::open(&path, 1, &RunConfig::default()).unwrap();
    let mut offsets = Vec::new();
    let mut offset = HEADER_LEN as u64;
    let records: Vec<_> = (0..5u64).map(|i| make_record(2000 + i as u32, i)).collect();
    for (ctx, payload, info, keys) in &records {
        offsets.push(offset);
        offset += encoded_record_len(ctx, payload, info, keys);
        writer.append(ctx, payload, info, keys).unwrap();
    }
    writer.close().unwrap();

    let mut reader = EventReader::open(&path).unwrap();

    // Read them back in reverse via seek.
    for i in (0..5usize).rev() {
        reader.seek(offsets[i]).unwrap();
        let got = reader.next_record().unwrap().unwrap();
        assert_eq!(got.context.scalers.sequence, i as u64);
    }

    // Rewind restarts at the first record.
    reader.rewind().unwrap();
    let first = reader.next_record().unwrap().unwrap();
    assert_eq!(first.context.scalers.sequence, 0);
}

// ---------------------------------------------------------------
// Corruption handling
// ---------------------------------------------------------------

#[test]
fn unknown_info_tag_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    let (ctx, payload, info, keys) = make_record(100, 1);
    let mut writer = EventWriter::open(&path, 1, &RunConfig::default()).unwrap();
    writer.append(&ctx, &payload, &info, &keys).unwrap();
    writer.close().unwrap();

    // The info tag sits after the context image and length-prefixed blob.
    let tag_at = HEADER_LEN + Context::ENCODED_LEN + 4 + payload.len();
    let mut bytes = fs::read(&path).unwrap();
    bytes[tag_at..tag_at + 4].copy_from_slice(&0x7777u32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let mut reader = EventReader::open(&path).unwrap();
    assert!(matches!(
        reader.next_record(),
        Err(Error::UnknownInfoType(0x7777))
    ));
}

#[test]
fn unknown_keys_tag_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    let (ctx, payload, info, keys) = make_record(100, 1);
    let mut writer = EventWriter::open(&path, 1, &RunConfig::default()).unwrap();
    writer.append(&ctx, &payload, &info, &keys).unwrap();
    writer.close().unwrap();

    // The keys tag is the last 4 + aux words of the record; compute from
    // the keys' own encoded size.
    let keys_len = {
        let mut buf = bytes::BytesMut::new();
        keys.encode(&mut buf);
        buf.len()
    };
    let mut bytes = fs::read(&path).unwrap();
    let tag_at = bytes.len() - keys_len;
    bytes[tag_at..tag_at + 4].copy_from_slice(&0x55u32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let mut reader = EventReader::open(&path).unwrap();
    assert!(matches!(
        reader.next_record(),
        Err(Error::UnknownKeysType(0x55))
    ));
}

#[test]
fn truncation_mid_record_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    let (ctx, payload, info, keys) = make_record(100, 1);
    let mut writer = EventWriter::open(&path, 1, &RunConfig::default()).unwrap();
    writer.append(&ctx, &payload, &info, &keys).unwrap();
    writer.close().unwrap();

    // Chop the file in the middle of the context image.
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..HEADER_LEN + 100]).unwrap();

    let mut reader = EventReader::open(&path).unwrap();
    assert!(matches!(
        reader.next_record(),
        Err(Error::TruncatedRecord)
    ));
}

#[test]
fn bad_magic_fails_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("not-acq.bin");
    fs::write(&path, vec![0xABu8; 256]).unwrap();

    assert!(matches!(
        EventReader::open(&path),
        Err(Error::BadMagic(0xABABABAB))
    ));
}

#[test]
fn none_variants_round_trip_through_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.acq");

    let (ctx, payload, _, _) = make_record(100, 1);
    let mut writer = EventWriter::open(&path, 1, &RunConfig::default()).unwrap();
    writer
        .append(&ctx, &payload, &acqfile_core::Info::None, &Keys::None)
        .unwrap();
    writer.close().unwrap();

    let mut reader = EventReader::open(&path).unwrap();
    let got = reader.next_record().unwrap().unwrap();
    assert_eq!(got.info, acqfile_core::Info::None);
    assert_eq!(got.keys, Keys::None);
    assert!(reader.next_record().unwrap().is_none());
}
