//! Checked little-endian primitives for the record codec.
//!
//! The `bytes` crate's `get_*` accessors panic when the cursor runs dry.
//! Decoding untrusted file content must fail with `TruncatedRecord`
//! instead, so every decode path goes through these helpers.

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// Fixed width of the zero-padded text fields carried in the context block.
pub const TEXT_LEN: usize = 16;

#[inline]
fn need(buf: &impl Buf, n: usize) -> Result<()> {
    if buf.remaining() < n {
        return Err(Error::TruncatedRecord);
    }
    Ok(())
}

pub fn get_u8(buf: &mut impl Buf) -> Result<u8> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn get_u16(buf: &mut impl Buf) -> Result<u16> {
    need(buf, 2)?;
    Ok(buf.get_u16_le())
}

pub fn get_u32(buf: &mut impl Buf) -> Result<u32> {
    need(buf, 4)?;
    Ok(buf.get_u32_le())
}

pub fn get_u64(buf: &mut impl Buf) -> Result<u64> {
    need(buf, 8)?;
    Ok(buf.get_u64_le())
}

pub fn get_i32(buf: &mut impl Buf) -> Result<i32> {
    need(buf, 4)?;
    Ok(buf.get_i32_le())
}

pub fn get_f64(buf: &mut impl Buf) -> Result<f64> {
    need(buf, 8)?;
    Ok(buf.get_f64_le())
}

/// Any non-zero byte decodes as true.
pub fn get_bool(buf: &mut impl Buf) -> Result<bool> {
    Ok(get_u8(buf)? != 0)
}

pub fn put_bool(buf: &mut impl BufMut, value: bool) {
    buf.put_u8(u8::from(value));
}

/// Write a string as a fixed 16-byte zero-padded field, truncating at the
/// field width.
pub fn put_text(buf: &mut impl BufMut, text: &str) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(TEXT_LEN);
    buf.put_slice(&bytes[..n]);
    buf.put_bytes(0, TEXT_LEN - n);
}

/// Read a fixed 16-byte text field, trimming at the first NUL. Non-UTF-8
/// content is replaced rather than rejected; the field is diagnostic text.
pub fn get_text(buf: &mut impl Buf) -> Result<String> {
    need(buf, TEXT_LEN)?;
    let mut raw = [0u8; TEXT_LEN];
    buf.copy_to_slice(&mut raw);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(TEXT_LEN);
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn text_roundtrip() {
        let mut buf = BytesMut::new();
        put_text(&mut buf, "stopRun");
        assert_eq!(buf.len(), TEXT_LEN);

        let mut cursor = buf.as_ref();
        assert_eq!(get_text(&mut cursor).unwrap(), "stopRun");
        assert_eq!(cursor.len(), 0);
    }

    #[test]
    fn text_truncates_at_field_width() {
        let mut buf = BytesMut::new();
        put_text(&mut buf, "a-very-long-action-name");
        assert_eq!(buf.len(), TEXT_LEN);

        let mut cursor = buf.as_ref();
        assert_eq!(get_text(&mut cursor).unwrap(), "a-very-long-acti");
    }

    #[test]
    fn empty_text_is_all_zero() {
        let mut buf = BytesMut::new();
        put_text(&mut buf, "");
        assert!(buf.iter().all(|&b| b == 0));

        let mut cursor = buf.as_ref();
        assert_eq!(get_text(&mut cursor).unwrap(), "");
    }

    #[test]
    fn short_buffer_is_truncation() {
        let data = [0u8; 3];
        let mut cursor = &data[..];
        assert!(matches!(
            get_u32(&mut cursor),
            Err(Error::TruncatedRecord)
        ));
    }

    #[test]
    fn scalar_roundtrip() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(0xDEAD_BEEF);
        buf.put_u64_le(u64::MAX - 1);
        buf.put_i32_le(-42);
        buf.put_f64_le(1234.5);
        put_bool(&mut buf, true);

        let mut cursor = buf.as_ref();
        assert_eq!(get_u32(&mut cursor).unwrap(), 0xDEAD_BEEF);
        assert_eq!(get_u64(&mut cursor).unwrap(), u64::MAX - 1);
        assert_eq!(get_i32(&mut cursor).unwrap(), -42);
        assert_eq!(get_f64(&mut cursor).unwrap(), 1234.5);
        assert!(get_bool(&mut cursor).unwrap());
        assert_eq!(cursor.len(), 0);
    }
}
