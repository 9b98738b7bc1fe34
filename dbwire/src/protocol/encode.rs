//! Inverse of [`decode`](super::decode): wire-format primitives written into
//! an outgoing packet body.

use bytes::{BufMut, Bytes, BytesMut};

const U24_MAX: u64 = 0xFF_FF_FF;

#[inline]
pub fn encode_int_1(buf: &mut BytesMut, value: u8) {
    buf.put_u8(value);
}

#[inline]
pub fn encode_int_2(buf: &mut BytesMut, value: u16) {
    buf.put_u16_le(value);
}

#[inline]
pub fn encode_int_3(buf: &mut BytesMut, value: u32) {
    let bytes = value.to_le_bytes();
    buf.extend_from_slice(&bytes[0..3]);
}

#[inline]
pub fn encode_int_4(buf: &mut BytesMut, value: u32) {
    buf.put_u32_le(value);
}

#[inline]
pub fn encode_int_8(buf: &mut BytesMut, value: u64) {
    buf.put_u64_le(value);
}

/// int\<lenenc\>. `None` encodes the NULL marker `0xFB`.
#[inline]
pub fn encode_int_lenenc(buf: &mut BytesMut, value: Option<u64>) {
    match value {
        None => buf.put_u8(0xFB),
        Some(value) if value < 0xFB => buf.put_u8(value as u8),
        Some(value) if value <= u16::MAX as u64 => {
            buf.put_u8(0xFC);
            encode_int_2(buf, value as u16);
        }
        Some(value) if value <= U24_MAX => {
            buf.put_u8(0xFD);
            encode_int_3(buf, value as u32);
        }
        Some(value) => {
            buf.put_u8(0xFE);
            encode_int_8(buf, value);
        }
    }
}

#[inline]
pub fn encode_string_fix(buf: &mut BytesMut, bytes: &[u8]) {
    buf.extend_from_slice(bytes);
}

#[inline]
pub fn encode_string_null(buf: &mut BytesMut, bytes: &[u8]) {
    buf.extend_from_slice(bytes);
    buf.put_u8(0);
}

#[inline]
pub fn encode_string_lenenc(buf: &mut BytesMut, bytes: &Bytes) {
    encode_int_lenenc(buf, Some(bytes.len() as u64));
    buf.extend_from_slice(bytes);
}
