//! Wire-format primitives: length-encoded integers/strings and fixed-width
//! little-endian integers, read from a packet payload already in memory.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

/// Cursor over one packet payload. Every packet body (OK, ERR, EOF, column
/// definition, row, ...) is parsed by walking a `Decoder` left to right.
pub struct Decoder<'a> {
    pub buf: &'a [u8],
    pub index: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Decoder { buf, index: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.index
    }

    #[inline]
    pub fn eof(&self) -> bool {
        self.index >= self.buf.len()
    }

    #[inline]
    pub fn skip_bytes(&mut self, amount: usize) {
        self.index += amount;
    }

    #[inline]
    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.get(self.index).copied()
    }

    #[inline]
    pub fn decode_int_1(&mut self) -> u8 {
        let value = self.buf[self.index];
        self.index += 1;
        value
    }

    #[inline]
    pub fn decode_int_2(&mut self) -> u16 {
        let value = LittleEndian::read_u16(&self.buf[self.index..]);
        self.index += 2;
        value
    }

    #[inline]
    pub fn decode_int_3(&mut self) -> u32 {
        let value = LittleEndian::read_u24(&self.buf[self.index..]);
        self.index += 3;
        value
    }

    #[inline]
    pub fn decode_int_4(&mut self) -> u32 {
        let value = LittleEndian::read_u32(&self.buf[self.index..]);
        self.index += 4;
        value
    }

    #[inline]
    pub fn decode_int_8(&mut self) -> u64 {
        let value = LittleEndian::read_u64(&self.buf[self.index..]);
        self.index += 8;
        value
    }

    /// int\<lenenc\>. `0xFB` denotes SQL NULL in row context and decodes to `None`.
    #[inline]
    pub fn decode_int_lenenc(&mut self) -> Option<u64> {
        match self.buf[self.index] {
            0xFB => {
                self.index += 1;
                None
            }
            0xFC => {
                let value = LittleEndian::read_u16(&self.buf[self.index + 1..]) as u64;
                self.index += 3;
                Some(value)
            }
            0xFD => {
                let value = LittleEndian::read_u24(&self.buf[self.index + 1..]) as u64;
                self.index += 4;
                Some(value)
            }
            0xFE => {
                let value = LittleEndian::read_u64(&self.buf[self.index + 1..]);
                self.index += 9;
                Some(value)
            }
            first => {
                self.index += 1;
                Some(first as u64)
            }
        }
    }

    #[inline]
    pub fn decode_string_fix(&mut self, length: usize) -> Bytes {
        let value = Bytes::copy_from_slice(&self.buf[self.index..self.index + length]);
        self.index += length;
        value
    }

    #[inline]
    pub fn decode_string_eof(&mut self) -> Bytes {
        let value = Bytes::copy_from_slice(&self.buf[self.index..]);
        self.index = self.buf.len();
        value
    }

    /// string\<lenenc\>: a length-encoded integer followed by that many bytes.
    /// Returns `None` for the NULL marker (`0xFB`).
    #[inline]
    pub fn decode_string_lenenc(&mut self) -> Option<Bytes> {
        let length = self.decode_int_lenenc()?;
        Some(self.decode_string_fix(length as usize))
    }

    #[inline]
    pub fn decode_string_null(&mut self) -> Result<Bytes> {
        match memchr::memchr(0, &self.buf[self.index..]) {
            Some(null_index) => {
                let value = Bytes::copy_from_slice(&self.buf[self.index..self.index + null_index]);
                self.index += null_index + 1;
                Ok(value)
            }
            None => Err(Error::protocol("null-terminated string missing its terminator")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_decodes_int_lenenc_single_byte() {
        let buf = [0x05];
        let mut decoder = Decoder::new(&buf);
        assert_eq!(decoder.decode_int_lenenc(), Some(5));
        assert_eq!(decoder.index, 1);
    }

    #[test]
    fn it_decodes_int_lenenc_null_marker() {
        let buf = [0xFB];
        let mut decoder = Decoder::new(&buf);
        assert_eq!(decoder.decode_int_lenenc(), None);
        assert_eq!(decoder.index, 1);
    }

    #[test]
    fn it_decodes_int_lenenc_0xfc() {
        let buf = [0xFC, 0x01, 0x01];
        let mut decoder = Decoder::new(&buf);
        assert_eq!(decoder.decode_int_lenenc(), Some(257));
        assert_eq!(decoder.index, 3);
    }

    #[test]
    fn it_decodes_int_lenenc_0xfd() {
        let buf = [0xFD, 0x01, 0x01, 0x01];
        let mut decoder = Decoder::new(&buf);
        assert_eq!(decoder.decode_int_lenenc(), Some(65793));
        assert_eq!(decoder.index, 4);
    }

    #[test]
    fn it_decodes_int_lenenc_0xfe() {
        let buf = [0xFE, 1, 1, 1, 1, 1, 1, 1, 1];
        let mut decoder = Decoder::new(&buf);
        assert_eq!(decoder.decode_int_lenenc(), Some(72340172838076673));
        assert_eq!(decoder.index, 9);
    }

    #[test]
    fn it_decodes_int_3() {
        let buf = [0x01, 0x01, 0x01];
        let mut decoder = Decoder::new(&buf);
        assert_eq!(decoder.decode_int_3(), 65793);
        assert_eq!(decoder.index, 3);
    }

    #[test]
    fn it_decodes_string_null() {
        let buf = b"random\x00trailing";
        let mut decoder = Decoder::new(buf);
        let value = decoder.decode_string_null().unwrap();
        assert_eq!(&value[..], b"random");
        assert_eq!(decoder.index, 7);
    }

    #[test]
    fn it_fails_on_missing_null_terminator() {
        let buf = b"no-terminator";
        let mut decoder = Decoder::new(buf);
        assert!(decoder.decode_string_null().is_err());
    }

    #[test]
    fn it_decodes_string_lenenc() {
        let buf = [0x03, b'f', b'o', b'o'];
        let mut decoder = Decoder::new(&buf);
        let value = decoder.decode_string_lenenc().unwrap();
        assert_eq!(&value[..], b"foo");
        assert_eq!(decoder.index, 4);
    }
}
