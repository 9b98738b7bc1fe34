//! The framer (spec §4.1): reads and writes length-prefixed packets and owns
//! the sequence counter. Generic over the transport so tests can drive it
//! over an in-memory duplex instead of a real `TcpStream`.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use bytes::{Bytes, BytesMut};
use log::trace;
use std::io::{Read, Write};

/// Payloads longer than this must be split across successive frames.
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FF_FF;

pub struct Framer<S> {
    stream: S,
    write_buf: BytesMut,
    seq: u8,
}

impl<S: Read + Write> Framer<S> {
    pub fn new(stream: S) -> Self {
        Framer { stream, write_buf: BytesMut::with_capacity(1024), seq: 0 }
    }

    /// Reset at the start of each client-initiated command (spec §4.1).
    pub fn reset_sequence(&mut self) {
        self.seq = 0;
    }

    pub fn next_sequence(&self) -> u8 {
        self.seq
    }

    /// Read exactly one physical frame. Does not concatenate continuation
    /// frames (length == `MAX_PAYLOAD_LEN`) — that's the result-set reader's
    /// job (spec §4.1, §4.5).
    pub fn read_packet(&mut self) -> Result<Bytes> {
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header)?;

        let length = LittleEndian::read_u24(&header[0..3]) as usize;
        let seq = header[3];

        if seq != self.seq {
            return Err(Error::protocol(format!(
                "packet out of order: expected sequence {}, server sent {}",
                self.seq, seq
            )));
        }
        self.seq = self.seq.wrapping_add(1);

        let mut payload = vec![0u8; length];
        self.stream.read_exact(&mut payload)?;
        trace!("read packet seq={seq} len={length}");

        Ok(Bytes::from(payload))
    }

    /// Write exactly one physical frame. `payload` must be at most
    /// `MAX_PAYLOAD_LEN` bytes; splitting larger payloads is the caller's
    /// responsibility (spec §4.1).
    pub fn write_packet(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::protocol("single frame payload exceeds 2^24-1 bytes"));
        }

        self.write_buf.clear();
        let mut length_bytes = [0u8; 3];
        LittleEndian::write_u24(&mut length_bytes, payload.len() as u32);
        self.write_buf.extend_from_slice(&length_bytes);
        self.write_buf.extend_from_slice(&[self.seq]);
        self.write_buf.extend_from_slice(payload);

        self.stream.write_all(&self.write_buf)?;
        self.stream.flush()?;
        trace!("wrote packet seq={} len={}", self.seq, payload.len());
        self.seq = self.seq.wrapping_add(1);

        Ok(())
    }

    /// Write a possibly-oversized payload, splitting it into `MAX_PAYLOAD_LEN`
    /// chunks with successive sequence numbers. A final chunk strictly
    /// shorter than `MAX_PAYLOAD_LEN` (possibly zero-length) terminates the
    /// logical message (spec §4.1).
    pub fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return self.write_packet(&[]);
        }

        let mut offset = 0;
        loop {
            let end = std::cmp::min(offset + MAX_PAYLOAD_LEN, payload.len());
            let chunk = &payload[offset..end];
            self.write_packet(chunk)?;
            offset = end;

            if chunk.len() < MAX_PAYLOAD_LEN {
                break;
            }
            if offset == payload.len() {
                // Last chunk exactly filled a frame; a zero-length frame terminates.
                self.write_packet(&[])?;
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// An in-memory duplex: reads come from `input`, writes go to `output`.
    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn duplex(input: Vec<u8>) -> Duplex {
        Duplex { input: Cursor::new(input), output: Vec::new() }
    }

    #[test]
    fn it_reads_a_packet_and_advances_sequence() {
        let mut framer = Framer::new(duplex(vec![0x02, 0x00, 0x00, 0x00, 0xAB, 0xCD]));
        let payload = framer.read_packet().unwrap();
        assert_eq!(&payload[..], &[0xAB, 0xCD]);
        assert_eq!(framer.next_sequence(), 1);
    }

    #[test]
    fn it_rejects_out_of_order_sequence() {
        let mut framer = Framer::new(duplex(vec![0x00, 0x00, 0x00, 0x05]));
        assert!(framer.read_packet().is_err());
    }

    #[test]
    fn it_writes_a_packet_with_header_and_resets_on_demand() {
        let mut framer = Framer::new(duplex(vec![]));
        framer.write_packet(b"hi").unwrap();
        assert_eq!(framer.stream.output, vec![0x02, 0x00, 0x00, 0x00, b'h', b'i']);
        assert_eq!(framer.next_sequence(), 1);

        framer.reset_sequence();
        assert_eq!(framer.next_sequence(), 0);
    }

    #[test]
    fn it_splits_oversized_payload_and_terminates_with_zero_length_frame() {
        let mut framer = Framer::new(duplex(vec![]));
        let payload = vec![0xAAu8; MAX_PAYLOAD_LEN];
        framer.write_payload(&payload).unwrap();

        // One full-size chunk plus a zero-length terminator.
        assert_eq!(framer.next_sequence(), 2);
        let output = &framer.stream.output;
        assert_eq!(&output[0..4], &[0xFF, 0xFF, 0xFF, 0x00]);
        assert_eq!(&output[4 + MAX_PAYLOAD_LEN..4 + MAX_PAYLOAD_LEN + 4], &[0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn it_writes_short_payload_without_extra_terminator_frame() {
        let mut framer = Framer::new(duplex(vec![]));
        framer.write_payload(b"short").unwrap();
        assert_eq!(framer.next_sequence(), 1);
    }
}
