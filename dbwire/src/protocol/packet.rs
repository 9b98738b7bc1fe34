//! The packet codec (spec §2 item 2, §4.2): dispatches on the first payload
//! byte to produce a typed packet variant, and serializes outgoing command
//! packets.

use super::capabilities::Capabilities;
use super::decode::Decoder;
use super::encode::*;
use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};

/// OK packet: affected-rows, last-insert-id, status flags, warnings, message.
#[derive(Debug, Clone, Default)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: u16,
    pub warnings: u16,
    pub message: String,
}

/// Error packet: 2-byte error number, optional 5-byte SQLSTATE, message text.
#[derive(Debug, Clone)]
pub struct ErrPacket {
    pub error_number: u16,
    pub sql_state: String,
    pub message: String,
}

impl From<ErrPacket> for Error {
    fn from(err: ErrPacket) -> Self {
        Error::Query { message: err.message, error_number: err.error_number, sql_state: err.sql_state }
    }
}

/// EOF packet: warnings, status flags. Only valid when payload length < 9.
#[derive(Debug, Clone, Copy, Default)]
pub struct EofPacket {
    pub warnings: u16,
    pub status_flags: u16,
}

/// The initial greeting sent by the server before any client bytes.
#[derive(Debug, Clone)]
pub struct Greeting {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub seed: Bytes,
    pub server_capabilities: Capabilities,
    pub status_flags: u16,
}

/// Column metadata, built once per column at the start of a result set and
/// shared by reference with every row (spec §3).
#[derive(Debug, Clone)]
pub struct ColumnInformation {
    pub schema: Bytes,
    pub table: Bytes,
    pub name: Bytes,
    pub column_type: u8,
    pub length: u32,
    pub flags: u16,
    pub decimals: u8,
}

/// What a client-initiated command can receive as its first reply.
#[derive(Debug, Clone)]
pub enum CommandResponse {
    Ok(OkPacket),
    Err(ErrPacket),
    ResultSetHeader(u64),
    /// `0xFB`-prefixed reply: the server is requesting a LOCAL INFILE upload.
    LocalInfileRequest(Bytes),
}

/// What can appear in the row-streaming phase of a result set.
#[derive(Debug)]
pub enum RowOrTerminator {
    Row(Vec<Option<Bytes>>),
    Eof(EofPacket),
    Err(ErrPacket),
}

fn decode_ok_body(decoder: &mut Decoder) -> OkPacket {
    // Skip the 0x00/0xFE packet-header byte; caller has already peeked it.
    decoder.skip_bytes(1);
    let affected_rows = decoder.decode_int_lenenc().unwrap_or(0);
    let last_insert_id = decoder.decode_int_lenenc().unwrap_or(0);
    let status_flags = decoder.decode_int_2();
    let warnings = decoder.decode_int_2();
    let message = String::from_utf8_lossy(&decoder.decode_string_eof()).into_owned();

    OkPacket { affected_rows, last_insert_id, status_flags, warnings, message }
}

fn decode_err_body(decoder: &mut Decoder) -> Result<ErrPacket> {
    decoder.skip_bytes(1); // 0xFF marker
    let error_number = decoder.decode_int_2();

    let (sql_state, message) = if decoder.peek_u8() == Some(b'#') {
        decoder.skip_bytes(1);
        let sql_state = String::from_utf8_lossy(&decoder.decode_string_fix(5)).into_owned();
        let message = String::from_utf8_lossy(&decoder.decode_string_eof()).into_owned();
        (sql_state, message)
    } else {
        let message = String::from_utf8_lossy(&decoder.decode_string_eof()).into_owned();
        (String::new(), message)
    };

    Ok(ErrPacket { error_number, sql_state, message })
}

fn decode_eof_body(decoder: &mut Decoder) -> EofPacket {
    decoder.skip_bytes(1); // 0xFE marker
    let warnings = decoder.decode_int_2();
    let status_flags = decoder.decode_int_2();
    EofPacket { warnings, status_flags }
}

/// An Error packet can interrupt the column-definition phase of a result
/// set too, not just the row phase (spec §4.4's blanket "on Error response
/// raise QueryError" rule applies throughout).
pub fn decode_err_if_present(payload: &[u8]) -> Result<Option<ErrPacket>> {
    if payload.first() == Some(&0xFF) {
        Ok(Some(decode_err_body(&mut Decoder::new(payload))?))
    } else {
        Ok(None)
    }
}

/// Dispatch the first reply to a client-initiated command (spec §4.2, §4.4).
pub fn decode_command_response(payload: &[u8]) -> Result<CommandResponse> {
    if payload.is_empty() {
        return Err(Error::protocol("empty packet where a command response was expected"));
    }

    match payload[0] {
        0xFF => Ok(CommandResponse::Err(decode_err_body(&mut Decoder::new(payload))?)),
        0x00 => Ok(CommandResponse::Ok(decode_ok_body(&mut Decoder::new(payload)))),
        0xFE if payload.len() < 9 => Ok(CommandResponse::Ok(decode_ok_body(&mut Decoder::new(payload)))),
        0xFB => Ok(CommandResponse::LocalInfileRequest(Bytes::copy_from_slice(&payload[1..]))),
        _ => {
            let mut decoder = Decoder::new(payload);
            let field_count =
                decoder.decode_int_lenenc().ok_or_else(|| Error::protocol("result-set header field count was NULL"))?;
            Ok(CommandResponse::ResultSetHeader(field_count))
        }
    }
}

/// Decode the greeting packet (spec §4.2's fixed layout).
pub fn decode_greeting(payload: &[u8]) -> Result<Greeting> {
    let mut decoder = Decoder::new(payload);

    let protocol_version = decoder.decode_int_1();
    if protocol_version != 10 {
        return Err(Error::protocol(format!("unsupported protocol version {protocol_version}")));
    }

    let server_version = String::from_utf8_lossy(&decoder.decode_string_null()?).into_owned();
    let connection_id = decoder.decode_int_4();
    let seed_part_1 = decoder.decode_string_fix(8);
    decoder.skip_bytes(1); // filler

    let capabilities_low = decoder.decode_int_2() as u32;
    decoder.skip_bytes(1); // charset
    let status_flags = decoder.decode_int_2();
    let capabilities_high = decoder.decode_int_2() as u32;
    let auth_data_length = decoder.decode_int_1();
    decoder.skip_bytes(10); // reserved

    let server_capabilities = Capabilities::from_bits_truncate(capabilities_low | (capabilities_high << 16));

    let seed_part_2_len = std::cmp::max(13, auth_data_length as i32 - 8) as usize;
    let seed_part_2_len = seed_part_2_len.saturating_sub(1); // drop the trailing null
    let seed_part_2 = if decoder.remaining() >= seed_part_2_len {
        decoder.decode_string_fix(seed_part_2_len)
    } else {
        decoder.decode_string_eof()
    };

    let mut seed = BytesMut::with_capacity(seed_part_1.len() + seed_part_2.len());
    seed.extend_from_slice(&seed_part_1);
    seed.extend_from_slice(&seed_part_2);

    Ok(Greeting {
        protocol_version,
        server_version,
        connection_id,
        seed: seed.freeze(),
        server_capabilities,
        status_flags,
    })
}

/// Decode one column-definition packet (spec §4.5 step 1).
pub fn decode_column_definition(payload: &[u8]) -> Result<ColumnInformation> {
    let mut decoder = Decoder::new(payload);

    let _catalog = decoder.decode_string_lenenc();
    let schema = decoder.decode_string_lenenc().unwrap_or_default();
    let table = decoder.decode_string_lenenc().unwrap_or_default();
    let _table_alias = decoder.decode_string_lenenc();
    let name = decoder.decode_string_lenenc().unwrap_or_default();
    let _name_alias = decoder.decode_string_lenenc();
    let _fixed_fields_length = decoder.decode_int_lenenc();
    decoder.skip_bytes(2); // character set
    let length = decoder.decode_int_4();
    let column_type = decoder.decode_int_1();
    let flags = decoder.decode_int_2();
    let decimals = decoder.decode_int_1();

    Ok(ColumnInformation { schema, table, name, column_type, length, flags, decimals })
}

/// Decode one result-set row, or recognize that this frame is instead the
/// terminating EOF/Error (spec §4.5 step 3).
pub fn decode_row_or_terminator(payload: &[u8], column_count: usize) -> Result<RowOrTerminator> {
    if payload.is_empty() {
        return Err(Error::protocol("empty packet in result-set row phase"));
    }

    match payload[0] {
        0xFF => Ok(RowOrTerminator::Err(decode_err_body(&mut Decoder::new(payload))?)),
        0xFE if payload.len() < 9 => Ok(RowOrTerminator::Eof(decode_eof_body(&mut Decoder::new(payload)))),
        _ => {
            let mut decoder = Decoder::new(payload);
            let mut row = Vec::with_capacity(column_count);
            for _ in 0..column_count {
                row.push(decoder.decode_string_lenenc());
            }
            Ok(RowOrTerminator::Row(row))
        }
    }
}

/// Encode an OK packet body, the inverse of `decode_ok_body` (spec §8's
/// round-trip invariant).
pub fn encode_ok_packet(ok: &OkPacket) -> BytesMut {
    let mut buf = BytesMut::with_capacity(16 + ok.message.len());
    encode_int_1(&mut buf, 0x00);
    encode_int_lenenc(&mut buf, Some(ok.affected_rows));
    encode_int_lenenc(&mut buf, Some(ok.last_insert_id));
    encode_int_2(&mut buf, ok.status_flags);
    encode_int_2(&mut buf, ok.warnings);
    encode_string_fix(&mut buf, ok.message.as_bytes());
    buf
}

/// Encode an Error packet body, the inverse of `decode_err_body`. Emits the
/// `#`-prefixed SQLSTATE form when `sql_state` is non-empty, matching what
/// every real server sends (and what `decode_err_body` round-trips).
pub fn encode_err_packet(err: &ErrPacket) -> BytesMut {
    let mut buf = BytesMut::with_capacity(10 + err.message.len());
    encode_int_1(&mut buf, 0xFF);
    encode_int_2(&mut buf, err.error_number);
    if !err.sql_state.is_empty() {
        encode_int_1(&mut buf, b'#');
        encode_string_fix(&mut buf, err.sql_state.as_bytes());
    }
    encode_string_fix(&mut buf, err.message.as_bytes());
    buf
}

/// Encode an EOF packet body, the inverse of `decode_eof_body`.
pub fn encode_eof_packet(eof: &EofPacket) -> BytesMut {
    let mut buf = BytesMut::with_capacity(5);
    encode_int_1(&mut buf, 0xFE);
    encode_int_2(&mut buf, eof.warnings);
    encode_int_2(&mut buf, eof.status_flags);
    buf
}

/// Encode a column-definition packet body, the inverse of
/// `decode_column_definition`. Catalog, table-alias and name-alias are not
/// part of `ColumnInformation` and round-trip as empty strings.
pub fn encode_column_definition(column: &ColumnInformation) -> BytesMut {
    let mut buf = BytesMut::with_capacity(32 + column.schema.len() + column.table.len() + column.name.len());
    encode_string_lenenc(&mut buf, &Bytes::new()); // catalog
    encode_string_lenenc(&mut buf, &column.schema);
    encode_string_lenenc(&mut buf, &column.table);
    encode_string_lenenc(&mut buf, &Bytes::new()); // table alias
    encode_string_lenenc(&mut buf, &column.name);
    encode_string_lenenc(&mut buf, &Bytes::new()); // name alias
    encode_int_lenenc(&mut buf, Some(0x0C));
    buf.extend_from_slice(&[0u8; 2]); // character set
    encode_int_4(&mut buf, column.length);
    encode_int_1(&mut buf, column.column_type);
    encode_int_2(&mut buf, column.flags);
    encode_int_1(&mut buf, column.decimals);
    buf
}

/// Encode one result-set row, the inverse of `decode_row_or_terminator`'s
/// `Row` arm. `None` encodes SQL NULL.
pub fn encode_row(values: &[Option<Bytes>]) -> BytesMut {
    let mut buf = BytesMut::new();
    for value in values {
        match value {
            Some(bytes) => encode_string_lenenc(&mut buf, bytes),
            None => encode_int_lenenc(&mut buf, None),
        }
    }
    buf
}

/// Serializes outgoing command packets (spec §4.4's Outgoing column).
pub mod client {
    use super::*;

    pub const COM_QUIT: u8 = 0x01;
    pub const COM_INIT_DB: u8 = 0x02;
    pub const COM_QUERY: u8 = 0x03;
    pub const COM_PING: u8 = 0x0E;
    pub const COM_BINLOG_DUMP: u8 = 0x12;

    pub fn encode_com_query(sql: &str) -> BytesMut {
        let mut buf = BytesMut::with_capacity(1 + sql.len());
        encode_int_1(&mut buf, COM_QUERY);
        encode_string_fix(&mut buf, sql.as_bytes());
        buf
    }

    pub fn encode_com_ping() -> BytesMut {
        let mut buf = BytesMut::with_capacity(1);
        encode_int_1(&mut buf, COM_PING);
        buf
    }

    pub fn encode_com_quit() -> BytesMut {
        let mut buf = BytesMut::with_capacity(1);
        encode_int_1(&mut buf, COM_QUIT);
        buf
    }

    pub fn encode_com_init_db(schema: &str) -> BytesMut {
        let mut buf = BytesMut::with_capacity(1 + schema.len());
        encode_int_1(&mut buf, COM_INIT_DB);
        encode_string_fix(&mut buf, schema.as_bytes());
        buf
    }

    pub fn encode_com_binlog_dump(position: u32, flags: u16, server_id: u32, filename: &str) -> BytesMut {
        let mut buf = BytesMut::with_capacity(11 + filename.len());
        encode_int_1(&mut buf, COM_BINLOG_DUMP);
        encode_int_4(&mut buf, position);
        encode_int_2(&mut buf, flags);
        encode_int_4(&mut buf, server_id);
        encode_string_fix(&mut buf, filename.as_bytes());
        buf
    }

    /// The client's auth response packet (spec §4.3 step 5).
    #[allow(clippy::too_many_arguments)]
    pub fn encode_handshake_response(
        capabilities: Capabilities,
        username: &str,
        auth_response: &[u8],
        database: Option<&str>,
    ) -> BytesMut {
        const MAX_PACKET_SIZE: u32 = 0x0100_0000;
        const CHARSET_UTF8_GENERAL_CI: u8 = 33;

        let mut buf = BytesMut::with_capacity(64 + username.len() + auth_response.len());
        encode_int_4(&mut buf, capabilities.bits());
        encode_int_4(&mut buf, MAX_PACKET_SIZE);
        encode_int_1(&mut buf, CHARSET_UTF8_GENERAL_CI);
        buf.extend_from_slice(&[0u8; 23]);
        encode_string_null(&mut buf, username.as_bytes());
        encode_int_1(&mut buf, auth_response.len() as u8);
        encode_string_fix(&mut buf, auth_response);

        if capabilities.contains(Capabilities::CONNECT_WITH_DB) {
            if let Some(database) = database {
                encode_string_null(&mut buf, database.as_bytes());
            }
        }

        buf
    }
}
