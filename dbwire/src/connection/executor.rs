//! The command executor and result-set reader (spec §4.4, §4.5) plus the
//! LOCAL INFILE uploader (§4.6) and binlog dump reader (§4.7).

use super::result::{QueryResult, ResultSet, Row};
use super::Connection;
use crate::error::{Error, Result};
use crate::protocol::packet::{
    client, decode_column_definition, decode_command_response, decode_err_if_present, decode_row_or_terminator,
    CommandResponse, RowOrTerminator,
};
use bytes::{Bytes, BytesMut};
use log::{debug, trace};
use std::io::{Read, Write};
use std::rc::Rc;

/// Chunk size used to stream a LOCAL INFILE upload; independent of the wire
/// frame limit (spec §4.1's `MAX_PAYLOAD_LEN`).
const LOCAL_INFILE_CHUNK_SIZE: usize = 16 * 1024;

impl<S: Read + Write> Connection<S> {
    /// `query(text) → QueryResult` (spec §4.4).
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.guard_usable()?;
        let result = run_query(self, sql);
        self.poison_on_error(&result);
        result
    }

    /// `query(text, fileStream) → QueryResult` (spec §4.6): for queries
    /// expected to trigger a `LOAD DATA LOCAL INFILE` upload.
    pub fn query_with_local_infile(&mut self, sql: &str, file: &mut dyn Read) -> Result<QueryResult> {
        self.guard_usable()?;
        let result = run_query_with_local_infile(self, sql, file);
        self.poison_on_error(&result);
        result
    }

    pub fn ping(&mut self) -> Result<bool> {
        self.guard_usable()?;
        let result = run_ping(self);
        self.poison_on_error(&result);
        result
    }

    pub fn select_db(&mut self, name: &str) -> Result<()> {
        self.guard_usable()?;
        let result = run_select_db(self, name);
        self.poison_on_error(&result);
        result
    }

    /// `startBinlogDump(pos, filename) → sequence of raw frames` (spec
    /// §4.7). Returned lazily so the caller controls memory (Open
    /// Question #2) instead of buffering the whole stream.
    pub fn start_binlog_dump(&mut self, position: u32, filename: &str) -> Result<BinlogStream<'_, S>> {
        self.guard_usable()?;
        self.framer.reset_sequence();
        let payload = client::encode_com_binlog_dump(position, 0, 0, filename);
        let result = self.framer.write_packet(&payload);
        self.poison_on_error(&result);
        result?;
        Ok(BinlogStream { conn: self, done: false })
    }
}

fn run_query<S: Read + Write>(conn: &mut Connection<S>, sql: &str) -> Result<QueryResult> {
    conn.framer.reset_sequence();
    conn.framer.write_packet(&client::encode_com_query(sql))?;
    let first = conn.framer.read_packet()?;

    match decode_command_response(&first)? {
        CommandResponse::Ok(ok) => Ok(QueryResult::Update {
            affected_rows: ok.affected_rows,
            warnings: ok.warnings,
            message: ok.message,
            insert_id: ok.last_insert_id,
        }),
        CommandResponse::Err(err) => Err(err.into()),
        CommandResponse::ResultSetHeader(field_count) => read_result_set(conn, field_count as usize),
        CommandResponse::LocalInfileRequest(_) => {
            // The caller didn't use query_with_local_infile; decline
            // politely so the exchange stays aligned, then surface a
            // QueryError-shaped failure for the unanticipated request.
            conn.framer.write_packet(&[])?;
            let reply = conn.framer.read_packet()?;
            decode_command_response(&reply)?;
            Err(Error::protocol("server requested LOCAL INFILE but no file stream was provided"))
        }
    }
}

fn run_query_with_local_infile<S: Read + Write>(
    conn: &mut Connection<S>,
    sql: &str,
    file: &mut dyn Read,
) -> Result<QueryResult> {
    conn.framer.reset_sequence();
    conn.framer.write_packet(&client::encode_com_query(sql))?;
    let first = conn.framer.read_packet()?;

    match decode_command_response(&first)? {
        CommandResponse::LocalInfileRequest(path) => {
            trace!("server requested LOCAL INFILE upload of {:?}", String::from_utf8_lossy(&path));
            let mut chunk = vec![0u8; LOCAL_INFILE_CHUNK_SIZE];
            loop {
                let n = file.read(&mut chunk)?;
                if n == 0 {
                    break;
                }
                conn.framer.write_packet(&chunk[..n])?;
            }
            conn.framer.write_packet(&[])?;

            let final_frame = conn.framer.read_packet()?;
            match decode_command_response(&final_frame)? {
                CommandResponse::Ok(ok) => Ok(QueryResult::Update {
                    affected_rows: ok.affected_rows,
                    warnings: ok.warnings,
                    message: ok.message,
                    insert_id: ok.last_insert_id,
                }),
                CommandResponse::Err(err) => Err(err.into()),
                CommandResponse::ResultSetHeader(field_count) => read_result_set(conn, field_count as usize),
                CommandResponse::LocalInfileRequest(_) => {
                    Err(Error::protocol("server sent a second LOCAL INFILE request"))
                }
            }
        }
        CommandResponse::Ok(ok) => Ok(QueryResult::Update {
            affected_rows: ok.affected_rows,
            warnings: ok.warnings,
            message: ok.message,
            insert_id: ok.last_insert_id,
        }),
        CommandResponse::Err(err) => Err(err.into()),
        CommandResponse::ResultSetHeader(field_count) => read_result_set(conn, field_count as usize),
    }
}

fn run_ping<S: Read + Write>(conn: &mut Connection<S>) -> Result<bool> {
    conn.framer.reset_sequence();
    conn.framer.write_packet(&client::encode_com_ping())?;
    let reply = conn.framer.read_packet()?;
    match decode_command_response(&reply)? {
        CommandResponse::Ok(_) => Ok(true),
        CommandResponse::Err(err) => Err(err.into()),
        _ => Err(Error::protocol("unexpected reply to COM_PING")),
    }
}

fn run_select_db<S: Read + Write>(conn: &mut Connection<S>, name: &str) -> Result<()> {
    conn.framer.reset_sequence();
    conn.framer.write_packet(&client::encode_com_init_db(name))?;
    let reply = conn.framer.read_packet()?;
    match decode_command_response(&reply)? {
        CommandResponse::Ok(_) => {
            conn.database = Some(name.to_owned());
            Ok(())
        }
        CommandResponse::Err(err) => Err(err.into()),
        _ => Err(Error::protocol("unexpected reply to COM_INIT_DB")),
    }
}

/// Spec §4.5: read column definitions, discard the intermediate EOF, then
/// read rows until the terminating EOF/Error, concatenating any row frame
/// whose physical length hits the 16 MiB − 1 frame boundary.
fn read_result_set<S: Read + Write>(conn: &mut Connection<S>, field_count: usize) -> Result<QueryResult> {
    let mut columns = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        let frame = conn.framer.read_packet()?;
        if let Some(err) = decode_err_if_present(&frame)? {
            return Err(err.into());
        }
        columns.push(decode_column_definition(&frame)?);
    }
    let _intermediate_eof = conn.framer.read_packet()?;
    let columns = Rc::new(columns);

    let mut rows = Vec::new();
    let warnings = loop {
        let frame = read_possibly_multipacket_row(conn)?;
        match decode_row_or_terminator(&frame, field_count)? {
            RowOrTerminator::Row(values) => rows.push(Row { columns: columns.clone(), values }),
            RowOrTerminator::Eof(eof) => break eof.warnings,
            RowOrTerminator::Err(err) => return Err(err.into()),
        }
    };

    debug!("result set: {} columns, {} rows", columns.len(), rows.len());
    Ok(QueryResult::ResultSet(ResultSet { columns, rows, warnings }))
}

fn read_possibly_multipacket_row<S: Read + Write>(conn: &mut Connection<S>) -> Result<Bytes> {
    use super::framer::MAX_PAYLOAD_LEN;

    let first = conn.framer.read_packet()?;
    if first.len() < MAX_PAYLOAD_LEN {
        return Ok(first);
    }

    let mut buf = BytesMut::from(&first[..]);
    loop {
        let next = conn.framer.read_packet()?;
        let next_len = next.len();
        buf.extend_from_slice(&next);
        if next_len < MAX_PAYLOAD_LEN {
            break;
        }
    }
    Ok(buf.freeze())
}

/// A lazily-driven sequence of raw binlog event frames (spec §4.7, Open
/// Question #2). Borrows the connection exclusively, matching the
/// half-duplex scheduling model (spec §5): no other command can be issued
/// while a dump is in progress.
pub struct BinlogStream<'a, S> {
    conn: &'a mut Connection<S>,
    done: bool,
}

impl<'a, S: Read + Write> Iterator for BinlogStream<'a, S> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Result<Bytes>> {
        if self.done {
            return None;
        }

        match self.conn.framer.read_packet() {
            Ok(frame) if is_eof_marker(&frame) => {
                self.done = true;
                None
            }
            Ok(frame) if frame.first() == Some(&0xFF) => {
                self.done = true;
                self.conn.connected = false;
                Some(Err(Error::binlog_dump(format!("server sent an error frame mid-dump: {:?}", &frame[..]))))
            }
            Ok(frame) => Some(Ok(frame)),
            Err(err) => {
                self.done = true;
                self.conn.connected = false;
                Some(Err(Error::binlog_dump(err.to_string())))
            }
        }
    }
}

fn is_eof_marker(payload: &[u8]) -> bool {
    payload.first() == Some(&0xFE) && payload.len() < 9
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::duplex_connection;

    #[test]
    fn it_decodes_an_update_result() {
        // OK payload: affected_rows=3, insert_id=0, status=0x0002, warnings=0.
        let payload = [0x00, 0x03, 0x00, 0x02, 0x00, 0x00, 0x00];
        // Frame header: length=7, sequence=1 (the query itself was sequence 0).
        let mut reply = vec![payload.len() as u8, 0x00, 0x00, 0x01];
        reply.extend_from_slice(&payload);
        let mut conn = duplex_connection(&reply);
        match conn.query("UPDATE t SET x=1").unwrap() {
            QueryResult::Update { affected_rows, insert_id, warnings, .. } => {
                assert_eq!(affected_rows, 3);
                assert_eq!(insert_id, 0);
                assert_eq!(warnings, 0);
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn it_poisons_the_connection_on_protocol_error() {
        let mut conn = duplex_connection(&[]);
        assert!(conn.ping().is_err());
        assert!(conn.is_closed());
        assert!(matches!(conn.ping(), Err(Error::Transport(_))));
    }
}
