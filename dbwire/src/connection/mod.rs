//! The connection (spec §3, §6): owns the one TCP socket, the framer, and
//! all mutable session state. Single-threaded, half-duplex, synchronous —
//! no internal thread, no background reader (spec §5).

mod auth;
mod establish;
mod executor;
pub mod framer;
mod result;

pub use executor::BinlogStream;
pub use result::{QueryResult, ResultSet, Row};

use crate::error::{Error, Result};
use crate::protocol::capabilities::Capabilities;
use crate::protocol::packet::client;
use dbwire_core::{Config, ConnectOptions, DatabaseType};
use framer::Framer;
use log::info;
use std::io::{Read, Write};
use std::net::TcpStream;

pub struct Connection<S> {
    framer: Framer<S>,
    host: String,
    port: u16,
    username: String,
    password: String,
    database: Option<String>,
    server_version: String,
    connection_id: u32,
    server_capabilities: Capabilities,
    client_capabilities: Capabilities,
    connected: bool,
    read_only: bool,
    batch: Vec<String>,
    config: Config,
}

impl Connection<TcpStream> {
    /// Open a TCP socket and complete the handshake before returning
    /// (spec §3: "created via connect, which must complete the handshake
    /// before returning").
    pub fn connect(options: ConnectOptions<'_>) -> Result<Self> {
        let stream = TcpStream::connect((options.host, options.port))?;
        let conn = Connection::establish_on(stream, options)?;
        info!("connected to {}:{} (connection_id={})", conn.host, conn.port, conn.connection_id);
        Ok(conn)
    }
}

impl<S: Read + Write> Connection<S> {
    /// Run the handshake over an already-open stream. Exposed so tests can
    /// drive it over an in-memory duplex instead of a real socket.
    pub fn establish_on(stream: S, options: ConnectOptions<'_>) -> Result<Self> {
        establish::establish(stream, options)
    }

    fn guard_usable(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::Transport(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "connection is closed or poisoned",
            )))
        }
    }

    fn poison_on_error<T>(&mut self, result: &Result<T>) {
        if let Err(err) = result {
            if err.poisons_connection() {
                self.connected = false;
            }
        }
    }

    /// `close` (spec §4.4): sends the Close command (no reply expected) and
    /// tears the connection down; it is single-use afterward.
    pub fn close(&mut self) -> Result<()> {
        self.guard_usable()?;
        self.framer.reset_sequence();
        let result = self.framer.write_packet(&client::encode_com_quit());
        self.connected = false;
        result
    }

    pub fn add_to_batch(&mut self, query: impl Into<String>) {
        self.batch.push(query.into());
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// `executeBatch` (spec §4.8): issues each pending query in order,
    /// clearing the queue regardless of outcome; the first `QueryError`
    /// aborts and discards any results already produced.
    pub fn execute_batch(&mut self) -> Result<Vec<QueryResult>> {
        let queries = std::mem::take(&mut self.batch);
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(self.query(&query)?);
        }
        Ok(results)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.query("COMMIT").map(|_| ())
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.query("ROLLBACK").map(|_| ())
    }

    pub fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.query(&format!("ROLLBACK TO {name}")).map(|_| ())
    }

    pub fn set_savepoint(&mut self, name: &str) -> Result<()> {
        self.query(&format!("SAVEPOINT {name}")).map(|_| ())
    }

    pub fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.query(&format!("RELEASE SAVEPOINT {name}")).map(|_| ())
    }

    /// `getServerVariable(name)` (spec §4.9): `SELECT @@name`, expecting
    /// exactly one row and one column.
    pub fn get_server_variable(&mut self, name: &str) -> Result<Option<bytes::Bytes>> {
        let result = self.query(&format!("SELECT @@{name}"))?;
        let result_set = result.into_result_set().ok_or_else(|| Error::column_lookup(name))?;
        let row = result_set.rows.first().ok_or_else(|| Error::column_lookup(name))?;
        Ok(row.get(0).map(bytes::Bytes::copy_from_slice))
    }

    /// `getDatabaseType()` (spec §4.10).
    pub fn get_database_type(&self) -> DatabaseType {
        DatabaseType::from_version_string(&self.server_version)
    }

    pub fn supports_pbms(&self) -> bool {
        self.config.enable_blob_streaming
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_closed(&self) -> bool {
        !self.connected
    }

    pub fn server_capabilities(&self) -> Capabilities {
        self.server_capabilities
    }

    pub fn client_capabilities(&self) -> Capabilities {
        self.client_capabilities
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) struct Duplex {
        pub(crate) input: Cursor<Vec<u8>>,
        pub(crate) output: Vec<u8>,
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

    /// Build a connection whose framer reads from `reply_bytes` and is
    /// already marked authenticated, skipping the handshake — useful for
    /// unit-testing individual commands in isolation.
    pub(crate) fn duplex_connection(reply_bytes: &[u8]) -> Connection<Duplex> {
        Connection {
            framer: Framer::new(Duplex { input: Cursor::new(reply_bytes.to_vec()), output: Vec::new() }),
            host: "localhost".to_owned(),
            port: 3306,
            username: "root".to_owned(),
            password: String::new(),
            database: None,
            server_version: "5.5.5-10.4.6-MariaDB".to_owned(),
            connection_id: 1,
            server_capabilities: Capabilities::all(),
            client_capabilities: Capabilities::all(),
            connected: true,
            read_only: false,
            batch: Vec::new(),
            config: Config::default(),
        }
    }

    #[test]
    fn it_reports_closed_after_close() {
        let mut conn = duplex_connection(&[]);
        assert!(!conn.is_closed());
        conn.close().unwrap();
        assert!(conn.is_closed());
        assert!(matches!(conn.close(), Err(Error::Transport(_))));
    }

    #[test]
    fn it_clears_the_batch_queue_even_on_failure() {
        let mut conn = duplex_connection(&[]);
        conn.add_to_batch("SELECT 1");
        conn.add_to_batch("SELECT 2");
        assert!(conn.execute_batch().is_err());
        assert_eq!(conn.batch.len(), 0);
    }
}
