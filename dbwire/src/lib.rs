//! Client-side MySQL wire protocol driver core.
//!
//! Owns a single TCP connection to a MySQL-compatible server: the initial
//! handshake and authentication, then textual SQL queries, result-set
//! decoding, `LOAD DATA LOCAL INFILE` uploads, binlog replication streams
//! and connection-lifecycle commands, all multiplexed over that one
//! connection. Single-threaded and half-duplex by design — see
//! [`connection`] for the scheduling model.

#[macro_use]
extern crate bitflags;

pub mod connection;
pub mod error;
pub mod protocol;

pub use connection::{BinlogStream, Connection, QueryResult, ResultSet, Row};
pub use error::{Error, Result};
pub use protocol::Capabilities;

pub use dbwire_core::{Config, ConnectOptions, DatabaseType};
