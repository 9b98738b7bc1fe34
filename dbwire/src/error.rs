//! Error taxonomy (spec §7). `Transport` and `Protocol` poison the
//! connection; `Query` does not.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket open/read/write/close failure. SQLSTATE "08000"-class.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Server-sent Error packet. Does not poison the connection.
    #[error("{message} (error {error_number}, sqlstate {sql_state})")]
    Query { message: String, error_number: u16, sql_state: String },

    /// Unexpected packet type, malformed length, bad sequence number.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport failure during a binlog dump stream.
    #[error("binlog dump error: {0}")]
    BinlogDump(String),

    /// `getServerVariable` found no matching column.
    #[error("column not found: {0}")]
    ColumnLookup(String),
}

impl Error {
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }

    pub fn binlog_dump(message: impl Into<String>) -> Self {
        Error::BinlogDump(message.into())
    }

    pub fn column_lookup(name: impl fmt::Display) -> Self {
        Error::ColumnLookup(name.to_string())
    }

    /// Errors that must poison the connection per spec §7's propagation policy.
    pub fn poisons_connection(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Protocol(_))
    }
}
