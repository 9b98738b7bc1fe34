//! Shared types passed into [`dbwire`](https://docs.rs/dbwire) by the embedding
//! application: connection options and the small set of recognized
//! configuration keys.

use std::collections::HashMap;

/// Parameters needed to open a connection, before any bytes cross the wire.
#[derive(Debug, Clone)]
pub struct ConnectOptions<'a> {
    pub host: &'a str,
    pub port: u16,
    pub user: Option<&'a str>,
    pub database: Option<&'a str>,
    pub password: Option<&'a str>,
    pub config: Config,
}

impl<'a> Default for ConnectOptions<'a> {
    #[inline]
    fn default() -> Self {
        Self {
            host: "localhost",
            port: 3306,
            user: None,
            database: None,
            password: None,
            config: Config::default(),
        }
    }
}

impl<'a> ConnectOptions<'a> {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn host(mut self, host: &'a str) -> Self {
        self.host = host;
        self
    }

    #[inline]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[inline]
    pub fn user(mut self, user: &'a str) -> Self {
        self.user = Some(user);
        self
    }

    #[inline]
    pub fn database(mut self, database: &'a str) -> Self {
        self.database = Some(database);
        self
    }

    #[inline]
    pub fn password(mut self, password: &'a str) -> Self {
        self.password = Some(password);
        self
    }

    #[inline]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

/// The two configuration keys the core actually recognizes (spec §6).
/// Unknown keys passed to [`Config::from_map`] are accepted and ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// `createDB=true` — create the database and `USE` it after auth instead
    /// of negotiating `CONNECT_WITH_DB`.
    pub create_db: bool,
    /// `enableBlobStreaming=true` — advertised upstream, queried via
    /// `supports_pbms`.
    pub enable_blob_streaming: bool,
}

impl Config {
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let flag = |key: &str| -> bool {
            map.get(key)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        Config { create_db: flag("createDB"), enable_blob_streaming: flag("enableBlobStreaming") }
    }
}

/// Server family, inferred from the handshake's version string (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    MySql,
    MariaDb,
    Unknown,
}

impl DatabaseType {
    pub fn from_version_string(version: &str) -> Self {
        if version.contains("MariaDB") {
            DatabaseType::MariaDb
        } else if version.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            DatabaseType::MySql
        } else {
            DatabaseType::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_default_options() {
        let opts = ConnectOptions::new();
        assert_eq!(opts.host, "localhost");
        assert_eq!(opts.port, 3306);
        assert!(opts.user.is_none());
    }

    #[test]
    fn it_reads_config_keys_case_insensitively() {
        let mut map = HashMap::new();
        map.insert("createDB".to_string(), "TRUE".to_string());
        map.insert("enableBlobStreaming".to_string(), "false".to_string());
        map.insert("unknownKey".to_string(), "true".to_string());

        let config = Config::from_map(&map);
        assert!(config.create_db);
        assert!(!config.enable_blob_streaming);
    }

    #[test]
    fn it_detects_database_type() {
        assert_eq!(
            DatabaseType::from_version_string("5.5.5-10.4.6-MariaDB-1:10.4.6+maria~bionic"),
            DatabaseType::MariaDb
        );
        assert_eq!(DatabaseType::from_version_string("8.0.32"), DatabaseType::MySql);
        assert_eq!(DatabaseType::from_version_string("weird"), DatabaseType::Unknown);
    }
}
