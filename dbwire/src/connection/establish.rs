//! The handshake engine (spec §4.3): reads the greeting, negotiates
//! capabilities, computes the native-password response and validates the
//! server's OK/Error reply.

use super::auth::native_password_response;
use super::framer::Framer;
use super::Connection;
use crate::error::{Error, Result};
use crate::protocol::capabilities::{Capabilities, CLIENT_BASE_CAPABILITIES};
use crate::protocol::packet::{client, decode_command_response, decode_greeting, CommandResponse};
use dbwire_core::ConnectOptions;
use log::{debug, warn};
use std::io::{Read, Write};

pub(super) fn establish<S: Read + Write>(stream: S, options: ConnectOptions<'_>) -> Result<Connection<S>> {
    let mut framer = Framer::new(stream);

    let greeting_frame = framer.read_packet()?;
    let greeting = decode_greeting(&greeting_frame)?;
    debug!("server greeting: version={} connection_id={}", greeting.server_version, greeting.connection_id);

    // Open Question #3: fail fast if the server cannot speak the protocol
    // version this core assumes.
    if !greeting.server_capabilities.contains(Capabilities::CLIENT_PROTOCOL_41) {
        warn!("server does not advertise CLIENT_PROTOCOL_41; aborting handshake");
        return Err(Error::protocol("server does not advertise CLIENT_PROTOCOL_41"));
    }

    let database = options.database.map(str::to_owned);
    let username = options.user.unwrap_or("").to_owned();
    let password = options.password.unwrap_or("").to_owned();

    let mut capabilities = CLIENT_BASE_CAPABILITIES;
    let request_db_at_handshake = database.is_some() && !options.config.create_db;
    if request_db_at_handshake {
        capabilities |= Capabilities::CONNECT_WITH_DB;
    }

    let auth_response = native_password_response(&password, &greeting.seed);
    let handshake_response =
        client::encode_handshake_response(capabilities, &username, &auth_response, database.as_deref());
    framer.write_packet(&handshake_response)?;

    let reply = framer.read_packet()?;
    let authenticated = match decode_command_response(&reply)? {
        CommandResponse::Ok(_) => true,
        CommandResponse::Err(err) => return Err(err.into()),
        _ => return Err(Error::protocol("unexpected reply to handshake response")),
    };

    let mut conn = Connection {
        framer,
        host: options.host.to_owned(),
        port: options.port,
        username,
        password,
        database,
        server_version: greeting.server_version,
        connection_id: greeting.connection_id,
        server_capabilities: greeting.server_capabilities,
        client_capabilities: capabilities,
        connected: authenticated,
        read_only: false,
        batch: Vec::new(),
        config: options.config,
    };

    if options.config.create_db {
        if let Some(name) = conn.database.clone() {
            // Spec §4.3 step 7: both statements are ordinary queries over
            // COM_QUERY, not COM_INIT_DB.
            conn.query(&format!("CREATE DATABASE IF NOT EXISTS {name}"))?;
            conn.query(&format!("USE {name}"))?;
            conn.database = Some(name);
        }
    }

    Ok(conn)
}
