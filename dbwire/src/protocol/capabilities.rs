//! The capability bitmask negotiated during the handshake (spec §3, §4.3).

bitflags! {
    #[derive(Default)]
    pub struct Capabilities: u32 {
        const LONG_PASSWORD     = 0x0000_0001;
        const FOUND_ROWS        = 0x0000_0002;
        const LONG_FLAG         = 0x0000_0004;
        const CONNECT_WITH_DB   = 0x0000_0008;
        const NO_SCHEMA         = 0x0000_0010;
        const COMPRESS          = 0x0000_0020;
        const ODBC              = 0x0000_0040;
        const LOCAL_FILES       = 0x0000_0080;
        const IGNORE_SPACE      = 0x0000_0100;
        const CLIENT_PROTOCOL_41 = 0x0000_0200;
        const INTERACTIVE       = 0x0000_0400;
        const SSL                = 0x0000_0800;
        const IGNORE_SIGPIPE    = 0x0000_1000;
        const TRANSACTIONS      = 0x0000_2000;
        const RESERVED          = 0x0000_4000;
        const SECURE_CONNECTION = 0x0000_8000;
        const MULTI_STATEMENTS  = 0x0001_0000;
        const MULTI_RESULTS     = 0x0002_0000;
        const PS_MULTI_RESULTS  = 0x0004_0000;
        const PLUGIN_AUTH       = 0x0008_0000;
        const CONNECT_ATTRS     = 0x0010_0000;
        const PLUGIN_AUTH_LENENC_CLIENT_DATA = 0x0020_0000;
        const CLIENT_SESSION_TRACK = 0x0080_0000;
        const CLIENT_DEPRECATE_EOF = 0x0100_0000;
    }
}

/// The fixed subset the client always proposes (spec §4.3 step 3).
pub const CLIENT_BASE_CAPABILITIES: Capabilities = Capabilities::from_bits_truncate(
    Capabilities::LONG_PASSWORD.bits()
        | Capabilities::IGNORE_SPACE.bits()
        | Capabilities::CLIENT_PROTOCOL_41.bits()
        | Capabilities::TRANSACTIONS.bits()
        | Capabilities::SECURE_CONNECTION.bits()
        | Capabilities::LOCAL_FILES.bits(),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_capability_word() {
        let caps = CLIENT_BASE_CAPABILITIES | Capabilities::CONNECT_WITH_DB;
        let word = caps.bits();
        assert_eq!(Capabilities::from_bits_truncate(word), caps);
    }

    #[test]
    fn base_capabilities_do_not_request_a_database() {
        assert!(!CLIENT_BASE_CAPABILITIES.contains(Capabilities::CONNECT_WITH_DB));
    }
}
