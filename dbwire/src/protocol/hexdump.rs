//! Diagnostic helper (spec §9 design note): a pure function from bytes to a
//! human-readable string. Not on any hot path — used by callers wiring up
//! `trace!` logging of raw frames.

pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|chunk| {
            let hex = chunk.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ");
            let ascii: String =
                chunk.iter().map(|&b| if b.is_ascii_graphic() { b as char } else { '.' }).collect();
            format!("{hex:<47}  {ascii}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_dumps_printable_bytes() {
        let dump = hex_dump(b"hi");
        assert!(dump.contains("68 69"));
        assert!(dump.ends_with("hi"));
    }

    #[test]
    fn it_replaces_non_printable_bytes_with_a_dot() {
        let dump = hex_dump(&[0x00, 0x01]);
        assert!(dump.ends_with(".."));
    }
}
