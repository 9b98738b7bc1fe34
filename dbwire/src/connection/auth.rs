//! mysql_native_password computation (spec §4.3 step 4): the only
//! authentication method this core supports.

use sha1::{Digest, Sha1};

/// `SHA1(password) XOR SHA1(salt || SHA1(SHA1(password)))`. An empty
/// password yields a zero-length response.
pub fn native_password_response(password: &str, salt: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let stage1 = Sha1::digest(password.as_bytes());
    let stage2 = Sha1::digest(stage1);

    let mut hasher = Sha1::new();
    hasher.update(salt);
    hasher.update(stage2);
    let salted = hasher.finalize();

    stage1.iter().zip(salted.iter()).map(|(a, b)| a ^ b).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_returns_empty_response_for_empty_password() {
        assert!(native_password_response("", b"0123456789abcdefghij").is_empty());
    }

    #[test]
    fn it_computes_a_20_byte_response_for_nonempty_password() {
        let response = native_password_response("secret", b"0123456789abcdefghij");
        assert_eq!(response.len(), 20);
    }

    #[test]
    fn it_is_deterministic() {
        let a = native_password_response("secret", b"0123456789abcdefghij");
        let b = native_password_response("secret", b"0123456789abcdefghij");
        assert_eq!(a, b);
    }
}
