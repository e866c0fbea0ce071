pub mod keys;
pub mod password;
pub mod tokens;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

/// Fingerprint used for refresh tokens and one-time codes:
/// base64url (no padding) of the SHA-256 of the plaintext.
pub fn sha256_base64url(plain: &str) -> String {
    let sum = Sha256::digest(plain.as_bytes());
    URL_SAFE_NO_PAD.encode(sum)
}

/// Random alphanumeric one-time code.
pub fn generate_code(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_padding_free() {
        let a = sha256_base64url("some-opaque-value");
        let b = sha256_base64url("some-opaque-value");
        assert_eq!(a, b);
        // 32 bytes → 43 base64url chars, no '=' padding
        assert_eq!(a.len(), 43);
        assert!(!a.contains('='));
    }

    #[test]
    fn fingerprint_differs_per_input() {
        assert_ne!(sha256_base64url("a"), sha256_base64url("b"));
    }

    #[test]
    fn generated_codes_have_requested_length() {
        let code = generate_code(10);
        assert_eq!(code.len(), 10);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
