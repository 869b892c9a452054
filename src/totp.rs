// 5.0 totp.rs: RFC 6238 time-based one-time passwords for the APP 2FA method.
// HMAC-SHA1, 6 digits, 30-second steps; verification tolerates clock drift of
// a few steps either side. secrets are random bytes, exposed as base32 for
// authenticator-app provisioning.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const SECRET_LEN: usize = 20;
const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

pub fn generate_secret() -> Vec<u8> {
    let mut secret = vec![0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

/// HOTP dynamic truncation (RFC 4226 §5.3) over a 64-bit counter.
fn hotp(secret: &[u8], counter: u64, digits: u32) -> String {
    let mut mac = HmacSha1::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((u32::from(digest[offset]) & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    let modulus = 10u32.pow(digits);
    format!("{:0width$}", binary % modulus, width = digits as usize)
}

/// Code for the step containing `unix_secs`.
pub fn code_at(secret: &[u8], unix_secs: i64, step_secs: u64, digits: u32) -> String {
    let counter = (unix_secs.max(0) as u64) / step_secs;
    hotp(secret, counter, digits)
}

/// Accepts the current step and up to `drift_steps` either side.
pub fn verify(
    secret: &[u8],
    code: &str,
    unix_secs: i64,
    step_secs: u64,
    drift_steps: u64,
    digits: u32,
) -> bool {
    if code.len() != digits as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let current = (unix_secs.max(0) as u64) / step_secs;
    let low = current.saturating_sub(drift_steps);
    let high = current + drift_steps;
    (low..=high).any(|counter| hotp(secret, counter, digits) == code)
}

/// RFC 4648 base32, no padding. What authenticator apps expect in the
/// provisioning URI.
pub fn secret_to_base32(secret: &[u8]) -> String {
    let mut out = String::with_capacity((secret.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &byte in secret {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize]));
        }
    }
    if bits > 0 {
        out.push(char::from(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize]));
    }
    out
}

pub fn secret_from_base32(encoded: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for c in encoded.trim_end_matches('=').bytes() {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&a| a == c.to_ascii_uppercase())? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B test vectors use the 20-byte ASCII secret below
    // with 8 digits; we check the documented values.
    const RFC_SECRET: &[u8] = b"12345678901234567890";

    #[test]
    fn rfc6238_vectors() {
        assert_eq!(code_at(RFC_SECRET, 59, 30, 8), "94287082");
        assert_eq!(code_at(RFC_SECRET, 1111111109, 30, 8), "07081804");
        assert_eq!(code_at(RFC_SECRET, 20000000000, 30, 8), "65353130");
    }

    #[test]
    fn verify_accepts_drift() {
        let secret = generate_secret();
        let now = 1_700_000_000i64;
        let previous_step = code_at(&secret, now - 30, 30, 6);
        assert!(verify(&secret, &previous_step, now, 30, 2, 6));
        let far_past = code_at(&secret, now - 120, 30, 6);
        // 4 steps back is outside a ±2 window unless codes collide
        let in_window = code_at(&secret, now - 60, 30, 6);
        assert!(verify(&secret, &in_window, now, 30, 2, 6));
        if far_past != code_at(&secret, now, 30, 6)
            && far_past != code_at(&secret, now - 30, 30, 6)
            && far_past != code_at(&secret, now - 60, 30, 6)
        {
            assert!(!verify(&secret, &far_past, now, 30, 1, 6));
        }
    }

    #[test]
    fn verify_rejects_malformed() {
        let secret = generate_secret();
        assert!(!verify(&secret, "12345", 0, 30, 2, 6));
        assert!(!verify(&secret, "12345a", 0, 30, 2, 6));
        assert!(!verify(&secret, "", 0, 30, 2, 6));
    }

    #[test]
    fn base32_round_trip() {
        let secret = generate_secret();
        let encoded = secret_to_base32(&secret);
        assert!(encoded.bytes().all(|b| BASE32_ALPHABET.contains(&b)));
        assert_eq!(secret_from_base32(&encoded).unwrap(), secret);
    }

    #[test]
    fn base32_known_value() {
        // "Hello" -> JBSWY3DP
        assert_eq!(secret_to_base32(b"Hello"), "JBSWY3DP");
        assert_eq!(secret_from_base32("JBSWY3DP").unwrap(), b"Hello");
    }
}
