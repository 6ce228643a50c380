//! Request signature verification.
//!
//! Clients sign every request with the per-key signing secret:
//!
//! ```text
//! message   = timestamp + "\n" + hex(sha256(raw_body))
//! signature = hex(hmac_sha256(key = signing_secret, message))
//! ```
//!
//! and send `X-MCP-Timestamp: <unix seconds>` and
//! `X-MCP-Signature: <signature>`.
//!
//! The timestamp bounds how long a captured request stays valid but does not
//! by itself stop a replay inside that window; see the replay guard in the
//! security middleware.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::crypto;
use crate::models::principal::Principal;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "X-MCP-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-MCP-Signature";

pub struct SignatureVerifier {
    max_skew_seconds: u64,
}

impl SignatureVerifier {
    pub fn new(max_skew_seconds: u64) -> Self {
        Self { max_skew_seconds }
    }

    pub fn max_skew_seconds(&self) -> u64 {
        self.max_skew_seconds
    }

    pub fn verify(
        &self,
        principal: &Principal,
        raw_body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> bool {
        self.verify_at(principal, raw_body, timestamp, signature, Utc::now().timestamp())
    }

    /// Verify a request as of `now` (unix seconds).
    ///
    /// # Rejects
    ///
    /// - Missing or empty headers
    /// - A timestamp that is not a non-negative integer
    /// - `|now - timestamp| > max_skew_seconds`
    /// - A principal without a signing secret
    /// - A signature that does not match, compared in constant time,
    ///   case-insensitively, ignoring surrounding whitespace
    pub fn verify_at(
        &self,
        principal: &Principal,
        raw_body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now: i64,
    ) -> bool {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return false;
        };
        let timestamp = timestamp.trim();
        let signature = signature.trim();
        if timestamp.is_empty() || signature.is_empty() {
            return false;
        }

        let Some(ts) = parse_timestamp(timestamp) else {
            return false;
        };
        if now.abs_diff(ts) > self.max_skew_seconds {
            return false;
        }

        let Some(secret) = principal.signing_secret.as_ref() else {
            return false;
        };

        let Some(expected) = compute_signature(secret.expose(), timestamp, raw_body) else {
            return false;
        };

        let provided = signature.to_ascii_lowercase();
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }
}

/// Parse a unix timestamp made only of ASCII digits.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok()
}

fn compute_signature(secret: &str, timestamp: &str, raw_body: &[u8]) -> Option<String> {
    let message = format!("{timestamp}\n{}", crypto::sha256_hex(raw_body));
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Produce the `X-MCP-Signature` value a client sends for `raw_body`.
pub fn sign(secret: &str, timestamp: i64, raw_body: &[u8]) -> String {
    compute_signature(secret, &timestamp.to_string(), raw_body)
        .expect("HMAC key length is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api_key::{Scopes, SigningSecret};

    const SECRET: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";
    const BODY: &[u8] = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
    const T: i64 = 1_700_000_000;
    const SKEW: u64 = 300;

    fn principal(secret: Option<&str>) -> Principal {
        Principal {
            api_key_id: 1,
            name: "client".to_string(),
            scopes: Scopes::default(),
            signing_secret: secret.map(|s| SigningSecret::new(s.to_string())),
        }
    }

    fn check(sig: &str, ts: &str, body: &[u8], now: i64) -> bool {
        SignatureVerifier::new(SKEW).verify_at(&principal(Some(SECRET)), body, Some(ts), Some(sig), now)
    }

    #[test]
    fn message_format_matches_known_vector() {
        // message = "1700000000\n" + sha256("") hex
        let message = format!(
            "{T}\ne3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(sign(SECRET, T, b""), expected);
    }

    #[test]
    fn accepts_within_skew_window() {
        let sig = sign(SECRET, T, BODY);
        let ts = T.to_string();
        assert!(check(&sig, &ts, BODY, T));
        assert!(check(&sig, &ts, BODY, T + SKEW as i64 - 1));
        assert!(check(&sig, &ts, BODY, T + SKEW as i64));
        assert!(check(&sig, &ts, BODY, T - SKEW as i64 + 1));
    }

    #[test]
    fn rejects_outside_skew_window() {
        let sig = sign(SECRET, T, BODY);
        let ts = T.to_string();
        assert!(!check(&sig, &ts, BODY, T + SKEW as i64 + 1));
        assert!(!check(&sig, &ts, BODY, T - SKEW as i64 - 1));
    }

    #[test]
    fn rejects_altered_body() {
        let sig = sign(SECRET, T, BODY);
        assert!(!check(&sig, &T.to_string(), br#"{"jsonrpc":"2.0","id":2}"#, T));
    }

    #[test]
    fn rejects_wrong_signature_value() {
        let sig = sign(SECRET, T, BODY);
        let mut wrong = sig.clone().into_bytes();
        let last = wrong.len() - 1;
        wrong[last] = if wrong[last] == b'0' { b'1' } else { b'0' };
        let wrong = String::from_utf8(wrong).unwrap();

        assert!(!check(&wrong, &T.to_string(), BODY, T));
        assert!(!check(&sig[..sig.len() - 2], &T.to_string(), BODY, T));
        assert!(!check(&sign("other-secret", T, BODY), &T.to_string(), BODY, T));
    }

    #[test]
    fn signature_is_bound_to_timestamp() {
        let sig = sign(SECRET, T, BODY);
        assert!(!check(&sig, &(T + 1).to_string(), BODY, T));
    }

    #[test]
    fn hex_case_and_whitespace_are_ignored() {
        let sig = sign(SECRET, T, BODY);
        let padded = format!("  {}\t", sig.to_uppercase());
        assert!(check(&padded, &format!(" {T} "), BODY, T));
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        let verifier = SignatureVerifier::new(SKEW);
        let p = principal(Some(SECRET));
        let sig = sign(SECRET, T, BODY);
        let ts = T.to_string();

        assert!(!verifier.verify_at(&p, BODY, None, Some(&sig), T));
        assert!(!verifier.verify_at(&p, BODY, Some(&ts), None, T));
        assert!(!verifier.verify_at(&p, BODY, Some(""), Some(&sig), T));
        assert!(!verifier.verify_at(&p, BODY, Some(&ts), Some(" "), T));

        for bad in ["-1700000000", "1700000000.5", "17e8", "abc", "+1700000000", "99999999999999999999"] {
            assert!(!verifier.verify_at(&p, BODY, Some(bad), Some(&sig), T), "{bad}");
        }
    }

    #[test]
    fn rejects_principal_without_secret() {
        let sig = sign(SECRET, T, BODY);
        assert!(!SignatureVerifier::new(SKEW).verify_at(
            &principal(None),
            BODY,
            Some(&T.to_string()),
            Some(&sig),
            T
        ));
    }

    #[test]
    fn timestamp_parsing() {
        assert_eq!(parse_timestamp("0"), Some(0));
        assert_eq!(parse_timestamp("1700000000"), Some(T));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("-5"), None);
        assert_eq!(parse_timestamp(" 5"), None);
    }
}
