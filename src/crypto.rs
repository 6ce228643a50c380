//! Secret cipher and API key hashing.
//!
//! Small secrets (WordPress application passwords, request signing secrets)
//! are stored encrypted with AES-256-GCM under a key derived from the
//! deployment's `APP_SECRET`.
//!
//! # Wire Format
//!
//! ```text
//! base64( nonce (12 bytes) || auth tag (16 bytes) || ciphertext )
//! ```
//!
//! # Key Derivation
//!
//! The AES key is `SHA-256(passphrase)`: one pass, no salt, no iterations.
//! The passphrase must therefore be a high-entropy master secret unique to
//! the deployment, never a user-chosen password.

use aes_gcm::{
    Aes256Gcm, Key, Nonce, Tag,
    aead::{AeadInPlace, KeyInit},
};
use base64::{Engine as _, engine::general_purpose};
use sha2::{Digest, Sha256};

/// AES-GCM nonce length (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length (128 bits).
pub const TAG_LEN: usize = 16;

/// Errors from encrypting or decrypting a secret.
///
/// Variants carry no plaintext or key material.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Ciphertext is not valid base64")]
    InvalidEncoding,

    #[error("Ciphertext is too short ({0} bytes)")]
    TooShort(usize),

    /// Tag verification failed: tampered blob or wrong passphrase.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decrypted secret is not valid UTF-8")]
    InvalidUtf8,
}

/// Derive the 256-bit cipher key from the passphrase.
fn derive_key(passphrase: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());
    hasher.finalize().into()
}

fn cipher_for(passphrase: &str) -> Aes256Gcm {
    let key = derive_key(passphrase);
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key))
}

/// Encrypt `plaintext` under `passphrase`.
///
/// A fresh random nonce is drawn from the thread-local CSPRNG on every call,
/// so encrypting the same plaintext twice yields different blobs.
pub fn encrypt(plaintext: &str, passphrase: &str) -> Result<String, CryptoError> {
    let cipher = cipher_for(passphrase);
    let nonce_bytes: [u8; NONCE_LEN] = rand::random();

    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce_bytes), b"", &mut buffer)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + TAG_LEN + buffer.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&tag);
    blob.extend_from_slice(&buffer);

    Ok(general_purpose::STANDARD.encode(blob))
}

/// Decrypt a blob produced by [`encrypt`].
///
/// # Errors
///
/// - `InvalidEncoding`: not base64
/// - `TooShort`: fewer than 28 decoded bytes
/// - `DecryptionFailed`: tag mismatch (tampered data or wrong passphrase)
/// - `InvalidUtf8`: authenticated plaintext is not a string
pub fn decrypt(blob: &str, passphrase: &str) -> Result<String, CryptoError> {
    let raw = general_purpose::STANDARD
        .decode(blob.trim())
        .map_err(|_| CryptoError::InvalidEncoding)?;

    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::TooShort(raw.len()));
    }

    let (nonce, rest) = raw.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let mut buffer = ciphertext.to_vec();
    cipher_for(passphrase)
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            b"",
            &mut buffer,
            Tag::from_slice(tag),
        )
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(buffer).map_err(|_| CryptoError::InvalidUtf8)
}

/// SHA-256 of `data`, lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// One-way digest of a plaintext API key, used only as a lookup key.
///
/// Same scheme as the `key_hash` column: SHA-256, 64 lowercase hex chars.
pub fn hash_api_key(api_key: &str) -> String {
    sha256_hex(api_key.as_bytes())
}

/// Generate a random secret (24 bytes, 48 hex characters).
///
/// Used for issued API keys and signing secrets.
pub fn generate_secret() -> String {
    let bytes: [u8; 24] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &str = "an-app-secret-of-at-least-24-chars";

    #[test]
    fn decrypt_recovers_plaintext() {
        for plaintext in ["", "x", "wp app password 1234 abcd", "ünïcødé ✓"] {
            let blob = encrypt(plaintext, PASSPHRASE).unwrap();
            assert_eq!(decrypt(&blob, PASSPHRASE).unwrap(), plaintext);
        }
    }

    #[test]
    fn encrypt_uses_fresh_nonce_each_call() {
        let a = encrypt("same", PASSPHRASE).unwrap();
        let b = encrypt("same", PASSPHRASE).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn blob_layout_is_nonce_tag_ciphertext() {
        let blob = encrypt("hello", PASSPHRASE).unwrap();
        let raw = general_purpose::STANDARD.decode(blob).unwrap();
        assert_eq!(raw.len(), NONCE_LEN + TAG_LEN + "hello".len());
    }

    #[test]
    fn any_flipped_bit_fails_decryption() {
        let blob = encrypt("signing-secret", PASSPHRASE).unwrap();
        let raw = general_purpose::STANDARD.decode(&blob).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let encoded = general_purpose::STANDARD.encode(&tampered);
                assert!(
                    decrypt(&encoded, PASSPHRASE).is_err(),
                    "bit {bit} of byte {byte} went undetected"
                );
            }
        }
    }

    #[test]
    fn wrong_passphrase_fails() {
        let blob = encrypt("secret", PASSPHRASE).unwrap();
        assert!(matches!(
            decrypt(&blob, "another-passphrase-entirely-000"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn malformed_blobs_are_rejected() {
        assert!(matches!(
            decrypt("not base64!!", PASSPHRASE),
            Err(CryptoError::InvalidEncoding)
        ));

        let short = general_purpose::STANDARD.encode([0u8; 27]);
        assert!(matches!(
            decrypt(&short, PASSPHRASE),
            Err(CryptoError::TooShort(27))
        ));

        // Exactly nonce + tag with an empty ciphertext still needs a valid tag
        let bare = general_purpose::STANDARD.encode([0u8; 28]);
        assert!(matches!(
            decrypt(&bare, PASSPHRASE),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn api_key_hash_is_deterministic() {
        let a = hash_api_key("key-one");
        assert_eq!(a, hash_api_key("key-one"));
        assert_ne!(a, hash_api_key("key-two"));
        assert_eq!(a.len(), 64);
        assert_eq!(
            hash_api_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn generated_secrets_are_distinct_hex() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), 48);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
