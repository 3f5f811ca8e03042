//! Payload encryption for the shared-secret signing scheme.
//!
//! The request body is serialized to JSON and encrypted with AES-256 in OFB mode.
//! The key is the shared secret padded with zero bytes (or truncated) to 32 bytes.
//! A fresh random IV is drawn per request and sent in front of the ciphertext, and
//! the whole token is Base64 encoded.

use crate::Result;
use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ipam_core::Error;
use ofb::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::fmt;

type Aes256Ofb = ofb::Ofb<Aes256>;

/// AES-256 key size in bytes
pub const KEY_LEN: usize = 32;

/// IV size in bytes
pub const IV_LEN: usize = 16;

/// Encrypts request payloads with a shared secret.
pub struct SharedSecretCipher {
    key: [u8; KEY_LEN],
}

impl SharedSecretCipher {
    /// Derives the cipher key from the shared secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let mut key = [0u8; KEY_LEN];
        let bytes = secret.expose_secret().as_bytes();
        let len = bytes.len().min(KEY_LEN);
        key[..len].copy_from_slice(&bytes[..len]);
        Self { key }
    }

    /// Encrypts raw bytes and returns `base64(iv || ciphertext)`.
    ///
    /// # Errors
    ///
    /// Returns a crypto error if the cipher cannot be initialized.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let mut cipher = Aes256Ofb::new_from_slices(&self.key, &iv)
            .map_err(|e| Error::CryptoError(format!("Failed to initialize cipher: {e}")))?;

        let mut token = Vec::with_capacity(IV_LEN + plaintext.len());
        token.extend_from_slice(&iv);
        token.extend_from_slice(plaintext);
        cipher.apply_keystream(&mut token[IV_LEN..]);

        Ok(STANDARD.encode(token))
    }

    /// Serializes a JSON object and encrypts it.
    ///
    /// # Errors
    ///
    /// Returns a crypto error if the cipher cannot be initialized.
    pub fn encrypt_json(&self, payload: &Map<String, Value>) -> Result<String> {
        let plaintext = serde_json::to_vec(payload)?;
        self.encrypt(&plaintext)
    }

    /// Reverses [`Self::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns a crypto error if the token is not Base64 or is shorter than an IV.
    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>> {
        let raw = STANDARD
            .decode(token)
            .map_err(|e| Error::CryptoError(format!("Invalid payload encoding: {e}")))?;
        if raw.len() < IV_LEN {
            return Err(Error::CryptoError("Payload shorter than IV".to_string()));
        }

        let (iv, ciphertext) = raw.split_at(IV_LEN);
        let mut cipher = Aes256Ofb::new_from_slices(&self.key, iv)
            .map_err(|e| Error::CryptoError(format!("Failed to initialize cipher: {e}")))?;

        let mut plaintext = ciphertext.to_vec();
        cipher.apply_keystream(&mut plaintext);
        Ok(plaintext)
    }
}

impl fmt::Debug for SharedSecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecretCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cipher(secret: &str) -> SharedSecretCipher {
        SharedSecretCipher::new(&SecretString::from(secret.to_string()))
    }

    #[test]
    fn key_is_zero_padded_and_truncated() {
        let short = cipher("abc");
        assert_eq!(&short.key[..3], b"abc");
        assert!(short.key[3..].iter().all(|b| *b == 0));

        let long = cipher("0123456789abcdef0123456789abcdefEXTRA");
        assert_eq!(&long.key, b"0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn random_iv_makes_tokens_differ() {
        let cipher = cipher("0123456789abcdef0123456789abcdef");
        let payload = json!({"controller": "sections", "id": 3});
        let map = payload.as_object().unwrap();

        let first = cipher.encrypt_json(map).unwrap();
        let second = cipher.encrypt_json(map).unwrap();
        assert_ne!(first, second);

        let first_plain: Value = serde_json::from_slice(&cipher.decrypt(&first).unwrap()).unwrap();
        let second_plain: Value =
            serde_json::from_slice(&cipher.decrypt(&second).unwrap()).unwrap();
        assert_eq!(first_plain, payload);
        assert_eq!(second_plain, payload);
    }

    #[test]
    fn token_carries_iv_prefix() {
        let cipher = cipher("secret");
        let token = cipher.encrypt(b"hello").unwrap();
        let raw = STANDARD.decode(token).unwrap();
        assert_eq!(raw.len(), IV_LEN + 5);
    }

    #[test]
    fn wrong_key_does_not_decrypt() {
        let token = cipher("right").encrypt(b"{\"a\":1}").unwrap();
        let plain = cipher("wrong").decrypt(&token).unwrap();
        assert_ne!(plain, b"{\"a\":1}");
    }

    #[test]
    fn decrypt_rejects_short_or_invalid_tokens() {
        let cipher = cipher("secret");
        assert!(matches!(
            cipher.decrypt("not base64!"),
            Err(Error::CryptoError(_))
        ));
        assert!(matches!(
            cipher.decrypt(&STANDARD.encode([1u8, 2, 3])),
            Err(Error::CryptoError(_))
        ));
    }

    #[test]
    fn debug_hides_key() {
        let debug = format!("{:?}", cipher("hunter2"));
        assert!(!debug.contains("hunter2"));
    }
}
