//! AES-256-GCM string encryption bound to the application secret

use crate::error::{Error, Result};
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prefix marking a secret that already is a base64-encoded 32-byte key
pub const RAW_KEY_PREFIX: &str = "base64:";

/// Encrypted value as persisted (before the outer base64 wrapping)
#[derive(Debug, Serialize, Deserialize)]
struct EncryptedPayload {
    /// Base64-encoded nonce
    nonce: String,
    /// Base64-encoded ciphertext (includes the GCM tag)
    ciphertext: String,
}

/// Encrypts and decrypts individual strings
///
/// Each call uses a fresh random nonce, so encrypting the same plaintext twice
/// yields different ciphertexts. The output is a single base64 string safe to
/// store in JSON documents and text columns.
pub struct Encrypter {
    cipher: Aes256Gcm,
}

impl Encrypter {
    /// Create an encrypter from a raw 32-byte key
    ///
    /// # Errors
    /// Returns an error if the key length is invalid.
    pub fn new(key: &[u8; 32]) -> Result<Self> {
        Ok(Self {
            cipher: Aes256Gcm::new_from_slice(key)
                .map_err(|_| Error::Encryption("Invalid key length".into()))?,
        })
    }

    /// Create an encrypter from the application secret
    ///
    /// A secret of the form `base64:<key>` is decoded and must be exactly 32
    /// bytes. Any other non-empty secret is hashed with SHA-256 into the key.
    ///
    /// # Errors
    /// Returns an error for an empty secret or a malformed `base64:` key.
    pub fn from_secret(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Config("Application key must not be empty".into()));
        }

        let key: [u8; 32] = match secret.strip_prefix(RAW_KEY_PREFIX) {
            Some(encoded) => {
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| Error::Config(format!("Invalid base64 application key: {e}")))?;
                bytes.try_into().map_err(|bytes: Vec<u8>| {
                    Error::Config(format!(
                        "Invalid application key length: expected 32 bytes, got {}",
                        bytes.len()
                    ))
                })?
            }
            None => Sha256::digest(secret.as_bytes()).into(),
        };

        Self::new(&key)
    }

    /// Generate a random application secret in `base64:` form
    #[must_use]
    pub fn generate_secret() -> String {
        let key: [u8; 32] = rand::rng().random();
        format!("{RAW_KEY_PREFIX}{}", STANDARD.encode(key))
    }

    /// Encrypt a string into its stored form
    pub fn encrypt_string(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; 12] = rand::rng().random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| Error::Encryption(format!("Encryption failed: {e}")))?;

        let payload = EncryptedPayload {
            nonce: STANDARD.encode(nonce_bytes),
            ciphertext: STANDARD.encode(ciphertext),
        };
        Ok(STANDARD.encode(serde_json::to_vec(&payload)?))
    }

    /// Decrypt a stored string
    ///
    /// # Errors
    /// Returns [`Error::Encryption`] when the input is not a payload produced
    /// by [`encrypt_string`](Self::encrypt_string) with the same key.
    pub fn decrypt_string(&self, stored: &str) -> Result<String> {
        let outer = STANDARD
            .decode(stored)
            .map_err(|e| Error::Encryption(format!("Payload is not base64: {e}")))?;
        let payload: EncryptedPayload = serde_json::from_slice(&outer)
            .map_err(|e| Error::Encryption(format!("Payload is not an encrypted value: {e}")))?;

        let nonce_bytes = STANDARD
            .decode(&payload.nonce)
            .map_err(|e| Error::Encryption(format!("Invalid nonce: {e}")))?;
        if nonce_bytes.len() != 12 {
            return Err(Error::Encryption(format!(
                "Invalid nonce length: expected 12, got {}",
                nonce_bytes.len()
            )));
        }
        let ciphertext = STANDARD
            .decode(&payload.ciphertext)
            .map_err(|e| Error::Encryption(format!("Invalid ciphertext: {e}")))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| Error::Encryption("Decryption failed (wrong key?)".into()))?;

        String::from_utf8(plaintext).map_err(|e| Error::Encryption(format!("Invalid UTF-8: {e}")))
    }
}

impl std::fmt::Debug for Encrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encrypter").field("key", &"<redacted>").finish()
    }
}
