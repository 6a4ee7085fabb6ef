//! Value transformation pipeline
//!
//! Converts between what the application hands to the manager and what the
//! backend stores:
//!
//! - **encrypt** on write (when an encrypter is configured)
//! - **decrypt** on read, failing open
//! - **render** arrays/objects in the configured [`ArrayFormat`] on single-key reads
//!
//! Composite values are encrypted element by element so the stored form keeps
//! its shape: an array of settings stays an array of independently
//! decryptable ciphertexts.

mod array;
#[cfg(feature = "encryption")]
mod cipher;

pub use array::{ArrayFormat, deserialize_blob};
#[cfg(feature = "encryption")]
pub use cipher::{Encrypter, RAW_KEY_PREFIX};

use crate::error::Result;
use crate::storage::Snapshot;
use log::debug;
use serde_json::Value;

/// Outcome of decrypting one stored value
///
/// Decryption never raises. When a value cannot be decrypted it is handed
/// back exactly as stored and the reason is kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum Decryption {
    /// Encryption is disabled; the value was not touched
    Skipped(Value),
    /// Every ciphertext in the value was decrypted
    Decrypted(Value),
    /// The value could not be decrypted and is returned as stored
    FailedOpen { value: Value, reason: String },
}

impl Decryption {
    /// The value to hand back to the caller
    pub fn into_value(self) -> Value {
        match self {
            Decryption::Skipped(value)
            | Decryption::Decrypted(value)
            | Decryption::FailedOpen { value, .. } => value,
        }
    }

    /// Borrow the value to hand back to the caller
    pub fn value(&self) -> &Value {
        match self {
            Decryption::Skipped(value)
            | Decryption::Decrypted(value)
            | Decryption::FailedOpen { value, .. } => value,
        }
    }

    /// True when decryption failed and the stored value was passed through
    pub fn is_failed_open(&self) -> bool {
        matches!(self, Decryption::FailedOpen { .. })
    }
}

/// Encrypts, decrypts and renders setting values
#[derive(Debug, Default)]
pub struct ValueCodec {
    #[cfg(feature = "encryption")]
    encrypter: Option<Encrypter>,
    array_format: ArrayFormat,
}

impl ValueCodec {
    /// Create a codec without encryption
    pub fn new(array_format: ArrayFormat) -> Self {
        Self {
            #[cfg(feature = "encryption")]
            encrypter: None,
            array_format,
        }
    }

    /// Enable transparent encryption
    #[cfg(feature = "encryption")]
    #[must_use]
    pub fn with_encrypter(mut self, encrypter: Encrypter) -> Self {
        self.encrypter = Some(encrypter);
        self
    }

    /// Whether values are encrypted before they reach the backend
    pub fn is_encrypting(&self) -> bool {
        #[cfg(feature = "encryption")]
        {
            self.encrypter.is_some()
        }
        #[cfg(not(feature = "encryption"))]
        {
            false
        }
    }

    /// Configured array output format
    pub fn array_format(&self) -> ArrayFormat {
        self.array_format
    }

    /// Encrypt a value into its stored form
    ///
    /// Scalars are encrypted whole; every element of an array or object is
    /// encrypted on its own. Non-string scalars are encrypted as their JSON
    /// text, so they read back as strings.
    pub fn encrypt(&self, value: &Value) -> Result<Value> {
        #[cfg(feature = "encryption")]
        if let Some(encrypter) = &self.encrypter {
            return encrypt_value(encrypter, value);
        }

        Ok(value.clone())
    }

    /// Decrypt a stored value, falling back to the stored value on any failure
    pub fn decrypt(&self, value: Value) -> Decryption {
        #[cfg(feature = "encryption")]
        if let Some(encrypter) = &self.encrypter {
            return match decrypt_value(encrypter, &value) {
                Ok(plain) => Decryption::Decrypted(plain),
                Err(reason) => Decryption::FailedOpen { value, reason },
            };
        }

        Decryption::Skipped(value)
    }

    /// Decrypt every value of a snapshot
    pub fn decrypt_snapshot(&self, snapshot: Snapshot) -> Snapshot {
        if !self.is_encrypting() {
            return snapshot;
        }

        snapshot
            .into_iter()
            .map(|(key, value)| {
                let outcome = self.decrypt(value);
                if let Decryption::FailedOpen { reason, .. } = &outcome {
                    debug!("Setting '{key}' returned undecrypted: {reason}");
                }
                (key, outcome.into_value())
            })
            .collect()
    }

    /// Render arrays/objects in the configured format; scalars pass through
    pub fn render(&self, value: Value) -> Result<Value> {
        array::render(value, self.array_format)
    }
}

#[cfg(feature = "encryption")]
fn encrypt_value(encrypter: &Encrypter, value: &Value) -> Result<Value> {
    Ok(match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| encrypt_element(encrypter, item))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, item)| Ok((k.clone(), encrypt_element(encrypter, item)?)))
                .collect::<Result<_>>()?,
        ),
        scalar => encrypt_element(encrypter, scalar)?,
    })
}

#[cfg(feature = "encryption")]
fn encrypt_element(encrypter: &Encrypter, value: &Value) -> Result<Value> {
    let plaintext = match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value)?,
        other => other.to_string(),
    };
    Ok(Value::String(encrypter.encrypt_string(&plaintext)?))
}

#[cfg(feature = "encryption")]
fn decrypt_value(encrypter: &Encrypter, value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| decrypt_element(encrypter, item))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, item)| Ok((k.clone(), decrypt_element(encrypter, item)?)))
            .collect::<std::result::Result<serde_json::Map<_, _>, String>>()
            .map(Value::Object),
        scalar => decrypt_element(encrypter, scalar),
    }
}

#[cfg(feature = "encryption")]
fn decrypt_element(encrypter: &Encrypter, value: &Value) -> std::result::Result<Value, String> {
    let Value::String(stored) = value else {
        return Err(format!("expected ciphertext string, found {value}"));
    };
    encrypter
        .decrypt_string(stored)
        .map(Value::String)
        .map_err(|e| e.to_string())
}

// =============================================================================
// Tests
// =============================================================================
