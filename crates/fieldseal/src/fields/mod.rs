//! Transparent encryption of externally-owned record fields.
//!
//! Write path: [`FieldValue`] → canonical text → [`Cipher`] → hex. Read path is
//! the reverse, with a structured value recovered whenever the decrypted text
//! is a JSON object or array.
//!
//! # Failure policy
//!
//! [`FieldCodec::open`] reports decode failures as [`FieldDecodeError`]. The bulk
//! read paths ([`FieldCodec::open_or_null`], [`FieldCodec::open_record`]) never
//! fail: an undecodable field becomes null and one warning is logged for it.
//! Sibling fields and other records are unaffected.
//! Log events carry the field path only, never ciphertext or plaintext.

pub mod catalog;
pub mod record;

pub use catalog::{CatalogError, FieldCatalog, FieldPaths};
pub use record::{OpenReport, SealError};

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::crypto::{from_hex, to_hex, Cipher, CipherError, FormatError};

/// A field value before encryption or after decryption.
///
/// Either free text or a JSON object or array. Scalars cannot be represented,
/// so every value survives a seal/open round trip unchanged. Build one with
/// [`FieldValue::text`], [`FieldValue::structured`], or `TryFrom<Value>`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue(Repr);

#[derive(Debug, Clone, PartialEq)]
enum Repr {
    Structured(Value),
    Text(String),
}

impl FieldValue {
    pub fn text(text: impl Into<String>) -> Self {
        FieldValue(Repr::Text(text.into()))
    }

    /// Wrap a JSON object or array.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::PlaintextType`] for any other JSON value.
    pub fn structured(value: Value) -> Result<Self, CipherError> {
        match value {
            v @ (Value::Object(_) | Value::Array(_)) => Ok(FieldValue(Repr::Structured(v))),
            other => Err(CipherError::PlaintextType(
                crate::crypto::cipher::json_kind(&other),
            )),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.0 {
            Repr::Text(s) => Some(s),
            Repr::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match &self.0 {
            Repr::Structured(v) => Some(v),
            Repr::Text(_) => None,
        }
    }

    /// The text that is actually encrypted.
    ///
    /// Structured values serialise compactly with object keys in sorted order,
    /// so equal values always produce equal text.
    pub fn canonical_text(&self) -> String {
        match &self.0 {
            Repr::Structured(v) => v.to_string(),
            Repr::Text(s) => s.clone(),
        }
    }

    /// Interpret decrypted text: JSON objects and arrays are structured,
    /// anything else (including JSON scalars) stays text.
    pub fn from_decrypted(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(v @ (Value::Object(_) | Value::Array(_))) => FieldValue(Repr::Structured(v)),
            _ => FieldValue(Repr::Text(text)),
        }
    }

    /// Convert into the JSON value placed back into a record.
    pub fn into_json(self) -> Value {
        match self.0 {
            Repr::Structured(v) => v,
            Repr::Text(s) => Value::String(s),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::text(s)
    }
}

impl TryFrom<Value> for FieldValue {
    type Error = CipherError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(FieldValue::text(s)),
            other => FieldValue::structured(other),
        }
    }
}

/// Why a stored field could not be turned back into a [`FieldValue`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldDecodeError {
    /// The stored text is not valid hex.
    #[error("stored field is not hex: {0}")]
    Format(#[from] FormatError),

    /// The envelope did not decrypt under the configured key.
    #[error("stored field did not decrypt: {0}")]
    Cipher(#[from] CipherError),

    /// The record held a non-text value where a hex envelope was expected.
    #[error("stored field is a {0}, expected hex text")]
    NotText(&'static str),
}

/// Encrypts and decrypts record fields with one process-wide [`Cipher`].
#[derive(Clone, Debug)]
pub struct FieldCodec {
    cipher: Cipher,
}

impl FieldCodec {
    pub fn new(cipher: Cipher) -> Self {
        Self { cipher }
    }

    /// Encrypt `value` and return the hex envelope to store.
    ///
    /// # Errors
    ///
    /// Only [`CipherError::Encrypt`], which needs a payload far beyond any record.
    pub fn seal(&self, value: &FieldValue) -> Result<String, CipherError> {
        let envelope = self.cipher.encrypt(value.canonical_text())?;
        Ok(to_hex(envelope))
    }

    /// Decode a stored hex envelope.
    ///
    /// # Errors
    ///
    /// Returns [`FieldDecodeError`] on bad hex, a truncated envelope, a wrong key,
    /// or tampered bytes.
    pub fn open(&self, stored: &str) -> Result<FieldValue, FieldDecodeError> {
        let envelope = from_hex(stored)?;
        let text = self.cipher.decrypt(&envelope)?;
        Ok(FieldValue::from_decrypted(text))
    }

    /// Decode a stored field, substituting `None` and logging once on failure.
    pub fn open_or_null(&self, field: &str, stored: &str) -> Option<FieldValue> {
        match self.open(stored) {
            Ok(value) => Some(value),
            Err(e) => {
                report_decode_failure(field, &e);
                None
            }
        }
    }
}

pub(crate) fn report_decode_failure(field: &str, error: &FieldDecodeError) {
    warn!(field = %field, error = %error, "encrypted field could not be decoded; returning null");
}
