//! AES-256-GCM-SIV encryption and decryption of byte payloads.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant.
//! A fresh random 96-bit nonce is still drawn for every call, so two encryptions
//! of the same plaintext under the same key never produce the same envelope.
//!
//! **Do NOT substitute plain AES-256-GCM with a fixed nonce.** GCM nonce reuse
//! is catastrophic: it breaks both confidentiality and authentication.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use thiserror::Error;

use super::key::{EncryptionKey, KEY_LEN};

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// Smallest possible envelope: the encryption of an empty plaintext.
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN;

/// Errors produced by the cipher layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    KeyLength(usize),

    /// The supplied key material does not decode to raw bytes.
    #[error("key material is not raw bytes: {0}")]
    KeyType(String),

    /// A JSON field value was neither text nor an object or array.
    #[error("plaintext must be text, an object, or an array, got {0}")]
    PlaintextType(&'static str),

    /// The envelope is too short to hold a nonce and a tag.
    #[error("ciphertext too short: need at least {MIN_ENVELOPE_LEN} bytes, got {0}")]
    CiphertextType(usize),

    /// The integrity tag did not verify: wrong key or tampered bytes.
    #[error("authentication failed: wrong key or tampered ciphertext")]
    Authentication,

    /// The AEAD refused to encrypt (payload beyond the primitive's limit).
    #[error("aead encryption failed")]
    Encrypt,

    /// Decryption succeeded but the plaintext is not UTF-8 text.
    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Encrypt `plaintext` under a raw 32-byte `key`.
///
/// Returns the envelope `nonce || ciphertext || tag`.
///
/// # Errors
///
/// Returns [`CipherError::KeyLength`] if `key` is not [`KEY_LEN`] bytes; the
/// check happens before any crypto work.
pub fn encrypt(plaintext: impl AsRef<[u8]>, key: &[u8]) -> Result<Vec<u8>, CipherError> {
    seal(&build_cipher(key)?, plaintext.as_ref())
}

/// Decrypt an envelope produced by [`encrypt`] back to UTF-8 text.
///
/// # Errors
///
/// Returns [`CipherError::KeyLength`] for a bad key, [`CipherError::CiphertextType`]
/// for a truncated envelope, [`CipherError::Authentication`] if the tag does not
/// verify, and [`CipherError::InvalidUtf8`] if the plaintext is not text.
pub fn decrypt(envelope: &[u8], key: &[u8]) -> Result<String, CipherError> {
    into_text(decrypt_bytes(envelope, key)?)
}

/// Decrypt an envelope produced by [`encrypt`] back to raw bytes.
///
/// # Errors
///
/// As [`decrypt`], minus the UTF-8 requirement.
pub fn decrypt_bytes(envelope: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
    open(&build_cipher(key)?, envelope)
}

/// A cipher bound to one immutable [`EncryptionKey`].
///
/// Cheap to clone and safe to share across threads; holds no mutable state.
#[derive(Clone, Debug)]
pub struct Cipher {
    key: EncryptionKey,
}

impl Cipher {
    /// Bind a cipher to `key`. The key length is already guaranteed by the type.
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// The key this cipher was constructed with.
    pub fn key(&self) -> &EncryptionKey {
        &self.key
    }

    /// See [`encrypt`].
    pub fn encrypt(&self, plaintext: impl AsRef<[u8]>) -> Result<Vec<u8>, CipherError> {
        seal(&self.aead(), plaintext.as_ref())
    }

    /// See [`decrypt`].
    pub fn decrypt(&self, envelope: &[u8]) -> Result<String, CipherError> {
        into_text(self.decrypt_bytes(envelope)?)
    }

    /// See [`decrypt_bytes`].
    pub fn decrypt_bytes(&self, envelope: &[u8]) -> Result<Vec<u8>, CipherError> {
        open(&self.aead(), envelope)
    }

    fn aead(&self) -> Aes256GcmSiv {
        Aes256GcmSiv::new(self.key.as_bytes().into())
    }
}

fn seal(aead: &Aes256GcmSiv, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = aead
        .encrypt(nonce, plaintext)
        .map_err(|_| CipherError::Encrypt)?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

fn open(aead: &Aes256GcmSiv, envelope: &[u8]) -> Result<Vec<u8>, CipherError> {
    if envelope.len() < MIN_ENVELOPE_LEN {
        return Err(CipherError::CiphertextType(envelope.len()));
    }
    let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_LEN);
    aead.decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CipherError::Authentication)
}

fn into_text(bytes: Vec<u8>) -> Result<String, CipherError> {
    String::from_utf8(bytes).map_err(|_| CipherError::InvalidUtf8)
}

fn build_cipher(key: &[u8]) -> Result<Aes256GcmSiv, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::KeyLength(key.len()));
    }
    Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::KeyLength(key.len()))
}
