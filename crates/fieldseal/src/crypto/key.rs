//! [`EncryptionKey`]: the process-wide 32-byte field encryption secret.

use aes_gcm_siv::aead::{rand_core::RngCore, OsRng};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::cipher::CipherError;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes of raw secret.
///
/// The key is supplied by configuration and never rotated in-process. Clones
/// are independent copies; each copy overwrites its memory with zeroes on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey(Box<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Build a key from raw secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyLength`] unless `bytes` is exactly [`KEY_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() != KEY_LEN {
            return Err(CipherError::KeyLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Build a key from its configuration form: standard base64 of the raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyType`] if `encoded` is not base64, and
    /// [`CipherError::KeyLength`] if it decodes to anything but [`KEY_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, CipherError> {
        let mut raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CipherError::KeyType(e.to_string()))?;
        let key = Self::from_bytes(&raw);
        raw.iter_mut().for_each(|b| *b = 0);
        key
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Generate a fresh random key from the OS CSPRNG.
///
/// Intended for provisioning and tests; the running service always uses the
/// configured key.
pub fn generate_key() -> EncryptionKey {
    let mut buf = Box::new([0u8; KEY_LEN]);
    OsRng.fill_bytes(&mut buf[..]);
    EncryptionKey(buf)
}
