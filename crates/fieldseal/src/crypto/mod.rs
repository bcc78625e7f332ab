//! AES-256-GCM-SIV envelope primitives and hex transport encoding.
//!
//! This module is free of HTTP and credential dependencies. It provides the
//! low-level operations used by the field adapter.
//!
//! # Envelope format
//!
//! ```text
//! nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```
//!
//! Stored as lowercase hex text because the external record fields are text-only.

pub mod cipher;
pub mod encoding;
pub mod key;

pub use cipher::{decrypt, decrypt_bytes, encrypt, Cipher, CipherError};
pub use encoding::{from_hex, to_hex, FormatError};
pub use key::{generate_key, EncryptionKey, KEY_LEN};
