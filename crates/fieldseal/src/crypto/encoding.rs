//! Lossless bytes ↔ lowercase hex text, for text-only storage fields.

use thiserror::Error;

/// Malformed hex input, usually a sign of upstream data corruption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Hex text must contain two characters per byte.
    #[error("hex input has odd length ({0} characters)")]
    OddLength(usize),

    #[error("invalid hex character {c:?} at index {index}")]
    InvalidCharacter { c: char, index: usize },
}

/// Render `bytes` as lowercase hex, two characters per byte.
pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    ::hex::encode(bytes)
}

/// Parse hex text back into bytes.
///
/// # Errors
///
/// Returns [`FormatError`] on odd-length input or any non-hex character.
pub fn from_hex(text: &str) -> Result<Vec<u8>, FormatError> {
    ::hex::decode(text).map_err(|e| match e {
        ::hex::FromHexError::OddLength | ::hex::FromHexError::InvalidStringLength => {
            FormatError::OddLength(text.len())
        }
        ::hex::FromHexError::InvalidHexCharacter { c, index } => {
            FormatError::InvalidCharacter { c, index }
        }
    })
}
