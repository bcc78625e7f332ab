//! HS256 access/refresh token issuance, verification, and single-use rotation.
//!
//! # Rotation
//!
//! Exchanging a refresh token for a new pair revokes the presented token's
//! `jti`. A revoked refresh token is rejected from then on, so a leaked refresh
//! token is good for at most one exchange. Revocation entries are kept only
//! until the token they name would have expired anyway.

use std::{collections::HashMap, sync::Arc};

use hmac::{Hmac, Mac};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::Sha256;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::claims::{Claims, TokenType};
use crate::crypto::EncryptionKey;

/// Label mixed into the encryption key when no separate token secret is set.
const SIGNING_KEY_LABEL: &[u8] = b"fieldseal token signing";

/// Errors from token issuance and verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Bad structure, bad signature, or bad claims.
    #[error("token is malformed or its signature does not verify")]
    Invalid,

    #[error("token has expired")]
    Expired,

    /// A token of the other kind was presented.
    #[error("expected a {expected} token")]
    WrongType { expected: TokenType },

    /// The refresh token was already exchanged.
    #[error("refresh token has already been used")]
    Revoked,

    #[error("token signing failed: {0}")]
    Signing(String),

    /// Access tokens must expire strictly before refresh tokens.
    #[error("access lifetime ({access}s) must be positive and shorter than refresh lifetime ({refresh}s)")]
    Lifetimes { access: u64, refresh: u64 },
}

/// A freshly issued access/refresh pair.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenPair([REDACTED])")
    }
}

/// Derive the HS256 secret from the field encryption key.
///
/// HMAC-SHA256 keyed by the encryption key over a fixed label, so the raw
/// field key never doubles as a MAC key.
pub fn derive_signing_secret(key: &EncryptionKey) -> Result<Vec<u8>, TokenError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key.as_bytes())
        .map_err(|e| TokenError::Signing(e.to_string()))?;
    mac.update(SIGNING_KEY_LABEL);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Issues and checks signed tokens; owns the refresh revocation set.
///
/// Clones share the same revocation set.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    /// Revoked refresh `jti` → that token's `exp`.
    revoked: Arc<RwLock<HashMap<String, i64>>>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer signing with `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Lifetimes`] unless `0 < access_ttl_secs < refresh_ttl_secs`.
    pub fn new(
        secret: &[u8],
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Result<Self, TokenError> {
        let lifetimes = TokenError::Lifetimes {
            access: access_ttl_secs,
            refresh: refresh_ttl_secs,
        };
        if access_ttl_secs == 0 || access_ttl_secs >= refresh_ttl_secs {
            return Err(lifetimes);
        }
        let access_ttl_secs = i64::try_from(access_ttl_secs).map_err(|_| lifetimes.clone())?;
        let refresh_ttl_secs = i64::try_from(refresh_ttl_secs).map_err(|_| lifetimes)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl_secs,
            refresh_ttl_secs,
            revoked: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Issue a new access/refresh pair for `user_id`.
    pub fn issue_pair(&self, user_id: u64) -> Result<TokenPair, TokenError> {
        let now = now_secs();
        Ok(TokenPair {
            access: self.issue_at(user_id, TokenType::Access, now)?,
            refresh: self.issue_at(user_id, TokenType::Refresh, now)?,
        })
    }

    pub(crate) fn issue_at(
        &self,
        user_id: u64,
        token_type: TokenType,
        issued_at: i64,
    ) -> Result<String, TokenError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            token_type,
            exp: issued_at + ttl,
            iat: issued_at,
            jti: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature and expiry only; revocation is not consulted.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Full verification: signature, expiry, and refresh revocation.
    pub async fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.decode(token)?;
        if claims.is_refresh() && self.revoked.read().await.contains_key(&claims.jti) {
            return Err(TokenError::Revoked);
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new pair, revoking the one presented.
    ///
    /// # Errors
    ///
    /// [`TokenError::WrongType`] for an access token, [`TokenError::Revoked`]
    /// for a refresh token that was already exchanged, plus any
    /// [`TokenIssuer::decode`] failure.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let claims = self.decode(refresh_token)?;
        if !claims.is_refresh() {
            return Err(TokenError::WrongType {
                expected: TokenType::Refresh,
            });
        }

        {
            let mut revoked = self.revoked.write().await;
            let now = now_secs();
            revoked.retain(|_, exp| *exp >= now);
            if revoked.contains_key(&claims.jti) {
                warn!(user_id = claims.user_id, "revoked refresh token presented again");
                return Err(TokenError::Revoked);
            }
            revoked.insert(claims.jti, claims.exp);
        }

        info!(user_id = claims.user_id, "refresh token rotated");
        self.issue_pair(claims.user_id)
    }

    /// Number of refresh tokens currently held as revoked.
    pub async fn revoked_count(&self) -> usize {
        self.revoked.read().await.len()
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
