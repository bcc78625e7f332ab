//! Claims carried by access and refresh tokens.

use serde::{Deserialize, Serialize};

/// Discriminates the two token kinds; serialised as `"access"` / `"refresh"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        })
    }
}

/// JWT claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    /// Expiration (unix seconds).
    pub exp: i64,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Unique token id; the revocation key for refresh tokens.
    pub jti: String,
    /// Subject: the user's id in the external store.
    pub user_id: u64,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.token_type == TokenType::Access
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type == TokenType::Refresh
    }
}
