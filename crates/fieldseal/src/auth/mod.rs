//! Credential validation and token issuance.
//!
//! # Module invariants
//!
//! - Passwords, password hashes, and tokens never appear in log fields.
//! - The validator reads the user store once per check and never writes to it.
//! - Access tokens always expire before refresh tokens.

pub mod claims;
pub mod password;
pub mod store;
pub mod token;
pub mod validator;

pub use claims::{Claims, TokenType};
pub use password::{hash_password, verify_password};
pub use store::{MemoryUserStore, StoreError, UserRecord, UserStore};
pub use token::{derive_signing_secret, TokenError, TokenIssuer, TokenPair};
pub use validator::{Authenticated, CredentialError, CredentialValidator};
