//! Email/password verification against the user store, ending in token issuance.
//!
//! ```text
//! UNVERIFIED ─lookup─▶ NOT_FOUND
//!            └───────▶ FOUND ─check_password─▶ REJECTED
//!                            └───────────────▶ VERIFIED ─check_active─▶ DEACTIVATED
//!                                                       └─────────────▶ ISSUED
//! ```
//!
//! Each failed terminal state is its own [`CredentialError`] variant and maps
//! to the input that caused it (`email`, `password`, `account`).

use std::sync::Arc;

use common::protocol::{FieldErrors, UserSummary};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::password::verify_password;
use super::store::{StoreError, UserStore};
use super::token::{TokenError, TokenIssuer, TokenPair};

/// Why a credential check did not issue tokens.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No user record has this email.
    #[error("no user is registered with this email")]
    EmailNotFound,

    /// The user exists but the password does not match.
    #[error("incorrect password")]
    PasswordMismatch,

    /// Correct password, but the account's active flag is off.
    #[error("this account is deactivated")]
    AccountDeactivated,

    /// The store lookup itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Tokens could not be signed.
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl CredentialError {
    /// The submitted input this failure is attributed to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            CredentialError::EmailNotFound => Some("email"),
            CredentialError::PasswordMismatch => Some("password"),
            CredentialError::AccountDeactivated => Some("account"),
            CredentialError::Store(_) | CredentialError::Token(_) => None,
        }
    }

    /// Structured per-field error, e.g. `{"password": ["incorrect password"]}`.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        self.field()
            .map(|field| FieldErrors::from([(field.to_owned(), vec![self.to_string()])]))
    }
}

/// A successful credential check.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub tokens: TokenPair,
    pub user: UserSummary,
}

/// Checks credentials against a [`UserStore`] and issues tokens via a [`TokenIssuer`].
#[derive(Clone)]
pub struct CredentialValidator {
    store: Arc<dyn UserStore>,
    issuer: TokenIssuer,
}

impl CredentialValidator {
    pub fn new(store: Arc<dyn UserStore>, issuer: TokenIssuer) -> Self {
        Self { store, issuer }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    /// Run the credential state machine for one submission.
    ///
    /// Performs exactly one store lookup. Blocks for the argon2 comparison, so
    /// async callers should run it on the blocking pool.
    ///
    /// # Errors
    ///
    /// See [`CredentialError`]. Store failures are not retried.
    pub fn validate(&self, email: &str, password: &str) -> Result<Authenticated, CredentialError> {
        let Some(user) = self.store.find_by_email(email.trim())? else {
            debug!("credential check: email not found");
            return Err(CredentialError::EmailNotFound);
        };

        let matches = verify_password(password, &user.password_hash).unwrap_or_else(|e| {
            warn!(user_id = user.id, error = %e, "stored password hash is unreadable");
            false
        });
        if !matches {
            debug!(user_id = user.id, "credential check: password mismatch");
            return Err(CredentialError::PasswordMismatch);
        }

        if !user.is_active {
            debug!(user_id = user.id, "credential check: account deactivated");
            return Err(CredentialError::AccountDeactivated);
        }

        let tokens = self.issuer.issue_pair(user.id)?;
        info!(user_id = user.id, "credentials verified; tokens issued");
        Ok(Authenticated {
            tokens,
            user: user.summary(),
        })
    }
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::cheap_hash;
    use crate::auth::store::{MockUserStore, UserRecord};
    use mockall::predicate::eq;

    const DAY: u64 = 24 * 60 * 60;

    fn juan(is_active: bool) -> UserRecord {
        UserRecord {
            id: 11,
            username: "juan".into(),
            email: "juan@pragma.cl".into(),
            first_name: "Juan".into(),
            last_name: "Sebastian".into(),
            password_hash: cheap_hash("Pass123456"),
            is_active,
        }
    }

    fn validator(store: MockUserStore) -> CredentialValidator {
        let issuer = TokenIssuer::new(b"validator-test-secret", DAY, 7 * DAY).unwrap();
        CredentialValidator::new(Arc::new(store), issuer)
    }

    fn store_returning(user: Option<UserRecord>) -> MockUserStore {
        let mut store = MockUserStore::new();
        store
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(user.clone()));
        store
    }

    #[test]
    fn unknown_email() {
        let mut store = MockUserStore::new();
        store
            .expect_find_by_email()
            .with(eq("nouser@x.cl"))
            .times(1)
            .returning(|_| Ok(None));
        let err = validator(store)
            .validate("nouser@x.cl", "Pass123456")
            .unwrap_err();
        assert!(matches!(err, CredentialError::EmailNotFound));
        assert_eq!(err.field(), Some("email"));
    }

    #[test]
    fn wrong_password() {
        let err = validator(store_returning(Some(juan(true))))
            .validate("juan@pragma.cl", "PasswordIncorrecto")
            .unwrap_err();
        assert!(matches!(err, CredentialError::PasswordMismatch));
        let errors = err.field_errors().unwrap();
        assert!(errors.contains_key("password"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn deactivated_account() {
        let err = validator(store_returning(Some(juan(false))))
            .validate("juan@pragma.cl", "Pass123456")
            .unwrap_err();
        assert!(matches!(err, CredentialError::AccountDeactivated));
        assert_eq!(err.field(), Some("account"));
    }

    #[test]
    fn wrong_password_on_deactivated_account_reports_password() {
        let err = validator(store_returning(Some(juan(false))))
            .validate("juan@pragma.cl", "nope")
            .unwrap_err();
        assert!(matches!(err, CredentialError::PasswordMismatch));
    }

    #[test]
    fn unreadable_hash_is_a_mismatch() {
        let mut user = juan(true);
        user.password_hash = "not-a-phc-string".into();
        let err = validator(store_returning(Some(user)))
            .validate("juan@pragma.cl", "Pass123456")
            .unwrap_err();
        assert!(matches!(err, CredentialError::PasswordMismatch));
    }

    #[test]
    fn store_failure_propagates() {
        let mut store = MockUserStore::new();
        store
            .expect_find_by_email()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("connection refused".into())));
        let err = validator(store)
            .validate("juan@pragma.cl", "Pass123456")
            .unwrap_err();
        assert!(matches!(err, CredentialError::Store(_)));
        assert_eq!(err.field(), None);
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn success_issues_pair_and_summary() {
        let validator = validator(store_returning(Some(juan(true))));
        let ok = validator.validate(" juan@pragma.cl ", "Pass123456").unwrap();
        assert_eq!(ok.user.id, 11);
        assert_eq!(ok.user.first_name, "Juan");
        assert_eq!(ok.user.last_name, "Sebastian");

        let access = validator.issuer().decode(&ok.tokens.access).unwrap();
        assert!(access.is_access());
        assert_eq!(access.user_id, 11);
        assert!(validator.issuer().decode(&ok.tokens.refresh).unwrap().is_refresh());
    }
}
