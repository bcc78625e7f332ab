//! The external user store, seen through the one lookup the validator needs.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use common::protocol::UserSummary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by a [`UserStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not answer; the caller decides whether to retry.
    #[error("user store unavailable: {0}")]
    Unavailable(String),

    /// Two records share an email, which the lookup contract forbids.
    #[error("duplicate email in user store: {0}")]
    DuplicateEmail(String),
}

/// A user as the credential validator sees it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// argon2id PHC string.
    pub password_hash: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl UserRecord {
    /// Public view returned alongside issued tokens.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Read-only lookup into the user store, keyed by unique email.
#[cfg_attr(test, mockall::automock)]
pub trait UserStore: Send + Sync {
    /// Find the user with exactly this email.
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Number of users visible to this store, for health reporting.
    fn user_count(&self) -> usize;
}

/// In-memory [`UserStore`] loaded once from a JSON array of [`UserRecord`]s.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    by_email: HashMap<String, UserRecord>,
}

impl MemoryUserStore {
    /// Index `records` by email.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateEmail`] if two records share an email.
    pub fn new(records: impl IntoIterator<Item = UserRecord>) -> Result<Self, StoreError> {
        let mut by_email = HashMap::new();
        for record in records {
            if by_email.contains_key(&record.email) {
                return Err(StoreError::DuplicateEmail(record.email));
            }
            by_email.insert(record.email.clone(), record);
        }
        Ok(Self { by_email })
    }

    /// Load records from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON array of
    /// user records, or repeats an email.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read users file {}", path.display()))?;
        let records: Vec<UserRecord> = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse users file {}", path.display()))?;
        Ok(Self::new(records)?)
    }
}

impl UserStore for MemoryUserStore {
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.by_email.get(email).cloned())
    }

    fn user_count(&self) -> usize {
        self.by_email.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, email: &str) -> UserRecord {
        UserRecord {
            id,
            username: format!("user{id}"),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".into(),
            is_active: true,
        }
    }

    #[test]
    fn finds_by_exact_email() {
        let store = MemoryUserStore::new([record(1, "juan@pragma.cl")]).unwrap();
        assert_eq!(store.user_count(), 1);
        assert_eq!(
            store.find_by_email("juan@pragma.cl").unwrap().unwrap().id,
            1
        );
        assert!(store.find_by_email("nouser@x.cl").unwrap().is_none());
    }

    #[test]
    fn rejects_duplicate_email() {
        let err = MemoryUserStore::new([record(1, "a@x.cl"), record(2, "a@x.cl")]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(ref e) if e == "a@x.cl"));
    }

    #[test]
    fn record_defaults_to_active() {
        let rec: UserRecord = serde_json::from_str(
            r#"{"id": 3, "username": "ana", "email": "ana@x.cl", "password_hash": "h"}"#,
        )
        .unwrap();
        assert!(rec.is_active);
        assert_eq!(rec.summary().email, "ana@x.cl");
    }

    #[test]
    fn debug_hides_hash_and_email() {
        let dbg = format!("{:?}", record(1, "juan@pragma.cl"));
        assert!(!dbg.contains("argon2id"));
        assert!(!dbg.contains("juan@pragma.cl"));
    }

    #[test]
    fn loads_from_json_file() {
        let path = std::env::temp_dir().join(format!("fieldseal_users_{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"id": 1, "username": "juan", "email": "juan@pragma.cl", "password_hash": "h", "is_active": false}]"#,
        )
        .unwrap();
        let store = MemoryUserStore::from_json_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(!store.find_by_email("juan@pragma.cl").unwrap().unwrap().is_active);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(MemoryUserStore::from_json_file("/nonexistent/users.json").is_err());
    }
}
