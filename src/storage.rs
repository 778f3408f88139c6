//! Client-durable storage for established sessions.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::backend::Session;
use crate::error::SessionError;

/// Storage key holding the session token.
pub const TOKEN_KEY: &str = "userToken";
/// Storage key holding the user identifier.
pub const USER_ID_KEY: &str = "userId";
/// Storage key holding the cached profile snapshot.
pub const PROFILE_KEY: &str = "userProfile";

/// Key/value storage failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable")]
    Unavailable,

    #[error("storage write failed: {0}")]
    Write(String),
}

/// Port to whatever durable key/value storage the host offers.
///
/// Reads and writes are synchronous: storage is not a suspension point
/// of the attempt.
pub trait SessionStore: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Wipe every entry. This is the logout operation.
    fn clear(&self) -> Result<(), StorageError>;
}

/// In-memory store, the default for tests and headless hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries =
            self.entries.write().map_err(|_| StorageError::Unavailable)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries =
            self.entries.read().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.get(key).cloned())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries =
            self.entries.write().map_err(|_| StorageError::Unavailable)?;
        entries.clear();
        Ok(())
    }
}

/// Write the session artifacts as one logical unit.
///
/// Either every key lands or none: a partial failure wipes the store
/// before returning, so a token can never be read without its user id.
pub fn persist_session(
    store: &dyn SessionStore,
    session: &Session,
    profile: Option<&serde_json::Value>,
) -> Result<(), SessionError> {
    let written: Result<(), StorageError> = (|| {
        store.put(TOKEN_KEY, &session.token)?;
        store.put(USER_ID_KEY, &session.user_id)?;
        if let Some(profile) = profile {
            store.put(PROFILE_KEY, &profile.to_string())?;
        }
        Ok(())
    })();

    match written {
        Ok(()) => {
            tracing::debug!(user_id = %session.user_id, "session artifacts persisted");
            Ok(())
        },
        Err(err) => {
            tracing::error!(error = %err, "session persistence failed, rolling back");
            let _ = store.clear();
            Err(SessionError::Persist(err))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// Store that fails every write past the first.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        writes: RwLock<u32>,
    }

    impl SessionStore for FlakyStore {
        fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let mut writes = self.writes.write().unwrap();
            *writes += 1;
            if *writes > 1 {
                return Err(StorageError::Write(key.to_owned()));
            }
            self.inner.put(key, value)
        }

        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn clear(&self) -> Result<(), StorageError> {
            self.inner.clear()
        }
    }

    fn session() -> Session {
        Session {
            token: "token-1".into(),
            user_id: "user-1".into(),
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();

        store.put("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.clear().unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_persist_writes_token_and_user_id_together() {
        let store = MemoryStore::new();

        persist_session(&store, &session(), None).unwrap();

        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("token-1"));
        assert_eq!(store.get(USER_ID_KEY).unwrap().as_deref(), Some("user-1"));
        assert_eq!(store.get(PROFILE_KEY).unwrap(), None);
    }

    #[test]
    fn test_persist_includes_profile_snapshot() {
        let store = MemoryStore::new();
        let profile = serde_json::json!({ "firstName": "Ada" });

        persist_session(&store, &session(), Some(&profile)).unwrap();

        let stored = store.get(PROFILE_KEY).unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&stored).unwrap(),
            profile
        );
    }

    #[test]
    fn test_partial_failure_rolls_back_everything() {
        let store = FlakyStore::default();

        let err = persist_session(&store, &session(), None).unwrap_err();
        assert!(matches!(err, SessionError::Persist(_)));

        // The first write landed, the rollback must have wiped it.
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_ID_KEY).unwrap(), None);
    }
}
