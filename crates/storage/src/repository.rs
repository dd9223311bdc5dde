use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Retention class of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Survives reloads and full restarts.
    Persistent,
    /// Survives reloads; cleared when the hosting session ends.
    Session,
}

/// String key-value contract implemented by every backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory store, used for Tier S and for tests.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Both retention tiers behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct SessionStore {
    pub persistent: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    #[must_use]
    pub fn new(persistent: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            persistent,
            session,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(InMemoryKeyValueStore::new()),
        )
    }

    /// Same persistent tier, fresh session tier: what a full restart sees.
    #[must_use]
    pub fn restarted(&self) -> Self {
        Self::new(
            Arc::clone(&self.persistent),
            Arc::new(InMemoryKeyValueStore::new()),
        )
    }

    #[must_use]
    pub fn tier(&self, tier: Tier) -> &dyn KeyValueStore {
        match tier {
            Tier::Persistent => self.persistent.as_ref(),
            Tier::Session => self.session.as_ref(),
        }
    }

    /// Read and decode a JSON value.
    ///
    /// A value that fails to decode is treated as absent: it is logged and
    /// `Ok(None)` is returned so callers fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the backend itself fails.
    pub async fn load_json<T: DeserializeOwned>(
        &self,
        tier: Tier,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.tier(tier).get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key, ?tier, error = %err, "ignoring corrupted stored value");
                Ok(None)
            }
        }
    }

    /// Encode and store a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails, or backend errors.
    pub async fn save_json<T: Serialize + ?Sized>(
        &self,
        tier: Tier,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        debug!(key, ?tier, bytes = raw.len(), "storing value");
        self.tier(tier).set(key, &raw).await
    }

    /// Read a plain value and parse it with `FromStr`, treating garbage as absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the backend itself fails.
    pub async fn load_parsed<T: std::str::FromStr>(
        &self,
        tier: Tier,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.tier(tier).get(key).await? else {
            return Ok(None);
        };
        let parsed = raw.trim().parse().ok();
        if parsed.is_none() {
            warn!(key, ?tier, "ignoring unparsable stored value");
        }
        Ok(parsed)
    }

    /// Remove several keys from one tier, in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first backend failure.
    pub async fn remove_all(&self, tier: Tier, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            self.tier(tier).remove(key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;

    #[tokio::test]
    async fn in_memory_store_round_trips_values() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn tiers_are_independent() {
        let store = SessionStore::in_memory();
        store
            .tier(Tier::Persistent)
            .set(keys::END_TIME, "1")
            .await
            .unwrap();
        assert_eq!(store.tier(Tier::Session).get(keys::END_TIME).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupted_json_is_treated_as_absent() {
        let store = SessionStore::in_memory();
        store
            .tier(Tier::Persistent)
            .set(keys::ANSWERS, "{not json")
            .await
            .unwrap();

        let loaded: Option<HashMap<String, String>> =
            store.load_json(Tier::Persistent, keys::ANSWERS).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn json_helpers_round_trip() {
        let store = SessionStore::in_memory();
        let value = vec!["a".to_string(), "b".to_string()];
        store
            .save_json(Tier::Session, keys::CURRENT_RESULT, &value)
            .await
            .unwrap();
        let loaded: Option<Vec<String>> = store
            .load_json(Tier::Session, keys::CURRENT_RESULT)
            .await
            .unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[tokio::test]
    async fn unparsable_plain_values_are_absent() {
        let store = SessionStore::in_memory();
        store
            .tier(Tier::Persistent)
            .set(keys::CURRENT_INDEX, "seven")
            .await
            .unwrap();
        let index: Option<usize> = store
            .load_parsed(Tier::Persistent, keys::CURRENT_INDEX)
            .await
            .unwrap();
        assert_eq!(index, None);
    }

    #[tokio::test]
    async fn restart_keeps_persistent_tier_only() {
        let store = SessionStore::in_memory();
        store
            .tier(Tier::Persistent)
            .set(keys::GUEST_ID, "GUEST ID: 1234")
            .await
            .unwrap();
        store
            .tier(Tier::Session)
            .set(keys::CURRENT_RESULT, "{}")
            .await
            .unwrap();

        let restarted = store.restarted();
        assert!(
            restarted
                .tier(Tier::Persistent)
                .get(keys::GUEST_ID)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            restarted
                .tier(Tier::Session)
                .get(keys::CURRENT_RESULT)
                .await
                .unwrap()
                .is_none()
        );
    }
}
