// # Memory Entry Store
//
// In-memory implementation of EntryStore.
//
// ## Purpose
//
// Holds config entries for embedded use and tests. Entries do not survive a
// restart; the host platform is responsible for persisting them.
//
// ## Uniqueness
//
// `add` and the unique-id lookup run under the same write lock, so two
// concurrent setups of the same device cannot both succeed.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::config::Credentials;
use crate::traits::entry_store::{ConfigEntry, EntryStore};
use crate::Error;

/// In-memory entry store implementation
///
/// # Example
///
/// ```rust,no_run
/// use example_core::config::Credentials;
/// use example_core::state::MemoryEntryStore;
/// use example_core::traits::{ConfigEntry, EntryStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryEntryStore::new();
///
///     let entry = ConfigEntry::new("Kitchen", Credentials::new("10.0.0.2", "key"))
///         .with_unique_id("example_device_001");
///     store.add(entry).await?;
///
///     assert!(store.get_by_unique_id("example_device_001").await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryEntryStore {
    inner: Arc<RwLock<HashMap<String, ConfigEntry>>>,
}

impl MemoryEntryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the number of entries in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for MemoryEntryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn get(&self, entry_id: &str) -> Result<Option<ConfigEntry>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(entry_id).cloned())
    }

    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<ConfigEntry>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .values()
            .find(|entry| entry.unique_id.as_deref() == Some(unique_id))
            .cloned())
    }

    async fn add(&self, entry: ConfigEntry) -> Result<(), Error> {
        let mut guard = self.inner.write().await;

        if guard.contains_key(&entry.entry_id) {
            return Err(Error::entry_store(format!(
                "Entry {} already exists",
                entry.entry_id
            )));
        }

        if let Some(unique_id) = entry.unique_id.as_deref() {
            if guard
                .values()
                .any(|existing| existing.unique_id.as_deref() == Some(unique_id))
            {
                return Err(Error::entry_store(format!(
                    "An entry for {} is already configured",
                    unique_id
                )));
            }
        }

        guard.insert(entry.entry_id.clone(), entry);
        Ok(())
    }

    async fn update_credentials(
        &self,
        entry_id: &str,
        data: Credentials,
    ) -> Result<ConfigEntry, Error> {
        let mut guard = self.inner.write().await;
        let entry = guard
            .get_mut(entry_id)
            .ok_or_else(|| Error::entry_store(format!("Entry {} not found", entry_id)))?;

        entry.data = data;
        entry.modified_at = Utc::now();
        Ok(entry.clone())
    }

    async fn remove(&self, entry_id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(entry_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConfigEntry>, Error> {
        let guard = self.inner.read().await;
        let mut entries: Vec<ConfigEntry> = guard.values().cloned().collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }
}
