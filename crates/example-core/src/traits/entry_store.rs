// # Entry Store Trait
//
// Defines the interface to the host's config-entry persistence.
//
// ## Purpose
//
// The entry store keeps one record per configured device:
// - The credentials the user entered during setup
// - The device id used as the entry's unique id
//
// The unique id is what prevents the same device from being set up twice.
//
// ## Implementations
//
// - In-memory: `MemoryEntryStore`
// - The host platform provides the persistent one

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Credentials, DOMAIN};

/// A configured integration instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Random identifier assigned on creation
    pub entry_id: String,

    /// Integration domain
    pub domain: String,

    /// Display name (the device name at setup time)
    pub title: String,

    /// Connection parameters, stored verbatim
    pub data: Credentials,

    /// Device id; at most one entry per unique id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

impl ConfigEntry {
    /// Create a new entry for this integration's domain
    pub fn new(title: impl Into<String>, data: Credentials) -> Self {
        let now = Utc::now();
        Self {
            entry_id: uuid::Uuid::new_v4().simple().to_string(),
            domain: DOMAIN.to_string(),
            title: title.into(),
            data,
            unique_id: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Set the unique id
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }
}

/// Trait for config-entry stores
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Uniqueness
///
/// `add` must reject an entry whose `unique_id` is already used by another
/// entry. Uniqueness is keyed on the device id only, never on host or key.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Get an entry by id
    async fn get(&self, entry_id: &str) -> Result<Option<ConfigEntry>, crate::Error>;

    /// Get the entry registered under a unique id
    async fn get_by_unique_id(&self, unique_id: &str) -> Result<Option<ConfigEntry>, crate::Error>;

    /// Add a new entry
    ///
    /// # Returns
    ///
    /// - `Ok(())`: stored
    /// - `Err(Error::EntryStore)`: an entry with the same unique id exists
    async fn add(&self, entry: ConfigEntry) -> Result<(), crate::Error>;

    /// Replace the credentials of an existing entry
    ///
    /// Used by re-authentication; returns the updated entry.
    async fn update_credentials(
        &self,
        entry_id: &str,
        data: Credentials,
    ) -> Result<ConfigEntry, crate::Error>;

    /// Remove an entry (no-op if it does not exist)
    async fn remove(&self, entry_id: &str) -> Result<(), crate::Error>;

    /// List all entries
    async fn list(&self) -> Result<Vec<ConfigEntry>, crate::Error>;
}
