//! Entity registry
//!
//! The registry is the host-side view of every entity set up by the
//! integration, keyed by unique id. Unique ids must never collide: two
//! entities with the same id would silently merge their histories on the
//! host, so registration of a duplicate is rejected.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use example_core::registry::EntityRegistry;
//!
//! let registry = EntityRegistry::new();
//! registry.register(Arc::new(sensor))?;
//!
//! for view in registry.states() {
//!     println!("{} = {}", view.unique_id, view.state);
//! }
//! ```

use crate::error::{Error, Result};
use crate::traits::Entity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Rendered state of one entity at the time it was read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStateView {
    pub unique_id: String,
    pub name: String,
    pub state: String,
    pub unit: Option<String>,
    pub available: bool,
}

/// Registry of live entities
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct EntityRegistry {
    entities: RwLock<HashMap<String, Arc<dyn Entity>>>,
}

impl EntityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity under its unique id
    ///
    /// # Returns
    ///
    /// - `Ok(())`: registered
    /// - `Err(Error::Registry)`: an entity with the same unique id exists
    pub fn register(&self, entity: Arc<dyn Entity>) -> Result<()> {
        let unique_id = entity.unique_id();
        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);

        if entities.contains_key(&unique_id) {
            return Err(Error::registry(format!(
                "Entity {} is already registered",
                unique_id
            )));
        }

        entities.insert(unique_id, entity);
        Ok(())
    }

    /// Remove an entity; returns whether it was registered
    pub fn unregister(&self, unique_id: &str) -> bool {
        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        entities.remove(unique_id).is_some()
    }

    /// Look up an entity by unique id
    pub fn get(&self, unique_id: &str) -> Option<Arc<dyn Entity>> {
        let entities = self.entities.read().unwrap_or_else(PoisonError::into_inner);
        entities.get(unique_id).cloned()
    }

    /// Check if a unique id is registered
    pub fn contains(&self, unique_id: &str) -> bool {
        let entities = self.entities.read().unwrap_or_else(PoisonError::into_inner);
        entities.contains_key(unique_id)
    }

    /// Registered unique ids, sorted
    pub fn list(&self) -> Vec<String> {
        let entities = self.entities.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = entities.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entities.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every entity's current state, sorted by unique id
    pub fn states(&self) -> Vec<EntityStateView> {
        let entities: Vec<Arc<dyn Entity>> = {
            let guard = self.entities.read().unwrap_or_else(PoisonError::into_inner);
            guard.values().cloned().collect()
        };

        let mut views: Vec<EntityStateView> = entities
            .iter()
            .map(|entity| EntityStateView {
                unique_id: entity.unique_id(),
                name: entity.name().to_string(),
                state: entity.state(),
                unit: entity.unit_of_measurement().map(str::to_string),
                available: entity.available(),
            })
            .collect();
        views.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        views
    }
}
