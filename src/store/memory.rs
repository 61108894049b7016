//! In-memory document store.

use crate::models::{Collection, Environment, Globals, Item, VarValue};
use crate::store::DocumentStore;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An in-memory [`DocumentStore`] backed by `RwLock`-guarded maps.
///
/// Used by tests and as the reference store implementation. Writes follow the
/// same read-modify-write, last-write-wins semantics the trait documents.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Documents>,
}

#[derive(Debug, Default)]
struct Documents {
    items: HashMap<String, Item>,
    collections: HashMap<String, Collection>,
    environments: HashMap<String, Environment>,
    globals: Globals,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded data stays consistent even if a writer panicked, so a
    // poisoned lock is recovered rather than propagated.
    fn read(&self) -> RwLockReadGuard<'_, Documents> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Documents> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts or replaces an item.
    pub fn insert_item(&self, item: Item) {
        self.write().items.insert(item.id.clone(), item);
    }

    /// Inserts or replaces a collection.
    pub fn insert_collection(&self, collection: Collection) {
        self.write()
            .collections
            .insert(collection.id.clone(), collection);
    }

    /// Inserts or replaces an environment.
    pub fn insert_environment(&self, environment: Environment) {
        self.write()
            .environments
            .insert(environment.id.clone(), environment);
    }

    /// Replaces the globals document.
    pub fn set_globals(&self, globals: Globals) {
        self.write().globals = globals;
    }
}

impl DocumentStore for MemoryStore {
    fn get_item(&self, id: &str) -> Option<Item> {
        self.read().items.get(id).cloned()
    }

    fn get_collection(&self, id: &str) -> Option<Collection> {
        self.read().collections.get(id).cloned()
    }

    fn get_environment(&self, id: &str) -> Option<Environment> {
        self.read().environments.get(id).cloned()
    }

    fn get_globals(&self) -> Globals {
        self.read().globals.clone()
    }

    fn update_environment(&self, id: &str, values: BTreeMap<String, VarValue>) {
        let mut documents = self.write();
        if let Some(environment) = documents.environments.get_mut(id) {
            environment.values = values;
            environment.updated_at = Utc::now();
        } else {
            log::warn!("update_environment: no environment with id {}", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_item() {
        let store = MemoryStore::new();
        let item = Item::request("c1", "ping");
        let id = item.id.clone();
        store.insert_item(item);

        assert_eq!(store.get_item(&id).unwrap().name, "ping");
        assert!(store.get_item("missing").is_none());
    }

    #[test]
    fn test_globals_default_when_unset() {
        let store = MemoryStore::new();
        assert!(store.get_globals().values.is_empty());
    }

    #[test]
    fn test_update_environment_replaces_values_and_bumps_timestamp() {
        let store = MemoryStore::new();
        let mut env = Environment::new("dev");
        env.set("old", VarValue::record("1"));
        let id = env.id.clone();
        let stamp = env.updated_at;
        store.insert_environment(env);

        let mut values = BTreeMap::new();
        values.insert("new".to_string(), VarValue::record("2"));
        store.update_environment(&id, values);

        let updated = store.get_environment(&id).unwrap();
        assert!(updated.values.get("old").is_none());
        assert_eq!(updated.values.get("new").unwrap().value(), "2");
        assert!(updated.updated_at >= stamp);
    }

    #[test]
    fn test_update_missing_environment_is_noop() {
        let store = MemoryStore::new();
        store.update_environment("missing", BTreeMap::new());
        assert!(store.get_environment("missing").is_none());
    }
}
