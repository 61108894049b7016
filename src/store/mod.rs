//! Document store collaborator contract.
//!
//! The engine reads request/collection/environment documents through this
//! trait and writes back exactly one thing: updated environment values at the
//! end of a run. Persistence backends live outside the engine; the crate
//! ships [`MemoryStore`] as the in-process reference implementation.

pub mod memory;

pub use memory::MemoryStore;

use crate::models::{Collection, Environment, Globals, Item, VarValue};
use std::collections::BTreeMap;

/// Read/write contract the engine requires from a persistence backend.
///
/// Environment updates use read-modify-write semantics with no optimistic
/// locking: concurrent runs writing to the same environment race and the last
/// write wins.
pub trait DocumentStore: Send + Sync {
    /// Looks up an item (folder or request) by id.
    fn get_item(&self, id: &str) -> Option<Item>;

    /// Looks up a collection by id.
    fn get_collection(&self, id: &str) -> Option<Collection>;

    /// Looks up an environment by id.
    fn get_environment(&self, id: &str) -> Option<Environment>;

    /// Returns the globals document, or its empty default when none exists.
    fn get_globals(&self) -> Globals;

    /// Replaces an environment's values map. A missing environment is a no-op.
    fn update_environment(&self, id: &str, values: BTreeMap<String, VarValue>);
}
