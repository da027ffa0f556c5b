//! Secondary indexes over the store's entities.
//!
//! Design:
//! - `Index`: one key function over an unordered or sorted memory
//! - `GridIndex`: two key functions, looked up by either or both keys
//! - Every update is remove-then-insert, so no diff of old/new keys is needed
//! - Entities whose key is missing (or whose key function panicked) live
//!   in a dedicated undefined bucket

mod grid;
mod key;
mod ledger;
mod memory;
mod sorted;

pub use grid::GridIndex;
pub use key::{IndexKey, KeyFn, KeyValue};
pub use ledger::{BucketStore, IndexationLedger};
pub use memory::{create_memory, Buckets, IndexMemory, MemoryLayout, UnorderedMemory};
pub use sorted::{RankComparer, SortOrder, SortedMemory};

use crate::definition::IndexDefinition;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::store::EntityMap;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

/// Type-erased view of an index attached to a store. The store fans every
/// mutation out through this trait.
pub trait AttachedIndex<E: Entity>: Send + Sync {
    fn name(&self) -> &str;

    fn add_or_update(&self, entity: &Arc<E>);

    fn try_remove(&self, id: &E::Id);

    fn rebuild(&self);

    fn clear(&self);

    /// Number of indexed entities.
    fn len(&self) -> usize;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Index with a single key function.
pub struct Index<E: Entity, K> {
    name: Arc<str>,
    key_fn: KeyFn<E, K>,
    memory: Box<dyn IndexMemory<E, K>>,
    items: Arc<EntityMap<E>>,
}

impl<E: Entity, K: KeyValue> Index<E, K> {
    /// Create an empty index bound to a store's entity map.
    pub(crate) fn new(definition: &IndexDefinition<E, K>, items: Arc<EntityMap<E>>) -> Self {
        Self {
            name: definition.shared_name(),
            key_fn: Arc::clone(definition.key_fn()),
            memory: create_memory(definition.layout()),
            items,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this index was declared under `name`.
    pub fn is_on(&self, name: &str) -> bool {
        &*self.name == name
    }

    pub fn is_sorted(&self) -> bool {
        self.memory.is_sorted()
    }

    pub fn determine_key(&self, entity: &E) -> IndexKey<K> {
        IndexKey::determine(&*self.key_fn, entity)
    }

    /// Remove the entity from wherever it is stored in this index and
    /// insert it under its current key.
    pub fn add_or_update(&self, entity: &Arc<E>) {
        let key = self.determine_key(entity);
        self.memory.store(Arc::clone(entity), key);
    }

    pub fn try_remove(&self, id: &E::Id) -> bool {
        self.memory.remove_if_stored(id)
    }

    /// Recompute every entry from the store's current entities. The memory
    /// stays write-locked for the whole scan.
    pub fn rebuild(&self) {
        let mut entries = self.items.iter().map(|entry| {
            let entity = Arc::clone(entry.value());
            let key = self.determine_key(&entity);
            (entity, key)
        });
        let count = self.memory.rebuild_from(&mut entries);
        debug!(index = %self.name, entities = count, "rebuilt index");
    }

    pub fn clear(&self) {
        self.memory.clear();
    }

    /// Entities stored under `key`. The undefined key is rejected; use
    /// [`Index::get_with_undefined`] for it.
    pub fn get(&self, key: impl Into<Option<K>>) -> Result<Vec<Arc<E>>> {
        match key.into() {
            Some(key) => Ok(self.memory.indexed_with_key(&key)),
            None => Err(Error::invalid_arg(
                "key",
                format!("index '{}' cannot be searched by the undefined key, use get_with_undefined", self.name),
            )),
        }
    }

    pub fn get_with_undefined(&self) -> Vec<Arc<E>> {
        self.memory.indexed_with_undefined_key()
    }

    /// Keys currently holding at least one entity.
    pub fn keys(&self) -> Vec<K> {
        self.memory.keys()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.memory.contains_key(key)
    }

    /// Key the entity is currently stored under, if it is indexed at all.
    pub fn key_of(&self, id: &E::Id) -> Option<IndexKey<K>> {
        self.memory.slot_of(id)
    }

    pub fn ids_with_key(&self, key: &K) -> Vec<E::Id> {
        self.memory.ids_with(&IndexKey::Defined(key.clone()))
    }

    pub fn ids_with_undefined_key(&self) -> Vec<E::Id> {
        self.memory.ids_with(&IndexKey::Undefined)
    }

    /// Ids stored under any key accepted by `accept`.
    pub fn ids_matching(&self, accept: &dyn Fn(&K) -> bool) -> Vec<E::Id> {
        self.memory.ids_matching(accept)
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Entity, K: KeyValue> AttachedIndex<E> for Index<E, K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_or_update(&self, entity: &Arc<E>) {
        Index::add_or_update(self, entity);
    }

    fn try_remove(&self, id: &E::Id) {
        Index::try_remove(self, id);
    }

    fn rebuild(&self) {
        Index::rebuild(self);
    }

    fn clear(&self) {
        Index::clear(self);
    }

    fn len(&self) -> usize {
        Index::len(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
