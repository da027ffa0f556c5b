//! Indexation ledger: entity id -> bucket slot it currently occupies.
//!
//! Removing an entity from an index needs no knowledge of the key it was
//! stored under: the ledger remembers the slot, and the bucket is found in
//! O(1). An id is recorded under at most one slot at a time.

use crate::entity::Entity;
use ahash::AHashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Storage that can hand out the bucket behind a ledger slot.
pub trait BucketStore<S> {
    type Entity: Entity;

    fn bucket_mut(&mut self, slot: &S) -> Option<&mut Vec<Arc<Self::Entity>>>;

    /// Called after a removal left the bucket behind `slot` empty.
    fn on_emptied(&mut self, _slot: &S) {}
}

pub struct IndexationLedger<Id, S> {
    slots: AHashMap<Id, S>,
}

impl<Id: Eq + Hash, S> IndexationLedger<Id, S> {
    pub fn new() -> Self {
        Self {
            slots: AHashMap::new(),
        }
    }

    /// Record that `id` now lives in `slot`, replacing any earlier record.
    /// The entity must already be in the bucket.
    pub fn mark(&mut self, id: Id, slot: S) {
        self.slots.insert(id, slot);
    }

    pub fn slot_of(&self, id: &Id) -> Option<&S> {
        self.slots.get(id)
    }

    /// Remove `id` from the bucket recorded for it and forget the record.
    /// Returns the slot it was removed from; unknown ids are a no-op.
    pub fn remove_if_present<B>(&mut self, id: &Id, buckets: &mut B) -> Option<S>
    where
        B: BucketStore<S>,
        B::Entity: Entity<Id = Id>,
    {
        let slot = self.slots.remove(id)?;
        let emptied = match buckets.bucket_mut(&slot) {
            Some(bucket) => {
                bucket.retain(|entity| &entity.id() != id);
                bucket.is_empty()
            }
            None => false,
        };
        if emptied {
            buckets.on_emptied(&slot);
        }
        Some(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl<Id: Eq + Hash, S> Default for IndexationLedger<Id, S> {
    fn default() -> Self {
        Self::new()
    }
}
