//! Index memory: per-key buckets plus the undefined-key bucket.
//!
//! Design:
//! - One `RwLock` guards the buckets and the ledger of one index together
//! - Every insert relocates: an id already stored is removed first
//! - Buckets emptied by a removal are dropped, so `keys()` only lists
//!   keys that currently hold entities

use super::key::{IndexKey, KeyValue};
use super::ledger::{BucketStore, IndexationLedger};
use super::sorted::{RankComparer, SortedMemory};
use crate::entity::Entity;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Keyed buckets and the undefined bucket of one index.
pub struct BucketLists<E: Entity, K> {
    keyed: AHashMap<K, Vec<Arc<E>>>,
    undefined: Vec<Arc<E>>,
}

impl<E: Entity, K: KeyValue> BucketStore<IndexKey<K>> for BucketLists<E, K> {
    type Entity = E;

    fn bucket_mut(&mut self, slot: &IndexKey<K>) -> Option<&mut Vec<Arc<E>>> {
        match slot {
            IndexKey::Defined(key) => self.keyed.get_mut(key),
            IndexKey::Undefined => Some(&mut self.undefined),
        }
    }

    fn on_emptied(&mut self, slot: &IndexKey<K>) {
        if let IndexKey::Defined(key) = slot {
            self.keyed.remove(key);
        }
    }
}

/// Lock-guarded state of an index memory.
pub struct Buckets<E: Entity, K> {
    lists: BucketLists<E, K>,
    ledger: IndexationLedger<E::Id, IndexKey<K>>,
}

impl<E: Entity, K: KeyValue> Buckets<E, K> {
    pub fn new() -> Self {
        Self {
            lists: BucketLists {
                keyed: AHashMap::new(),
                undefined: Vec::new(),
            },
            ledger: IndexationLedger::new(),
        }
    }

    /// Store `entity` under `key` at the position chosen by `position`,
    /// moving it out of any bucket it occupied before.
    fn place<P>(&mut self, entity: Arc<E>, key: IndexKey<K>, position: P)
    where
        P: FnOnce(&[Arc<E>], &E) -> usize,
    {
        let id = entity.id();
        self.ledger.remove_if_present(&id, &mut self.lists);

        let bucket = match &key {
            IndexKey::Defined(k) => self.lists.keyed.entry(k.clone()).or_default(),
            IndexKey::Undefined => &mut self.lists.undefined,
        };
        let pos = position(bucket.as_slice(), &entity).min(bucket.len());
        bucket.insert(pos, entity);
        self.ledger.mark(id, key);
    }

    fn remove(&mut self, id: &E::Id) -> bool {
        self.ledger.remove_if_present(id, &mut self.lists).is_some()
    }

    fn bucket(&self, key: &IndexKey<K>) -> &[Arc<E>] {
        match key {
            IndexKey::Defined(k) => self.lists.keyed.get(k).map(Vec::as_slice).unwrap_or(&[]),
            IndexKey::Undefined => &self.lists.undefined,
        }
    }

    fn clear(&mut self) {
        self.lists.keyed.clear();
        self.lists.undefined.clear();
        self.ledger.clear();
    }
}

impl<E: Entity, K: KeyValue> Default for Buckets<E, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage behind one index. Implementations only decide where a new
/// entity goes inside its bucket; locking and bookkeeping are shared.
pub trait IndexMemory<E: Entity, K: KeyValue>: Send + Sync {
    fn buckets(&self) -> &RwLock<Buckets<E, K>>;

    /// Insertion position of `entity` inside `bucket`.
    fn position(&self, bucket: &[Arc<E>], entity: &E) -> usize;

    fn is_sorted(&self) -> bool {
        false
    }

    fn insert(&self, entity: Arc<E>, key: K) {
        self.store(entity, IndexKey::Defined(key));
    }

    fn insert_with_undefined_key(&self, entity: Arc<E>) {
        self.store(entity, IndexKey::Undefined);
    }

    /// Remove-then-insert under one write lock.
    fn store(&self, entity: Arc<E>, key: IndexKey<K>) {
        let mut buckets = self.buckets().write();
        buckets.place(entity, key, |bucket, e| self.position(bucket, e));
    }

    fn remove_if_stored(&self, id: &E::Id) -> bool {
        self.buckets().write().remove(id)
    }

    /// Discard everything and refill from `entries` without releasing the
    /// write lock in between. Returns the number of entities stored.
    fn rebuild_from(&self, entries: &mut dyn Iterator<Item = (Arc<E>, IndexKey<K>)>) -> usize {
        let mut buckets = self.buckets().write();
        buckets.clear();
        for (entity, key) in entries {
            buckets.place(entity, key, |bucket, e| self.position(bucket, e));
        }
        buckets.ledger.len()
    }

    fn keys(&self) -> Vec<K> {
        self.buckets().read().lists.keyed.keys().cloned().collect()
    }

    fn indexed_with_key(&self, key: &K) -> Vec<Arc<E>> {
        let buckets = self.buckets().read();
        buckets.lists.keyed.get(key).cloned().unwrap_or_default()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.buckets().read().lists.keyed.contains_key(key)
    }

    fn indexed_with_undefined_key(&self) -> Vec<Arc<E>> {
        self.buckets().read().lists.undefined.clone()
    }

    fn ids_with(&self, key: &IndexKey<K>) -> Vec<E::Id> {
        let buckets = self.buckets().read();
        buckets.bucket(key).iter().map(|e| e.id()).collect()
    }

    /// Ids of every entity whose key satisfies `accept`, read under a
    /// single read lock.
    fn ids_matching(&self, accept: &dyn Fn(&K) -> bool) -> Vec<E::Id> {
        let buckets = self.buckets().read();
        buckets
            .lists
            .keyed
            .iter()
            .filter(|(key, _)| accept(key))
            .flat_map(|(_, bucket)| bucket.iter().map(|e| e.id()))
            .collect()
    }

    fn slot_of(&self, id: &E::Id) -> Option<IndexKey<K>> {
        self.buckets().read().ledger.slot_of(id).cloned()
    }

    fn len(&self) -> usize {
        self.buckets().read().ledger.len()
    }

    fn clear(&self) {
        self.buckets().write().clear();
    }
}

/// Buckets kept in insertion order.
pub struct UnorderedMemory<E: Entity, K> {
    buckets: RwLock<Buckets<E, K>>,
}

impl<E: Entity, K: KeyValue> UnorderedMemory<E, K> {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(Buckets::new()),
        }
    }
}

impl<E: Entity, K: KeyValue> Default for UnorderedMemory<E, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity, K: KeyValue> IndexMemory<E, K> for UnorderedMemory<E, K> {
    fn buckets(&self) -> &RwLock<Buckets<E, K>> {
        &self.buckets
    }

    fn position(&self, bucket: &[Arc<E>], _entity: &E) -> usize {
        bucket.len()
    }
}

/// Bucket ordering of an index, fixed at declaration.
pub enum MemoryLayout<E> {
    /// Insertion order (hashed buckets only)
    Unordered,
    /// Each bucket ordered by a ranking comparator
    Sorted(RankComparer<E>),
}

impl<E> Clone for MemoryLayout<E> {
    fn clone(&self) -> Self {
        match self {
            MemoryLayout::Unordered => MemoryLayout::Unordered,
            MemoryLayout::Sorted(comparer) => MemoryLayout::Sorted(comparer.clone()),
        }
    }
}

impl<E> std::fmt::Debug for MemoryLayout<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryLayout::Unordered => f.write_str("Unordered"),
            MemoryLayout::Sorted(comparer) => write!(f, "Sorted({:?})", comparer.order()),
        }
    }
}

/// Create the index memory for a layout.
pub fn create_memory<E: Entity, K: KeyValue>(layout: &MemoryLayout<E>) -> Box<dyn IndexMemory<E, K>> {
    match layout {
        MemoryLayout::Unordered => Box::new(UnorderedMemory::new()),
        MemoryLayout::Sorted(comparer) => Box::new(SortedMemory::new(comparer.clone())),
    }
}
