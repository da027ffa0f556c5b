//! Index declarations.
//!
//! A definition is the caller's handle on an index: it carries the
//! explicit name the store resolves by, the key function(s) and the bucket
//! layout. The same definition value is used to declare the index on the
//! builder, to look it up on the store, and to build a temporary index in a
//! query when it was never declared.

use crate::entity::Entity;
use crate::index::{KeyFn, KeyValue, MemoryLayout, RankComparer, SortOrder};
use std::fmt;
use std::sync::Arc;

/// Declaration of a one-key index.
pub struct IndexDefinition<E, K> {
    name: Arc<str>,
    key_fn: KeyFn<E, K>,
    layout: MemoryLayout<E>,
}

impl<E: Entity, K: KeyValue> IndexDefinition<E, K> {
    /// Unordered index: buckets keep insertion order.
    pub fn new<F>(name: &str, key_fn: F) -> Self
    where
        F: Fn(&E) -> Option<K> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            key_fn: Arc::new(key_fn),
            layout: MemoryLayout::Unordered,
        }
    }

    /// Sorted index: every bucket ordered by `rank` in `order`.
    pub fn sorted<F, R, G>(name: &str, key_fn: F, rank: G, order: SortOrder) -> Self
    where
        F: Fn(&E) -> Option<K> + Send + Sync + 'static,
        R: Ord,
        G: Fn(&E) -> R + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            key_fn: Arc::new(key_fn),
            layout: MemoryLayout::Sorted(RankComparer::by_rank(rank, order)),
        }
    }

    pub fn ascending<F, R, G>(name: &str, key_fn: F, rank: G) -> Self
    where
        F: Fn(&E) -> Option<K> + Send + Sync + 'static,
        R: Ord,
        G: Fn(&E) -> R + Send + Sync + 'static,
    {
        Self::sorted(name, key_fn, rank, SortOrder::Ascending)
    }

    pub fn descending<F, R, G>(name: &str, key_fn: F, rank: G) -> Self
    where
        F: Fn(&E) -> Option<K> + Send + Sync + 'static,
        R: Ord,
        G: Fn(&E) -> R + Send + Sync + 'static,
    {
        Self::sorted(name, key_fn, rank, SortOrder::Descending)
    }
}

impl<E, K> IndexDefinition<E, K> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn key_fn(&self) -> &KeyFn<E, K> {
        &self.key_fn
    }

    pub fn layout(&self) -> &MemoryLayout<E> {
        &self.layout
    }
}

impl<E, K> Clone for IndexDefinition<E, K> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            key_fn: Arc::clone(&self.key_fn),
            layout: self.layout.clone(),
        }
    }
}

impl<E, K> fmt::Debug for IndexDefinition<E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .finish()
    }
}

/// Declaration of a two-key (grid) index.
pub struct GridDefinition<E, X, Y> {
    name: Arc<str>,
    first: KeyFn<E, X>,
    second: KeyFn<E, Y>,
}

impl<E: Entity, X: KeyValue, Y: KeyValue> GridDefinition<E, X, Y> {
    pub fn new<F, G>(name: &str, first: F, second: G) -> Self
    where
        F: Fn(&E) -> Option<X> + Send + Sync + 'static,
        G: Fn(&E) -> Option<Y> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            first: Arc::new(first),
            second: Arc::new(second),
        }
    }
}

impl<E, X, Y> GridDefinition<E, X, Y> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn first_key_fn(&self) -> &KeyFn<E, X> {
        &self.first
    }

    pub fn second_key_fn(&self) -> &KeyFn<E, Y> {
        &self.second
    }
}

impl<E, X, Y> Clone for GridDefinition<E, X, Y> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            first: Arc::clone(&self.first),
            second: Arc::clone(&self.second),
        }
    }
}

impl<E, X, Y> fmt::Debug for GridDefinition<E, X, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridDefinition").field("name", &self.name).finish()
    }
}
