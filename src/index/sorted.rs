//! Sorted index memory.
//!
//! Same bucket contract as the unordered memory, but every bucket is kept
//! ordered by a ranking function. Inserts binary-search the bucket, with
//! fast paths for appending and prepending. The relative order of entities
//! with equal rank is whatever the search yields and is not guaranteed.
//! A ranking function that panics gives the entity no rank; unranked
//! entities sort after every ranked one.

use super::key::KeyValue;
use super::memory::{Buckets, IndexMemory};
use crate::entity::Entity;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Direction of a sorted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Compares entities by a ranking function in a fixed direction.
pub struct RankComparer<E> {
    compare: Arc<dyn Fn(&E, &E) -> Ordering + Send + Sync>,
    order: SortOrder,
}

impl<E: 'static> RankComparer<E> {
    pub fn by_rank<R, F>(rank: F, order: SortOrder) -> Self
    where
        R: Ord,
        F: Fn(&E) -> R + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(move |a: &E, b: &E| match (ranked(&rank, a), ranked(&rank, b)) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }),
            order,
        }
    }
}

/// Rank of `entity`, or `None` when the ranking function panics.
fn ranked<E, R>(rank: &impl Fn(&E) -> R, entity: &E) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(|| rank(entity))) {
        Ok(rank) => Some(rank),
        Err(_) => {
            tracing::trace!("ranking function panicked, treating entity as unranked");
            None
        }
    }
}

impl<E> RankComparer<E> {
    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn compare(&self, a: &E, b: &E) -> Ordering {
        let ordering = (self.compare)(a, b);
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }

    /// Position at which `item` keeps `sorted` ordered.
    pub fn insertion_point(&self, sorted: &[Arc<E>], item: &E) -> usize {
        let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
            return 0;
        };
        if self.compare(last, item) != Ordering::Greater {
            return sorted.len();
        }
        if self.compare(first, item) != Ordering::Less {
            return 0;
        }
        sorted
            .binary_search_by(|probe| self.compare(probe, item))
            .unwrap_or_else(|pos| pos)
    }
}

impl<E> Clone for RankComparer<E> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
            order: self.order,
        }
    }
}

/// Index memory whose buckets stay ordered by rank.
pub struct SortedMemory<E: Entity, K> {
    buckets: RwLock<Buckets<E, K>>,
    comparer: RankComparer<E>,
}

impl<E: Entity, K: KeyValue> SortedMemory<E, K> {
    pub fn new(comparer: RankComparer<E>) -> Self {
        Self {
            buckets: RwLock::new(Buckets::new()),
            comparer,
        }
    }

    pub fn order(&self) -> SortOrder {
        self.comparer.order()
    }
}

impl<E: Entity, K: KeyValue> IndexMemory<E, K> for SortedMemory<E, K> {
    fn buckets(&self) -> &RwLock<Buckets<E, K>> {
        &self.buckets
    }

    fn position(&self, bucket: &[Arc<E>], entity: &E) -> usize {
        self.comparer.insertion_point(bucket, entity)
    }

    fn is_sorted(&self) -> bool {
        true
    }
}
