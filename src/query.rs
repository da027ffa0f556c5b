//! Multi-index queries.
//!
//! A query is a conjunction of constraints, each resolved against one index
//! as soon as it is added. The first constraint seeds the candidate ids; every
//! later one drops candidates it does not match.
//!
//! ```ignore
//! let dogs = store
//!     .query()
//!     .where_eq(&by_breed, "husky")?
//!     .where_matches(&by_age, |age| *age < 5)?
//!     .to_vec();
//! ```

use crate::definition::IndexDefinition;
use crate::entity::Entity;
use crate::error::Result;
use crate::index::{Index, KeyValue};
use crate::store::Store;
use ahash::AHashSet;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// What a constraint selected on its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintShape {
    /// Keys accepted by a predicate
    Matches,
    /// One exact key
    Equals,
    /// The undefined bucket
    Undefined,
}

/// Execution report for one constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintReport {
    pub index: String,
    pub shape: ConstraintShape,
    /// Whether the index was built on the fly for this constraint
    pub temporary: bool,
    /// Ids the index returned
    pub matched: usize,
    /// Candidates left after applying the constraint
    pub remaining: usize,
    pub time_us: u64,
}

/// Conjunctive query over a store's indexes.
pub struct Query<'s, E: Entity> {
    store: &'s Store<E>,
    candidates: Option<Vec<E::Id>>,
    temporary_indexes: bool,
    reports: SmallVec<[ConstraintReport; 4]>,
}

impl<'s, E: Entity> Query<'s, E> {
    pub(crate) fn new(store: &'s Store<E>, temporary_indexes: bool) -> Self {
        Self {
            store,
            candidates: None,
            temporary_indexes,
            reports: SmallVec::new(),
        }
    }

    /// Build throwaway indexes for definitions the store never declared
    /// instead of failing with `IndexNotFound`.
    pub fn use_temporary_indexes(mut self) -> Self {
        self.temporary_indexes = true;
        self
    }

    /// Keep entities whose key on `definition` satisfies `accept`.
    /// Entities with an undefined key never match.
    pub fn where_matches<K, F>(self, definition: &IndexDefinition<E, K>, accept: F) -> Result<Self>
    where
        K: KeyValue,
        F: Fn(&K) -> bool,
    {
        self.constrain(definition, ConstraintShape::Matches, |index| index.ids_matching(&accept))
    }

    /// Keep entities stored under exactly `key`.
    pub fn where_eq<K: KeyValue>(self, definition: &IndexDefinition<E, K>, key: K) -> Result<Self> {
        self.constrain(definition, ConstraintShape::Equals, |index| index.ids_with_key(&key))
    }

    /// Keep entities whose key on `definition` is undefined.
    pub fn where_undefined<K: KeyValue>(self, definition: &IndexDefinition<E, K>) -> Result<Self> {
        self.constrain(definition, ConstraintShape::Undefined, |index| index.ids_with_undefined_key())
    }

    fn constrain<K, F>(mut self, definition: &IndexDefinition<E, K>, shape: ConstraintShape, select: F) -> Result<Self>
    where
        K: KeyValue,
        F: FnOnce(&Index<E, K>) -> Vec<E::Id>,
    {
        let start = Instant::now();
        let (index, temporary) = self.resolve(definition)?;
        let ids = select(index.as_ref());
        let matched = ids.len();

        let candidates = match self.candidates.take() {
            None => ids,
            Some(mut candidates) => {
                let accepted: AHashSet<E::Id> = ids.into_iter().collect();
                candidates.retain(|id| accepted.contains(id));
                candidates
            }
        };

        self.reports.push(ConstraintReport {
            index: definition.name().to_string(),
            shape,
            temporary,
            matched,
            remaining: candidates.len(),
            time_us: start.elapsed().as_micros() as u64,
        });
        self.candidates = Some(candidates);
        Ok(self)
    }

    fn resolve<K: KeyValue>(&self, definition: &IndexDefinition<E, K>) -> Result<(Arc<Index<E, K>>, bool)> {
        match self.store.index(definition) {
            Ok(index) => Ok((index, false)),
            Err(err) if err.is_not_found() && self.temporary_indexes => {
                let index = Index::new(definition, Arc::clone(self.store.items_map()));
                index.rebuild();
                debug!(index = definition.name(), entities = index.len(), "built temporary index");
                Ok((Arc::new(index), true))
            }
            Err(err) => Err(err),
        }
    }

    /// Matching ids, in the first constraint's order.
    pub fn ids(&self) -> Vec<E::Id> {
        self.candidates.clone().unwrap_or_default()
    }

    /// Matching entities resolved lazily against the store. Ids removed
    /// from the store since the query ran are skipped.
    pub fn iter(&self) -> impl Iterator<Item = Arc<E>> + '_ {
        self.candidates
            .iter()
            .flatten()
            .filter_map(move |id| self.store.try_get(id))
    }

    pub fn to_vec(&self) -> Vec<Arc<E>> {
        self.iter().collect()
    }

    /// Number of matching entities still present in the store, as yielded
    /// by [`Query::iter`]. May be less than `ids().len()` when entities were
    /// removed after the query ran.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// One report per constraint, in the order they were applied.
    pub fn explain(&self) -> &[ConstraintReport] {
        &self.reports
    }
}
