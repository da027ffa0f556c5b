use crate::builder::{IndexFactory, StoreBuilder};
use crate::config::StoreConfig;
use crate::definition::{GridDefinition, IndexDefinition};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::index::{AttachedIndex, GridIndex, Index, KeyValue};
use crate::query::Query;
use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, trace};

/// Canonical id -> entity map shared by a store and its indexes.
pub type EntityMap<E> = DashMap<<E as Entity>::Id, Arc<E>, ahash::RandomState>;

/// Entity store with transparently maintained secondary indexes.
///
/// Mutations update the canonical map first and are then fanned out to
/// every attached index in declaration order. Each index is consistent on
/// its own; there is no atomicity across indexes.
pub struct Store<E: Entity> {
    items: Arc<EntityMap<E>>,
    indexes: Vec<Arc<dyn AttachedIndex<E>>>,
    config: StoreConfig,
}

impl<E: Entity> Store<E> {
    pub fn builder() -> StoreBuilder<E> {
        StoreBuilder::new()
    }

    pub(crate) fn new(config: StoreConfig, factories: Vec<IndexFactory<E>>) -> Result<Self> {
        config.validate()?;
        let hasher = ahash::RandomState::new();
        let items = Arc::new(match config.shard_amount {
            Some(shards) => DashMap::with_capacity_and_hasher_and_shard_amount(config.initial_capacity, hasher, shards),
            None => DashMap::with_capacity_and_hasher(config.initial_capacity, hasher),
        });

        let indexes: Vec<Arc<dyn AttachedIndex<E>>> = factories.into_iter().map(|factory| factory(&items)).collect();
        debug!(
            indexes = indexes.len(),
            capacity = config.initial_capacity,
            "entity store created"
        );

        Ok(Self { items, indexes, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn items_map(&self) -> &Arc<EntityMap<E>> {
        &self.items
    }

    // --- Entities ---

    /// Insert or replace the entity with the same id, then re-index it.
    pub fn add_or_update(&self, entity: impl Into<Arc<E>>) {
        let entity = entity.into();
        self.items.insert(entity.id(), Arc::clone(&entity));
        for index in &self.indexes {
            index.add_or_update(&entity);
        }
    }

    /// Sequential `add_or_update`; earlier entities stay applied if a later
    /// one panics.
    pub fn add_or_update_range<I>(&self, entities: I)
    where
        I: IntoIterator,
        I::Item: Into<Arc<E>>,
    {
        for entity in entities {
            self.add_or_update(entity);
        }
    }

    /// Remove the entity from the store and every index. Unknown ids are a
    /// no-op. Returns the removed entity.
    pub fn remove(&self, id: &E::Id) -> Option<Arc<E>> {
        let removed = self.items.remove(id).map(|(_, entity)| entity);
        if removed.is_none() {
            trace!(?id, "remove of an absent entity");
        }
        for index in &self.indexes {
            index.try_remove(id);
        }
        removed
    }

    pub fn remove_range<'a, I>(&self, ids: I)
    where
        I: IntoIterator<Item = &'a E::Id>,
    {
        for id in ids {
            self.remove(id);
        }
    }

    pub fn remove_entities<'a, I>(&self, entities: I)
    where
        I: IntoIterator<Item = &'a E>,
    {
        for entity in entities {
            self.remove(&entity.id());
        }
    }

    pub fn get(&self, id: &E::Id) -> Result<Arc<E>> {
        self.try_get(id).ok_or_else(|| Error::entity_not_found(id))
    }

    pub fn try_get(&self, id: &E::Id) -> Option<Arc<E>> {
        self.items.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &E::Id) -> bool {
        self.items.contains_key(id)
    }

    /// Snapshot of every entity, in no particular order.
    pub fn items(&self) -> Vec<Arc<E>> {
        self.items.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every entity and empty every index.
    pub fn clear(&self) {
        self.items.clear();
        for index in &self.indexes {
            index.clear();
        }
    }

    // --- Indexes ---

    fn find(&self, name: &str) -> Option<&Arc<dyn AttachedIndex<E>>> {
        self.indexes.iter().find(|index| index.name() == name)
    }

    /// Resolve a declared index. A definition whose name is registered with
    /// a different key type is not found either.
    pub fn index<K: KeyValue>(&self, definition: &IndexDefinition<E, K>) -> Result<Arc<Index<E, K>>> {
        self.find(definition.name())
            .and_then(|index| Arc::clone(index).into_any().downcast::<Index<E, K>>().ok())
            .ok_or_else(|| Error::index_not_found(definition.name()))
    }

    pub fn contains_index_on<K: KeyValue>(&self, definition: &IndexDefinition<E, K>) -> bool {
        self.index(definition).is_ok()
    }

    pub fn grid_index<X: KeyValue, Y: KeyValue>(
        &self,
        definition: &GridDefinition<E, X, Y>,
    ) -> Result<Arc<GridIndex<E, X, Y>>> {
        self.find(definition.name())
            .and_then(|index| Arc::clone(index).into_any().downcast::<GridIndex<E, X, Y>>().ok())
            .ok_or_else(|| Error::index_not_found(definition.name()))
    }

    pub fn contains_grid_index_on<X: KeyValue, Y: KeyValue>(&self, definition: &GridDefinition<E, X, Y>) -> bool {
        self.grid_index(definition).is_ok()
    }

    /// Names of the attached indexes in declaration order.
    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.iter().map(|index| index.name()).collect()
    }

    /// Rebuild every index from the current entities, in declaration order.
    /// Needed after entity fields were changed without going through the
    /// store.
    pub fn rebuild_indexes(&self) {
        for index in &self.indexes {
            index.rebuild();
        }
    }

    /// Same as [`Store::rebuild_indexes`], with indexes rebuilt
    /// concurrently on the rayon pool.
    pub fn rebuild_indexes_parallel(&self) {
        self.indexes.par_iter().for_each(|index| index.rebuild());
    }

    // --- Queries ---

    pub fn query(&self) -> Query<'_, E> {
        Query::new(self, self.config.temporary_indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SortOrder;

    #[derive(Debug, Clone, PartialEq)]
    struct Dog {
        id: u32,
        name: &'static str,
        breed: Option<&'static str>,
        age: u32,
    }

    impl Entity for Dog {
        type Id = u32;
        fn id(&self) -> u32 {
            self.id
        }
    }

    fn dog(id: u32, name: &'static str, breed: Option<&'static str>, age: u32) -> Dog {
        Dog { id, name, breed, age }
    }

    fn by_breed() -> IndexDefinition<Dog, &'static str> {
        IndexDefinition::new("breed", |d: &Dog| d.breed)
    }

    fn by_age() -> IndexDefinition<Dog, u32> {
        IndexDefinition::sorted("age", |d: &Dog| Some(d.age), |d: &Dog| d.name, SortOrder::Ascending)
    }

    fn setup() -> Store<Dog> {
        Store::builder()
            .with_index(&by_breed())
            .with_index(&by_age())
            .build()
            .unwrap()
    }

    fn ids(dogs: &[Arc<Dog>]) -> Vec<u32> {
        let mut ids: Vec<u32> = dogs.iter().map(|d| d.id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_add_get_remove() {
        let store = setup();
        store.add_or_update(dog(1, "tony", Some("husky"), 3));

        assert!(store.contains(&1));
        assert_eq!(store.get(&1).unwrap().name, "tony");
        assert_eq!(store.try_get(&2), None);
        assert!(matches!(store.get(&2), Err(Error::EntityNotFound { .. })));

        let removed = store.remove(&1).unwrap();
        assert_eq!(removed.name, "tony");
        assert!(!store.contains(&1));
        assert!(store.remove(&1).is_none());
        assert!(store.index(&by_breed()).unwrap().is_empty());
        assert!(store.index(&by_age()).unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_bucket_references() {
        let store = setup();
        store.add_or_update(dog(1, "tony", Some("husky"), 3));
        store.add_or_update(dog(1, "tony the second", Some("husky"), 3));

        let huskies = store.index(&by_breed()).unwrap().get("husky").unwrap();
        assert_eq!(huskies.len(), 1);
        assert_eq!(huskies[0].name, "tony the second");
        assert!(Arc::ptr_eq(&huskies[0], &store.get(&1).unwrap()));
    }

    #[test]
    fn test_index_resolution() {
        let store = setup();

        assert!(store.contains_index_on(&by_breed()));
        assert!(!store.contains_index_on(&IndexDefinition::new("name", |d: &Dog| Some(d.name))));
        assert!(matches!(
            store.index(&IndexDefinition::new("color", |d: &Dog| d.breed)),
            Err(Error::IndexNotFound { .. })
        ));
        // Same name, different key type.
        assert!(!store.contains_index_on(&IndexDefinition::new("breed", |d: &Dog| Some(d.age))));
        assert_eq!(store.index_names(), vec!["breed", "age"]);
    }

    #[test]
    fn test_ranges_and_clear() {
        let store = setup();
        store.add_or_update_range(vec![
            dog(1, "a", Some("husky"), 1),
            dog(2, "b", Some("pug"), 2),
            dog(3, "c", None, 3),
        ]);
        assert_eq!(store.len(), 3);
        assert_eq!(ids(&store.items()), vec![1, 2, 3]);

        store.remove_range(&[1, 9]);
        assert_eq!(ids(&store.items()), vec![2, 3]);

        let pug = store.get(&2).unwrap();
        store.remove_entities([pug.as_ref()]);
        assert_eq!(ids(&store.items()), vec![3]);

        store.clear();
        assert!(store.is_empty());
        assert!(store.index(&by_breed()).unwrap().get_with_undefined().is_empty());
    }

    #[test]
    fn test_parallel_rebuild_matches_sequential() {
        let store = setup();
        store.add_or_update_range((0..200).map(|i| dog(i, "n", if i % 3 == 0 { None } else { Some("husky") }, i % 7)));

        let breed = store.index(&by_breed()).unwrap();
        breed.clear();
        assert!(breed.is_empty());

        store.rebuild_indexes_parallel();
        assert_eq!(breed.len(), 200);
        assert_eq!(breed.get_with_undefined().len(), 67);
        assert_eq!(store.index(&by_age()).unwrap().keys().len(), 7);
    }
}
