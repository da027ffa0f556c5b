//! Store construction.

use crate::config::StoreConfig;
use crate::definition::{GridDefinition, IndexDefinition};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::index::{AttachedIndex, GridIndex, Index, KeyValue};
use crate::store::{EntityMap, Store};
use std::sync::Arc;

/// Deferred index construction, run once the entity map exists.
pub(crate) type IndexFactory<E> = Box<dyn FnOnce(&Arc<EntityMap<E>>) -> Arc<dyn AttachedIndex<E>> + Send>;

/// Collects index declarations, then creates the store.
///
/// # Example
/// ```ignore
/// let by_breed = IndexDefinition::new("breed", |d: &Dog| d.breed.clone());
/// let store = Store::builder()
///     .config(StoreConfig::default().initial_capacity(1_000))
///     .with_index(&by_breed)
///     .build()?;
/// ```
pub struct StoreBuilder<E: Entity> {
    config: StoreConfig,
    names: Vec<Arc<str>>,
    factories: Vec<IndexFactory<E>>,
}

impl<E: Entity> StoreBuilder<E> {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            names: Vec::new(),
            factories: Vec::new(),
        }
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Declare an unordered or sorted index, depending on the definition.
    pub fn with_index<K: KeyValue>(mut self, definition: &IndexDefinition<E, K>) -> Self {
        let definition = definition.clone();
        self.names.push(definition.shared_name());
        self.factories.push(Box::new(move |items: &Arc<EntityMap<E>>| {
            Arc::new(Index::new(&definition, Arc::clone(items))) as Arc<dyn AttachedIndex<E>>
        }));
        self
    }

    pub fn with_grid_index<X: KeyValue, Y: KeyValue>(mut self, definition: &GridDefinition<E, X, Y>) -> Self {
        let definition = definition.clone();
        self.names.push(definition.shared_name());
        self.factories.push(Box::new(move |items: &Arc<EntityMap<E>>| {
            Arc::new(GridIndex::new(&definition, Arc::clone(items))) as Arc<dyn AttachedIndex<E>>
        }));
        self
    }

    /// Create the store. Fails on an invalid config or on two indexes
    /// declared under the same name.
    pub fn build(self) -> Result<Store<E>> {
        for (i, name) in self.names.iter().enumerate() {
            if self.names[..i].contains(name) {
                return Err(Error::invalid_arg(
                    "index",
                    format!("an index named '{name}' is already declared"),
                ));
            }
        }
        Store::new(self.config, self.factories)
    }

    /// Create the store and add an initial set of entities.
    pub fn build_with<I>(self, entities: I) -> Result<Store<E>>
    where
        I: IntoIterator,
        I::Item: Into<Arc<E>>,
    {
        let store = self.build()?;
        store.add_or_update_range(entities);
        Ok(store)
    }
}

impl<E: Entity> Default for StoreBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
