//! Grid index: two key functions, one bucket per (first, second) cell.
//!
//! Cells are reachable from either axis: each axis keeps the set of
//! opposite keys it currently shares a cell with, so lookups by one key do
//! not scan the whole grid. Either key may be undefined, which gives the
//! lookup shapes "first undefined", "second undefined" and "both undefined".

use super::key::{IndexKey, KeyFn, KeyValue};
use super::ledger::{BucketStore, IndexationLedger};
use super::AttachedIndex;
use crate::definition::GridDefinition;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::store::EntityMap;
use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

type Cell<X, Y> = (IndexKey<X>, IndexKey<Y>);

struct GridCells<E, X, Y> {
    cells: AHashMap<Cell<X, Y>, Vec<Arc<E>>>,
    by_first: AHashMap<IndexKey<X>, AHashSet<IndexKey<Y>>>,
    by_second: AHashMap<IndexKey<Y>, AHashSet<IndexKey<X>>>,
}

impl<E: Entity, X: KeyValue, Y: KeyValue> BucketStore<Cell<X, Y>> for GridCells<E, X, Y> {
    type Entity = E;

    fn bucket_mut(&mut self, slot: &Cell<X, Y>) -> Option<&mut Vec<Arc<E>>> {
        self.cells.get_mut(slot)
    }

    fn on_emptied(&mut self, slot: &Cell<X, Y>) {
        let (x, y) = slot;
        self.cells.remove(slot);
        if let Some(ys) = self.by_first.get_mut(x) {
            ys.remove(y);
            if ys.is_empty() {
                self.by_first.remove(x);
            }
        }
        if let Some(xs) = self.by_second.get_mut(y) {
            xs.remove(x);
            if xs.is_empty() {
                self.by_second.remove(y);
            }
        }
    }
}

struct GridState<E: Entity, X, Y> {
    grid: GridCells<E, X, Y>,
    ledger: IndexationLedger<E::Id, Cell<X, Y>>,
}

impl<E: Entity, X: KeyValue, Y: KeyValue> GridState<E, X, Y> {
    fn new() -> Self {
        Self {
            grid: GridCells {
                cells: AHashMap::new(),
                by_first: AHashMap::new(),
                by_second: AHashMap::new(),
            },
            ledger: IndexationLedger::new(),
        }
    }

    fn place(&mut self, entity: Arc<E>, cell: Cell<X, Y>) {
        let id = entity.id();
        self.ledger.remove_if_present(&id, &mut self.grid);

        let (x, y) = &cell;
        self.grid.by_first.entry(x.clone()).or_default().insert(y.clone());
        self.grid.by_second.entry(y.clone()).or_default().insert(x.clone());
        self.grid.cells.entry(cell.clone()).or_default().push(entity);
        self.ledger.mark(id, cell);
    }

    fn cell(&self, cell: &Cell<X, Y>) -> Vec<Arc<E>> {
        self.grid.cells.get(cell).cloned().unwrap_or_default()
    }

    fn clear(&mut self) {
        self.grid.cells.clear();
        self.grid.by_first.clear();
        self.grid.by_second.clear();
        self.ledger.clear();
    }
}

/// Index keyed by two key functions.
pub struct GridIndex<E: Entity, X, Y> {
    name: Arc<str>,
    first: KeyFn<E, X>,
    second: KeyFn<E, Y>,
    state: RwLock<GridState<E, X, Y>>,
    items: Arc<EntityMap<E>>,
}

fn required<K>(key: Option<K>, name: &str) -> Result<K> {
    key.ok_or_else(|| Error::invalid_arg(name, "the undefined key has a dedicated accessor"))
}

impl<E: Entity, X: KeyValue, Y: KeyValue> GridIndex<E, X, Y> {
    pub(crate) fn new(definition: &GridDefinition<E, X, Y>, items: Arc<EntityMap<E>>) -> Self {
        Self {
            name: definition.shared_name(),
            first: Arc::clone(definition.first_key_fn()),
            second: Arc::clone(definition.second_key_fn()),
            state: RwLock::new(GridState::new()),
            items,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_on(&self, name: &str) -> bool {
        &*self.name == name
    }

    fn determine_cell(&self, entity: &E) -> Cell<X, Y> {
        (
            IndexKey::determine(&*self.first, entity),
            IndexKey::determine(&*self.second, entity),
        )
    }

    pub fn add_or_update(&self, entity: &Arc<E>) {
        let cell = self.determine_cell(entity);
        self.state.write().place(Arc::clone(entity), cell);
    }

    pub fn try_remove(&self, id: &E::Id) -> bool {
        let mut state = self.state.write();
        let GridState { grid, ledger } = &mut *state;
        ledger.remove_if_present(id, grid).is_some()
    }

    pub fn rebuild(&self) {
        let mut state = self.state.write();
        state.clear();
        for entry in self.items.iter() {
            let entity = Arc::clone(entry.value());
            let cell = self.determine_cell(&entity);
            state.place(entity, cell);
        }
        debug!(index = %self.name, entities = state.ledger.len(), "rebuilt grid index");
    }

    pub fn clear(&self) {
        self.state.write().clear();
    }

    /// Entities whose first key is `first` and second key is `second`.
    pub fn get(&self, first: impl Into<Option<X>>, second: impl Into<Option<Y>>) -> Result<Vec<Arc<E>>> {
        let first = required(first.into(), "first")?;
        let second = required(second.into(), "second")?;
        Ok(self.state.read().cell(&(IndexKey::Defined(first), IndexKey::Defined(second))))
    }

    /// Entities whose first key is `first`, whatever their second key.
    pub fn get_from_first(&self, first: impl Into<Option<X>>) -> Result<Vec<Arc<E>>> {
        let x = IndexKey::Defined(required(first.into(), "first")?);
        let state = self.state.read();
        let Some(ys) = state.grid.by_first.get(&x) else {
            return Ok(Vec::new());
        };
        Ok(ys
            .iter()
            .flat_map(|y| state.grid.cells.get(&(x.clone(), y.clone())))
            .flatten()
            .cloned()
            .collect())
    }

    /// Entities whose second key is `second`, whatever their first key.
    pub fn get_from_second(&self, second: impl Into<Option<Y>>) -> Result<Vec<Arc<E>>> {
        let y = IndexKey::Defined(required(second.into(), "second")?);
        let state = self.state.read();
        let Some(xs) = state.grid.by_second.get(&y) else {
            return Ok(Vec::new());
        };
        Ok(xs
            .iter()
            .flat_map(|x| state.grid.cells.get(&(x.clone(), y.clone())))
            .flatten()
            .cloned()
            .collect())
    }

    pub fn get_with_first_undefined(&self, second: impl Into<Option<Y>>) -> Result<Vec<Arc<E>>> {
        let second = required(second.into(), "second")?;
        Ok(self.state.read().cell(&(IndexKey::Undefined, IndexKey::Defined(second))))
    }

    pub fn get_with_second_undefined(&self, first: impl Into<Option<X>>) -> Result<Vec<Arc<E>>> {
        let first = required(first.into(), "first")?;
        Ok(self.state.read().cell(&(IndexKey::Defined(first), IndexKey::Undefined)))
    }

    pub fn get_with_both_undefined(&self) -> Vec<Arc<E>> {
        self.state.read().cell(&(IndexKey::Undefined, IndexKey::Undefined))
    }

    /// Defined first keys currently holding entities.
    pub fn first_keys(&self) -> Vec<X> {
        let state = self.state.read();
        state.grid.by_first.keys().filter_map(|x| x.as_defined().cloned()).collect()
    }

    /// Defined second keys currently holding entities.
    pub fn second_keys(&self) -> Vec<Y> {
        let state = self.state.read();
        state.grid.by_second.keys().filter_map(|y| y.as_defined().cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Entity, X: KeyValue, Y: KeyValue> AttachedIndex<E> for GridIndex<E, X, Y> {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_or_update(&self, entity: &Arc<E>) {
        GridIndex::add_or_update(self, entity);
    }

    fn try_remove(&self, id: &E::Id) {
        GridIndex::try_remove(self, id);
    }

    fn rebuild(&self) {
        GridIndex::rebuild(self);
    }

    fn clear(&self) {
        GridIndex::clear(self);
    }

    fn len(&self) -> usize {
        GridIndex::len(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
