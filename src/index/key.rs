//! Index key determination.
//!
//! Key functions commonly walk optional paths ("the owner's city"), so a
//! missing link or a panic inside the function is not an error: the entity
//! is simply indexed under the undefined key.

use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Key extraction function shared by an index and its definition.
pub type KeyFn<E, K> = Arc<dyn Fn(&E) -> Option<K> + Send + Sync>;

/// Bounds every index key type has to satisfy.
pub trait KeyValue: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> KeyValue for T {}

/// Classified result of applying a key function to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey<K> {
    Defined(K),
    Undefined,
}

impl<K> IndexKey<K> {
    /// Evaluate `key_fn` against `entity`.
    ///
    /// This is the single place where key-function faults are caught:
    /// `None` and a panic both yield [`IndexKey::Undefined`].
    pub fn determine<E>(key_fn: &(dyn Fn(&E) -> Option<K> + Send + Sync), entity: &E) -> Self {
        match panic::catch_unwind(AssertUnwindSafe(|| key_fn(entity))) {
            Ok(Some(key)) => IndexKey::Defined(key),
            Ok(None) => IndexKey::Undefined,
            Err(_) => {
                tracing::debug!("key function panicked, indexing entity under the undefined key");
                IndexKey::Undefined
            }
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, IndexKey::Defined(_))
    }

    pub fn as_defined(&self) -> Option<&K> {
        match self {
            IndexKey::Defined(key) => Some(key),
            IndexKey::Undefined => None,
        }
    }

    pub fn into_defined(self) -> Option<K> {
        match self {
            IndexKey::Defined(key) => Some(key),
            IndexKey::Undefined => None,
        }
    }
}

impl<K> From<Option<K>> for IndexKey<K> {
    fn from(value: Option<K>) -> Self {
        match value {
            Some(key) => IndexKey::Defined(key),
            None => IndexKey::Undefined,
        }
    }
}
