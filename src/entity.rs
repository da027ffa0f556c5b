//! The indexed record contract.

use std::fmt::Debug;
use std::hash::Hash;

/// A record with a unique, stable identifier.
///
/// The store never mutates entity contents. Index keys are derived by
/// applying caller-supplied functions to `&Self`, so types whose fields can
/// change in place (interior mutability) must be re-indexed with
/// [`Store::rebuild_indexes`](crate::Store::rebuild_indexes).
pub trait Entity: Send + Sync + 'static {
    type Id: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}
