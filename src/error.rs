//! Error types for store, index and query operations.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to callers. Key-function failures never show up here:
/// they are absorbed as undefined keys by [`IndexKey::determine`].
///
/// [`IndexKey::determine`]: crate::index::IndexKey::determine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A caller passed an input the operation cannot accept
    /// (e.g. the undefined key to a keyed lookup).
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    /// Lookup by id through a non-`try` accessor found nothing.
    #[error("entity {id} not found")]
    EntityNotFound { id: String },

    /// The referenced index was never declared on the store and no
    /// temporary index was requested.
    #[error("index '{name}' was not registered")]
    IndexNotFound { name: String },
}

impl Error {
    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn entity_not_found(id: &impl std::fmt::Debug) -> Error {
        Error::EntityNotFound {
            id: format!("{id:?}"),
        }
    }

    pub fn index_not_found(name: impl Into<String>) -> Error {
        Error::IndexNotFound { name: name.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::EntityNotFound { .. } | Error::IndexNotFound { .. })
    }
}
