// entcache v0.4.0 - In-Process Entity Store with Secondary Indexes
// Unordered, sorted and grid indexes kept in step with every mutation

pub mod builder;
pub mod config;
pub mod definition;
pub mod entity;
pub mod error;
pub mod index;
pub mod query;
pub mod store;

// Re-export main types
pub use builder::StoreBuilder;
pub use config::StoreConfig;
pub use definition::{GridDefinition, IndexDefinition};
pub use entity::Entity;
pub use error::{Error, Result};
pub use index::{GridIndex, Index, IndexKey, SortOrder};
pub use query::{ConstraintReport, ConstraintShape, Query};
pub use store::Store;
