//! Store configuration.
//!
//! # Example
//! ```ignore
//! use entcache::StoreConfig;
//!
//! let config = StoreConfig::default()
//!     .initial_capacity(10_000)
//!     .temporary_indexes(true);
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tuning knobs applied when a store is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Entities the canonical map is pre-sized for
    pub initial_capacity: usize,
    /// Shard count of the canonical map (power of two, > 1); `None` keeps
    /// the map's default
    pub shard_amount: Option<usize>,
    /// Whether queries created by the store fall back to temporary indexes
    /// for undeclared definitions
    pub temporary_indexes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            shard_amount: None,
            temporary_indexes: false,
        }
    }
}

impl StoreConfig {
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn shard_amount(mut self, shards: usize) -> Self {
        self.shard_amount = Some(shards);
        self
    }

    pub fn temporary_indexes(mut self, enabled: bool) -> Self {
        self.temporary_indexes = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.shard_amount {
            Some(shards) if shards <= 1 || !shards.is_power_of_two() => Err(Error::invalid_arg(
                "shard_amount",
                format!("{shards} is not a power of two greater than one"),
            )),
            _ => Ok(()),
        }
    }
}
