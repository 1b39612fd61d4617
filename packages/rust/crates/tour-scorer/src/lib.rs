//! tour-scorer - Scorer settings store for the tour planner.
//!
//! Holds the per-category weights that personalize point-of-interest scoring:
//! - Clamped weights with defaults for every known category
//! - Durable JSON snapshots (memory, file, or Valkey slots)
//! - Cross-context reconciliation over a [`tour_events::StorageBroadcaster`]
//!
//! # Architecture
//!
//! ```text
//! set_weight / reset
//!      ↓ clamp to [min, max]
//! in-memory CategoryWeightMap
//!      ↓ persist()
//! DurableStorage.set_item(key, snapshot) ──→ StorageBroadcaster.publish()
//!                                                   ↓
//!                         sibling ScorerStore.handle_storage_event()
//! ```
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tour_scorer::{MemoryStorage, ScorerConfig, ScorerStore};
//!
//! let store = ScorerStore::initialize(ScorerConfig::default(), Arc::new(MemoryStorage::new()), None);
//! assert_eq!(store.set_weight("historic", "not-a-number"), 0.1);
//! assert_eq!(store.set_weight("historic", 10.0), 3.0);
//! ```

// ============================================================================
// Core modules
// ============================================================================

mod error;
mod snapshot;
mod storage;
mod store;
mod weights;

// ============================================================================
// Public exports
// ============================================================================

pub use error::ScorerError;
pub use snapshot::PersistedSnapshot;
#[cfg(feature = "valkey")]
pub use storage::ValkeyStorage;
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
pub use store::{IgnoreReason, ReconcileOutcome, ScorerConfig, ScorerStore};
pub use weights::{
    CategoryWeightMap, DEFAULT_CAT_WEIGHTS, MAX_WEIGHT, MIN_WEIGHT, WeightBounds, WeightInput,
    default_weights, merge_over_defaults,
};
