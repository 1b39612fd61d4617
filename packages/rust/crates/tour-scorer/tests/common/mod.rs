//! Shared test helpers for tour-scorer.

#![allow(dead_code)]

use std::sync::Arc;

use tour_events::LocalBroadcaster;
use tour_scorer::{MemoryStorage, ScorerConfig, ScorerStore};

/// Store over `storage` without a broadcaster.
pub fn isolated_store(storage: &MemoryStorage) -> ScorerStore {
    ScorerStore::initialize(ScorerConfig::default(), Arc::new(storage.clone()), None)
}

/// Store over shared `storage` announcing on `bus`, like one browser tab.
pub fn tab(storage: &MemoryStorage, bus: &LocalBroadcaster) -> ScorerStore {
    ScorerStore::initialize(
        ScorerConfig::default(),
        Arc::new(storage.clone()),
        Some(Arc::new(bus.clone())),
    )
}
