//! The scorer settings store.
//!
//! One instance per execution context owns the authoritative in-memory weight map.
//! Every mutation is followed by an explicit [`ScorerStore::persist`] step that writes
//! the full snapshot and announces it on the injected broadcaster; sibling contexts
//! feed those announcements back through [`ScorerStore::handle_storage_event`].

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::Value;
use tokio::task::JoinHandle;
use tour_events::{KeySubscription, StorageBroadcaster, StorageEvent, keys};

use crate::snapshot::PersistedSnapshot;
use crate::storage::DurableStorage;
use crate::weights::{CategoryWeightMap, WeightBounds, WeightInput, default_weights};

/// Store configuration.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Namespaced, versioned durable slot key.
    pub storage_key: String,
    /// Interval every weight is clamped to.
    pub bounds: WeightBounds,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            storage_key: keys::SCORER_V1.to_string(),
            bounds: WeightBounds::default(),
        }
    }
}

/// Why a storage notification left the store untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Event is for a different slot.
    OtherKey,
    /// Slot was cleared or written with an empty string.
    EmptyValue,
    /// This context published the event itself.
    OwnWrite,
    /// Payload equals the snapshot this context last wrote or applied.
    AlreadyInSync,
    /// Payload is not a usable snapshot.
    Malformed,
    /// Durable slot already holds a newer write than this event carries.
    Superseded,
}

/// Result of handling one storage notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// In-memory weights were replaced by the incoming snapshot.
    Applied,
    /// Notification was ignored.
    Ignored(IgnoreReason),
}

/// Scorer settings store for one execution context.
///
/// Construction performs initialization, so every instance is ready to use. No
/// operation returns an error: storage and parse failures are logged and absorbed,
/// leaving a valid in-memory map.
pub struct ScorerStore {
    context_id: String,
    config: ScorerConfig,
    defaults: CategoryWeightMap,
    storage: Arc<dyn DurableStorage>,
    broadcaster: Option<Arc<dyn StorageBroadcaster>>,
    weights: RwLock<CategoryWeightMap>,
    /// Slot payload known to match `weights` (last written or applied).
    last_synced: RwLock<Option<String>>,
}

impl ScorerStore {
    /// Create a store and load the persisted snapshot, falling back to defaults.
    #[must_use]
    pub fn initialize(
        config: ScorerConfig,
        storage: Arc<dyn DurableStorage>,
        broadcaster: Option<Arc<dyn StorageBroadcaster>>,
    ) -> Self {
        let defaults = config.bounds.clamp_map(&default_weights());
        let (weights, last_synced) = Self::load_initial(&config, storage.as_ref(), &defaults);
        let context_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(
            context_id = %context_id,
            backend = storage.backend_name(),
            key = %config.storage_key,
            categories = weights.len(),
            "scorer store ready"
        );
        Self {
            context_id,
            config,
            defaults,
            storage,
            broadcaster,
            weights: RwLock::new(weights),
            last_synced: RwLock::new(last_synced),
        }
    }

    fn load_initial(
        config: &ScorerConfig,
        storage: &dyn DurableStorage,
        defaults: &CategoryWeightMap,
    ) -> (CategoryWeightMap, Option<String>) {
        let raw = match storage.get_item(&config.storage_key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                tracing::debug!(key = %config.storage_key, "no persisted scorer snapshot; using defaults");
                return (defaults.clone(), None);
            }
            Err(error) => {
                tracing::warn!(
                    backend = storage.backend_name(),
                    key = %config.storage_key,
                    error = %error,
                    "failed to read scorer snapshot; using defaults"
                );
                return (defaults.clone(), None);
            }
        };
        match PersistedSnapshot::parse(&raw, &config.bounds) {
            Ok(snapshot) => (snapshot.merged_over(defaults, &config.bounds), Some(raw)),
            Err(error) => {
                tracing::warn!(
                    key = %config.storage_key,
                    error = %error,
                    "ignoring malformed scorer snapshot; using defaults"
                );
                (defaults.clone(), None)
            }
        }
    }

    fn read_weights(&self) -> RwLockReadGuard<'_, CategoryWeightMap> {
        self.weights.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_weights(&self) -> RwLockWriteGuard<'_, CategoryWeightMap> {
        self.weights.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_last_synced(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.last_synced
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Identifier of this execution context, stamped on published events.
    #[must_use]
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Store configuration.
    #[must_use]
    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Default weights, clamped to the configured bounds.
    #[must_use]
    pub fn defaults(&self) -> &CategoryWeightMap {
        &self.defaults
    }

    /// Copy of the current weights.
    #[must_use]
    pub fn weights(&self) -> CategoryWeightMap {
        self.read_weights().clone()
    }

    /// Current weight of one category.
    #[must_use]
    pub fn weight(&self, category: &str) -> Option<f64> {
        self.read_weights().get(category).copied()
    }

    /// Current weights as a JSON object, the `cat_weights` field of remote calls.
    #[must_use]
    pub fn cat_weights_payload(&self) -> Value {
        Value::Object(
            self.read_weights()
                .iter()
                .map(|(category, weight)| (category.clone(), Value::from(*weight)))
                .collect(),
        )
    }

    /// Validate `raw`, store it under `category` and persist.
    ///
    /// Input with no finite numeric reading becomes the minimum weight; anything
    /// else is clamped. Returns the stored value.
    pub fn set_weight(&self, category: &str, raw: impl Into<WeightInput>) -> f64 {
        let input = raw.into();
        let value = self.config.bounds.clamp(input.clone());
        if input.as_number() != Some(value) {
            tracing::debug!(category, ?input, value, "weight input clamped");
        }
        self.write_weights().insert(category.to_string(), value);
        self.persist();
        value
    }

    /// Replace all weights with the defaults and persist.
    pub fn reset(&self) {
        *self.write_weights() = self.defaults.clone();
        self.persist();
    }

    /// Write the current weights to durable storage and announce the write.
    ///
    /// Failures are logged; the in-memory map stays authoritative.
    pub fn persist(&self) {
        let snapshot = PersistedSnapshot::new(self.weights());
        let payload = match snapshot.to_json() {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(error = %error, "failed to encode scorer snapshot");
                *self.write_last_synced() = None;
                return;
            }
        };
        if let Err(error) = self.storage.set_item(&self.config.storage_key, &payload) {
            tracing::warn!(
                backend = self.storage.backend_name(),
                key = %self.config.storage_key,
                error = %error,
                "failed to persist scorer weights; keeping in-memory state"
            );
            // In-memory weights now diverge from every payload seen so far.
            *self.write_last_synced() = None;
            return;
        }
        *self.write_last_synced() = Some(payload.clone());

        if let Some(broadcaster) = &self.broadcaster {
            let receivers = broadcaster.publish(StorageEvent::written(
                &self.context_id,
                &self.config.storage_key,
                &payload,
            ));
            tracing::trace!(key = %self.config.storage_key, receivers, "announced scorer snapshot");
        }
    }

    /// Reconcile with a write made by another execution context.
    ///
    /// An applied event replaces the weights with the defaults overlaid by the
    /// incoming snapshot. Nothing is written back to storage. Events whose payload
    /// no longer matches the durable slot are stale: the write that replaced it
    /// carries its own event, so only the last write in storage is ever applied.
    pub fn handle_storage_event(&self, event: &StorageEvent) -> ReconcileOutcome {
        if event.key != self.config.storage_key {
            return ReconcileOutcome::Ignored(IgnoreReason::OtherKey);
        }
        let Some(payload) = event.non_empty_value() else {
            return ReconcileOutcome::Ignored(IgnoreReason::EmptyValue);
        };
        if event.origin == self.context_id {
            return ReconcileOutcome::Ignored(IgnoreReason::OwnWrite);
        }

        let mut last_synced = self.write_last_synced();
        if last_synced.as_deref() == Some(payload) {
            return ReconcileOutcome::Ignored(IgnoreReason::AlreadyInSync);
        }
        let snapshot = match PersistedSnapshot::parse(payload, &self.config.bounds) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::debug!(
                    origin = %event.origin,
                    error = %error,
                    "ignoring malformed scorer snapshot from sibling context"
                );
                return ReconcileOutcome::Ignored(IgnoreReason::Malformed);
            }
        };
        match self.storage.get_item(&self.config.storage_key) {
            Ok(Some(current)) if current != payload => {
                tracing::debug!(origin = %event.origin, "scorer snapshot superseded by a later write");
                return ReconcileOutcome::Ignored(IgnoreReason::Superseded);
            }
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(
                    backend = self.storage.backend_name(),
                    error = %error,
                    "cannot re-read scorer slot; trusting event payload"
                );
            }
        }
        *self.write_weights() = snapshot.merged_over(&self.defaults, &self.config.bounds);
        *last_synced = Some(payload.to_string());
        tracing::debug!(origin = %event.origin, "applied scorer snapshot from sibling context");
        ReconcileOutcome::Applied
    }

    /// Subscribe to writes of this store's slot, if a broadcaster was injected.
    #[must_use]
    pub fn subscribe(&self) -> Option<KeySubscription> {
        self.broadcaster
            .as_ref()
            .map(|broadcaster| broadcaster.subscribe(&self.config.storage_key))
    }

    /// Handle every notification already waiting on `subscription`.
    ///
    /// Returns how many were applied.
    pub fn pump_pending(&self, subscription: &mut KeySubscription) -> usize {
        let mut applied = 0;
        while let Some(event) = subscription.try_next() {
            if self.handle_storage_event(&event) == ReconcileOutcome::Applied {
                applied += 1;
            }
        }
        applied
    }

    /// Spawn a task that reconciles every sibling write until the store is dropped
    /// or the broadcaster closes.
    ///
    /// Returns `None` without a broadcaster. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn_reconciler(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut subscription = self.subscribe()?;
        let weak: Weak<Self> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let Some(store) = weak.upgrade() else {
                    break;
                };
                let outcome = store.handle_storage_event(&event);
                tracing::trace!(event = %event, ?outcome, "scorer storage event handled");
            }
        }))
    }
}

impl std::fmt::Debug for ScorerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerStore")
            .field("context_id", &self.context_id)
            .field("config", &self.config)
            .field("backend", &self.storage.backend_name())
            .field("weights", &*self.read_weights())
            .finish_non_exhaustive()
    }
}
