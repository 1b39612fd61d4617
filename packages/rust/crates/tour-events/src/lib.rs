//! Storage change notifications shared between execution contexts.
//!
//! Provides a pub/sub bus backed by tokio's broadcast channel. Every context that
//! writes a durable slot publishes a [`StorageEvent`]; sibling contexts subscribe to
//! the slot key and reconcile their in-memory state.
//!
//! # Architecture
//!
//! ```text
//! Context A: set_item(key, value)
//!      ↓
//! StorageBroadcaster.publish() → broadcast::Sender
//!      ↓
//! Fan-out to every KeySubscription for `key`
//!      ↓
//! Context B, C, ... reconcile asynchronously
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use uuid::Uuid;

pub mod keys;

/// Default channel capacity for [`LocalBroadcaster`].
pub const DEFAULT_CAPACITY: usize = 256;

/// A durable slot was written by some execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    /// Unique event identifier
    pub id: String,
    /// Id of the execution context that performed the write
    pub origin: String,
    /// Durable slot key (e.g., "scorer:v1")
    pub key: String,
    /// New slot content; `None` when the slot was cleared
    pub new_value: Option<String>,
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
}

impl StorageEvent {
    /// Create a new event
    pub fn new(
        origin: impl Into<String>,
        key: impl Into<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            origin: origin.into(),
            key: key.into(),
            new_value,
            timestamp: Utc::now(),
        }
    }

    /// Create an event for a slot that now holds `value`.
    pub fn written(origin: &str, key: &str, value: &str) -> Self {
        Self::new(origin, key, Some(value.to_string()))
    }

    /// The new value, treating an empty string the same as a cleared slot.
    #[must_use]
    pub fn non_empty_value(&self) -> Option<&str> {
        self.new_value.as_deref().filter(|value| !value.is_empty())
    }
}

impl std::fmt::Display for StorageEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} -> {}: {} bytes",
            self.timestamp.format("%H:%M:%S"),
            self.origin,
            self.key,
            self.new_value.as_ref().map_or(0, String::len)
        )
    }
}

/// Capability to announce durable slot writes and listen for them.
pub trait StorageBroadcaster: Send + Sync {
    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that got the event; 0 is not an error.
    fn publish(&self, event: StorageEvent) -> usize;

    /// Subscribe to future events for a single slot key.
    fn subscribe(&self, key: &str) -> KeySubscription;
}

/// Receiver filtered down to one slot key.
///
/// Dropping the subscription automatically unsubscribes.
#[derive(Debug)]
pub struct KeySubscription {
    key: String,
    rx: broadcast::Receiver<StorageEvent>,
}

impl KeySubscription {
    /// Wrap a raw broadcast receiver.
    pub fn new(key: impl Into<String>, rx: broadcast::Receiver<StorageEvent>) -> Self {
        Self {
            key: key.into(),
            rx,
        }
    }

    /// Key this subscription listens to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the next event on this key.
    ///
    /// Returns `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.key == self.key => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(key = %self.key, skipped, "storage subscription lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-delivered event on this key without waiting.
    pub fn try_next(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.key == self.key => return Some(event),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(key = %self.key, skipped, "storage subscription lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

/// In-process broadcaster
///
/// Uses `tokio::sync::broadcast` channel for:
/// - Thread-safe 1-to-Many fan-out
/// - Non-blocking publish
/// - Automatic cleanup on receiver drop
#[derive(Debug, Clone)]
pub struct LocalBroadcaster {
    tx: broadcast::Sender<StorageEvent>,
    capacity: usize,
}

impl LocalBroadcaster {
    /// Create a new broadcaster with specified capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Get the channel capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get current subscriber count
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LocalBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StorageBroadcaster for LocalBroadcaster {
    fn publish(&self, event: StorageEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    fn subscribe(&self, key: &str) -> KeySubscription {
        KeySubscription::new(key, self.tx.subscribe())
    }
}
