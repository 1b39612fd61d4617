//! Durable key-value slots for scorer snapshots.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;

use crate::error::ScorerError;

/// Durable string slots shared by every execution context of one origin.
pub trait DurableStorage: Send + Sync {
    /// Backend identifier for logs.
    fn backend_name(&self) -> &'static str;

    /// Read the slot at `key`; `Ok(None)` when nothing was ever written.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError::StorageUnavailable`] when the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, ScorerError>;

    /// Replace the slot at `key` with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError::StorageUnavailable`] when the write is refused or fails.
    fn set_item(&self, key: &str, value: &str) -> Result<(), ScorerError>;
}

#[derive(Debug)]
struct MemorySlots {
    slots: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    available: AtomicBool,
}

/// In-memory slots.
///
/// Clones share the same slots, which is how sibling contexts in one process (or in
/// tests) see the same origin storage.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<MemorySlots>,
}

impl MemoryStorage {
    /// Unlimited, available storage.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Storage that refuses writes once keys plus values exceed `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self::build(Some(quota_bytes))
    }

    fn build(quota_bytes: Option<usize>) -> Self {
        Self {
            inner: Arc::new(MemorySlots {
                slots: RwLock::new(HashMap::new()),
                quota_bytes,
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Toggle availability; unavailable storage fails every read and write.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Write a slot directly, bypassing quota and availability checks.
    ///
    /// Models another context (or the user) tampering with the slot.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.inner
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn ensure_available(&self) -> Result<(), ScorerError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ScorerError::StorageUnavailable(
                "storage is disabled".to_string(),
            ))
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStorage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, ScorerError> {
        self.ensure_available()?;
        Ok(self
            .inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), ScorerError> {
        self.ensure_available()?;
        let mut slots = self
            .inner
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(quota) = self.inner.quota_bytes {
            let others: usize = slots
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, stored)| existing.len() + stored.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(ScorerError::StorageUnavailable(format!(
                    "quota exceeded: {needed} bytes (limit: {quota})"
                )));
            }
        }
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per slot under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Store slots under `root` (created on first write).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the slot files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`; characters outside `[A-Za-z0-9_-]` become `_`.
    #[must_use]
    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", slot_stem(key)))
    }

    fn read_slot(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.slot_path(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error)
                .with_context(|| format!("failed to read slot {key} from {}", path.display())),
        }
    }

    /// Replace the slot file without ever exposing a partial snapshot: the payload
    /// goes to a hidden sibling file first, is synced, then renamed over the slot.
    fn write_slot(&self, key: &str, value: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!("failed to create slot directory {}", self.root.display())
        })?;
        let path = self.slot_path(key);
        let staging = self
            .root
            .join(format!(".{}.{}.tmp", slot_stem(key), uuid::Uuid::new_v4()));

        let staged = std::fs::File::create(&staging).and_then(|mut file| {
            file.write_all(value.as_bytes())?;
            file.sync_all()
        });
        let committed = staged.and_then(|()| std::fs::rename(&staging, &path));
        if let Err(error) = committed {
            let _ = std::fs::remove_file(&staging);
            return Err(error)
                .with_context(|| format!("failed to write slot {key} to {}", path.display()));
        }
        Ok(())
    }
}

fn slot_stem(key: &str) -> String {
    let stem: String = key
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "slot".to_string()
    } else {
        stem
    }
}

impl DurableStorage for FileStorage {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, ScorerError> {
        self.read_slot(key)
            .map_err(|error| ScorerError::StorageUnavailable(format!("{error:#}")))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), ScorerError> {
        self.write_slot(key, value)
            .map_err(|error| ScorerError::StorageUnavailable(format!("{error:#}")))
    }
}

#[cfg(feature = "valkey")]
mod valkey {
    use redis::Commands;

    use super::DurableStorage;
    use crate::error::ScorerError;

    /// Valkey-backed slots (one string value per key).
    pub struct ValkeyStorage {
        client: redis::Client,
        prefix: String,
    }

    impl ValkeyStorage {
        /// Connect lazily to `redis_url`; slot keys are stored as `{prefix}:{key}`.
        ///
        /// # Errors
        ///
        /// Returns [`ScorerError::StorageUnavailable`] for an invalid url.
        pub fn new(redis_url: impl AsRef<str>, prefix: impl Into<String>) -> Result<Self, ScorerError> {
            let redis_url = redis_url.as_ref();
            let client = redis::Client::open(redis_url).map_err(|error| {
                ScorerError::StorageUnavailable(format!(
                    "invalid redis url for scorer storage: {redis_url}: {error}"
                ))
            })?;
            Ok(Self {
                client,
                prefix: prefix.into(),
            })
        }

        fn full_key(&self, key: &str) -> String {
            format!("{}:{key}", self.prefix)
        }

        fn connection(&self) -> Result<redis::Connection, ScorerError> {
            self.client.get_connection().map_err(|error| {
                ScorerError::StorageUnavailable(format!("failed to open valkey connection: {error}"))
            })
        }
    }

    impl DurableStorage for ValkeyStorage {
        fn backend_name(&self) -> &'static str {
            "valkey"
        }

        fn get_item(&self, key: &str) -> Result<Option<String>, ScorerError> {
            let mut connection = self.connection()?;
            connection.get(self.full_key(key)).map_err(|error| {
                ScorerError::StorageUnavailable(format!("failed to read slot from valkey: {error}"))
            })
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), ScorerError> {
            let mut connection = self.connection()?;
            connection
                .set::<_, _, ()>(self.full_key(key), value)
                .map_err(|error| {
                    ScorerError::StorageUnavailable(format!(
                        "failed to write slot to valkey: {error}"
                    ))
                })
        }
    }
}

#[cfg(feature = "valkey")]
pub use valkey::ValkeyStorage;
