//! Error types for the scorer settings store.
//!
//! None of these reach callers of [`crate::ScorerStore`]; the store absorbs them and
//! falls back to a valid in-memory map. Storage backends and the snapshot codec
//! return them so the store can log what went wrong.

use thiserror::Error;

/// Failure modes of snapshot parsing and durable storage access.
#[derive(Error, Debug)]
pub enum ScorerError {
    /// Durable value is not JSON or not shaped as `{ "cat_weights": { ... } }`.
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Read or write against the durable slot failed (quota, disabled storage, I/O).
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Weight interval is empty or not finite.
    #[error("Invalid weight bounds: min={min}, max={max}")]
    InvalidBounds {
        /// Requested lower bound.
        min: f64,
        /// Requested upper bound.
        max: f64,
    },

    /// Snapshot could not be encoded as JSON.
    #[error("Snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
