//! Durable slot key constants for type-safe routing.

/// Scorer settings snapshot, version 1.
pub const SCORER_V1: &str = "scorer:v1";
