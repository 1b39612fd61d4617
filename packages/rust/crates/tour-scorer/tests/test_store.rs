//! ScorerStore initialization, mutation and persistence tests.

mod common;

use tour_events::keys;
use tour_scorer::{
    DEFAULT_CAT_WEIGHTS, DurableStorage, MAX_WEIGHT, MIN_WEIGHT, MemoryStorage, PersistedSnapshot,
    WeightBounds, default_weights,
};

use common::isolated_store;

#[test]
fn fresh_store_starts_from_defaults() {
    let store = isolated_store(&MemoryStorage::new());
    assert_eq!(store.weights(), default_weights());
    assert_eq!(store.defaults(), &default_weights());
}

#[test]
fn reset_restores_every_default() {
    let store = isolated_store(&MemoryStorage::new());
    store.set_weight("historic", 2.9);
    store.set_weight("museums", 0.4);
    store.set_weight("server_only", 1.5);

    store.reset();

    let weights = store.weights();
    for (category, default) in DEFAULT_CAT_WEIGHTS {
        assert_eq!(weights[*category], *default, "category {category}");
    }
    assert!(!weights.contains_key("server_only"));
}

#[test]
fn reset_is_idempotent() {
    let store = isolated_store(&MemoryStorage::new());
    store.set_weight("natural", 2.2);
    store.reset();
    let once = store.weights();
    store.reset();
    assert_eq!(store.weights(), once);
}

#[test]
fn set_weight_always_lands_in_bounds() {
    let store = isolated_store(&MemoryStorage::new());
    let bounds = WeightBounds::default();
    for value in [
        -1e9,
        -5.0,
        -0.0,
        0.0,
        0.05,
        0.1,
        1.0,
        2.999,
        3.0,
        3.0001,
        10.0,
        1e300,
        f64::NAN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::MIN_POSITIVE,
    ] {
        let stored = store.set_weight("historic", value);
        assert!(bounds.contains(stored), "{value} stored as {stored}");
        assert_eq!(store.weight("historic"), Some(stored));
    }
}

#[test]
fn set_weight_clamps_and_substitutes_min() {
    let store = isolated_store(&MemoryStorage::new());

    store.set_weight("historic", "not-a-number");
    assert_eq!(store.weight("historic"), Some(MIN_WEIGHT));

    store.set_weight("historic", 10.0);
    assert_eq!(store.weight("historic"), Some(MAX_WEIGHT));

    store.set_weight("historic", -5.0);
    assert_eq!(store.weight("historic"), Some(MIN_WEIGHT));

    store.set_weight("historic", "2.25");
    assert_eq!(store.weight("historic"), Some(2.25));
}

#[test]
fn set_weight_creates_new_categories() {
    let store = isolated_store(&MemoryStorage::new());
    assert_eq!(store.weight("ferries"), None);
    store.set_weight("ferries", 1.4);
    assert_eq!(store.weight("ferries"), Some(1.4));
}

#[test]
fn weights_round_trip_through_a_fresh_store() {
    let storage = MemoryStorage::new();
    let first = isolated_store(&storage);
    first.set_weight("historic", 1.8);

    let second = isolated_store(&storage);
    assert_eq!(second.weight("historic"), Some(1.8));
}

#[test]
fn partial_snapshot_merges_forward_over_defaults() {
    let storage = MemoryStorage::new();
    storage.put_raw(keys::SCORER_V1, r#"{"cat_weights": {"historic": 2.0}}"#);

    let store = isolated_store(&storage);

    let mut expected = default_weights();
    expected.insert("historic".to_string(), 2.0);
    assert_eq!(store.weights(), expected);
}

#[test]
fn unknown_categories_in_snapshot_are_preserved() {
    let storage = MemoryStorage::new();
    storage.put_raw(
        keys::SCORER_V1,
        r#"{"cat_weights": {"lighthouses": 1.7, "foods": 9}}"#,
    );

    let store = isolated_store(&storage);
    assert_eq!(store.weight("lighthouses"), Some(1.7));
    assert_eq!(store.weight("foods"), Some(MAX_WEIGHT));
}

#[test]
fn malformed_slot_falls_back_to_exact_defaults() {
    for raw in [
        "{not json",
        "",
        "null",
        r#"{"other": 1}"#,
        r#"{"cat_weights": 5}"#,
    ] {
        let storage = MemoryStorage::new();
        storage.put_raw(keys::SCORER_V1, raw);
        let store = isolated_store(&storage);
        assert_eq!(store.weights(), default_weights(), "slot content {raw:?}");
    }
}

#[test]
fn unavailable_storage_never_surfaces() {
    let storage = MemoryStorage::new();
    storage.set_available(false);

    let store = isolated_store(&storage);
    assert_eq!(store.weights(), default_weights());

    assert_eq!(store.set_weight("museums", 2.5), 2.5);
    assert_eq!(store.weight("museums"), Some(2.5));
    store.reset();
    assert_eq!(store.weights(), default_weights());

    storage.set_available(true);
    assert_eq!(storage.get_item(keys::SCORER_V1).unwrap(), None);
}

#[test]
fn quota_exceeded_keeps_in_memory_state() {
    let storage = MemoryStorage::with_quota(32);
    let store = isolated_store(&storage);

    store.set_weight("historic", 2.0);

    assert_eq!(store.weight("historic"), Some(2.0));
    assert_eq!(storage.get_item(keys::SCORER_V1).unwrap(), None);
}

#[test]
fn every_mutation_writes_the_full_snapshot() {
    let storage = MemoryStorage::new();
    let store = isolated_store(&storage);

    store.set_weight("museums", 2.5);
    let raw = storage.get_item(keys::SCORER_V1).unwrap().unwrap();
    let snapshot = PersistedSnapshot::parse(&raw, &WeightBounds::default()).unwrap();
    assert_eq!(snapshot.cat_weights, store.weights());

    store.reset();
    let raw = storage.get_item(keys::SCORER_V1).unwrap().unwrap();
    let snapshot = PersistedSnapshot::parse(&raw, &WeightBounds::default()).unwrap();
    assert_eq!(snapshot.cat_weights, default_weights());
}

#[test]
fn cat_weights_payload_matches_weights() {
    let store = isolated_store(&MemoryStorage::new());
    store.set_weight("historic", 1.8);
    let payload = store.cat_weights_payload();
    assert_eq!(payload["historic"], 1.8);
    assert_eq!(
        payload.as_object().map(serde_json::Map::len),
        Some(store.weights().len())
    );
}

#[test]
fn custom_bounds_clamp_defaults_too() {
    use std::sync::Arc;
    use tour_scorer::{ScorerConfig, ScorerStore};

    let config = ScorerConfig {
        bounds: WeightBounds::new(0.5, 1.5).unwrap(),
        ..ScorerConfig::default()
    };
    let store = ScorerStore::initialize(config, Arc::new(MemoryStorage::new()), None);
    assert_eq!(store.weight("gardens_and_parks"), Some(1.5));
    assert_eq!(store.weight("foods"), Some(0.5));
    assert_eq!(store.set_weight("natural", 0.0), 0.5);
}
