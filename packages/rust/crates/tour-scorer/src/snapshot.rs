//! Durable snapshot envelope: `{ "cat_weights": { <category>: <number>, ... } }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScorerError;
use crate::weights::{CategoryWeightMap, WeightBounds, merge_over_defaults};

/// Serialized form of the full weight mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    /// Category weights at the time of the write.
    pub cat_weights: CategoryWeightMap,
}

impl PersistedSnapshot {
    /// Wrap a weight map.
    #[must_use]
    pub fn new(cat_weights: CategoryWeightMap) -> Self {
        Self { cat_weights }
    }

    /// Parse durable slot content.
    ///
    /// Entries inside `cat_weights` are coerced and clamped to `bounds` individually,
    /// so one bad value does not discard the rest of the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError::MalformedSnapshot`] when the text is not JSON, the root
    /// is not an object, or `cat_weights` is missing or not an object.
    pub fn parse(raw: &str, bounds: &WeightBounds) -> Result<Self, ScorerError> {
        let root: Value = serde_json::from_str(raw)
            .map_err(|error| ScorerError::MalformedSnapshot(error.to_string()))?;
        let Some(root) = root.as_object() else {
            return Err(ScorerError::MalformedSnapshot(
                "snapshot root is not an object".to_string(),
            ));
        };
        let Some(field) = root.get("cat_weights") else {
            return Err(ScorerError::MalformedSnapshot(
                "missing cat_weights field".to_string(),
            ));
        };
        let Some(entries) = field.as_object() else {
            return Err(ScorerError::MalformedSnapshot(
                "cat_weights is not an object".to_string(),
            ));
        };
        let cat_weights = entries
            .iter()
            .map(|(category, value)| (category.clone(), bounds.clamp(value)))
            .collect();
        Ok(Self { cat_weights })
    }

    /// Encode as compact JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ScorerError> {
        Ok(serde_json::to_string(self)?)
    }

    /// `defaults` overlaid with this snapshot's weights.
    #[must_use]
    pub fn merged_over(
        &self,
        defaults: &CategoryWeightMap,
        bounds: &WeightBounds,
    ) -> CategoryWeightMap {
        merge_over_defaults(
            defaults,
            self.cat_weights
                .iter()
                .map(|(category, weight)| (category.clone(), *weight)),
            bounds,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::{MAX_WEIGHT, MIN_WEIGHT, default_weights};

    fn bounds() -> WeightBounds {
        WeightBounds::default()
    }

    #[test]
    fn parse_rejects_unusable_shapes() {
        for raw in [
            "{not json",
            "",
            "42",
            "[1, 2]",
            r#"{"weights": {}}"#,
            r#"{"cat_weights": [1, 2]}"#,
            r#"{"cat_weights": "historic"}"#,
            r#"{"cat_weights": null}"#,
        ] {
            let result = PersistedSnapshot::parse(raw, &bounds());
            assert!(
                matches!(result, Err(ScorerError::MalformedSnapshot(_))),
                "expected malformed for {raw:?}"
            );
        }
    }

    #[test]
    fn parse_clamps_individual_entries() {
        let raw = r#"{"cat_weights": {"historic": 9, "museums": "2.5", "foods": "oops", "natural": -1}}"#;
        let snapshot = PersistedSnapshot::parse(raw, &bounds()).unwrap();
        assert_eq!(snapshot.cat_weights["historic"], MAX_WEIGHT);
        assert_eq!(snapshot.cat_weights["museums"], 2.5);
        assert_eq!(snapshot.cat_weights["foods"], MIN_WEIGHT);
        assert_eq!(snapshot.cat_weights["natural"], MIN_WEIGHT);
    }

    #[test]
    fn to_json_uses_envelope() {
        let mut weights = CategoryWeightMap::new();
        weights.insert("historic".to_string(), 1.8);
        let json = PersistedSnapshot::new(weights).to_json().unwrap();
        assert_eq!(json, r#"{"cat_weights":{"historic":1.8}}"#);
    }

    #[test]
    fn merged_over_fills_missing_defaults() {
        let snapshot =
            PersistedSnapshot::parse(r#"{"cat_weights": {"historic": 2.0}}"#, &bounds()).unwrap();
        let merged = snapshot.merged_over(&default_weights(), &bounds());
        let mut expected = default_weights();
        expected.insert("historic".to_string(), 2.0);
        assert_eq!(merged, expected);
    }
}
