//! Category weights: defaults, raw input coercion and clamping.
//!
//! A weight multiplies a point-of-interest score, so the product explodes (or
//! collapses to zero) when a value escapes `[min, max]`. Every value that enters a
//! [`CategoryWeightMap`] goes through [`WeightBounds::clamp`] first.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ScorerError;

/// Mapping from category identifier to weight.
pub type CategoryWeightMap = BTreeMap<String, f64>;

/// Lower bound of the default weight interval.
pub const MIN_WEIGHT: f64 = 0.1;

/// Upper bound of the default weight interval.
pub const MAX_WEIGHT: f64 = 3.0;

/// Baseline weight of every known category.
///
/// Keep in sync with the backend scorer defaults.
pub const DEFAULT_CAT_WEIGHTS: &[(&str, f64)] = &[
    ("gardens_and_parks", 2.0),
    ("natural", 1.25),
    ("view_points", 1.2),
    ("historic", 1.2),
    ("museums", 1.1),
    ("architecture", 1.05),
    ("cultural", 1.1),
    ("urban_environment", 1.0),
    ("theatres_and_entertainments", 0.2),
    ("industrial_facilities", 0.3),
    ("foods", 0.3),
];

/// Fresh copy of [`DEFAULT_CAT_WEIGHTS`] as a map.
#[must_use]
pub fn default_weights() -> CategoryWeightMap {
    DEFAULT_CAT_WEIGHTS
        .iter()
        .map(|(category, weight)| ((*category).to_string(), *weight))
        .collect()
}

/// Raw value handed to a weight setter, before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum WeightInput {
    /// Numeric input (may still be non-finite).
    Number(f64),
    /// Text input, parsed leniently.
    Text(String),
    /// Input with no numeric reading (null, arrays, objects).
    NotANumber,
}

impl WeightInput {
    /// Finite numeric reading of this input, if any.
    ///
    /// Text is trimmed; blank text reads as `0`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            Self::Number(value) => *value,
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().ok()?
                }
            }
            Self::NotANumber => return None,
        };
        number.is_finite().then_some(number)
    }
}

impl From<f64> for WeightInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for WeightInput {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for WeightInput {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for WeightInput {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for WeightInput {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for WeightInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for WeightInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for WeightInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(number) => number.as_f64().map_or(Self::NotANumber, Self::Number),
            Value::String(text) => Self::Text(text),
            Value::Bool(flag) => Self::Number(if flag { 1.0 } else { 0.0 }),
            Value::Null | Value::Array(_) | Value::Object(_) => Self::NotANumber,
        }
    }
}

impl From<&Value> for WeightInput {
    fn from(value: &Value) -> Self {
        Self::from(value.clone())
    }
}

/// Closed interval every stored weight lies in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightBounds {
    min: f64,
    max: f64,
}

impl WeightBounds {
    /// Create bounds; `min` must not exceed `max` and both must be finite.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError::InvalidBounds`] for an empty or non-finite interval.
    pub fn new(min: f64, max: f64) -> Result<Self, ScorerError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ScorerError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lower bound.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether `value` lies inside the interval.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Validate raw input: no finite reading gives `min`, anything else is clamped.
    pub fn clamp(&self, input: impl Into<WeightInput>) -> f64 {
        match input.into().as_number() {
            Some(value) => value.clamp(self.min, self.max),
            None => self.min,
        }
    }

    /// Clamp every value of `weights`.
    #[must_use]
    pub fn clamp_map(&self, weights: &CategoryWeightMap) -> CategoryWeightMap {
        weights
            .iter()
            .map(|(category, weight)| (category.clone(), self.clamp(*weight)))
            .collect()
    }
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            min: MIN_WEIGHT,
            max: MAX_WEIGHT,
        }
    }
}

/// Overlay `overlay` on `defaults`.
///
/// Overlay values win per key, keys unknown to `defaults` are kept, and every
/// overlaid value is clamped to `bounds`.
#[must_use]
pub fn merge_over_defaults<I, K, V>(
    defaults: &CategoryWeightMap,
    overlay: I,
    bounds: &WeightBounds,
) -> CategoryWeightMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<WeightInput>,
{
    let mut merged = defaults.clone();
    for (category, value) in overlay {
        merged.insert(category.into(), bounds.clamp(value));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_within_default_bounds() {
        let bounds = WeightBounds::default();
        let defaults = default_weights();
        assert_eq!(defaults.len(), DEFAULT_CAT_WEIGHTS.len());
        assert!(defaults.values().all(|weight| bounds.contains(*weight)));
    }

    #[test]
    fn text_input_is_trimmed_and_parsed() {
        assert_eq!(WeightInput::from(" 1.5 ").as_number(), Some(1.5));
        assert_eq!(WeightInput::from("").as_number(), Some(0.0));
        assert_eq!(WeightInput::from("abc").as_number(), None);
        assert_eq!(WeightInput::from("NaN").as_number(), None);
        assert_eq!(WeightInput::from("inf").as_number(), None);
    }

    #[test]
    fn json_input_coercion() {
        assert_eq!(WeightInput::from(serde_json::json!(2)).as_number(), Some(2.0));
        assert_eq!(WeightInput::from(serde_json::json!("2.5")).as_number(), Some(2.5));
        assert_eq!(WeightInput::from(serde_json::json!(true)).as_number(), Some(1.0));
        assert_eq!(WeightInput::from(serde_json::json!(null)).as_number(), None);
        assert_eq!(WeightInput::from(serde_json::json!([1])).as_number(), None);
    }

    #[test]
    fn clamp_substitutes_min_for_non_finite() {
        let bounds = WeightBounds::default();
        assert_eq!(bounds.clamp(f64::NAN), MIN_WEIGHT);
        assert_eq!(bounds.clamp(f64::INFINITY), MIN_WEIGHT);
        assert_eq!(bounds.clamp(f64::NEG_INFINITY), MIN_WEIGHT);
        assert_eq!(bounds.clamp(10.0), MAX_WEIGHT);
        assert_eq!(bounds.clamp(-5.0), MIN_WEIGHT);
        assert_eq!(bounds.clamp(1.8), 1.8);
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(WeightBounds::new(2.0, 1.0).is_err());
        assert!(WeightBounds::new(f64::NAN, 1.0).is_err());
        assert!(WeightBounds::new(0.5, f64::INFINITY).is_err());
        let bounds = WeightBounds::new(0.5, 0.5).unwrap();
        assert_eq!(bounds.clamp(3.0), 0.5);
    }

    #[test]
    fn merge_keeps_unknown_keys_and_clamps() {
        let bounds = WeightBounds::default();
        let merged = merge_over_defaults(
            &default_weights(),
            [("historic", 2.0), ("brand_new", 99.0)],
            &bounds,
        );
        assert_eq!(merged["historic"], 2.0);
        assert_eq!(merged["brand_new"], MAX_WEIGHT);
        assert_eq!(merged["natural"], 1.25);
    }
}
