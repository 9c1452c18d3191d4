use crate::ml::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered feature names the scaler and every classifier were fitted on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Validate a raw request map against this schema
    pub fn validate(&self, raw: &Map<String, Value>) -> Result<FeatureVector, ValidationError> {
        validate(raw, self)
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureSchema {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Validated feature values in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap already-ordered values. Skips schema validation.
    pub fn from_ordered(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Check `raw` against `schema` and return values in schema order.
///
/// Keys outside the schema are ignored. The first missing feature in schema
/// order is reported, even if other fields are also invalid.
pub fn validate(
    raw: &Map<String, Value>,
    schema: &FeatureSchema,
) -> Result<FeatureVector, ValidationError> {
    if let Some(missing) = schema.names().iter().find(|name| !raw.contains_key(*name)) {
        return Err(ValidationError::MissingFeature(missing.clone()));
    }

    let values = schema
        .names()
        .iter()
        .map(|name| {
            let value = &raw[name.as_str()];
            coerce_finite(value).ok_or_else(|| ValidationError::NonNumericFeature {
                name: name.clone(),
                value: value.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureVector { values })
}

/// JSON numbers and numeric strings coerce; anything non-finite does not.
fn coerce_finite(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> FeatureSchema {
        ["duration", "packets"].into_iter().collect()
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_validate_orders_by_schema() {
        let raw = as_map(json!({"packets": 80, "duration": 10.5}));
        let vector = schema().validate(&raw).unwrap();
        assert_eq!(vector.values(), &[10.5, 80.0]);
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = as_map(json!({"duration": 1, "packets": 2}));
        let b = as_map(json!({"packets": 2, "duration": 1}));
        assert_eq!(validate(&a, &schema()), validate(&b, &schema()));
    }

    #[test]
    fn test_missing_feature() {
        let raw = as_map(json!({"duration": 10}));
        assert_eq!(
            validate(&raw, &schema()),
            Err(ValidationError::MissingFeature("packets".into()))
        );
    }

    #[test]
    fn test_missing_reported_before_non_numeric() {
        let raw = as_map(json!({"duration": "abc"}));
        assert_eq!(
            validate(&raw, &schema()),
            Err(ValidationError::MissingFeature("packets".into()))
        );
    }

    #[test]
    fn test_non_numeric_values_rejected() {
        for bad in [json!("abc"), json!(true), json!(null), json!([1.0]), json!({"v": 1})] {
            let raw = as_map(json!({"duration": 1, "packets": bad.clone()}));
            assert_eq!(
                validate(&raw, &schema()),
                Err(ValidationError::NonNumericFeature {
                    name: "packets".into(),
                    value: bad,
                })
            );
        }
    }

    #[test]
    fn test_non_finite_strings_rejected() {
        for bad in ["NaN", "inf", "-infinity"] {
            let raw = as_map(json!({"duration": bad, "packets": 1}));
            assert!(matches!(
                validate(&raw, &schema()),
                Err(ValidationError::NonNumericFeature { ref name, .. }) if name == "duration"
            ));
        }
    }

    #[test]
    fn test_numeric_strings_coerced() {
        let raw = as_map(json!({"duration": " 2.5 ", "packets": "7"}));
        assert_eq!(validate(&raw, &schema()).unwrap().values(), &[2.5, 7.0]);
    }

    #[test]
    fn test_extra_keys_ignored() {
        let raw = as_map(json!({"duration": 1, "packets": 2, "protocol": "tcp"}));
        assert_eq!(validate(&raw, &schema()).unwrap().len(), 2);
    }

    #[test]
    fn test_schema_serializes_as_list() {
        let json = serde_json::to_value(schema()).unwrap();
        assert_eq!(json, json!(["duration", "packets"]));
    }
}
