//! Scalar field values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Flat mapping from field name to value, as stored for one entity.
pub type FieldMap = BTreeMap<String, Value>;

/// A scalar entity field value.
///
/// Serialized as a bare JSON scalar so stored records stay readable by any
/// client of the underlying store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Value {
    /// Textual form used as a component of store keys.
    ///
    /// Integral numbers render without a fractional part (`2`, not `2.0`) so
    /// that `1` and `1.0` address the same index entry.
    pub fn key_part(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if *n == 0.0 => "0".to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
        }
    }

    /// Converts a JSON scalar. Arrays and objects are not field values.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_part())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_part_rendering() {
        assert_eq!(Value::from(2).key_part(), "2");
        assert_eq!(Value::from(2.0).key_part(), "2");
        assert_eq!(Value::from(-0.0).key_part(), "0");
        assert_eq!(Value::from(123.456).key_part(), "123.456");
        assert_eq!(Value::from(true).key_part(), "true");
        assert_eq!(Value::Null.key_part(), "null");
        assert_eq!(Value::from("*test").key_part(), "*test");
    }

    #[test]
    fn test_json_scalars_round_trip() {
        let values = vec![
            Value::Null,
            Value::from(false),
            Value::from(42),
            Value::from(0.5),
            Value::from("hello"),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,false,42.0,0.5,"hello"]"#);

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_integers_deserialize_as_numbers() {
        let v: Value = serde_json::from_str("7").unwrap();
        assert_eq!(v, Value::Number(7.0));
    }

    #[test]
    fn test_from_json_rejects_containers() {
        assert_eq!(Value::from_json(&serde_json::json!(3)), Some(Value::Number(3.0)));
        assert_eq!(Value::from_json(&serde_json::json!([1, 2])), None);
        assert_eq!(Value::from_json(&serde_json::json!({"a": 1})), None);
    }
}
