//! Field declarations and value coercion.
//!
//! A [`Schema`] lists the fields of a namespace in declaration order. Each
//! field has a type, an index flag, and a filter that coerces raw JSON input
//! into a stored [`Value`]. Raw input is never stored as-is: [`Schema::sanitize`]
//! keeps only declared fields and passes each through its filter.
//!
//! Schemas can be built in code:
//!
//! ```
//! use redmap::{FieldType, Schema};
//!
//! let schema = Schema::builder()
//!     .field("id", FieldType::Number)
//!     .indexed("flag", FieldType::Number)
//!     .field("label", FieldType::String)
//!     .build()
//!     .unwrap();
//! assert_eq!(schema.indexed_fields(), vec!["flag"]);
//! ```
//!
//! or from a JSON declaration, where each field is a type name or an object
//! with `type` and `index`:
//!
//! ```
//! use redmap::Schema;
//!
//! let schema = Schema::from_json(&serde_json::json!({
//!     "id": "Number",
//!     "flag": { "type": "Number", "index": true },
//! }))
//! .unwrap();
//! assert!(schema.field("flag").unwrap().index);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use redmap_commons::{CommonError, Entity, FieldMap, Value};
use redmap_store::Query;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Coerces one raw input value.
pub type FilterFn = Arc<dyn Fn(&JsonValue) -> Value + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Schema field '{0}' does not have a type")]
    MissingType(String),

    #[error("Filter for type '{type_name}' of field '{field}' not found")]
    UnknownType { field: String, type_name: String },

    #[error("Schema field '{0}' is declared twice")]
    DuplicateField(String),

    #[error("Schema declaration must be an object of fields")]
    InvalidDeclaration,
}

/// Built-in field types, each with a default filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Number,
    String,
    Boolean,
}

impl FieldType {
    /// Resolves a declared type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Number" | "number" => Some(FieldType::Number),
            "String" | "string" => Some(FieldType::String),
            "Boolean" | "boolean" | "bool" => Some(FieldType::Boolean),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Number => "Number",
            FieldType::String => "String",
            FieldType::Boolean => "Boolean",
        }
    }

    /// Default coercion of the type.
    ///
    /// - `Number`: numbers pass through, strings are parsed from their leading
    ///   numeric prefix; anything unparsable or non-finite becomes `0`
    /// - `String`: falsy input becomes `""`, anything else its textual form
    /// - `Boolean`: truthiness of the input
    pub fn coerce(&self, raw: &JsonValue) -> Value {
        match self {
            FieldType::Number => Value::Number(coerce_number(raw)),
            FieldType::String => Value::String(coerce_string(raw)),
            FieldType::Boolean => Value::Bool(is_truthy(raw)),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn coerce_number(raw: &JsonValue) -> f64 {
    let n = match raw {
        JsonValue::Number(n) => n.as_f64().unwrap_or(0.0),
        JsonValue::String(s) => parse_leading_float(s).unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() && n != 0.0 {
        n
    } else {
        0.0
    }
}

/// Longest numeric prefix of `s` (after leading whitespace), e.g. `"12px"` → 12.
fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(s.len());
    let candidate = &s[..end];
    (1..=candidate.len())
        .rev()
        .find_map(|len| candidate[..len].parse::<f64>().ok())
}

fn coerce_string(raw: &JsonValue) -> String {
    if !is_truthy(raw) {
        return String::new();
    }
    match raw {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n
            .as_f64()
            .map(|f| Value::Number(f).key_part())
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

fn is_truthy(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::String(s) => JsonValue::String(s.clone()),
    }
}

/// One declared field.
#[derive(Clone)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    pub index: bool,
    filter: Option<FilterFn>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            index: false,
            filter: None,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    /// Replaces the type's default filter.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&JsonValue) -> Value + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn apply(&self, raw: &JsonValue) -> Value {
        match &self.filter {
            Some(filter) => filter(raw),
            None => self.field_type.coerce(raw),
        }
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("index", &self.index)
            .field("custom_filter", &self.filter.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSchema>,
}

impl SchemaBuilder {
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with(FieldSchema::new(name, field_type))
    }

    pub fn indexed(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with(FieldSchema::new(name, field_type).indexed())
    }

    pub fn with(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Schema {
            fields: self.fields,
        })
    }
}

/// Ordered field declarations of one namespace.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSchema>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parses a declaration object of `name: type` or `name: { type, index }` entries.
    pub fn from_json(decl: &JsonValue) -> Result<Self, SchemaError> {
        let JsonValue::Object(entries) = decl else {
            return Err(SchemaError::InvalidDeclaration);
        };

        let mut builder = Schema::builder();
        for (name, spec) in entries {
            let (type_name, index) = match spec {
                JsonValue::String(type_name) => (type_name.as_str(), false),
                JsonValue::Object(props) => {
                    let type_name = match props.get("type") {
                        Some(JsonValue::String(t)) => t.as_str(),
                        _ => return Err(SchemaError::MissingType(name.clone())),
                    };
                    let index = props.get("index").is_some_and(is_truthy);
                    (type_name, index)
                }
                _ => return Err(SchemaError::MissingType(name.clone())),
            };

            let field_type =
                FieldType::from_name(type_name).ok_or_else(|| SchemaError::UnknownType {
                    field: name.clone(),
                    type_name: type_name.to_string(),
                })?;
            let mut field = FieldSchema::new(name.clone(), field_type);
            field.index = index;
            builder = builder.with(field);
        }
        builder.build()
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn indexed_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.index)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Keeps the declared fields present in `raw`, coerced by their filters.
    ///
    /// Fails when the result has no `id`.
    pub fn sanitize(&self, raw: &JsonValue) -> Result<Entity, CommonError> {
        let fields: FieldMap = match raw {
            JsonValue::Object(obj) => self
                .fields
                .iter()
                .filter_map(|f| obj.get(&f.name).map(|v| (f.name.clone(), f.apply(v))))
                .collect(),
            _ => FieldMap::new(),
        };
        Entity::new(fields)
    }

    /// Re-applies the schema to a stored entity, dropping undeclared fields.
    pub fn conform(&self, entity: &Entity) -> Result<Entity, CommonError> {
        let fields: FieldMap = self
            .fields
            .iter()
            .filter_map(|f| {
                entity
                    .get(&f.name)
                    .map(|v| (f.name.clone(), f.apply(&to_json(v))))
            })
            .collect();
        Entity::new(fields)
    }

    /// Equality query over the indexed fields present in `raw`.
    pub fn query(&self, raw: &JsonValue) -> Query {
        let mut query = Query::new();
        if let JsonValue::Object(obj) = raw {
            for field in self.fields.iter().filter(|f| f.index) {
                if let Some(v) = obj.get(&field.name) {
                    query = query.where_eq(field.name.clone(), field.apply(v));
                }
            }
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_filter() {
        let t = FieldType::Number;
        assert_eq!(t.coerce(&json!(42)), Value::Number(42.0));
        assert_eq!(t.coerce(&json!("3.5")), Value::Number(3.5));
        assert_eq!(t.coerce(&json!("  12px")), Value::Number(12.0));
        assert_eq!(t.coerce(&json!("1e3")), Value::Number(1000.0));
        assert_eq!(t.coerce(&json!("abc")), Value::Number(0.0));
        assert_eq!(t.coerce(&json!(true)), Value::Number(0.0));
        assert_eq!(t.coerce(&json!(null)), Value::Number(0.0));
        assert_eq!(t.coerce(&json!(-0.0)), Value::Number(0.0));
    }

    #[test]
    fn test_string_filter() {
        let t = FieldType::String;
        assert_eq!(t.coerce(&json!("hi")), Value::from("hi"));
        assert_eq!(t.coerce(&json!(7)), Value::from("7"));
        assert_eq!(t.coerce(&json!(1.5)), Value::from("1.5"));
        assert_eq!(t.coerce(&json!(true)), Value::from("true"));
        for falsy in [json!(null), json!(false), json!(0), json!("")] {
            assert_eq!(t.coerce(&falsy), Value::from(""));
        }
    }

    #[test]
    fn test_boolean_filter() {
        let t = FieldType::Boolean;
        assert_eq!(t.coerce(&json!("x")), Value::Bool(true));
        assert_eq!(t.coerce(&json!([])), Value::Bool(true));
        assert_eq!(t.coerce(&json!(0)), Value::Bool(false));
        assert_eq!(t.coerce(&json!("")), Value::Bool(false));
    }

    #[test]
    fn test_from_json_errors() {
        assert_eq!(
            Schema::from_json(&json!({ "id": { "index": true } })).unwrap_err(),
            SchemaError::MissingType("id".to_string())
        );
        assert_eq!(
            Schema::from_json(&json!({ "id": 5 })).unwrap_err(),
            SchemaError::MissingType("id".to_string())
        );
        assert_eq!(
            Schema::from_json(&json!({ "at": "Date" })).unwrap_err(),
            SchemaError::UnknownType {
                field: "at".to_string(),
                type_name: "Date".to_string()
            }
        );
        assert_eq!(
            Schema::from_json(&json!(["id"])).unwrap_err(),
            SchemaError::InvalidDeclaration
        );
    }

    #[test]
    fn test_duplicate_field() {
        let err = Schema::builder()
            .field("id", FieldType::Number)
            .indexed("id", FieldType::String)
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField("id".to_string()));
    }

    #[test]
    fn test_sanitize_keeps_declared_fields() {
        let schema = Schema::builder()
            .field("id", FieldType::Number)
            .indexed("flag", FieldType::Number)
            .field("label", FieldType::String)
            .build()
            .unwrap();

        let entity = schema
            .sanitize(&json!({ "id": "7", "flag": 1, "extra": "dropped" }))
            .unwrap();
        assert_eq!(entity.id(), &Value::Number(7.0));
        assert_eq!(entity.get("flag"), Some(&Value::Number(1.0)));
        assert_eq!(entity.get("label"), None);
        assert_eq!(entity.get("extra"), None);

        assert_eq!(
            schema.sanitize(&json!({ "flag": 1 })).unwrap_err(),
            CommonError::MissingId("id")
        );
    }

    #[test]
    fn test_custom_filter_and_query() {
        let schema = Schema::builder()
            .field("id", FieldType::Number)
            .with(
                FieldSchema::new("email", FieldType::String)
                    .indexed()
                    .with_filter(|raw| Value::from(raw.as_str().unwrap_or_default().to_lowercase())),
            )
            .field("label", FieldType::String)
            .build()
            .unwrap();

        let query = schema.query(&json!({ "email": "A@B.C", "label": "ignored" }));
        assert_eq!(query.len(), 1);
        assert_eq!(query.conditions().get("email"), Some(&Value::from("a@b.c")));
        assert!(schema.query(&json!({ "label": "x" })).is_empty());
    }

    #[test]
    fn test_conform_drops_undeclared_fields() {
        let schema = Schema::builder()
            .field("id", FieldType::Number)
            .build()
            .unwrap();
        let stored = Entity::from_pairs([("id", Value::from(1)), ("old", Value::from("x"))]).unwrap();
        let conformed = schema.conform(&stored).unwrap();
        assert_eq!(conformed.fields().len(), 1);
    }
}
